use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use chrono::{Days, NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    schema::users,
    state::{DbPool, ThreadSafeConn},
    util_resp::FailureResponse,
};

pub mod login;
pub mod password_reset;
pub mod register;

pub const LOGIN_COOKIE: &str = "minos_session";

#[derive(Debug, Queryable, Selectable, Serialize, Deserialize, Clone)]
#[diesel(table_name = users)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug)]
pub enum AuthError {
    NoDatabase,
    Unauthorized,
}

impl From<AuthError> for FailureResponse {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::NoDatabase => {
                FailureResponse::ServerError("Database error".to_string())
            }
            AuthError::Unauthorized => {
                FailureResponse::Unauthorized("Unauthorized".to_string())
            }
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
pub struct LoginSession {
    id: String,
    expiry: NaiveDateTime,
}

#[async_trait]
impl<S> FromRequestParts<S> for User
where
    S: Send + Sync,
    DbPool: FromRef<S>,
    Key: FromRef<S>,
{
    type Rejection = FailureResponse;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        // Checked before touching the database, so that anonymous requests
        // never open a connection.
        let jar: PrivateCookieJar<Key> =
            PrivateCookieJar::from_request_parts(parts, state)
                .await
                .map_err(|_| AuthError::Unauthorized)?;

        let login_cookie = match jar.get(LOGIN_COOKIE) {
            Some(cookie) => cookie,
            None => return Err(AuthError::Unauthorized.into()),
        };

        let login: LoginSession =
            match serde_json::from_str::<LoginSession>(login_cookie.value()) {
                Ok(t) if Utc::now().naive_utc() < t.expiry => t,
                _ => {
                    tracing::debug!("rejecting expired or malformed session");
                    return Err(AuthError::Unauthorized.into());
                }
            };

        let conn_wrapper = ThreadSafeConn::from_request_parts(parts, state)
            .await
            .map_err(|_| AuthError::NoDatabase)?;

        let mut conn = conn_wrapper
            .inner
            .try_lock()
            .map_err(|_| AuthError::NoDatabase)?;

        let user = users::table
            .filter(users::id.eq(login.id))
            .select(User::as_select())
            .first(&mut **conn)
            .optional()?;

        match user {
            Some(user) => Ok(user),
            None => Err(AuthError::Unauthorized.into()),
        }
    }
}

pub fn set_login_cookie(
    id: String,
    session_days: u64,
    jar: PrivateCookieJar,
) -> Result<PrivateCookieJar, FailureResponse> {
    let expiry = Utc::now()
        .naive_utc()
        .checked_add_days(Days::new(session_days))
        .ok_or_else(|| {
            FailureResponse::ServerError("Invalid session length".to_string())
        })?;

    let value = serde_json::to_string(&LoginSession { id, expiry })?;

    Ok(jar.add(
        Cookie::build((LOGIN_COOKIE, value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax),
    ))
}

pub fn remove_login_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.remove(Cookie::build(LOGIN_COOKIE).path("/"))
}
