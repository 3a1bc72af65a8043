use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{extract::State, response::IntoResponse};
use axum_extra::extract::PrivateCookieJar;
use diesel::prelude::*;
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::{User, remove_login_cookie, set_login_cookie},
    schema::users,
    state::{AppState, Conn},
    util_resp::{
        FailureResponse, JsonBody, StandardResponse, SuccessResponse, success,
    },
    validation::sanitize_email,
};

#[derive(Deserialize)]
pub struct LoginForm {
    email: Option<String>,
    password: Option<String>,
}

fn invalid_credentials() -> FailureResponse {
    FailureResponse::Unauthorized("Invalid email or password".to_string())
}

#[tracing::instrument(skip_all)]
pub async fn do_login(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    mut conn: Conn,
    JsonBody(form): JsonBody<LoginForm>,
) -> Result<(PrivateCookieJar, SuccessResponse), FailureResponse> {
    let (Some(email), Some(password)) = (
        form.email.as_deref().map(sanitize_email),
        form.password.as_deref().map(str::trim),
    ) else {
        return Err(FailureResponse::BadRequest(
            "Email and password are required".to_string(),
        ));
    };

    let user = users::table
        .filter(users::email.eq(&email))
        .select(User::as_select())
        .first::<User>(&mut *conn)
        .optional()?
        .ok_or_else(invalid_credentials)?;

    let parsed_hash = PasswordHash::new(&user.password_hash).map_err(|e| {
        tracing::error!(user_id = %user.id, "stored password hash is invalid: {e}");
        FailureResponse::ServerError("Internal error".to_string())
    })?;

    if Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_err()
    {
        tracing::debug!(user_id = %user.id, "incorrect password");
        return Err(invalid_credentials());
    }

    let jar = set_login_cookie(user.id.clone(), state.session_days, jar)?;

    tracing::info!(user_id = %user.id, "user logged in");

    Ok((jar, success(json!({ "user": user }))?))
}

pub async fn do_logout(jar: PrivateCookieJar) -> impl IntoResponse {
    (remove_login_cookie(jar), success(json!({ "success": true })))
}

pub async fn current_session(user: User) -> StandardResponse {
    success(json!({ "user": user }))
}
