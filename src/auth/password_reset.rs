//! Password recovery. Tokens are stored on the user row and expire after an
//! hour; delivering them (e.g. by email) happens outside this service.

use chrono::{Duration, Utc};
use diesel::prelude::*;
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::register::hash_password,
    schema::users,
    state::Conn,
    util_resp::{JsonBody, StandardResponse, bad_request, success},
    validation::{check_password_strength, sanitize_email},
};

const RESET_TOKEN_VALIDITY_MINUTES: i64 = 60;

fn generate_reset_token() -> String {
    rand::random::<[u8; 32]>()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[derive(Deserialize)]
pub struct ForgotPasswordForm {
    email: Option<String>,
}

/// Always reports success, so that the response does not reveal whether an
/// account exists for the given address.
#[tracing::instrument(skip_all)]
pub async fn do_forgot_password(
    mut conn: Conn,
    JsonBody(form): JsonBody<ForgotPasswordForm>,
) -> StandardResponse {
    let Some(email) = form
        .email
        .as_deref()
        .map(sanitize_email)
        .filter(|e| !e.is_empty())
    else {
        return bad_request("Email is required");
    };

    let user_id = users::table
        .filter(users::email.eq(&email))
        .select(users::id)
        .first::<String>(&mut *conn)
        .optional()?;

    if let Some(user_id) = user_id {
        let expires_at = Utc::now().naive_utc()
            + Duration::minutes(RESET_TOKEN_VALIDITY_MINUTES);

        diesel::update(users::table.filter(users::id.eq(&user_id)))
            .set((
                users::reset_token.eq(generate_reset_token()),
                users::reset_token_expires_at.eq(expires_at),
            ))
            .execute(&mut *conn)?;

        tracing::info!(user_id = %user_id, "issued password reset token");
    }

    success(json!({ "success": true }))
}

#[derive(Deserialize)]
pub struct ResetPasswordForm {
    token: Option<String>,
    password: Option<String>,
}

#[tracing::instrument(skip_all)]
pub async fn do_reset_password(
    mut conn: Conn,
    JsonBody(form): JsonBody<ResetPasswordForm>,
) -> StandardResponse {
    let (Some(token), Some(password)) = (
        form.token.as_deref().map(str::trim).filter(|t| !t.is_empty()),
        form.password.as_deref().map(str::trim),
    ) else {
        return bad_request("Token and password are required");
    };

    let user_id = users::table
        .filter(users::reset_token.eq(token))
        .filter(users::reset_token_expires_at.gt(Utc::now().naive_utc()))
        .select(users::id)
        .first::<String>(&mut *conn)
        .optional()?;

    let Some(user_id) = user_id else {
        return bad_request("Invalid or expired token");
    };

    if let Err(errors) = check_password_strength(password) {
        return bad_request(errors.join(", "));
    }

    diesel::update(users::table.filter(users::id.eq(&user_id)))
        .set((
            users::password_hash.eq(hash_password(password)?),
            users::reset_token.eq(None::<String>),
            users::reset_token_expires_at.eq(None::<chrono::NaiveDateTime>),
        ))
        .execute(&mut *conn)?;

    tracing::info!(user_id = %user_id, "password was reset");

    success(json!({ "success": true }))
}
