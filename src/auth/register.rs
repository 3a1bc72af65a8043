use argon2::Argon2;
use argon2::PasswordHasher;
use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use chrono::Utc;
use diesel::{insert_into, prelude::*};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    schema::users,
    state::Conn,
    util_resp::{
        FailureResponse, JsonBody, StandardResponse, bad_request, created,
    },
    validation::{
        check_password_strength, is_valid_email, non_blank, sanitize_email,
    },
};

#[derive(Deserialize)]
pub struct RegisterForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

pub fn hash_password(password: &str) -> Result<String, FailureResponse> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            tracing::error!("failed to hash password: {e}");
            FailureResponse::ServerError("Internal error".to_string())
        })
}

#[tracing::instrument(skip_all)]
pub async fn do_register(
    mut conn: Conn,
    JsonBody(form): JsonBody<RegisterForm>,
) -> StandardResponse {
    let (Some(name), Some(email), Some(password)) = (
        non_blank(form.name.as_deref()),
        form.email.as_deref().map(sanitize_email).filter(|e| !e.is_empty()),
        form.password.as_deref().map(str::trim).filter(|p| !p.is_empty()),
    ) else {
        return bad_request("All fields are required");
    };

    if !(2..=100).contains(&name.chars().count()) {
        return bad_request("Name must be between 2 and 100 characters");
    }
    if let Err(e) = is_valid_email(&email) {
        return bad_request(e);
    }
    if let Err(errors) = check_password_strength(password) {
        return bad_request(errors.join(", "));
    }

    let taken = diesel::select(diesel::dsl::exists(
        users::table.filter(users::email.eq(&email)),
    ))
    .get_result::<bool>(&mut *conn)?;

    if taken {
        return bad_request("That email is already in use");
    }

    let id = Uuid::now_v7().to_string();
    let password_hash = hash_password(password)?;

    let n = insert_into(users::table)
        .values((
            users::id.eq(&id),
            users::email.eq(&email),
            users::name.eq(&name),
            users::password_hash.eq(password_hash),
            users::created_at.eq(Utc::now().naive_utc()),
        ))
        .execute(&mut *conn)?;
    assert_eq!(n, 1);

    tracing::info!(user_id = %id, "registered new user");

    created(json!({
        "success": true,
        "user": {
            "id": id,
            "name": name,
            "email": email,
        }
    }))
}
