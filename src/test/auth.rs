use axum::http::StatusCode;
use diesel::prelude::*;
use serde_json::{Value, json};

use crate::{
    auth::LOGIN_COOKIE,
    schema::users,
    test::{COACH_EMAIL, COACH_PASSWORD, make_server, register_and_login},
};

#[tokio::test]
async fn api_requires_a_session() {
    let (server, _pool) = make_server();

    for path in ["/api/teams", "/api/players", "/api/dashboard/overview"] {
        let res = server.get(path).await;
        res.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(res.json::<Value>()["error"], "Unauthorized");
    }

    server.get("/api/auth/session").await.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_login_and_logout() {
    let (server, _pool) = make_server();
    let session = register_and_login(&server).await;

    let res = server.get("/api/auth/session").add_cookie(session).await;
    res.assert_status_ok();
    let body = res.json::<Value>();
    assert_eq!(body["user"]["email"], COACH_EMAIL);
    assert!(body["user"].get("passwordHash").is_none());

    let res = server.post("/api/auth/logout").await;
    res.assert_status_ok();
    assert_eq!(res.json::<Value>()["success"], true);
}

#[tokio::test]
async fn register_validates_input() {
    let (server, _pool) = make_server();

    let res = server
        .post("/api/auth/register")
        .json(&json!({ "name": "Coach", "email": "coach@minos.fc" }))
        .await;
    res.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(res.json::<Value>()["error"], "All fields are required");

    let res = server
        .post("/api/auth/register")
        .json(&json!({
            "name": "Coach",
            "email": "not-an-email",
            "password": COACH_PASSWORD,
        }))
        .await;
    res.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(res.json::<Value>()["error"], "Invalid email");

    let res = server
        .post("/api/auth/register")
        .json(&json!({
            "name": "Coach",
            "email": "other@minos.fc",
            "password": "weak",
        }))
        .await;
    res.assert_status(StatusCode::BAD_REQUEST);
    let error = res.json::<Value>()["error"].as_str().unwrap().to_string();
    assert!(error.contains("at least 8 characters"), "{error}");
    assert!(error.contains(", "), "{error}");

    register_and_login(&server).await;

    // emails are compared case-insensitively
    let res = server
        .post("/api/auth/register")
        .json(&json!({
            "name": "Another coach",
            "email": "COACH@minos.fc",
            "password": COACH_PASSWORD,
        }))
        .await;
    res.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(res.json::<Value>()["error"], "That email is already in use");
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let (server, _pool) = make_server();
    register_and_login(&server).await;

    let res = server
        .post("/api/auth/login")
        .json(&json!({ "email": COACH_EMAIL, "password": "Wrong12345" }))
        .await;
    res.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(res.json::<Value>()["error"], "Invalid email or password");

    let res = server
        .post("/api/auth/login")
        .json(&json!({ "email": "nobody@minos.fc", "password": "Wrong12345" }))
        .await;
    res.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn tampered_cookie_is_rejected() {
    let (server, _pool) = make_server();
    register_and_login(&server).await;

    let forged = axum_extra::extract::cookie::Cookie::new(
        LOGIN_COOKIE,
        r#"{"id":"someone","expiry":"2999-01-01T00:00:00"}"#,
    );
    server
        .get("/api/teams")
        .add_cookie(forged)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn password_reset_flow() {
    let (server, pool) = make_server();
    register_and_login(&server).await;

    // unknown addresses get the same answer
    let res = server
        .post("/api/auth/forgot-password")
        .json(&json!({ "email": "nobody@minos.fc" }))
        .await;
    res.assert_status_ok();
    assert_eq!(res.json::<Value>()["success"], true);

    server
        .post("/api/auth/forgot-password")
        .json(&json!({ "email": COACH_EMAIL }))
        .await
        .assert_status_ok();

    let token = users::table
        .filter(users::email.eq(COACH_EMAIL))
        .select(users::reset_token)
        .first::<Option<String>>(&mut pool.get().unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(token.len(), 64);

    server
        .post("/api/auth/reset-password")
        .json(&json!({ "token": "bogus", "password": "NewPassw0rd" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    server
        .post("/api/auth/reset-password")
        .json(&json!({ "token": token, "password": "NewPassw0rd" }))
        .await
        .assert_status_ok();

    // the token can only be used once
    server
        .post("/api/auth/reset-password")
        .json(&json!({ "token": token, "password": "OtherPassw0rd" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    server
        .post("/api/auth/login")
        .json(&json!({ "email": COACH_EMAIL, "password": COACH_PASSWORD }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    server
        .post("/api/auth/login")
        .json(&json!({ "email": COACH_EMAIL, "password": "NewPassw0rd" }))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn surrounding_whitespace_in_passwords_is_ignored() {
    let (server, _pool) = make_server();
    let padded = format!("{COACH_PASSWORD}  ");

    server
        .post("/api/auth/register")
        .json(&json!({ "name": "Coach", "email": COACH_EMAIL, "password": padded }))
        .await
        .assert_status(StatusCode::CREATED);

    for password in [padded.as_str(), COACH_PASSWORD] {
        let res = server
            .post("/api/auth/login")
            .json(&json!({ "email": COACH_EMAIL, "password": password }))
            .await;
        res.assert_status_ok();
        assert!(!res.cookie(LOGIN_COOKIE).value().is_empty());
    }
}
