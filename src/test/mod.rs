//! End-to-end tests which drive the whole router against an in-memory
//! database.

use axum_extra::extract::cookie::{Cookie, Key};
use axum_test::TestServer;
use diesel_migrations::MigrationHarness;
use serde_json::{Value, json};

use crate::{
    MIGRATIONS,
    auth::LOGIN_COOKIE,
    config::create_app,
    state::{AppState, DbPool, build_pool},
};

mod auth;
mod dashboard;

pub const COACH_EMAIL: &str = "coach@minos.fc";
pub const COACH_PASSWORD: &str = "Tricolor1914";

pub struct TestClub {
    pub server: TestServer,
    pub pool: DbPool,
    pub session: Cookie<'static>,
}

pub fn make_server() -> (TestServer, DbPool) {
    let pool = build_pool(":memory:").unwrap();
    pool.get()
        .unwrap()
        .run_pending_migrations(MIGRATIONS)
        .unwrap();

    let app = create_app(
        AppState {
            pool: pool.clone(),
            key: Key::from(&[7u8; 64]),
            session_days: 7,
        },
        None,
    );

    (TestServer::new(app).unwrap(), pool)
}

pub async fn register_and_login(server: &TestServer) -> Cookie<'static> {
    server
        .post("/api/auth/register")
        .json(&json!({
            "name": "Coach",
            "email": COACH_EMAIL,
            "password": COACH_PASSWORD,
        }))
        .await
        .assert_status(axum::http::StatusCode::CREATED);

    let res = server
        .post("/api/auth/login")
        .json(&json!({ "email": COACH_EMAIL, "password": COACH_PASSWORD }))
        .await;
    res.assert_status_ok();
    res.cookie(LOGIN_COOKIE)
}

impl TestClub {
    pub async fn new() -> TestClub {
        let (server, pool) = make_server();
        let session = register_and_login(&server).await;
        TestClub {
            server,
            pool,
            session,
        }
    }

    pub async fn get(&self, path: &str) -> axum_test::TestResponse {
        self.server.get(path).add_cookie(self.session.clone()).await
    }

    pub async fn post(&self, path: &str, body: Value) -> axum_test::TestResponse {
        self.server
            .post(path)
            .add_cookie(self.session.clone())
            .json(&body)
            .await
    }

    pub async fn put(&self, path: &str, body: Value) -> axum_test::TestResponse {
        self.server
            .put(path)
            .add_cookie(self.session.clone())
            .json(&body)
            .await
    }

    pub async fn delete(&self, path: &str) -> axum_test::TestResponse {
        self.server
            .delete(path)
            .add_cookie(self.session.clone())
            .await
    }

    pub async fn create_team(&self, name: &str) -> String {
        let res = self
            .post(
                "/api/teams",
                json!({ "name": name, "city": "Recife", "stateCode": "pe" }),
            )
            .await;
        res.assert_status(axum::http::StatusCode::CREATED);
        res.json::<Value>()["id"].as_str().unwrap().to_string()
    }

    pub async fn create_player(&self, team_id: &str, name: &str) -> String {
        let res = self
            .post(
                "/api/players",
                json!({
                    "teamId": team_id,
                    "fullName": name,
                    "mainPosition": "FW",
                    "dominantFoot": "right",
                }),
            )
            .await;
        res.assert_status(axum::http::StatusCode::CREATED);
        res.json::<Value>()["id"].as_str().unwrap().to_string()
    }

    pub async fn create_match(
        &self,
        team_id: &str,
        opponent: &str,
        kickoff_at: &str,
        status: &str,
        score: Option<(i32, i32)>,
    ) -> String {
        let res = self
            .post(
                "/api/matches",
                json!({
                    "teamId": team_id,
                    "kickoffAt": kickoff_at,
                    "venue": "Ilha do Retiro",
                    "opponentName": opponent,
                    "kind": "league",
                    "status": status,
                    "goalsFor": score.map(|s| s.0),
                    "goalsAgainst": score.map(|s| s.1),
                }),
            )
            .await;
        res.assert_status(axum::http::StatusCode::CREATED);
        res.json::<Value>()["id"].as_str().unwrap().to_string()
    }
}
