use std::{
    fs::read_to_string,
    path::{Path, PathBuf},
};

use axum::{
    Router, middleware,
    routing::{get, post, put},
};
use axum_extra::extract::cookie::Key;
use clap::Parser;
use serde::Deserialize;
use tower::ServiceBuilder;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{info, warn};

use crate::{
    auth::{
        login::{current_session, do_login, do_logout},
        password_reset::{do_forgot_password, do_reset_password},
        register::do_register,
    },
    dashboard::dashboard_overview,
    lineups::{
        manage::{
            do_create_lineup, do_delete_lineup, do_update_lineup, list_lineups,
        },
        view_lineup,
    },
    matches::{
        events::{do_add_event, do_delete_event, do_replace_events},
        manage::{
            do_create_match, do_delete_match, do_update_match, list_matches,
        },
        participations::{do_replace_participations, do_upsert_participation},
        view::view_match,
    },
    players::{
        manage::{
            do_create_player, do_delete_player, do_update_player, list_players,
        },
        stats::player_stats,
        view::view_player,
    },
    state::{AppState, commit_transactions},
    teams::{
        list_teams,
        manage::{do_create_team, do_update_team},
        view_team,
    },
};

const DEFAULT_BIND: &str = "127.0.0.1:3000";
const DEFAULT_DATABASE_URL: &str = "minos.db";
const DEFAULT_SESSION_DAYS: u64 = 7;

#[derive(Parser, Debug, Default)]
#[command(about = "Dashboard server for an amateur football club")]
pub struct Args {
    /// Path to a TOML configuration file.
    #[clap(long, short)]
    pub config: Option<PathBuf>,
    /// Address to listen on, e.g. `0.0.0.0:3000`.
    #[clap(long)]
    pub bind: Option<String>,
    #[clap(long)]
    pub database_url: Option<String>,
    /// Directory containing the dashboard frontend, served for every path
    /// outside of `/api`.
    #[clap(long)]
    pub static_dir: Option<PathBuf>,
}

/// The optional configuration file. Every key may be left out.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub bind: Option<String>,
    pub database_url: Option<String>,
    pub secret_key: Option<String>,
    pub static_dir: Option<PathBuf>,
    pub session_days: Option<u64>,
}

impl FileConfig {
    pub fn read(path: &Path) -> Result<FileConfig, String> {
        let text = read_to_string(path).map_err(|e| {
            format!("could not read config file {}: {e}", path.display())
        })?;
        toml::from_str(&text).map_err(|e| {
            format!("invalid config file {}: {e}", path.display())
        })
    }
}

#[derive(Debug)]
pub struct Config {
    pub bind: String,
    pub database_url: String,
    /// Used to encrypt the session cookie. Must be at least 64 bytes long.
    pub secret_key: Option<String>,
    pub static_dir: Option<PathBuf>,
    pub session_days: u64,
}

fn var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Command line flags take precedence over environment variables, which
    /// take precedence over the config file.
    pub fn load(args: Args) -> Result<Config, String> {
        let file = match &args.config {
            Some(path) => FileConfig::read(path)?,
            None => FileConfig::default(),
        };

        let bind = args
            .bind
            .or(file.bind)
            .unwrap_or_else(|| DEFAULT_BIND.to_string());

        let database_url = args
            .database_url
            .or_else(|| var("DATABASE_URL"))
            .or(file.database_url)
            .unwrap_or_else(|| {
                info!("DATABASE_URL not set, using default: {DEFAULT_DATABASE_URL}");
                DEFAULT_DATABASE_URL.to_string()
            });

        let secret_key = var("SECRET_KEY").or(file.secret_key);

        let session_days = file.session_days.unwrap_or(DEFAULT_SESSION_DAYS);
        if session_days == 0 {
            return Err("session_days must be at least 1".to_string());
        }

        Ok(Config {
            bind,
            database_url,
            secret_key,
            static_dir: args.static_dir.or(file.static_dir),
            session_days,
        })
    }

    /// The cookie encryption key. Without a configured secret a random key
    /// is generated, which logs everybody out whenever the server restarts.
    pub fn key(&self) -> Result<Key, String> {
        match &self.secret_key {
            Some(secret) => Key::try_from(secret.as_bytes()).map_err(|e| {
                format!("SECRET_KEY is unusable ({e}), it must be at least 64 bytes")
            }),
            None => {
                warn!("SECRET_KEY not set, sessions will not survive a restart");
                Ok(Key::generate())
            }
        }
    }
}

pub fn api_routes() -> Router<AppState> {
    let auth = Router::new()
        .route("/register", post(do_register))
        .route("/login", post(do_login))
        .route("/logout", post(do_logout))
        .route("/session", get(current_session))
        .route("/forgot-password", post(do_forgot_password))
        .route("/reset-password", post(do_reset_password));

    let teams = Router::new()
        .route("/", get(list_teams).post(do_create_team))
        .route("/:id", get(view_team).put(do_update_team));

    let players = Router::new()
        .route("/", get(list_players).post(do_create_player))
        .route(
            "/:id",
            get(view_player).put(do_update_player).delete(do_delete_player),
        )
        .route("/:id/stats", get(player_stats));

    let matches = Router::new()
        .route("/", get(list_matches).post(do_create_match))
        .route(
            "/:id",
            get(view_match).put(do_update_match).delete(do_delete_match),
        )
        .route(
            "/:id/events",
            post(do_add_event)
                .put(do_replace_events)
                .delete(do_delete_event),
        )
        .route(
            "/:id/participations",
            put(do_replace_participations).post(do_upsert_participation),
        );

    let lineups = Router::new()
        .route("/", get(list_lineups).post(do_create_lineup))
        .route(
            "/:id",
            get(view_lineup).put(do_update_lineup).delete(do_delete_lineup),
        );

    Router::new()
        .nest("/auth", auth)
        .nest("/teams", teams)
        .nest("/players", players)
        .nest("/matches", matches)
        .nest("/lineups", lineups)
        .route("/dashboard/overview", get(dashboard_overview))
}

pub fn create_app(state: AppState, static_dir: Option<&Path>) -> Router {
    let router = Router::new()
        .nest("/api", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(commit_transactions)),
        );

    let router = match static_dir {
        Some(dir) => {
            info!("serving static files from {}", dir.display());
            router.fallback_service(ServeDir::new(dir))
        }
        None => router,
    };

    router.with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flags_override_the_file() {
        let file: FileConfig = toml::from_str(
            r#"
            bind = "0.0.0.0:8080"
            database_url = "/var/lib/minos/minos.db"
            session_days = 30
            "#,
        )
        .unwrap();
        assert_eq!(file.session_days, Some(30));

        let dir = std::env::temp_dir().join(format!(
            "minos-config-{}",
            uuid::Uuid::now_v7()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("minos.toml");
        std::fs::write(
            &path,
            "bind = \"0.0.0.0:8080\"\nsession_days = 30\nstatic_dir = \"web\"\n",
        )
        .unwrap();

        let config = Config::load(Args {
            config: Some(path),
            bind: Some("127.0.0.1:9999".to_string()),
            database_url: Some(":memory:".to_string()),
            static_dir: None,
        })
        .unwrap();

        assert_eq!(config.bind, "127.0.0.1:9999");
        assert_eq!(config.database_url, ":memory:");
        assert_eq!(config.session_days, 30);
        assert_eq!(config.static_dir, Some(PathBuf::from("web")));

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<FileConfig>("port = 3000").is_err());
    }

    #[test]
    fn short_secrets_are_rejected() {
        let config = Config {
            bind: DEFAULT_BIND.to_string(),
            database_url: ":memory:".to_string(),
            secret_key: Some("too short".to_string()),
            static_dir: None,
            session_days: DEFAULT_SESSION_DAYS,
        };
        assert!(config.key().is_err());
    }
}
