use clap::Parser;
use diesel_migrations::MigrationHarness;
use minos::{
    MIGRATIONS,
    config::{Args, Config, create_app},
    state::{AppState, build_pool},
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("minos=info,tower_http=info")),
        )
        .init();

    if let Err(e) = run(Args::parse()).await {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), String> {
    let config = Config::load(args)?;
    let key = config.key()?;

    tracing::info!(database_url = %config.database_url, "opening database");
    let pool = build_pool(&config.database_url)
        .map_err(|e| format!("could not open the database: {e}"))?;

    let migration_pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let mut conn = migration_pool.get().map_err(|e| e.to_string())?;
        conn.run_pending_migrations(MIGRATIONS)
            .map(|applied| {
                tracing::info!(n = applied.len(), "applied migrations");
            })
            .map_err(|e| format!("migrations failed: {e}"))
    })
    .await
    .map_err(|e| e.to_string())??;

    let app = create_app(
        AppState {
            pool,
            key,
            session_days: config.session_days,
        },
        config.static_dir.as_deref(),
    );

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .map_err(|e| format!("could not bind to {}: {e}", config.bind))?;
    tracing::info!("listening on {}", config.bind);

    axum::serve(listener, app)
        .await
        .map_err(|e| format!("server error: {e}"))
}
