use std::{
    ops::{Deref, DerefMut},
    sync::{Arc, OnceLock},
};

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::Key;
use diesel::{
    Connection, SqliteConnection,
    connection::{SimpleConnection, TransactionManager},
    r2d2::{ConnectionManager, CustomizeConnection, Pool, PooledConnection},
};

use crate::util_resp::FailureResponse;

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

type PooledSqlite = PooledConnection<ConnectionManager<SqliteConnection>>;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub key: Key,
    /// How long a login cookie stays valid for.
    pub session_days: u64,
}

impl FromRef<AppState> for DbPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.key.clone()
    }
}

/// Applied to every connection the pool opens. SQLite does not enforce
/// foreign keys (and therefore cascading deletes) unless asked to.
#[derive(Debug)]
pub struct ConnectionOptions;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error>
    for ConnectionOptions
{
    fn on_acquire(
        &self,
        conn: &mut SqliteConnection,
    ) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute(
            "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;",
        )
        .map_err(diesel::r2d2::Error::QueryError)
    }
}

pub fn build_pool(db_url: &str) -> Result<DbPool, diesel::r2d2::PoolError> {
    Pool::builder()
        // every `:memory:` connection is a separate database
        .max_size(if db_url == ":memory:" { 1 } else { 10 })
        .connection_customizer(Box::new(ConnectionOptions))
        .build(ConnectionManager::<SqliteConnection>::new(db_url))
}

/// The connection (if any) which has been opened for the current request.
///
/// Inserted into the request extensions by [`commit_transactions`], so that
/// all extractors of a request share one connection and one transaction.
#[derive(Clone, Default)]
pub struct RequestConn(Arc<OnceLock<ThreadSafeConn>>);

impl RequestConn {
    fn current(&self) -> Option<ThreadSafeConn> {
        self.0.get().cloned()
    }
}

/// Commits the transaction opened during a request if the response was
/// successful, and rolls it back otherwise.
pub async fn commit_transactions(mut req: Request, next: Next) -> Response {
    let slot = RequestConn::default();
    req.extensions_mut().insert(slot.clone());

    let response = next.run(req).await;

    let Some(conn) = slot.current() else {
        return response;
    };
    let mut conn = conn.inner.lock().await;

    let status = response.status();
    if status.is_success()
        || status.is_redirection()
        || status.is_informational()
    {
        if let Err(e) =
            <SqliteConnection as Connection>::TransactionManager::commit_transaction(
                &mut **conn,
            )
        {
            tracing::error!("failed to commit transaction: {e}");
            return FailureResponse::ServerError("Database error".to_string())
                .into_response();
        }
    } else if let Err(e) =
        <SqliteConnection as Connection>::TransactionManager::rollback_transaction(
            &mut **conn,
        )
    {
        tracing::error!("failed to roll back transaction: {e}");
    }

    response
}

#[derive(Clone)]
pub struct ThreadSafeConn {
    pub inner: Arc<tokio::sync::Mutex<PooledSqlite>>,
}

#[async_trait]
impl<S> FromRequestParts<S> for ThreadSafeConn
where
    S: Send + Sync,
    DbPool: FromRef<S>,
{
    type Rejection = FailureResponse;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let slot = parts.extensions.get::<RequestConn>().cloned();

        if let Some(conn) = slot.as_ref().and_then(RequestConn::current) {
            return Ok(conn);
        }

        let pool = DbPool::from_ref(state);
        let mut conn = tokio::task::spawn_blocking(move || pool.get())
            .await
            .map_err(|e| {
                tracing::error!("connection task failed: {e}");
                FailureResponse::ServerError("Database error".to_string())
            })??;

        // Without the middleware nobody would commit, so stay in autocommit
        // mode in that case.
        if slot.is_some() {
            <SqliteConnection as Connection>::TransactionManager::begin_transaction(
                &mut *conn,
            )?;
        }

        let conn = ThreadSafeConn {
            inner: Arc::new(tokio::sync::Mutex::new(conn)),
        };

        if let Some(slot) = slot {
            let _ = slot.0.set(conn.clone());
        }

        Ok(conn)
    }
}

/// An exclusively held database connection for the duration of a handler.
pub struct Conn {
    inner: tokio::sync::OwnedMutexGuard<PooledSqlite>,
}

impl Deref for Conn {
    type Target = SqliteConnection;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for Conn {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Conn
where
    S: Send + Sync,
    DbPool: FromRef<S>,
{
    type Rejection = FailureResponse;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let conn = ThreadSafeConn::from_request_parts(parts, state).await?;

        let inner = conn.inner.try_lock_owned().map_err(|_| {
            tracing::error!("request connection is already locked");
            FailureResponse::ServerError("Database error".to_string())
        })?;

        Ok(Conn { inner })
    }
}
