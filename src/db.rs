//! Connection pool setup and scoped session acquisition.
//!
//! A session is one pooled PostgreSQL connection serving one unit of work.
//! The helpers here guarantee release on every exit path: the connection
//! goes back to the pool when the unit of work ends, success or failure.

use crate::config::Settings;
use crate::error::AppError;
use futures::future::BoxFuture;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgConnection, PgPool};

/// One database session, bound to a single unit of work. Every CRUD
/// operation borrows the caller's session.
pub type Session = PgConnection;

const MAX_POOL_CONNECTIONS: u32 = 5;

/// Build the process-wide connection pool from settings. Connections are
/// established lazily as units of work draw from the pool.
pub fn pool(settings: &Settings) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(MAX_POOL_CONNECTIONS)
        .connect_lazy(&settings.database_url)
}

/// Run one unit of work on a session drawn from the pool. The connection is
/// returned to the pool when the callback finishes, whatever the outcome.
pub async fn with_session<T, F>(pool: &PgPool, work: F) -> Result<T, AppError>
where
    F: for<'c> FnOnce(&'c mut Session) -> BoxFuture<'c, Result<T, AppError>>,
{
    let mut conn = pool.acquire().await.map_err(AppError::Db)?;
    work(&mut conn).await
}

/// Run one unit of work inside a transaction that is always rolled back.
/// Test harnesses swap this in for [`with_session`] so nothing the unit of
/// work writes ever persists.
pub async fn with_rollback_session<T, F>(pool: &PgPool, work: F) -> Result<T, AppError>
where
    F: for<'c> FnOnce(&'c mut Session) -> BoxFuture<'c, Result<T, AppError>>,
{
    let mut tx = pool.begin().await.map_err(AppError::Db)?;
    let out = work(&mut tx).await;
    tx.rollback().await.map_err(AppError::Db)?;
    out
}
