//! Database setup and initialization

use anyhow::{Context, Result};
use docvault_core::{AppError, Config};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;

/// Embedded schema, applied on startup.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

/// Setup database connection pool from configuration and run migrations
pub async fn setup_database(config: &Config) -> Result<SqlitePool> {
    connect(
        config.database_url(),
        config.db_max_connections(),
        Duration::from_secs(config.db_timeout_seconds()),
    )
    .await
}

/// Open a pool on `database_url`, creating the file if needed, and run migrations.
pub async fn connect(
    database_url: &str,
    max_connections: u32,
    acquire_timeout: Duration,
) -> Result<SqlitePool> {
    tracing::info!("Connecting to database...");

    let options = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("Invalid SQLite connection string: {}", database_url))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(5))
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(acquire_timeout)
        .connect_with(options)
        .await
        .context("Failed to connect to SQLite")?;

    tracing::info!(max_connections, "Database connected successfully");

    MIGRATOR
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    Ok(pool)
}

/// Round-trip a trivial query.
pub async fn health_check(pool: &SqlitePool) -> Result<(), AppError> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
