//! SQLite pool setup and schema migrations.

use anyhow::{Context, Result};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::str::FromStr;

const INIT_MIGRATION: &str = include_str!("../migrations/0001_init.sql");

/// Open a pool for `database_url`, creating the database file (and its
/// parent directory) when missing. Foreign keys are always enforced so
/// deleting a collection cascades to its photos.
pub async fn connect(database_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("parsing database url `{}`", database_url))?
        .create_if_missing(true)
        .foreign_keys(true);

    let db_path = options.get_filename();
    tracing::debug!("Interpreted SQLite path => {}", db_path.display());
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating database directory {:?}", parent))?;
            tracing::info!("Created missing directory {:?}", parent);
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("connecting to {}", database_url))?;

    Ok(pool)
}

/// A single-connection in-memory pool. The connection never expires, so the
/// database lives as long as the pool.
#[cfg(test)]
pub async fn connect_in_memory() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Apply the embedded schema statement by statement.
///
/// Every statement is `IF NOT EXISTS`, so running this against an already
/// migrated database is a no-op.
pub async fn run_migrations(db: &SqlitePool) -> Result<()> {
    let statements = INIT_MIGRATION
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();

    tracing::info!("Running {} migration statements...", statements.len());

    for stmt in statements {
        tracing::debug!("Executing migration SQL: {}", stmt);
        sqlx::query(stmt)
            .execute(db)
            .await
            .with_context(|| format!("executing migration statement `{}`", stmt))?;
    }

    Ok(())
}
