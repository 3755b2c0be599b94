use anyhow::Result;
use axum::Router;
use std::{io::ErrorKind, path::Path, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod config;
mod db;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;
mod state;

use services::{
    catalog_service::SqliteCatalog,
    upload_service::{LocalImageStore, UploadPolicy},
};
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + migrate flag ---
    let (cfg, migrate) = config::AppConfig::from_env_and_args()?;

    tracing::info!("Starting photo-portfolio with config: {:?}", cfg);

    // --- Ensure upload directory exists ---
    if !Path::new(&cfg.upload_dir).exists() {
        tokio::fs::create_dir_all(&cfg.upload_dir).await?;
        tracing::info!("Created upload directory at {}", cfg.upload_dir);
    }

    // --- Initialize SQLite connection ---
    let pool = Arc::new(db::connect(&cfg.database_url).await?);

    // --- Schema (idempotent), exit early in migration mode ---
    db::run_migrations(&pool).await?;
    if migrate {
        tracing::info!("Database migration complete.");
        return Ok(());
    }

    // --- Wire services ---
    let upload_policy = UploadPolicy::new(cfg.max_upload_bytes);
    let state = AppState::new(
        Arc::new(SqliteCatalog::new(pool.clone())),
        Arc::new(LocalImageStore::new(&cfg.upload_dir)),
        upload_policy,
    );

    // --- Build router ---
    let app: Router = routes::routes::routes(upload_policy).with_state(state);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
