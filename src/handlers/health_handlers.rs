//! Health & readiness handlers.
//!
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> readiness that checks the catalog and the upload directory

use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::error;

/// `GET /healthz`
///
/// Liveness probe. Always 200, never performs I/O.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
        }),
    )
}

/// `GET /readyz`
///
/// Readiness probe that:
/// 1. Pings the catalog database.
/// 2. Writes, reads back and deletes a scratch file in the upload directory.
///
/// HTTP 200 when all checks pass, HTTP 503 when any fails.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let database = match state.catalog.ping().await {
        Ok(()) => CheckStatus::ok(),
        Err(e) => {
            error!("readiness: database check failed: {}", e);
            CheckStatus::unavailable()
        }
    };
    let uploads = match state.images.probe().await {
        Ok(()) => CheckStatus::ok(),
        Err(e) => {
            error!("readiness: upload directory check failed: {}", e);
            CheckStatus::unavailable()
        }
    };

    let overall_ok = database.ok && uploads.ok;
    let mut checks = BTreeMap::new();
    checks.insert("database", database);
    checks.insert("uploads", uploads);

    let body = ReadyResponse {
        status: if overall_ok {
            "ok".into()
        } else {
            "error".into()
        },
        checks,
    };

    let status = if overall_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    checks: BTreeMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<&'static str>,
}

impl CheckStatus {
    fn ok() -> Self {
        Self {
            ok: true,
            error: None,
        }
    }

    /// Failure detail goes to the log only.
    fn unavailable() -> Self {
        Self {
            ok: false,
            error: Some("unavailable"),
        }
    }
}
