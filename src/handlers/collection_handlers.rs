//! HTTP handlers for collection endpoints.
//!
//! Bodies are validated before the catalog is touched; ids that do not parse
//! as UUIDs cannot name a stored row and are treated as not found.

use crate::{
    errors::AppError,
    models::collection::{Collection, CollectionPatch, NewCollection},
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

/// Parse a path id; `None` means "cannot exist".
pub(crate) fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw).ok()
}

fn collection_not_found() -> AppError {
    AppError::not_found("Collection not found")
}

/// `GET /api/collections`: newest first.
pub async fn list_collections(
    State(state): State<AppState>,
) -> Result<Json<Vec<Collection>>, AppError> {
    Ok(Json(state.catalog.list_collections().await?))
}

/// `GET /api/collections/{id}`
pub async fn get_collection(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Collection>, AppError> {
    let id = parse_id(&id).ok_or_else(collection_not_found)?;
    state
        .catalog
        .get_collection(id)
        .await?
        .map(Json)
        .ok_or_else(collection_not_found)
}

/// `POST /api/collections`
pub async fn create_collection(
    State(state): State<AppState>,
    payload: Result<Json<NewCollection>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(input) = payload?;
    input.validate()?;
    let collection = state.catalog.create_collection(input).await?;
    Ok((StatusCode::CREATED, Json(collection)))
}

/// `PUT /api/collections/{id}`: partial update.
pub async fn update_collection(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<CollectionPatch>, JsonRejection>,
) -> Result<Json<Collection>, AppError> {
    let Json(patch) = payload?;
    patch.validate()?;
    let id = parse_id(&id).ok_or_else(collection_not_found)?;
    state
        .catalog
        .update_collection(id, patch)
        .await?
        .map(Json)
        .ok_or_else(collection_not_found)
}

/// `DELETE /api/collections/{id}`: removes the collection and its photos.
/// Always 204, whether or not the collection existed.
pub async fn delete_collection(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if let Some(id) = parse_id(&id) {
        state.catalog.delete_collection(id).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}
