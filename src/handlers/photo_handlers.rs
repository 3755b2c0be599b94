//! HTTP handlers for photo endpoints.

use super::collection_handlers::parse_id;
use crate::{
    errors::AppError,
    models::photo::{NewPhoto, Photo, PhotoPatch},
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use std::collections::BTreeMap;
use uuid::Uuid;

fn photo_not_found() -> AppError {
    AppError::not_found("Photo not found")
}

/// `GET /api/photos`: every photo, by display order.
pub async fn list_photos(State(state): State<AppState>) -> Result<Json<Vec<Photo>>, AppError> {
    Ok(Json(state.catalog.list_photos().await?))
}

/// `GET /api/photo-counts`: `{ "<collection id>": count }`.
pub async fn photo_counts(
    State(state): State<AppState>,
) -> Result<Json<BTreeMap<Uuid, i64>>, AppError> {
    Ok(Json(state.catalog.photo_counts().await?))
}

/// `GET /api/collections/{id}/photos`
///
/// An unknown collection simply has no photos.
pub async fn list_collection_photos(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Photo>>, AppError> {
    let photos = match parse_id(&id) {
        Some(id) => state.catalog.list_photos_by_collection(id).await?,
        None => Vec::new(),
    };
    Ok(Json(photos))
}

/// `GET /api/photos/{id}`
pub async fn get_photo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Photo>, AppError> {
    let id = parse_id(&id).ok_or_else(photo_not_found)?;
    state
        .catalog
        .get_photo(id)
        .await?
        .map(Json)
        .ok_or_else(photo_not_found)
}

/// `POST /api/photos`
pub async fn create_photo(
    State(state): State<AppState>,
    payload: Result<Json<NewPhoto>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(input) = payload?;
    input.validate()?;
    let photo = state.catalog.create_photo(input).await?;
    Ok((StatusCode::CREATED, Json(photo)))
}

/// `PUT /api/photos/{id}`: partial update.
pub async fn update_photo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<PhotoPatch>, JsonRejection>,
) -> Result<Json<Photo>, AppError> {
    let Json(patch) = payload?;
    patch.validate()?;
    let id = parse_id(&id).ok_or_else(photo_not_found)?;
    state
        .catalog
        .update_photo(id, patch)
        .await?
        .map(Json)
        .ok_or_else(photo_not_found)
}

/// `DELETE /api/photos/{id}`: always 204.
pub async fn delete_photo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if let Some(id) = parse_id(&id) {
        state.catalog.delete_photo(id).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}
