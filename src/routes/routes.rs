//! Defines routes for the portfolio API.
//!
//! ## Structure
//! - **Collection endpoints**
//!   - `GET    /api/collections` — list collections, newest first
//!   - `POST   /api/collections` — create collection
//!   - `GET    /api/collections/{id}` — fetch one collection
//!   - `PUT    /api/collections/{id}` — partial update
//!   - `DELETE /api/collections/{id}` — delete collection and its photos
//!   - `GET    /api/collections/{id}/photos` — photos of one collection
//!
//! - **Photo endpoints**
//!   - `GET    /api/photos` — all photos by display order
//!   - `POST   /api/photos` — create photo
//!   - `GET|PUT|DELETE /api/photos/{id}`
//!   - `GET    /api/photo-counts` — photo count per collection
//!
//! - **Images**
//!   - `POST   /api/upload` — multipart upload, field `image`
//!   - `GET    /uploads/{filename}` — serve an uploaded image

use crate::{
    handlers::{
        collection_handlers::{
            create_collection, delete_collection, get_collection, list_collections,
            update_collection,
        },
        health_handlers::{healthz, readyz},
        photo_handlers::{
            create_photo, delete_photo, get_photo, list_collection_photos, list_photos,
            photo_counts, update_photo,
        },
        upload_handlers::{serve_upload, upload_image},
    },
    services::upload_service::UploadPolicy,
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

/// Room for multipart framing on top of the image itself.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Build and return the router for every API route.
///
/// The router carries shared state (`AppState`) to all handlers. The upload
/// route accepts bodies up to twice the policy limit, so images that are
/// merely oversized are read through and rejected by the policy with a 400
/// rather than cut off mid-stream.
pub fn routes(upload_policy: UploadPolicy) -> Router<AppState> {
    let upload_body_limit = upload_policy
        .max_bytes
        .saturating_mul(2)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Collections
        .route(
            "/api/collections",
            get(list_collections).post(create_collection),
        )
        .route(
            "/api/collections/{id}",
            get(get_collection)
                .put(update_collection)
                .delete(delete_collection),
        )
        .route("/api/collections/{id}/photos", get(list_collection_photos))
        // Photos
        .route("/api/photos", get(list_photos).post(create_photo))
        .route(
            "/api/photos/{id}",
            get(get_photo).put(update_photo).delete(delete_photo),
        )
        .route("/api/photo-counts", get(photo_counts))
        // Images
        .route(
            "/api/upload",
            post(upload_image).layer(DefaultBodyLimit::max(upload_body_limit)),
        )
        .route("/uploads/{filename}", get(serve_upload))
}
