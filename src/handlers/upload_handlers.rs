//! HTTP handlers for image upload and serving.
//!
//! Uploads are buffered up to the policy limit and validated before anything
//! is written. Served images carry `Cross-Origin-Resource-Policy: cross-origin`
//! so they can be embedded from other origins.

use crate::{
    errors::AppError,
    services::upload_service::{UploadError, ValidatedUpload},
    state::AppState,
};
use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, State, multipart::MultipartRejection},
    http::{HeaderName, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::BytesMut;
use serde::Serialize;
use tracing::debug;

/// Multipart field that carries the image.
pub const IMAGE_FIELD: &str = "image";

const CROSS_ORIGIN_RESOURCE_POLICY: HeaderName =
    HeaderName::from_static("cross-origin-resource-policy");

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub image_url: String,
}

/// `POST /api/upload`: multipart with a single `image` file field.
pub async fn upload_image(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let mut multipart = multipart?;
    let outcome = store_image_field(&state, &mut multipart).await;

    // Consume the rest of the body on every path, so the client gets a clean
    // reply instead of a reset connection.
    while let Ok(Some(_)) = multipart.next_field().await {}

    let image_url = outcome?;
    Ok(Json(UploadResponse { image_url }))
}

async fn store_image_field(
    state: &AppState,
    multipart: &mut Multipart,
) -> Result<String, AppError> {
    let policy = state.upload_policy;

    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            debug!("skipping multipart field {:?}", field.name());
            continue;
        }

        let checked = policy.check_type(field.file_name(), field.content_type());

        // Read the field to the end even when it is rejected.
        let mut buffer = BytesMut::new();
        let mut received = 0usize;
        while let Some(chunk) = field.chunk().await? {
            received += chunk.len();
            if checked.is_ok() && received <= policy.max_bytes {
                buffer.extend_from_slice(&chunk);
            }
        }
        drop(field);
        let (extension, kind) = checked?;
        policy.check_size(received)?;

        let image_url = state
            .images
            .store(ValidatedUpload {
                bytes: buffer.freeze(),
                extension,
                kind,
            })
            .await?;
        return Ok(image_url);
    }

    Err(UploadError::MissingFile.into())
}

/// `GET /uploads/{filename}`: stream a stored image back.
///
/// Every reply under `/uploads`, including a 404, carries the
/// cross-origin resource policy.
pub async fn serve_upload(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Response {
    let mut response = match open_upload(&state, &filename).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    };
    response.headers_mut().insert(
        CROSS_ORIGIN_RESOURCE_POLICY,
        HeaderValue::from_static("cross-origin"),
    );
    response
}

async fn open_upload(state: &AppState, filename: &str) -> Result<Response, AppError> {
    let image = state
        .images
        .open(filename)
        .await?
        .ok_or_else(|| AppError::not_found("Image not found"))?;

    let mut response = Response::new(Body::from_stream(image.body));
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(image.content_type),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(image.len));
    Ok(response)
}
