//! Represents a photo, one image asset placed inside a collection.

use super::{ValidationError, double_option};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A photo as stored in the `photos` table.
///
/// Photos are displayed by ascending `order`; equal positions fall back to
/// creation time and then insertion order.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    /// Server-generated identifier.
    pub id: Uuid,

    /// Owning collection. Deleting the collection deletes the photo.
    pub collection_id: Uuid,

    /// Public URL of the stored image (usually `/uploads/...`).
    pub image_url: String,

    /// Accessibility text.
    pub alt: String,

    /// Layout hint in the form `width/height`, e.g. `3/2`.
    pub aspect_ratio: Option<String>,

    /// Display position within the collection.
    #[sqlx(rename = "sort_order")]
    pub order: i32,

    /// When this photo was created.
    pub created_at: DateTime<Utc>,
}

/// Request body for `POST /api/photos`.
#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct NewPhoto {
    pub collection_id: Uuid,
    pub image_url: String,
    pub alt: String,
    #[serde(default)]
    pub aspect_ratio: Option<String>,
    #[serde(default)]
    pub order: i32,
}

impl NewPhoto {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_image_url(&self.image_url)?;
        if let Some(ratio) = &self.aspect_ratio {
            validate_aspect_ratio(ratio)?;
        }
        Ok(())
    }
}

/// Request body for `PUT /api/photos/{id}`. Absent fields are left untouched.
#[derive(Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct PhotoPatch {
    #[serde(default)]
    pub collection_id: Option<Uuid>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub aspect_ratio: Option<Option<String>>,
    #[serde(default)]
    pub order: Option<i32>,
}

impl PhotoPatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(url) = &self.image_url {
            validate_image_url(url)?;
        }
        if let Some(Some(ratio)) = &self.aspect_ratio {
            validate_aspect_ratio(ratio)?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.collection_id.is_none()
            && self.image_url.is_none()
            && self.alt.is_none()
            && self.aspect_ratio.is_none()
            && self.order.is_none()
    }
}

fn validate_image_url(url: &str) -> Result<(), ValidationError> {
    if url.trim().is_empty() {
        return Err(ValidationError::Empty("imageUrl"));
    }
    Ok(())
}

/// Accepts `w/h` where both sides are positive finite numbers.
fn validate_aspect_ratio(ratio: &str) -> Result<(), ValidationError> {
    let invalid = || ValidationError::Malformed {
        field: "aspectRatio",
        reason: "expected `width/height` with positive numbers".into(),
    };

    let (width, height) = ratio.split_once('/').ok_or_else(invalid)?;
    for side in [width, height] {
        let value: f64 = side.trim().parse().map_err(|_| invalid())?;
        if !value.is_finite() || value <= 0.0 {
            return Err(invalid());
        }
    }
    Ok(())
}
