//! Represents a collection, a titled group of photos shown together.

use super::{ValidationError, double_option};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A photography collection as stored in the `collections` table.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    /// Server-generated identifier.
    pub id: Uuid,

    /// Display name shown on cards and headers.
    pub title: String,

    /// Optional free-text description.
    pub description: Option<String>,

    /// Optional URL of a representative image.
    pub cover_image_url: Option<String>,

    /// When this collection was created.
    pub created_at: DateTime<Utc>,
}

/// Request body for `POST /api/collections`.
#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct NewCollection {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cover_image_url: Option<String>,
}

impl NewCollection {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_title(&self.title)
    }
}

/// Request body for `PUT /api/collections/{id}`.
///
/// Absent fields are left untouched. `description` and `coverImageUrl` can be
/// cleared by sending an explicit `null`, which deserializes to `Some(None)`.
#[derive(Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct CollectionPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub cover_image_url: Option<Option<String>>,
}

impl CollectionPatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match &self.title {
            Some(title) => validate_title(title),
            None => Ok(()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.cover_image_url.is_none()
    }
}

fn validate_title(title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::Empty("title"));
    }
    Ok(())
}
