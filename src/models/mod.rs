//! Core data models for the portfolio service.
//!
//! Stored entities map to database tables via `sqlx::FromRow` and serialize
//! as camelCase JSON via `serde`. Request bodies are separate structs with an
//! explicit `validate` step.

use serde::{Deserialize, Deserializer};
use thiserror::Error;

pub mod collection;
pub mod photo;

/// Why a request body was rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("`{0}` must not be empty")]
    Empty(&'static str),
    #[error("`{field}` is malformed: {reason}")]
    Malformed { field: &'static str, reason: String },
}

/// Deserialize a present field (even `null`) as `Some(..)`.
///
/// Combined with `#[serde(default)]` this lets patches tell an absent field
/// (`None`) apart from an explicit `null` (`Some(None)`).
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
