//! Shared handler state.

use crate::services::{
    catalog_service::Catalog,
    upload_service::{ImageStore, UploadPolicy},
};
use std::sync::Arc;

/// Everything a handler needs, built once in `main` and cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn Catalog>,
    pub images: Arc<dyn ImageStore>,
    pub upload_policy: UploadPolicy,
}

impl AppState {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        images: Arc<dyn ImageStore>,
        upload_policy: UploadPolicy,
    ) -> Self {
        Self {
            catalog,
            images,
            upload_policy,
        }
    }
}
