pub mod catalog_service;
pub mod upload_service;
