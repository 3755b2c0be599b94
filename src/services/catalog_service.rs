//! src/services/catalog_service.rs
//!
//! Catalog: persistence for collections and photos. `SqliteCatalog` keeps
//! both tables in SQLite; a collection's photos are removed by the
//! `ON DELETE CASCADE` foreign key, never by application code.

use crate::models::{
    collection::{Collection, CollectionPatch, NewCollection},
    photo::{NewPhoto, Photo, PhotoPatch},
};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, SqlitePool, sqlite::Sqlite};
use std::{collections::BTreeMap, sync::Arc};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("collection `{0}` does not exist")]
    UnknownCollection(Uuid),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Persistence operations behind the HTTP API.
///
/// Lookups on unknown ids return `Ok(None)`; deletes succeed whether or not
/// the row existed.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn list_collections(&self) -> CatalogResult<Vec<Collection>>;
    async fn get_collection(&self, id: Uuid) -> CatalogResult<Option<Collection>>;
    async fn create_collection(&self, input: NewCollection) -> CatalogResult<Collection>;
    async fn update_collection(
        &self,
        id: Uuid,
        patch: CollectionPatch,
    ) -> CatalogResult<Option<Collection>>;
    async fn delete_collection(&self, id: Uuid) -> CatalogResult<()>;

    async fn list_photos(&self) -> CatalogResult<Vec<Photo>>;
    async fn get_photo(&self, id: Uuid) -> CatalogResult<Option<Photo>>;
    async fn list_photos_by_collection(&self, collection_id: Uuid) -> CatalogResult<Vec<Photo>>;
    async fn create_photo(&self, input: NewPhoto) -> CatalogResult<Photo>;
    async fn update_photo(&self, id: Uuid, patch: PhotoPatch) -> CatalogResult<Option<Photo>>;
    async fn delete_photo(&self, id: Uuid) -> CatalogResult<()>;

    /// Number of photos per collection. Collections without photos are absent.
    async fn photo_counts(&self) -> CatalogResult<BTreeMap<Uuid, i64>>;

    /// Cheap round trip to the backing store.
    async fn ping(&self) -> CatalogResult<()>;
}

const COLLECTION_COLUMNS: &str = "id, title, description, cover_image_url, created_at";
const PHOTO_COLUMNS: &str =
    "id, collection_id, image_url, alt, aspect_ratio, sort_order, created_at";
const PHOTO_ORDER: &str = "sort_order ASC, created_at ASC, rowid ASC";

/// SQLite-backed catalog.
#[derive(Clone)]
pub struct SqliteCatalog {
    /// Shared SQLite connection pool. Must have foreign keys enabled.
    pub db: Arc<SqlitePool>,
}

impl SqliteCatalog {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Catalog for SqliteCatalog {
    async fn list_collections(&self) -> CatalogResult<Vec<Collection>> {
        let rows = sqlx::query_as::<_, Collection>(&format!(
            "SELECT {COLLECTION_COLUMNS} FROM collections ORDER BY created_at DESC, rowid DESC"
        ))
        .fetch_all(&*self.db)
        .await?;
        Ok(rows)
    }

    async fn get_collection(&self, id: Uuid) -> CatalogResult<Option<Collection>> {
        let row = sqlx::query_as::<_, Collection>(&format!(
            "SELECT {COLLECTION_COLUMNS} FROM collections WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&*self.db)
        .await?;
        Ok(row)
    }

    async fn create_collection(&self, input: NewCollection) -> CatalogResult<Collection> {
        let collection = sqlx::query_as::<_, Collection>(&format!(
            "INSERT INTO collections (id, title, description, cover_image_url, created_at)
             VALUES (?, ?, ?, ?, ?)
             RETURNING {COLLECTION_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(input.title)
        .bind(input.description)
        .bind(input.cover_image_url)
        .bind(Utc::now())
        .fetch_one(&*self.db)
        .await?;

        info!(id = %collection.id, "created collection");
        Ok(collection)
    }

    async fn update_collection(
        &self,
        id: Uuid,
        patch: CollectionPatch,
    ) -> CatalogResult<Option<Collection>> {
        if patch.is_empty() {
            return self.get_collection(id).await;
        }

        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE collections SET ");
        let mut fields = builder.separated(", ");
        if let Some(title) = patch.title {
            fields.push("title = ").push_bind_unseparated(title);
        }
        if let Some(description) = patch.description {
            fields.push("description = ").push_bind_unseparated(description);
        }
        if let Some(cover) = patch.cover_image_url {
            fields.push("cover_image_url = ").push_bind_unseparated(cover);
        }
        builder.push(" WHERE id = ");
        builder.push_bind(id);
        builder.push(" RETURNING ");
        builder.push(COLLECTION_COLUMNS);

        let updated = builder
            .build_query_as::<Collection>()
            .fetch_optional(&*self.db)
            .await?;

        match &updated {
            Some(_) => info!(%id, "updated collection"),
            None => debug!(%id, "update skipped, collection not found"),
        }
        Ok(updated)
    }

    async fn delete_collection(&self, id: Uuid) -> CatalogResult<()> {
        let result = sqlx::query("DELETE FROM collections WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;
        info!(%id, removed = result.rows_affected(), "deleted collection");
        Ok(())
    }

    async fn list_photos(&self) -> CatalogResult<Vec<Photo>> {
        let rows = sqlx::query_as::<_, Photo>(&format!(
            "SELECT {PHOTO_COLUMNS} FROM photos ORDER BY {PHOTO_ORDER}"
        ))
        .fetch_all(&*self.db)
        .await?;
        Ok(rows)
    }

    async fn get_photo(&self, id: Uuid) -> CatalogResult<Option<Photo>> {
        let row = sqlx::query_as::<_, Photo>(&format!(
            "SELECT {PHOTO_COLUMNS} FROM photos WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&*self.db)
        .await?;
        Ok(row)
    }

    async fn list_photos_by_collection(&self, collection_id: Uuid) -> CatalogResult<Vec<Photo>> {
        let rows = sqlx::query_as::<_, Photo>(&format!(
            "SELECT {PHOTO_COLUMNS} FROM photos WHERE collection_id = ? ORDER BY {PHOTO_ORDER}"
        ))
        .bind(collection_id)
        .fetch_all(&*self.db)
        .await?;
        Ok(rows)
    }

    async fn create_photo(&self, input: NewPhoto) -> CatalogResult<Photo> {
        let collection_id = input.collection_id;
        let photo = sqlx::query_as::<_, Photo>(&format!(
            "INSERT INTO photos (id, collection_id, image_url, alt, aspect_ratio, sort_order, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             RETURNING {PHOTO_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(collection_id)
        .bind(input.image_url)
        .bind(input.alt)
        .bind(input.aspect_ratio)
        .bind(input.order)
        .bind(Utc::now())
        .fetch_one(&*self.db)
        .await
        .map_err(|err| map_foreign_key(err, collection_id))?;

        info!(id = %photo.id, %collection_id, "created photo");
        Ok(photo)
    }

    async fn update_photo(&self, id: Uuid, patch: PhotoPatch) -> CatalogResult<Option<Photo>> {
        if patch.is_empty() {
            return self.get_photo(id).await;
        }

        let target_collection = patch.collection_id;
        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE photos SET ");
        let mut fields = builder.separated(", ");
        if let Some(collection_id) = patch.collection_id {
            fields.push("collection_id = ").push_bind_unseparated(collection_id);
        }
        if let Some(image_url) = patch.image_url {
            fields.push("image_url = ").push_bind_unseparated(image_url);
        }
        if let Some(alt) = patch.alt {
            fields.push("alt = ").push_bind_unseparated(alt);
        }
        if let Some(aspect_ratio) = patch.aspect_ratio {
            fields.push("aspect_ratio = ").push_bind_unseparated(aspect_ratio);
        }
        if let Some(order) = patch.order {
            fields.push("sort_order = ").push_bind_unseparated(order);
        }
        builder.push(" WHERE id = ");
        builder.push_bind(id);
        builder.push(" RETURNING ");
        builder.push(PHOTO_COLUMNS);

        let updated = builder
            .build_query_as::<Photo>()
            .fetch_optional(&*self.db)
            .await
            .map_err(|err| match target_collection {
                Some(collection_id) => map_foreign_key(err, collection_id),
                None => CatalogError::Sqlx(err),
            })?;

        match &updated {
            Some(_) => info!(%id, "updated photo"),
            None => debug!(%id, "update skipped, photo not found"),
        }
        Ok(updated)
    }

    async fn delete_photo(&self, id: Uuid) -> CatalogResult<()> {
        let result = sqlx::query("DELETE FROM photos WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;
        info!(%id, removed = result.rows_affected(), "deleted photo");
        Ok(())
    }

    async fn photo_counts(&self) -> CatalogResult<BTreeMap<Uuid, i64>> {
        let rows: Vec<(Uuid, i64)> = sqlx::query_as(
            "SELECT collection_id, COUNT(*) FROM photos GROUP BY collection_id",
        )
        .fetch_all(&*self.db)
        .await?;
        Ok(rows.into_iter().collect())
    }

    async fn ping(&self) -> CatalogResult<()> {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&*self.db)
            .await?;
        Ok(())
    }
}

/// Turn a foreign-key failure on `photos.collection_id` into
/// `UnknownCollection`; pass everything else through.
fn map_foreign_key(err: sqlx::Error, collection_id: Uuid) -> CatalogError {
    if is_foreign_key_violation(&err) {
        CatalogError::UnknownCollection(collection_id)
    } else {
        CatalogError::Sqlx(err)
    }
}

/// Return true if SQLx error indicates a foreign key constraint violation.
fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation()
            || db_err.message().to_ascii_lowercase().contains("foreign key")
    )
}
