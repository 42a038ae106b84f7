/// Image metadata model and database operations
///
/// Only metadata is stored here. The bytes live in the blob store under
/// [`blob_key`] of the image id.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE images (
///     id INTEGER PRIMARY KEY AUTOINCREMENT,
///     title TEXT NOT NULL,
///     category TEXT NOT NULL,
///     uploader_id INTEGER NOT NULL REFERENCES users(id),
///     content_type TEXT NOT NULL,
///     size_bytes INTEGER NOT NULL,
///     checksum TEXT NOT NULL,
///     created_at TEXT NOT NULL,
///     is_deleted INTEGER NOT NULL DEFAULT 0
/// );
/// ```
///
/// Every read in this module skips soft-deleted rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

/// Uploaded image metadata
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Image {
    pub id: i64,
    pub title: String,
    pub category: String,
    pub uploader_id: i64,
    pub content_type: String,
    pub size_bytes: i64,
    /// Hex-encoded SHA-256 of the uploaded bytes
    pub checksum: String,
    pub created_at: DateTime<Utc>,
    pub is_deleted: bool,
}

/// Input for creating an image row
#[derive(Debug, Clone)]
pub struct CreateImage {
    pub title: String,
    pub category: String,
    pub uploader_id: i64,
    pub content_type: String,
    pub size_bytes: i64,
    pub checksum: String,
}

/// Blob store key for an image id
pub fn blob_key(id: i64) -> String {
    id.to_string()
}

/// Largest number of ids bound into one `IN (...)` lookup
pub const ID_LOOKUP_CHUNK: usize = 500;

const COLUMNS: &str =
    "id, title, category, uploader_id, content_type, size_bytes, checksum, created_at, is_deleted";

impl Image {
    /// Blob store key of this image
    pub fn blob_key(&self) -> String {
        blob_key(self.id)
    }

    /// Inserts a new image row and returns it with its generated id
    pub async fn create(pool: &SqlitePool, data: CreateImage) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO images (title, category, uploader_id, content_type, size_bytes, checksum, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING {COLUMNS}
            "#
        );

        sqlx::query_as::<_, Image>(&query)
            .bind(data.title)
            .bind(data.category)
            .bind(data.uploader_id)
            .bind(data.content_type)
            .bind(data.size_bytes)
            .bind(data.checksum)
            .bind(Utc::now())
            .fetch_one(pool)
            .await
    }

    /// Finds a live image by id
    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM images WHERE id = ? AND is_deleted = 0");

        sqlx::query_as::<_, Image>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lists all live images, oldest first
    pub async fn list(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM images WHERE is_deleted = 0 ORDER BY id");

        sqlx::query_as::<_, Image>(&query).fetch_all(pool).await
    }

    /// Lists live images whose category equals `category` exactly
    pub async fn list_by_category(
        pool: &SqlitePool,
        category: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM images WHERE is_deleted = 0 AND category = ? ORDER BY id"
        );

        sqlx::query_as::<_, Image>(&query)
            .bind(category)
            .fetch_all(pool)
            .await
    }

    /// Returns the subset of `ids` that reference live images
    ///
    /// Ids are looked up in batches of [`ID_LOOKUP_CHUNK`] to stay below
    /// SQLite's bind-parameter limit. Result order is unspecified.
    pub async fn existing_ids(
        conn: &mut SqliteConnection,
        ids: &[i64],
    ) -> Result<Vec<i64>, sqlx::Error> {
        let mut existing = Vec::with_capacity(ids.len());

        for chunk in ids.chunks(ID_LOOKUP_CHUNK) {
            let mut builder = QueryBuilder::<Sqlite>::new(
                "SELECT id FROM images WHERE is_deleted = 0 AND id IN (",
            );
            let mut separated = builder.separated(", ");
            for id in chunk {
                separated.push_bind(*id);
            }
            separated.push_unseparated(")");

            existing.extend(
                builder
                    .build_query_scalar::<i64>()
                    .fetch_all(&mut *conn)
                    .await?,
            );
        }

        Ok(existing)
    }

    /// Flags a live image as deleted
    ///
    /// Returns false if the image does not exist or was already deleted.
    pub async fn soft_delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE images SET is_deleted = 1 WHERE id = ? AND is_deleted = 0")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Removes an image row outright
    ///
    /// Only used to roll back an upload whose blob write failed, before any
    /// dataset could reference the row.
    pub async fn purge(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM images WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
