/// Dataset and dataset entry models
///
/// A dataset is an ordered collection of images. Membership is stored as
/// `dataset_entries` rows carrying an explicit `order_number`.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE datasets (
///     id INTEGER PRIMARY KEY AUTOINCREMENT,
///     title TEXT NOT NULL,
///     category TEXT NOT NULL,
///     creator_id INTEGER NOT NULL REFERENCES users(id),
///     created_at TEXT NOT NULL,
///     is_deleted INTEGER NOT NULL DEFAULT 0
/// );
///
/// CREATE TABLE dataset_entries (
///     dataset_id INTEGER NOT NULL REFERENCES datasets(id),
///     image_id INTEGER NOT NULL REFERENCES images(id),
///     order_number INTEGER NOT NULL,
///     PRIMARY KEY (dataset_id, image_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};

/// Dataset row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Dataset {
    pub id: i64,
    pub title: String,
    pub category: String,
    pub creator_id: i64,
    pub created_at: DateTime<Utc>,
    pub is_deleted: bool,
}

/// Dataset row with the number of live images it holds
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DatasetOverview {
    pub id: i64,
    pub title: String,
    pub category: String,
    pub creator_id: i64,
    pub created_at: DateTime<Utc>,
    pub image_count: i64,
}

/// One image's membership and position within one dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct DatasetEntry {
    pub dataset_id: i64,
    pub image_id: i64,
    pub order_number: i64,
}

/// Input for creating a dataset
#[derive(Debug, Clone)]
pub struct CreateDataset {
    pub title: String,
    pub category: String,
    pub creator_id: i64,
}

impl Dataset {
    /// Inserts a new dataset
    pub async fn create(
        conn: &mut SqliteConnection,
        data: CreateDataset,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Dataset>(
            r#"
            INSERT INTO datasets (title, category, creator_id, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING id, title, category, creator_id, created_at, is_deleted
            "#,
        )
        .bind(data.title)
        .bind(data.category)
        .bind(data.creator_id)
        .bind(Utc::now())
        .fetch_one(conn)
        .await
    }

    /// Finds a live dataset by id
    pub async fn find_by_id(
        conn: &mut SqliteConnection,
        id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Dataset>(
            r#"
            SELECT id, title, category, creator_id, created_at, is_deleted
            FROM datasets
            WHERE id = ? AND is_deleted = 0
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await
    }

    /// Lists live datasets with their live image counts
    pub async fn overview(pool: &SqlitePool) -> Result<Vec<DatasetOverview>, sqlx::Error> {
        sqlx::query_as::<_, DatasetOverview>(
            r#"
            SELECT d.id, d.title, d.category, d.creator_id, d.created_at,
                   COUNT(i.id) AS image_count
            FROM datasets d
            LEFT JOIN dataset_entries e ON e.dataset_id = d.id
            LEFT JOIN images i ON i.id = e.image_id AND i.is_deleted = 0
            WHERE d.is_deleted = 0
            GROUP BY d.id
            ORDER BY d.id
            "#,
        )
        .fetch_all(pool)
        .await
    }

    /// Flags a live dataset as deleted
    ///
    /// Returns false if the dataset does not exist or was already deleted.
    pub async fn soft_delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE datasets SET is_deleted = 1 WHERE id = ? AND is_deleted = 0")
                .bind(id)
                .execute(pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }
}

impl DatasetEntry {
    /// Entries of a dataset in order, skipping soft-deleted images
    pub async fn list_for_dataset(
        pool: &SqlitePool,
        dataset_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, DatasetEntry>(
            r#"
            SELECT e.dataset_id, e.image_id, e.order_number
            FROM dataset_entries e
            JOIN images i ON i.id = e.image_id
            WHERE e.dataset_id = ? AND i.is_deleted = 0
            ORDER BY e.order_number
            "#,
        )
        .bind(dataset_id)
        .fetch_all(pool)
        .await
    }

    /// Ordered image ids of a dataset, skipping soft-deleted images
    pub async fn image_ids(pool: &SqlitePool, dataset_id: i64) -> Result<Vec<i64>, sqlx::Error> {
        let entries = Self::list_for_dataset(pool, dataset_id).await?;
        Ok(entries.into_iter().map(|e| e.image_id).collect())
    }

    /// Every image id ever attached to the dataset, including deleted images
    pub async fn all_image_ids(
        conn: &mut SqliteConnection,
        dataset_id: i64,
    ) -> Result<Vec<i64>, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT image_id FROM dataset_entries WHERE dataset_id = ? ORDER BY order_number",
        )
        .bind(dataset_id)
        .fetch_all(conn)
        .await
    }

    /// Replaces all entries of a dataset with `image_ids`, in order
    ///
    /// Order numbers are assigned 0..n following the slice order. Callers
    /// run this inside a transaction so a failure leaves the old entries.
    pub async fn replace(
        conn: &mut SqliteConnection,
        dataset_id: i64,
        image_ids: &[i64],
    ) -> Result<u64, sqlx::Error> {
        sqlx::query("DELETE FROM dataset_entries WHERE dataset_id = ?")
            .bind(dataset_id)
            .execute(&mut *conn)
            .await?;

        let mut inserted = 0;
        for (order, image_id) in image_ids.iter().enumerate() {
            let result = sqlx::query(
                "INSERT INTO dataset_entries (dataset_id, image_id, order_number) VALUES (?, ?, ?)",
            )
            .bind(dataset_id)
            .bind(image_id)
            .bind(order as i64)
            .execute(&mut *conn)
            .await?;
            inserted += result.rows_affected();
        }

        Ok(inserted)
    }

    /// Appends `image_ids` after the dataset's current last entry
    ///
    /// Callers must make sure none of the ids is already a member.
    pub async fn append(
        conn: &mut SqliteConnection,
        dataset_id: i64,
        image_ids: &[i64],
    ) -> Result<u64, sqlx::Error> {
        let next: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(order_number) + 1, 0) FROM dataset_entries WHERE dataset_id = ?",
        )
        .bind(dataset_id)
        .fetch_one(&mut *conn)
        .await?;

        let mut inserted = 0;
        for (offset, image_id) in image_ids.iter().enumerate() {
            let result = sqlx::query(
                "INSERT INTO dataset_entries (dataset_id, image_id, order_number) VALUES (?, ?, ?)",
            )
            .bind(dataset_id)
            .bind(image_id)
            .bind(next + offset as i64)
            .execute(&mut *conn)
            .await?;
            inserted += result.rows_affected();
        }

        Ok(inserted)
    }
}
