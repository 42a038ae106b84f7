/// Dataset lifecycle and image membership
///
/// # Rules
///
/// - Soft-deleted datasets behave as if they did not exist.
/// - An image-id list must not contain duplicates (bad request) and every id
///   must reference a live image (not found).
/// - `set_images` replaces the whole ordered entry list; `append_images`
///   adds after the current last entry. Failed validation changes nothing.
///
/// # Example
///
/// ```no_run
/// use vesselmark_shared::services::{dataset::NewDataset, DatasetService};
/// # use vesselmark_shared::models::user::User;
///
/// # async fn example(pool: sqlx::SqlitePool, creator: User) -> Result<(), Box<dyn std::error::Error>> {
/// let datasets = DatasetService::new(pool);
///
/// let created = datasets
///     .create(&creator, NewDataset {
///         title: "Retina batch 1".to_string(),
///         category: "retina".to_string(),
///         image_ids: vec![],
///     })
///     .await?;
///
/// let updated = datasets.set_images(created.id, &[3, 1, 2]).await?;
/// assert_eq!(updated.image_ids, vec![3, 1, 2]);
/// # Ok(())
/// # }
/// ```

use super::{first_duplicate, validation_message, ServiceError, ServiceResult};
use crate::models::{
    dataset::{CreateDataset, Dataset, DatasetEntry, DatasetOverview},
    image::Image,
    user::User,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashSet;
use tracing::info;
use validator::Validate;

/// Request to create a dataset
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewDataset {
    #[validate(length(min = 1, max = 200, message = "Title is required (at most 200 characters)"))]
    pub title: String,

    #[validate(length(min = 1, max = 200, message = "Category is required (at most 200 characters)"))]
    pub category: String,

    /// Optional initial images, in order
    #[serde(default)]
    pub image_ids: Vec<i64>,
}

/// A dataset with its ordered live image ids
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetDetail {
    pub id: i64,
    pub title: String,
    pub category: String,
    pub creator_id: i64,
    pub created_at: DateTime<Utc>,
    pub image_ids: Vec<i64>,
}

/// Dataset operations over the database
#[derive(Debug, Clone)]
pub struct DatasetService {
    db: SqlitePool,
}

impl DatasetService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// All live datasets with their live image counts
    pub async fn overview(&self) -> ServiceResult<Vec<DatasetOverview>> {
        Ok(Dataset::overview(&self.db).await?)
    }

    /// One live dataset with its ordered image ids, or `None`
    pub async fn get_by_id(&self, id: i64) -> ServiceResult<Option<DatasetDetail>> {
        let dataset = Dataset::find_by_id(&mut *self.db.acquire().await?, id).await?;

        match dataset {
            Some(dataset) => Ok(Some(self.detail(dataset).await?)),
            None => Ok(None),
        }
    }

    /// Creates a dataset, optionally seeded with images
    ///
    /// # Errors
    ///
    /// - `BadRequest` if title or category is blank or too long, or the
    ///   image list has duplicates
    /// - `NotFound` if an image id does not reference a live image
    pub async fn create(&self, creator: &User, request: NewDataset) -> ServiceResult<DatasetDetail> {
        let request = NewDataset {
            title: request.title.trim().to_string(),
            category: request.category.trim().to_string(),
            image_ids: request.image_ids,
        };

        request
            .validate()
            .map_err(|e| ServiceError::BadRequest(validation_message(&e)))?;

        let mut tx = self.db.begin().await?;
        ensure_live_images(&mut tx, &request.image_ids).await?;

        let dataset = Dataset::create(
            &mut tx,
            CreateDataset {
                title: request.title,
                category: request.category,
                creator_id: creator.id,
            },
        )
        .await?;

        if !request.image_ids.is_empty() {
            DatasetEntry::replace(&mut tx, dataset.id, &request.image_ids).await?;
        }

        tx.commit().await?;

        info!(
            dataset_id = dataset.id,
            creator_id = creator.id,
            images = request.image_ids.len(),
            "Dataset created"
        );

        self.detail(dataset).await
    }

    /// Soft-deletes a dataset
    ///
    /// # Errors
    ///
    /// `NotFound` if the dataset is absent or already deleted
    pub async fn delete(&self, id: i64) -> ServiceResult<()> {
        if !Dataset::soft_delete(&self.db, id).await? {
            return Err(ServiceError::NotFound(format!("Dataset {} not found", id)));
        }

        info!(dataset_id = id, "Dataset deleted");
        Ok(())
    }

    /// Replaces a dataset's images with `image_ids`, in order
    ///
    /// # Errors
    ///
    /// - `NotFound` if the dataset is absent or deleted
    /// - `BadRequest` if `image_ids` contains a duplicate
    /// - `NotFound` if an id does not reference a live image
    pub async fn set_images(&self, id: i64, image_ids: &[i64]) -> ServiceResult<DatasetDetail> {
        let mut tx = self.db.begin().await?;
        let dataset = live_dataset(&mut tx, id).await?;
        ensure_live_images(&mut tx, image_ids).await?;

        DatasetEntry::replace(&mut tx, id, image_ids).await?;
        tx.commit().await?;

        info!(dataset_id = id, images = image_ids.len(), "Dataset images replaced");
        self.detail(dataset).await
    }

    /// Appends images after the dataset's current entries
    ///
    /// # Errors
    ///
    /// Same as [`set_images`](Self::set_images), plus `BadRequest` when an id
    /// is already part of the dataset.
    pub async fn append_images(&self, id: i64, image_ids: &[i64]) -> ServiceResult<DatasetDetail> {
        let mut tx = self.db.begin().await?;
        let dataset = live_dataset(&mut tx, id).await?;
        ensure_live_images(&mut tx, image_ids).await?;

        let members: HashSet<i64> = DatasetEntry::all_image_ids(&mut tx, id)
            .await?
            .into_iter()
            .collect();
        if let Some(existing) = image_ids.iter().find(|image_id| members.contains(*image_id)) {
            return Err(ServiceError::BadRequest(format!(
                "Image {} is already part of dataset {}",
                existing, id
            )));
        }

        DatasetEntry::append(&mut tx, id, image_ids).await?;
        tx.commit().await?;

        info!(dataset_id = id, images = image_ids.len(), "Dataset images appended");
        self.detail(dataset).await
    }

    async fn detail(&self, dataset: Dataset) -> ServiceResult<DatasetDetail> {
        let image_ids = DatasetEntry::image_ids(&self.db, dataset.id).await?;

        Ok(DatasetDetail {
            id: dataset.id,
            title: dataset.title,
            category: dataset.category,
            creator_id: dataset.creator_id,
            created_at: dataset.created_at,
            image_ids,
        })
    }
}

async fn live_dataset(conn: &mut SqliteConnection, id: i64) -> ServiceResult<Dataset> {
    Dataset::find_by_id(conn, id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Dataset {} not found", id)))
}

/// Rejects duplicate ids and ids without a live image
async fn ensure_live_images(conn: &mut SqliteConnection, image_ids: &[i64]) -> ServiceResult<()> {
    if let Some(duplicate) = first_duplicate(image_ids) {
        return Err(ServiceError::BadRequest(format!(
            "Image {} appears more than once",
            duplicate
        )));
    }

    let existing: HashSet<i64> = Image::existing_ids(conn, image_ids)
        .await?
        .into_iter()
        .collect();
    let missing: Vec<String> = image_ids
        .iter()
        .filter(|id| !existing.contains(*id))
        .map(|id| id.to_string())
        .collect();

    if !missing.is_empty() {
        return Err(ServiceError::NotFound(format!(
            "Images not found: {}",
            missing.join(", ")
        )));
    }

    Ok(())
}
