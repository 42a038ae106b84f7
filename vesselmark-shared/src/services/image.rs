/// Image upload and retrieval
///
/// An upload is checked in a fixed order: filename, category, content type,
/// then content. The metadata row is inserted first to obtain the id that
/// keys the blob; if the blob write then fails the row is removed again.
/// That compensation is best-effort: a crash between the two writes can
/// still leave a row without content, which `content()` reports as not
/// found.

use super::{ServiceError, ServiceResult};
use crate::models::{
    image::{CreateImage, Image},
    user::User,
};
use crate::storage::{BlobStore, StorageError};
use bytes::Bytes;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use sqlx::SqlitePool;
use tracing::{error, info, warn};

/// Content types accepted for upload
pub const ALLOWED_CONTENT_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

/// Default bound on a single blob read
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// An image upload request
#[derive(Debug, Clone)]
pub struct ImageUpload {
    /// Original file name
    pub filename: String,

    /// MIME type as declared by the client
    pub content_type: String,

    /// Raw bytes
    pub content: Bytes,

    pub category: String,

    /// Defaults to the filename
    pub title: Option<String>,
}

/// Image metadata together with its bytes
#[derive(Debug, Clone)]
pub struct ImageContent {
    pub image: Image,
    pub content: Bytes,
}

/// Lowercases a MIME type and strips parameters such as `; charset=...`
pub fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Image operations over the database and blob store
#[derive(Clone)]
pub struct ImageService {
    db: SqlitePool,
    blobs: Arc<dyn BlobStore>,
    read_timeout: Duration,
}

impl ImageService {
    pub fn new(db: SqlitePool, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            db,
            blobs,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    /// Overrides the blob read timeout
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Stores a new image
    ///
    /// # Errors
    ///
    /// - `BadRequest` if filename or category is missing, or content is empty
    /// - `UnsupportedMediaType` if the content type is not JPEG, PNG or WebP
    /// - `Storage` if the blob write fails (the metadata row is rolled back)
    pub async fn upload(&self, uploader: &User, upload: ImageUpload) -> ServiceResult<Image> {
        let filename = upload.filename.trim();
        if filename.is_empty() {
            return Err(ServiceError::BadRequest("Filename is required".to_string()));
        }

        let category = upload.category.trim();
        if category.is_empty() {
            return Err(ServiceError::BadRequest("Category is required".to_string()));
        }

        let content_type = normalize_content_type(&upload.content_type);
        if !ALLOWED_CONTENT_TYPES.contains(&content_type.as_str()) {
            return Err(ServiceError::UnsupportedMediaType(format!(
                "Content type '{}' is not supported; expected one of {}",
                upload.content_type,
                ALLOWED_CONTENT_TYPES.join(", ")
            )));
        }

        if upload.content.is_empty() {
            return Err(ServiceError::BadRequest("Image content is empty".to_string()));
        }

        let title = upload
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(filename)
            .to_string();

        let image = Image::create(
            &self.db,
            CreateImage {
                title,
                category: category.to_string(),
                uploader_id: uploader.id,
                content_type: content_type.clone(),
                size_bytes: upload.content.len() as i64,
                checksum: hex::encode(Sha256::digest(&upload.content)),
            },
        )
        .await?;

        if let Err(e) = self
            .blobs
            .put(&image.blob_key(), upload.content.clone(), &content_type)
            .await
        {
            error!(
                image_id = image.id,
                backend = self.blobs.name(),
                error = %e,
                "Blob upload failed, removing metadata row"
            );

            match Image::purge(&self.db, image.id).await {
                Ok(_) => warn!(image_id = image.id, "Upload rolled back"),
                Err(purge_err) => error!(
                    image_id = image.id,
                    error = %purge_err,
                    "Failed to roll back image row; metadata is orphaned"
                ),
            }

            return Err(e.into());
        }

        info!(
            image_id = image.id,
            uploader_id = uploader.id,
            size_bytes = image.size_bytes,
            content_type = %image.content_type,
            "Image uploaded"
        );

        Ok(image)
    }

    /// Live image metadata, or `None`
    pub async fn get(&self, id: i64) -> ServiceResult<Option<Image>> {
        Ok(Image::find_by_id(&self.db, id).await?)
    }

    /// Live image metadata and bytes
    ///
    /// # Errors
    ///
    /// - `NotFound` if the image is absent, deleted, or has no stored blob
    /// - `Unavailable` if the blob read exceeds the read timeout
    pub async fn content(&self, id: i64) -> ServiceResult<ImageContent> {
        let image = Image::find_by_id(&self.db, id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Image {} not found", id)))?;

        let read = tokio::time::timeout(self.read_timeout, self.blobs.get(&image.blob_key())).await;

        let content = match read {
            Ok(Ok(content)) => content,
            Ok(Err(StorageError::NotFound(_))) => {
                warn!(image_id = id, "Image row has no stored content");
                return Err(ServiceError::NotFound(format!(
                    "Content for image {} not found",
                    id
                )));
            }
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                warn!(image_id = id, timeout = ?self.read_timeout, "Blob read timed out");
                return Err(ServiceError::Unavailable(
                    "Timed out reading image content".to_string(),
                ));
            }
        };

        Ok(ImageContent { image, content })
    }

    /// All live images
    pub async fn overview(&self) -> ServiceResult<Vec<Image>> {
        Ok(Image::list(&self.db).await?)
    }

    /// Live images whose category equals `category`
    pub async fn filtered_image_set(&self, category: &str) -> ServiceResult<Vec<Image>> {
        Ok(Image::list_by_category(&self.db, category).await?)
    }

    /// Soft-deletes an image; its blob is kept
    ///
    /// # Errors
    ///
    /// `NotFound` if the image is absent or already deleted
    pub async fn delete(&self, id: i64) -> ServiceResult<()> {
        if !Image::soft_delete(&self.db, id).await? {
            return Err(ServiceError::NotFound(format!("Image {} not found", id)));
        }

        info!(image_id = id, "Image deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_content_type() {
        assert_eq!(normalize_content_type("image/PNG"), "image/png");
        assert_eq!(normalize_content_type("image/jpeg; charset=binary"), "image/jpeg");
        assert_eq!(normalize_content_type(""), "");
    }

    #[test]
    fn test_allow_list() {
        assert!(ALLOWED_CONTENT_TYPES.contains(&"image/webp"));
        assert!(!ALLOWED_CONTENT_TYPES.contains(&"image/gif"));
    }
}
