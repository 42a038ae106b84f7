/// Integration tests for image upload, retrieval and deletion
///
/// Run with: cargo test --test image_service_tests

mod common;

use async_trait::async_trait;
use bytes::Bytes;
use common::{create_user, png_bytes, test_pool};
use std::sync::Arc;
use std::time::Duration;
use vesselmark_shared::models::image::Image;
use vesselmark_shared::services::{
    image::{ImageUpload, DEFAULT_READ_TIMEOUT},
    ImageService, ServiceError,
};
use vesselmark_shared::storage::{memory::MemoryBlobStore, BlobStore, StorageError, StorageResult};

/// Store whose writes always fail
struct FailingBlobStore;

#[async_trait]
impl BlobStore for FailingBlobStore {
    fn name(&self) -> &str {
        "failing"
    }

    async fn put(&self, _key: &str, _content: Bytes, _content_type: &str) -> StorageResult<()> {
        Err(StorageError::Backend("disk full".to_string()))
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        Err(StorageError::NotFound(key.to_string()))
    }

    async fn delete(&self, _key: &str) -> StorageResult<bool> {
        Ok(false)
    }

    async fn exists(&self, _key: &str) -> StorageResult<bool> {
        Ok(false)
    }
}

/// Store whose reads never complete
struct StalledBlobStore;

#[async_trait]
impl BlobStore for StalledBlobStore {
    fn name(&self) -> &str {
        "stalled"
    }

    async fn put(&self, _key: &str, _content: Bytes, _content_type: &str) -> StorageResult<()> {
        Ok(())
    }

    async fn get(&self, _key: &str) -> StorageResult<Bytes> {
        futures::future::pending().await
    }

    async fn delete(&self, _key: &str) -> StorageResult<bool> {
        Ok(false)
    }

    async fn exists(&self, _key: &str) -> StorageResult<bool> {
        Ok(true)
    }
}

fn upload(filename: &str, content_type: &str, category: &str) -> ImageUpload {
    ImageUpload {
        filename: filename.to_string(),
        content_type: content_type.to_string(),
        content: png_bytes(),
        category: category.to_string(),
        title: None,
    }
}

#[tokio::test]
async fn test_upload_and_read_back() {
    let pool = test_pool().await.unwrap();
    let user = create_user(&pool, "oidc|alice").await.unwrap();
    let blobs = MemoryBlobStore::new();
    let service = ImageService::new(pool.clone(), Arc::new(blobs.clone()));

    let image = service
        .upload(&user, upload("fundus.png", "image/png", "retina"))
        .await
        .unwrap();

    assert_eq!(image.title, "fundus.png");
    assert_eq!(image.category, "retina");
    assert_eq!(image.uploader_id, user.id);
    assert_eq!(image.size_bytes, png_bytes().len() as i64);
    assert_eq!(image.checksum.len(), 64);
    assert!(blobs.exists(&image.id.to_string()).await.unwrap());

    let content = service.content(image.id).await.unwrap();
    assert_eq!(content.content, png_bytes());
    assert_eq!(content.image.content_type, "image/png");
}

#[tokio::test]
async fn test_upload_uses_explicit_title() {
    let pool = test_pool().await.unwrap();
    let user = create_user(&pool, "oidc|alice").await.unwrap();
    let service = ImageService::new(pool, Arc::new(MemoryBlobStore::new()));

    let mut request = upload("IMG_0001.JPG", "IMAGE/JPEG", "retina");
    request.title = Some("Left eye".to_string());

    let image = service.upload(&user, request).await.unwrap();
    assert_eq!(image.title, "Left eye");
    assert_eq!(image.content_type, "image/jpeg");
}

#[tokio::test]
async fn test_upload_validation_order() {
    let pool = test_pool().await.unwrap();
    let user = create_user(&pool, "oidc|alice").await.unwrap();
    let service = ImageService::new(pool.clone(), Arc::new(MemoryBlobStore::new()));

    // Missing filename wins over every other problem
    let result = service.upload(&user, upload("", "text/plain", "")).await;
    assert!(matches!(result, Err(ServiceError::BadRequest(_))));

    let result = service.upload(&user, upload("a.txt", "text/plain", "")).await;
    assert!(matches!(result, Err(ServiceError::BadRequest(_))));

    let mut empty = upload("a.txt", "text/plain", "retina");
    empty.content = Bytes::new();
    let result = service.upload(&user, empty).await;
    assert!(matches!(result, Err(ServiceError::UnsupportedMediaType(_))));

    let mut empty = upload("a.png", "image/png", "retina");
    empty.content = Bytes::new();
    let result = service.upload(&user, empty).await;
    assert!(matches!(result, Err(ServiceError::BadRequest(_))));

    assert!(Image::list(&pool).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_disallowed_content_type_creates_no_row() {
    let pool = test_pool().await.unwrap();
    let user = create_user(&pool, "oidc|alice").await.unwrap();
    let blobs = MemoryBlobStore::new();
    let service = ImageService::new(pool.clone(), Arc::new(blobs.clone()));

    let result = service
        .upload(&user, upload("scan.gif", "image/gif", "retina"))
        .await;
    assert!(matches!(result, Err(ServiceError::UnsupportedMediaType(_))));

    assert!(Image::list(&pool).await.unwrap().is_empty());
    assert!(blobs.is_empty().await);
}

#[tokio::test]
async fn test_failed_blob_write_leaves_no_row() {
    let pool = test_pool().await.unwrap();
    let user = create_user(&pool, "oidc|alice").await.unwrap();
    let service = ImageService::new(pool.clone(), Arc::new(FailingBlobStore));

    let result = service
        .upload(&user, upload("fundus.png", "image/png", "retina"))
        .await;
    assert!(matches!(result, Err(ServiceError::Storage(_))));

    let (rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM images")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(rows, 0);
}

#[tokio::test]
async fn test_content_missing_blob_is_not_found() {
    let pool = test_pool().await.unwrap();
    let user = create_user(&pool, "oidc|alice").await.unwrap();
    let blobs = MemoryBlobStore::new();
    let service = ImageService::new(pool, Arc::new(blobs.clone()));

    let image = service
        .upload(&user, upload("fundus.png", "image/png", "retina"))
        .await
        .unwrap();
    blobs.delete(&image.blob_key()).await.unwrap();

    let result = service.content(image.id).await;
    assert!(matches!(result, Err(ServiceError::NotFound(_))));

    let result = service.content(image.id + 1).await;
    assert!(matches!(result, Err(ServiceError::NotFound(_))));
}

#[tokio::test]
async fn test_content_read_timeout_is_unavailable() {
    let pool = test_pool().await.unwrap();
    let user = create_user(&pool, "oidc|alice").await.unwrap();
    let service = ImageService::new(pool, Arc::new(StalledBlobStore))
        .with_read_timeout(Duration::from_millis(50));

    let image = service
        .upload(&user, upload("fundus.png", "image/png", "retina"))
        .await
        .unwrap();

    let result = service.content(image.id).await;
    assert!(matches!(result, Err(ServiceError::Unavailable(_))));
}

#[tokio::test]
async fn test_filtered_image_set_returns_live_matches_only() {
    let pool = test_pool().await.unwrap();
    let user = create_user(&pool, "oidc|alice").await.unwrap();
    let service = ImageService::new(pool, Arc::new(MemoryBlobStore::new()));

    let a = service
        .upload(&user, upload("a.png", "image/png", "retina"))
        .await
        .unwrap();
    let b = service
        .upload(&user, upload("b.png", "image/png", "retina"))
        .await
        .unwrap();
    service
        .upload(&user, upload("c.png", "image/png", "Retina"))
        .await
        .unwrap();
    service
        .upload(&user, upload("d.webp", "image/webp", "coronary"))
        .await
        .unwrap();

    service.delete(b.id).await.unwrap();

    let retina = service.filtered_image_set("retina").await.unwrap();
    let ids: Vec<i64> = retina.iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![a.id]);
    assert!(retina.iter().all(|i| i.category == "retina" && !i.is_deleted));

    assert!(service.filtered_image_set("unknown").await.unwrap().is_empty());
    assert_eq!(service.overview().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_delete_keeps_blob_and_hides_row() {
    let pool = test_pool().await.unwrap();
    let user = create_user(&pool, "oidc|alice").await.unwrap();
    let blobs = MemoryBlobStore::new();
    let service = ImageService::new(pool, Arc::new(blobs.clone()));

    let image = service
        .upload(&user, upload("a.png", "image/png", "retina"))
        .await
        .unwrap();

    service.delete(image.id).await.unwrap();
    assert!(service.get(image.id).await.unwrap().is_none());
    assert!(blobs.exists(&image.blob_key()).await.unwrap());

    let again = service.delete(image.id).await;
    assert!(matches!(again, Err(ServiceError::NotFound(_))));
}

#[test]
fn test_default_read_timeout() {
    assert_eq!(DEFAULT_READ_TIMEOUT, Duration::from_secs(30));
}
