//! Shared fixtures for service integration tests
//!
//! Every test gets its own in-memory database with the schema applied.

#![allow(dead_code)]

use bytes::Bytes;
use sqlx::SqlitePool;
use vesselmark_shared::db::{
    migrations::run_migrations,
    pool::{create_pool, DatabaseConfig},
};
use vesselmark_shared::models::{
    image::{CreateImage, Image},
    user::{CreateUser, User},
};

/// A fresh in-memory database with migrations applied
pub async fn test_pool() -> anyhow::Result<SqlitePool> {
    let pool = create_pool(DatabaseConfig::in_memory()).await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

/// Inserts a user with the given subject
pub async fn create_user(pool: &SqlitePool, subject: &str) -> anyhow::Result<User> {
    let user = User::create(
        pool,
        CreateUser {
            subject: subject.to_string(),
            display_name: format!("User {}", subject),
        },
    )
    .await?;

    Ok(user)
}

/// Inserts an image row directly, without blob content
pub async fn create_image(
    pool: &SqlitePool,
    uploader: &User,
    category: &str,
) -> anyhow::Result<Image> {
    let image = Image::create(
        pool,
        CreateImage {
            title: format!("{} scan", category),
            category: category.to_string(),
            uploader_id: uploader.id,
            content_type: "image/png".to_string(),
            size_bytes: 4,
            checksum: "00".repeat(32),
        },
    )
    .await?;

    Ok(image)
}

/// Inserts `count` images in `category` and returns their ids
pub async fn create_images(
    pool: &SqlitePool,
    uploader: &User,
    category: &str,
    count: usize,
) -> anyhow::Result<Vec<i64>> {
    let mut ids = Vec::with_capacity(count);
    for _ in 0..count {
        ids.push(create_image(pool, uploader, category).await?.id);
    }
    Ok(ids)
}

/// Minimal PNG signature used as upload content
pub fn png_bytes() -> Bytes {
    Bytes::from_static(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A])
}
