//! Common test utilities for integration tests
//!
//! This module provides shared infrastructure for integration tests:
//! - In-memory database with migrations
//! - In-memory blob store
//! - JWT minting for test callers
//! - Request and body helpers

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use std::sync::Arc;
use tower::Service;
use vesselmark_api::app::{build_router, AppState};
use vesselmark_api::config::{ApiConfig, AuthConfig, Config, StorageConfig};
use vesselmark_shared::auth::jwt::{create_token, Claims};
use vesselmark_shared::db::{
    migrations::run_migrations,
    pool::{create_pool, DatabaseConfig},
};
use vesselmark_shared::storage::{MemoryBlobStore, StorageBackend};

pub const TEST_SECRET: &str = "test-secret-key-at-least-32-bytes-long";
pub const TEST_ISSUER: &str = "https://id.vesselmark.test";
pub const MAX_UPLOAD_BYTES: usize = 64 * 1024;

const BOUNDARY: &str = "vesselmark-test-boundary";

/// Test context containing all necessary resources
pub struct TestContext {
    pub db: sqlx::SqlitePool,
    pub app: Router,
    pub config: Config,
    pub blobs: MemoryBlobStore,
}

impl TestContext {
    /// Creates a new test context with a fresh database and blob store
    pub async fn new() -> anyhow::Result<Self> {
        let db = create_pool(DatabaseConfig::in_memory()).await?;
        run_migrations(&db).await?;

        let config = test_config();
        let blobs = MemoryBlobStore::new();

        let state = AppState::new(db.clone(), config.clone(), Arc::new(blobs.clone()));
        let app = build_router(state);

        Ok(TestContext {
            db,
            app,
            config,
            blobs,
        })
    }

    /// Sends a request through the router
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app
            .clone()
            .call(request)
            .await
            .expect("router is infallible")
    }

    /// Registers `subject` and returns its bearer token
    pub async fn register(&self, subject: &str) -> anyhow::Result<String> {
        let token = token_for(subject)?;

        let response = self
            .send(
                Request::builder()
                    .method("POST")
                    .uri("/users/register")
                    .header(header::AUTHORIZATION, bearer(&token))
                    .body(Body::empty())?,
            )
            .await;
        anyhow::ensure!(
            response.status().is_success(),
            "registration failed with {}",
            response.status()
        );

        Ok(token)
    }
}

/// Configuration pointing at in-memory backends
pub fn test_config() -> Config {
    Config {
        api: ApiConfig {
            max_upload_bytes: MAX_UPLOAD_BYTES,
            ..Default::default()
        },
        auth: AuthConfig {
            jwt_secret: TEST_SECRET.to_string(),
            issuer: TEST_ISSUER.to_string(),
            audience: None,
        },
        storage: StorageConfig {
            backend: StorageBackend::Memory,
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Mints a token for `subject` signed with the test secret
pub fn token_for(subject: &str) -> anyhow::Result<String> {
    let claims = Claims::new(subject, TEST_ISSUER).with_name(format!("Tester {}", subject));
    Ok(create_token(&claims, TEST_SECRET)?)
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

/// Builds a request with an optional bearer token and JSON body
pub fn json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, bearer(token));
    }

    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// A file part of a multipart upload
pub struct FilePart<'a> {
    pub filename: &'a str,
    pub content_type: &'a str,
    pub content: &'a [u8],
}

/// Builds `POST /images/upload` with the given parts
pub fn upload_request(token: &str, file: Option<FilePart<'_>>, fields: &[(&str, &str)]) -> Request<Body> {
    let mut body = Vec::new();

    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }

    if let Some(file) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                file.filename, file.content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(file.content);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/images/upload")
        .header(header::AUTHORIZATION, bearer(token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Collects a response body
pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

/// Collects a response body as JSON
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Minimal PNG signature
pub const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

pub fn png_file(filename: &str) -> FilePart<'_> {
    FilePart {
        filename,
        content_type: "image/png",
        content: PNG,
    }
}
