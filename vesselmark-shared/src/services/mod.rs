/// Domain services
///
/// Services hold the validation rules and orchestrate models and the blob
/// store. Caller mistakes come back as [`ServiceError`] values carrying a
/// human-readable message; the API layer maps each variant to a status code.
///
/// # Services
///
/// - [`DatasetService`]: dataset lifecycle and image membership
/// - [`ImageService`]: uploads, content retrieval, soft delete
/// - [`AnnotationService`]: vessel annotation trees
/// - [`UserService`]: provisioning users from identity claims

pub mod annotation;
pub mod dataset;
pub mod image;
pub mod user;

pub use annotation::AnnotationService;
pub use dataset::DatasetService;
pub use image::ImageService;
pub use user::UserService;

use crate::storage::StorageError;
use std::collections::HashSet;

/// Error type for service operations
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Caller input is invalid
    #[error("{0}")]
    BadRequest(String),

    /// Referenced entity does not exist (or is soft-deleted)
    #[error("{0}")]
    NotFound(String),

    /// Entity already exists
    #[error("{0}")]
    Conflict(String),

    /// Upload content type outside the allow-list
    #[error("{0}")]
    UnsupportedMediaType(String),

    /// A dependency did not answer in time
    #[error("{0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Service result type alias
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Returns the first id that appears more than once
pub(crate) fn first_duplicate(ids: &[i64]) -> Option<i64> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().find(|id| !seen.insert(*id))
}

/// Flattens `validator` errors into one message
pub(crate) fn validation_message(errors: &validator::ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| {
                error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field))
            })
        })
        .collect();
    messages.sort();
    messages.join("; ")
}
