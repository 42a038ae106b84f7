//! # VesselMark Shared Library
//!
//! Data access, storage and domain logic behind the VesselMark annotation
//! backend. The API crate wires these pieces into HTTP handlers.
//!
//! ## Module Organization
//!
//! - `db`: SQLite connection pool and migrations
//! - `models`: Database rows and their queries
//! - `storage`: Blob storage for raw image bytes
//! - `services`: Dataset, image, annotation and user operations
//! - `auth`: Bearer token validation and request principals

pub mod auth;
pub mod db;
pub mod models;
pub mod services;
pub mod storage;

/// Current version of the VesselMark shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
