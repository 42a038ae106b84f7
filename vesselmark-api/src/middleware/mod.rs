/// Middleware modules for the API server
///
/// Bearer-token authentication lives in the shared crate
/// (`vesselmark_shared::auth::middleware::jwt_auth`); this module holds the
/// HTTP-only layers:
/// - Security headers

pub mod security;
