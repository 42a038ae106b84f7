/// Authentication utilities
///
/// Identity is owned by an external OpenID Connect provider. The backend only
/// validates the bearer tokens it issues and turns their claims into a
/// request principal.
///
/// # Modules
///
/// - [`jwt`]: Token validation (and minting for tests)
/// - [`middleware`]: Axum middleware and the `AuthContext` principal

pub mod jwt;
pub mod middleware;
