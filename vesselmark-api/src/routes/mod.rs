/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `users`: Registration and lookup of the calling user
/// - `datasets`: Dataset lifecycle and image membership
/// - `images`: Uploads, content and metadata
/// - `annotations`: Vessel annotation trees

pub mod annotations;
pub mod datasets;
pub mod health;
pub mod images;
pub mod users;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use vesselmark_shared::{auth::middleware::AuthContext, models::user::User};

/// The registered user behind the request
///
/// Authenticated callers without a user row get 403 until they call
/// `POST /users/register`.
pub(crate) async fn current_user(state: &AppState, auth: &AuthContext) -> ApiResult<User> {
    state.users().try_find_user(auth).await?.ok_or_else(|| {
        ApiError::Forbidden("Caller is not registered; call /users/register first".to_string())
    })
}
