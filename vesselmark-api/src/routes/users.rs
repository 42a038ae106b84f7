/// User endpoints
///
/// Identity comes from the bearer token; these endpoints only map the
/// token subject to a local user row.
///
/// # Endpoints
///
/// - `GET /users/me` - The registered user for the caller
/// - `POST /users/register` - Create the user row from token claims

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use vesselmark_shared::{auth::middleware::AuthContext, models::user::User};

/// Returns the caller's user row
///
/// # Errors
///
/// 404 if the caller has not registered yet
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<User>> {
    let user = state
        .users()
        .try_find_user(&auth)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No user registered for '{}'", auth.subject)))?;

    Ok(Json(user))
}

/// Registers the caller
///
/// # Endpoint
///
/// ```text
/// POST /users/register
/// Authorization: Bearer <jwt_token>
/// ```
///
/// # Errors
///
/// 409 if the caller is already registered
pub async fn register(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let user = state.users().create_user(&auth).await?;
    Ok((StatusCode::CREATED, Json(user)))
}
