/// Dataset endpoints
///
/// # Endpoints
///
/// - `GET /datasets/overview` - Live datasets with image counts
/// - `GET /datasets/get/:id` - One dataset with its ordered image ids
/// - `POST /datasets/create` - Create a dataset
/// - `DELETE /datasets/delete/:id` - Soft-delete a dataset
/// - `PUT /datasets/set-images/:id` - Replace the image list
/// - `PUT /datasets/add-images/:id` - Append to the image list

use super::current_user;
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiPath},
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};
use vesselmark_shared::{
    auth::middleware::AuthContext,
    models::dataset::DatasetOverview,
    services::dataset::{DatasetDetail, NewDataset},
};

/// Body of `set-images` and `add-images`
#[derive(Debug, Serialize, Deserialize)]
pub struct ImageIdsRequest {
    /// Image ids in the desired order
    pub image_ids: Vec<i64>,
}

pub async fn overview(State(state): State<AppState>) -> ApiResult<Json<Vec<DatasetOverview>>> {
    Ok(Json(state.datasets().overview().await?))
}

pub async fn get_dataset(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<DatasetDetail>> {
    state
        .datasets()
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Dataset {} not found", id)))
}

/// Creates a dataset owned by the caller
///
/// # Endpoint
///
/// ```text
/// POST /datasets/create
/// Authorization: Bearer <jwt_token>
/// Content-Type: application/json
///
/// {
///   "title": "Retina batch 1",
///   "category": "retina",
///   "image_ids": [4, 2]
/// }
/// ```
pub async fn create_dataset(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(request): ApiJson<NewDataset>,
) -> ApiResult<(StatusCode, Json<DatasetDetail>)> {
    let creator = current_user(&state, &auth).await?;
    let dataset = state.datasets().create(&creator, request).await?;

    Ok((StatusCode::CREATED, Json(dataset)))
}

pub async fn delete_dataset(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    state.datasets().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Replaces the dataset's images; answers 201 with the updated dataset
pub async fn set_images(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<ImageIdsRequest>,
) -> ApiResult<(StatusCode, Json<DatasetDetail>)> {
    let dataset = state.datasets().set_images(id, &request.image_ids).await?;
    Ok((StatusCode::CREATED, Json(dataset)))
}

pub async fn add_images(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<ImageIdsRequest>,
) -> ApiResult<Json<DatasetDetail>> {
    let dataset = state.datasets().append_images(id, &request.image_ids).await?;
    Ok(Json(dataset))
}
