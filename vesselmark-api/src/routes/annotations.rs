/// Vessel annotation endpoints
///
/// # Endpoints
///
/// - `POST /annotations/save` - Store a vessel tree
/// - `GET /annotations/get/:id` - One stored tree
/// - `GET /annotations/by-image?image_path=P` - Summaries for one image

use super::current_user;
use crate::{
    app::AppState,
    error::ApiResult,
    extract::{ApiJson, ApiPath, ApiQuery},
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::Deserialize;
use vesselmark_shared::{
    auth::middleware::AuthContext,
    models::annotation::AnnotationSummary,
    services::annotation::{AnnotationDetail, SavedAnnotation, VesselTree},
};

/// Query of `GET /annotations/by-image`
#[derive(Debug, Deserialize)]
pub struct ImagePathQuery {
    pub image_path: String,
}

/// Saves a vessel tree authored by the caller
///
/// # Endpoint
///
/// ```text
/// POST /annotations/save
/// Authorization: Bearer <jwt_token>
/// Content-Type: application/json
///
/// {
///   "image_path": "retina/0001.png",
///   "points": [{"index": 0, "x": 10.0, "y": 12.5}, {"index": 1, "x": 40.0, "y": 18.0}],
///   "segments": [{"start_point": 0, "end_point": 1, "thickness": 2.5}]
/// }
/// ```
///
/// # Response
///
/// ```json
/// { "id": 7, "rows_written": 4 }
/// ```
pub async fn save(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(tree): ApiJson<VesselTree>,
) -> ApiResult<(StatusCode, Json<SavedAnnotation>)> {
    let author = current_user(&state, &auth).await?;
    let saved = state.annotations().save(&author, tree).await?;

    Ok((StatusCode::CREATED, Json(saved)))
}

pub async fn get_annotation(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<AnnotationDetail>> {
    Ok(Json(state.annotations().get(id).await?))
}

pub async fn by_image(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ImagePathQuery>,
) -> ApiResult<Json<Vec<AnnotationSummary>>> {
    Ok(Json(
        state.annotations().list_for_image(&query.image_path).await?,
    ))
}
