/// Image endpoints
///
/// # Endpoints
///
/// - `POST /images/upload` - Multipart upload (`file`, `category`, optional `title`)
/// - `GET /images/get/:id` - Raw bytes with the stored content type
/// - `GET /images/info/:id` - Metadata
/// - `GET /images/overview` - All live images
/// - `GET /images/filter?category=C` - Live images in one category
/// - `DELETE /images/delete/:id` - Soft delete

use super::current_user;
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiPath, ApiQuery},
};
use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use bytes::Bytes;
use serde::Deserialize;
use vesselmark_shared::{
    auth::middleware::AuthContext, models::image::Image, services::image::ImageUpload,
};

/// Query of `GET /images/filter`
#[derive(Debug, Deserialize)]
pub struct CategoryQuery {
    pub category: String,
}

/// Form fields collected from an upload
#[derive(Debug, Default)]
struct UploadForm {
    filename: Option<String>,
    content_type: Option<String>,
    content: Option<Bytes>,
    category: Option<String>,
    title: Option<String>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> ApiResult<Self> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();

            match name.as_str() {
                "file" => {
                    form.filename = field.file_name().map(String::from);
                    form.content_type = field.content_type().map(String::from);
                    form.content = Some(field.bytes().await?);
                }
                "category" => form.category = Some(field.text().await?),
                "title" => form.title = Some(field.text().await?),
                other => tracing::debug!(field = %other, "Ignoring unknown upload field"),
            }
        }

        Ok(form)
    }

    fn into_upload(self) -> ApiResult<ImageUpload> {
        let content = self
            .content
            .ok_or_else(|| ApiError::BadRequest("Missing 'file' field".to_string()))?;

        Ok(ImageUpload {
            filename: self.filename.unwrap_or_default(),
            content_type: self.content_type.unwrap_or_default(),
            content,
            category: self.category.unwrap_or_default(),
            title: self.title,
        })
    }
}

/// Uploads an image
///
/// # Endpoint
///
/// ```text
/// POST /images/upload
/// Authorization: Bearer <jwt_token>
/// Content-Type: multipart/form-data; boundary=...
/// ```
///
/// # Errors
///
/// - 400 if a field is missing or the file is empty
/// - 403 if the caller is not registered
/// - 413 if the body exceeds `api.max_upload_bytes`
/// - 415 if the file is not JPEG, PNG or WebP
pub async fn upload(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<(StatusCode, Json<Image>)> {
    let uploader = current_user(&state, &auth).await?;

    let upload = UploadForm::read(multipart?).await?.into_upload()?;
    let image = state.images().upload(&uploader, upload).await?;

    Ok((StatusCode::CREATED, Json(image)))
}

/// Streams back the stored bytes
pub async fn get_content(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Response> {
    let stored = state.images().content(id).await?;

    Ok((
        [(header::CONTENT_TYPE, stored.image.content_type)],
        stored.content,
    )
        .into_response())
}

pub async fn get_info(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Image>> {
    state
        .images()
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Image {} not found", id)))
}

pub async fn overview(State(state): State<AppState>) -> ApiResult<Json<Vec<Image>>> {
    Ok(Json(state.images().overview().await?))
}

pub async fn filter(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<CategoryQuery>,
) -> ApiResult<Json<Vec<Image>>> {
    if query.category.trim().is_empty() {
        return Err(ApiError::BadRequest("Category is required".to_string()));
    }

    Ok(Json(state.images().filtered_image_set(&query.category).await?))
}

pub async fn delete_image(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    state.images().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
