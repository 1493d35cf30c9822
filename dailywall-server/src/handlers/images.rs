//! Image submission and gallery handlers

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use dailywall_core::{Image, ImageId, Page, Upload};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::ApiError;
use crate::multipart::MultipartFields;
use crate::state::AppState;
use crate::validation::validate_image_url;

/// Public view of a stored image
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ImageResponse {
    #[schema(example = 42)]
    pub id: i64,
    /// Composite perceptual fingerprint (`<phash>_<dhash>_<whash>`)
    #[schema(example = "c3c3e1e1f0f0783c_0f0e1c3870e0c183_ffff0000ffff0000")]
    pub fingerprint: String,
    #[schema(example = "aurora.jpg")]
    pub file_name: String,
    #[schema(example = "image/jpeg")]
    pub content_type: String,
    /// Where the image was downloaded from, for URL submissions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    pub width: u32,
    pub height: u32,
    pub byte_size: u64,
    pub is_approved: bool,
    #[schema(value_type = String, format = DateTime)]
    pub uploaded_at: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub approved_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Relative URL of the raw bytes
    #[schema(example = "/images/42/raw")]
    pub url: String,
}

impl From<Image> for ImageResponse {
    fn from(image: Image) -> Self {
        Self {
            id: image.id.0,
            fingerprint: image.fingerprint.to_string(),
            url: raw_url(image.id),
            file_name: image.file_name,
            content_type: image.content_type,
            source_url: image.source_url,
            width: image.width,
            height: image.height,
            byte_size: image.byte_size,
            is_approved: image.is_approved,
            uploaded_at: image.uploaded_at,
            approved_at: image.approved_at,
        }
    }
}

/// One page of images
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ImageListResponse {
    pub items: Vec<ImageResponse>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 12)]
    pub per_page: u32,
    pub total: u64,
    pub has_more: bool,
}

impl From<Page<Image>> for ImageListResponse {
    fn from(page: Page<Image>) -> Self {
        let page = page.map(ImageResponse::from);
        Self {
            items: page.items,
            page: page.page,
            per_page: page.per_page,
            total: page.total,
            has_more: page.has_more,
        }
    }
}

/// Query parameters for paginated listings
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PageQuery {
    /// Page number (1-indexed)
    #[param(default = 1, minimum = 1)]
    pub page: Option<u32>,
}

impl PageQuery {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1)
    }
}

/// Request body for submitting an image by URL
#[derive(Debug, Deserialize, ToSchema)]
pub struct UrlUploadRequest {
    #[schema(example = "https://example.com/walls/aurora.jpg")]
    pub url: String,
}

pub(crate) fn raw_url(id: ImageId) -> String {
    format!("/images/{}/raw", id)
}

/// Stored bytes served with their recorded content type.
pub(crate) fn raw_image_response(image: &Image, data: Vec<u8>, cache: Option<&'static str>) -> Response {
    let content_type = image.content_type.clone();
    match cache {
        Some(cache_control) => (
            [
                (header::CONTENT_TYPE, content_type),
                (header::CACHE_CONTROL, cache_control.to_string()),
            ],
            data,
        )
            .into_response(),
        None => ([(header::CONTENT_TYPE, content_type)], data).into_response(),
    }
}

/// Submit a wallpaper
///
/// Accepts multipart/form-data with:
/// - **file** (required): JPEG, PNG, GIF or WebP image
///
/// The upload is checked against the resolution and aspect policy, then
/// fingerprinted. Near-duplicates of any stored image (approved or pending)
/// are refused with 409. Accepted images wait for moderation.
#[utoipa::path(
    post,
    path = "/images",
    tag = "Images",
    request_body(
        content_type = "multipart/form-data",
        description = "Image file in the `file` field"
    ),
    responses(
        (status = 201, description = "Image stored, pending approval", body = ImageResponse),
        (status = 400, description = "Not a decodable image, or outside the upload policy"),
        (status = 409, description = "Duplicate of an existing image"),
        (status = 413, description = "File too large")
    )
)]
pub async fn upload_image_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ImageResponse>), ApiError> {
    let mut fields = MultipartFields::parse(&mut multipart, state.max_file_size).await?;
    let file = fields.take_file()?;

    let upload = Upload {
        data: file.data,
        file_name: file.file_name,
        content_type: file.content_type,
        source_url: None,
    };
    let image = state.curator.submit(upload).await?;

    Ok((StatusCode::CREATED, Json(image.into())))
}

/// Submit a wallpaper by URL
///
/// Downloads the image server-side and then follows the same path as a
/// direct upload. The URL is recorded as the image's source.
#[utoipa::path(
    post,
    path = "/images/url",
    tag = "Images",
    request_body = UrlUploadRequest,
    responses(
        (status = 201, description = "Image stored, pending approval", body = ImageResponse),
        (status = 400, description = "Invalid URL, not an image, or outside the upload policy"),
        (status = 409, description = "Duplicate of an existing image"),
        (status = 413, description = "File too large"),
        (status = 502, description = "Remote server failed")
    )
)]
pub async fn upload_url_handler(
    State(state): State<AppState>,
    Json(request): Json<UrlUploadRequest>,
) -> Result<(StatusCode, Json<ImageResponse>), ApiError> {
    let url = validate_image_url(&request.url)?;
    let fetched = state.fetcher.fetch(&url, state.clock.now()).await?;

    tracing::info!(%url, bytes = fetched.data.len(), "Downloaded image for submission");

    let upload = Upload {
        data: fetched.data,
        file_name: Some(fetched.file_name),
        content_type: fetched.content_type,
        source_url: Some(url.to_string()),
    };
    let image = state.curator.submit(upload).await?;

    Ok((StatusCode::CREATED, Json(image.into())))
}

/// Approved gallery
///
/// Most recently approved first, 12 per page.
#[utoipa::path(
    get,
    path = "/images",
    tag = "Images",
    params(PageQuery),
    responses(
        (status = 200, description = "Approved images", body = ImageListResponse)
    )
)]
pub async fn list_images_handler(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ImageListResponse>, ApiError> {
    let page = state.curator.gallery(query.page()).await?;
    Ok(Json(page.into()))
}

/// Approved image metadata
#[utoipa::path(
    get,
    path = "/images/{id}",
    tag = "Images",
    params(
        ("id" = i64, Path, description = "Image ID")
    ),
    responses(
        (status = 200, description = "Image metadata", body = ImageResponse),
        (status = 404, description = "Image missing or not yet approved")
    )
)]
pub async fn get_image_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ImageResponse>, ApiError> {
    let image = state.curator.approved_image(ImageId(id)).await?;
    Ok(Json(image.into()))
}

/// Raw image bytes
///
/// Served for pending images too, so moderators can preview them.
#[utoipa::path(
    get,
    path = "/images/{id}/raw",
    tag = "Images",
    params(
        ("id" = i64, Path, description = "Image ID")
    ),
    responses(
        (status = 200, description = "Image bytes with the stored content type"),
        (status = 404, description = "Image not found")
    )
)]
pub async fn raw_image_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let (image, data) = state.curator.image_data(ImageId(id)).await?;
    Ok(raw_image_response(&image, data, None))
}
