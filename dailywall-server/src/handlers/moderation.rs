//! Moderation handlers
//!
//! Pending queue and approval actions. Approval is idempotent and never
//! reverts an image to pending.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use dailywall_core::ImageId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::handlers::images::{ImageListResponse, ImageResponse, PageQuery};
use crate::state::AppState;

/// Bulk approval request
#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkApproveRequest {
    #[schema(example = json!([3, 4, 7]))]
    pub ids: Vec<i64>,
}

/// Bulk approval result
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BulkApproveResponse {
    /// Number of images that moved from pending to approved
    pub approved: u64,
}

/// Pending images, oldest upload first, 20 per page
#[utoipa::path(
    get,
    path = "/moderation/pending",
    tag = "Moderation",
    params(PageQuery),
    responses(
        (status = 200, description = "Images awaiting approval", body = ImageListResponse)
    )
)]
pub async fn pending_images_handler(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ImageListResponse>, ApiError> {
    let page = state.curator.pending(query.page()).await?;
    Ok(Json(page.into()))
}

/// Approve one image
#[utoipa::path(
    post,
    path = "/moderation/images/{id}/approve",
    tag = "Moderation",
    params(
        ("id" = i64, Path, description = "Image ID")
    ),
    responses(
        (status = 200, description = "Image approved", body = ImageResponse),
        (status = 404, description = "Image not found")
    )
)]
pub async fn approve_image_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ImageResponse>, ApiError> {
    let image = state.curator.approve(ImageId(id)).await?;
    Ok(Json(image.into()))
}

/// Approve several images at once
///
/// Unknown and already-approved IDs are skipped.
#[utoipa::path(
    post,
    path = "/moderation/approve",
    tag = "Moderation",
    request_body = BulkApproveRequest,
    responses(
        (status = 200, description = "Count of newly approved images", body = BulkApproveResponse)
    )
)]
pub async fn bulk_approve_handler(
    State(state): State<AppState>,
    Json(request): Json<BulkApproveRequest>,
) -> Result<Json<BulkApproveResponse>, ApiError> {
    if request.ids.is_empty() {
        return Err(ApiError::bad_request("No image ids provided"));
    }

    let ids: Vec<ImageId> = request.ids.into_iter().map(ImageId).collect();
    let approved = state.curator.approve_many(&ids).await?;

    Ok(Json(BulkApproveResponse { approved }))
}
