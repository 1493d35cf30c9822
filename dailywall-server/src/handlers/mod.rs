//! HTTP request handlers
//!
//! This module contains all the request handlers for the API endpoints.

pub mod featured;
pub mod health;
pub mod images;
pub mod moderation;

pub use crate::state::AppState;
pub use featured::{
    image_of_the_day_handler, image_of_the_day_raw_handler, FeaturedImage, ImageOfTheDayResponse,
};
pub use health::{health, ready, HealthResponse, ReadyResponse};
pub use images::{
    get_image_handler, list_images_handler, raw_image_handler, upload_image_handler,
    upload_url_handler, ImageListResponse, ImageResponse, PageQuery, UrlUploadRequest,
};
pub use moderation::{
    approve_image_handler, bulk_approve_handler, pending_images_handler, BulkApproveRequest,
    BulkApproveResponse,
};
