//! Image-of-the-day handlers

use axum::{extract::State, response::Response, Json};
use dailywall_core::DailyFeature;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::handlers::images::{raw_image_response, raw_url};
use crate::state::AppState;

const FEATURE_CACHE_CONTROL: &str = "max-age=3600";

/// Reference to the featured image
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FeaturedImage {
    #[schema(example = 42)]
    pub id: i64,
    #[schema(example = "/images/42/raw")]
    pub url: String,
}

/// Today's wallpaper
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ImageOfTheDayResponse {
    #[schema(value_type = String, format = Date, example = "2024-03-09")]
    pub date: chrono::NaiveDate,
    pub image: FeaturedImage,
}

impl From<DailyFeature> for ImageOfTheDayResponse {
    fn from(feature: DailyFeature) -> Self {
        Self {
            date: feature.date,
            image: FeaturedImage {
                id: feature.image_id.0,
                url: raw_url(feature.image_id),
            },
        }
    }
}

async fn todays_feature(state: &AppState) -> Result<DailyFeature, ApiError> {
    let feature = state
        .selector
        .select_today(state.store.as_ref(), state.clock.as_ref())
        .await?;
    Ok(feature)
}

/// Today's image
///
/// The first request of a UTC day picks the image; every later request that
/// day returns the same one.
#[utoipa::path(
    get,
    path = "/image-of-the-day",
    tag = "Rotation",
    responses(
        (status = 200, description = "Today's image", body = ImageOfTheDayResponse),
        (status = 404, description = "No approved image can be featured today")
    )
)]
pub async fn image_of_the_day_handler(
    State(state): State<AppState>,
) -> Result<Json<ImageOfTheDayResponse>, ApiError> {
    let feature = todays_feature(&state).await?;
    Ok(Json(feature.into()))
}

/// Today's image bytes
///
/// Cached by clients for an hour.
#[utoipa::path(
    get,
    path = "/image-of-the-day.jpeg",
    tag = "Rotation",
    responses(
        (status = 200, description = "Bytes of today's image"),
        (status = 404, description = "No approved image can be featured today")
    )
)]
pub async fn image_of_the_day_raw_handler(
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let feature = todays_feature(&state).await?;
    let (image, data) = state.curator.image_data(feature.image_id).await?;
    Ok(raw_image_response(&image, data, Some(FEATURE_CACHE_CONTROL)))
}
