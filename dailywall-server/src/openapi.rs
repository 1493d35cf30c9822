//! OpenAPI documentation configuration
//!
//! Generates the OpenAPI 3 document served at `/api-docs/openapi.json`.

use utoipa::OpenApi;

use crate::handlers::{
    BulkApproveRequest, BulkApproveResponse, FeaturedImage, HealthResponse, ImageListResponse,
    ImageOfTheDayResponse, ImageResponse, ReadyResponse, UrlUploadRequest,
};

/// dailywall API - OpenAPI Documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "dailywall API",
        version = "0.1.0",
        description = r#"
## Curated wallpaper pool with a daily rotation

- **Submit** images by upload (`POST /images`) or by URL (`POST /images/url`)
- Every submission is fingerprinted with three 64-bit perceptual hashes
  (pHash, dHash, wHash). Images whose mean Hamming distance to a stored
  image is below 5 are refused as duplicates (409)
- **Moderate** the pending queue and approve images
- **Fetch** the image of the day. It is chosen once per UTC day, never
  repeats yesterday's image, and favors images that have been shown least
"#,
        license(name = "MIT OR Apache-2.0")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    tags(
        (name = "Images", description = "Submit images and browse the approved gallery"),
        (name = "Moderation", description = "Pending queue and approval"),
        (name = "Rotation", description = "Image of the day"),
        (name = "Health", description = "Service health and readiness endpoints")
    ),
    paths(
        crate::handlers::health::health,
        crate::handlers::health::ready,
        crate::handlers::images::upload_image_handler,
        crate::handlers::images::upload_url_handler,
        crate::handlers::images::list_images_handler,
        crate::handlers::images::get_image_handler,
        crate::handlers::images::raw_image_handler,
        crate::handlers::moderation::pending_images_handler,
        crate::handlers::moderation::approve_image_handler,
        crate::handlers::moderation::bulk_approve_handler,
        crate::handlers::featured::image_of_the_day_handler,
        crate::handlers::featured::image_of_the_day_raw_handler,
    ),
    components(
        schemas(
            HealthResponse,
            ReadyResponse,
            ImageResponse,
            ImageListResponse,
            UrlUploadRequest,
            BulkApproveRequest,
            BulkApproveResponse,
            ImageOfTheDayResponse,
            FeaturedImage,
        )
    )
)]
pub struct ApiDoc;
