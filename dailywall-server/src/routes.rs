//! Router configuration module
//!
//! Configures all routes, middleware layers, and creates the application router.

use std::{sync::Arc, time::Duration};

use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method, StatusCode},
    routing::{get, post},
    Router,
};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::error::ApiError;
use crate::handlers::{
    approve_image_handler, bulk_approve_handler, get_image_handler, health,
    image_of_the_day_handler, image_of_the_day_raw_handler, list_images_handler,
    pending_images_handler, raw_image_handler, ready, upload_image_handler, upload_url_handler,
};
use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Create the application router with default config and an in-memory store (for testing)
pub fn create_router() -> Result<Router, ApiError> {
    create_router_with_config(&Config::default())
}

/// Create the application router with custom configuration and an in-memory store
pub fn create_router_with_config(config: &Config) -> Result<Router, ApiError> {
    let state = AppState::in_memory(config)?;
    Ok(create_router_with_state(config, state))
}

/// Create the application router around prepared state
pub fn create_router_with_state(config: &Config, state: AppState) -> Router {
    // Configure CORS based on allowed_origins
    let cors = match &config.allowed_origins {
        Some(origins) if !origins.is_empty() => {
            let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            tracing::info!("CORS: Restricting to {} origin(s)", origins.len());
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        }
        _ => {
            tracing::warn!("CORS: Allowing all origins (dev mode)");
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    };

    // Request body limit (replaces axum's 2MB extractor default)
    let body_limit = RequestBodyLimitLayer::new(config.body_limit_mb * 1024 * 1024);

    // Request timeout
    let timeout = TimeoutLayer::with_status_code(
        StatusCode::REQUEST_TIMEOUT,
        Duration::from_secs(config.timeout_secs),
    );

    let api = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/images", post(upload_image_handler).get(list_images_handler))
        .route("/images/url", post(upload_url_handler))
        .route("/images/{id}", get(get_image_handler))
        .route("/images/{id}/raw", get(raw_image_handler))
        .route("/moderation/pending", get(pending_images_handler))
        .route("/moderation/images/{id}/approve", post(approve_image_handler))
        .route("/moderation/approve", post(bulk_approve_handler))
        .route("/image-of-the-day", get(image_of_the_day_handler))
        .route("/image-of-the-day.jpeg", get(image_of_the_day_raw_handler))
        .with_state(state);

    // Base router with common layers
    let router = Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api)
        .layer(cors)
        .layer(DefaultBodyLimit::disable())
        .layer(body_limit)
        .layer(timeout);

    if !config.rate_limit_enabled {
        tracing::warn!("Rate limiting: DISABLED");
        return router.layer(TraceLayer::new_for_http());
    }

    match GovernorConfigBuilder::default()
        .per_second(config.rate_limit_per_sec)
        .burst_size(config.rate_limit_burst)
        .finish()
    {
        Some(governor_conf) => {
            tracing::info!(
                "Rate limiting: {} req/s (burst: {})",
                config.rate_limit_per_sec,
                config.rate_limit_burst
            );

            router
                .layer(GovernorLayer::new(Arc::new(governor_conf)))
                .layer(TraceLayer::new_for_http())
        }
        None => {
            tracing::error!(
                per_sec = config.rate_limit_per_sec,
                burst = config.rate_limit_burst,
                "Invalid rate limit settings, rate limiting DISABLED"
            );
            router.layer(TraceLayer::new_for_http())
        }
    }
}
