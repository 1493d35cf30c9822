//! API error handling module
//!
//! Provides a unified error type for all API endpoints with structured error variants.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use dailywall_core::WallpaperError;
use thiserror::Error;

/// API error type with structured variants for different error categories
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request - client provided invalid input
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Not found - requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Payload too large - upload exceeds the configured size
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Request timeout - operation took too long
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Bad gateway - a remote image could not be fetched
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Internal server error - unexpected server-side failure
    #[error("Internal error: {0}")]
    Internal(String),

    /// Service unavailable - required service is not configured or available
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Wallpaper pool error from the core library
    #[error("{0}")]
    Wallpaper(#[from] WallpaperError),
}

impl ApiError {
    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a payload too large error
    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::PayloadTooLarge(message.into())
    }

    /// Create a timeout error
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout(message.into())
    }

    /// Create an upstream error
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream(message.into())
    }

    /// Create an internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a service unavailable error
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Wallpaper(ref e) => match e {
                // Client-provided unusable input → 400
                WallpaperError::InvalidImage(_) | WallpaperError::Rejected(_) => {
                    StatusCode::BAD_REQUEST
                }

                // Content already in the pool → 409
                WallpaperError::Duplicate(_) => StatusCode::CONFLICT,

                WallpaperError::NoEligibleImage { .. } | WallpaperError::NotFound(_) => {
                    StatusCode::NOT_FOUND
                }

                // Persistence failures → 503
                WallpaperError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,

                WallpaperError::InvalidFingerprint(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Get the error code for programmatic error handling
    fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "INVALID_INPUT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            Self::Timeout(_) => "TIMEOUT",
            Self::Upstream(_) => "UPSTREAM_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            Self::Wallpaper(ref e) => match e {
                WallpaperError::InvalidImage(_) => "INVALID_IMAGE",
                WallpaperError::Rejected(_) => "IMAGE_REJECTED",
                WallpaperError::Duplicate(_) => "DUPLICATE_IMAGE",
                WallpaperError::NoEligibleImage { .. } => "NO_ELIGIBLE_IMAGE",
                WallpaperError::NotFound(_) => "NOT_FOUND",
                WallpaperError::InvalidFingerprint(_) => "INVALID_FINGERPRINT",
                WallpaperError::Store(_) => "STORE_ERROR",
            },
        }
    }

    /// Get sanitized error message for client response
    fn client_message(&self) -> String {
        match self {
            Self::Wallpaper(ref e) => match e {
                WallpaperError::InvalidImage(_) => "Invalid image".to_string(),
                // Policy messages are written for the uploader
                WallpaperError::Rejected(reason) => reason.clone(),
                WallpaperError::Duplicate(_) => {
                    "This image is too similar to an existing image".to_string()
                }
                WallpaperError::NoEligibleImage { date } => {
                    format!("No image available for {}", date)
                }
                WallpaperError::NotFound(id) => format!("Image {} not found", id),
                WallpaperError::InvalidFingerprint(_) => {
                    "Stored fingerprint could not be read".to_string()
                }
                WallpaperError::Store(_) => "Storage unavailable".to_string(),
            },
            // For other errors, use the Display message
            _ => self.to_string(),
        }
    }

    /// Get the error category for logging
    fn error_category(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::NotFound(_) => "not_found",
            Self::PayloadTooLarge(_) => "payload_too_large",
            Self::Timeout(_) => "timeout",
            Self::Upstream(_) => "upstream",
            Self::Internal(_) => "internal",
            Self::ServiceUnavailable(_) => "service_unavailable",
            Self::Wallpaper(_) => "wallpaper",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let category = self.error_category();
        let code = self.error_code();
        let internal_message = self.to_string();
        let client_message = self.client_message();

        // Log based on severity, always including internal details
        match &self {
            Self::BadRequest(_) | Self::NotFound(_) | Self::PayloadTooLarge(_) => {
                tracing::warn!(
                    status = %status,
                    category = category,
                    code = code,
                    error = %internal_message,
                    "Client error"
                );
            }
            Self::Upstream(_) | Self::ServiceUnavailable(_) => {
                tracing::warn!(
                    status = %status,
                    category = category,
                    code = code,
                    error = %internal_message,
                    "Service unavailable"
                );
            }
            Self::Timeout(_) | Self::Internal(_) => {
                tracing::error!(
                    status = %status,
                    category = category,
                    code = code,
                    error = %internal_message,
                    "Server error"
                );
            }
            Self::Wallpaper(e) if e.is_caller_recoverable() => {
                tracing::warn!(
                    status = %status,
                    category = category,
                    code = code,
                    error = %internal_message,
                    "Request refused"
                );
            }
            Self::Wallpaper(_) => {
                tracing::error!(
                    status = %status,
                    category = category,
                    code = code,
                    error = %internal_message,
                    client_message = %client_message,
                    "Wallpaper error (internal details logged)"
                );
            }
        }

        // All error responses include a `code` field for programmatic error handling
        let mut body = serde_json::json!({
            "error": client_message,
            "code": code,
        });

        if let Self::Wallpaper(WallpaperError::Duplicate(matched)) = &self {
            body["matched_image_id"] = serde_json::json!(matched.image_id);
            body["match_kind"] = serde_json::json!(matched.kind);
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dailywall_core::{DuplicateMatch, ImageId, MatchKind, StoreError};

    #[test]
    fn test_wallpaper_status_mapping() {
        let duplicate = ApiError::from(WallpaperError::Duplicate(DuplicateMatch {
            image_id: ImageId(3),
            kind: MatchKind::Similar,
            mean_distance: 2.0,
        }));
        assert_eq!(duplicate.status_code(), StatusCode::CONFLICT);
        assert_eq!(duplicate.error_code(), "DUPLICATE_IMAGE");

        let invalid = ApiError::from(WallpaperError::InvalidImage("bad".into()));
        assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);

        let store = ApiError::from(WallpaperError::Store(StoreError::Query("boom".into())));
        assert_eq!(store.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(store.client_message(), "Storage unavailable");
    }

    #[test]
    fn test_rejection_message_passes_through() {
        let err = ApiError::from(WallpaperError::Rejected("too small".into()));
        assert_eq!(err.client_message(), "too small");
        assert_eq!(err.error_code(), "IMAGE_REJECTED");
    }
}
