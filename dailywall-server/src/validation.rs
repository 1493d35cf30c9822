//! Upload validation module
//!
//! Provides validation utilities for uploaded files and remote image URLs.

use reqwest::Url;

use crate::error::ApiError;

/// Allowed MIME type prefixes for wallpaper uploads
const ALLOWED_MIME_PREFIXES: &[&str] = &["image/", "application/octet-stream"];

/// Validates the Content-Type of an uploaded file
///
/// Accepts `image/*` and `application/octet-stream`. The actual format is
/// sniffed from the bytes later, so this only filters obvious mistakes.
pub fn validate_content_type(content_type: Option<&str>) -> Result<(), ApiError> {
    match content_type {
        Some(ct) => {
            let ct_lower = ct.to_lowercase();
            if ALLOWED_MIME_PREFIXES
                .iter()
                .any(|prefix| ct_lower.starts_with(prefix))
            {
                Ok(())
            } else {
                Err(ApiError::bad_request(format!(
                    "Unsupported Content-Type: '{}'. Allowed types: image/*, application/octet-stream",
                    ct
                )))
            }
        }
        // Allow missing Content-Type (treat as binary)
        None => Ok(()),
    }
}

/// Validates the size of an uploaded file
///
/// Returns an error if the file exceeds the maximum size.
pub fn validate_file_size(size: usize, max_size: usize) -> Result<(), ApiError> {
    if size > max_size {
        let max_mb = max_size / (1024 * 1024);
        let actual_mb = size / (1024 * 1024);
        Err(ApiError::payload_too_large(format!(
            "File too large: {} MB exceeds maximum of {} MB",
            actual_mb, max_mb
        )))
    } else if size == 0 {
        Err(ApiError::bad_request("Uploaded file is empty"))
    } else {
        Ok(())
    }
}

/// Parses a user-supplied image URL, allowing only http and https.
pub fn validate_image_url(raw: &str) -> Result<Url, ApiError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ApiError::bad_request(format!("Invalid URL: {}", e)))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ApiError::bad_request(format!(
            "Unsupported URL scheme '{}'. Use http or https.",
            other
        ))),
    }
}
