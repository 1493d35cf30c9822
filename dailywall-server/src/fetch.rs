//! Remote image download for URL submissions.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode, Url};
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::validation::validate_file_size;

/// Bytes downloaded from a remote URL plus the name to store them under.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub data: Vec<u8>,
    pub file_name: String,
    pub content_type: Option<String>,
}

/// HTTP client for pulling images from user-supplied URLs.
#[derive(Debug, Clone)]
pub struct ImageFetcher {
    client: Client,
    max_size: usize,
}

impl ImageFetcher {
    pub fn new(timeout: Duration, max_size: usize) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("dailywall/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, max_size })
    }

    /// Download `url`, enforcing the size limit on both the advertised and
    /// the received length. The body is read chunk by chunk and never
    /// buffered past the limit.
    pub async fn fetch(&self, url: &Url, now: DateTime<Utc>) -> Result<FetchedImage, ApiError> {
        let mut response = self.client.get(url.clone()).send().await.map_err(|e| {
            warn!(error = %e, %url, "Image download failed");
            if e.is_timeout() {
                ApiError::timeout(format!("Timed out downloading {url}"))
            } else {
                ApiError::upstream(format!("Error downloading image: {e}"))
            }
        })?;

        let status = response.status();
        debug!(status = %status, %url, "Received HTTP response");

        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::bad_request(format!("Image not found at {url}")));
        }
        if !status.is_success() {
            return Err(ApiError::upstream(format!(
                "Error downloading image: remote returned {status}"
            )));
        }

        if let Some(len) = response.content_length() {
            validate_file_size(len as usize, self.max_size)?;
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        // Chunked responses carry no length; stop as soon as the limit is crossed
        let mut data = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| ApiError::upstream(format!("Error reading image body: {e}")))?
        {
            if let Err(e) = validate_file_size(data.len() + chunk.len(), self.max_size) {
                warn!(%url, received = data.len() + chunk.len(), "Image download exceeded size limit");
                return Err(e);
            }
            data.extend_from_slice(&chunk);
        }
        validate_file_size(data.len(), self.max_size)?;

        Ok(FetchedImage {
            data,
            file_name: file_name_from_url(url, now),
            content_type,
        })
    }
}

/// Last path segment of the URL, or a timestamped fallback when it does not
/// look like a file name.
pub fn file_name_from_url(url: &Url, now: DateTime<Utc>) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty() && name.contains('.'))
        .map(|name| name.to_string())
        .unwrap_or_else(|| format!("image_from_url_{}.jpg", now.format("%Y%m%d%H%M%S")))
}
