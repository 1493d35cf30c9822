//! Records owned by the wallpaper pool.
//!
//! Two record kinds exist:
//!
//! - [`Image`]: one contributed wallpaper candidate, pending until a
//!   moderator approves it.
//! - [`DailyFeature`]: the binding of one calendar date to one approved image.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::fingerprint::Fingerprint;

/// Store-assigned image identifier.
///
/// Identifiers are handed out in creation order, which is the iteration
/// order every store uses when yielding fingerprints to the duplicate scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(pub i64);

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ImageId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// A contributed wallpaper candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: ImageId,
    /// Composite perceptual fingerprint, fixed at creation
    pub fingerprint: Fingerprint,
    pub file_name: String,
    pub content_type: String,
    /// Origin URL when the image was fetched rather than uploaded
    pub source_url: Option<String>,
    pub width: u32,
    pub height: u32,
    pub byte_size: u64,
    pub is_approved: bool,
    pub uploaded_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
}

/// Input for the guarded image creation path.
#[derive(Debug, Clone)]
pub struct NewImage {
    pub fingerprint: Fingerprint,
    pub file_name: String,
    pub content_type: String,
    pub source_url: Option<String>,
    pub width: u32,
    pub height: u32,
    /// Raw encoded bytes, persisted in the same unit as the record
    pub data: Vec<u8>,
    pub uploaded_at: DateTime<Utc>,
}

impl NewImage {
    /// Materialize the record a store returns after a successful insert.
    pub fn into_image(self, id: ImageId) -> (Image, Vec<u8>) {
        let image = Image {
            id,
            fingerprint: self.fingerprint,
            file_name: self.file_name,
            content_type: self.content_type,
            source_url: self.source_url,
            width: self.width,
            height: self.height,
            byte_size: self.data.len() as u64,
            is_approved: false,
            uploaded_at: self.uploaded_at,
            approved_at: None,
        };
        (image, self.data)
    }
}

/// A raw submission before decoding.
#[derive(Debug, Clone, Default)]
pub struct Upload {
    pub data: Vec<u8>,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub source_url: Option<String>,
}

impl Upload {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            ..Self::default()
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_source_url(mut self, source_url: impl Into<String>) -> Self {
        self.source_url = Some(source_url.into());
        self
    }

    /// The declared content type when it names a different image format than
    /// the one sniffed from the bytes.
    ///
    /// Parameters and case are ignored, and `image/jpg` counts as JPEG.
    /// Generic types such as `application/octet-stream` never disagree.
    pub fn declared_type_mismatch(&self, sniffed: &str) -> Option<&str> {
        let declared = self.content_type.as_deref()?;
        let essence = declared
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        let essence = match essence.as_str() {
            "image/jpg" | "image/pjpeg" => "image/jpeg".to_string(),
            _ => essence,
        };

        if !essence.starts_with("image/") || essence == sniffed {
            None
        } else {
            Some(declared)
        }
    }
}

/// The rotation record for one calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyFeature {
    pub date: NaiveDate,
    pub image_id: ImageId,
}

/// 1-indexed page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, 100),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.per_page)
    }
}

/// One page of results plus the total row count.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total: u64) -> Self {
        let has_more = request.offset() + (items.len() as u64) < total;
        Self {
            items,
            page: request.page,
            per_page: request.per_page,
            total,
            has_more,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total: self.total,
            has_more: self.has_more,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_type_mismatch() {
        let upload = |ct: &str| Upload::new(vec![1]).with_content_type(ct);

        assert_eq!(upload("image/png").declared_type_mismatch("image/png"), None);
        assert_eq!(upload("IMAGE/JPG").declared_type_mismatch("image/jpeg"), None);
        assert_eq!(
            upload("image/jpeg; q=0.9").declared_type_mismatch("image/jpeg"),
            None
        );
        assert_eq!(
            upload("application/octet-stream").declared_type_mismatch("image/png"),
            None
        );
        assert_eq!(Upload::new(vec![1]).declared_type_mismatch("image/png"), None);
        assert_eq!(
            upload("image/gif").declared_type_mismatch("image/png"),
            Some("image/gif")
        );
    }

    #[test]
    fn test_page_request_clamps() {
        let request = PageRequest::new(0, 500);
        assert_eq!(request.page, 1);
        assert_eq!(request.per_page, 100);
        assert_eq!(request.offset(), 0);

        assert_eq!(PageRequest::new(3, 12).offset(), 24);
    }

    #[test]
    fn test_page_has_more() {
        let request = PageRequest::new(1, 2);
        let page = Page::new(vec![1, 2], request, 5);
        assert!(page.has_more);

        let last = Page::new(vec![5], PageRequest::new(3, 2), 5);
        assert!(!last.has_more);
    }

    #[test]
    fn test_image_id_serializes_transparently() {
        let json = serde_json::to_string(&ImageId(42)).unwrap();
        assert_eq!(json, "42");
    }
}
