use chrono::NaiveDate;
use thiserror::Error;

use crate::duplicate::DuplicateMatch;
use crate::model::ImageId;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum WallpaperError {
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Image rejected: {0}")]
    Rejected(String),

    #[error("Image duplicates existing image {} ({})", .0.image_id, .0.kind)]
    Duplicate(DuplicateMatch),

    #[error("No eligible image for {date}")]
    NoEligibleImage { date: NaiveDate },

    #[error("Image {0} not found")]
    NotFound(ImageId),

    #[error("Invalid fingerprint: {0}")]
    InvalidFingerprint(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl WallpaperError {
    /// Whether the caller can recover by changing input or waiting.
    ///
    /// Store failures are the only condition that points at the deployment
    /// rather than the request.
    pub fn is_caller_recoverable(&self) -> bool {
        !matches!(self, Self::Store(_) | Self::InvalidFingerprint(_))
    }
}

pub type Result<T> = std::result::Result<T, WallpaperError>;
