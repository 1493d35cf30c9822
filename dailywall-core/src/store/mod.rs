//! Persistence for images and daily features.
//!
//! Two backends implement [`WallpaperStore`]:
//! - **Memory** ([`MemoryStore`]): single async mutex, used by tests, the CLI
//!   simulator and servers started without `DATABASE_URL`.
//! - **PostgreSQL** (`PostgresStore`, feature `postgres`): sqlx pool with
//!   migrations applied on connect.
//!
//! Both backends provide the two atomic operations the pool depends on:
//! guarded image creation (duplicate scan and insert as one unit) and
//! insert-if-absent for daily features keyed by date.

mod memory;
#[cfg(feature = "postgres")]
mod postgres;

pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::duplicate::DuplicateDetector;
use crate::fingerprint::Fingerprint;
use crate::model::{DailyFeature, Image, ImageId, NewImage, Page, PageRequest};

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Database migration error: {0}")]
    Migration(String),

    #[error("Query error: {0}")]
    Query(String),

    /// A stored row could not be mapped back to a record
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// A record value does not fit the backend's column type
    #[error("Value out of range: {0}")]
    OutOfRange(String),
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        Self::Query(e.to_string())
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        Self::Migration(e.to_string())
    }
}

/// Result of an insert-if-absent on the daily feature table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureInsert {
    /// This call created the record
    Inserted(DailyFeature),
    /// A record for the date already existed; it is returned unchanged
    Existing(DailyFeature),
}

impl FeatureInsert {
    pub fn feature(&self) -> DailyFeature {
        match self {
            Self::Inserted(f) | Self::Existing(f) => *f,
        }
    }
}

#[async_trait]
pub trait WallpaperStore: Send + Sync {
    /// Short backend name for health reporting ("memory", "postgres").
    fn backend(&self) -> &'static str;

    async fn check_health(&self) -> Result<(), StoreError>;

    /// Scan existing fingerprints with `detector` and insert `new` only if no
    /// duplicate is found, as one atomic unit.
    ///
    /// Fails with [`WallpaperError::Duplicate`](crate::WallpaperError::Duplicate)
    /// when the candidate matches; nothing is persisted in that case.
    async fn create_image(
        &self,
        new: NewImage,
        detector: &DuplicateDetector,
    ) -> crate::Result<Image>;

    async fn image(&self, id: ImageId) -> Result<Option<Image>, StoreError>;

    async fn image_data(&self, id: ImageId) -> Result<Option<Vec<u8>>, StoreError>;

    /// Fingerprints of all images, approved or pending, ascending by id.
    async fn fingerprints(&self) -> Result<Vec<(ImageId, Fingerprint)>, StoreError>;

    /// Mark an image approved. Already approved images keep their original
    /// `approved_at`. Returns `None` for unknown ids.
    async fn approve(&self, id: ImageId, at: DateTime<Utc>) -> Result<Option<Image>, StoreError>;

    /// Approve every pending image in `ids`; returns how many changed state.
    async fn approve_many(&self, ids: &[ImageId], at: DateTime<Utc>) -> Result<u64, StoreError>;

    /// Ids of all approved images, ascending.
    async fn approved_image_ids(&self) -> Result<Vec<ImageId>, StoreError>;

    /// Approved images, most recently approved first.
    async fn list_approved(&self, page: PageRequest) -> Result<Page<Image>, StoreError>;

    /// Pending images, oldest upload first.
    async fn list_pending(&self, page: PageRequest) -> Result<Page<Image>, StoreError>;

    async fn feature_for_date(&self, date: NaiveDate) -> Result<Option<DailyFeature>, StoreError>;

    /// Number of daily features per image. Images never featured are absent.
    async fn feature_counts(&self) -> Result<HashMap<ImageId, u64>, StoreError>;

    /// Insert `feature` unless a record for its date exists.
    async fn insert_feature_if_absent(
        &self,
        feature: DailyFeature,
    ) -> Result<FeatureInsert, StoreError>;
}
