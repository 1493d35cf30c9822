//! Dailywall Core - shared wallpaper pool with perceptual dedup and daily rotation
//!
//! This crate holds the two pieces of logic the rest of the workspace is
//! built around:
//!
//! - **Perceptual deduplication**: every submission gets a composite
//!   fingerprint (pHash, dHash, wHash). A submission whose fingerprint is
//!   identical to, or within a mean Hamming distance of 5 bits of, any stored
//!   image is rejected.
//! - **Fair daily rotation**: one approved image per calendar date, never the
//!   same image two days running, favouring images never or least featured.
//!   Repeated requests for a date return the stored pick.
//!
//! # Features
//!
//! - `postgres`: sqlx-backed [`store::PostgresStore`] with migrations
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use dailywall_core::{Curator, MemoryStore, RotationSelector, Upload};
//!
//! # async fn example() -> dailywall_core::Result<()> {
//! let store = Arc::new(MemoryStore::new());
//! let curator = Curator::new(Arc::clone(&store));
//!
//! let image = curator.submit(Upload::new(std::fs::read("wall.jpg").unwrap())).await?;
//! curator.approve(image.id).await?;
//!
//! let today = chrono::Utc::now().date_naive();
//! let feature = RotationSelector::default().select_for_date(&*store, today).await?;
//! assert_eq!(feature.image_id, image.id);
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod curator;
pub mod duplicate;
pub mod error;
pub mod fingerprint;
pub mod model;
pub mod policy;
pub mod rotation;
pub mod store;

// Re-export main types for convenience
pub use clock::{Clock, FixedClock, SystemClock};
pub use curator::{Curator, GALLERY_PAGE_SIZE, PENDING_PAGE_SIZE};
pub use duplicate::{
    check_duplicate, DuplicateCheck, DuplicateDetector, DuplicateMatch, MatchKind,
    DEFAULT_DUPLICATE_THRESHOLD,
};
pub use error::{Result, WallpaperError};
pub use fingerprint::{compute_fingerprint, ComponentHash, Fingerprint, FingerprintGenerator};
pub use model::{DailyFeature, Image, ImageId, NewImage, Page, PageRequest, Upload};
pub use policy::UploadPolicy;
pub use rotation::RotationSelector;
pub use store::{FeatureInsert, MemoryStore, StoreError, WallpaperStore};

#[cfg(feature = "postgres")]
pub use store::PostgresStore;
