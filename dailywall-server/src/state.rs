//! Application state module
//!
//! Defines shared state accessible across all request handlers.

use std::sync::Arc;
use std::time::Duration;

use dailywall_core::{
    Clock, Curator, DuplicateDetector, MemoryStore, RotationSelector, SystemClock, WallpaperStore,
};

use crate::config::Config;
use crate::error::ApiError;
use crate::fetch::ImageFetcher;

/// Application state containing shared resources.
#[derive(Clone)]
pub struct AppState {
    /// Submission and moderation workflow over the store
    pub curator: Curator<dyn WallpaperStore>,
    /// Daily rotation
    pub selector: RotationSelector,
    /// Backing store (PostgreSQL or in-memory)
    pub store: Arc<dyn WallpaperStore>,
    /// Source of "today"
    pub clock: Arc<dyn Clock>,
    /// Client for URL submissions
    pub fetcher: ImageFetcher,
    /// Maximum upload size in bytes
    pub max_file_size: usize,
}

impl AppState {
    /// Build state around an existing store.
    pub fn new(
        store: Arc<dyn WallpaperStore>,
        clock: Arc<dyn Clock>,
        config: &Config,
    ) -> Result<Self, ApiError> {
        let curator = Curator::new(Arc::clone(&store))
            .with_detector(DuplicateDetector::new(config.duplicate_threshold))
            .with_policy(config.upload_policy())
            .with_clock(Arc::clone(&clock));
        let fetcher = ImageFetcher::new(
            Duration::from_secs(config.url_fetch_timeout_secs),
            config.max_file_size(),
        )?;

        Ok(Self {
            curator,
            selector: RotationSelector::new(config.rotation_seed),
            store,
            clock,
            fetcher,
            max_file_size: config.max_file_size(),
        })
    }

    /// Connect to the store named by the configuration.
    ///
    /// Uses PostgreSQL when `database_url` is set, otherwise an in-memory
    /// store that is lost on restart.
    pub async fn connect(config: &Config) -> Result<Self, ApiError> {
        let store: Arc<dyn WallpaperStore> = match config.database_url.as_deref() {
            #[cfg(feature = "postgres")]
            Some(url) => {
                let store = dailywall_core::PostgresStore::new(url, config.database_max_connections)
                    .await
                    .map_err(|e| {
                        ApiError::service_unavailable(format!("Failed to connect to database: {e}"))
                    })?;
                tracing::info!(
                    max_connections = config.database_max_connections,
                    "Connected to PostgreSQL, migrations applied"
                );
                Arc::new(store)
            }
            #[cfg(not(feature = "postgres"))]
            Some(_) => {
                return Err(ApiError::service_unavailable(
                    "DATABASE_URL is set but the server was built without the postgres feature",
                ));
            }
            None => {
                tracing::warn!("DATABASE_URL not set, using in-memory store (data is lost on restart)");
                Arc::new(MemoryStore::new())
            }
        };

        Self::new(store, Arc::new(SystemClock), config)
    }

    /// In-memory state on the wall clock (for tests and development)
    pub fn in_memory(config: &Config) -> Result<Self, ApiError> {
        Self::new(Arc::new(MemoryStore::new()), Arc::new(SystemClock), config)
    }
}
