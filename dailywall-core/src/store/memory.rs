//! In-memory store.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::Mutex;

use super::{FeatureInsert, StoreError, WallpaperStore};
use crate::duplicate::DuplicateDetector;
use crate::error::{Result, WallpaperError};
use crate::fingerprint::Fingerprint;
use crate::model::{DailyFeature, Image, ImageId, NewImage, Page, PageRequest};

struct StoredImage {
    image: Image,
    data: Vec<u8>,
}

#[derive(Default)]
struct Inner {
    next_id: i64,
    images: BTreeMap<ImageId, StoredImage>,
    features: BTreeMap<NaiveDate, ImageId>,
}

fn paginate(images: Vec<&Image>, request: PageRequest) -> Page<Image> {
    let total = images.len() as u64;
    let items = images
        .into_iter()
        .skip(request.offset() as usize)
        .take(request.per_page as usize)
        .cloned()
        .collect();
    Page::new(items, request, total)
}

/// Store backed by ordered maps behind one async mutex.
///
/// Every operation takes the lock for its whole duration, so guarded image
/// creation and feature insertion are trivially atomic.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn image_count(&self) -> usize {
        self.inner.lock().await.images.len()
    }

    pub async fn feature_count(&self) -> usize {
        self.inner.lock().await.features.len()
    }
}

#[async_trait]
impl WallpaperStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn check_health(&self) -> std::result::Result<(), StoreError> {
        Ok(())
    }

    async fn create_image(&self, new: NewImage, detector: &DuplicateDetector) -> Result<Image> {
        let mut inner = self.inner.lock().await;

        let existing: Vec<(ImageId, Fingerprint)> = inner
            .images
            .values()
            .map(|s| (s.image.id, s.image.fingerprint))
            .collect();

        if let Some(matched) = detector.check(&new.fingerprint, &existing).matched {
            return Err(WallpaperError::Duplicate(matched));
        }

        inner.next_id += 1;
        let id = ImageId(inner.next_id);
        let (image, data) = new.into_image(id);
        inner.images.insert(
            id,
            StoredImage {
                image: image.clone(),
                data,
            },
        );

        tracing::debug!(image_id = %id, "Stored image in memory");
        Ok(image)
    }

    async fn image(&self, id: ImageId) -> std::result::Result<Option<Image>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.images.get(&id).map(|s| s.image.clone()))
    }

    async fn image_data(&self, id: ImageId) -> std::result::Result<Option<Vec<u8>>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.images.get(&id).map(|s| s.data.clone()))
    }

    async fn fingerprints(&self) -> std::result::Result<Vec<(ImageId, Fingerprint)>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .images
            .values()
            .map(|s| (s.image.id, s.image.fingerprint))
            .collect())
    }

    async fn approve(
        &self,
        id: ImageId,
        at: DateTime<Utc>,
    ) -> std::result::Result<Option<Image>, StoreError> {
        let mut inner = self.inner.lock().await;
        let Some(stored) = inner.images.get_mut(&id) else {
            return Ok(None);
        };

        if !stored.image.is_approved {
            stored.image.is_approved = true;
            stored.image.approved_at = Some(at);
        }
        Ok(Some(stored.image.clone()))
    }

    async fn approve_many(
        &self,
        ids: &[ImageId],
        at: DateTime<Utc>,
    ) -> std::result::Result<u64, StoreError> {
        let mut inner = self.inner.lock().await;
        let mut changed = 0;
        for id in ids {
            if let Some(stored) = inner.images.get_mut(id) {
                if !stored.image.is_approved {
                    stored.image.is_approved = true;
                    stored.image.approved_at = Some(at);
                    changed += 1;
                }
            }
        }
        Ok(changed)
    }

    async fn approved_image_ids(&self) -> std::result::Result<Vec<ImageId>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .images
            .values()
            .filter(|s| s.image.is_approved)
            .map(|s| s.image.id)
            .collect())
    }

    async fn list_approved(&self, page: PageRequest) -> std::result::Result<Page<Image>, StoreError> {
        let inner = self.inner.lock().await;
        let mut approved: Vec<&Image> = inner
            .images
            .values()
            .map(|s| &s.image)
            .filter(|i| i.is_approved)
            .collect();
        approved.sort_by(|a, b| b.approved_at.cmp(&a.approved_at).then(b.id.cmp(&a.id)));
        Ok(paginate(approved, page))
    }

    async fn list_pending(&self, page: PageRequest) -> std::result::Result<Page<Image>, StoreError> {
        let inner = self.inner.lock().await;
        let mut pending: Vec<&Image> = inner
            .images
            .values()
            .map(|s| &s.image)
            .filter(|i| !i.is_approved)
            .collect();
        pending.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at).then(a.id.cmp(&b.id)));
        Ok(paginate(pending, page))
    }

    async fn feature_for_date(
        &self,
        date: NaiveDate,
    ) -> std::result::Result<Option<DailyFeature>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .features
            .get(&date)
            .map(|&image_id| DailyFeature { date, image_id }))
    }

    async fn feature_counts(&self) -> std::result::Result<HashMap<ImageId, u64>, StoreError> {
        let inner = self.inner.lock().await;
        let mut counts = HashMap::new();
        for image_id in inner.features.values() {
            *counts.entry(*image_id).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn insert_feature_if_absent(
        &self,
        feature: DailyFeature,
    ) -> std::result::Result<FeatureInsert, StoreError> {
        let mut inner = self.inner.lock().await;
        if let Some(&image_id) = inner.features.get(&feature.date) {
            return Ok(FeatureInsert::Existing(DailyFeature {
                date: feature.date,
                image_id,
            }));
        }
        inner.features.insert(feature.date, feature.image_id);
        Ok(FeatureInsert::Inserted(feature))
    }
}
