//! Submission and moderation workflow over a [`WallpaperStore`].

use std::sync::Arc;

use tracing::{info, warn};

use crate::clock::{Clock, SystemClock};
use crate::duplicate::DuplicateDetector;
use crate::error::{Result, WallpaperError};
use crate::fingerprint::FingerprintGenerator;
use crate::model::{Image, ImageId, NewImage, Page, PageRequest, Upload};
use crate::policy::UploadPolicy;
use crate::store::WallpaperStore;

/// Pending images shown per moderation page.
pub const PENDING_PAGE_SIZE: u32 = 20;

/// Approved images shown per gallery page.
pub const GALLERY_PAGE_SIZE: u32 = 12;

/// Entry point for contributed images.
///
/// A submission is decoded, checked against the [`UploadPolicy`],
/// fingerprinted, and handed to the store's guarded creation path together
/// with the [`DuplicateDetector`].
pub struct Curator<S: WallpaperStore + ?Sized> {
    store: Arc<S>,
    detector: DuplicateDetector,
    policy: UploadPolicy,
    generator: FingerprintGenerator,
    clock: Arc<dyn Clock>,
}

impl<S: WallpaperStore + ?Sized> Clone for Curator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            detector: self.detector,
            policy: self.policy,
            generator: self.generator,
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S: WallpaperStore + ?Sized> Curator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            detector: DuplicateDetector::default(),
            policy: UploadPolicy::default(),
            generator: FingerprintGenerator::new(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_detector(mut self, detector: DuplicateDetector) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_policy(mut self, policy: UploadPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn detector(&self) -> &DuplicateDetector {
        &self.detector
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    /// Accept a new image into the pending pool.
    pub async fn submit(&self, upload: Upload) -> Result<Image> {
        let new = self.prepare(upload)?;
        let file_name = new.file_name.clone();

        match self.store.create_image(new, &self.detector).await {
            Ok(image) => {
                info!(
                    image_id = %image.id,
                    file_name = %image.file_name,
                    fingerprint = %image.fingerprint,
                    "Image submitted"
                );
                Ok(image)
            }
            Err(WallpaperError::Duplicate(matched)) => {
                warn!(
                    %file_name,
                    matched_image_id = %matched.image_id,
                    kind = %matched.kind,
                    mean_distance = matched.mean_distance,
                    "Rejected duplicate upload"
                );
                Err(WallpaperError::Duplicate(matched))
            }
            Err(e) => Err(e),
        }
    }

    /// Decode, validate and fingerprint without touching the store.
    fn prepare(&self, upload: Upload) -> Result<NewImage> {
        let decoded = self.generator.decode(&upload.data)?;

        if let Err(e) = self.policy.check(decoded.width(), decoded.height()) {
            warn!(width = decoded.width(), height = decoded.height(), "Upload rejected by policy");
            return Err(e);
        }

        if let Some(declared) = upload.declared_type_mismatch(decoded.content_type()) {
            warn!(
                declared,
                sniffed = decoded.content_type(),
                "Declared content type disagrees with image data, storing sniffed type"
            );
        }

        let fingerprint = self.generator.fingerprint_image(&decoded.image)?;
        let file_name = upload.file_name.unwrap_or_else(|| {
            let ext = decoded.format.extensions_str().first().copied().unwrap_or("img");
            format!("upload.{}", ext)
        });

        Ok(NewImage {
            fingerprint,
            file_name,
            content_type: decoded.content_type().to_string(),
            source_url: upload.source_url,
            width: decoded.width(),
            height: decoded.height(),
            data: upload.data,
            uploaded_at: self.clock.now(),
        })
    }

    /// Approve one image. Approving twice is a no-op.
    pub async fn approve(&self, id: ImageId) -> Result<Image> {
        let image = self
            .store
            .approve(id, self.clock.now())
            .await?
            .ok_or(WallpaperError::NotFound(id))?;
        info!(image_id = %id, "Image approved");
        Ok(image)
    }

    /// Approve several images at once; returns how many were pending.
    pub async fn approve_many(&self, ids: &[ImageId]) -> Result<u64> {
        let changed = self.store.approve_many(ids, self.clock.now()).await?;
        info!(requested = ids.len(), approved = changed, "Bulk approval");
        Ok(changed)
    }

    /// Pending images, oldest upload first.
    pub async fn pending(&self, page: u32) -> Result<Page<Image>> {
        Ok(self
            .store
            .list_pending(PageRequest::new(page, PENDING_PAGE_SIZE))
            .await?)
    }

    /// Approved images, most recently approved first.
    pub async fn gallery(&self, page: u32) -> Result<Page<Image>> {
        Ok(self
            .store
            .list_approved(PageRequest::new(page, GALLERY_PAGE_SIZE))
            .await?)
    }

    pub async fn image(&self, id: ImageId) -> Result<Image> {
        self.store
            .image(id)
            .await?
            .ok_or(WallpaperError::NotFound(id))
    }

    /// Like [`image`](Self::image) but pending images are reported missing.
    pub async fn approved_image(&self, id: ImageId) -> Result<Image> {
        let image = self.image(id).await?;
        if !image.is_approved {
            return Err(WallpaperError::NotFound(id));
        }
        Ok(image)
    }

    /// Record and raw bytes of an image.
    pub async fn image_data(&self, id: ImageId) -> Result<(Image, Vec<u8>)> {
        let image = self.image(id).await?;
        let data = self
            .store
            .image_data(id)
            .await?
            .ok_or(WallpaperError::NotFound(id))?;
        Ok((image, data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::duplicate::MatchKind;
    use crate::store::MemoryStore;
    use chrono::NaiveDate;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::io::Cursor;

    /// 320x180 grid of random tiles, one layout per seed.
    fn png(seed: u64) -> Vec<u8> {
        let mut rng = StdRng::seed_from_u64(seed);
        let cells: Vec<u8> = (0..16 * 9).map(|_| rng.gen()).collect();
        let img = RgbImage::from_fn(320, 180, |x, y| {
            let v = cells[(y / 20 * 16 + x / 20) as usize];
            Rgb([v, v, v])
        });
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    fn curator() -> Curator<MemoryStore> {
        let clock = FixedClock::at_date(NaiveDate::from_ymd_opt(2024, 4, 1).unwrap());
        Curator::new(Arc::new(MemoryStore::new()))
            .with_policy(UploadPolicy::unrestricted())
            .with_clock(Arc::new(clock))
    }

    #[tokio::test]
    async fn test_submit_then_resubmit_is_exact_duplicate() {
        let curator = curator();
        let bytes = png(1);
        let image = curator.submit(Upload::new(bytes.clone())).await.unwrap();
        assert_eq!(image.content_type, "image/png");
        assert_eq!(image.file_name, "upload.png");
        assert_eq!((image.width, image.height), (320, 180));

        match curator.submit(Upload::new(bytes)).await {
            Err(WallpaperError::Duplicate(m)) => {
                assert_eq!(m.image_id, image.id);
                assert_eq!(m.kind, MatchKind::Exact);
            }
            other => panic!("expected duplicate, got {other:?}"),
        }
        assert_eq!(curator.store().image_count().await, 1);
    }

    #[tokio::test]
    async fn test_sniffed_type_wins_over_declared() {
        let curator = curator();
        let image = curator
            .submit(Upload::new(png(3)).with_content_type("image/gif"))
            .await
            .unwrap();
        assert_eq!(image.content_type, "image/png");
    }

    #[tokio::test]
    async fn test_invalid_image() {
        let curator = curator();
        let err = curator
            .submit(Upload::new(b"GIF89a-but-not-really".to_vec()))
            .await
            .unwrap_err();
        assert!(matches!(err, WallpaperError::InvalidImage(_)));
    }

    #[tokio::test]
    async fn test_policy_rejection_happens_before_store() {
        let curator = Curator::new(Arc::new(MemoryStore::new()));
        let err = curator
            .submit(Upload::new(png(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, WallpaperError::Rejected(_)));
        assert_eq!(curator.store().image_count().await, 0);
    }

    #[tokio::test]
    async fn test_moderation_flow() {
        let curator = curator();
        let a = curator
            .submit(Upload::new(png(1)).with_file_name("a.png"))
            .await
            .unwrap();
        let b = curator
            .submit(Upload::new(png(2)).with_file_name("b.png"))
            .await
            .unwrap();

        assert_eq!(curator.pending(1).await.unwrap().total, 2);
        assert!(matches!(
            curator.approved_image(a.id).await,
            Err(WallpaperError::NotFound(_))
        ));

        let approved = curator.approve(a.id).await.unwrap();
        assert!(approved.is_approved);
        assert!(approved.approved_at.is_some());
        assert_eq!(curator.approve_many(&[a.id, b.id]).await.unwrap(), 1);

        let gallery = curator.gallery(1).await.unwrap();
        assert_eq!(gallery.total, 2);
        assert_eq!(gallery.per_page, GALLERY_PAGE_SIZE);
        assert_eq!(curator.pending(1).await.unwrap().total, 0);

        let (image, data) = curator.image_data(b.id).await.unwrap();
        assert_eq!(image.file_name, "b.png");
        assert_eq!(data.len() as u64, image.byte_size);

        assert!(matches!(
            curator.approve(ImageId(404)).await,
            Err(WallpaperError::NotFound(ImageId(404)))
        ));
    }
}
