//! Fair daily rotation.
//!
//! One approved image is featured per calendar date. Selection for a date:
//!
//! 1. An existing record for the date is returned unchanged.
//! 2. The image featured the day before is excluded.
//! 3. Images never featured are preferred; otherwise the draw is among the
//!    images tied for the lowest feature count.
//! 4. The pick is persisted with insert-if-absent keyed by date. A concurrent
//!    caller that loses the race gets the winner's record.
//!
//! The draw is seeded from the selector seed and the date, so a given
//! (seed, date, pool, history) always produces the same pick.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::error::{Result, WallpaperError};
use crate::model::{DailyFeature, ImageId};
use crate::store::{FeatureInsert, WallpaperStore};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RotationSelector {
    seed: u64,
}

impl RotationSelector {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Return the image of the day for `date`, selecting and persisting it
    /// on first request.
    pub async fn select_for_date<S>(&self, store: &S, date: NaiveDate) -> Result<DailyFeature>
    where
        S: WallpaperStore + ?Sized,
    {
        if let Some(existing) = store.feature_for_date(date).await? {
            return Ok(existing);
        }

        let excluded = match date.pred_opt() {
            Some(yesterday) => store.feature_for_date(yesterday).await?.map(|f| f.image_id),
            None => None,
        };
        let approved = store.approved_image_ids().await?;
        let counts = store.feature_counts().await?;

        let image_id = self
            .choose(date, &approved, excluded, &counts)
            .ok_or(WallpaperError::NoEligibleImage { date })?;

        match store
            .insert_feature_if_absent(DailyFeature { date, image_id })
            .await?
        {
            FeatureInsert::Inserted(feature) => {
                info!(%date, image_id = %feature.image_id, "Selected image of the day");
                Ok(feature)
            }
            FeatureInsert::Existing(feature) => {
                debug!(%date, image_id = %feature.image_id, "Lost selection race, returning existing pick");
                Ok(feature)
            }
        }
    }

    /// [`select_for_date`](Self::select_for_date) for the clock's current date.
    pub async fn select_today<S>(&self, store: &S, clock: &dyn Clock) -> Result<DailyFeature>
    where
        S: WallpaperStore + ?Sized,
    {
        self.select_for_date(store, clock.today()).await
    }

    /// Pure selection step. Returns `None` when no image is eligible.
    pub fn choose(
        &self,
        date: NaiveDate,
        approved: &[ImageId],
        excluded: Option<ImageId>,
        counts: &HashMap<ImageId, u64>,
    ) -> Option<ImageId> {
        let mut eligible: Vec<ImageId> = approved
            .iter()
            .copied()
            .filter(|id| Some(*id) != excluded)
            .collect();
        eligible.sort_unstable();
        eligible.dedup();

        let count = |id: &ImageId| counts.get(id).copied().unwrap_or(0);

        let never_featured: Vec<ImageId> =
            eligible.iter().copied().filter(|id| count(id) == 0).collect();

        let candidates: Vec<ImageId> = if never_featured.is_empty() {
            let min = eligible.iter().map(count).min()?;
            eligible.into_iter().filter(|id| count(id) == min).collect()
        } else {
            never_featured
        };

        debug!(%date, candidates = candidates.len(), "Drawing image of the day");
        candidates.choose(&mut self.rng(date)).copied()
    }

    fn rng(&self, date: NaiveDate) -> StdRng {
        StdRng::seed_from_u64(self.seed ^ (date.num_days_from_ce() as i64 as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::duplicate::DuplicateDetector;
    use crate::fingerprint::{ComponentHash, Fingerprint};
    use crate::model::NewImage;
    use crate::store::MemoryStore;
    use chrono::Utc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn approved_pool(n: u64) -> MemoryStore {
        let store = MemoryStore::new();
        let detector = DuplicateDetector::new(0.0);
        for i in 0..n {
            let new = NewImage {
                fingerprint: Fingerprint::new(
                    ComponentHash::new(i.to_be_bytes()),
                    ComponentHash::new(i.to_be_bytes()),
                    ComponentHash::new(i.to_be_bytes()),
                ),
                file_name: format!("{i}.png"),
                content_type: "image/png".into(),
                source_url: None,
                width: 1920,
                height: 1080,
                data: vec![0; 8],
                uploaded_at: Utc::now(),
            };
            let image = store.create_image(new, &detector).await.unwrap();
            store.approve(image.id, Utc::now()).await.unwrap();
        }
        store
    }

    #[test]
    fn test_choose_prefers_never_featured() {
        let selector = RotationSelector::new(1);
        let approved = [ImageId(1), ImageId(2), ImageId(3)];
        let counts = HashMap::from([(ImageId(1), 4), (ImageId(2), 1)]);
        assert_eq!(
            selector.choose(date(2024, 1, 1), &approved, None, &counts),
            Some(ImageId(3))
        );
    }

    #[test]
    fn test_choose_least_featured() {
        let selector = RotationSelector::new(1);
        let approved = [ImageId(1), ImageId(2), ImageId(3)];
        let counts = HashMap::from([(ImageId(1), 3), (ImageId(2), 2), (ImageId(3), 5)]);
        assert_eq!(
            selector.choose(date(2024, 1, 1), &approved, None, &counts),
            Some(ImageId(2))
        );
    }

    #[test]
    fn test_choose_respects_exclusion() {
        let selector = RotationSelector::new(9);
        let approved = [ImageId(1), ImageId(2)];
        let counts = HashMap::from([(ImageId(1), 1), (ImageId(2), 5)]);
        assert_eq!(
            selector.choose(date(2024, 1, 1), &approved, Some(ImageId(1)), &counts),
            Some(ImageId(2))
        );
        assert_eq!(
            selector.choose(date(2024, 1, 1), &[ImageId(1)], Some(ImageId(1)), &counts),
            None
        );
        assert_eq!(selector.choose(date(2024, 1, 1), &[], None, &counts), None);
    }

    #[test]
    fn test_choose_is_deterministic_and_order_independent() {
        let selector = RotationSelector::new(42);
        let counts = HashMap::new();
        let forward: Vec<ImageId> = (1..=10).map(ImageId).collect();
        let mut backward = forward.clone();
        backward.reverse();
        let d = date(2025, 6, 15);
        assert_eq!(
            selector.choose(d, &forward, None, &counts),
            selector.choose(d, &backward, None, &counts)
        );
    }

    #[tokio::test]
    async fn test_empty_pool() {
        let store = MemoryStore::new();
        let err = RotationSelector::default()
            .select_for_date(&store, date(2024, 1, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, WallpaperError::NoEligibleImage { .. }));
    }

    #[tokio::test]
    async fn test_idempotent_for_same_date() {
        let store = approved_pool(5).await;
        let selector = RotationSelector::new(3);
        let d = date(2024, 3, 10);
        let first = selector.select_for_date(&store, d).await.unwrap();
        for _ in 0..5 {
            assert_eq!(selector.select_for_date(&store, d).await.unwrap(), first);
        }
        // A differently seeded selector still sees the stored pick
        let other = RotationSelector::new(99).select_for_date(&store, d).await.unwrap();
        assert_eq!(other, first);
        assert_eq!(store.feature_count().await, 1);
    }

    #[tokio::test]
    async fn test_single_image_cannot_repeat() {
        let store = approved_pool(1).await;
        let selector = RotationSelector::default();
        let d1 = date(2024, 1, 1);
        selector.select_for_date(&store, d1).await.unwrap();

        let err = selector
            .select_for_date(&store, d1.succ_opt().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, WallpaperError::NoEligibleImage { .. }));

        // Two days later the image is eligible again
        let d3 = date(2024, 1, 3);
        assert!(selector.select_for_date(&store, d3).await.is_ok());
    }

    #[tokio::test]
    async fn test_no_consecutive_repeats_and_fair_exposure() {
        let n = 7;
        let store = approved_pool(n).await;
        let selector = RotationSelector::new(2024);
        let start = date(2024, 1, 1);

        let mut previous = None;
        for offset in 0..100 {
            let d = start + chrono::Days::new(offset);
            let feature = selector.select_for_date(&store, d).await.unwrap();
            assert_ne!(Some(feature.image_id), previous);
            previous = Some(feature.image_id);

            let counts = store.feature_counts().await.unwrap();
            let values: Vec<u64> = (1..=n as i64)
                .map(|id| counts.get(&ImageId(id)).copied().unwrap_or(0))
                .collect();
            let max = values.iter().max().unwrap();
            let min = values.iter().min().unwrap();
            assert!(max - min <= 1, "unfair after {} days: {:?}", offset + 1, values);
        }
    }

    #[tokio::test]
    async fn test_select_today_uses_clock() {
        let store = approved_pool(3).await;
        let d = date(2030, 12, 31);
        let feature = RotationSelector::default()
            .select_today(&store, &FixedClock::at_date(d))
            .await
            .unwrap();
        assert_eq!(feature.date, d);
    }
}
