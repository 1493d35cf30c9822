//! Duplicate detection over composite fingerprints.
//!
//! A candidate is a duplicate of an existing image when either
//!
//! - all three component hashes are bit-for-bit identical (exact match), or
//! - the mean Hamming distance across the three components is strictly below
//!   the configured threshold (similar match).
//!
//! The exact pass runs over the whole existing set before any approximate
//! comparison. Within a pass, the first match in iteration order wins.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::fingerprint::Fingerprint;
use crate::model::ImageId;

/// Default mean Hamming distance below which two images are duplicates.
pub const DEFAULT_DUPLICATE_THRESHOLD: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Similar,
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Similar => write!(f, "similar"),
        }
    }
}

/// The existing image a candidate collided with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DuplicateMatch {
    pub image_id: ImageId,
    pub kind: MatchKind,
    pub mean_distance: f64,
}

/// Outcome of a duplicate check.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DuplicateCheck {
    pub matched: Option<DuplicateMatch>,
}

impl DuplicateCheck {
    pub fn is_duplicate(&self) -> bool {
        self.matched.is_some()
    }
}

/// Linear-scan duplicate detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DuplicateDetector {
    threshold: f64,
}

impl Default for DuplicateDetector {
    fn default() -> Self {
        Self::new(DEFAULT_DUPLICATE_THRESHOLD)
    }
}

impl DuplicateDetector {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Whether two fingerprints are close enough to count as duplicates.
    pub fn is_similar(&self, a: &Fingerprint, b: &Fingerprint) -> bool {
        a == b || a.mean_distance(b) < self.threshold
    }

    /// Check a candidate against existing fingerprints.
    ///
    /// `existing` must be in ascending [`ImageId`] order for the oldest
    /// matching image to be reported.
    pub fn check<'a, I>(&self, candidate: &Fingerprint, existing: I) -> DuplicateCheck
    where
        I: IntoIterator<Item = &'a (ImageId, Fingerprint)>,
        I::IntoIter: Clone,
    {
        let existing = existing.into_iter();

        if let Some((id, _)) = existing.clone().find(|(_, fp)| fp == candidate) {
            debug!(image_id = %id, "Exact fingerprint match");
            return DuplicateCheck {
                matched: Some(DuplicateMatch {
                    image_id: *id,
                    kind: MatchKind::Exact,
                    mean_distance: 0.0,
                }),
            };
        }

        let mut scanned = 0usize;
        for (id, fp) in existing {
            scanned += 1;
            let mean_distance = candidate.mean_distance(fp);
            if mean_distance < self.threshold {
                debug!(image_id = %id, mean_distance, "Similar fingerprint match");
                return DuplicateCheck {
                    matched: Some(DuplicateMatch {
                        image_id: *id,
                        kind: MatchKind::Similar,
                        mean_distance,
                    }),
                };
            }
        }

        debug!(scanned, "No duplicate found");
        DuplicateCheck::default()
    }
}

/// Check a candidate against existing fingerprints with the default threshold.
pub fn check_duplicate(candidate: &Fingerprint, existing: &[(ImageId, Fingerprint)]) -> DuplicateCheck {
    DuplicateDetector::default().check(candidate, existing)
}
