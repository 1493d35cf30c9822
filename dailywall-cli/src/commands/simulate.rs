//! Simulate command implementation.
//!
//! Runs the daily rotation over a synthetic, fully approved pool and reports
//! how often each image was featured.

use std::collections::BTreeMap;

use anyhow::{bail, Result};
use chrono::{Days, NaiveDate, NaiveTime};
use colored::Colorize;
use dailywall_core::{
    DuplicateDetector, ImageId, MemoryStore, NewImage, RotationSelector, WallpaperStore,
};
use tracing::info;

use crate::utils::synthetic_fingerprint;

/// Result of a rotation run
#[derive(Debug)]
pub struct SimulationReport {
    /// Image featured on each day, in order
    pub sequence: Vec<ImageId>,
    /// Times each image was featured
    pub counts: BTreeMap<ImageId, u64>,
}

impl SimulationReport {
    /// Difference between the most and least featured image.
    pub fn spread(&self) -> u64 {
        let max = self.counts.values().max().copied().unwrap_or(0);
        let min = self.counts.values().min().copied().unwrap_or(0);
        max - min
    }

    /// Days on which yesterday's image came back.
    pub fn consecutive_repeats(&self) -> usize {
        self.sequence.windows(2).filter(|w| w[0] == w[1]).count()
    }
}

/// Run `days` selections starting at `start` over `images` approved images.
pub async fn run(images: u32, days: u32, seed: u64, start: NaiveDate) -> Result<SimulationReport> {
    let store = MemoryStore::new();
    // Synthetic fingerprints differ by only a few bits; only exact matches count
    let detector = DuplicateDetector::new(0.0);
    let created_at = start.and_time(NaiveTime::MIN).and_utc();

    let mut ids = Vec::with_capacity(images as usize);
    for n in 0..images {
        let image = store
            .create_image(
                NewImage {
                    fingerprint: synthetic_fingerprint(u64::from(n)),
                    file_name: format!("wallpaper-{:04}.jpg", n + 1),
                    content_type: "image/jpeg".to_string(),
                    source_url: None,
                    width: 1920,
                    height: 1080,
                    data: Vec::new(),
                    uploaded_at: created_at,
                },
                &detector,
            )
            .await?;
        ids.push(image.id);
    }
    store.approve_many(&ids, created_at).await?;

    let selector = RotationSelector::new(seed);
    let mut counts: BTreeMap<ImageId, u64> = ids.iter().map(|id| (*id, 0)).collect();
    let mut sequence = Vec::with_capacity(days as usize);

    for offset in 0..days {
        let Some(date) = start.checked_add_days(Days::new(u64::from(offset))) else {
            bail!("Date out of range after {} day(s)", offset);
        };
        let feature = selector.select_for_date(&store, date).await?;
        *counts.entry(feature.image_id).or_insert(0) += 1;
        sequence.push(feature.image_id);
    }

    info!(images, days, seed, "Simulation finished");
    Ok(SimulationReport { sequence, counts })
}

/// Execute the simulate command.
pub async fn execute(images: u32, days: u32, seed: u64, start: NaiveDate, quiet: bool) -> Result<()> {
    if images == 0 {
        bail!("--images must be at least 1");
    }

    let report = run(images, days, seed, start).await?;

    if quiet {
        println!("{}", report.spread());
        return Ok(());
    }

    println!(
        "{} {} image(s), {} day(s) from {}, seed {}",
        "Rotation:".bold(),
        images,
        days,
        start,
        seed
    );
    println!();
    for (id, count) in &report.counts {
        println!("   {} {:>4}  {}", "image".dimmed(), id, "#".repeat(*count as usize).cyan());
    }
    println!();
    println!("   {} {}", "Spread (max - min):".dimmed(), report.spread());

    let repeats = report.consecutive_repeats();
    if repeats == 0 {
        println!("   {} {}", "Consecutive repeats:".dimmed(), "0".green());
    } else {
        println!("   {} {}", "Consecutive repeats:".dimmed(), repeats.to_string().red());
    }

    Ok(())
}
