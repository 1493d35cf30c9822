//! Scan command implementation.
//!
//! Replays a directory as a sequence of uploads against a fresh in-memory
//! pool, in file-name order, and reports which files would be refused.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;
use dailywall_core::{
    Curator, DuplicateDetector, ImageId, MemoryStore, Upload, UploadPolicy, WallpaperError,
};
use tracing::{debug, info};

use crate::utils::{display_name, list_files_sorted, read_file};

/// Per-directory tallies
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub accepted: usize,
    pub duplicates: usize,
    pub skipped: usize,
}

/// Execute the scan command.
pub async fn execute(dir: PathBuf, threshold: f64, quiet: bool) -> Result<ScanSummary> {
    let files = list_files_sorted(&dir)?;
    info!(dir = %dir.display(), files = files.len(), threshold, "Scanning directory");

    let curator = Curator::new(Arc::new(MemoryStore::new()))
        .with_detector(DuplicateDetector::new(threshold))
        .with_policy(UploadPolicy::unrestricted());

    let mut names: HashMap<ImageId, String> = HashMap::new();
    let mut summary = ScanSummary::default();

    for path in files {
        let name = display_name(&path);
        let bytes = read_file(&path)?;

        match curator.submit(Upload::new(bytes).with_file_name(name.clone())).await {
            Ok(image) => {
                summary.accepted += 1;
                names.insert(image.id, name.clone());
                if !quiet {
                    println!("{} {}", "  new ".green(), name);
                }
            }
            Err(WallpaperError::Duplicate(matched)) => {
                summary.duplicates += 1;
                let original = names
                    .get(&matched.image_id)
                    .map(String::as_str)
                    .unwrap_or("?");
                println!(
                    "{} {} {} {} ({}, mean {:.2})",
                    "  dup ".red().bold(),
                    name,
                    "duplicates".dimmed(),
                    original,
                    matched.kind,
                    matched.mean_distance
                );
            }
            Err(WallpaperError::InvalidImage(reason)) => {
                summary.skipped += 1;
                debug!(file = %name, %reason, "Not an image");
                if !quiet {
                    println!("{} {} {}", "  skip".dimmed(), name, "(not an image)".dimmed());
                }
            }
            Err(e) => return Err(e.into()),
        }
    }

    if !quiet {
        println!();
        println!(
            "{} {} unique, {} duplicate(s), {} skipped",
            "Summary:".bold(),
            summary.accepted,
            summary.duplicates,
            summary.skipped
        );
    }

    Ok(summary)
}
