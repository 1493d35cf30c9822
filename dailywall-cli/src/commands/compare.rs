//! Compare command implementation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;
use dailywall_core::{DuplicateDetector, Fingerprint, FingerprintGenerator};
use tracing::info;

use crate::utils::{display_name, read_file};

fn fingerprint_file(generator: &FingerprintGenerator, file: &Path) -> Result<Fingerprint> {
    let bytes = read_file(file)?;
    generator
        .compute_fingerprint(&bytes)
        .with_context(|| format!("Failed to fingerprint {}", file.display()))
}

/// Execute the compare command.
pub fn execute(first: PathBuf, second: PathBuf, threshold: f64, json: bool) -> Result<()> {
    let generator = FingerprintGenerator::new();
    let a = fingerprint_file(&generator, &first)?;
    let b = fingerprint_file(&generator, &second)?;

    let detector = DuplicateDetector::new(threshold);
    let [phash, dhash, whash] = a.component_distances(&b);
    let mean = a.mean_distance(&b);
    let verdict = if a == b {
        "exact"
    } else if detector.is_similar(&a, &b) {
        "similar"
    } else {
        "distinct"
    };

    info!(%a, %b, mean, verdict, "Compared fingerprints");

    if json {
        let output = serde_json::json!({
            "first": display_name(&first),
            "second": display_name(&second),
            "distances": { "phash": phash, "dhash": dhash, "whash": whash },
            "mean_distance": mean,
            "threshold": threshold,
            "verdict": verdict,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!(
        "{} {} {}",
        display_name(&first).bold(),
        "vs".dimmed(),
        display_name(&second).bold()
    );
    println!("   {} {}", "pHash distance:".dimmed(), phash);
    println!("   {} {}", "dHash distance:".dimmed(), dhash);
    println!("   {} {}", "wHash distance:".dimmed(), whash);
    println!("   {} {:.2} (threshold {})", "Mean:".dimmed(), mean, threshold);

    let verdict = match verdict {
        "exact" => "DUPLICATE (exact)".red().bold(),
        "similar" => "DUPLICATE (similar)".yellow().bold(),
        _ => "DISTINCT".green().bold(),
    };
    println!("   {} {}", "Verdict:".dimmed(), verdict);

    Ok(())
}
