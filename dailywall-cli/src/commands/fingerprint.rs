//! Fingerprint command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use dailywall_core::FingerprintGenerator;
use tracing::info;

use crate::utils::{display_name, read_file};

/// Execute the fingerprint command.
pub fn execute(file: PathBuf, json: bool, quiet: bool) -> Result<()> {
    let bytes = read_file(&file)?;

    let generator = FingerprintGenerator::new();
    let decoded = generator
        .decode(&bytes)
        .with_context(|| format!("Failed to decode {}", file.display()))?;
    let fingerprint = generator
        .fingerprint_image(&decoded.image)
        .with_context(|| format!("Failed to fingerprint {}", file.display()))?;

    info!(path = %file.display(), %fingerprint, "Computed fingerprint");

    if json {
        let output = serde_json::json!({
            "file": display_name(&file),
            "fingerprint": fingerprint.to_string(),
            "phash": fingerprint.phash.to_hex(),
            "dhash": fingerprint.dhash.to_hex(),
            "whash": fingerprint.whash.to_hex(),
            "width": decoded.width(),
            "height": decoded.height(),
            "content_type": decoded.content_type(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if quiet {
        println!("{}", fingerprint);
    } else {
        println!("{}", display_name(&file).bold());
        println!(
            "   {} {}x{} ({})",
            "Image:".dimmed(),
            decoded.width(),
            decoded.height(),
            decoded.content_type()
        );
        println!("   {} {}", "pHash:".dimmed(), fingerprint.phash.to_hex());
        println!("   {} {}", "dHash:".dimmed(), fingerprint.dhash.to_hex());
        println!("   {} {}", "wHash:".dimmed(), fingerprint.whash.to_hex());
        println!("   {} {}", "Fingerprint:".dimmed(), fingerprint.to_string().cyan());
    }

    Ok(())
}
