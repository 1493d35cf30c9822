//! Select command implementation.
//!
//! Resolves the image of the day against the production database. Safe to
//! run from cron alongside the server: the first caller for a date persists
//! the pick and everyone else reads it back.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use colored::Colorize;
use dailywall_core::{Clock, PostgresStore, RotationSelector, SystemClock, WallpaperStore};
use tracing::info;

/// Execute the select command.
pub async fn execute(
    date: Option<NaiveDate>,
    database_url: String,
    seed: u64,
    json: bool,
) -> Result<()> {
    let store = PostgresStore::new(&database_url, 2)
        .await
        .context("Failed to connect to database")?;

    let date = date.unwrap_or_else(|| SystemClock.today());
    let feature = RotationSelector::new(seed)
        .select_for_date(&store, date)
        .await
        .with_context(|| format!("Failed to select image for {}", date))?;
    let image = store
        .image(feature.image_id)
        .await
        .context("Failed to load selected image")?;

    info!(%date, image_id = %feature.image_id, "Resolved image of the day");

    if json {
        let output = serde_json::json!({
            "date": feature.date,
            "image_id": feature.image_id,
            "file_name": image.as_ref().map(|i| i.file_name.as_str()),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!(
            "{} {} {}",
            feature.date.to_string().bold(),
            "->".dimmed(),
            format!("image {}", feature.image_id).cyan()
        );
        if let Some(image) = image {
            println!("   {} {}", "File:".dimmed(), image.file_name);
        }
    }

    Ok(())
}
