//! dailywall CLI - tools for the curated wallpaper pool.

use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use colored::Colorize;
use dailywall_core::DEFAULT_DUPLICATE_THRESHOLD;
use tracing_subscriber::EnvFilter;

mod commands;
mod exit_codes;
mod utils;

use exit_codes::ExitCode;

#[derive(Parser)]
#[command(name = "dailywall")]
#[command(author, version, about = "Curated wallpaper pool with perceptual dedup and daily rotation", long_about = None)]
#[command(after_help = exit_codes::HELP)]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print only the essential result
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the composite perceptual fingerprint of an image
    Fingerprint {
        /// Path to the image
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Emit JSON
        #[arg(long)]
        json: bool,
    },

    /// Compare two images and report whether one duplicates the other
    Compare {
        #[arg(value_name = "A")]
        first: PathBuf,

        #[arg(value_name = "B")]
        second: PathBuf,

        /// Mean Hamming distance below which images are duplicates
        #[arg(short, long, default_value_t = DEFAULT_DUPLICATE_THRESHOLD)]
        threshold: f64,

        /// Emit JSON
        #[arg(long)]
        json: bool,
    },

    /// Replay a directory as uploads and report the duplicates
    Scan {
        /// Directory of images, processed in file-name order
        #[arg(value_name = "DIR")]
        dir: PathBuf,

        /// Mean Hamming distance below which images are duplicates
        #[arg(short, long, default_value_t = DEFAULT_DUPLICATE_THRESHOLD)]
        threshold: f64,
    },

    /// Simulate the daily rotation over an in-memory pool
    Simulate {
        /// Number of approved images in the pool
        #[arg(long, default_value_t = 10)]
        images: u32,

        /// Number of days to select
        #[arg(long, default_value_t = 30)]
        days: u32,

        /// Seed for the daily draw
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// First simulated day (YYYY-MM-DD)
        #[arg(long, default_value = "2024-01-01")]
        start: NaiveDate,
    },

    /// Resolve the image of the day against the database
    Select {
        /// Date to resolve (YYYY-MM-DD, default: today in UTC)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// PostgreSQL connection URL
        #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
        database_url: String,

        /// Seed for the daily draw
        #[arg(long, env = "ROTATION_SEED", default_value_t = 0)]
        seed: u64,

        /// Emit JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let quiet = cli.quiet;

    match cli.command {
        Commands::Fingerprint { file, json } => commands::fingerprint::execute(file, json, quiet),
        Commands::Compare {
            first,
            second,
            threshold,
            json,
        } => commands::compare::execute(first, second, threshold, json),
        Commands::Scan { dir, threshold } => {
            commands::scan::execute(dir, threshold, quiet).await?;
            Ok(())
        }
        Commands::Simulate {
            images,
            days,
            seed,
            start,
        } => commands::simulate::execute(images, days, seed, start, quiet).await,
        Commands::Select {
            date,
            database_url,
            seed,
            json,
        } => commands::select::execute(date, database_url, seed, json).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let exit = match run(cli).await {
        Ok(()) => ExitCode::success(),
        Err(err) => ExitCode::from_anyhow(&err),
    };

    if let Some(message) = &exit.message {
        eprintln!("{} {}", "error:".red().bold(), message);
    }
    std::process::exit(exit.code);
}
