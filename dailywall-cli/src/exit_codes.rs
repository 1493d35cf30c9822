//! Exit codes following sysexits.h conventions.
//!
//! These codes provide semantic meaning for different failure modes,
//! enabling scripts and cron jobs to handle errors appropriately.

use std::io;

use dailywall_core::{StoreError, WallpaperError};

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// General error (catch-all).
pub const GENERAL_ERROR: i32 = 1;

/// File is not a decodable image, or is outside the upload policy.
/// Maps to EX_DATAERR from sysexits.h.
pub const INVALID_IMAGE: i32 = 65;

/// Cannot open input file or directory.
/// Maps to EX_NOINPUT from sysexits.h.
pub const INPUT_ERROR: i32 = 66;

/// No image can be featured, or the database is unreachable.
/// Maps to EX_UNAVAILABLE from sysexits.h.
pub const NO_ELIGIBLE_IMAGE: i32 = 69;

/// Help text appended to `--help`.
pub const HELP: &str = "\
Exit codes:
  0   Success
  1   General error
  65  Invalid image (not decodable or outside the upload policy)
  66  Input file or directory cannot be read
  69  No eligible image, or database unavailable";

/// Represents an exit code with optional error context.
#[derive(Debug)]
pub struct ExitCode {
    pub code: i32,
    pub message: Option<String>,
}

impl ExitCode {
    pub const fn success() -> Self {
        Self {
            code: SUCCESS,
            message: None,
        }
    }

    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");

        // Classify by the first typed cause in the chain
        let code = err
            .chain()
            .find_map(|cause| {
                if let Some(e) = cause.downcast_ref::<WallpaperError>() {
                    Some(match e {
                        WallpaperError::InvalidImage(_) | WallpaperError::Rejected(_) => {
                            INVALID_IMAGE
                        }
                        WallpaperError::NoEligibleImage { .. } | WallpaperError::Store(_) => {
                            NO_ELIGIBLE_IMAGE
                        }
                        _ => GENERAL_ERROR,
                    })
                } else if cause.downcast_ref::<StoreError>().is_some() {
                    Some(NO_ELIGIBLE_IMAGE)
                } else if cause.downcast_ref::<io::Error>().is_some() {
                    Some(INPUT_ERROR)
                } else {
                    None
                }
            })
            .unwrap_or(GENERAL_ERROR);

        Self {
            code,
            message: Some(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use chrono::NaiveDate;

    #[test]
    fn test_classifies_wallpaper_errors() {
        let err = anyhow::Error::new(WallpaperError::InvalidImage("bad".into()))
            .context("Failed to fingerprint a.png");
        assert_eq!(ExitCode::from_anyhow(&err).code, INVALID_IMAGE);

        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let err = anyhow::Error::new(WallpaperError::NoEligibleImage { date });
        assert_eq!(ExitCode::from_anyhow(&err).code, NO_ELIGIBLE_IMAGE);
    }

    #[test]
    fn test_classifies_io_errors() {
        let err = std::fs::read("/definitely/not/here.png")
            .context("Failed to read file")
            .unwrap_err();
        let exit = ExitCode::from_anyhow(&err);
        assert_eq!(exit.code, INPUT_ERROR);
        assert!(exit.message.unwrap().starts_with("Failed to read file"));
    }

    #[test]
    fn test_unclassified_is_general() {
        let err = anyhow::anyhow!("something else");
        assert_eq!(ExitCode::from_anyhow(&err).code, GENERAL_ERROR);
        assert_eq!(ExitCode::success().code, SUCCESS);
    }
}
