//! Upload acceptance rules checked before fingerprinting.

use serde::{Deserialize, Serialize};

use crate::error::{Result, WallpaperError};

pub const DEFAULT_MIN_WIDTH: u32 = 1920;
pub const DEFAULT_MIN_HEIGHT: u32 = 1080;
pub const DEFAULT_ASPECT_RATIO: f64 = 16.0 / 9.0;
pub const DEFAULT_ASPECT_MARGIN: f64 = 0.3;

/// Minimum resolution and target aspect ratio for wallpapers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UploadPolicy {
    pub min_width: u32,
    pub min_height: u32,
    pub aspect_ratio: f64,
    /// Allowed absolute deviation from `aspect_ratio`
    pub aspect_margin: f64,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            min_width: DEFAULT_MIN_WIDTH,
            min_height: DEFAULT_MIN_HEIGHT,
            aspect_ratio: DEFAULT_ASPECT_RATIO,
            aspect_margin: DEFAULT_ASPECT_MARGIN,
        }
    }
}

impl UploadPolicy {
    /// A policy that accepts any non-empty image.
    pub fn unrestricted() -> Self {
        Self {
            min_width: 1,
            min_height: 1,
            aspect_ratio: DEFAULT_ASPECT_RATIO,
            aspect_margin: f64::INFINITY,
        }
    }

    pub fn check(&self, width: u32, height: u32) -> Result<()> {
        if width < self.min_width || height < self.min_height {
            return Err(WallpaperError::Rejected(format!(
                "Image resolution is too low ({}x{}). Minimum required is {}x{}.",
                width, height, self.min_width, self.min_height
            )));
        }

        let aspect_ratio = f64::from(width) / f64::from(height);
        if (aspect_ratio - self.aspect_ratio).abs() > self.aspect_margin {
            return Err(WallpaperError::Rejected(format!(
                "Image aspect ratio is {:.2}, but must be 16:9 ({:.2}) +- {}.",
                aspect_ratio, self.aspect_ratio, self.aspect_margin
            )));
        }

        Ok(())
    }
}
