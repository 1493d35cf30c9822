//! Composite perceptual fingerprints.
//!
//! A [`Fingerprint`] is an ordered triple of independent 64-bit perceptual
//! hashes computed from the decoded pixels of an image:
//!
//! 1. **pHash**: DCT coefficients thresholded at their median (frequency domain)
//! 2. **dHash**: horizontal gradient hash
//! 3. **wHash**: Haar wavelet hash over the low-frequency band
//!
//! The components are compared independently; they are never blended into a
//! single hash before comparison.
//!
//! # Usage
//!
//! ```no_run
//! use dailywall_core::fingerprint::compute_fingerprint;
//!
//! let a = compute_fingerprint(&std::fs::read("a.jpg").unwrap()).unwrap();
//! let b = compute_fingerprint(&std::fs::read("b.jpg").unwrap()).unwrap();
//! println!("mean distance: {:.2}", a.mean_distance(&b));
//! ```

use std::fmt;
use std::str::FromStr;

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use image_hasher::{HashAlg, HasherConfig};
use serde::{Deserialize, Serialize};

use crate::error::{Result, WallpaperError};

/// Size of one component hash in bytes (64 bits).
pub const COMPONENT_HASH_SIZE: usize = 8;

/// Side length of the hash grid.
const HASH_GRID: u32 = 8;

/// Working resolution of the wavelet hash before decomposition.
const WAVELET_SCALE: u32 = 64;

/// Separator between components in the persisted form.
const SEPARATOR: char = '_';

/// One 64-bit perceptual hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentHash([u8; COMPONENT_HASH_SIZE]);

impl ComponentHash {
    pub fn new(bytes: [u8; COMPONENT_HASH_SIZE]) -> Self {
        Self(bytes)
    }

    /// Build from a slice that must be exactly 8 bytes long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; COMPONENT_HASH_SIZE] = bytes.try_into().map_err(|_| {
            WallpaperError::InvalidFingerprint(format!(
                "expected {} hash bytes, got {}",
                COMPONENT_HASH_SIZE,
                bytes.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; COMPONENT_HASH_SIZE] {
        &self.0
    }

    /// Number of differing bits.
    pub fn distance(&self, other: &Self) -> u32 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let bytes = hex::decode(hex_str).map_err(|e| {
            WallpaperError::InvalidFingerprint(format!("Invalid hex string: {}", e))
        })?;
        Self::from_slice(&bytes)
    }
}

/// Composite fingerprint: `(phash, dhash, whash)`.
///
/// Persisted as `<phash>_<dhash>_<whash>`, each component 16 lowercase hex
/// digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint {
    pub phash: ComponentHash,
    pub dhash: ComponentHash,
    pub whash: ComponentHash,
}

impl Fingerprint {
    pub fn new(phash: ComponentHash, dhash: ComponentHash, whash: ComponentHash) -> Self {
        Self {
            phash,
            dhash,
            whash,
        }
    }

    /// Hamming distance of each component, in `(phash, dhash, whash)` order.
    pub fn component_distances(&self, other: &Self) -> [u32; 3] {
        [
            self.phash.distance(&other.phash),
            self.dhash.distance(&other.dhash),
            self.whash.distance(&other.whash),
        ]
    }

    /// Arithmetic mean of the three component distances.
    pub fn mean_distance(&self, other: &Self) -> f64 {
        let total: u32 = self.component_distances(other).iter().sum();
        f64::from(total) / 3.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{sep}{}{sep}{}",
            self.phash.to_hex(),
            self.dhash.to_hex(),
            self.whash.to_hex(),
            sep = SEPARATOR
        )
    }
}

impl FromStr for Fingerprint {
    type Err = WallpaperError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().split(SEPARATOR).collect();
        let [phash, dhash, whash] = parts.as_slice() else {
            return Err(WallpaperError::InvalidFingerprint(format!(
                "expected 3 components, got {}",
                parts.len()
            )));
        };

        Ok(Self {
            phash: ComponentHash::from_hex(phash)?,
            dhash: ComponentHash::from_hex(dhash)?,
            whash: ComponentHash::from_hex(whash)?,
        })
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = WallpaperError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Fingerprint> for String {
    fn from(fingerprint: Fingerprint) -> Self {
        fingerprint.to_string()
    }
}

/// A decoded submission with the format it was sniffed as.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub image: DynamicImage,
    pub format: ImageFormat,
}

impl DecodedImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn content_type(&self) -> &'static str {
        self.format.to_mime_type()
    }
}

/// Fingerprint computation.
///
/// Stateless; the underlying hashers are configured per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct FingerprintGenerator;

impl FingerprintGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Decode raw bytes (JPEG, PNG, GIF or WebP).
    pub fn decode(&self, bytes: &[u8]) -> Result<DecodedImage> {
        if bytes.is_empty() {
            return Err(WallpaperError::InvalidImage("empty payload".into()));
        }

        let format = image::guess_format(bytes)
            .map_err(|e| WallpaperError::InvalidImage(format!("Unrecognized format: {}", e)))?;
        let image = image::load_from_memory_with_format(bytes, format)
            .map_err(|e| WallpaperError::InvalidImage(format!("Failed to decode image: {}", e)))?;

        if image.width() == 0 || image.height() == 0 {
            return Err(WallpaperError::InvalidImage("image has no pixels".into()));
        }

        Ok(DecodedImage { image, format })
    }

    /// Compute the composite fingerprint of raw image bytes.
    pub fn compute_fingerprint(&self, bytes: &[u8]) -> Result<Fingerprint> {
        let decoded = self.decode(bytes)?;
        self.fingerprint_image(&decoded.image)
    }

    /// Compute the composite fingerprint of an already decoded image.
    pub fn fingerprint_image(&self, image: &DynamicImage) -> Result<Fingerprint> {
        Ok(Fingerprint {
            phash: phash(image)?,
            dhash: dhash(image)?,
            whash: whash(image),
        })
    }
}

/// Compute the composite fingerprint of raw image bytes.
///
/// Fails with [`WallpaperError::InvalidImage`] when the bytes do not decode.
pub fn compute_fingerprint(bytes: &[u8]) -> Result<Fingerprint> {
    FingerprintGenerator::new().compute_fingerprint(bytes)
}

fn phash(image: &DynamicImage) -> Result<ComponentHash> {
    let hasher = HasherConfig::new()
        .hash_size(HASH_GRID, HASH_GRID)
        .hash_alg(HashAlg::Median)
        .preproc_dct()
        .to_hasher();
    ComponentHash::from_slice(hasher.hash_image(image).as_bytes())
}

fn dhash(image: &DynamicImage) -> Result<ComponentHash> {
    let hasher = HasherConfig::new()
        .hash_size(HASH_GRID, HASH_GRID)
        .hash_alg(HashAlg::Gradient)
        .to_hasher();
    ComponentHash::from_slice(hasher.hash_image(image).as_bytes())
}

/// Wavelet hash.
///
/// 1. Reduce to 64x64 grayscale, scaled to [0, 1]
/// 2. Remove the global mean (the coarsest Haar approximation)
/// 3. Three Haar levels, keeping the LL band (64 -> 32 -> 16 -> 8)
/// 4. Compare each 8x8 coefficient to the median
fn whash(image: &DynamicImage) -> ComponentHash {
    let resized = image
        .grayscale()
        .resize_exact(WAVELET_SCALE, WAVELET_SCALE, FilterType::Lanczos3)
        .to_luma8();

    let mut pixels: Vec<f64> = resized.pixels().map(|p| f64::from(p.0[0]) / 255.0).collect();

    let mean = pixels.iter().sum::<f64>() / pixels.len() as f64;
    for p in pixels.iter_mut() {
        *p -= mean;
    }

    let mut size = WAVELET_SCALE as usize;
    while size > HASH_GRID as usize {
        pixels = haar_ll(&pixels, size);
        size /= 2;
    }

    let median = median(&pixels);
    let bits: Vec<bool> = pixels.iter().map(|&v| v > median).collect();
    ComponentHash(bools_to_bytes(&bits))
}

/// One level of the 2-D Haar transform, approximation band only.
fn haar_ll(pixels: &[f64], size: usize) -> Vec<f64> {
    let half = size / 2;
    let mut out = Vec::with_capacity(half * half);
    for y in 0..half {
        for x in 0..half {
            let top = 2 * y * size + 2 * x;
            let bottom = top + size;
            let sum = pixels[top] + pixels[top + 1] + pixels[bottom] + pixels[bottom + 1];
            out.push(sum / 2.0);
        }
    }
    out
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Pack bits MSB first.
fn bools_to_bytes(bits: &[bool]) -> [u8; COMPONENT_HASH_SIZE] {
    let mut bytes = [0u8; COMPONENT_HASH_SIZE];
    for (i, chunk) in bits.chunks(8).take(COMPONENT_HASH_SIZE).enumerate() {
        for (j, &bit) in chunk.iter().enumerate() {
            if bit {
                bytes[i] |= 1 << (7 - j);
            }
        }
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::io::Cursor;

    fn pattern(width: u32, height: u32) -> DynamicImage {
        let img = RgbImage::from_fn(width, height, |x, y| {
            let fx = x as f64 / width as f64;
            let fy = y as f64 / height as f64;
            let v = 128.0 + 100.0 * (fx * 9.0).sin() * (fy * 7.0).cos();
            Rgb([v as u8, (255.0 * fx) as u8, (255.0 * fy) as u8])
        });
        DynamicImage::ImageRgb8(img)
    }

    /// 16x9 grid of random gray tiles, one independent layout per seed.
    fn tiles(seed: u64) -> DynamicImage {
        let mut rng = StdRng::seed_from_u64(seed);
        let cells: Vec<u8> = (0..16 * 9).map(|_| rng.gen()).collect();
        DynamicImage::ImageRgb8(RgbImage::from_fn(320, 180, |x, y| {
            let v = cells[(y / 20 * 16 + x / 20) as usize];
            Rgb([v, v, v])
        }))
    }

    fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_component_distance() {
        let a = ComponentHash::new([0x00; 8]);
        let b = ComponentHash::new([0xFF; 8]);
        let c = ComponentHash::new([0x01, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(a.distance(&a), 0);
        assert_eq!(a.distance(&b), 64);
        assert_eq!(a.distance(&c), 1);
    }

    #[test]
    fn test_component_from_slice_rejects_wrong_length() {
        assert!(ComponentHash::from_slice(&[0u8; 5]).is_err());
        assert!(ComponentHash::from_slice(&[0u8; 8]).is_ok());
    }

    #[test]
    fn test_fingerprint_string_form() {
        let fp = Fingerprint::new(
            ComponentHash::new([0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE, 0xBA, 0xBE]),
            ComponentHash::new([0x00; 8]),
            ComponentHash::new([0xFF; 8]),
        );
        let s = fp.to_string();
        assert_eq!(s, "deadbeefcafebabe_0000000000000000_ffffffffffffffff");
        assert_eq!(s.len(), 50);
        assert_eq!(s.parse::<Fingerprint>().unwrap(), fp);
    }

    #[test]
    fn test_fingerprint_parse_errors() {
        assert!("abc".parse::<Fingerprint>().is_err());
        assert!("00_00_00".parse::<Fingerprint>().is_err());
        assert!("zzzzzzzzzzzzzzzz_0000000000000000_0000000000000000"
            .parse::<Fingerprint>()
            .is_err());
        assert!("0000000000000000_0000000000000000"
            .parse::<Fingerprint>()
            .is_err());
    }

    #[test]
    fn test_fingerprint_serde_uses_string_form() {
        let fp = Fingerprint::new(
            ComponentHash::new([1; 8]),
            ComponentHash::new([2; 8]),
            ComponentHash::new([3; 8]),
        );
        let json = serde_json::to_string(&fp).unwrap();
        assert_eq!(
            json,
            "\"0101010101010101_0202020202020202_0303030303030303\""
        );
        let back: Fingerprint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fp);
    }

    #[test]
    fn test_mean_distance() {
        let zero = Fingerprint::new(
            ComponentHash::new([0; 8]),
            ComponentHash::new([0; 8]),
            ComponentHash::new([0; 8]),
        );
        let other = Fingerprint::new(
            ComponentHash::new([0x0F, 0, 0, 0, 0, 0, 0, 0]),
            ComponentHash::new([0x03, 0, 0, 0, 0, 0, 0, 0]),
            ComponentHash::new([0; 8]),
        );
        assert_eq!(zero.component_distances(&other), [4, 2, 0]);
        assert!((zero.mean_distance(&other) - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_compute_is_deterministic() {
        let bytes = encode(&pattern(320, 180), ImageFormat::Png);
        let a = compute_fingerprint(&bytes).unwrap();
        let b = compute_fingerprint(&bytes).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_unrelated_images_differ_in_every_component() {
        let generator = FingerprintGenerator::new();
        let fps: Vec<Fingerprint> = (0..6)
            .map(|seed| generator.fingerprint_image(&tiles(seed)).unwrap())
            .collect();

        let mut totals = [0u32; 3];
        let mut pairs = 0u32;
        for (i, a) in fps.iter().enumerate() {
            for b in &fps[i + 1..] {
                let distances = a.component_distances(b);
                assert!(
                    distances.iter().all(|&d| d >= 8),
                    "unrelated pair too close: {distances:?}"
                );
                for (total, d) in totals.iter_mut().zip(distances) {
                    *total += d;
                }
                pairs += 1;
            }
        }

        for (name, total) in ["phash", "dhash", "whash"].iter().zip(totals) {
            let mean = f64::from(total) / f64::from(pairs);
            assert!(mean > 16.0, "{name} mean distance {mean:.1} over unrelated pairs");
        }
    }

    #[test]
    fn test_phash_is_not_constant() {
        let generator = FingerprintGenerator::new();
        let hashes: Vec<ComponentHash> = (0..6)
            .map(|seed| generator.fingerprint_image(&tiles(seed)).unwrap().phash)
            .collect();
        let ones: Vec<u32> = hashes
            .iter()
            .map(|h| h.as_bytes().iter().map(|b| b.count_ones()).sum())
            .collect();
        // Median threshold splits the 64 coefficients roughly in half
        assert!(ones.iter().all(|&n| (24..=40).contains(&n)), "{ones:?}");
    }

    #[test]
    fn test_invalid_bytes_rejected() {
        assert!(matches!(
            compute_fingerprint(b"definitely not an image"),
            Err(WallpaperError::InvalidImage(_))
        ));
        assert!(matches!(
            compute_fingerprint(&[]),
            Err(WallpaperError::InvalidImage(_))
        ));
        // PNG magic followed by garbage
        assert!(matches!(
            compute_fingerprint(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 1, 2]),
            Err(WallpaperError::InvalidImage(_))
        ));
    }

    #[test]
    fn test_decode_reports_format() {
        let bytes = encode(&pattern(64, 36), ImageFormat::Png);
        let decoded = FingerprintGenerator::new().decode(&bytes).unwrap();
        assert_eq!(decoded.format, ImageFormat::Png);
        assert_eq!(decoded.content_type(), "image/png");
        assert_eq!((decoded.width(), decoded.height()), (64, 36));
    }

    #[test]
    fn test_whash_of_flat_image_is_stable() {
        let flat = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 64, Rgb([90, 90, 90])));
        assert_eq!(whash(&flat), whash(&flat));
    }

    #[test]
    fn test_haar_ll_halves() {
        let pixels = vec![1.0; 16];
        let ll = haar_ll(&pixels, 4);
        assert_eq!(ll.len(), 4);
        assert!(ll.iter().all(|&v| (v - 2.0).abs() < f64::EPSILON));
    }

    #[test]
    fn test_median_even_count() {
        assert!((median(&[4.0, 1.0, 3.0, 2.0]) - 2.5).abs() < f64::EPSILON);
        assert!((median(&[3.0, 1.0, 2.0]) - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_bools_to_bytes_msb_first() {
        let mut bits = vec![false; 64];
        bits[0] = true;
        bits[63] = true;
        let bytes = bools_to_bytes(&bits);
        assert_eq!(bytes[0], 0x80);
        assert_eq!(bytes[7], 0x01);
    }
}
