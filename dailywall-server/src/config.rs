//! Server configuration module
//!
//! Handles loading configuration from environment variables with sensible defaults.

use std::net::SocketAddr;

use dailywall_core::policy::{
    DEFAULT_ASPECT_MARGIN, DEFAULT_ASPECT_RATIO, DEFAULT_MIN_HEIGHT, DEFAULT_MIN_WIDTH,
};
use dailywall_core::{UploadPolicy, DEFAULT_DUPLICATE_THRESHOLD};

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port (default: 3000)
    pub port: u16,
    /// Server host (default: 127.0.0.1)
    pub host: [u8; 4],
    /// PostgreSQL URL; in-memory store when unset
    pub database_url: Option<String>,
    /// Database connection pool maximum connections (default: 10)
    pub database_max_connections: u32,
    /// Allowed CORS origins, comma-separated (default: allow all in dev)
    pub allowed_origins: Option<Vec<String>>,
    /// Request body limit in MB (default: 50)
    pub body_limit_mb: usize,
    /// Maximum file size per upload in MB (default: 25)
    pub max_file_size_mb: usize,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
    /// Enable rate limiting (default: false for tests, true when loaded from env)
    pub rate_limit_enabled: bool,
    /// Rate limit: requests per second (default: 10)
    pub rate_limit_per_sec: u64,
    /// Rate limit: burst size (default: 20)
    pub rate_limit_burst: u32,
    /// Mean Hamming distance below which uploads are duplicates (default: 5.0)
    pub duplicate_threshold: f64,
    /// Minimum accepted width in pixels (default: 1920)
    pub min_width: u32,
    /// Minimum accepted height in pixels (default: 1080)
    pub min_height: u32,
    /// Allowed deviation from 16:9 (default: 0.3)
    pub aspect_ratio_margin: f64,
    /// Seed for the daily draw (default: 0)
    pub rotation_seed: u64,
    /// Timeout for downloading images from a URL (default: 10)
    pub url_fetch_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            host: [127, 0, 0, 1],
            database_url: None,
            database_max_connections: 10,
            allowed_origins: None, // None = allow all (dev mode)
            body_limit_mb: 50,
            max_file_size_mb: 25,
            timeout_secs: 30,
            rate_limit_enabled: false, // Disabled by default (for tests)
            rate_limit_per_sec: 10,
            rate_limit_burst: 20,
            duplicate_threshold: DEFAULT_DUPLICATE_THRESHOLD,
            min_width: DEFAULT_MIN_WIDTH,
            min_height: DEFAULT_MIN_HEIGHT,
            aspect_ratio_margin: DEFAULT_ASPECT_MARGIN,
            rotation_seed: 0,
            url_fetch_timeout_secs: 10,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let host = std::env::var("HOST")
            .ok()
            .map(|h| {
                if h == "0.0.0.0" {
                    [0, 0, 0, 0]
                } else {
                    [127, 0, 0, 1]
                }
            })
            .unwrap_or(defaults.host);

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.is_empty());

        let allowed_origins = std::env::var("ALLOWED_ORIGINS").ok().map(|origins| {
            origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        });

        // Rate limiting enabled by default in production, can be disabled with RATE_LIMIT_ENABLED=false
        let rate_limit_enabled = std::env::var("RATE_LIMIT_ENABLED")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);

        Self {
            port: env_parse("PORT", defaults.port),
            host,
            database_url,
            database_max_connections: env_parse(
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            ),
            allowed_origins,
            body_limit_mb: env_parse("BODY_LIMIT_MB", defaults.body_limit_mb),
            max_file_size_mb: env_parse("MAX_FILE_SIZE_MB", defaults.max_file_size_mb),
            timeout_secs: env_parse("REQUEST_TIMEOUT_SECS", defaults.timeout_secs),
            rate_limit_enabled,
            rate_limit_per_sec: env_parse("RATE_LIMIT_PER_SEC", defaults.rate_limit_per_sec),
            rate_limit_burst: env_parse("RATE_LIMIT_BURST", defaults.rate_limit_burst),
            duplicate_threshold: env_parse("DUPLICATE_THRESHOLD", defaults.duplicate_threshold),
            min_width: env_parse("MIN_WIDTH", defaults.min_width),
            min_height: env_parse("MIN_HEIGHT", defaults.min_height),
            aspect_ratio_margin: env_parse("ASPECT_RATIO_MARGIN", defaults.aspect_ratio_margin),
            rotation_seed: env_parse("ROTATION_SEED", defaults.rotation_seed),
            url_fetch_timeout_secs: env_parse(
                "URL_FETCH_TIMEOUT_SECS",
                defaults.url_fetch_timeout_secs,
            ),
        }
    }

    /// Get socket address from config
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from((self.host, self.port))
    }

    /// Upload policy derived from the resolution and aspect settings
    pub fn upload_policy(&self) -> UploadPolicy {
        UploadPolicy {
            min_width: self.min_width,
            min_height: self.min_height,
            aspect_ratio: DEFAULT_ASPECT_RATIO,
            aspect_margin: self.aspect_ratio_margin,
        }
    }

    /// Maximum upload size in bytes
    pub fn max_file_size(&self) -> usize {
        self.max_file_size_mb * 1024 * 1024
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 3000);
        assert!(config.database_url.is_none());
        assert!(!config.rate_limit_enabled);
        assert_eq!(config.duplicate_threshold, 5.0);
    }

    #[test]
    fn test_upload_policy_from_config() {
        let config = Config {
            min_width: 800,
            min_height: 600,
            aspect_ratio_margin: 1.0,
            ..Config::default()
        };
        let policy = config.upload_policy();
        assert_eq!(policy.min_width, 800);
        assert!(policy.check(800, 600).is_ok());
        assert!(policy.check(799, 600).is_err());
    }

    #[test]
    fn test_socket_addr() {
        let config = Config {
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:8080");
        assert_eq!(config.max_file_size(), 25 * 1024 * 1024);
    }
}
