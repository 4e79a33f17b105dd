//! Configuration schema for Scarlet
//!
//! Configuration is stored at `~/.config/scarlet/config.toml`

use crate::cache::CacheOptions;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Cache directory and retry policy
    pub cache: CacheConfig,

    /// Render scale policy
    pub render: RenderConfig,

    /// World provider settings
    pub provider: ProviderConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory shared by every process serving the same worlds
    pub dir: PathBuf,

    /// Entry time-to-live in seconds
    pub ttl_secs: u64,

    /// Unsuccessful retries before a request bypasses the cache
    pub max_failures: u32,

    /// Longest single wait on another computation's lock, in seconds
    pub lock_wait_secs: u64,

    /// Lock re-check interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("scarlet"),
            ttl_secs: 86_400,
            max_failures: 10,
            lock_wait_secs: 30,
            poll_interval_ms: 250,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn options(&self) -> CacheOptions {
        CacheOptions {
            max_failures: self.max_failures,
            lock_wait: Duration::from_secs(self.lock_wait_secs),
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
        }
    }
}

/// Render configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Smallest scale served
    pub min_scale: u32,

    /// Largest scale served (inclusive)
    pub max_scale: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            min_scale: 1,
            max_scale: 4,
        }
    }
}

impl RenderConfig {
    /// Bound a requested scale to the served range
    pub fn clamp_scale(&self, requested: u32) -> u32 {
        let (lo, hi) = self.bounds();
        requested.clamp(lo, hi)
    }

    /// Every scale that can have a cached image
    pub fn scales(&self) -> impl Iterator<Item = u32> {
        let (lo, hi) = self.bounds();
        lo..=hi
    }

    /// Normalized bounds: scale 0 is never served and a reversed range
    /// collapses onto the minimum
    fn bounds(&self) -> (u32, u32) {
        let lo = self.min_scale.max(1);
        (lo, self.max_scale.max(lo))
    }
}

/// World provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Directory holding `<world_id>.json` files
    pub worlds_dir: PathBuf,

    /// Palette TOML file (optional)
    pub colors_path: Option<PathBuf>,

    /// Fetch timeout in seconds
    pub fetch_timeout_secs: u64,

    /// Prefix for every cache key produced for this provider
    pub namespace: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            worlds_dir: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("scarlet")
                .join("worlds"),
            colors_path: None,
            fetch_timeout_secs: 30,
            namespace: "local".to_string(),
        }
    }
}

impl ProviderConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}
