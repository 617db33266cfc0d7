//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::path::PathBuf;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Default TTL in milliseconds for entries without explicit TTL (None = never expire)
    pub default_ttl_ms: Option<u64>,
    /// Maximum number of entries the in-memory store can hold
    pub max_entries: usize,
    /// Expiration sweep interval in milliseconds
    pub sweep_interval_ms: u64,
    /// Auto-persist interval in milliseconds (0 disables auto-persist)
    pub auto_persist_interval_ms: u64,
    /// Directory the cache file lives in
    pub cache_dir: PathBuf,
    /// File name of the cache inside `cache_dir`
    pub cache_id: String,
    /// Maximum number of keys the advisory recency tracker remembers
    pub recency_capacity: usize,
    /// Pending-write count that triggers an immediate coalescer flush
    pub batch_threshold: usize,
    /// Coalescer delay in milliseconds before a timed flush
    pub batch_delay_ms: u64,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_DIR` - Cache directory (default: ".cache")
    /// - `CACHE_ID` - Cache file name (default: "cache1")
    /// - `MAX_ENTRIES` - Maximum store entries (default: 1000)
    /// - `DEFAULT_TTL_MS` - Default TTL in milliseconds (default: unset, never expire)
    /// - `SWEEP_INTERVAL_MS` - Expiration sweep frequency (default: 1000)
    /// - `AUTO_PERSIST_MS` - Auto-persist frequency, 0 disables (default: 0)
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.default_ttl_ms = env::var("DEFAULT_TTL_MS").ok().and_then(|v| v.parse().ok());
        if let Some(max_entries) = env::var("MAX_ENTRIES").ok().and_then(|v| v.parse().ok()) {
            config.max_entries = max_entries;
        }
        if let Some(interval) = env::var("SWEEP_INTERVAL_MS").ok().and_then(|v| v.parse().ok()) {
            config.sweep_interval_ms = interval;
        }
        if let Some(interval) = env::var("AUTO_PERSIST_MS").ok().and_then(|v| v.parse().ok()) {
            config.auto_persist_interval_ms = interval;
        }
        if let Ok(dir) = env::var("CACHE_DIR") {
            config.cache_dir = PathBuf::from(dir);
        }
        if let Ok(id) = env::var("CACHE_ID") {
            config.cache_id = id;
        }
        config
    }

    /// Returns the full path of the cache file: `{cache_dir}/{cache_id}`.
    pub fn cache_file_path(&self) -> PathBuf {
        self.cache_dir.join(&self.cache_id)
    }

    /// Sets the cache directory.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    /// Sets the cache id (file name).
    pub fn with_cache_id(mut self, id: impl Into<String>) -> Self {
        self.cache_id = id.into();
        self
    }

    /// Sets the default TTL in milliseconds.
    pub fn with_default_ttl_ms(mut self, ttl_ms: u64) -> Self {
        self.default_ttl_ms = Some(ttl_ms);
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_ms: None,
            max_entries: 1000,
            sweep_interval_ms: 1000,
            auto_persist_interval_ms: 0,
            cache_dir: PathBuf::from(".cache"),
            cache_id: "cache1".to_string(),
            recency_capacity: 1000,
            batch_threshold: 10,
            batch_delay_ms: 100,
        }
    }
}
