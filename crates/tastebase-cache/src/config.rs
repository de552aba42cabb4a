//! Cache configuration.

use serde::Deserialize;

/// Configuration for the cache service.
///
/// `url` absent means no primary store is configured: the service skips
/// the connection attempt entirely and serves everything from the
/// in-process fallback.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Primary store connection URL (e.g. "redis://localhost:6379").
    #[serde(default)]
    pub url: Option<String>,

    /// Connection pool size.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Timeout for acquiring and creating connections, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Keys requested per SCAN round trip during prefix invalidation.
    #[serde(default = "default_scan_batch")]
    pub scan_batch: usize,
}

fn default_pool_size() -> usize {
    10
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_scan_batch() -> usize {
    100
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: None,
            pool_size: default_pool_size(),
            timeout_ms: default_timeout_ms(),
            scan_batch: default_scan_batch(),
        }
    }
}

impl CacheConfig {
    /// Load configuration from the environment.
    ///
    /// `REDIS_URL` selects the primary store; `REDIS_POOL_SIZE`,
    /// `REDIS_TIMEOUT_MS` and `REDIS_SCAN_BATCH` tune it. An invalid
    /// environment is logged and falls back to defaults rather than
    /// failing the host process.
    pub fn from_env() -> Self {
        let built = config::Config::builder()
            .add_source(config::Environment::with_prefix("REDIS").try_parsing(true))
            .build()
            .and_then(|cfg| cfg.try_deserialize::<Self>());

        match built {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(error = %e, "invalid cache configuration, using defaults");
                Self::default()
            }
        }
    }
}
