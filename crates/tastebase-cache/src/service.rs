//! State-oblivious cache facade over the primary and fallback stores.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU8, Ordering};

use serde_json::Value;

use crate::config::CacheConfig;
use crate::error::StoreError;
use crate::memory::MemoryStore;
use crate::metrics;
use crate::redis::RedisStore;

/// Connection state of the cache service.
///
/// Transitions:
///
/// ```text
/// Uninitialized ──init, connect ok──▶ Connected
/// Uninitialized ──no URL / connect failed──▶ Degraded
/// Connected ──runtime store error──▶ Degraded   (irreversible)
/// ```
///
/// `Degraded` is terminal: no reconnection is attempted for the life of
/// the process. `Uninitialized` routes like `Degraded` so callers that
/// race `init()` still get served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Uninitialized = 0,
    Connected = 1,
    Degraded = 2,
}

impl ConnectionState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => ConnectionState::Uninitialized,
            1 => ConnectionState::Connected,
            _ => ConnectionState::Degraded,
        }
    }
}

/// Two-tier cache with transparent fallback.
///
/// Callers see one `get`/`set`/`del`/`invalidate` contract; which store
/// backs it is decided fresh on every call from the current
/// [`ConnectionState`]. An operation already dispatched against the
/// primary store when the state flips may still complete there — benign
/// staleness for a best-effort cache, so the primary handle is kept alive
/// after a degrade.
pub struct CacheService {
    config: CacheConfig,
    state: AtomicU8,
    primary: OnceLock<RedisStore>,
    fallback: MemoryStore,
}

impl CacheService {
    /// Create a service in `Uninitialized` state. No connection is made
    /// until [`init`](Self::init).
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            state: AtomicU8::new(ConnectionState::Uninitialized as u8),
            primary: OnceLock::new(),
            fallback: MemoryStore::new(),
        }
    }

    /// Create a service configured from the environment.
    pub fn from_env() -> Self {
        Self::new(CacheConfig::from_env())
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Connect to the primary store if one is configured.
    ///
    /// Idempotent: only the first call moves the service out of
    /// `Uninitialized`. Connection failure is logged and leaves the
    /// service degraded; it is never fatal to the host process.
    pub async fn init(&self) {
        if self.state() != ConnectionState::Uninitialized {
            return;
        }

        let Some(url) = self.config.url.clone() else {
            tracing::info!("no primary store configured, using in-process cache");
            self.state
                .store(ConnectionState::Degraded as u8, Ordering::Release);
            return;
        };

        match RedisStore::connect(&url, &self.config).await {
            Ok(store) => {
                let _ = self.primary.set(store);
                self.state
                    .store(ConnectionState::Connected as u8, Ordering::Release);
                tracing::info!(url = %url, "connected to primary cache store");
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "primary cache store unavailable, using in-process cache"
                );
                self.state
                    .store(ConnectionState::Degraded as u8, Ordering::Release);
            }
        }
    }

    /// Look up `key`.
    ///
    /// A decode failure against a healthy primary store surfaces as an
    /// error; it is never converted into a miss.
    pub async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        if let Some(primary) = self.primary_if_connected() {
            match primary.get(key).await {
                Ok(hit) => {
                    self.record_lookup("redis", hit.is_some());
                    return Ok(hit);
                }
                Err(e) if e.is_connection() => self.degrade(&e),
                Err(e) => return Err(e),
            }
        }

        let hit = self.fallback.get(key);
        self.record_lookup("memory", hit.is_some());
        Ok(hit)
    }

    /// Store `value` under `key`, optionally expiring after `ttl_seconds`.
    pub async fn set(
        &self,
        key: &str,
        value: &Value,
        ttl_seconds: Option<u64>,
    ) -> Result<(), StoreError> {
        if let Some(primary) = self.primary_if_connected() {
            match primary.set(key, value, ttl_seconds).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_connection() => self.degrade(&e),
                Err(e) => return Err(e),
            }
        }

        self.fallback.set(key, value.clone(), ttl_seconds);
        Ok(())
    }

    pub async fn del(&self, key: &str) -> Result<(), StoreError> {
        if let Some(primary) = self.primary_if_connected() {
            match primary.del(key).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_connection() => self.degrade(&e),
                Err(e) => return Err(e),
            }
        }

        self.fallback.del(key);
        Ok(())
    }

    /// Best-effort bulk delete of keys beginning with `prefix`.
    ///
    /// Primary sweep: cursor scan, one delete per matched key; a single
    /// key's failure is logged and the sweep continues. Not atomic —
    /// concurrent writes under the prefix may or may not be observed.
    /// The fallback map is always swept as well, so entries written
    /// before an earlier degrade do not outlive the prefix drop.
    pub async fn invalidate(&self, prefix: &str) {
        if prefix.is_empty() {
            return;
        }

        if let Some(primary) = self.primary_if_connected() {
            match primary.scan_prefix(prefix).await {
                Ok(keys) => {
                    for key in keys {
                        if let Err(e) = primary.del(&key).await {
                            tracing::debug!(
                                key = %key,
                                error = %e,
                                "prefix sweep delete failed"
                            );
                        }
                    }
                }
                Err(e) if e.is_connection() => self.degrade(&e),
                Err(e) => {
                    tracing::warn!(prefix = %prefix, error = %e, "prefix scan failed");
                }
            }
        }

        for key in self.fallback.scan_by_prefix(prefix) {
            self.fallback.del(&key);
        }
    }

    fn primary_if_connected(&self) -> Option<&RedisStore> {
        if self.state() == ConnectionState::Connected {
            self.primary.get()
        } else {
            None
        }
    }

    /// Runtime error notification from the primary store adapter.
    ///
    /// Flips `Connected` to `Degraded` exactly once; the transition is
    /// one-way and no reconnection is attempted. The primary handle stays
    /// alive so operations already dispatched against it can finish.
    fn degrade(&self, error: &StoreError) {
        let flipped = self.state.compare_exchange(
            ConnectionState::Connected as u8,
            ConnectionState::Degraded as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        if flipped.is_ok() {
            tracing::warn!(
                error = %error,
                "primary cache store lost, falling back to in-process cache"
            );
        }
    }

    fn record_lookup(&self, tier: &'static str, hit: bool) {
        if hit {
            metrics::record_cache_hit(tier);
        } else {
            metrics::record_cache_miss();
        }
    }
}
