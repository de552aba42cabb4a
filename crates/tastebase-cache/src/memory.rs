//! In-process fallback store.

use dashmap::DashMap;
use serde_json::Value;

/// In-memory key/value store used while the primary store is unavailable.
///
/// Values are held by direct reference, so entries can carry richer
/// in-memory representations than the JSON text the primary store holds.
/// A TTL is accepted for contract parity but not enforced: there is no
/// background sweeper and reads do not check timestamps, so entries live
/// until deleted. Operations never fail.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    pub fn set(&self, key: &str, value: Value, _ttl_seconds: Option<u64>) {
        self.entries.insert(key.to_string(), value);
    }

    pub fn del(&self, key: &str) {
        self.entries.remove(key);
    }

    /// Keys currently present that start with `prefix`.
    pub fn scan_by_prefix(&self, prefix: &str) -> Vec<String> {
        self.entries
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.key().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
