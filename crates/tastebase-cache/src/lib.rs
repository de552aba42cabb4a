//! Two-tier caching for Tastebase services.
//!
//! ## Architecture
//!
//! - **Primary store (Redis)**: networked, shared across instances,
//!   native TTL support. Values travel as canonical JSON text.
//! - **Fallback store (in-process map)**: local to the instance, holds
//!   values by direct reference, never fails.
//!
//! The [`CacheService`] owns both and routes every operation based on its
//! [`ConnectionState`]:
//!
//! ```text
//! get/set/del ──▶ Connected? ──yes──▶ Redis
//!                     │
//!                     no (degraded / uninitialized)
//!                     ▼
//!                in-process map
//! ```
//!
//! ## Degradation
//!
//! If the primary store is unreachable at init, or a connection-level
//! error shows up at runtime, the service degrades to the fallback store.
//! The transition is one-way: there is no reconnection attempt for the
//! life of the process.

pub mod config;
pub mod error;
pub mod memory;
pub mod redis;
pub mod service;

mod metrics;

pub use config::CacheConfig;
pub use error::StoreError;
pub use memory::MemoryStore;
pub use self::redis::RedisStore;
pub use service::{CacheService, ConnectionState};
