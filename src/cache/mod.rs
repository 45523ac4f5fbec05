//! Cache validity tracking for offline-first sync.
//!
//! This module decides whether the local data is fresh enough to skip a sync:
//! - Persists the last successful sync time in a durable key-value store
//! - Mirrors it in memory so validity checks never wait on I/O
//! - Computes TTL-based validity and time until expiry

mod storage;
mod validity;

pub use storage::{KeyValueStore, SqliteKeyValue};
pub use validity::CacheValidity;
