//! Flat Cache - A disk-backed key/value cache
//!
//! Memoizes expensive per-key computations across tool invocations:
//! values are kept in memory during a run (with TTL expiration and LRU
//! hints) and flushed to a single snapshot file so a later run can reload
//! prior results instead of recomputing them.

pub mod cache;
pub mod coalescer;
pub mod codec;
pub mod config;
pub mod error;
pub mod events;
pub mod recency;
pub mod store;
pub mod tasks;

#[cfg(test)]
mod property_tests;

pub use cache::Cache;
pub use codec::{JsonCodec, SnapshotCodec, SnapshotEntry};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use events::{CacheEvent, ListenerId};
pub use tasks::{spawn_auto_persist_task, spawn_sweep_task};
