//! Store Module
//!
//! The authoritative in-memory key/value store: entries with TTL metadata
//! and a capacity-bounded map with its own eviction policy.

mod entry;
mod memory;

// Re-export public types
pub use entry::{current_timestamp_ms, CacheEntry};
pub use memory::{Lookup, MemoryStore};
