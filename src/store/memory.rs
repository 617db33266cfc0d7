//! Memory Store Module
//!
//! The authoritative in-memory key/value map with TTL expiration and
//! capacity-bounded LRU eviction. Expiration is owned entirely by this
//! store: an entry with a past expiration is never observable through
//! `get`, `items` or `keys`, and absence from this store is the sole
//! truth for "does not exist".

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use crate::recency::RecencyTracker;
use crate::store::CacheEntry;

// == Lookup Result ==
/// Outcome of a `get`, distinguishing an expired entry from a plain miss
/// so the facade can emit the right notification.
#[derive(Debug, PartialEq)]
pub enum Lookup {
    /// Live entry; value cloned out of the store
    Hit(Value),
    /// Entry existed but its TTL elapsed; it has been removed
    Expired,
    /// No entry for the key
    Miss,
}

// == Memory Store ==
/// Capacity-bounded key/value storage with TTL expiration.
#[derive(Debug)]
pub struct MemoryStore {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// Internal access order for capacity eviction
    order: RecencyTracker,
    /// Maximum number of entries allowed
    max_entries: usize,
    /// Default TTL in milliseconds for entries without explicit TTL
    default_ttl_ms: Option<u64>,
}

impl MemoryStore {
    // == Constructor ==
    /// Creates a new MemoryStore with the given capacity and default TTL.
    pub fn new(max_entries: usize, default_ttl_ms: Option<u64>) -> Self {
        Self {
            entries: HashMap::new(),
            order: RecencyTracker::unbounded(),
            max_entries,
            default_ttl_ms,
        }
    }

    // == Set ==
    /// Stores a key-value pair with an optional TTL in milliseconds.
    ///
    /// If the key already exists the value is overwritten and the TTL is
    /// reset. If the store is at capacity, the least recently used entry
    /// is evicted first.
    pub fn set(&mut self, key: String, value: Value, ttl_ms: Option<u64>) {
        let effective_ttl = ttl_ms.or(self.default_ttl_ms);
        self.insert(key, CacheEntry::new(value, effective_ttl));
    }

    /// Stores a key-value pair with an absolute expiration timestamp.
    ///
    /// Used when replaying a loaded snapshot so the original expirations
    /// survive a restart. `None` means the entry never expires, regardless
    /// of the store's default TTL.
    pub fn set_with_expiry(&mut self, key: String, value: Value, expires_at: Option<u64>) {
        self.insert(key, CacheEntry::with_expiry(value, expires_at));
    }

    fn insert(&mut self, key: String, entry: CacheEntry) {
        let is_overwrite = self.entries.contains_key(&key);

        // If not overwriting and at capacity, evict the oldest entry
        if !is_overwrite && self.entries.len() >= self.max_entries {
            if let Some(evicted) = self.order.pop_lru() {
                self.entries.remove(&evicted);
                debug!(key = %evicted, "evicted entry at capacity");
            }
        }

        self.entries.insert(key.clone(), entry);
        self.order.touch(&key);
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Expired entries are removed on access and reported as `Expired`.
    pub fn get(&mut self, key: &str) -> Lookup {
        match self.entries.get(key) {
            Some(entry) if entry.is_expired() => {
                self.entries.remove(key);
                self.order.delete(key);
                Lookup::Expired
            }
            Some(entry) => {
                let value = entry.value.clone();
                self.order.touch(key);
                Lookup::Hit(value)
            }
            None => Lookup::Miss,
        }
    }

    // == Contains ==
    /// Returns true if a live (unexpired) entry exists for the key.
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .map(|entry| !entry.is_expired())
            .unwrap_or(false)
    }

    // == Delete ==
    /// Removes an entry by key, returning whether one was present.
    pub fn delete(&mut self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.order.delete(key);
        }
        removed
    }

    // == Clear ==
    /// Removes all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    // == Items ==
    /// Iterates over all live (unexpired) entries.
    pub fn items(&self) -> impl Iterator<Item = (&str, &CacheEntry)> {
        self.entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired())
            .map(|(key, entry)| (key.as_str(), entry))
    }

    // == Keys ==
    /// Returns all live (unexpired) keys.
    pub fn keys(&self) -> Vec<String> {
        self.items().map(|(key, _)| key.to_string()).collect()
    }

    // == Sweep Expired ==
    /// Removes all expired entries, returning the removed keys.
    pub fn sweep_expired(&mut self) -> Vec<String> {
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            self.entries.remove(key);
            self.order.delete(key);
        }

        expired_keys
    }

    // == Length ==
    /// Returns the current number of entries, live or not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns the number of live (unexpired) entries, matching what
    /// `items` and `keys` expose.
    pub fn live_len(&self) -> usize {
        self.items().count()
    }

    /// Returns true if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
