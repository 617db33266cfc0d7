//! Cache Facade Module
//!
//! The public surface of the cache: composes the memory store, recency
//! tracker, write coalescer, snapshot codec and event bus, and owns the
//! persistence state (dirty flag and serialized-snapshot cache).
//!
//! The on-disk snapshot lives at `{cache_dir}/{cache_id}` and is
//! overwritten wholesale on every save. One instance owns the file;
//! concurrent external modification is last-writer-wins.

use std::fs;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, error, info};

use crate::coalescer::WriteCoalescer;
use crate::codec::{JsonCodec, SnapshotCodec, SnapshotEntry};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::events::{CacheEvent, EventBus, ListenerId};
use crate::recency::RecencyTracker;
use crate::store::{Lookup, MemoryStore};

/// Chunk size for the streaming snapshot reader.
const STREAM_CHUNK_SIZE: usize = 64 * 1024;

// == Cache ==
/// Disk-backed key/value cache with TTL expiration and write coalescing.
///
/// Mutations update the memory store, touch the recency tracker, set the
/// dirty flag, invalidate the cached snapshot text and enqueue with the
/// coalescer. `save` snapshots the full store to the cache file; `load`
/// replays a previously saved file with its original expirations.
pub struct Cache {
    /// Construction-time configuration
    config: CacheConfig,
    /// Authoritative key/value store; sole owner of expiration truth
    store: MemoryStore,
    /// Advisory recency hints; losing it never changes observable behavior
    recency: RecencyTracker,
    /// Pending-write bookkeeping debouncer
    coalescer: WriteCoalescer,
    /// Snapshot encode/decode strategy
    codec: Arc<dyn SnapshotCodec>,
    /// Lifecycle notification listeners
    events: EventBus,
    /// True whenever memory may differ from the last successfully saved file
    dirty: bool,
    /// Serialized-snapshot cache; Some = still valid, cleared by any mutation
    snapshot: Option<String>,
    /// Checked by the auto-persist background task
    auto_persist: bool,
    /// Terminal state; mutating calls are rejected once set
    destroyed: bool,
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("config", &self.config)
            .field("entries", &self.store.len())
            .field("dirty", &self.dirty)
            .field("destroyed", &self.destroyed)
            .finish()
    }
}

impl Cache {
    // == Constructors ==
    /// Creates a cache with the default JSON snapshot codec.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_codec(config, Arc::new(JsonCodec))
    }

    /// Creates a cache with a custom snapshot codec.
    pub fn with_codec(config: CacheConfig, codec: Arc<dyn SnapshotCodec>) -> Self {
        let auto_persist = config.auto_persist_interval_ms > 0;
        Self {
            store: MemoryStore::new(config.max_entries, config.default_ttl_ms),
            recency: RecencyTracker::new(config.recency_capacity),
            coalescer: WriteCoalescer::new(
                config.batch_threshold,
                Duration::from_millis(config.batch_delay_ms),
            ),
            codec,
            events: EventBus::new(),
            dirty: false,
            snapshot: None,
            auto_persist,
            destroyed: false,
            config,
        }
    }

    // == Set ==
    /// Stores a key-value pair, applying the configured default TTL.
    pub fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.set_with_ttl(key, value, None)
    }

    /// Stores a key-value pair with an explicit TTL in milliseconds.
    pub fn set_with_ttl(&mut self, key: &str, value: Value, ttl_ms: Option<u64>) -> Result<()> {
        self.ensure_live()?;

        self.store.set(key.to_string(), value.clone(), ttl_ms);
        self.recency.touch(key);
        self.mark_dirty();
        self.coalescer.record_set(key, value);
        Ok(())
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// The memory store is the sole source of truth: an expired entry is
    /// removed, dropped from the recency tracker and reported via the
    /// `Expired` notification, then treated as absent. The removal marks
    /// the cache dirty, like a sweep, so the next save records the drop.
    pub fn get(&mut self, key: &str) -> Option<Value> {
        match self.store.get(key) {
            Lookup::Hit(value) => {
                self.recency.touch(key);
                Some(value)
            }
            Lookup::Expired => {
                self.recency.delete(key);
                self.mark_dirty();
                self.events.emit(&CacheEvent::Expired(key.to_string()));
                None
            }
            Lookup::Miss => {
                self.recency.delete(key);
                None
            }
        }
    }

    /// Returns true if a live entry exists for the key.
    pub fn has(&self, key: &str) -> bool {
        self.store.contains(key)
    }

    /// Returns true if the advisory recency tracker remembers the key.
    pub fn recently_used(&self, key: &str) -> bool {
        self.recency.has(key)
    }

    // == Delete ==
    /// Removes an entry by key, returning whether one was present.
    pub fn delete(&mut self, key: &str) -> Result<bool> {
        self.ensure_live()?;

        let removed = self.store.delete(key);
        self.recency.delete(key);
        if removed {
            self.mark_dirty();
            self.coalescer.record_delete(key);
            self.events.emit(&CacheEvent::Delete(key.to_string()));
        }
        Ok(removed)
    }

    // == Clear ==
    /// Removes all entries and implicitly saves, so the on-disk file
    /// represents zero entries afterward.
    pub fn clear(&mut self) -> Result<()> {
        self.ensure_live()?;

        self.store.clear();
        self.recency.clear();
        self.coalescer.flush();
        self.mark_dirty();
        self.events.emit(&CacheEvent::Clear);
        self.save(false);
        Ok(())
    }

    // == Save ==
    /// Writes the full current store contents to the cache file.
    ///
    /// No-op unless the cache is dirty or `force` is set. The cached
    /// snapshot text is reused when no mutation happened since the last
    /// encode. I/O and codec failures are caught and reported via the
    /// `Error` notification; the dirty flag is left set so a later save
    /// can retry.
    pub fn save(&mut self, force: bool) {
        if self.destroyed {
            self.report_error(&CacheError::Destroyed);
            return;
        }
        if !self.dirty && !force {
            debug!("save skipped: cache is clean");
            return;
        }

        self.coalescer.flush();

        let text = match self.snapshot_text() {
            Ok(text) => text,
            Err(err) => {
                self.report_error(&err);
                return;
            }
        };

        if let Err(err) = self.write_snapshot(&text) {
            self.report_error(&err);
            return;
        }

        self.dirty = false;
        info!(path = %self.cache_file_path().display(), "cache saved");
        self.events.emit(&CacheEvent::Save);
    }

    // == Load ==
    /// Loads the snapshot for the currently configured id and directory.
    ///
    /// A missing file means "nothing to load" and succeeds silently.
    pub fn load(&mut self) -> Result<()> {
        let id = self.config.cache_id.clone();
        let dir = self.config.cache_dir.clone();
        self.load_from(&id, &dir)
    }

    /// Retargets the cache at `{cache_dir}/{cache_id}` and loads it.
    ///
    /// Decode failures are caught and reported via the `Error`
    /// notification, leaving the in-memory contents as they were.
    pub fn load_from(&mut self, cache_id: &str, cache_dir: &Path) -> Result<()> {
        self.ensure_live()?;

        self.config.cache_id = cache_id.to_string();
        self.config.cache_dir = cache_dir.to_path_buf();

        let path = self.cache_file_path();
        if !path.exists() {
            debug!(path = %path.display(), "no cache file to load");
            self.events.emit(&CacheEvent::Load);
            return Ok(());
        }

        match self.read_and_replay(&path) {
            Ok(count) => {
                info!(path = %path.display(), entries = count, "cache loaded");
                self.events.emit(&CacheEvent::Load);
            }
            Err(err) => self.report_error(&err),
        }
        Ok(())
    }

    /// Loads a snapshot from an explicit path.
    ///
    /// Unlike `load`, a missing path is an error here, surfaced both via
    /// the `Error` notification and the returned `Err` so callers can
    /// react. The target's contents are unchanged on failure.
    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        self.ensure_live()?;

        if !path.exists() {
            let err = CacheError::MissingFile(path.to_path_buf());
            self.report_error(&err);
            return Err(err);
        }

        match self.read_and_replay(path) {
            Ok(count) => {
                info!(path = %path.display(), entries = count, "cache file loaded");
                self.events.emit(&CacheEvent::Load);
                Ok(())
            }
            Err(err) => {
                self.report_error(&err);
                Err(err)
            }
        }
    }

    /// Streaming variant of `load_file` for very large snapshots.
    ///
    /// Reads the file in chunks, reporting progress as a fraction of bytes
    /// consumed in `[0, 1]`; decode semantics are identical to `load_file`.
    pub fn load_file_streamed<F>(&mut self, path: &Path, mut progress: F) -> Result<()>
    where
        F: FnMut(f64),
    {
        self.ensure_live()?;

        if !path.exists() {
            let err = CacheError::MissingFile(path.to_path_buf());
            self.report_error(&err);
            return Err(err);
        }

        match self.stream_and_replay(path, &mut progress) {
            Ok(count) => {
                info!(path = %path.display(), entries = count, "cache file loaded (streamed)");
                self.events.emit(&CacheEvent::Load);
                Ok(())
            }
            Err(err) => {
                self.report_error(&err);
                Err(err)
            }
        }
    }

    // == Destroy ==
    /// Tears the instance down: clears all in-memory state, disarms the
    /// auto-persist timer, and removes the cache file (or, when
    /// `include_cache_dir` is set, the whole cache directory) from disk.
    ///
    /// Terminal: subsequent mutating calls are rejected with
    /// `CacheError::Destroyed`.
    pub fn destroy(&mut self, include_cache_dir: bool) {
        if self.destroyed {
            return;
        }

        self.store.clear();
        self.recency.clear();
        self.snapshot = None;
        self.coalescer.flush();
        self.auto_persist = false;

        let removal = if include_cache_dir {
            let dir = self.config.cache_dir.clone();
            if dir.exists() {
                fs::remove_dir_all(&dir)
            } else {
                Ok(())
            }
        } else {
            let path = self.cache_file_path();
            if path.exists() {
                fs::remove_file(&path)
            } else {
                Ok(())
            }
        };
        if let Err(err) = removal {
            self.report_error(&CacheError::Io(err));
        }

        self.dirty = false;
        self.destroyed = true;
        info!(id = %self.config.cache_id, "cache destroyed");
        self.events.emit(&CacheEvent::Destroy);
    }

    /// Deletes just the cache file if present, returning whether deletion
    /// occurred. Never removes the directory.
    pub fn remove_cache_file(&mut self) -> Result<bool> {
        let path = self.cache_file_path();
        if path.exists() {
            fs::remove_file(&path)?;
            debug!(path = %path.display(), "cache file removed");
            Ok(true)
        } else {
            Ok(false)
        }
    }

    // == Expiration Sweep ==
    /// Removes all expired entries, emitting `Expired` per removed key.
    ///
    /// Returns the number of entries removed. Invoked periodically by the
    /// sweep background task.
    pub fn sweep_expired(&mut self) -> usize {
        if self.destroyed {
            return 0;
        }

        let removed = self.store.sweep_expired();
        let count = removed.len();
        if count > 0 {
            for key in &removed {
                self.recency.delete(key);
            }
            self.mark_dirty();
            for key in removed {
                self.events.emit(&CacheEvent::Expired(key));
            }
        }
        count
    }

    // == Timers ==
    /// Checks the coalescer's delay deadline; flushes it if elapsed.
    ///
    /// Invoked periodically by the auto-persist background task.
    pub fn tick(&mut self) -> bool {
        self.coalescer.tick()
    }

    /// Disarms the auto-persist timer; its background task exits on the
    /// next tick.
    pub fn stop_auto_persist(&mut self) {
        self.auto_persist = false;
    }

    /// Returns true while the auto-persist background task should keep
    /// firing.
    pub fn auto_persist_enabled(&self) -> bool {
        self.auto_persist && !self.destroyed
    }

    // == Notifications ==
    /// Subscribes a listener to lifecycle notifications.
    pub fn on<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&CacheEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(listener)
    }

    /// Unsubscribes a listener, returning whether it was registered.
    pub fn off(&mut self, id: ListenerId) -> bool {
        self.events.unsubscribe(id)
    }

    // == Accessors ==
    /// Returns true if memory may differ from the last saved file.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns true once `destroy` has run.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Returns the number of live entries, consistent with `keys()`;
    /// expired-but-unswept entries are not counted.
    pub fn len(&self) -> usize {
        self.store.live_len()
    }

    /// Returns true if the cache holds no live entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns all live keys.
    pub fn keys(&self) -> Vec<String> {
        self.store.keys()
    }

    /// Returns the full path of the cache file.
    pub fn cache_file_path(&self) -> PathBuf {
        self.config.cache_file_path()
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    // == Internal Helpers ==
    fn ensure_live(&self) -> Result<()> {
        if self.destroyed {
            Err(CacheError::Destroyed)
        } else {
            Ok(())
        }
    }

    /// Sets the dirty flag and invalidates the serialized-snapshot cache.
    fn mark_dirty(&mut self) {
        self.dirty = true;
        self.snapshot = None;
    }

    /// Returns the snapshot text, reusing the cached encoding when no
    /// mutation happened since the last encode.
    fn snapshot_text(&mut self) -> Result<String> {
        if let Some(text) = &self.snapshot {
            debug!("reusing cached snapshot text");
            return Ok(text.clone());
        }

        let items: Vec<SnapshotEntry> = self
            .store
            .items()
            .map(|(key, entry)| SnapshotEntry {
                key: key.to_string(),
                value: entry.value.clone(),
                expires: entry.expires_at,
            })
            .collect();
        let text = self.codec.encode(&items)?;
        self.snapshot = Some(text.clone());
        Ok(text)
    }

    /// Creates the cache directory if needed and overwrites the cache file.
    fn write_snapshot(&self, text: &str) -> Result<()> {
        fs::create_dir_all(&self.config.cache_dir)?;
        fs::write(self.cache_file_path(), text)?;
        Ok(())
    }

    /// Reads the whole file and replays it; returns the entry count.
    fn read_and_replay(&mut self, path: &Path) -> Result<usize> {
        let text = fs::read_to_string(path)?;
        self.replay(&text)
    }

    /// Chunked read with progress reporting, then the same replay.
    fn stream_and_replay(&mut self, path: &Path, progress: &mut dyn FnMut(f64)) -> Result<usize> {
        let file = fs::File::open(path)?;
        let total = file.metadata()?.len();
        let mut reader = BufReader::new(file);
        let mut chunk = [0u8; STREAM_CHUNK_SIZE];
        let mut bytes = Vec::new();

        loop {
            let n = reader.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            bytes.extend_from_slice(&chunk[..n]);
            let fraction = if total == 0 {
                1.0
            } else {
                (bytes.len() as f64 / total as f64).min(1.0)
            };
            progress(fraction);
        }
        if bytes.is_empty() {
            progress(1.0);
        }

        let text = String::from_utf8(bytes)
            .map_err(|_| CacheError::InvalidEncoding(path.to_path_buf()))?;
        self.replay(&text)
    }

    /// Decodes snapshot text and replays every entry into the memory store
    /// with its original expiration, so TTLs survive restarts.
    ///
    /// A freshly loaded cache is marked dirty: loading bypasses the
    /// file-write path, so memory is considered to have diverged from the
    /// file's point of view. No automatic re-save happens.
    fn replay(&mut self, text: &str) -> Result<usize> {
        let entries = self.codec.decode(text)?;
        let count = entries.len();

        for entry in entries {
            self.recency.touch(&entry.key);
            self.store
                .set_with_expiry(entry.key, entry.value, entry.expires);
        }

        self.mark_dirty();
        Ok(count)
    }

    /// Reports a caught failure via log and the `Error` notification.
    fn report_error(&mut self, err: &CacheError) {
        error!(error = %err, "cache operation failed");
        self.events.emit(&CacheEvent::Error(err.to_string()));
    }
}
