//! Write Coalescer Module
//!
//! Batches mutation signals into a pending-write set and decides when the
//! accumulated bookkeeping justifies a flush: immediately once the set
//! reaches a configured threshold, otherwise when a one-shot delay elapses.
//!
//! Flushing clears the set and disarms the delay; it performs no disk I/O.
//! Durability comes only from the persistence layer's `save` or the
//! auto-persist timer. The set is a write-intent log, never consulted by
//! reads, and `save` always snapshots the full memory store.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::debug;

// == Pending Write ==
/// The most recent mutation observed for a key since the last flush.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingWrite {
    /// Key was set to this value
    Set(Value),
    /// Key was deleted
    Delete,
}

// == Write Coalescer ==
/// Bounds how large the write-intent log grows between flushes.
#[derive(Debug)]
pub struct WriteCoalescer {
    /// Key → most recent mutation since the last flush
    pending: HashMap<String, PendingWrite>,
    /// Pending count that triggers an immediate synchronous flush
    threshold: usize,
    /// Delay before a timed flush once the first mutation arrives
    delay: Duration,
    /// Armed one-shot flush deadline, if any
    deadline: Option<Instant>,
}

impl WriteCoalescer {
    // == Constructor ==
    /// Creates a coalescer with the given batch threshold and delay.
    pub fn new(threshold: usize, delay: Duration) -> Self {
        Self {
            pending: HashMap::new(),
            threshold,
            delay,
            deadline: None,
        }
    }

    // == Record ==
    /// Records that a key was set, then schedules a flush.
    pub fn record_set(&mut self, key: &str, value: Value) {
        self.pending.insert(key.to_string(), PendingWrite::Set(value));
        self.schedule_flush();
    }

    /// Records that a key was deleted, then schedules a flush.
    pub fn record_delete(&mut self, key: &str) {
        self.pending.insert(key.to_string(), PendingWrite::Delete);
        self.schedule_flush();
    }

    // == Schedule Flush ==
    /// Flushes immediately at the threshold, otherwise arms the delay.
    ///
    /// Idempotent while a flush is already scheduled: an armed deadline is
    /// left untouched.
    fn schedule_flush(&mut self) {
        if self.pending.len() >= self.threshold {
            debug!(pending = self.pending.len(), "coalescer threshold reached");
            self.flush();
        } else if self.deadline.is_none() {
            self.deadline = Some(Instant::now() + self.delay);
        }
    }

    // == Tick ==
    /// Flushes if the armed delay has elapsed. Returns whether it flushed.
    pub fn tick(&mut self) -> bool {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                self.flush();
                true
            }
            _ => false,
        }
    }

    // == Flush ==
    /// Cancels any pending delay and clears the pending-write set.
    ///
    /// Bookkeeping only: no disk I/O happens here.
    pub fn flush(&mut self) {
        self.deadline = None;
        self.pending.clear();
    }

    // == Accessors ==
    /// Returns the number of keys with pending mutations.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Returns the recorded mutation for a key, if any.
    pub fn pending(&self, key: &str) -> Option<&PendingWrite> {
        self.pending.get(key)
    }

    /// Returns true if a timed flush is currently armed.
    pub fn is_scheduled(&self) -> bool {
        self.deadline.is_some()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::thread::sleep;

    fn coalescer(threshold: usize, delay_ms: u64) -> WriteCoalescer {
        WriteCoalescer::new(threshold, Duration::from_millis(delay_ms))
    }

    #[test]
    fn test_record_set_tracks_latest_value() {
        let mut c = coalescer(10, 100);

        c.record_set("key1", json!(1));
        c.record_set("key1", json!(2));

        assert_eq!(c.pending_len(), 1);
        assert_eq!(c.pending("key1"), Some(&PendingWrite::Set(json!(2))));
    }

    #[test]
    fn test_record_delete_supersedes_set() {
        let mut c = coalescer(10, 100);

        c.record_set("key1", json!(1));
        c.record_delete("key1");

        assert_eq!(c.pending("key1"), Some(&PendingWrite::Delete));
    }

    #[test]
    fn test_first_record_arms_delay() {
        let mut c = coalescer(10, 100);
        assert!(!c.is_scheduled());

        c.record_set("key1", json!(1));
        assert!(c.is_scheduled());
    }

    #[test]
    fn test_schedule_is_idempotent_while_armed() {
        let mut c = coalescer(10, 50);

        c.record_set("key1", json!(1));
        sleep(Duration::from_millis(30));
        // A second record must not push the armed deadline back
        c.record_set("key2", json!(2));
        sleep(Duration::from_millis(30));

        // 60ms after the first record the original 50ms deadline has passed
        assert!(c.tick());
        assert_eq!(c.pending_len(), 0);
    }

    #[test]
    fn test_threshold_flushes_immediately() {
        let mut c = coalescer(3, 10_000);

        c.record_set("a", json!(1));
        c.record_set("b", json!(2));
        assert_eq!(c.pending_len(), 2);

        // Third distinct key reaches the threshold and flushes synchronously
        c.record_set("c", json!(3));
        assert_eq!(c.pending_len(), 0);
        assert!(!c.is_scheduled());
    }

    #[test]
    fn test_tick_before_deadline_does_nothing() {
        let mut c = coalescer(10, 10_000);

        c.record_set("key1", json!(1));
        assert!(!c.tick());
        assert_eq!(c.pending_len(), 1);
    }

    #[test]
    fn test_tick_after_deadline_flushes() {
        let mut c = coalescer(10, 20);

        c.record_set("key1", json!(1));
        sleep(Duration::from_millis(40));

        assert!(c.tick());
        assert_eq!(c.pending_len(), 0);
        assert!(!c.is_scheduled());
    }

    #[test]
    fn test_tick_without_pending_does_nothing() {
        let mut c = coalescer(10, 20);
        assert!(!c.tick());
    }

    #[test]
    fn test_flush_clears_everything() {
        let mut c = coalescer(10, 100);

        c.record_set("a", json!(1));
        c.record_delete("b");
        c.flush();

        assert_eq!(c.pending_len(), 0);
        assert!(!c.is_scheduled());

        // A new mutation after a flush arms a fresh delay
        c.record_set("c", json!(3));
        assert!(c.is_scheduled());
    }
}
