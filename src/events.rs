//! Events Module
//!
//! Lifecycle notifications emitted by the cache facade, delivered
//! synchronously to registered listeners. A panicking listener is caught
//! and logged so it can never abort the cache operation in progress.

use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::warn;

// == Cache Event ==
/// A lifecycle notification emitted by the cache.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheEvent {
    /// Snapshot successfully written to disk
    Save,
    /// Snapshot loaded (or found absent) from disk
    Load,
    /// A key was explicitly deleted
    Delete(String),
    /// All entries were cleared
    Clear,
    /// The instance was destroyed
    Destroy,
    /// An I/O or codec failure was caught and reported
    Error(String),
    /// A key was observed expired and removed
    Expired(String),
}

/// Handle returned by `subscribe`, used to unsubscribe later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&CacheEvent) + Send + Sync>;

// == Event Bus ==
/// Registry of event listeners owned by the cache facade.
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<(ListenerId, Listener)>,
    next_id: u64,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl EventBus {
    // == Constructor ==
    /// Creates an empty event bus.
    pub fn new() -> Self {
        Self::default()
    }

    // == Subscribe ==
    /// Registers a listener and returns its id.
    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&CacheEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    // == Unsubscribe ==
    /// Removes a listener, returning whether it was registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    // == Emit ==
    /// Delivers an event to every listener, in subscription order.
    ///
    /// Listener panics are caught and logged; delivery continues with the
    /// remaining listeners.
    pub fn emit(&mut self, event: &CacheEvent) {
        for (id, listener) in &mut self.listeners {
            let outcome = catch_unwind(AssertUnwindSafe(|| listener(event)));
            if outcome.is_err() {
                warn!(listener = id.0, event = ?event, "cache event listener panicked");
            }
        }
    }

    /// Returns the number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}
