//! Recency Tracker Module
//!
//! Tracks which keys were most recently touched, for fast-path hints and
//! LRU eviction ordering.
//!
//! Nodes live in a growable arena indexed by integer handle; `prev`/`next`
//! are handle values with `NIL` as the "none" sentinel. This avoids the
//! ownership cycles of a pointer-based doubly linked list. A key→handle
//! map provides O(1) lookup.
//!
//! The tracker is advisory: dropping a key from it never affects the
//! values held by the memory store.

use std::collections::HashMap;

/// Sentinel handle meaning "no node".
const NIL: usize = usize::MAX;

// == Node ==
/// A single arena slot in the recency list.
#[derive(Debug)]
struct Node {
    key: String,
    prev: usize,
    next: usize,
}

// == Recency Tracker ==
/// Fixed-capacity MRU→LRU list of recently touched keys.
///
/// - Head = most recently used
/// - Tail = least recently used
#[derive(Debug)]
pub struct RecencyTracker {
    /// Arena of nodes; freed slots are recycled via `free`
    nodes: Vec<Node>,
    /// Recycled arena slots
    free: Vec<usize>,
    /// Key → arena handle lookup
    index: HashMap<String, usize>,
    /// Handle of the most recently used node, or NIL
    head: usize,
    /// Handle of the least recently used node, or NIL
    tail: usize,
    /// Maximum number of tracked keys
    capacity: usize,
}

impl RecencyTracker {
    // == Constructor ==
    /// Creates a tracker that silently drops the LRU key past `capacity`.
    pub fn new(capacity: usize) -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            head: NIL,
            tail: NIL,
            capacity,
        }
    }

    /// Creates a tracker with no capacity bound.
    ///
    /// Used by the memory store, which performs its own explicit
    /// `pop_lru` eviction instead of relying on silent drops.
    pub fn unbounded() -> Self {
        Self::new(usize::MAX)
    }

    // == Touch ==
    /// Marks a key as most recently used.
    ///
    /// If inserting a new key pushes the tracker over capacity, the least
    /// recently used key is dropped and returned. The drop is silent in
    /// every other respect: no callback, no effect on stored values.
    pub fn touch(&mut self, key: &str) -> Option<String> {
        if self.capacity == 0 {
            return None;
        }

        if let Some(&handle) = self.index.get(key) {
            self.unlink(handle);
            self.push_front(handle);
            return None;
        }

        let evicted = if self.index.len() >= self.capacity {
            self.pop_lru()
        } else {
            None
        };

        let handle = self.alloc(key.to_string());
        self.push_front(handle);
        self.index.insert(key.to_string(), handle);
        evicted
    }

    // == Has ==
    /// Reports tracker membership only; says nothing about stored values.
    pub fn has(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    // == Delete ==
    /// Removes a key from the tracker if present.
    pub fn delete(&mut self, key: &str) -> bool {
        match self.index.remove(key) {
            Some(handle) => {
                self.unlink(handle);
                self.release(handle);
                true
            }
            None => false,
        }
    }

    // == Pop LRU ==
    /// Removes and returns the least recently used key.
    pub fn pop_lru(&mut self) -> Option<String> {
        if self.tail == NIL {
            return None;
        }
        let handle = self.tail;
        self.unlink(handle);
        let key = std::mem::take(&mut self.nodes[handle].key);
        self.index.remove(&key);
        self.free.push(handle);
        Some(key)
    }

    // == Peek LRU ==
    /// Returns the least recently used key without removing it.
    pub fn peek_lru(&self) -> Option<&str> {
        if self.tail == NIL {
            None
        } else {
            Some(self.nodes[self.tail].key.as_str())
        }
    }

    // == Clear ==
    /// Resets the tracker to empty.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.index.clear();
        self.head = NIL;
        self.tail = NIL;
    }

    // == Length ==
    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns true if no keys are tracked.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    // == Internal Linked-List Plumbing ==
    /// Allocates an arena slot for `key`, recycling freed slots first.
    fn alloc(&mut self, key: String) -> usize {
        match self.free.pop() {
            Some(handle) => {
                self.nodes[handle] = Node {
                    key,
                    prev: NIL,
                    next: NIL,
                };
                handle
            }
            None => {
                self.nodes.push(Node {
                    key,
                    prev: NIL,
                    next: NIL,
                });
                self.nodes.len() - 1
            }
        }
    }

    /// Returns a slot to the free list; the index entry must already be gone.
    fn release(&mut self, handle: usize) {
        self.nodes[handle].key = String::new();
        self.free.push(handle);
    }

    /// Detaches a node from the list without freeing its slot.
    fn unlink(&mut self, handle: usize) {
        let (prev, next) = (self.nodes[handle].prev, self.nodes[handle].next);

        if prev != NIL {
            self.nodes[prev].next = next;
        } else if self.head == handle {
            self.head = next;
        }

        if next != NIL {
            self.nodes[next].prev = prev;
        } else if self.tail == handle {
            self.tail = prev;
        }

        self.nodes[handle].prev = NIL;
        self.nodes[handle].next = NIL;
    }

    /// Attaches a detached node at the head (most recently used).
    fn push_front(&mut self, handle: usize) {
        self.nodes[handle].prev = NIL;
        self.nodes[handle].next = self.head;
        if self.head != NIL {
            self.nodes[self.head].prev = handle;
        }
        self.head = handle;
        if self.tail == NIL {
            self.tail = handle;
        }
    }
}
