// ── Data index ──
//
// Canonical link -> descriptor. Every write is announced on a broadcast
// channel so the router can re-evaluate the current link without polling.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tracing::debug;

use super::collection::Collection;
use crate::model::Data;

const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Notification that the descriptor stored under `key` changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataChange {
    pub key: String,
}

/// Keyed descriptors, one per canonical link.
pub struct DataIndex {
    data: Collection<String, Data>,
    changes: broadcast::Sender<DataChange>,
}

impl DataIndex {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            data: Collection::new(),
            changes,
        }
    }

    /// The stored descriptor for a canonical key.
    pub fn get(&self, key: &str) -> Option<Arc<Data>> {
        self.data.get(&key.to_owned())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains(&key.to_owned())
    }

    /// Subscribe to descriptor writes.
    pub fn subscribe(&self) -> broadcast::Receiver<DataChange> {
        self.changes.subscribe()
    }

    /// Subscribe to the write counter.
    pub fn subscribe_version(&self) -> watch::Receiver<u64> {
        self.data.subscribe_version()
    }

    pub fn version(&self) -> u64 {
        self.data.version()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys = self.data.keys();
        keys.sort();
        keys
    }

    /// All descriptors, sorted by link.
    pub fn snapshot(&self) -> Vec<Arc<Data>> {
        let mut all = self.data.snapshot();
        all.sort_by(|a, b| a.link.cmp(&b.link));
        all
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    // ── Write API (fetcher only) ─────────────────────────────────────

    /// Store a descriptor under its own `link` and announce it.
    pub(crate) fn insert(&self, data: Data) -> Arc<Data> {
        let key = data.link.clone();
        debug!(
            link = %key,
            ready = data.is_ready,
            fetching = data.is_fetching,
            "data index write"
        );
        let stored = Arc::new(data);
        self.data.insert_arc(key.clone(), Arc::clone(&stored));
        // No receivers is fine.
        let _ = self.changes.send(DataChange { key });
        stored
    }

    /// Rewrite the descriptor under `key`, if present.
    pub(crate) fn update(&self, key: &str, f: impl FnOnce(&Data) -> Data) -> Option<Arc<Data>> {
        let current = self.get(key)?;
        Some(self.insert(f(&current)))
    }
}

impl Default for DataIndex {
    fn default() -> Self {
        Self::new()
    }
}
