//! Process-wide record of every accepted descriptor.
//!
//! Entries are written once per relayed call and never read back, updated
//! or evicted. The map grows for the life of the process.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

use crate::observability::metrics;
use crate::relay::types::RequestDescriptor;

/// Concurrent id → descriptor map. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct RequestStore {
    inner: Arc<DashMap<Uuid, RequestDescriptor>>,
    /// Entry count kept beside the map; `DashMap::len` read-locks every shard.
    entries: Arc<AtomicUsize>,
}

impl RequestStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert under `id`. Only the shard holding `id` is locked.
    pub fn record(&self, id: Uuid, descriptor: RequestDescriptor) {
        if self.inner.insert(id, descriptor).is_none() {
            let entries = self.entries.fetch_add(1, Ordering::Relaxed) + 1;
            metrics::record_store_size(entries);
        }
    }

    /// Entries recorded so far. Touches no shard.
    pub fn len(&self) -> usize {
        self.entries.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
