//! In-memory label storage keyed by content digest.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::trace;

use crate::digest::Digest;

/// The full set of labels attached to one digest. Ordering is irrelevant;
/// label names are unique within a set.
pub type LabelSet = HashMap<String, String>;

// ==============================================================================
// LabelStore Trait
// ==============================================================================

/// Storage seam for per-digest label metadata.
///
/// All operations are infallible: a digest with no stored labels reads back
/// as an empty set, never an error. Implementations that need persistence or
/// validation wrap this trait rather than change its contract.
#[async_trait]
pub trait LabelStore: Send + Sync {
    /// Current label set for `digest`, or an empty set if none exists.
    async fn get(&self, digest: &Digest) -> LabelSet;

    /// Atomically replace the entire label set for `digest`. An empty set
    /// clears the digest's labels.
    async fn set(&self, digest: &Digest, labels: LabelSet);

    /// Atomically merge `update` into the existing set for `digest` and
    /// return the resulting full set. A label whose update value is the
    /// empty string is removed; all others are overwritten or inserted.
    async fn update(&self, digest: &Digest, update: LabelSet) -> LabelSet;
}

// ==============================================================================
// MemoryLabelStore
// ==============================================================================

/// A [`LabelStore`] backed by a single lock-guarded map.
///
/// Suitable wherever label storage does not need to persist, such as the GC
/// bookkeeping of an in-memory content store or tests. Safe to share across
/// arbitrarily many concurrent tasks via `Arc`; every operation serializes
/// on one store-wide exclusive lock, held only for the map access itself.
pub struct MemoryLabelStore {
    labels: Mutex<HashMap<Digest, LabelSet>>,
}

impl MemoryLabelStore {
    pub fn new() -> Self {
        Self {
            labels: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryLabelStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LabelStore for MemoryLabelStore {
    async fn get(&self, digest: &Digest) -> LabelSet {
        // Clone out of the guard: callers get an independent snapshot,
        // never a reference into the shared map.
        self.labels
            .lock()
            .await
            .get(digest)
            .cloned()
            .unwrap_or_default()
    }

    async fn set(&self, digest: &Digest, labels: LabelSet) {
        let count = labels.len();
        self.labels.lock().await.insert(digest.clone(), labels);
        trace!(digest = %digest, count, "set labels");
    }

    async fn update(&self, digest: &Digest, update: LabelSet) -> LabelSet {
        let mut guard = self.labels.lock().await;
        let labels = guard.entry(digest.clone()).or_default();
        for (name, value) in update {
            if value.is_empty() {
                labels.remove(&name);
            } else {
                labels.insert(name, value);
            }
        }
        trace!(digest = %digest, count = labels.len(), "updated labels");
        labels.clone()
    }
}
