//! Dirty Index
//!
//! Provides O(1) access to the modified records of a dataset, keyed by record
//! hash. Records register and unregister themselves as their pending changes
//! appear and disappear.

use crate::record::{Record, WeakRecord};
use crate::types::RecordHash;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Dirty index: RecordHash -> Record
///
/// Entries are weak so the index never keeps a dropped record alive. Cloning
/// yields another handle to the same index.
#[derive(Clone, Default)]
pub struct DirtyIndex {
    entries: Arc<RwLock<HashMap<RecordHash, WeakRecord>>>,
}

impl DirtyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&self, record: &Record) {
        self.entries
            .write()
            .insert(record.get_hash(), record.downgrade());
    }

    pub(crate) fn unregister(&self, hash: &str) {
        self.entries.write().remove(hash);
    }

    /// Get a dirty record by hash
    pub fn get(&self, hash: &str) -> Option<Record> {
        self.entries.read().get(hash).and_then(WeakRecord::upgrade)
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.get(hash).is_some()
    }

    /// Get all live dirty records
    pub fn records(&self) -> Vec<Record> {
        self.entries
            .read()
            .values()
            .filter_map(WeakRecord::upgrade)
            .collect()
    }

    /// Number of live dirty records
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .values()
            .filter(|record| record.is_alive())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for DirtyIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let hashes: Vec<RecordHash> = self.entries.read().keys().cloned().collect();
        f.debug_struct("DirtyIndex").field("hashes", &hashes).finish()
    }
}
