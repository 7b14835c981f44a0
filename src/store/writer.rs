//! Batched bulk insertion across families.
//!
//! Writes are queued per family and flushed by round-robin interleaving
//! across families, so that no single family's index structures become a
//! hot spot under sustained load.

use std::collections::VecDeque;

use indexmap::IndexMap;

use crate::ped::LoadStatus;
use crate::store::{FamilyStore, FamilyVariantDocument};

/// Maximum number of pending documents before a flush is forced.
pub const MAX_PENDING: usize = 2_000;

/// Bulk writer owning the family stores it fills.
#[derive(Debug, Default)]
pub struct BulkWriter {
    stores: IndexMap<String, FamilyStore>,
    queues: IndexMap<String, VecDeque<FamilyVariantDocument>>,
    pending: usize,
}

impl BulkWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents queued but not yet inserted.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Queue one document; flushes when the pending batch is full.
    pub fn push(&mut self, doc: FamilyVariantDocument) {
        self.queues
            .entry(doc.family.clone())
            .or_default()
            .push_back(doc);
        self.pending += 1;
        if self.pending >= MAX_PENDING {
            self.flush();
        }
    }

    /// Drain all queues, taking one document per family per round.
    pub fn flush(&mut self) {
        loop {
            let mut progressed = false;
            for (family, queue) in self.queues.iter_mut() {
                if let Some(doc) = queue.pop_front() {
                    self.stores
                        .entry(family.clone())
                        .or_insert_with(|| FamilyStore::new(family))
                        .insert(doc);
                    self.pending -= 1;
                    progressed = true;
                }
            }
            if !progressed {
                break;
            }
        }
    }

    /// Flush remaining documents and return the finished stores, marked
    /// `Loaded`.
    pub fn finish(mut self) -> IndexMap<String, FamilyStore> {
        self.flush();
        for store in self.stores.values_mut() {
            store.status = LoadStatus::Loaded;
        }
        self.stores
    }
}
