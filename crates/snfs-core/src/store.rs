//! ItemStore: the authoritative in-memory table of items.
//!
//! The store owns every known item keyed by id together with the note title
//! index derived from it. Incoming server state is integrated with
//! [`ItemStore::merge_incoming`]; local edits go through the note and tag
//! operations in [`crate::notes`] and [`crate::tags`].

use crate::error::{Result, StoreError};
use crate::item::{ContentType, Item, ItemRecord};
use crate::title_index::{Naming, TitleIndex, UNTITLED};

use std::collections::HashMap;
use tracing::{debug, warn};
use uuid::Uuid;

/// How much of an incoming record to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Apply every field present in the record.
    Full,
    /// Apply administrative fields only; keep the stored payload.
    ///
    /// Used to re-absorb the server's echo of what we just pushed.
    MetadataOnly,
}

/// Counts from one merge invocation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeReport {
    /// Records integrated into the store
    pub merged: usize,
    /// Items removed by tombstones
    pub removed: usize,
    /// Items edited while in flight, kept dirty with their local payload
    pub deferred: usize,
}

impl MergeReport {
    pub(crate) fn add(&mut self, other: MergeReport) {
        self.merged += other.merged;
        self.removed += other.removed;
        self.deferred += other.deferred;
    }
}

/// In-memory item table plus the note title index.
#[derive(Debug)]
pub struct ItemStore {
    items: HashMap<Uuid, Item>,
    notes: TitleIndex,
    extension: String,
}

impl ItemStore {
    /// Create an empty store whose note names end in `extension`.
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            items: HashMap::new(),
            notes: TitleIndex::new(),
            extension: extension.into(),
        }
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn get(&self, id: &Uuid) -> Option<&Item> {
        self.items.get(id)
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.items.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    /// Number of items with unsynced local changes.
    pub fn dirty_count(&self) -> usize {
        self.items.values().filter(|item| item.dirty).count()
    }

    /// The derived note name index.
    pub fn note_index(&self) -> &TitleIndex {
        &self.notes
    }

    /// Integrate a batch of server records.
    ///
    /// The batch is validated up front: if any non-tombstone record lacks
    /// its kind or creation time the whole batch is rejected and the store
    /// is left untouched.
    pub fn merge_incoming(&mut self, records: Vec<ItemRecord>, mode: MergeMode) -> Result<MergeReport> {
        validate_batch(&records)?;
        Ok(self.merge_batch(records, mode, None))
    }

    /// Merge an already validated batch.
    ///
    /// `in_flight` is given when merging the result of a sync pass and maps
    /// the ids that were pushed to the revision they had when snapshotted.
    /// Dirty items that were not pushed, or whose revision moved since, were
    /// edited during the round trip: they keep their local payload and stay
    /// dirty.
    pub(crate) fn merge_batch(
        &mut self,
        mut records: Vec<ItemRecord>,
        mode: MergeMode,
        in_flight: Option<&HashMap<Uuid, u64>>,
    ) -> MergeReport {
        // Deterministic title assignment regardless of server ordering
        records.sort_by_key(|record| record.created_at);

        let mut report = MergeReport::default();
        for record in records {
            let id = record.uuid;

            if record.deleted {
                if self.items.remove(&id).is_some() {
                    report.removed += 1;
                    debug!("merge: removed {}", id);
                }
                self.notes.remove(&id);
                continue;
            }

            let edited_in_flight = match (self.items.get(&id), in_flight) {
                (Some(item), Some(sent)) => item.dirty && sent.get(&id) != Some(&item.revision),
                _ => false,
            };

            if !self.items.contains_key(&id) {
                // validate_batch guarantees the required fields
                let Some(created) = Item::from_record(&record) else {
                    continue;
                };
                self.items.insert(id, created);
            }
            let Some(item) = self.items.get_mut(&id) else {
                continue;
            };

            if edited_in_flight {
                warn!("merge: {} was edited during sync, keeping local changes", id);
                let deleted = item.deleted;
                item.apply(record, true);
                item.deleted = deleted;
                report.deferred += 1;
            } else {
                item.apply(record, mode == MergeMode::MetadataOnly);
                item.dirty = false;
            }
            report.merged += 1;

            self.reindex(&id);
        }

        report
    }

    /// Re-derive the note name of `id`, evicting it if it no longer
    /// qualifies for one.
    pub(crate) fn reindex(&mut self, id: &Uuid) -> Option<String> {
        match self.items.get(id) {
            Some(item) if item.is_note() && !item.deleted => {
                let title = item.title().unwrap_or(UNTITLED).to_string();
                let name = self.notes.assign(*id, &title, Naming::Note { extension: &self.extension });
                debug!("index: {} -> {}", id, name);
                Some(name)
            }
            _ => {
                self.notes.remove(id);
                None
            }
        }
    }

    /// Add a locally created item and index it.
    pub(crate) fn insert_local(&mut self, item: Item) -> Uuid {
        let id = item.uuid;
        self.items.insert(id, item);
        self.reindex(&id);
        id
    }

    /// A non-deleted item of the expected kind.
    pub(crate) fn live(&self, id: &Uuid, expected: ContentType) -> Result<&Item> {
        let item = self
            .items
            .get(id)
            .filter(|item| !item.deleted)
            .ok_or(StoreError::ItemNotFound(*id))?;
        if item.content_type != expected {
            return Err(StoreError::WrongKind { id: *id, expected });
        }
        Ok(item)
    }

    pub(crate) fn live_mut(&mut self, id: &Uuid, expected: ContentType) -> Result<&mut Item> {
        self.live(id, expected)?;
        self.items.get_mut(id).ok_or(StoreError::ItemNotFound(*id))
    }

    /// The item to tombstone, or `None` when it is unknown or already
    /// deleted. A live item of another kind is still `WrongKind`.
    pub(crate) fn deletable_mut(&mut self, id: &Uuid, expected: ContentType) -> Result<Option<&mut Item>> {
        match self.items.get(id) {
            None => return Ok(None),
            Some(item) if item.deleted => return Ok(None),
            Some(_) => {}
        }
        self.live_mut(id, expected).map(Some)
    }
}

/// Reject batches containing live records without their required fields.
pub(crate) fn validate_batch(records: &[ItemRecord]) -> Result<()> {
    for record in records.iter().filter(|record| !record.deleted) {
        if record.content_type.is_none() {
            return Err(StoreError::MalformedBatch { id: record.uuid, field: "content_type" });
        }
        if record.created_at.is_none() {
            return Err(StoreError::MalformedBatch { id: record.uuid, field: "created_at" });
        }
    }
    Ok(())
}
