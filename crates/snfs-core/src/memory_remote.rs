//! In-process sync server for tests.
//!
//! Behaves like the real server from the client's point of view:
//! - every accepted item gets a fresh `updated_at` and is echoed back in
//!   `saved_items`
//! - changes made "by another device" through [`InMemoryRemote::push_external`]
//!   are delivered once in the next `response_items`
//! - tombstones are stored so other devices learn about deletions

use crate::item::{ItemRecord, Timestamp};
use crate::remote::{RemoteError, RemoteSync, Result, SyncResponse};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct ServerState {
    items: HashMap<Uuid, ItemRecord>,
    /// Changes not yet delivered to our client
    pending: Vec<Uuid>,
    /// Error to return from the next call
    fail_next: Option<RemoteError>,
    /// Batches received, in call order
    received: Vec<Vec<ItemRecord>>,
    last_stamp: Option<Timestamp>,
}

impl ServerState {
    /// Strictly increasing server clock.
    fn stamp(&mut self) -> Timestamp {
        let now = Utc::now();
        let stamp = match self.last_stamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_stamp = Some(stamp);
        stamp
    }

    fn accept(&mut self, mut record: ItemRecord) -> ItemRecord {
        let stamp = self.stamp();
        if record.deleted {
            let mut tombstone = ItemRecord::tombstone(record.uuid);
            tombstone.content_type = record
                .content_type
                .or_else(|| self.items.get(&record.uuid).and_then(|r| r.content_type.clone()));
            tombstone.created_at = record
                .created_at
                .or_else(|| self.items.get(&record.uuid).and_then(|r| r.created_at));
            tombstone.updated_at = Some(stamp);
            record = tombstone;
        } else {
            record.created_at.get_or_insert(stamp);
            record.updated_at = Some(stamp);
        }
        self.items.insert(record.uuid, record.clone());
        record
    }
}

/// In-memory sync server.
#[derive(Default)]
pub struct InMemoryRemote {
    state: Mutex<ServerState>,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Simulate another device saving `record`. Returns the stored copy.
    pub fn push_external(&self, record: ItemRecord) -> ItemRecord {
        let mut state = self.state();
        let stored = state.accept(record);
        state.pending.retain(|id| *id != stored.uuid);
        state.pending.push(stored.uuid);
        stored
    }

    /// Simulate another device deleting `id`.
    pub fn delete_external(&self, id: Uuid) {
        self.push_external(ItemRecord::tombstone(id));
    }

    /// Make the next `sync` call fail with `error`.
    pub fn fail_next(&self, error: RemoteError) {
        self.state().fail_next = Some(error);
    }

    /// Server copy of an item.
    pub fn stored(&self, id: &Uuid) -> Option<ItemRecord> {
        self.state().items.get(id).cloned()
    }

    /// Every batch pushed so far.
    pub fn received(&self) -> Vec<Vec<ItemRecord>> {
        self.state().received.clone()
    }

    /// Number of `sync` calls that reached the server.
    pub fn calls(&self) -> usize {
        self.state().received.len()
    }
}

#[async_trait]
impl RemoteSync for InMemoryRemote {
    async fn sync(&self, items: Vec<ItemRecord>) -> Result<SyncResponse> {
        let mut state = self.state();
        if let Some(error) = state.fail_next.take() {
            return Err(error);
        }
        state.received.push(items.clone());

        let pushed: Vec<Uuid> = items.iter().map(|item| item.uuid).collect();
        let saved_items = items.into_iter().map(|item| state.accept(item)).collect();

        // Our own pushes supersede queued external copies
        let pending = std::mem::take(&mut state.pending);
        let response_items = pending
            .into_iter()
            .filter(|id| !pushed.contains(id))
            .filter_map(|id| state.items.get(&id).cloned())
            .collect();

        Ok(SyncResponse {
            response_items,
            saved_items,
        })
    }
}
