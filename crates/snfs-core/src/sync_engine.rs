//! Sync engine: one reconciliation pass between the store and the server.
//!
//! A pass works as follows:
//!
//! 1. Snapshot every dirty item as an independent outgoing copy, remembering
//!    the local revision each copy was taken at
//! 2. Strip local-only state (`dirty`) and `updated_at` from the copies
//! 3. Send the batch; the server answers with `response_items` (changes from
//!    elsewhere) and `saved_items` (echoes of what we pushed)
//! 4. Merge `response_items` in full, then `saved_items` metadata-only
//!
//! If the remote call fails nothing is merged and dirty items stay dirty,
//! so the next pass retries them. There is no internal retry loop.

use crate::error::Result;
use crate::item::ItemRecord;
use crate::remote::{RemoteSync, SyncResponse};
use crate::store::{validate_batch, ItemStore, MergeMode, MergeReport};

use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

/// Items about to be pushed, detached from the store.
#[derive(Debug, Clone, Default)]
pub struct OutgoingBatch {
    /// Sanitized copies, safe to send
    pub items: Vec<ItemRecord>,
    /// Revision of each item at snapshot time
    pub revisions: HashMap<Uuid, u64>,
}

impl OutgoingBatch {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Counts from one sync pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    /// Items sent to the server
    pub pushed: usize,
    /// Records received in `response_items`
    pub received: usize,
    /// Records received in `saved_items`
    pub acknowledged: usize,
    /// Combined merge counts
    pub merge: MergeReport,
}

impl ItemStore {
    /// Snapshot all dirty items for transmission.
    pub fn collect_dirty(&self) -> OutgoingBatch {
        let mut batch = OutgoingBatch::default();
        for item in self.items().filter(|item| item.dirty) {
            batch.items.push(item.to_outgoing());
            batch.revisions.insert(item.uuid, item.revision());
        }
        batch.items.sort_by_key(|item| item.created_at);
        batch
    }

    /// Merge a server response for a batch produced by [`collect_dirty`].
    ///
    /// Both halves of the response are validated before either is merged.
    ///
    /// [`collect_dirty`]: ItemStore::collect_dirty
    pub fn apply_sync_response(
        &mut self,
        revisions: &HashMap<Uuid, u64>,
        response: SyncResponse,
    ) -> Result<MergeReport> {
        validate_batch(&response.response_items)?;
        validate_batch(&response.saved_items)?;

        let mut report = self.merge_batch(response.response_items, MergeMode::Full, Some(revisions));
        report.add(self.merge_batch(response.saved_items, MergeMode::MetadataOnly, Some(revisions)));
        Ok(report)
    }

    /// Run a full pass while holding the store exclusively.
    ///
    /// Sessions shared between tasks use
    /// [`Session::synchronize`](crate::Session::synchronize) instead, which
    /// releases the store during the network round trip.
    pub async fn synchronize<R: RemoteSync + ?Sized>(&mut self, remote: &R) -> Result<SyncReport> {
        let batch = self.collect_dirty();
        let pushed = batch.len();
        debug!("sync: pushing {} dirty item(s)", pushed);

        let response = remote.sync(batch.items).await?;
        let report = self.finish_pass(pushed, &batch.revisions, response)?;
        Ok(report)
    }

    pub(crate) fn finish_pass(
        &mut self,
        pushed: usize,
        revisions: &HashMap<Uuid, u64>,
        response: SyncResponse,
    ) -> Result<SyncReport> {
        let received = response.response_items.len();
        let acknowledged = response.saved_items.len();
        let merge = self.apply_sync_response(revisions, response)?;

        info!(
            "sync: pushed {}, received {}, acknowledged {} ({} removed, {} still dirty)",
            pushed, received, acknowledged, merge.removed, merge.deferred
        );

        Ok(SyncReport {
            pushed,
            received,
            acknowledged,
            merge,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::memory_remote::InMemoryRemote;
    use crate::remote::RemoteError;
    use crate::store::tests::note_record;

    #[test]
    fn test_collect_dirty_sanitizes_copies() {
        let mut store = ItemStore::new(".txt");
        let record = note_record("Synced", "x", 1);
        let synced = record.uuid;
        store.merge_incoming(vec![record], MergeMode::Full).unwrap();
        store.touch_note(&synced).unwrap();
        let fresh = store.create_note("Fresh");

        let batch = store.collect_dirty();

        assert_eq!(batch.len(), 2);
        assert!(batch.items.iter().all(|item| item.updated_at.is_none()));
        assert_eq!(batch.revisions.get(&fresh), Some(&1));
        assert_eq!(batch.revisions.get(&synced), Some(&1));
    }

    #[test]
    fn test_batch_is_independent_of_later_edits() {
        let mut store = ItemStore::new(".txt");
        let id = store.create_note("Draft");
        store.write_note(&id, b"v1").unwrap();

        let batch = store.collect_dirty();
        store.write_note(&id, b"v2").unwrap();

        let sent = batch.items[0].content.as_ref().unwrap();
        assert_eq!(sent.text.as_deref(), Some("v1"));
    }

    #[tokio::test]
    async fn test_pass_clears_dirty_and_records_server_time() {
        let remote = InMemoryRemote::new();
        let mut store = ItemStore::new(".txt");
        let id = store.create_note("Shopping");
        store.write_note(&id, b"milk").unwrap();

        let report = store.synchronize(&remote).await.unwrap();

        assert_eq!(report.pushed, 1);
        assert_eq!(report.acknowledged, 1);
        let item = store.get(&id).unwrap();
        assert!(!item.dirty);
        assert!(item.updated_at.is_some());
        assert_eq!(item.content.text.as_deref(), Some("milk"));
        assert_eq!(store.get_note_id("Shopping.txt").unwrap(), id);
    }

    #[tokio::test]
    async fn test_failed_pass_keeps_items_dirty() {
        let remote = InMemoryRemote::new();
        let mut store = ItemStore::new(".txt");
        let first = store.create_note("One");
        let second = store.create_note("Two");
        remote.fail_next(RemoteError::Transport("connection refused".to_string()));

        let err = store.synchronize(&remote).await.unwrap_err();

        assert!(matches!(err, StoreError::Remote(RemoteError::Transport(_))));
        assert!(store.get(&first).unwrap().dirty);
        assert!(store.get(&second).unwrap().dirty);

        // Next pass retries them
        let report = store.synchronize(&remote).await.unwrap();
        assert_eq!(report.pushed, 2);
        assert_eq!(store.dirty_count(), 0);
    }

    #[tokio::test]
    async fn test_local_delete_is_purged_after_ack() {
        let remote = InMemoryRemote::new();
        let mut store = ItemStore::new(".txt");
        let id = store.create_note("Temp");
        store.synchronize(&remote).await.unwrap();

        store.delete_note(&id).unwrap();
        assert!(store.contains(&id));

        store.synchronize(&remote).await.unwrap();
        assert!(!store.contains(&id));
        assert!(remote.stored(&id).unwrap().deleted);
    }

    #[tokio::test]
    async fn test_remote_changes_are_merged() {
        let remote = InMemoryRemote::new();
        let mut store = ItemStore::new(".txt");
        let from_phone = remote.push_external(note_record("Phone", "hi", 1));

        store.synchronize(&remote).await.unwrap();
        assert_eq!(store.get_note_id("Phone.txt").unwrap(), from_phone.uuid);

        remote.delete_external(from_phone.uuid);
        store.synchronize(&remote).await.unwrap();
        assert!(store.get_notes().is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn test_edits_during_flight_stay_dirty() {
        let mut store = ItemStore::new(".txt");
        let id = store.create_note("Racing");
        store.write_note(&id, b"sent").unwrap();

        let batch = store.collect_dirty();
        store.write_note(&id, b"typed during sync").unwrap();

        // Server echoes the sent copy, possibly also in response_items
        let mut echo = batch.items[0].clone();
        echo.updated_at = Some(chrono::Utc::now());
        let response = SyncResponse {
            response_items: vec![echo.clone()],
            saved_items: vec![echo],
        };
        let report = store.apply_sync_response(&batch.revisions, response).unwrap();

        assert_eq!(report.deferred, 2);
        let item = store.get(&id).unwrap();
        assert!(item.dirty);
        assert!(item.updated_at.is_some());
        assert_eq!(item.content.text.as_deref(), Some("typed during sync"));
    }

    #[test]
    fn test_remote_change_does_not_clobber_edit_made_after_snapshot() {
        let mut store = ItemStore::new(".txt");
        let record = note_record("Shared", "server v1", 1);
        let id = record.uuid;
        store.merge_incoming(vec![record.clone()], MergeMode::Full).unwrap();

        // Clean at snapshot time, edited locally while the batch is out
        let batch = store.collect_dirty();
        assert!(batch.is_empty());
        store.write_note(&id, b"local edit").unwrap();

        let mut from_phone = record;
        from_phone.content.as_mut().unwrap().text = Some("server v2".to_string());
        let response = SyncResponse {
            response_items: vec![from_phone],
            saved_items: vec![],
        };
        store.apply_sync_response(&batch.revisions, response).unwrap();

        let item = store.get(&id).unwrap();
        assert!(item.dirty);
        assert_eq!(item.content.text.as_deref(), Some("local edit"));
    }

    #[test]
    fn test_malformed_response_merges_nothing() {
        let mut store = ItemStore::new(".txt");
        let id = store.create_note("Pending");
        let batch = store.collect_dirty();

        let mut bad = note_record("Bad", "", 1);
        bad.content_type = None;
        let response = SyncResponse {
            response_items: vec![note_record("Good", "", 1)],
            saved_items: vec![bad],
        };

        assert!(store.apply_sync_response(&batch.revisions, response).is_err());
        assert_eq!(store.len(), 1);
        assert!(store.get(&id).unwrap().dirty);
    }
}
