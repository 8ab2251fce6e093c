//! Session: one item store shared between the filesystem layer and the sync
//! worker.
//!
//! All mutations and the lookups they depend on go through the write lock;
//! read-only accessors may share the read lock. A sync pass holds the lock
//! only while snapshotting and while merging, never across the network call,
//! so edits keep flowing during a round trip and are picked up by the next
//! pass.

use crate::error::Result;
use crate::remote::RemoteSync;
use crate::store::ItemStore;
use crate::sync_engine::SyncReport;

use tokio::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

pub struct Session<R: RemoteSync> {
    store: RwLock<ItemStore>,
    remote: R,
    /// Serializes sync passes
    sync_lock: Mutex<()>,
}

impl<R: RemoteSync> Session<R> {
    /// Wrap an empty store for notes ending in `extension`.
    pub fn new(remote: R, extension: impl Into<String>) -> Self {
        Self {
            store: RwLock::new(ItemStore::new(extension)),
            remote,
            sync_lock: Mutex::new(()),
        }
    }

    /// Create a session and pull the initial item set.
    pub async fn open(remote: R, extension: impl Into<String>) -> Result<Self> {
        let session = Self::new(remote, extension);
        session.synchronize().await?;
        Ok(session)
    }

    /// Shared read access for accessors.
    pub async fn read(&self) -> RwLockReadGuard<'_, ItemStore> {
        self.store.read().await
    }

    /// Exclusive access for mutations.
    pub async fn write(&self) -> RwLockWriteGuard<'_, ItemStore> {
        self.store.write().await
    }

    /// Run one reconciliation pass.
    ///
    /// On a remote failure nothing is merged and the error is returned for
    /// the caller to retry later.
    pub async fn synchronize(&self) -> Result<SyncReport> {
        let _pass = self.sync_lock.lock().await;

        // Snapshotting only reads, so accessors may run alongside it
        let batch = self.store.read().await.collect_dirty();
        let pushed = batch.len();
        debug!("sync: pushing {} dirty item(s)", pushed);

        // Store is unlocked during the round trip
        let response = self.remote.sync(batch.items).await?;

        let mut store = self.store.write().await;
        store.finish_pass(pushed, &batch.revisions, response)
    }
}
