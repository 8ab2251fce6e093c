//! RemoteSync trait: the boundary to the sync server.
//!
//! Implementations own encryption, authentication and HTTP. The core only
//! hands over plaintext item records and receives two batches back.
//!
//! Implementations:
//! - `InMemoryRemote` - in-process server for tests

use crate::item::ItemRecord;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Remote error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, RemoteError>;

/// Result of one sync call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncResponse {
    /// Items changed elsewhere since our last sync, in full
    #[serde(default)]
    pub response_items: Vec<ItemRecord>,
    /// Acknowledgements of the items we just pushed, with server-assigned
    /// metadata
    #[serde(default)]
    pub saved_items: Vec<ItemRecord>,
}

/// A sync server.
///
/// `sync` must tolerate being retried with the same batch, and must echo
/// every accepted item in `saved_items`.
#[async_trait]
pub trait RemoteSync: Send + Sync {
    /// Push `items` and pull whatever changed server-side.
    async fn sync(&self, items: Vec<ItemRecord>) -> Result<SyncResponse>;
}

#[async_trait]
impl<R: RemoteSync + ?Sized> RemoteSync for Arc<R> {
    async fn sync(&self, items: Vec<ItemRecord>) -> Result<SyncResponse> {
        (**self).sync(items).await
    }
}
