//! snfs-core: item cache and sync engine for a filesystem view of an
//! encrypted notes service.
//!
//! This crate provides:
//! - An in-memory item store with field-level merging of server state
//! - Unique, collision-free file names derived from note and tag titles
//! - Dirty tracking with client-side edit timestamps
//! - A differential sync pass against an opaque `RemoteSync` server
//! - A background worker that syncs periodically or on demand

pub mod config;
pub mod error;
pub mod item;
pub mod memory_remote;
pub mod notes;
pub mod remote;
pub mod session;
pub mod store;
pub mod sync_engine;
pub mod tags;
pub mod timestamps;
pub mod title_index;
pub mod worker;

pub use config::{Config, ConfigError};
pub use error::StoreError;
pub use item::{ContentType, Item, ItemRecord};
pub use memory_remote::InMemoryRemote;
pub use notes::{NoteFolder, NoteView};
pub use remote::{RemoteError, RemoteSync, SyncResponse};
pub use session::Session;
pub use store::{ItemStore, MergeMode, MergeReport};
pub use sync_engine::{OutgoingBatch, SyncReport};
pub use tags::TagView;
pub use worker::{SyncHandle, SyncWorker};
