//! Errors surfaced by the item store and sync pass.

use crate::item::ContentType;
use crate::remote::RemoteError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Note not found: {0}")]
    NoteNotFound(String),

    #[error("Tag not found: {0}")]
    TagNotFound(String),

    #[error("Item not found: {0}")]
    ItemNotFound(Uuid),

    #[error("Item {id} is not a {expected}")]
    WrongKind { id: Uuid, expected: ContentType },

    #[error("Note text is not valid UTF-8")]
    InvalidText(#[from] std::string::FromUtf8Error),

    #[error("Malformed item {id} in merge batch: missing {field}")]
    MalformedBatch { id: Uuid, field: &'static str },

    #[error("Remote sync failed: {0}")]
    Remote(#[from] RemoteError),
}

pub type Result<T> = std::result::Result<T, StoreError>;
