//! Item model: the atomic synchronized record and its payload.
//!
//! Two shapes exist for the same record:
//! - [`ItemRecord`] is the wire form exchanged with the remote. Every field
//!   except the id is optional so that tombstones and partial echoes can be
//!   represented, and it has no notion of local dirtiness.
//! - [`Item`] is the stored form owned by the [`ItemStore`](crate::ItemStore).
//!   Its required fields are always present and it carries the local-only
//!   `dirty` marker and edit revision.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::{self, Display, Formatter};
use uuid::Uuid;

/// Server and client timestamps are UTC instants, serialized as RFC 3339 with a `Z` suffix.
pub type Timestamp = DateTime<Utc>;

/// Application metadata namespace used by the reference client.
pub const CLIENT_NAMESPACE: &str = "org.standardnotes.sn";

/// Item kind discriminator.
///
/// Unknown kinds are kept verbatim so they pass through the store untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ContentType {
    Note,
    Tag,
    Other(String),
}

impl From<String> for ContentType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Note" => ContentType::Note,
            "Tag" => ContentType::Tag,
            _ => ContentType::Other(value),
        }
    }
}

impl From<ContentType> for String {
    fn from(value: ContentType) -> Self {
        match value {
            ContentType::Note => "Note".to_string(),
            ContentType::Tag => "Tag".to_string(),
            ContentType::Other(other) => other,
        }
    }
}

impl Display for ContentType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ContentType::Note => f.write_str("Note"),
            ContentType::Tag => f.write_str("Tag"),
            ContentType::Other(other) => f.write_str(other),
        }
    }
}

/// A pointer from one item's content to another item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub uuid: Uuid,
    pub content_type: ContentType,
}

/// Per-client metadata stored under [`CLIENT_NAMESPACE`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientMetadata {
    /// Last local edit time. Authoritative over `updated_at` once present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_updated_at: Option<Timestamp>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl ClientMetadata {
    /// Whether the note is archived. Stored under `archived`.
    pub fn archived(&self) -> bool {
        self.other
            .get("archived")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn set_archived(&mut self, archived: bool) {
        self.other.insert("archived".to_string(), Value::Bool(archived));
    }
}

/// The `appData` block inside an item's content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppData {
    #[serde(
        rename = "org.standardnotes.sn",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub client: Option<ClientMetadata>,

    /// Namespaces owned by other applications.
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl AppData {
    /// Return the client namespace, creating it if absent.
    pub fn ensure_client(&mut self) -> &mut ClientMetadata {
        self.client.get_or_insert_with(ClientMetadata::default)
    }
}

/// Decrypted, kind-specific payload.
///
/// Notes use `title`, `text` and `references`; tags use `title` and
/// `references`. Anything else is kept in `other`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default)]
    pub references: Vec<Reference>,

    #[serde(rename = "appData", default, skip_serializing_if = "Option::is_none")]
    pub app_data: Option<AppData>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl Content {
    /// Content for a freshly created note.
    pub fn note(title: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            text: Some(String::new()),
            ..Self::default()
        }
    }

    /// Content for a freshly created tag.
    pub fn tag(title: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            ..Self::default()
        }
    }

    /// Return the `appData` block, creating it if absent.
    pub fn ensure_app_data(&mut self) -> &mut AppData {
        self.app_data.get_or_insert_with(AppData::default)
    }

    /// The nested client edit time, if one was ever recorded.
    pub fn client_updated_at(&self) -> Option<Timestamp> {
        self.app_data
            .as_ref()
            .and_then(|app| app.client.as_ref())
            .and_then(|client| client.client_updated_at)
    }

    /// Archive flag from the client namespace.
    pub fn archived(&self) -> bool {
        self.app_data
            .as_ref()
            .and_then(|app| app.client.as_ref())
            .is_some_and(ClientMetadata::archived)
    }

    pub fn set_archived(&mut self, archived: bool) {
        self.ensure_app_data().ensure_client().set_archived(archived);
    }

    /// Whether the item sits in the trash. Stored as top-level `trashed`.
    pub fn trashed(&self) -> bool {
        self.other
            .get("trashed")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn set_trashed(&mut self, trashed: bool) {
        self.other.insert("trashed".to_string(), Value::Bool(trashed));
    }
}

/// Wire form of an item, as sent to and received from the remote.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub uuid: Uuid,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<ContentType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enc_item_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_hash: Option<String>,

    #[serde(default)]
    pub deleted: bool,

    /// Fields the core does not interpret.
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl ItemRecord {
    /// A bare tombstone for `uuid`.
    pub fn tombstone(uuid: Uuid) -> Self {
        Self {
            uuid,
            deleted: true,
            ..Self::default()
        }
    }
}

/// Stored form of an item.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub uuid: Uuid,
    pub content_type: ContentType,
    pub content: Content,
    pub created_at: Timestamp,
    pub updated_at: Option<Timestamp>,
    pub enc_item_key: Option<String>,
    pub auth_hash: Option<String>,
    pub deleted: bool,
    pub other: Map<String, Value>,

    /// Local only: has unsynced mutations.
    pub dirty: bool,

    /// Local only: bumped on every local mutation.
    pub(crate) revision: u64,
}

impl Item {
    /// A brand new local item with a time-ordered id.
    ///
    /// The item is not dirty yet; callers stamp it with
    /// [`mark_dirty`](crate::timestamps::mark_dirty).
    pub fn new_local(content_type: ContentType, content: Content, now: Timestamp) -> Self {
        Self {
            uuid: Uuid::now_v7(),
            content_type,
            content,
            created_at: now,
            updated_at: None,
            enc_item_key: Some(String::new()),
            auth_hash: None,
            deleted: false,
            other: Map::new(),
            dirty: false,
            revision: 0,
        }
    }

    /// Materialize a stored item from a validated, non-deleted record.
    ///
    /// Returns `None` if a required field is missing.
    pub(crate) fn from_record(record: &ItemRecord) -> Option<Self> {
        Some(Self {
            uuid: record.uuid,
            content_type: record.content_type.clone()?,
            content: Content::default(),
            created_at: record.created_at?,
            updated_at: None,
            enc_item_key: None,
            auth_hash: None,
            deleted: false,
            other: Map::new(),
            dirty: false,
            revision: 0,
        })
    }

    /// Field-merge `record` into this item.
    ///
    /// Fields absent from the record are left alone. With `metadata_only`
    /// the payload fields (`content`, `enc_item_key`, `auth_hash`) are never
    /// touched.
    pub(crate) fn apply(&mut self, record: ItemRecord, metadata_only: bool) {
        if let Some(content_type) = record.content_type {
            self.content_type = content_type;
        }
        if let Some(created_at) = record.created_at {
            self.created_at = created_at;
        }
        if let Some(updated_at) = record.updated_at {
            self.updated_at = Some(updated_at);
        }
        self.deleted = record.deleted;
        self.other.extend(record.other);

        if metadata_only {
            return;
        }
        if let Some(content) = record.content {
            self.content = content;
        }
        if let Some(key) = record.enc_item_key {
            self.enc_item_key = Some(key);
        }
        if let Some(hash) = record.auth_hash {
            self.auth_hash = Some(hash);
        }
    }

    /// Copy for transmission. `updated_at` is stripped because the server
    /// recomputes it, and the dirty marker has no wire representation.
    pub fn to_outgoing(&self) -> ItemRecord {
        ItemRecord {
            uuid: self.uuid,
            content_type: Some(self.content_type.clone()),
            content: Some(self.content.clone()),
            created_at: Some(self.created_at),
            updated_at: None,
            enc_item_key: self.enc_item_key.clone(),
            auth_hash: self.auth_hash.clone(),
            deleted: self.deleted,
            other: self.other.clone(),
        }
    }

    pub fn is_note(&self) -> bool {
        self.content_type == ContentType::Note
    }

    pub fn is_tag(&self) -> bool {
        self.content_type == ContentType::Tag
    }

    /// Raw title, before deduplication.
    pub fn title(&self) -> Option<&str> {
        self.content.title.as_deref()
    }

    /// Local edit revision, bumped by every mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}
