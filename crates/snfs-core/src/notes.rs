//! Note accessors and mutations exposed to the filesystem layer.
//!
//! Note text crosses this boundary as UTF-8 bytes. Reads always end in a
//! newline; writes store the decoded text as given.

use crate::error::{Result, StoreError};
use crate::item::{Content, ContentType, Item, Timestamp};
use crate::store::ItemStore;
use crate::timestamps::{effective_modified_time, mark_created, mark_dirty};

use chrono::Utc;
use std::collections::BTreeMap;
use tracing::debug;
use uuid::Uuid;

/// A note as presented to the filesystem layer.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteView {
    /// Unique derived file name
    pub display_name: String,
    /// Note text, newline terminated
    pub content: Vec<u8>,
    pub id: Uuid,
    pub created_at: Timestamp,
    pub modified_at: Timestamp,
}

/// Where a note is listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteFolder {
    /// Neither archived nor trashed
    Active,
    /// Archived but not trashed
    Archived,
    /// Trashed, whether or not also archived
    Trash,
}

impl NoteFolder {
    pub fn of(item: &Item) -> Self {
        if item.content.trashed() {
            NoteFolder::Trash
        } else if item.content.archived() {
            NoteFolder::Archived
        } else {
            NoteFolder::Active
        }
    }
}

/// Append a newline unless the text already ends in one.
pub fn with_trailing_newline(text: &str) -> String {
    let mut text = text.to_string();
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text
}

impl ItemStore {
    /// Look up a note by its derived file name.
    pub fn get_note(&self, name: &str) -> Result<NoteView> {
        let id = self.get_note_id(name)?;
        let item = self.live(&id, ContentType::Note)?;
        let text = item.content.text.as_deref().unwrap_or_default();

        Ok(NoteView {
            display_name: name.to_string(),
            content: with_trailing_newline(text).into_bytes(),
            id,
            created_at: item.created_at,
            modified_at: effective_modified_time(item),
        })
    }

    /// Id of the note currently named `name`.
    pub fn get_note_id(&self, name: &str) -> Result<Uuid> {
        self.note_index()
            .get(name)
            .ok_or_else(|| StoreError::NoteNotFound(name.to_string()))
    }

    /// Every note file name and the id behind it, in any folder.
    pub fn get_notes(&self) -> BTreeMap<String, Uuid> {
        self.note_index().entries()
    }

    /// Create an empty dirty note titled `name`.
    ///
    /// A trailing extension matching the store's is stripped from the title.
    pub fn create_note(&mut self, name: &str) -> Uuid {
        let title = self.title_from_name(name).to_string();
        let mut item = Item::new_local(ContentType::Note, Content::note(&title), Utc::now());
        mark_created(&mut item);

        let id = self.insert_local(item);
        debug!("created note {} ({})", title, id);
        id
    }

    /// Retitle a note. The note's file name is re-derived immediately.
    pub fn rename_note(&mut self, id: &Uuid, new_name: &str) -> Result<String> {
        let title = self.title_from_name(new_name).to_string();
        let item = self.live_mut(id, ContentType::Note)?;
        item.content.title = Some(title);
        mark_dirty(item);

        self.reindex(id).ok_or(StoreError::ItemNotFound(*id))
    }

    /// Replace a note's text with `bytes` decoded as UTF-8.
    pub fn write_note(&mut self, id: &Uuid, bytes: &[u8]) -> Result<()> {
        let text = String::from_utf8(bytes.to_vec())?;
        let item = self.live_mut(id, ContentType::Note)?;
        item.content.text = Some(text);
        mark_dirty(item);
        Ok(())
    }

    /// Bump a note's modification time without changing it.
    pub fn touch_note(&mut self, id: &Uuid) -> Result<()> {
        let item = self.live_mut(id, ContentType::Note)?;
        mark_dirty(item);
        Ok(())
    }

    /// Tombstone a note. Its name disappears immediately; the item itself is
    /// dropped once the server acknowledges the deletion.
    ///
    /// Deleting an unknown or already deleted note is a no-op.
    pub fn delete_note(&mut self, id: &Uuid) -> Result<()> {
        let Some(item) = self.deletable_mut(id, ContentType::Note)? else {
            return Ok(());
        };
        item.deleted = true;
        mark_dirty(item);
        self.reindex(id);
        Ok(())
    }

    /// Move a note into or out of the archive.
    pub fn archive_note(&mut self, id: &Uuid, archived: bool) -> Result<()> {
        let item = self.live_mut(id, ContentType::Note)?;
        item.content.set_archived(archived);
        mark_dirty(item);
        Ok(())
    }

    /// Move a note into or out of the trash.
    pub fn trash_note(&mut self, id: &Uuid, trashed: bool) -> Result<()> {
        let item = self.live_mut(id, ContentType::Note)?;
        item.content.set_trashed(trashed);
        mark_dirty(item);
        Ok(())
    }

    /// Note names and ids in one folder.
    pub fn get_notes_in(&self, folder: NoteFolder) -> BTreeMap<String, Uuid> {
        self.note_index()
            .entries()
            .into_iter()
            .filter(|(_, id)| self.get(id).is_some_and(|item| NoteFolder::of(item) == folder))
            .collect()
    }

    fn title_from_name<'a>(&self, name: &'a str) -> &'a str {
        let extension = self.extension();
        if extension.is_empty() {
            return name;
        }
        match name.strip_suffix(extension) {
            Some(stem) if !stem.is_empty() => stem,
            _ => name,
        }
    }
}
