//! Tag view: read-only projection of tags onto unique directory names.
//!
//! Tag names are not maintained incrementally. Every view request rebuilds a
//! fresh [`TitleIndex`] from the live tags ordered by creation time, so the
//! result is deterministic for a given store.

use crate::error::{Result, StoreError};
use crate::item::{Content, ContentType, Item, Reference, Timestamp};
use crate::store::ItemStore;
use crate::timestamps::{mark_created, mark_dirty};
use crate::title_index::{Naming, TitleIndex, UNTITLED};

use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;
use uuid::Uuid;

/// One tag as seen by the filesystem layer.
#[derive(Debug, Clone, PartialEq)]
pub struct TagView {
    pub name: String,
    /// Ids of the notes this tag references
    pub notes: BTreeSet<Uuid>,
    pub id: Uuid,
    pub created_at: Timestamp,
    /// Server `updated_at`, falling back to `created_at`
    pub modified_at: Timestamp,
}

impl ItemStore {
    /// Build the tag name -> view mapping for every live tag.
    pub fn build_tag_view(&self) -> BTreeMap<String, TagView> {
        let mut tags: Vec<&Item> = self
            .items()
            .filter(|item| item.is_tag() && !item.deleted)
            .collect();
        tags.sort_by_key(|item| (item.created_at, item.uuid));

        let mut index = TitleIndex::new();
        let mut views = BTreeMap::new();
        for item in tags {
            let name = index.assign(item.uuid, item.title().unwrap_or(UNTITLED), Naming::Tag);
            let notes = item
                .content
                .references
                .iter()
                .filter(|reference| reference.content_type == ContentType::Note)
                .map(|reference| reference.uuid)
                .collect();

            views.insert(
                name.clone(),
                TagView {
                    name,
                    notes,
                    id: item.uuid,
                    created_at: item.created_at,
                    modified_at: item.updated_at.unwrap_or(item.created_at),
                },
            );
        }
        views
    }

    /// Look up a tag by its derived name.
    pub fn get_tag(&self, name: &str) -> Result<TagView> {
        self.build_tag_view()
            .remove(name)
            .ok_or_else(|| StoreError::TagNotFound(name.to_string()))
    }

    /// Create an empty dirty tag titled `name`.
    pub fn create_tag(&mut self, name: &str) -> Uuid {
        let mut item = Item::new_local(ContentType::Tag, Content::tag(name), Utc::now());
        mark_created(&mut item);
        let id = self.insert_local(item);
        debug!("created tag {} ({})", name, id);
        id
    }

    pub fn rename_tag(&mut self, id: &Uuid, new_name: &str) -> Result<()> {
        let item = self.live_mut(id, ContentType::Tag)?;
        item.content.title = Some(new_name.to_string());
        mark_dirty(item);
        Ok(())
    }

    /// Tombstone a tag; it is dropped once the server acknowledges it.
    /// Unknown or already deleted tags are left alone.
    pub fn delete_tag(&mut self, id: &Uuid) -> Result<()> {
        let Some(item) = self.deletable_mut(id, ContentType::Tag)? else {
            return Ok(());
        };
        item.deleted = true;
        mark_dirty(item);
        Ok(())
    }

    /// Add a note reference to a tag. Already-tagged notes are left alone.
    pub fn tag_note(&mut self, tag_id: &Uuid, note_id: &Uuid) -> Result<()> {
        self.live(note_id, ContentType::Note)?;
        let tag = self.live_mut(tag_id, ContentType::Tag)?;

        let present = tag
            .content
            .references
            .iter()
            .any(|reference| reference.uuid == *note_id);
        if !present {
            tag.content.references.push(Reference {
                uuid: *note_id,
                content_type: ContentType::Note,
            });
            mark_dirty(tag);
        }
        Ok(())
    }

    /// Remove a note reference from a tag.
    pub fn untag_note(&mut self, tag_id: &Uuid, note_id: &Uuid) -> Result<()> {
        self.live(note_id, ContentType::Note)?;
        let tag = self.live_mut(tag_id, ContentType::Tag)?;

        let before = tag.content.references.len();
        tag.content
            .references
            .retain(|reference| reference.uuid != *note_id);
        if tag.content.references.len() != before {
            mark_dirty(tag);
        }
        Ok(())
    }
}
