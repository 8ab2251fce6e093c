//! Dirty tracking and modification-time resolution.

use crate::item::{Item, Timestamp};
use chrono::{Duration, Utc};

/// Mark `item` as locally modified now.
pub fn mark_dirty(item: &mut Item) {
    mark_dirty_at(item, Utc::now());
}

/// Mark `item` as locally modified at `at`.
///
/// Sets the dirty flag, bumps the local revision and records `at` as the
/// client edit time, creating the `appData` namespace if needed.
pub fn mark_dirty_at(item: &mut Item, at: Timestamp) {
    item.dirty = true;
    item.revision += 1;
    item.content
        .ensure_app_data()
        .ensure_client()
        .client_updated_at = Some(at);
}

/// Mark a freshly created `item` dirty.
///
/// The client edit time is kept strictly after `created_at` even when the
/// clock has not advanced since the item was built.
pub fn mark_created(item: &mut Item) {
    let earliest = item.created_at + Duration::microseconds(1);
    mark_dirty_at(item, Utc::now().max(earliest));
}

/// Best-known last modification time.
///
/// Resolution order: client edit time, then server `updated_at`, then
/// `created_at`. The server time is never preferred over a local edit.
pub fn effective_modified_time(item: &Item) -> Timestamp {
    item.content
        .client_updated_at()
        .or(item.updated_at)
        .unwrap_or(item.created_at)
}
