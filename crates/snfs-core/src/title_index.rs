//! Title index: projects items with non-unique titles onto unique names.
//!
//! A name is derived by trying `title`, `title2`, `title3`, ... until a
//! candidate is free in the namespace. Notes get path separators replaced
//! and the configured extension appended; tag names additionally have
//! whitespace replaced so they work as directory names.
//!
//! The index is always derived from the store and never authoritative.

use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// Title used for notes without one.
pub const UNTITLED: &str = "Untitled";

/// Which namespace rules to apply when deriving a name.
#[derive(Debug, Clone, Copy)]
pub enum Naming<'a> {
    /// Note file names: `/` replaced, extension appended.
    Note { extension: &'a str },
    /// Tag directory names: `/` and whitespace replaced, no extension.
    Tag,
}

impl Naming<'_> {
    /// Candidate name for `title` at the given suffix count.
    ///
    /// Count 0 is the bare title; count `n` appends `n + 1`.
    pub fn candidate(&self, title: &str, count: usize) -> String {
        let base = if count == 0 {
            title.to_string()
        } else {
            format!("{}{}", title, count + 1)
        };

        match self {
            Naming::Note { extension } => {
                let mut name = base.replace('/', "-");
                name.push_str(extension);
                name
            }
            Naming::Tag => base
                .chars()
                .map(|c| match c {
                    '/' => '-',
                    c if c.is_whitespace() => '_',
                    c => c,
                })
                .collect(),
        }
    }
}

/// Bidirectional unique-name <-> id mapping for one namespace.
#[derive(Debug, Default, Clone)]
pub struct TitleIndex {
    by_name: HashMap<String, Uuid>,
    by_id: HashMap<Uuid, String>,
}

impl TitleIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id bound to `name`.
    pub fn get(&self, name: &str) -> Option<Uuid> {
        self.by_name.get(name).copied()
    }

    /// Name currently held by `id`.
    pub fn name_of(&self, id: &Uuid) -> Option<&str> {
        self.by_id.get(id).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Evict whatever name `id` holds. Returns the evicted name.
    pub fn remove(&mut self, id: &Uuid) -> Option<String> {
        let name = self.by_id.remove(id)?;
        self.by_name.remove(&name);
        Some(name)
    }

    /// Derive a unique name for `id` from `title` and bind it.
    ///
    /// Any name previously held by `id` is evicted first, so re-deriving an
    /// unchanged title is stable unless a lower suffix has been freed.
    pub fn assign(&mut self, id: Uuid, title: &str, naming: Naming<'_>) -> String {
        self.remove(&id);

        let mut count = 0;
        let name = loop {
            let candidate = naming.candidate(title, count);
            match self.by_name.get(&candidate) {
                Some(holder) if *holder != id => count += 1,
                _ => break candidate,
            }
        };

        self.by_name.insert(name.clone(), id);
        self.by_id.insert(id, name.clone());
        name
    }

    /// Sorted snapshot of every binding.
    pub fn entries(&self) -> BTreeMap<String, Uuid> {
        self.by_name
            .iter()
            .map(|(name, id)| (name.clone(), *id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TXT: Naming<'static> = Naming::Note { extension: ".txt" };

    #[test]
    fn test_note_candidates() {
        assert_eq!(TXT.candidate("Shopping", 0), "Shopping.txt");
        assert_eq!(TXT.candidate("Shopping", 1), "Shopping2.txt");
        assert_eq!(TXT.candidate("a/b", 2), "a-b3.txt");
        assert_eq!(TXT.candidate("two words", 0), "two words.txt");
    }

    #[test]
    fn test_tag_candidates() {
        assert_eq!(Naming::Tag.candidate("work stuff", 0), "work_stuff");
        assert_eq!(Naming::Tag.candidate("a/b\tc", 1), "a-b_c2");
    }

    #[test]
    fn test_collisions_get_suffixes() {
        let mut index = TitleIndex::new();
        let ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();

        let names: Vec<String> = ids
            .iter()
            .map(|id| index.assign(*id, "Shopping", TXT))
            .collect();

        assert_eq!(names, vec!["Shopping.txt", "Shopping2.txt", "Shopping3.txt"]);
        for (name, id) in names.iter().zip(&ids) {
            assert_eq!(index.get(name), Some(*id));
            assert_eq!(index.name_of(id), Some(name.as_str()));
        }
    }

    #[test]
    fn test_reassign_same_title_is_stable() {
        let mut index = TitleIndex::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        index.assign(first, "Shopping", TXT);
        index.assign(second, "Shopping", TXT);

        assert_eq!(index.assign(second, "Shopping", TXT), "Shopping2.txt");
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_reassign_evicts_old_name() {
        let mut index = TitleIndex::new();
        let id = Uuid::new_v4();
        index.assign(id, "Old", TXT);
        index.assign(id, "New", TXT);

        assert!(!index.contains("Old.txt"));
        assert_eq!(index.get("New.txt"), Some(id));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_sanitized_collision_is_detected() {
        // "a/b" and "a-b" sanitize to the same file name
        let mut index = TitleIndex::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        assert_eq!(index.assign(first, "a-b", TXT), "a-b.txt");
        assert_eq!(index.assign(second, "a/b", TXT), "a-b2.txt");
    }

    #[test]
    fn test_remove_frees_name() {
        let mut index = TitleIndex::new();
        let id = Uuid::new_v4();
        index.assign(id, "Gone", TXT);
        assert_eq!(index.remove(&id).as_deref(), Some("Gone.txt"));
        assert!(index.is_empty());
        assert!(index.remove(&id).is_none());
    }
}
