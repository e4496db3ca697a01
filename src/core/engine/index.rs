//! Exact-name secondary index
//!
//! Maps a record's current name to the ids carrying it. Holds ids only;
//! the id index stays the canonical owner of every record.

use ahash::AHashMap;
use std::collections::BTreeSet;

#[derive(Debug, Default)]
pub struct NameIndex {
    entries: AHashMap<String, BTreeSet<i64>>,
}

impl NameIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, id: i64) {
        self.entries.entry(name.to_string()).or_default().insert(id);
    }

    /// Remove `id` from `name`'s bucket, dropping the bucket once empty
    pub fn remove(&mut self, name: &str, id: i64) -> bool {
        let Some(ids) = self.entries.get_mut(name) else {
            return false;
        };
        let removed = ids.remove(&id);
        if ids.is_empty() {
            self.entries.remove(name);
        }
        removed
    }

    /// Move `id` from `old` to `new`
    pub fn rename(&mut self, old: &str, new: &str, id: i64) {
        if old != new {
            self.remove(old, id);
            self.insert(new, id);
        }
    }

    pub fn get(&self, name: &str) -> impl Iterator<Item = i64> + '_ {
        self.entries.get(name).into_iter().flatten().copied()
    }

    pub fn contains(&self, name: &str, id: i64) -> bool {
        self.entries.get(name).is_some_and(|ids| ids.contains(&id))
    }

    /// Total number of (name, id) entries
    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&str, i64)> + '_ {
        self.entries
            .iter()
            .flat_map(|(name, ids)| ids.iter().map(move |id| (name.as_str(), *id)))
    }
}
