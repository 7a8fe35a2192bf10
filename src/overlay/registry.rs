use std::collections::HashMap;

use super::surface::ViewHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerEntry {
    pub view: ViewHandle,
    pub display: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorEntry {
    pub view: ViewHandle,
    /// Version of the badge load this entry is waiting for; 0 when none.
    pub badge_version: u64,
}

/// Keyed set of persistent overlay views. The owning container is visible iff this is non-empty.
#[derive(Debug)]
pub struct Registry<E> {
    entries: HashMap<i32, E>,
}

impl<E> Default for Registry<E> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<E> Registry<E> {
    pub fn get_mut(&mut self, id: i32) -> Option<&mut E> {
        self.entries.get_mut(&id)
    }

    pub fn get(&self, id: i32) -> Option<&E> {
        self.entries.get(&id)
    }

    pub fn insert(&mut self, id: i32, entry: E) {
        self.entries.insert(id, entry);
    }

    pub fn remove(&mut self, id: i32) -> Option<E> {
        self.entries.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Container visibility after the last mutation.
    pub fn visible(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = (i32, E)> + '_ {
        self.entries.drain()
    }
}
