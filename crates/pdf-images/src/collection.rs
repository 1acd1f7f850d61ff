//! The ordered list of images that will become pages

use crate::types::{ImageEntry, ImageId, LoadedImage};
use std::sync::Arc;

/// Ordered images awaiting export. Insertion order is page order.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    entries: Vec<ImageEntry>,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ImageEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImageEntry> {
        self.entries.iter()
    }

    pub fn ids(&self) -> Vec<ImageId> {
        self.entries.iter().map(|e| e.id).collect()
    }

    pub fn get(&self, id: ImageId) -> Option<&ImageEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn position(&self, id: ImageId) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    /// Append a decoded image under a freshly generated id
    pub fn append(&mut self, loaded: LoadedImage) -> &ImageEntry {
        let entry = ImageEntry {
            id: ImageId::next(),
            display_name: loaded.display_name,
            image: Arc::new(loaded.image),
        };
        log::debug!(
            "Appending {} ({}) at position {}",
            entry.display_name,
            entry.id,
            self.entries.len()
        );
        self.entries.push(entry);
        &self.entries[self.entries.len() - 1]
    }

    /// Remove an entry. Unknown ids are ignored.
    pub fn remove(&mut self, id: ImageId) -> Option<ImageEntry> {
        let index = self.position(id)?;
        Some(self.entries.remove(index))
    }

    /// Move an entry to `to_index`, shifting the others.
    ///
    /// Indices past the end clamp to the last position. Returns whether the
    /// order changed.
    pub fn move_to(&mut self, id: ImageId, to_index: usize) -> bool {
        let Some(from) = self.position(id) else {
            return false;
        };
        let to = to_index.min(self.entries.len() - 1);
        if from == to {
            return false;
        }
        let entry = self.entries.remove(from);
        self.entries.insert(to, entry);
        true
    }

    /// Drag-and-drop form of [`Collection::move_to`]: the dragged entry takes
    /// the target's current slot. Dropping an entry onto itself does nothing.
    pub fn move_onto(&mut self, id: ImageId, target: ImageId) -> bool {
        if id == target {
            return false;
        }
        match self.position(target) {
            Some(to) => self.move_to(id, to),
            None => false,
        }
    }

    /// Owned copy of the current order; later mutations don't affect it
    pub fn snapshot(&self) -> Vec<ImageEntry> {
        self.entries.clone()
    }
}
