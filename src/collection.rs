// ============================================================================
// Item Collection
// ============================================================================
//
// Ordered local mirror of the remote collection. Creates are prepended;
// every other mutation preserves existing order.
//
// ============================================================================

use crate::core::{Item, ItemId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemCollection {
    items: Vec<Item>,
}

impl ItemCollection {
    pub fn from_items(items: Vec<Item>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Item> {
        self.items.iter()
    }

    pub fn position(&self, id: &ItemId) -> Option<usize> {
        self.items.iter().position(|item| &item.id == id)
    }

    pub fn get(&self, id: &ItemId) -> Option<&Item> {
        self.items.iter().find(|item| &item.id == id)
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.position(id).is_some()
    }

    pub fn prepend(&mut self, item: Item) {
        self.items.insert(0, item);
    }

    /// Replaces the item with `id` in place. Returns `false` if it is absent.
    pub fn replace(&mut self, id: &ItemId, item: Item) -> bool {
        match self.position(id) {
            Some(index) => {
                self.items[index] = item;
                true
            }
            None => false,
        }
    }

    /// Removes the item with `id`, returning its former index and value.
    pub fn remove(&mut self, id: &ItemId) -> Option<(usize, Item)> {
        let index = self.position(id)?;
        Some((index, self.items.remove(index)))
    }

    /// Inserts at `index`, falling back to an append when the index is past the end.
    /// Returns the index actually used.
    pub fn insert_clamped(&mut self, index: usize, item: Item) -> usize {
        let index = index.min(self.items.len());
        self.items.insert(index, item);
        index
    }
}
