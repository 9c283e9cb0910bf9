use crate::node::{A2lObjectName, A2lObjectNameSetter, Node};
use fnv::FnvBuildHasher;
use std::{
    collections::HashMap,
    ops::{Index, IndexMut},
};
use thiserror::Error;

/// A dictionary of named a2l items
///
/// An ItemList stores its items in a Vec and additionally maps each item name to its index,
/// which allows fast access by name. Names are unique within one list.
/// The storage order can change when items are removed; the order in which the items are
/// written follows their sequence numbers (see [`ItemList::iter_by_sequence`]).
#[derive(Debug, Clone)]
pub struct ItemList<T: A2lObjectName> {
    // storage for items
    items: Vec<T>,
    // mapping from item name to index in the items vector
    map: HashMap<String, usize, FnvBuildHasher>,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ItemListError {
    #[error("an item named \"{0}\" already exists")]
    DuplicateName(String),

    #[error("there is no item at index {0}")]
    InvalidIndex(usize),
}

impl<T: A2lObjectName> ItemList<T> {
    /// create a new ItemList
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: vec![],
            map: HashMap::default(),
        }
    }

    /// create a new ItemList with a specified initial capacity
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            map: HashMap::with_capacity_and_hasher(capacity, FnvBuildHasher::default()),
        }
    }

    /// push an item into the ItemList
    ///
    /// # Errors
    ///
    /// If an item with the same name is already present, the new item is handed back.
    pub fn push(&mut self, value: T) -> Result<(), T> {
        if self.map.contains_key(value.get_name()) {
            return Err(value);
        }
        let index = self.items.len();
        self.map.insert(value.get_name().to_string(), index);
        self.items.push(value);
        Ok(())
    }

    /// pop an item from the ItemList
    pub fn pop(&mut self) -> Option<T> {
        let item = self.items.pop()?;
        self.map.remove(item.get_name());
        Some(item)
    }

    /// get an item by key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&T> {
        let index = self.map.get(key)?;
        Some(&self.items[*index])
    }

    /// get a mutable reference to an item by key
    ///
    /// Changing the name of the item through this reference leaves the list inconsistent; use
    /// [`ItemList::rename_item`] instead.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut T> {
        let index = self.map.get(key)?;
        Some(&mut self.items[*index])
    }

    /// get the index of an item by key
    #[must_use]
    pub fn index(&self, key: &str) -> Option<usize> {
        self.map.get(key).copied()
    }

    /// Checks if the ItemList contains an item with the given key
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// remove an item from the ItemList by key and return it
    pub fn swap_remove(&mut self, key: &str) -> Option<T> {
        let index = self.map.get(key).copied()?;
        self.swap_remove_idx(index)
    }

    /// remove an item from the ItemList by index and return it
    pub fn swap_remove_idx(&mut self, index: usize) -> Option<T> {
        if index >= self.items.len() {
            return None;
        }
        let item = self.items.swap_remove(index);
        self.map.remove(item.get_name());
        // unless the removed item was the last one, another item was moved into its slot
        if let Some(moved) = self.items.get(index) {
            self.map.insert(moved.get_name().to_string(), index);
        }
        Some(item)
    }

    /// Returns an iterator over references to the items in storage order
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// Returns an iterator over mutable references to the items in storage order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.items.iter_mut()
    }

    /// Returns an iterator over the keys in the ItemList
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.map.keys()
    }

    /// Returns the number of items in the ItemList
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Checks if the ItemList is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// remove all items from the ItemList
    pub fn clear(&mut self) {
        self.items.clear();
        self.map.clear();
    }

    /// Selectively remove or retain items from the ItemList based on a predicate function
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&T) -> bool,
    {
        let items_old = std::mem::take(&mut self.items);
        self.map.clear();
        for item in items_old {
            if keep(&item) {
                self.map.insert(item.get_name().to_string(), self.items.len());
                self.items.push(item);
            }
        }
    }
}

impl<T: A2lObjectName + Node> ItemList<T> {
    /// Returns an iterator over the items, ordered by ascending sequence number
    ///
    /// This is the order in which the items were created, and the order used for writing.
    pub fn iter_by_sequence(&self) -> impl Iterator<Item = &T> {
        let mut items: Vec<&T> = self.items.iter().collect();
        items.sort_by_key(|item| item.sequence());
        items.into_iter()
    }
}

impl<T: A2lObjectName + A2lObjectNameSetter> ItemList<T> {
    /// Set the name of an item in the ItemList
    ///
    /// # Errors
    ///
    /// Fails if the index is out of range, or if the new name is used by a different item.
    pub fn rename_item(&mut self, item_idx: usize, new_name: &str) -> Result<(), ItemListError> {
        let Some(item) = self.items.get_mut(item_idx) else {
            return Err(ItemListError::InvalidIndex(item_idx));
        };
        match self.map.get(new_name) {
            Some(idx) if *idx == item_idx => return Ok(()),
            Some(_) => return Err(ItemListError::DuplicateName(new_name.to_string())),
            None => {}
        }
        self.map.remove(item.get_name());
        item.set_name(new_name.to_string());
        self.map.insert(new_name.to_string(), item_idx);
        Ok(())
    }
}

impl<T> Default for ItemList<T>
where
    T: A2lObjectName,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T: A2lObjectName> Index<usize> for ItemList<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        &self.items[index]
    }
}

impl<T: A2lObjectName> IndexMut<usize> for ItemList<T> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.items[index]
    }
}

impl<T> IntoIterator for ItemList<T>
where
    T: A2lObjectName,
{
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a ItemList<T>
where
    T: A2lObjectName,
{
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

// two lists are equal if they hold equal items in the same creation order
impl<T> PartialEq for ItemList<T>
where
    T: A2lObjectName + Node + PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter_by_sequence()
                .zip(other.iter_by_sequence())
                .all(|(a, b)| a == b)
    }
}
