//! Specialized collection types

use std::ops::{Index, IndexMut};

pub use slotmap::{SecondaryMap, SlotMap};

slotmap::new_key_type! {
    /// Stable handle to a collider registered in a collision world
    pub struct ColliderId;

    /// Stable handle to a registered collision listener
    pub struct ListenerId;
}

/// Free list for arena-style pooling with stable indices.
///
/// Every slot carries a generation that is bumped when its item is removed,
/// so `(index, generation)` pairs taken earlier can be told apart from the
/// slot's current occupant. Indexing a vacant slot panics; use
/// [`FreeList::get`] when the index may be stale.
#[derive(Debug, Clone)]
pub struct FreeList<T> {
    items: Vec<Slot<T>>,
    free_indices: Vec<usize>,
}

#[derive(Debug, Clone)]
struct Slot<T> {
    generation: u32,
    item: Option<T>,
}

impl<T> FreeList<T> {
    /// Create a new free list
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            free_indices: Vec::new(),
        }
    }

    /// Insert an item and return its index
    pub fn insert(&mut self, item: T) -> usize {
        if let Some(index) = self.free_indices.pop() {
            self.items[index].item = Some(item);
            index
        } else {
            let index = self.items.len();
            self.items.push(Slot { generation: 0, item: Some(item) });
            index
        }
    }

    /// Remove an item by index
    pub fn remove(&mut self, index: usize) -> Option<T> {
        let slot = self.items.get_mut(index)?;
        let item = slot.item.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_indices.push(index);
        Some(item)
    }

    /// Get an item by index
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)?.item.as_ref()
    }

    /// Get a mutable reference to an item by index
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)?.item.as_mut()
    }

    /// Generation of an occupied slot
    pub fn generation(&self, index: usize) -> Option<u32> {
        let slot = self.items.get(index)?;
        slot.item.as_ref().map(|_| slot.generation)
    }

    /// Number of occupied slots
    pub fn len(&self) -> usize {
        self.items.len() - self.free_indices.len()
    }

    /// True when no slot is occupied
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every item. Slots are kept so their generations keep counting.
    pub fn clear(&mut self) {
        self.free_indices.clear();
        for (index, slot) in self.items.iter_mut().enumerate().rev() {
            if slot.item.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
            }
            self.free_indices.push(index);
        }
    }

    /// Iterate over occupied slots as `(index, item)`
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.items
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.item.as_ref().map(|item| (index, item)))
    }
}

impl<T> Default for FreeList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Index<usize> for FreeList<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        match self.get(index) {
            Some(item) => item,
            None => panic!("FreeList: slot {index} is vacant"),
        }
    }
}

impl<T> IndexMut<usize> for FreeList<T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        match self.get_mut(index) {
            Some(item) => item,
            None => panic!("FreeList: slot {index} is vacant"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_list_reuses_slots() {
        let mut list = FreeList::new();
        let a = list.insert("a");
        let b = list.insert("b");

        assert_eq!(list.remove(a), Some("a"));
        assert_eq!(list.len(), 1);

        let c = list.insert("c");
        assert_eq!(c, a);
        assert_eq!(list[b], "b");
        assert_eq!(list[c], "c");
    }

    #[test]
    fn test_double_remove_is_none() {
        let mut list = FreeList::new();
        let a = list.insert(1);
        assert_eq!(list.remove(a), Some(1));
        assert_eq!(list.remove(a), None);
        assert!(list.is_empty());
    }

    #[test]
    fn test_reused_slot_gets_new_generation() {
        let mut list = FreeList::new();
        let a = list.insert('a');
        let first = list.generation(a).unwrap();

        list.remove(a);
        assert_eq!(list.generation(a), None);

        let b = list.insert('b');
        assert_eq!(b, a);
        assert_ne!(list.generation(b), Some(first));
    }

    #[test]
    fn test_clear_keeps_generations_moving() {
        let mut list = FreeList::new();
        let a = list.insert(1);
        let before = list.generation(a).unwrap();

        list.clear();
        assert!(list.is_empty());

        let b = list.insert(2);
        assert_eq!(b, a);
        assert_ne!(list.generation(b), Some(before));
        assert_eq!(list[b], 2);
    }

    #[test]
    #[should_panic(expected = "vacant")]
    fn test_index_vacant_slot_panics() {
        let mut list = FreeList::new();
        let a = list.insert(1);
        list.remove(a);
        let _ = list[a];
    }
}
