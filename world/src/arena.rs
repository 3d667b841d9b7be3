//! Fixed-capacity slot pool with generation-checked handles.

use std::marker::PhantomData;

use flotilla_core::Handle;

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
    prev: Option<u32>,
    next: Option<u32>,
}

/// Pool of `T` values addressed by [`Handle<K>`].
///
/// Occupied slots are additionally threaded onto an alive sequence in
/// creation order, so systems can walk live values without scanning the
/// whole capacity. Insertion and removal are constant time.
#[derive(Debug)]
pub struct Arena<K, T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    head: Option<u32>,
    tail: Option<u32>,
    len: usize,
    _marker: PhantomData<fn() -> K>,
}

impl<K, T> Arena<K, T> {
    /// Creates an empty pool with room for `capacity` values.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let slots = (0..capacity)
            .map(|_| Slot {
                generation: 0,
                value: None,
                prev: None,
                next: None,
            })
            .collect();
        let free = (0..capacity as u32).rev().collect();
        Self {
            slots,
            free,
            head: None,
            tail: None,
            len: 0,
            _marker: PhantomData,
        }
    }

    /// Number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Reports whether no slot is occupied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Stores a value in the most recently freed slot, or the lowest never-used
    /// one, and appends it to the alive sequence.
    ///
    /// Returns `None` when the pool is full.
    pub fn insert(&mut self, value: T) -> Option<Handle<K>> {
        let index = self.free.pop()?;
        let previous_tail = self.tail;
        let slot = self.slots.get_mut(index as usize)?;
        slot.generation = slot.generation.wrapping_add(1);
        slot.value = Some(value);
        slot.prev = previous_tail;
        slot.next = None;
        let generation = slot.generation;

        match previous_tail {
            Some(tail) => {
                if let Some(tail_slot) = self.slots.get_mut(tail as usize) {
                    tail_slot.next = Some(index);
                }
            }
            None => self.head = Some(index),
        }
        self.tail = Some(index);
        self.len += 1;
        Some(Handle::new(index, generation))
    }

    /// Removes the value named by a current handle.
    pub fn remove(&mut self, handle: Handle<K>) -> Option<T> {
        if !self.is_current(handle) {
            return None;
        }
        let index = handle.index();
        let slot = self.slots.get_mut(index as usize)?;
        let value = slot.value.take()?;
        let (prev, next) = (slot.prev.take(), slot.next.take());

        match prev {
            Some(prev) => {
                if let Some(prev_slot) = self.slots.get_mut(prev as usize) {
                    prev_slot.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(next) => {
                if let Some(next_slot) = self.slots.get_mut(next as usize) {
                    next_slot.prev = prev;
                }
            }
            None => self.tail = prev,
        }

        self.free.push(index);
        self.len -= 1;
        Some(value)
    }

    /// Occupant of the slot named by the handle, regardless of generation.
    #[must_use]
    pub fn slot(&self, handle: Handle<K>) -> Option<&T> {
        self.slots.get(handle.slot()?)?.value.as_ref()
    }

    /// Reports whether the handle names the slot's current occupant.
    #[must_use]
    pub fn is_current(&self, handle: Handle<K>) -> bool {
        handle
            .slot()
            .and_then(|index| self.slots.get(index))
            .is_some_and(|slot| slot.value.is_some() && slot.generation == handle.generation())
    }

    /// Value named by a current handle.
    #[must_use]
    pub fn get(&self, handle: Handle<K>) -> Option<&T> {
        let slot = self.slots.get(handle.slot()?)?;
        if slot.generation != handle.generation() {
            return None;
        }
        slot.value.as_ref()
    }

    /// Mutable value named by a current handle.
    pub fn get_mut(&mut self, handle: Handle<K>) -> Option<&mut T> {
        let slot = self.slots.get_mut(handle.slot()?)?;
        if slot.generation != handle.generation() {
            return None;
        }
        slot.value.as_mut()
    }

    /// Two distinct values named by current handles.
    pub fn pair_mut(&mut self, a: Handle<K>, b: Handle<K>) -> Option<(&mut T, &mut T)> {
        if a.index() == b.index() || !self.is_current(a) || !self.is_current(b) {
            return None;
        }
        let (first, second, swapped) = if a.index() < b.index() {
            (a.index() as usize, b.index() as usize, false)
        } else {
            (b.index() as usize, a.index() as usize, true)
        };
        let (left, right) = self.slots.split_at_mut(second);
        let low = left.get_mut(first)?.value.as_mut()?;
        let high = right.first_mut()?.value.as_mut()?;
        if swapped {
            Some((high, low))
        } else {
            Some((low, high))
        }
    }

    /// Handle of the current occupant of a slot index.
    #[must_use]
    pub fn handle_at(&self, index: usize) -> Option<Handle<K>> {
        let slot = self.slots.get(index)?;
        slot.value
            .as_ref()
            .map(|_| Handle::new(index as u32, slot.generation))
    }

    /// Restartable pass over the whole capacity in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle<K>, &T)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value
                .as_ref()
                .map(|value| (Handle::new(index as u32, slot.generation), value))
        })
    }

    /// Walks the alive sequence in creation order.
    pub fn alive(&self) -> impl Iterator<Item = (Handle<K>, &T)> + '_ {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            let index = cursor?;
            let slot = self.slots.get(index as usize)?;
            cursor = slot.next;
            slot.value
                .as_ref()
                .map(|value| (Handle::new(index, slot.generation), value))
        })
    }

    /// Copies the alive sequence's handles into a scratch buffer.
    pub fn alive_handles(&self, out: &mut Vec<Handle<K>>) {
        out.clear();
        out.extend(self.alive().map(|(handle, _)| handle));
    }

    /// First handle of the alive sequence.
    #[must_use]
    pub fn first_alive(&self) -> Option<Handle<K>> {
        self.handle_at(self.head? as usize)
    }

    /// Handle following `handle` in the alive sequence.
    ///
    /// A stale or sentinel handle restarts from the head.
    #[must_use]
    pub fn next_alive(&self, handle: Handle<K>) -> Option<Handle<K>> {
        if !self.is_current(handle) {
            return self.first_alive();
        }
        let next = self.slots.get(handle.slot()?)?.next?;
        self.handle_at(next as usize)
    }
}
