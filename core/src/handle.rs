use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    marker::PhantomData,
};

/// Generation-checked reference into a fixed-capacity pool.
///
/// A handle never owns the slot it names. The pool bumps a slot's
/// generation whenever the slot is reused, so two handles are equal only if
/// they name the same slot *and* the same occupant of that slot.
pub struct Handle<T> {
    index: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

const NONE_INDEX: u32 = u32::MAX;

impl<T> Handle<T> {
    /// Creates a handle naming the provided slot occupant.
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self {
            index,
            generation,
            _marker: PhantomData,
        }
    }

    /// Sentinel handle that never resolves to a slot.
    #[must_use]
    pub const fn none() -> Self {
        Self::new(NONE_INDEX, 0)
    }

    /// Reports whether the handle is the sentinel.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        self.index == NONE_INDEX
    }

    /// Raw slot index named by the handle.
    #[must_use]
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// Generation of the slot occupant captured by the handle.
    #[must_use]
    pub const fn generation(&self) -> u32 {
        self.generation
    }

    /// Slot position usable for indexing, or `None` for the sentinel.
    #[must_use]
    pub fn slot(&self) -> Option<usize> {
        if self.is_none() {
            None
        } else {
            usize::try_from(self.index).ok()
        }
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

impl<T> PartialOrd for Handle<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Handle<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.index
            .cmp(&other.index)
            .then(self.generation.cmp(&other.generation))
    }
}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> Default for Handle<T> {
    fn default() -> Self {
        Self::none()
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            f.write_str("Handle(none)")
        } else {
            write!(f, "Handle({}v{})", self.index, self.generation)
        }
    }
}

/// Marker naming the space-object pool.
#[derive(Debug)]
pub enum ObjectTag {}

/// Handle to a space object living in the world's object pool.
pub type ObjectId = Handle<ObjectTag>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_differ_by_generation() {
        let first = ObjectId::new(3, 1);
        let reused = ObjectId::new(3, 2);
        assert_ne!(first, reused);
        assert_eq!(first.index(), reused.index());
    }

    #[test]
    fn sentinel_has_no_slot() {
        let none = ObjectId::none();
        assert!(none.is_none());
        assert_eq!(none.slot(), None);
        assert_eq!(ObjectId::default(), none);
    }
}
