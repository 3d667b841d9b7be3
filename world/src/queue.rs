//! Delayed remainders of action lists.

use std::collections::VecDeque;

use flotilla_core::{ActionRange, ObjectId, Point};

/// Remainder of an action list waiting for its delay to elapse.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueuedActions {
    /// Actions still to run, starting with the delayed one.
    pub actions: ActionRange,
    /// Ticks until the actions run.
    pub time: i32,
    /// Subject captured when the delay began.
    pub subject: ObjectId,
    /// Direct object captured when the delay began.
    pub direct: ObjectId,
    /// Creation offset captured when the delay began.
    pub offset: Option<Point>,
}

/// Bounded queue kept sorted by scheduled time, oldest first among equals.
#[derive(Debug)]
pub struct ActionQueue {
    entries: VecDeque<QueuedActions>,
    capacity: usize,
}

impl ActionQueue {
    /// Creates an empty queue holding at most `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Maximum number of entries.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of waiting entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether nothing is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Schedules an entry behind every entry due no later than it.
    ///
    /// Returns `false` and drops the entry when the queue is full.
    pub fn push(&mut self, entry: QueuedActions) -> bool {
        if self.entries.len() >= self.capacity {
            return false;
        }
        let position = self
            .entries
            .iter()
            .position(|queued| queued.time > entry.time)
            .unwrap_or(self.entries.len());
        self.entries.insert(position, entry);
        true
    }

    /// Moves every entry `ticks` closer to running.
    pub fn advance(&mut self, ticks: i32) {
        for entry in &mut self.entries {
            entry.time = entry.time.saturating_sub(ticks);
        }
    }

    /// Removes the earliest entry if it is due.
    pub fn pop_due(&mut self) -> Option<QueuedActions> {
        if self.entries.front()?.time <= 0 {
            self.entries.pop_front()
        } else {
            None
        }
    }

    /// Iterates waiting entries in the order they will run.
    pub fn iter(&self) -> impl Iterator<Item = &QueuedActions> {
        self.entries.iter()
    }
}
