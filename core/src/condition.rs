//! Scenario triggers polled by the condition evaluator.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::{ActionRange, AdmiralId, Fixed, InitialId};

/// Ordering comparison against a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Less than.
    Lt,
    /// Greater than.
    Gt,
    /// Less than or equal.
    Le,
    /// Greater than or equal.
    Ge,
}

impl CompareOp {
    /// Applies the operator to `actual` against `expected`.
    #[must_use]
    pub fn holds<T: Ord>(self, actual: T, expected: T) -> bool {
        let ordering = actual.cmp(&expected);
        match self {
            Self::Eq => ordering == Ordering::Equal,
            Self::Ne => ordering != Ordering::Equal,
            Self::Lt => ordering == Ordering::Less,
            Self::Gt => ordering == Ordering::Greater,
            Self::Le => ordering != Ordering::Greater,
            Self::Ge => ordering != Ordering::Less,
        }
    }
}

/// Equality-only comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EqOp {
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
}

impl EqOp {
    /// Applies the operator.
    #[must_use]
    pub fn holds<T: PartialEq>(self, actual: T, expected: T) -> bool {
        match self {
            Self::Eq => actual == expected,
            Self::Ne => actual != expected,
        }
    }
}

/// Indirect reference to an object resolved when a condition is checked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectRef {
    /// A placed initial object.
    Initial(InitialId),
    /// An admiral's flagship.
    Flagship(AdmiralId),
    /// The object an admiral is controlling.
    Control(AdmiralId),
    /// The object an admiral is targeting.
    Target(AdmiralId),
}

/// Admiral counter compared by [`When::Counter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Counter {
    /// Admiral owning the score.
    pub admiral: AdmiralId,
    /// Score slot.
    pub which: usize,
}

/// Predicate of a condition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum When {
    /// Compares an admiral's autopilot state.
    Autopilot {
        /// Operator.
        op: EqOp,
        /// Admiral inspected.
        admiral: AdmiralId,
        /// Expected state.
        value: bool,
    },
    /// Compares whether an admiral's build-at destination is building.
    Building {
        /// Operator.
        op: EqOp,
        /// Admiral inspected.
        admiral: AdmiralId,
        /// Expected state.
        value: bool,
    },
    /// Compares an admiral's cash.
    Cash {
        /// Operator.
        op: CompareOp,
        /// Admiral inspected.
        admiral: AdmiralId,
        /// Threshold.
        value: Fixed,
    },
    /// Compares the selected mini-computer line.
    Computer {
        /// Operator.
        op: EqOp,
        /// Screen.
        screen: i32,
        /// Line, or any line when absent.
        line: Option<i32>,
    },
    /// Compares an admiral score.
    Counter {
        /// Operator.
        op: CompareOp,
        /// Score inspected.
        counter: Counter,
        /// Threshold.
        value: i32,
    },
    /// Compares whether an object is gone.
    Destroyed {
        /// Operator.
        op: EqOp,
        /// Object inspected.
        object: ObjectRef,
        /// Expected state.
        value: bool,
    },
    /// Compares the squared distance between two objects.
    Distance {
        /// Operator.
        op: CompareOp,
        /// First object.
        from: ObjectRef,
        /// Second object.
        to: ObjectRef,
        /// Threshold distance, squared before comparing.
        value: u32,
    },
    /// Compares an object's health fraction.
    Health {
        /// Operator.
        op: CompareOp,
        /// Object inspected.
        object: ObjectRef,
        /// Threshold fraction.
        value: Fixed,
    },
    /// Compares the current message page.
    Message {
        /// Operator.
        op: EqOp,
        /// Message resource.
        id: i32,
        /// Page within the message.
        page: i32,
    },
    /// Compares the identity of two objects.
    Object {
        /// Operator.
        op: EqOp,
        /// First object.
        a: ObjectRef,
        /// Second object.
        b: ObjectRef,
    },
    /// Compares an object's owner.
    Owner {
        /// Operator.
        op: EqOp,
        /// Object inspected.
        object: ObjectRef,
        /// Expected owner; absent means unowned.
        admiral: Option<AdmiralId>,
    },
    /// Compares an admiral's ship count.
    Ships {
        /// Operator.
        op: CompareOp,
        /// Admiral inspected.
        admiral: AdmiralId,
        /// Threshold.
        value: i32,
    },
    /// Compares an object's speed.
    Speed {
        /// Operator.
        op: CompareOp,
        /// Object inspected.
        object: ObjectRef,
        /// Threshold speed.
        value: Fixed,
    },
    /// Compares an object's target.
    Target {
        /// Operator.
        op: EqOp,
        /// Object inspected.
        object: ObjectRef,
        /// Expected target.
        target: ObjectRef,
    },
    /// Compares elapsed game time in ticks.
    Time {
        /// Operator.
        op: CompareOp,
        /// Threshold in ticks.
        ticks: i64,
    },
    /// Compares the zoom level.
    Zoom {
        /// Operator.
        op: CompareOp,
        /// Threshold level.
        value: i32,
    },
}

/// A trigger and the actions it runs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Predicate.
    pub when: When,
    /// Keeps firing every check while the predicate holds.
    pub persistent: bool,
    /// Armed at level start.
    pub initially_enabled: bool,
    /// Subject of the actions.
    pub subject: Option<ObjectRef>,
    /// Direct object of the actions.
    pub direct: Option<ObjectRef>,
    /// Actions run on firing.
    pub actions: ActionRange,
}

impl Condition {
    /// Creates an armed one-shot condition.
    #[must_use]
    pub const fn new(when: When, actions: ActionRange) -> Self {
        Self {
            when,
            persistent: false,
            initially_enabled: true,
            subject: None,
            direct: None,
            actions,
        }
    }

    /// Makes the condition fire on every check.
    #[must_use]
    pub const fn persistent(mut self) -> Self {
        self.persistent = true;
        self
    }

    /// Starts the condition disarmed.
    #[must_use]
    pub const fn disarmed(mut self) -> Self {
        self.initially_enabled = false;
        self
    }

    /// Sets the subject and direct object of the actions.
    #[must_use]
    pub const fn with_objects(mut self, subject: Option<ObjectRef>, direct: Option<ObjectRef>) -> Self {
        self.subject = subject;
        self.direct = direct;
        self
    }
}
