#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Flotilla simulation.
//!
//! This crate defines the vocabulary that connects adapters, the
//! authoritative world and the per-tick systems. Scenario data is described
//! by [`Level`] values made of immutable [`BaseObject`] templates, [`Action`]
//! lists and [`Condition`] triggers. Adapters submit [`Command`] values that
//! the world applies, and every observable side effect is broadcast as an
//! [`Event`] for audio, visual and message consumers.
//!
//! All arithmetic is deterministic: positions use wrapping integer
//! coordinates, speeds use [`Fixed`] 16.16 numbers and every random draw
//! comes from a seeded [`RandomSource`].

mod action;
mod condition;
mod fixed;
mod flags;
mod geometry;
mod handle;
mod level;
mod random;
pub mod rotation;
mod template;

use serde::{Deserialize, Serialize};

pub use action::{
    Action, ActionFilter, ActionRange, Alter, AlterKind, CreateObject, DieKind, OwnerFilter, Verb,
    ACTION_RECORD_BYTES,
};
pub use condition::{CompareOp, Condition, Counter, EqOp, ObjectRef, When};
pub use fixed::Fixed;
pub use flags::{Attributes, BuildFlags, KeyTag, Keys, OrderFlags, RuntimeFlags};
pub use geometry::{
    Coord, FixedPoint, Point, Rect, MAXIMUM_RELEVANT_DISTANCE, MAXIMUM_RELEVANT_DISTANCE_SQUARED,
    THINKIVERSE_HALF_EXTENT, UNIVERSAL_CENTER,
};
pub use handle::{Handle, ObjectId, ObjectTag};
pub use level::{
    AdmiralKind, AdmiralSetup, InitialId, InitialObject, Level, LevelBuilder, FORMAT_VERSION,
    MAX_CAN_BUILD,
};
pub use random::{Random, RandomSource, GLOBAL_SEED};
pub use template::{
    ActionLists, BaseId, BaseObject, WeaponSlot, WeaponStats, BASE_OBJECT_RECORD_BYTES,
    ENERGY_POD_AMOUNT,
};

/// Maximum number of admirals in a level.
pub const MAX_ADMIRALS: usize = 4;

/// Number of score slots each admiral keeps.
pub const ADMIRAL_SCORE_SLOTS: usize = 3;

/// Identifies an admiral (faction).
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct AdmiralId(u8);

impl AdmiralId {
    /// Creates an admiral identifier.
    #[must_use]
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    /// Table index.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Table index as `usize`.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Role a ship derives from its current destination.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Duty {
    /// No particular role.
    #[default]
    NoDuty,
    /// Escorting a friendly non-destination.
    Escort,
    /// Guarding a friendly destination that lacks escorts.
    Guard,
    /// Attacking a hostile object.
    Assault,
    /// Defending a hostile base; never reassigned by the AI.
    HostileBase,
}

/// Commands that express all permissible input-driven world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Replaces the keys an admiral's pilot is holding.
    SetKeys {
        /// Admiral whose keys changed.
        admiral: AdmiralId,
        /// Keys currently held.
        keys: Keys,
    },
    /// Selects the object an admiral is controlling.
    SetControl {
        /// Admiral issuing the selection.
        admiral: AdmiralId,
        /// Object to control, or the sentinel to clear.
        object: ObjectId,
    },
    /// Selects the object an admiral is targeting.
    SetTarget {
        /// Admiral issuing the selection.
        admiral: AdmiralId,
        /// Object to target, or the sentinel to clear.
        object: ObjectId,
    },
    /// Orders the controlled object toward the selected target.
    OrderControl {
        /// Admiral issuing the order.
        admiral: AdmiralId,
    },
    /// Starts building a class at a destination.
    Build {
        /// Admiral paying for the build.
        admiral: AdmiralId,
        /// Destination object doing the building.
        destination: ObjectId,
        /// Class to build.
        base: BaseId,
    },
    /// Hands the admiral's flagship to or from the computer pilot.
    SetAutopilot {
        /// Admiral whose flagship changes.
        admiral: AdmiralId,
        /// Whether the computer flies it.
        enabled: bool,
    },
}

/// Events broadcast by the world and systems while advancing the simulation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Indicates that a major tick completed.
    TimeAdvanced {
        /// Elapsed game time in minor ticks.
        time: i64,
    },
    /// Confirms that an object entered play.
    ObjectCreated {
        /// New object.
        object: ObjectId,
        /// Its template.
        base: BaseId,
        /// Its owner.
        owner: Option<AdmiralId>,
    },
    /// Reports that an object was destroyed.
    ObjectDestroyed {
        /// Destroyed object.
        object: ObjectId,
        /// Its template.
        base: BaseId,
        /// Owner at the time of destruction.
        owner: Option<AdmiralId>,
    },
    /// Reports that an object reached the end of its lifetime.
    ObjectExpired {
        /// Expired object.
        object: ObjectId,
    },
    /// Reports that an object's slot returned to the pool.
    ObjectFreed {
        /// Freed object; the handle is stale from now on.
        object: ObjectId,
    },
    /// Reports an ownership change.
    OwnerChanged {
        /// Object that changed hands.
        object: ObjectId,
        /// Previous owner.
        from: Option<AdmiralId>,
        /// New owner.
        to: Option<AdmiralId>,
    },
    /// Reports a new destination assignment.
    DestinationAssigned {
        /// Ordered object.
        object: ObjectId,
        /// Its new destination.
        destination: ObjectId,
        /// Duty derived from the assignment.
        duty: Duty,
    },
    /// Reports that an object reached its destination.
    Arrived {
        /// Arriving object.
        object: ObjectId,
        /// Destination reached.
        destination: ObjectId,
    },
    /// Reports a weapon discharge.
    WeaponFired {
        /// Firing object.
        object: ObjectId,
        /// Slot fired.
        slot: WeaponSlot,
    },
    /// Reports that a destination started building.
    BuildStarted {
        /// Paying admiral.
        admiral: AdmiralId,
        /// Destination building the class.
        destination: ObjectId,
        /// Class being built.
        base: BaseId,
    },
    /// Reports that a build finished.
    BuildCompleted {
        /// Owning admiral.
        admiral: AdmiralId,
        /// Newly built object.
        object: ObjectId,
        /// Its class.
        base: BaseId,
    },
    /// Requests sound playback.
    SoundRequested {
        /// Sound id.
        id: i32,
        /// Playback volume.
        volume: i32,
        /// Playback priority.
        priority: u8,
        /// Ticks the sound persists.
        persistence: i32,
        /// Object the sound is attached to when distance-attenuated.
        source: Option<ObjectId>,
    },
    /// Requests a spark burst.
    SparksRequested {
        /// Burst centre.
        at: Coord,
        /// Number of sparks.
        count: i32,
        /// Spark speed.
        speed: i32,
        /// Random velocity spread.
        velocity_range: Fixed,
        /// Palette colour.
        color: u8,
    },
    /// Requests a full-screen flash.
    ColorFlash {
        /// Flash length.
        length: i32,
        /// Palette colour.
        color: u8,
        /// Brightness.
        shade: u8,
    },
    /// Reports a status line.
    Message {
        /// Text shown to the player.
        text: String,
    },
    /// Reports that a long message started.
    MessageStarted {
        /// Message resource.
        resource: i32,
        /// Number of pages.
        pages: i32,
    },
    /// Reports a score change.
    ScoreChanged {
        /// Admiral whose score changed.
        admiral: AdmiralId,
        /// Score slot.
        which: usize,
        /// New value.
        score: i32,
    },
    /// Reports that a winner was declared.
    WinnerDeclared {
        /// Winner, if any.
        winner: Option<AdmiralId>,
        /// Follow-up level.
        next_level: Option<i32>,
        /// Debriefing text.
        text: i32,
    },
    /// Reports the new set of disabled player keys.
    KeyMaskChanged {
        /// Keys that are currently disabled.
        disabled: Keys,
    },
    /// Reports a zoom change.
    ZoomChanged {
        /// New zoom level.
        level: i32,
    },
    /// Reports a mini-computer selection.
    ComputerSelected {
        /// Screen.
        screen: i32,
        /// Line.
        line: i32,
    },
    /// Reports that an object began landing.
    LandingStarted {
        /// Landing object.
        object: ObjectId,
    },
    /// Reports that an object entered warp.
    WarpEntered {
        /// Warping object.
        object: ObjectId,
    },
    /// Reports that a condition fired.
    ConditionFired {
        /// Index of the condition in the level.
        index: usize,
    },
    /// Reports that the game ended.
    GameOver {
        /// Winner, if any.
        winner: Option<AdmiralId>,
    },
}
