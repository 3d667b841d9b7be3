use flotilla_core::{AdmiralId, BaseId, InitialId};
use thiserror::Error;

/// Problems found while turning a [`flotilla_core::Level`] into a world.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LevelError {
    /// The level was authored against another format.
    #[error("level format version {found} is not supported (expected {expected})")]
    FormatVersion {
        /// Version found in the level.
        found: u32,
        /// Version this build understands.
        expected: u32,
    },
    /// A template reference points past the template table.
    #[error("unknown template {0:?}")]
    UnknownTemplate(BaseId),
    /// An admiral reference points past the admiral table.
    #[error("unknown admiral {0:?}")]
    UnknownAdmiral(AdmiralId),
    /// An initial object reference points past the initial object table.
    #[error("unknown initial object {0:?}")]
    UnknownInitial(InitialId),
    /// A condition reference points past the condition table.
    #[error("unknown condition {0}")]
    UnknownCondition(usize),
    /// An action range points past the action table.
    #[error("action range {start}..{end} exceeds the {len} actions of the level")]
    ActionRange {
        /// First action.
        start: usize,
        /// One past the last action.
        end: usize,
        /// Actions in the level.
        len: usize,
    },
    /// The level places more admirals than the world supports.
    #[error("{0} admirals exceed the supported maximum")]
    TooManyAdmirals(usize),
    /// The level places more objects than the pool holds.
    #[error("{count} initial objects exceed the object capacity of {capacity}")]
    TooManyInitialObjects {
        /// Objects placed.
        count: usize,
        /// Pool capacity.
        capacity: usize,
    },
    /// The level needs more destination records than are available.
    #[error("{count} destinations exceed the destination capacity of {capacity}")]
    TooManyDestinations {
        /// Destinations placed.
        count: usize,
        /// Record capacity.
        capacity: usize,
    },
    /// A destination offers more classes than a record holds.
    #[error("initial object {initial:?} can build {count} classes")]
    TooManyBuildClasses {
        /// Offending initial object.
        initial: InitialId,
        /// Classes offered.
        count: usize,
    },
    /// The level's build offers do not fit an admiral's build table.
    #[error(transparent)]
    Invariant(#[from] InvariantError),
}

/// Broken bookkeeping that makes the session meaningless.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvariantError {
    /// An admiral's build table outgrew its fixed capacity.
    #[error("admiral {admiral:?} build table exceeds {capacity} classes")]
    TooManyBuildTypes {
        /// Admiral whose table overflowed.
        admiral: AdmiralId,
        /// Table capacity.
        capacity: usize,
    },
}
