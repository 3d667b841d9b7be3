//! Data-driven effects executed by the verb interpreter.

use serde::{Deserialize, Serialize};

use crate::{AdmiralId, Attributes, BaseId, Fixed, InitialId, KeyTag, Keys};

/// Size in bytes of one record in the legacy scenario format.
pub const ACTION_RECORD_BYTES: usize = 48;

/// Contiguous run of actions inside the level's action table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionRange {
    start: u32,
    len: u32,
}

impl ActionRange {
    /// The empty list.
    pub const EMPTY: Self = Self { start: 0, len: 0 };

    /// Creates a range covering `len` actions from `start`.
    #[must_use]
    pub const fn new(start: u32, len: u32) -> Self {
        Self { start, len }
    }

    /// Index of the first action.
    #[must_use]
    pub const fn start(&self) -> u32 {
        self.start
    }

    /// Number of actions covered.
    #[must_use]
    pub const fn len(&self) -> u32 {
        self.len
    }

    /// Reports whether the range covers nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The range with its first `count` actions removed.
    #[must_use]
    pub const fn skip(&self, count: u32) -> Self {
        let count = if count > self.len { self.len } else { count };
        Self {
            start: self.start + count,
            len: self.len - count,
        }
    }

    /// Iterates the action indices covered by the range.
    pub fn indices(&self) -> impl Iterator<Item = usize> {
        let start = self.start as usize;
        start..start + self.len as usize
    }
}

/// Owner relationship required between subject and direct object.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OwnerFilter {
    /// Fires regardless of ownership.
    #[default]
    Any,
    /// Fires only when both share an owner.
    Same,
    /// Fires only when the owners differ.
    Different,
    /// Never fires; produced by out-of-range legacy values.
    Never,
}

impl OwnerFilter {
    /// Decodes the legacy `0 / 1 / -1` encoding.
    #[must_use]
    pub const fn from_legacy(value: i16) -> Self {
        match value {
            0 => Self::Any,
            1 => Self::Same,
            -1 => Self::Different,
            _ => Self::Never,
        }
    }
}

/// Attribute test applied to the direct object before an action fires.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionFilter {
    /// No test.
    #[default]
    None,
    /// Requires every inclusive bit and none of the exclusive bits.
    Attributes {
        /// Bits the direct object must carry.
        inclusive: Attributes,
        /// Bits the direct object must not carry.
        exclusive: Attributes,
    },
    /// Requires the direct object's template to carry the level key tag.
    LevelKeyTag(KeyTag),
}

impl ActionFilter {
    /// Decodes the legacy pair of filter words.
    ///
    /// An exclusive word of all ones selects key-tag matching.
    #[must_use]
    pub const fn from_legacy(inclusive: u32, exclusive: u32, level_key_tag: KeyTag) -> Self {
        if exclusive == u32::MAX {
            Self::LevelKeyTag(level_key_tag)
        } else if inclusive == 0 && exclusive == 0 {
            Self::None
        } else {
            Self::Attributes {
                inclusive: Attributes::from_bits(inclusive),
                exclusive: Attributes::from_bits(exclusive),
            }
        }
    }

    /// Reports whether the filter imposes any requirement.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// One effect together with its applicability header.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// What happens.
    pub verb: Verb,
    /// Applies to the subject instead of the direct object.
    pub reflexive: bool,
    /// Test applied to the direct object.
    pub filter: ActionFilter,
    /// Ownership test between subject and direct object.
    pub owner: OwnerFilter,
    /// Ticks to wait before the rest of the list runs.
    pub delay: i32,
    /// Replaces the subject with an initial object.
    pub initial_subject_override: Option<InitialId>,
    /// Replaces the direct object with an initial object.
    pub initial_direct_override: Option<InitialId>,
}

impl Action {
    /// Creates an unfiltered, immediate action.
    #[must_use]
    pub const fn new(verb: Verb) -> Self {
        Self {
            verb,
            reflexive: false,
            filter: ActionFilter::None,
            owner: OwnerFilter::Any,
            delay: 0,
            initial_subject_override: None,
            initial_direct_override: None,
        }
    }

    /// Marks the action as applying to its subject.
    #[must_use]
    pub const fn reflexive(mut self) -> Self {
        self.reflexive = true;
        self
    }

    /// Applies a direct-object filter.
    #[must_use]
    pub const fn with_filter(mut self, filter: ActionFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Applies an ownership filter.
    #[must_use]
    pub const fn with_owner(mut self, owner: OwnerFilter) -> Self {
        self.owner = owner;
        self
    }

    /// Delays the action and the rest of its list.
    #[must_use]
    pub const fn with_delay(mut self, delay: i32) -> Self {
        self.delay = delay;
        self
    }

    /// Overrides the subject with an initial object.
    #[must_use]
    pub const fn with_subject_override(mut self, initial: InitialId) -> Self {
        self.initial_subject_override = Some(initial);
        self
    }

    /// Overrides the direct object with an initial object.
    #[must_use]
    pub const fn with_direct_override(mut self, initial: InitialId) -> Self {
        self.initial_direct_override = Some(initial);
        self
    }
}

/// Parameters shared by both object-creating verbs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateObject {
    /// Template of the products.
    pub base: BaseId,
    /// Minimum number of products.
    pub how_many_minimum: i32,
    /// Random extra products.
    pub how_many_range: i32,
    /// Inherit the focus's velocity.
    pub velocity_relative: bool,
    /// Inherit the focus's heading.
    pub direction_relative: bool,
    /// Scatter radius around the creation point.
    pub random_distance: i32,
}

impl CreateObject {
    /// Creates exactly `count` products at the focus with no inheritance.
    #[must_use]
    pub const fn new(base: BaseId, count: i32) -> Self {
        Self {
            base,
            how_many_minimum: count,
            how_many_range: 0,
            velocity_relative: false,
            direction_relative: false,
            random_distance: 0,
        }
    }
}

/// Parameters of an alteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alter {
    /// Property being altered.
    pub kind: AlterKind,
    /// Adds to the current value instead of replacing it.
    pub relative: bool,
    /// Base amount.
    pub minimum: i32,
    /// Random extra amount.
    pub range: i32,
}

impl Alter {
    /// Creates an absolute alteration without randomness.
    #[must_use]
    pub const fn set(kind: AlterKind, minimum: i32) -> Self {
        Self {
            kind,
            relative: false,
            minimum,
            range: 0,
        }
    }

    /// Creates a relative alteration without randomness.
    #[must_use]
    pub const fn adjust(kind: AlterKind, minimum: i32) -> Self {
        Self {
            kind,
            relative: true,
            minimum,
            range: 0,
        }
    }

    /// Sets the random extra amount.
    #[must_use]
    pub const fn with_range(mut self, range: i32) -> Self {
        self.range = range;
        self
    }
}

/// Property altered by [`Verb::Alter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlterKind {
    /// Health, through the damage path.
    Damage,
    /// Velocity push, brake or burst.
    Velocity,
    /// Current thrust.
    Thrust,
    /// Thrust ceiling.
    MaxThrust,
    /// Velocity ceiling; negative restores the template value.
    MaxVelocity,
    /// Turn rate ceiling.
    MaxTurnRate,
    /// Scatter around the subject or direct object.
    Location,
    /// Display scale.
    Scale,
    /// Pulse weapon template.
    Weapon1,
    /// Beam weapon template.
    Weapon2,
    /// Special weapon template.
    Special,
    /// Energy.
    Energy,
    /// Owning admiral.
    Owner,
    /// Unhides a run of initial objects.
    Hidden,
    /// Cloaking.
    Cloak,
    /// Temporarily disables the object.
    Offline,
    /// Free rotation.
    Spin,
    /// Template swap.
    BaseType,
    /// Enables or disables a run of conditions.
    ConditionTrueYet,
    /// Capture progress on a neutral-death destination.
    Occupation,
    /// Admiral cash.
    AbsoluteCash,
    /// Remaining lifetime.
    Age,
    /// Attribute bits.
    Attributes,
    /// Level key tag.
    LevelKeyTag,
    /// Order key tag.
    OrderKeyTag,
    /// Engage key tag.
    EngageKeyTag,
    /// Location relative to the universal centre.
    AbsoluteLocation,
}

/// How [`Verb::Die`] removes objects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DieKind {
    /// Frees the focus without running any list.
    None,
    /// Expires the subject, running its expire list.
    Expire,
    /// Destroys the subject, running its destroy list.
    Destroy,
}

/// The effect an action performs.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Verb {
    /// Terminates the list.
    NoAction,
    /// Creates products at the focus.
    CreateObject(CreateObject),
    /// Creates products that inherit the focus's destination.
    CreateObjectSetDest(CreateObject),
    /// Requests a sound.
    PlaySound {
        /// Playback priority.
        priority: u8,
        /// Ticks the sound persists.
        persistence: i32,
        /// Plays at full volume regardless of distance.
        absolute: bool,
        /// Volume.
        volume: i32,
        /// First sound id.
        id_minimum: i32,
        /// Random extra sound ids.
        id_range: i32,
    },
    /// Alters a property of the focus.
    Alter(Alter),
    /// Requests a spark burst.
    MakeSparks {
        /// Number of sparks.
        count: i32,
        /// Spark speed.
        speed: i32,
        /// Random velocity spread.
        velocity_range: Fixed,
        /// Palette colour.
        color: u8,
    },
    /// Releases a share of the focus's energy as pods.
    ReleaseEnergy {
        /// Share of current energy released.
        percent: Fixed,
    },
    /// Starts a landing on the subject.
    LandAt {
        /// Shrink rate per major tick.
        speed: i32,
    },
    /// Sends the subject into warp.
    EnterWarp {
        /// Warp velocity.
        speed: Fixed,
    },
    /// Shows a message.
    DisplayMessage {
        /// Message resource.
        resource: i32,
        /// Number of pages.
        pages: i32,
    },
    /// Changes an admiral's score.
    ChangeScore {
        /// Admiral, or the focus's owner when absent.
        admiral: Option<AdmiralId>,
        /// Score slot.
        which: usize,
        /// Amount added.
        amount: i32,
    },
    /// Ends the game.
    DeclareWinner {
        /// Winner, or the focus's owner when absent.
        admiral: Option<AdmiralId>,
        /// Follow-up level.
        next_level: Option<i32>,
        /// Debriefing text.
        text: i32,
    },
    /// Removes objects.
    Die(DieKind),
    /// Orders the subject to the focus.
    SetDestination,
    /// Fires the subject's special weapon.
    ActivateSpecial,
    /// Fires the subject's pulse weapon.
    ActivatePulse,
    /// Fires the subject's beam weapon.
    ActivateBeam,
    /// Requests a screen flash.
    ColorFlash {
        /// Flash length.
        length: i32,
        /// Palette colour.
        color: u8,
        /// Brightness.
        shade: u8,
    },
    /// Clears the focus's target.
    NilTarget,
    /// Disables player keys.
    DisableKeys(Keys),
    /// Re-enables player keys.
    EnableKeys(Keys),
    /// Changes the zoom level.
    SetZoom(i32),
    /// Selects a mini-computer line.
    ComputerSelect {
        /// Screen.
        screen: i32,
        /// Line.
        line: i32,
    },
    /// Rebinds an initial object slot to the focus.
    AssumeInitialObject(i32),
}

impl Verb {
    /// Numeric identifier used by the legacy format.
    #[must_use]
    pub const fn id(&self) -> u8 {
        match self {
            Self::NoAction => 0,
            Self::CreateObject(_) => 1,
            Self::PlaySound { .. } => 2,
            Self::Alter(_) => 3,
            Self::MakeSparks { .. } => 4,
            Self::ReleaseEnergy { .. } => 5,
            Self::LandAt { .. } => 6,
            Self::EnterWarp { .. } => 7,
            Self::DisplayMessage { .. } => 8,
            Self::ChangeScore { .. } => 9,
            Self::DeclareWinner { .. } => 10,
            Self::Die(_) => 11,
            Self::SetDestination => 12,
            Self::ActivateSpecial => 13,
            Self::ActivatePulse => 14,
            Self::ActivateBeam => 15,
            Self::ColorFlash { .. } => 16,
            Self::CreateObjectSetDest(_) => 17,
            Self::NilTarget => 18,
            Self::DisableKeys(_) => 19,
            Self::EnableKeys(_) => 20,
            Self::SetZoom(_) => 21,
            Self::ComputerSelect { .. } => 22,
            Self::AssumeInitialObject(_) => 23,
        }
    }
}
