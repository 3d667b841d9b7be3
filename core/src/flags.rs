//! Bit-flag sets carried by templates and live objects.

use std::ops::{BitAnd, BitOr, BitOrAssign, Not};

use serde::{Deserialize, Serialize};

macro_rules! flag_set {
    (
        $(#[$meta:meta])*
        $name:ident {
            $(
                $(#[$flag_meta:meta])*
                $flag:ident = $value:expr;
            )*
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(u32);

        impl $name {
            $(
                $(#[$flag_meta])*
                pub const $flag: Self = Self($value);
            )*

            /// The empty set.
            pub const NONE: Self = Self(0);

            /// Wraps raw bits.
            #[must_use]
            pub const fn from_bits(bits: u32) -> Self {
                Self(bits)
            }

            /// Raw bits.
            #[must_use]
            pub const fn bits(self) -> u32 {
                self.0
            }

            /// Reports whether every bit of `other` is set.
            #[must_use]
            pub const fn contains(self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }

            /// Reports whether any bit of `other` is set.
            #[must_use]
            pub const fn intersects(self, other: Self) -> bool {
                self.0 & other.0 != 0
            }

            /// Reports whether no bit is set.
            #[must_use]
            pub const fn is_empty(self) -> bool {
                self.0 == 0
            }

            /// Sets every bit of `other`.
            pub fn insert(&mut self, other: Self) {
                self.0 |= other.0;
            }

            /// Clears every bit of `other`.
            pub fn remove(&mut self, other: Self) {
                self.0 &= !other.0;
            }

            /// Sets or clears the bits of `other`.
            pub fn set(&mut self, other: Self, enabled: bool) {
                if enabled {
                    self.insert(other);
                } else {
                    self.remove(other);
                }
            }
        }

        impl BitOr for $name {
            type Output = Self;

            fn bitor(self, rhs: Self) -> Self {
                Self(self.0 | rhs.0)
            }
        }

        impl BitOrAssign for $name {
            fn bitor_assign(&mut self, rhs: Self) {
                self.0 |= rhs.0;
            }
        }

        impl BitAnd for $name {
            type Output = Self;

            fn bitand(self, rhs: Self) -> Self {
                Self(self.0 & rhs.0)
            }
        }

        impl Not for $name {
            type Output = Self;

            fn not(self) -> Self {
                Self(!self.0)
            }
        }
    };
}

flag_set! {
    /// Behavioural attributes of templates and objects.
    Attributes {
        /// Rotation velocity applies.
        CAN_TURN = 0x0000_0001;
        /// Worth going after.
        CAN_BE_ENGAGED = 0x0000_0002;
        /// Turns toward a direction goal instead of spinning freely.
        HAS_DIRECTION_GOAL = 0x0000_0004;
        /// Controlled by a remote peer.
        IS_REMOTE = 0x0000_0008;
        /// Controlled by a human.
        IS_HUMAN_CONTROLLED = 0x0000_0010;
        /// A vector shot without a sprite.
        IS_BEAM = 0x0000_0020;
        /// Bounces off the edge of the universe.
        DOES_BOUNCE = 0x0000_0040;
        /// Cycles through animation frames.
        IS_SELF_ANIMATED = 0x0000_0080;
        /// Shape follows heading.
        SHAPE_FROM_DIRECTION = 0x0000_0100;
        /// The ship a player flies.
        IS_PLAYER_SHIP = 0x0000_0200;
        /// Selectable as somewhere to go.
        CAN_BE_DESTINATION = 0x0000_0400;
        /// Can go into engage mode.
        CAN_ENGAGE = 0x0000_0800;
        /// Can go into evade mode.
        CAN_EVADE = 0x0000_1000;
        /// Accepts messages from a player.
        CAN_ACCEPT_MESSAGES = 0x0000_2000;
        /// Accepts build orders.
        CAN_ACCEPT_BUILD = 0x0000_4000;
        /// Accepts destination orders.
        CAN_ACCEPT_DESTINATION = 0x0000_8000;
        /// Products are born facing the creator's target.
        AUTO_TARGET = 0x0001_0000;
        /// Repeating animation.
        ANIMATION_CYCLE = 0x0002_0000;
        /// Can hit other objects.
        CAN_COLLIDE = 0x0004_0000;
        /// Can be hit by other objects.
        CAN_BE_HIT = 0x0008_0000;
        /// A point of interest ships can be sent to.
        IS_DESTINATION = 0x0010_0000;
        /// Hides nearby objects.
        HIDE_EFFECT = 0x0020_0000;
        /// Releases remaining energy on destruction.
        RELEASE_ENERGY_ON_DEATH = 0x0040_0000;
        /// Shot on sight by non-owners.
        HATED = 0x0080_0000;
        /// Cannot share space with another such object.
        OCCUPIES_SPACE = 0x0100_0000;
        /// Destination cannot be altered.
        STATIC_DESTINATION = 0x0200_0000;
        /// Can be veered away from.
        CAN_BE_EVADED = 0x0400_0000;
        /// Becomes neutral instead of dying.
        NEUTRAL_DEATH = 0x0800_0000;
        /// Guided munition that does not accept orders.
        IS_GUIDED = 0x1000_0000;
        /// Shows up on radar.
        APPEAR_ON_RADAR = 0x2000_0000;
        /// Human ship temporarily flown by the computer.
        ON_AUTO_PILOT = 0x8000_0000;

        /// Thinks for itself.
        CAN_THINK = 0x0000_1800 | 0x0000_8000;
        /// Participates in locality bookkeeping.
        CONSIDER_DISTANCE = 0x0000_1800 | 0x0000_8000 | 0x0000_0400;
        /// Flown remotely or by a human.
        REMOTE_OR_HUMAN = 0x0000_0200;
    }
}

flag_set! {
    /// Per-object flags that change during play.
    RuntimeFlags {
        /// Reached its destination.
        HAS_ARRIVED = 0x01;
        /// A foe has locked on.
        TARGET_LOCKED = 0x02;
        /// Near a naturally shielding object.
        IS_CLOAKED = 0x04;
        /// Explicitly hidden.
        IS_HIDDEN = 0x08;
        /// Currently somebody's target.
        IS_TARGET = 0x10;
    }
}

flag_set! {
    /// Target preferences used by the admiral AI.
    OrderFlags {
        /// Prefer targets weaker than the ship.
        STRONGER_THAN_TARGET = 0x0000_0001;
        /// Prefer destinations.
        TARGET_IS_BASE = 0x0000_0002;
        /// Prefer non-destinations.
        TARGET_IS_NOT_BASE = 0x0000_0004;
        /// Prefer nearby targets.
        TARGET_IS_LOCAL = 0x0000_0008;
        /// Prefer distant targets.
        TARGET_IS_REMOTE = 0x0000_0010;
        /// Escort only non-destinations.
        ONLY_ESCORT_NOT_BASE = 0x0000_0020;
        /// Prefer friendly targets.
        TARGET_IS_FRIEND = 0x0000_0040;
        /// Prefer hostile targets.
        TARGET_IS_FOE = 0x0000_0080;
        /// Only targets with a matching key tag on friends.
        HARD_MATCHING_FRIEND = 0x0004_0000;
        /// Only targets with a matching key tag.
        HARD_MATCHING_FOE = 0x0008_0000;
        /// Only friendly escort duties.
        HARD_FRIENDLY_ESCORT_ONLY = 0x0010_0000;
        /// Never escort friends.
        HARD_NO_FRIENDLY_ESCORT = 0x0020_0000;
        /// Only distant targets.
        HARD_TARGET_IS_REMOTE = 0x0040_0000;
        /// Only nearby targets.
        HARD_TARGET_IS_LOCAL = 0x0080_0000;
        /// Only hostile targets.
        HARD_TARGET_IS_FOE = 0x0100_0000;
        /// Only friendly targets.
        HARD_TARGET_IS_FRIEND = 0x0200_0000;
        /// Only non-destinations.
        HARD_TARGET_IS_NOT_BASE = 0x0400_0000;
        /// Only destinations.
        HARD_TARGET_IS_BASE = 0x0800_0000;
    }
}

flag_set! {
    /// Conditions under which an admiral builds a class.
    BuildFlags {
        /// Skip when some owned object of the class lacks escorts.
        SUFFICIENT_ESCORTS_EXIST = 0x0000_0002;
        /// Skip unless a foe carries the class's order key tag.
        MATCHING_FOE_EXISTS = 0x0000_0080;
        /// Only engaged by matching engage key tags.
        ONLY_ENGAGED_BY = 0x0040_0000;
        /// Only engages matching engage key tags.
        CAN_ONLY_ENGAGE = 0x0080_0000;
    }
}

flag_set! {
    /// Control keys held by an admiral's pilot.
    Keys {
        /// Thrust.
        UP = 0x0001;
        /// Brake.
        DOWN = 0x0002;
        /// Rotate counter-clockwise.
        LEFT = 0x0004;
        /// Rotate clockwise.
        RIGHT = 0x0008;
        /// Fire the pulse weapon.
        PULSE = 0x0010;
        /// Fire the beam weapon.
        BEAM = 0x0020;
        /// Fire the special weapon.
        SPECIAL = 0x0040;
        /// Engage warp.
        WARP = 0x0080;
    }
}

/// Four-bit key tag packed into the top of a flag word.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyTag(u8);

impl KeyTag {
    /// Wraps a tag value; only the low four bits are kept.
    #[must_use]
    pub const fn new(tag: u8) -> Self {
        Self(tag & 0x0f)
    }

    /// Tag value.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Reports whether the tag is unset.
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}
