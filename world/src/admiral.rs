//! Per-faction state: economy, build table, AI cursors and scores.

use flotilla_core::{
    AdmiralKind, AdmiralSetup, BaseId, Fixed, Keys, ObjectId, ADMIRAL_SCORE_SLOTS,
};

use crate::DestinationId;

/// Ticks of the first blitzkrieg phase.
pub const INITIAL_BLITZKRIEG: i32 = 1200;

/// One weighted entry of an admiral's build table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BuildChance {
    /// Class that may be built.
    pub base: BaseId,
    /// Lower bound of the class's slice of `0..total_build_chance`.
    pub chance_range: Fixed,
}

/// A faction.
#[derive(Clone, Debug)]
pub struct Admiral {
    /// Display name.
    pub name: String,
    /// Who issues its orders.
    pub kind: AdmiralKind,
    /// Spendable cash.
    pub cash: Fixed,
    /// Cash the admiral is saving up for.
    pub save_goal: Fixed,
    /// Multiplier applied to income.
    pub earning_power: Fixed,
    /// Weighted table of buildable classes.
    pub build_table: Vec<BuildChance>,
    /// Sum of the build ratios in the table.
    pub total_build_chance: Fixed,
    /// Class chosen but not yet affordable.
    pub hope_to_build: Option<BaseId>,
    /// Destination the admiral builds at.
    pub build_at: Option<DestinationId>,
    /// Ship currently being reconsidered by the AI.
    pub consider_ship: ObjectId,
    /// Candidate destination the AI scores next.
    pub destination_cursor: ObjectId,
    /// Counts toward the next attack or defence phase.
    pub blitzkrieg: i32,
    /// Offense of ships free to escort during the current pass.
    pub this_free_escort_strength: Fixed,
    /// Offense of ships free to escort during the last full pass.
    pub last_free_escort_strength: Fixed,
    /// Enemy ships destroyed.
    pub kills: i32,
    /// Own ships lost.
    pub losses: i32,
    /// Thinking ships owned at the last pilot pass.
    pub ships_left: i32,
    /// Scenario counters.
    pub scores: [i32; ADMIRAL_SCORE_SLOTS],
    /// Ship the admiral flies.
    pub flagship: ObjectId,
    /// Object selected for orders.
    pub control: ObjectId,
    /// Object selected as target.
    pub target: ObjectId,
    /// Keys the pilot is holding.
    pub keys: Keys,
    /// The computer flies the flagship.
    pub autopilot: bool,
}

impl Admiral {
    /// Creates an admiral from its level setup.
    #[must_use]
    pub fn from_setup(setup: &AdmiralSetup) -> Self {
        Self {
            name: setup.name.clone(),
            kind: setup.kind,
            cash: setup.cash,
            save_goal: Fixed::ZERO,
            earning_power: setup.earning_power,
            build_table: Vec::new(),
            total_build_chance: Fixed::ZERO,
            hope_to_build: None,
            build_at: None,
            consider_ship: ObjectId::none(),
            destination_cursor: ObjectId::none(),
            blitzkrieg: INITIAL_BLITZKRIEG,
            this_free_escort_strength: Fixed::ZERO,
            last_free_escort_strength: Fixed::ZERO,
            kills: 0,
            losses: 0,
            ships_left: 0,
            scores: [0; ADMIRAL_SCORE_SLOTS],
            flagship: ObjectId::none(),
            control: ObjectId::none(),
            target: ObjectId::none(),
            keys: Keys::NONE,
            autopilot: false,
        }
    }

    /// Reports whether the built-in AI drives the admiral.
    #[must_use]
    pub fn is_computer(&self) -> bool {
        self.kind == AdmiralKind::Computer
    }

    /// Adds income scaled by the earning power.
    pub fn pay(&mut self, amount: Fixed) {
        self.cash += amount.mul(self.earning_power);
    }

    /// Adds or removes cash directly, never going below zero.
    pub fn pay_absolute(&mut self, amount: Fixed) {
        self.cash += amount;
        if self.cash < Fixed::ZERO {
            self.cash = Fixed::ZERO;
        }
    }

    /// Adds to a score slot, returning the new value.
    pub fn alter_score(&mut self, which: usize, amount: i32) -> Option<i32> {
        let score = self.scores.get_mut(which)?;
        *score = score.saturating_add(amount);
        Some(*score)
    }

    /// Reports whether the table already offers a class.
    #[must_use]
    pub fn can_build(&self, base: BaseId) -> bool {
        self.build_table.iter().any(|entry| entry.base == base)
    }

    /// Picks the class whose slice contains `value`.
    #[must_use]
    pub fn build_choice(&self, value: Fixed) -> Option<BaseId> {
        self.build_table
            .iter()
            .filter(|entry| entry.chance_range <= value)
            .max_by_key(|entry| entry.chance_range)
            .map(|entry| entry.base)
    }
}
