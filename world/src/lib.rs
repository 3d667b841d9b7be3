#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state for the Flotilla simulation.
//!
//! The [`World`] owns the object pool, the admirals, the destination
//! records and the delayed action queue of a single level. Systems mutate it
//! through the methods defined here; adapters submit [`Command`] values via
//! [`apply`] and read [`query`] snapshots after each tick.

mod admiral;
mod arena;
mod destination;
mod error;
mod object;
mod queue;
mod validate;

use std::sync::Arc;

use flotilla_core::{
    AdmiralId, Attributes, BaseId, Command, Event, Fixed, InitialId, Keys, Level, ObjectId,
    ObjectTag, Random, RandomSource, GLOBAL_SEED,
};
use tracing::warn;

pub use admiral::{Admiral, BuildChance, INITIAL_BLITZKRIEG};
pub use arena::Arena;
pub use destination::{Destination, DestinationId};
pub use error::{InvariantError, LevelError};
pub use object::{
    Cell, Contribution, ObjectState, Presence, SpaceObject, SpawnRequest, WeaponState,
    BATTERY_RATIO, COLLISION_UNIT_SHIFT, DISTANCE_UNIT_SHIFT, ENGAGE_RANGE, TIME_TO_CHECK_HOME,
};
pub use queue::{ActionQueue, QueuedActions};

/// Object slots kept free of built ships for shots and debris.
pub const MAX_SHIP_BUFFER: usize = 40;

/// Status reported when a build is refused for lack of object slots.
pub const MAX_SHIPS_MESSAGE: &str = "Maximum number of ships built";

/// Sizes of the per-level pools and the seed of the global random stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    object_capacity: usize,
    destination_capacity: usize,
    queue_capacity: usize,
    seed: i32,
}

impl Config {
    /// Creates a configuration.
    #[must_use]
    pub const fn new(
        object_capacity: usize,
        destination_capacity: usize,
        queue_capacity: usize,
        seed: i32,
    ) -> Self {
        Self {
            object_capacity,
            destination_capacity,
            queue_capacity,
            seed,
        }
    }

    /// Replaces the global seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: i32) -> Self {
        self.seed = seed;
        self
    }

    /// Slots in the object pool.
    #[must_use]
    pub const fn object_capacity(&self) -> usize {
        self.object_capacity
    }

    /// Destination records available.
    #[must_use]
    pub const fn destination_capacity(&self) -> usize {
        self.destination_capacity
    }

    /// Entries the delayed action queue holds.
    #[must_use]
    pub const fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    /// Seed of the global random stream.
    #[must_use]
    pub const fn seed(&self) -> i32 {
        self.seed
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(250, 10, 120, GLOBAL_SEED)
    }
}

/// How the level ended.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Outcome {
    /// Winning admiral, if any.
    pub winner: Option<AdmiralId>,
    /// Level to play next.
    pub next_level: Option<i32>,
    /// Debriefing text resource.
    pub text: i32,
}

/// Represents the authoritative state of one running level.
#[derive(Debug)]
pub struct World {
    level: Arc<Level>,
    config: Config,
    objects: Arena<ObjectTag, SpaceObject>,
    admirals: Vec<Admiral>,
    destinations: Vec<Option<Destination>>,
    queue: ActionQueue,
    random: Box<dyn RandomSource>,
    conditions_enabled: Vec<bool>,
    initial_objects: Vec<ObjectId>,
    time: i64,
    zoom: i32,
    message: Option<(i32, i32)>,
    computer: Option<(i32, i32)>,
    disabled_keys: Keys,
    outcome: Option<Outcome>,
    recheck_conditions: bool,
}

impl World {
    /// Builds an empty world for a level, seeding the global stream from the configuration.
    pub fn from_level(level: Level, config: Config) -> Result<Self, LevelError> {
        Self::with_random_source(level, config, Box::new(Random::new(config.seed())))
    }

    /// Builds an empty world whose global stream is drawn from `random`.
    pub fn with_random_source(
        level: Level,
        config: Config,
        random: Box<dyn RandomSource>,
    ) -> Result<Self, LevelError> {
        validate::level(&level, &config)?;

        let admirals = level.admirals.iter().map(Admiral::from_setup).collect();
        let conditions_enabled = level
            .conditions
            .iter()
            .map(|condition| condition.initially_enabled)
            .collect();
        let initial_objects = vec![ObjectId::none(); level.initial_objects.len()];
        let destinations = (0..config.destination_capacity()).map(|_| None).collect();

        Ok(Self {
            objects: Arena::with_capacity(config.object_capacity()),
            queue: ActionQueue::with_capacity(config.queue_capacity()),
            level: Arc::new(level),
            config,
            admirals,
            destinations,
            random,
            conditions_enabled,
            initial_objects,
            time: 0,
            zoom: 0,
            message: None,
            computer: None,
            disabled_keys: Keys::NONE,
            outcome: None,
            recheck_conditions: false,
        })
    }

    /// Level being played.
    #[must_use]
    pub fn level(&self) -> &Level {
        &self.level
    }

    /// Shared handle to the level, for holding it while the world is mutated.
    #[must_use]
    pub fn level_arc(&self) -> Arc<Level> {
        Arc::clone(&self.level)
    }

    /// Configuration the world was built with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The object pool.
    #[must_use]
    pub fn objects(&self) -> &Arena<ObjectTag, SpaceObject> {
        &self.objects
    }

    /// Mutable object pool.
    pub fn objects_mut(&mut self) -> &mut Arena<ObjectTag, SpaceObject> {
        &mut self.objects
    }

    /// Live object named by a current handle.
    #[must_use]
    pub fn object(&self, id: ObjectId) -> Option<&SpaceObject> {
        self.objects.get(id)
    }

    /// Mutable live object named by a current handle.
    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut SpaceObject> {
        self.objects.get_mut(id)
    }

    /// Admirals in table order.
    #[must_use]
    pub fn admirals(&self) -> &[Admiral] {
        &self.admirals
    }

    /// Mutable admiral table.
    pub fn admirals_mut(&mut self) -> &mut [Admiral] {
        &mut self.admirals
    }

    /// Identifiers of every admiral in table order.
    pub fn admiral_ids(&self) -> impl Iterator<Item = AdmiralId> {
        (0..self.admirals.len()).filter_map(|index| u8::try_from(index).ok().map(AdmiralId::new))
    }

    /// Admiral by identifier.
    #[must_use]
    pub fn admiral(&self, id: AdmiralId) -> Option<&Admiral> {
        self.admirals.get(id.index())
    }

    /// Mutable admiral by identifier.
    pub fn admiral_mut(&mut self, id: AdmiralId) -> Option<&mut Admiral> {
        self.admirals.get_mut(id.index())
    }

    /// Delayed action queue.
    #[must_use]
    pub fn queue(&self) -> &ActionQueue {
        &self.queue
    }

    /// Mutable delayed action queue.
    pub fn queue_mut(&mut self) -> &mut ActionQueue {
        &mut self.queue
    }

    /// Global random stream.
    pub fn random_mut(&mut self) -> &mut dyn RandomSource {
        &mut *self.random
    }

    /// Elapsed game time in minor ticks.
    #[must_use]
    pub fn time(&self) -> i64 {
        self.time
    }

    /// Advances the game clock.
    pub fn advance_clock(&mut self, ticks: i64) {
        self.time = self.time.saturating_add(ticks);
    }

    /// Current zoom level.
    #[must_use]
    pub fn zoom(&self) -> i32 {
        self.zoom
    }

    /// Changes the zoom level.
    pub fn set_zoom(&mut self, zoom: i32) {
        self.zoom = zoom;
    }

    /// Message resource and page currently shown.
    #[must_use]
    pub fn message(&self) -> Option<(i32, i32)> {
        self.message
    }

    /// Starts showing a message at its first page.
    pub fn start_message(&mut self, resource: i32) {
        self.message = Some((resource, 0));
    }

    /// Mini-computer screen and line currently selected.
    #[must_use]
    pub fn computer(&self) -> Option<(i32, i32)> {
        self.computer
    }

    /// Selects a mini-computer screen and line.
    pub fn select_computer(&mut self, screen: i32, line: i32) {
        self.computer = Some((screen, line));
    }

    /// Player keys currently disabled by the scenario.
    #[must_use]
    pub fn disabled_keys(&self) -> Keys {
        self.disabled_keys
    }

    /// Replaces the disabled player keys.
    pub fn set_disabled_keys(&mut self, keys: Keys) {
        self.disabled_keys = keys;
    }

    /// Number of conditions in the level.
    #[must_use]
    pub fn condition_count(&self) -> usize {
        self.conditions_enabled.len()
    }

    /// Reports whether a condition is armed.
    #[must_use]
    pub fn condition_enabled(&self, index: usize) -> bool {
        self.conditions_enabled.get(index).copied().unwrap_or(false)
    }

    /// Arms or disarms a condition; out-of-range indices are ignored.
    pub fn set_condition_enabled(&mut self, index: usize, enabled: bool) {
        if let Some(slot) = self.conditions_enabled.get_mut(index) {
            *slot = enabled;
        }
    }

    /// Asks the condition evaluator to run again after the current phase.
    pub fn request_condition_recheck(&mut self) {
        self.recheck_conditions = true;
    }

    /// Consumes a pending condition recheck request.
    pub fn take_condition_recheck(&mut self) -> bool {
        std::mem::take(&mut self.recheck_conditions)
    }

    /// Object currently bound to an initial object slot.
    #[must_use]
    pub fn initial_object(&self, initial: InitialId) -> ObjectId {
        self.initial_objects
            .get(usize::from(initial.get()))
            .copied()
            .unwrap_or_default()
    }

    /// Binds an initial object slot to a live object.
    pub fn bind_initial(&mut self, initial: InitialId, object: ObjectId) {
        if let Some(slot) = self.initial_objects.get_mut(usize::from(initial.get())) {
            *slot = object;
        }
    }

    /// Result of the level once a winner was declared.
    #[must_use]
    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    /// Reports whether the level has ended.
    #[must_use]
    pub fn is_game_over(&self) -> bool {
        self.outcome.is_some()
    }

    /// Ends the level. The first declaration wins.
    pub fn declare_winner(&mut self, outcome: Outcome) {
        if self.outcome.is_none() {
            self.outcome = Some(outcome);
        }
    }

    /// Reports whether the pool leaves room for another built ship.
    #[must_use]
    pub fn has_room_for_ships(&self) -> bool {
        self.objects.len() < self.objects.capacity().saturating_sub(MAX_SHIP_BUFFER)
    }

    /// Places a new object in a free slot.
    ///
    /// The object's create list is not run. Returns `None` and logs a warning
    /// when the pool is full.
    pub fn spawn(&mut self, request: SpawnRequest, out_events: &mut Vec<Event>) -> Option<ObjectId> {
        let level = self.level_arc();
        let Some(template) = level.template(request.base) else {
            warn!(base = request.base.get(), "spawn requested for unknown template");
            return None;
        };
        let seed = self.random.next(32_766);
        let object = SpaceObject::from_template(&level, template, &request, seed);
        let Some(id) = self.objects.insert(object) else {
            warn!(
                base = request.base.get(),
                capacity = self.objects.capacity(),
                "object pool exhausted"
            );
            return None;
        };

        if template.attributes.contains(Attributes::IS_DESTINATION) {
            let name = request.name.unwrap_or_else(|| template.name.clone());
            if self
                .make_destination(id, request.can_build, request.earning, name)
                .is_none()
            {
                warn!(
                    object = ?id,
                    capacity = self.destinations.len(),
                    "destination records exhausted"
                );
            }
        }

        out_events.push(Event::ObjectCreated {
            object: id,
            base: request.base,
            owner: request.owner,
        });
        Some(id)
    }

    /// Marks an object for removal by the cleanup phase.
    pub fn mark_to_be_freed(&mut self, id: ObjectId) {
        if let Some(object) = self.objects.get_mut(id) {
            object.state = ObjectState::ToBeFreed;
        }
    }

    /// Returns every object marked for removal to the pool.
    ///
    /// Freed objects leave their destination's tallies and release any
    /// destination record they own.
    pub fn release_freed(&mut self, out_events: &mut Vec<Event>) {
        let mut freed = Vec::new();
        freed.extend(
            self.objects
                .alive()
                .filter(|(_, object)| object.state == ObjectState::ToBeFreed)
                .map(|(id, _)| id),
        );
        for id in freed {
            self.remove_object_from_destination(id);
            if let Some(record) = self.destination_of(id) {
                self.remove_destination(record);
            }
            let _ = self.objects.remove(id);
            out_events.push(Event::ObjectFreed { object: id });
        }
    }

    /// Turns an object into another class in place.
    pub fn change_base_type(&mut self, id: ObjectId, base: BaseId, relative: bool) {
        let level = self.level_arc();
        let Some(template) = level.template(base) else {
            return;
        };
        if let Some(object) = self.objects.get_mut(id) {
            object.rebase(&level, base, template, relative);
        }
    }

    /// Adds energy, clamping to the template maximum and charging the battery with any excess.
    pub fn alter_energy(&mut self, id: ObjectId, amount: i32) {
        let Some(object) = self.objects.get_mut(id) else {
            return;
        };
        let max = self
            .level
            .template(object.base)
            .map_or(0, |template| template.energy);
        object.energy = object.energy.saturating_add(amount);
        if object.energy < 0 {
            object.energy = 0;
        } else if object.energy > max {
            let excess = object.energy - max;
            object.energy = max;
            self.alter_battery(id, excess);
        }
    }

    fn alter_battery(&mut self, id: ObjectId, amount: i32) {
        let Some(object) = self.objects.get_mut(id) else {
            return;
        };
        let max = self
            .level
            .template(object.base)
            .map_or(0, |template| template.energy.saturating_mul(BATTERY_RATIO));
        object.battery = object.battery.saturating_add(amount);
        if object.battery > max {
            let excess = object.battery - max;
            object.battery = max;
            if let Some(admiral) = object.owner.and_then(|owner| self.admirals.get_mut(owner.index()))
            {
                admiral.pay(Fixed::from_int(excess));
            }
        }
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::SetKeys { admiral, keys } => {
            if let Some(state) = world.admiral_mut(admiral) {
                state.keys = keys;
            }
        }
        Command::SetControl { admiral, object } => world.set_admiral_control(admiral, object),
        Command::SetTarget { admiral, object } => world.set_admiral_target(admiral, object),
        Command::OrderControl { admiral } => {
            if let Some(control) = world.admiral_control(admiral) {
                world.set_object_destination(control, None, out_events);
            }
        }
        Command::Build {
            admiral,
            destination,
            base,
        } => {
            let owned = world
                .object(destination)
                .is_some_and(|object| object.owner == Some(admiral));
            let Some(record) = world.destination_of(destination).filter(|_| owned) else {
                return;
            };
            if world.has_room_for_ships() {
                let _ = world.schedule_build(admiral, record, base, out_events);
            } else {
                out_events.push(Event::Message {
                    text: MAX_SHIPS_MESSAGE.to_owned(),
                });
            }
        }
        Command::SetAutopilot { admiral, enabled } => {
            let Some(state) = world.admiral_mut(admiral) else {
                return;
            };
            state.autopilot = enabled;
            let flagship = state.flagship;
            if let Some(ship) = world.object_mut(flagship) {
                ship.attributes.set(Attributes::ON_AUTO_PILOT, enabled);
            }
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use flotilla_core::{
        AdmiralId, Attributes, BaseId, Coord, Duty, Fixed, ObjectId, RuntimeFlags,
        ADMIRAL_SCORE_SLOTS,
    };

    use super::{Outcome, SpaceObject, World};

    /// Immutable representation of a live object for renderers and tests.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct ObjectSnapshot {
        /// Handle of the object.
        pub id: ObjectId,
        /// Template.
        pub base: BaseId,
        /// Owner.
        pub owner: Option<AdmiralId>,
        /// Absolute location.
        pub location: Coord,
        /// Heading in degrees.
        pub direction: i32,
        /// Shape to draw out of the template's shapes.
        pub shape: u16,
        /// Owner tint index; zero is neutral.
        pub tint: u8,
        /// Display scale.
        pub scale: Fixed,
        /// Health as a fraction of the maximum.
        pub health: Fixed,
        /// Energy as a fraction of the maximum.
        pub energy: Fixed,
        /// Hidden from the player.
        pub hidden: bool,
    }

    /// Immutable representation of an admiral's standing.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct AdmiralSnapshot {
        /// Identifier.
        pub id: AdmiralId,
        /// Display name.
        pub name: String,
        /// Spendable cash.
        pub cash: Fixed,
        /// Enemy ships destroyed.
        pub kills: i32,
        /// Own ships lost.
        pub losses: i32,
        /// Ships still flying.
        pub ships_left: i32,
        /// Scenario counters.
        pub scores: [i32; ADMIRAL_SCORE_SLOTS],
    }

    /// Captures every in-use object in creation order.
    #[must_use]
    pub fn objects(world: &World) -> Vec<ObjectSnapshot> {
        world
            .objects
            .alive()
            .filter(|(_, object)| object.is_in_use())
            .map(|(id, object)| snapshot(world, id, object))
            .collect()
    }

    /// Captures a single live object.
    #[must_use]
    pub fn object(world: &World, id: ObjectId) -> Option<ObjectSnapshot> {
        world
            .objects
            .get(id)
            .map(|object| snapshot(world, id, object))
    }

    fn snapshot(world: &World, id: ObjectId, object: &SpaceObject) -> ObjectSnapshot {
        let shape_count = world
            .level
            .template(object.base)
            .map_or(1, |template| template.shape_count.max(1));
        let shape = if object.attributes.contains(Attributes::SHAPE_FROM_DIRECTION) {
            let index = object.direction.rem_euclid(360) * i32::from(shape_count) / 360;
            u16::try_from(index).unwrap_or(0) % shape_count
        } else {
            0
        };
        ObjectSnapshot {
            id,
            base: object.base,
            owner: object.owner,
            location: object.location,
            direction: object.direction,
            shape,
            tint: object.owner.map_or(0, |owner| owner.get() + 1),
            scale: object.scale,
            health: object.health_fraction(&world.level),
            energy: object.energy_fraction(&world.level),
            hidden: object.runtime.contains(RuntimeFlags::IS_HIDDEN),
        }
    }

    /// Captures every admiral in table order.
    #[must_use]
    pub fn admirals(world: &World) -> Vec<AdmiralSnapshot> {
        world
            .admiral_ids()
            .zip(world.admirals.iter())
            .map(|(id, admiral)| AdmiralSnapshot {
                id,
                name: admiral.name.clone(),
                cash: admiral.cash,
                kills: admiral.kills,
                losses: admiral.losses,
                ships_left: admiral.ships_left,
                scores: admiral.scores,
            })
            .collect()
    }

    /// Duty of a live object, re-derived from its destination's current escort strength.
    #[must_use]
    pub fn duty_for(world: &World, id: ObjectId) -> Option<Duty> {
        let ship = world.objects.get(id)?;
        let Some(dest) = world.objects.get(ship.dest) else {
            return Some(ship.duty);
        };
        if !matches!(ship.duty, Duty::Guard | Duty::Escort | Duty::NoDuty) || dest.owner != ship.owner
        {
            return Some(ship.duty);
        }
        let deficit = world
            .level
            .template(dest.base)
            .map_or(Fixed::ZERO, |template| template.friend_deficit);
        let duty = match (
            dest.escort_strength < deficit,
            dest.attributes.contains(Attributes::IS_DESTINATION),
        ) {
            (true, true) => Duty::Guard,
            (true, false) => Duty::Escort,
            (false, _) => Duty::NoDuty,
        };
        Some(duty)
    }

    /// Result of the level, once decided.
    #[must_use]
    pub fn outcome(world: &World) -> Option<&Outcome> {
        world.outcome.as_ref()
    }

    /// Elapsed game time in minor ticks.
    #[must_use]
    pub fn time(world: &World) -> i64 {
        world.time
    }
}
