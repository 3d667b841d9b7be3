//! Destination records, strength tallies and ownership changes.
//!
//! Every object that can be ordered to carries a [`Destination`] record.
//! Ships ordered to an object add their offense to its remote tallies; the
//! amount and side are remembered in the ship's [`Contribution`] so that
//! removal subtracts exactly what was added, even after either side changed
//! hands.

use flotilla_core::{
    AdmiralId, Attributes, BaseId, Duty, Event, Fixed, ObjectId, RuntimeFlags, MAX_ADMIRALS,
    MAX_CAN_BUILD,
};
use tracing::{debug, info};

use crate::{
    admiral::BuildChance, object::TIME_TO_CHECK_HOME, Contribution, InvariantError, World,
};

/// Identifies a destination record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DestinationId(u16);

impl DestinationId {
    /// Creates a destination identifier.
    #[must_use]
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    /// Record index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Auxiliary data of an object that ships can be sent to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Destination {
    /// Object owning the record.
    pub object: ObjectId,
    /// Classes the destination can build.
    pub can_build: Vec<BaseId>,
    /// Capture progress per admiral.
    pub occupied: [i32; MAX_ADMIRALS],
    /// Income paid to the owner every major tick.
    pub earn: Fixed,
    /// Ticks until the queued build completes.
    pub build_time: i32,
    /// Length of the queued build.
    pub total_build_time: i32,
    /// Class being built.
    pub build_object: Option<BaseId>,
    /// Name used in capture messages.
    pub name: String,
}

impl Destination {
    /// Reports whether the destination offers anything to build.
    #[must_use]
    pub fn has_something_to_build(&self) -> bool {
        !self.can_build.is_empty()
    }
}

impl World {
    /// Destination record by identifier.
    #[must_use]
    pub fn destination(&self, id: DestinationId) -> Option<&Destination> {
        self.destinations.get(id.index())?.as_ref()
    }

    /// Mutable destination record by identifier.
    pub fn destination_mut(&mut self, id: DestinationId) -> Option<&mut Destination> {
        self.destinations.get_mut(id.index())?.as_mut()
    }

    /// Occupied destination records in record order.
    pub fn destinations(&self) -> impl Iterator<Item = (DestinationId, &Destination)> + '_ {
        self.destinations
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| {
                let record = slot.as_ref()?;
                Some((DestinationId::new(u16::try_from(index).ok()?), record))
            })
    }

    /// Record owned by a live object.
    #[must_use]
    pub fn destination_of(&self, object: ObjectId) -> Option<DestinationId> {
        self.objects.get(object)?.destination
    }

    pub(crate) fn make_destination(
        &mut self,
        object: ObjectId,
        can_build: Vec<BaseId>,
        earn: Fixed,
        name: String,
    ) -> Option<DestinationId> {
        let index = self.destinations.iter().position(Option::is_none)?;
        let id = DestinationId::new(u16::try_from(index).ok()?);

        let mut occupied = [0; MAX_ADMIRALS];
        if let Some(holder) = self.objects.get(object) {
            if holder.attributes.contains(Attributes::NEUTRAL_DEATH) {
                if let Some(owner) = holder.owner {
                    occupied[owner.index()] = self
                        .level
                        .template(holder.base)
                        .map_or(0, |template| template.capture_threshold);
                }
            }
        }

        let mut can_build = can_build;
        can_build.truncate(MAX_CAN_BUILD);
        self.destinations[index] = Some(Destination {
            object,
            can_build,
            occupied,
            earn,
            build_time: 0,
            total_build_time: 0,
            build_object: None,
            name,
        });
        if let Some(holder) = self.objects.get_mut(object) {
            holder.destination = Some(id);
        }
        Some(id)
    }

    /// Releases a destination record and forgets every admiral reference to it.
    pub fn remove_destination(&mut self, id: DestinationId) {
        let Some(record) = self.destinations.get_mut(id.index()).and_then(Option::take) else {
            return;
        };
        for admiral in &mut self.admirals {
            if admiral.target == record.object {
                admiral.target = ObjectId::none();
            }
            if admiral.destination_cursor == record.object {
                admiral.destination_cursor = ObjectId::none();
            }
            if admiral.build_at == Some(id) {
                admiral.build_at = None;
            }
        }
        if let Some(holder) = self.objects.get_mut(record.object) {
            holder.destination = None;
        }
    }

    /// Orders an object toward its owner's target, or toward `target` when given.
    ///
    /// Unowned objects lose their destination. Objects that cannot accept
    /// destinations are left alone, as are static destinations unless a
    /// target is given explicitly.
    pub fn set_object_destination(
        &mut self,
        object: ObjectId,
        target: Option<ObjectId>,
        out_events: &mut Vec<Event>,
    ) {
        let Some(ship) = self.objects.get(object) else {
            return;
        };
        let Some(owner) = ship.owner else {
            self.clear_object_destination(object);
            return;
        };
        if !ship.attributes.contains(Attributes::CAN_ACCEPT_DESTINATION) {
            return;
        }
        if ship.attributes.contains(Attributes::STATIC_DESTINATION) && target.is_none() {
            return;
        }

        let target = match target {
            Some(target) => target,
            None => self.admiral_target(owner),
        };
        let valid = self
            .objects
            .get(target)
            .is_some_and(|candidate| candidate.is_in_use());
        if !valid || target == object {
            self.clear_object_destination(object);
            return;
        }

        self.remove_object_from_destination(object);

        let level = self.level_arc();
        let Some((ship, dest)) = self.objects.pair_mut(object, target) else {
            return;
        };
        let offense = ship.offense(&level);
        let deficit = level
            .template(dest.base)
            .map_or(Fixed::ZERO, |template| template.friend_deficit);

        ship.runtime.remove(RuntimeFlags::HAS_ARRIVED);
        ship.time_from_origin = TIME_TO_CHECK_HOME;
        ship.dest = target;

        let friendly = dest.owner == ship.owner;
        if friendly {
            dest.remote_friend_strength += offense;
            dest.escort_strength += offense;
            ship.duty = match (
                dest.escort_strength < deficit,
                dest.attributes.contains(Attributes::IS_DESTINATION),
            ) {
                (true, true) => Duty::Guard,
                (true, false) => Duty::Escort,
                (false, _) => Duty::NoDuty,
            };
        } else {
            dest.remote_foe_strength += offense;
            ship.duty = Duty::Assault;
        }
        ship.contribution = Some(Contribution {
            target,
            friendly,
            amount: offense,
        });

        out_events.push(Event::DestinationAssigned {
            object,
            destination: target,
            duty: ship.duty,
        });
    }

    /// Orders an object toward an explicit target, ignoring a static destination.
    pub fn override_object_destination(
        &mut self,
        object: ObjectId,
        target: ObjectId,
        out_events: &mut Vec<Event>,
    ) {
        self.set_object_destination(object, Some(target), out_events);
    }

    /// Withdraws an object's contribution from its destination's tallies.
    pub fn remove_object_from_destination(&mut self, object: ObjectId) {
        let Some(ship) = self.objects.get_mut(object) else {
            return;
        };
        let contribution = ship.contribution.take();
        ship.dest = ObjectId::none();

        let Some(contribution) = contribution else {
            return;
        };
        if let Some(dest) = self.objects.get_mut(contribution.target) {
            if contribution.friendly {
                dest.remote_friend_strength -= contribution.amount;
                dest.escort_strength -= contribution.amount;
            } else {
                dest.remote_foe_strength -= contribution.amount;
            }
        }
    }

    fn clear_object_destination(&mut self, object: ObjectId) {
        self.remove_object_from_destination(object);
        if let Some(ship) = self.objects.get_mut(object) {
            ship.time_from_origin = 0;
            ship.duty = Duty::NoDuty;
        }
    }

    /// Hands an object to another admiral, or to nobody.
    ///
    /// Capturing a destination may also make it the new owner's control,
    /// target and build site. Build tables are recomputed afterwards.
    pub fn alter_object_owner(
        &mut self,
        object: ObjectId,
        owner: Option<AdmiralId>,
        message: bool,
        out_events: &mut Vec<Event>,
    ) -> Result<(), InvariantError> {
        let level = self.level_arc();
        let Some(target) = self.objects.get_mut(object) else {
            return Ok(());
        };
        if target.owner == owner {
            return Ok(());
        }
        let previous = target.owner;
        target.owner = owner;
        if target.attributes.contains(Attributes::NEUTRAL_DEATH) {
            if let Some(template) = level.template(target.base) {
                target.attributes = template.attributes;
            }
        }
        target.remote_foe_strength = Fixed::ZERO;
        target.remote_friend_strength = Fixed::ZERO;
        target.escort_strength = Fixed::ZERO;
        target.local_foe_strength = Fixed::ZERO;
        target.local_friend_strength = Fixed::ZERO;
        target.best_considered_target_value = Fixed::UNSET;
        target.current_target_value = Fixed::UNSET;
        target.best_considered_target = ObjectId::none();
        let attributes = target.attributes;
        let base = target.base;
        let record = target.destination;

        if let Some(owner) = owner {
            if attributes.contains(Attributes::IS_DESTINATION) {
                if self.admiral_control(owner).is_none() {
                    self.set_admiral_control(owner, object);
                }
                if self.admiral_build_at(owner).is_none() && self.base_has_something_to_build(object)
                {
                    self.set_admiral_build_at(owner, object);
                }
                if self.admiral_target(owner).is_none() {
                    self.set_admiral_target(owner, object);
                }
            }
        }

        self.retally_followers(object, owner);

        if let Some(record) = record.filter(|_| attributes.contains(Attributes::IS_DESTINATION)) {
            if attributes.contains(Attributes::NEUTRAL_DEATH) {
                let threshold = level
                    .template(base)
                    .map_or(0, |template| template.capture_threshold);
                self.clear_all_occupants(record, owner, threshold);
            }
            self.stop_building(record);
            if message {
                let name = self
                    .destination(record)
                    .map(|destination| destination.name.clone())
                    .unwrap_or_default();
                self.ownership_message(&name, previous, owner, out_events);
            }
            self.recalc_build_data()?;
        } else if message {
            let name = level
                .template(base)
                .map(|template| template.name.clone())
                .unwrap_or_default();
            self.ownership_message(&name, previous, owner, out_events);
        }

        out_events.push(Event::OwnerChanged {
            object,
            from: previous,
            to: owner,
        });
        Ok(())
    }

    fn retally_followers(&mut self, object: ObjectId, owner: Option<AdmiralId>) {
        let mut followers = Vec::new();
        followers.extend(self.objects.iter().filter_map(|(handle, follower)| {
            let contribution = follower.contribution?;
            (contribution.target == object && follower.can_think()).then_some(handle)
        }));

        let mut friend = Fixed::ZERO;
        let mut foe = Fixed::ZERO;
        for handle in followers {
            let Some(follower) = self.objects.get_mut(handle) else {
                continue;
            };
            follower.current_target_value = Fixed::UNSET;
            let friendly = follower.owner == owner;
            if let Some(contribution) = follower.contribution.as_mut() {
                contribution.friendly = friendly;
                if friendly {
                    friend += contribution.amount;
                } else {
                    foe += contribution.amount;
                }
            }
        }

        if let Some(target) = self.objects.get_mut(object) {
            target.remote_friend_strength = friend;
            target.escort_strength = friend;
            target.remote_foe_strength = foe;
        }
    }

    fn ownership_message(
        &self,
        name: &str,
        previous: Option<AdmiralId>,
        owner: Option<AdmiralId>,
        out_events: &mut Vec<Event>,
    ) {
        let text = match (owner, previous) {
            (Some(owner), _) => format!("{name} captured by {}.", self.admiral_name(owner)),
            (None, Some(previous)) => format!("{name} lost by {}.", self.admiral_name(previous)),
            (None, None) => return,
        };
        info!(%text, "ownership changed");
        out_events.push(Event::Message { text });
    }

    fn admiral_name(&self, id: AdmiralId) -> &str {
        self.admiral(id).map_or("", |admiral| admiral.name.as_str())
    }

    /// Adds capture progress toward a neutral-death destination.
    ///
    /// Reaching the capture threshold hands the destination to `admiral`.
    pub fn alter_object_occupation(
        &mut self,
        object: ObjectId,
        admiral: Option<AdmiralId>,
        amount: i32,
        message: bool,
        out_events: &mut Vec<Event>,
    ) -> Result<(), InvariantError> {
        let Some(target) = self.objects.get(object) else {
            return Ok(());
        };
        if !target.is_in_use()
            || !target
                .attributes
                .contains(Attributes::IS_DESTINATION | Attributes::NEUTRAL_DEATH)
        {
            return Ok(());
        }
        let threshold = self
            .level
            .template(target.base)
            .map_or(0, |template| template.capture_threshold);
        let (Some(record), Some(admiral)) = (target.destination, admiral) else {
            return Ok(());
        };
        let Some(destination) = self.destination_mut(record) else {
            return Ok(());
        };
        let Some(occupied) = destination.occupied.get_mut(admiral.index()) else {
            return Ok(());
        };
        *occupied = occupied.saturating_add(amount);
        if *occupied >= threshold {
            self.alter_object_owner(object, Some(admiral), message, out_events)?;
        }
        Ok(())
    }

    /// Resets capture progress, crediting `admiral` with `full_amount`.
    pub fn clear_all_occupants(
        &mut self,
        id: DestinationId,
        admiral: Option<AdmiralId>,
        full_amount: i32,
    ) {
        if let Some(destination) = self.destination_mut(id) {
            destination.occupied = [0; MAX_ADMIRALS];
            if let Some(slot) = admiral.and_then(|admiral| destination.occupied.get_mut(admiral.index()))
            {
                *slot = full_amount;
            }
        }
    }

    /// Cancels the build queued at a destination.
    pub fn stop_building(&mut self, id: DestinationId) {
        if let Some(destination) = self.destination_mut(id) {
            destination.build_time = 0;
            destination.total_build_time = 0;
            destination.build_object = None;
        }
    }

    /// Rebuilds every admiral's weighted build table from the destinations they own.
    pub fn recalc_build_data(&mut self) -> Result<(), InvariantError> {
        let capacity = self.destinations.len() * MAX_CAN_BUILD;
        for admiral in &mut self.admirals {
            admiral.build_table.clear();
            admiral.total_build_chance = Fixed::ZERO;
            admiral.hope_to_build = None;
        }

        for record in self.destinations.iter().flatten() {
            let Some(owner) = self.objects.get(record.object).and_then(|holder| holder.owner)
            else {
                continue;
            };
            let Some(admiral) = self.admirals.get_mut(owner.index()) else {
                continue;
            };
            for &base in &record.can_build {
                if admiral.can_build(base) {
                    continue;
                }
                if admiral.build_table.len() >= capacity {
                    return Err(InvariantError::TooManyBuildTypes {
                        admiral: owner,
                        capacity,
                    });
                }
                admiral.build_table.push(BuildChance {
                    base,
                    chance_range: admiral.total_build_chance,
                });
                if let Some(template) = self.level.template(base) {
                    admiral.total_build_chance += template.build_ratio;
                }
            }
        }
        Ok(())
    }

    /// Reports whether an object is a build site with something to build.
    #[must_use]
    pub fn base_has_something_to_build(&self, object: ObjectId) -> bool {
        self.objects
            .get(object)
            .filter(|holder| holder.attributes.contains(Attributes::CAN_ACCEPT_BUILD))
            .and_then(|holder| holder.destination)
            .and_then(|record| self.destination(record))
            .is_some_and(Destination::has_something_to_build)
    }

    /// The admiral's build site, forgotten once the admiral no longer owns it.
    pub fn admiral_build_at(&mut self, admiral: AdmiralId) -> Option<DestinationId> {
        let record = self.admiral(admiral)?.build_at?;
        let owned = self
            .destination(record)
            .and_then(|destination| self.objects.get(destination.object))
            .is_some_and(|holder| holder.owner == Some(admiral));
        if owned {
            Some(record)
        } else {
            if let Some(state) = self.admiral_mut(admiral) {
                state.build_at = None;
            }
            None
        }
    }

    /// Makes an object the admiral's build site when it has something to build.
    pub fn set_admiral_build_at(&mut self, admiral: AdmiralId, object: ObjectId) {
        if !self.base_has_something_to_build(object) {
            return;
        }
        let record = self.destination_of(object);
        if let Some(state) = self.admiral_mut(admiral) {
            state.build_at = record;
        }
    }

    /// The admiral's selected target, if it is still live.
    #[must_use]
    pub fn admiral_target(&self, admiral: AdmiralId) -> ObjectId {
        let Some(target) = self.admiral(admiral).map(|state| state.target) else {
            return ObjectId::none();
        };
        if self.objects.get(target).is_some_and(|object| object.is_in_use()) {
            target
        } else {
            ObjectId::none()
        }
    }

    /// Selects the admiral's target.
    pub fn set_admiral_target(&mut self, admiral: AdmiralId, object: ObjectId) {
        if let Some(state) = self.admiral_mut(admiral) {
            state.target = object;
        }
    }

    /// The object the admiral controls, if it is live and still theirs.
    #[must_use]
    pub fn admiral_control(&self, admiral: AdmiralId) -> Option<ObjectId> {
        let control = self.admiral(admiral)?.control;
        self.objects
            .get(control)
            .filter(|object| object.is_in_use() && object.owner == Some(admiral))
            .map(|_| control)
    }

    /// Selects the object the admiral controls; a build site also becomes the build-at site.
    pub fn set_admiral_control(&mut self, admiral: AdmiralId, object: ObjectId) {
        if let Some(state) = self.admiral_mut(admiral) {
            state.control = object;
        }
        self.set_admiral_build_at(admiral, object);
    }

    /// Queues a build at a destination, paying for it up front.
    ///
    /// Fails when the destination is busy, cannot build the class, or the
    /// admiral cannot afford it.
    pub fn schedule_build(
        &mut self,
        admiral: AdmiralId,
        record: DestinationId,
        base: BaseId,
        out_events: &mut Vec<Event>,
    ) -> bool {
        let Some(destination) = self.destination(record) else {
            return false;
        };
        if destination.build_time > 0 || !destination.can_build.contains(&base) {
            return false;
        }
        let object = destination.object;
        let Some((price, build_time)) = self
            .level
            .template(base)
            .map(|template| (template.price, template.build_time))
        else {
            return false;
        };
        let Some(state) = self.admiral_mut(admiral) else {
            return false;
        };
        if price > state.cash.to_int() {
            return false;
        }
        state.cash -= Fixed::from_int(price);

        if let Some(destination) = self.destination_mut(record) {
            destination.build_time = build_time;
            destination.total_build_time = build_time;
            destination.build_object = Some(base);
        }
        debug!(admiral = admiral.get(), base = base.get(), build_time, "build started");
        out_events.push(Event::BuildStarted {
            admiral,
            destination: object,
            base,
        });
        true
    }

    /// Credits a kill and a loss when a ship that accepts orders is destroyed.
    pub fn record_kill(&mut self, victim: ObjectId, killer: Option<AdmiralId>) {
        let Some(object) = self.objects.get(victim) else {
            return;
        };
        if !object.attributes.contains(Attributes::CAN_ACCEPT_DESTINATION) {
            return;
        }
        let owner = object.owner;
        if let Some(state) = owner.and_then(|owner| self.admiral_mut(owner)) {
            state.losses += 1;
        }
        if let Some(state) = killer
            .filter(|killer| Some(*killer) != owner)
            .and_then(|killer| self.admiral_mut(killer))
        {
            state.kills += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{apply, Config, SpawnRequest, MAX_SHIPS_MESSAGE, MAX_SHIP_BUFFER};
    use flotilla_core::{AdmiralSetup, BaseObject, Command, Coord, Level, LevelBuilder};

    struct Fixture {
        level: Level,
        base: BaseId,
        fighter: BaseId,
        red: AdmiralId,
        blue: AdmiralId,
    }

    fn fixture() -> Fixture {
        let mut builder = LevelBuilder::new("destinations");
        let red = builder.add_admiral(AdmiralSetup::computer("Red"));
        let blue = builder.add_admiral(AdmiralSetup::computer("Blue"));

        let mut fighter = BaseObject::named("Fighter");
        fighter.attributes = Attributes::CAN_THINK;
        fighter.offense_value = Fixed::from_int(5);
        fighter.build_ratio = Fixed::ONE;
        fighter.price = 10;
        fighter.build_time = 40;
        let fighter = builder.add_template(fighter);

        let mut base = BaseObject::named("Outpost");
        base.attributes = Attributes::CAN_BE_DESTINATION
            | Attributes::IS_DESTINATION
            | Attributes::CAN_ACCEPT_BUILD;
        base.friend_deficit = Fixed::from_int(10);
        let base = builder.add_template(base);

        Fixture {
            level: builder.build(),
            base,
            fighter,
            red,
            blue,
        }
    }

    fn spawn(world: &mut World, request: SpawnRequest) -> ObjectId {
        let mut events = Vec::new();
        world.spawn(request, &mut events).expect("pool has room")
    }

    #[test]
    fn friendly_assignment_moves_from_guard_to_no_duty() {
        let fixture = fixture();
        let mut world = World::from_level(fixture.level, Config::default()).expect("level");
        let mut events = Vec::new();

        let outpost = spawn(
            &mut world,
            SpawnRequest::new(fixture.base, Coord::from_center(0, 0))
                .owned_by(Some(fixture.red))
                .as_destination(vec![fixture.fighter], Fixed::ONE, None),
        );
        let first = spawn(
            &mut world,
            SpawnRequest::new(fixture.fighter, Coord::from_center(100, 0))
                .owned_by(Some(fixture.red)),
        );
        let second = spawn(
            &mut world,
            SpawnRequest::new(fixture.fighter, Coord::from_center(200, 0))
                .owned_by(Some(fixture.red)),
        );

        world.override_object_destination(first, outpost, &mut events);
        assert_eq!(crate::query::duty_for(&world, first), Some(Duty::Guard));

        world.override_object_destination(second, outpost, &mut events);
        assert_eq!(world.object(second).map(|ship| ship.duty), Some(Duty::NoDuty));
        assert_eq!(crate::query::duty_for(&world, first), Some(Duty::NoDuty));
        assert_eq!(
            world.object(outpost).map(|object| object.escort_strength),
            Some(Fixed::from_int(10))
        );
    }

    #[test]
    fn tallies_are_conserved_across_reassignment_and_capture() {
        let fixture = fixture();
        let mut world = World::from_level(fixture.level, Config::default()).expect("level");
        let mut events = Vec::new();

        let outpost = spawn(
            &mut world,
            SpawnRequest::new(fixture.base, Coord::from_center(0, 0))
                .owned_by(Some(fixture.red))
                .as_destination(vec![fixture.fighter], Fixed::ONE, None),
        );
        let other = spawn(
            &mut world,
            SpawnRequest::new(fixture.base, Coord::from_center(9_000, 0))
                .owned_by(Some(fixture.blue))
                .as_destination(Vec::new(), Fixed::ONE, None),
        );
        let ship = spawn(
            &mut world,
            SpawnRequest::new(fixture.fighter, Coord::from_center(50, 0))
                .owned_by(Some(fixture.red)),
        );

        world.override_object_destination(ship, outpost, &mut events);
        world
            .alter_object_owner(outpost, Some(fixture.blue), true, &mut events)
            .expect("build tables fit");
        let outpost_state = world.object(outpost).expect("outpost");
        assert_eq!(outpost_state.remote_foe_strength, Fixed::from_int(5));
        assert_eq!(outpost_state.escort_strength, Fixed::ZERO);

        world.override_object_destination(ship, other, &mut events);
        let outpost_state = world.object(outpost).expect("outpost");
        assert_eq!(outpost_state.remote_foe_strength, Fixed::ZERO);
        assert_eq!(outpost_state.remote_friend_strength, Fixed::ZERO);

        world.remove_object_from_destination(ship);
        let other_state = world.object(other).expect("other");
        assert_eq!(other_state.remote_foe_strength, Fixed::ZERO);
        assert!(events.iter().any(|event| matches!(
            event,
            Event::Message { text } if text == "Outpost captured by Blue."
        )));
    }

    #[test]
    fn self_assignment_clears_destination() {
        let fixture = fixture();
        let mut world = World::from_level(fixture.level, Config::default()).expect("level");
        let mut events = Vec::new();

        let outpost = spawn(
            &mut world,
            SpawnRequest::new(fixture.base, Coord::from_center(0, 0))
                .owned_by(Some(fixture.red))
                .as_destination(Vec::new(), Fixed::ONE, None),
        );
        let ship = spawn(
            &mut world,
            SpawnRequest::new(fixture.fighter, Coord::from_center(50, 0))
                .owned_by(Some(fixture.red)),
        );
        world.override_object_destination(ship, outpost, &mut events);
        world.override_object_destination(ship, ship, &mut events);

        let ship_state = world.object(ship).expect("ship");
        assert!(ship_state.dest.is_none());
        assert_eq!(ship_state.duty, Duty::NoDuty);
        assert_eq!(
            world.object(outpost).map(|object| object.escort_strength),
            Some(Fixed::ZERO)
        );
    }

    #[test]
    fn build_tables_follow_destination_ownership() {
        let fixture = fixture();
        let mut world = World::from_level(fixture.level, Config::default()).expect("level");
        let mut events = Vec::new();

        let outpost = spawn(
            &mut world,
            SpawnRequest::new(fixture.base, Coord::from_center(0, 0))
                .owned_by(Some(fixture.red))
                .as_destination(vec![fixture.fighter], Fixed::ONE, None),
        );
        world.recalc_build_data().expect("fits");
        assert!(world.admiral(fixture.red).expect("red").can_build(fixture.fighter));

        world
            .alter_object_owner(outpost, Some(fixture.blue), false, &mut events)
            .expect("fits");
        assert!(!world.admiral(fixture.red).expect("red").can_build(fixture.fighter));
        let blue = world.admiral(fixture.blue).expect("blue");
        assert!(blue.can_build(fixture.fighter));
        assert_eq!(blue.total_build_chance, Fixed::ONE);
        assert_eq!(world.admiral_build_at(fixture.blue), world.destination_of(outpost));
    }

    #[test]
    fn scheduled_builds_charge_the_admiral() {
        let fixture = fixture();
        let red = fixture.red;
        let mut level = fixture.level;
        level.admirals[red.index()].cash = Fixed::from_int(15);
        let mut world = World::from_level(level, Config::default()).expect("level");
        let mut events = Vec::new();

        let outpost = spawn(
            &mut world,
            SpawnRequest::new(fixture.base, Coord::from_center(0, 0))
                .owned_by(Some(red))
                .as_destination(vec![fixture.fighter], Fixed::ONE, None),
        );
        let record = world.destination_of(outpost).expect("record");

        assert!(world.schedule_build(red, record, fixture.fighter, &mut events));
        assert!(!world.schedule_build(red, record, fixture.fighter, &mut events));
        assert_eq!(world.admiral(red).map(|admiral| admiral.cash), Some(Fixed::from_int(5)));
        assert_eq!(world.destination(record).map(|d| d.build_time), Some(40));
    }

    fn build_at_outpost(object_capacity: usize) -> (World, ObjectId, Vec<Event>) {
        let fixture = fixture();
        let red = fixture.red;
        let mut level = fixture.level;
        level.admirals[red.index()].cash = Fixed::from_int(100);
        let config = Config::new(object_capacity, 1, 4, 7);
        let mut world = World::from_level(level, config).expect("level");
        let outpost = spawn(
            &mut world,
            SpawnRequest::new(fixture.base, Coord::from_center(0, 0))
                .owned_by(Some(red))
                .as_destination(vec![fixture.fighter], Fixed::ONE, None),
        );
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::Build {
                admiral: red,
                destination: outpost,
                base: fixture.fighter,
            },
            &mut events,
        );
        (world, outpost, events)
    }

    #[test]
    fn build_command_pays_when_ships_fit() {
        let (world, outpost, events) = build_at_outpost(MAX_SHIP_BUFFER + 2);

        let red = AdmiralId::new(0);
        assert_eq!(world.admiral(red).map(|admiral| admiral.cash), Some(Fixed::from_int(90)));
        let record = world.destination_of(outpost).expect("record");
        assert_eq!(world.destination(record).map(|d| d.build_time), Some(40));
        assert!(events
            .iter()
            .any(|event| matches!(event, Event::BuildStarted { .. })));
    }

    #[test]
    fn build_command_is_refused_once_the_ship_buffer_is_reached() {
        let (world, outpost, events) = build_at_outpost(MAX_SHIP_BUFFER + 1);

        let red = AdmiralId::new(0);
        assert!(!world.has_room_for_ships());
        assert_eq!(world.admiral(red).map(|admiral| admiral.cash), Some(Fixed::from_int(100)));
        let record = world.destination_of(outpost).expect("record");
        assert_eq!(world.destination(record).map(|d| d.build_time), Some(0));
        assert_eq!(
            events,
            vec![Event::Message {
                text: MAX_SHIPS_MESSAGE.to_owned()
            }]
        );
    }
}
