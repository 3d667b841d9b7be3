//! Creation and destruction of objects, damage and weapon fire.

use flotilla_core::{
    AdmiralId, AdmiralKind, Attributes, Coord, Event, FixedPoint, InitialId, ObjectId, WeaponSlot,
};
use flotilla_world::{InvariantError, SpawnRequest, World};
use tracing::{debug, warn};

use crate::Interpreter;

impl Interpreter {
    /// Places a new object and runs its create list.
    ///
    /// Returns `Ok(None)` when the pool is full; the world logs the shortage.
    pub fn spawn_object(
        &mut self,
        world: &mut World,
        request: SpawnRequest,
        out: &mut Vec<Event>,
    ) -> Result<Option<ObjectId>, InvariantError> {
        let base = request.base;
        let Some(id) = world.spawn(request, out) else {
            return Ok(None);
        };
        let create = world
            .level()
            .template(base)
            .map(|template| template.actions.create)
            .unwrap_or_default();
        self.exec(world, create, id, ObjectId::none(), None, out)?;
        Ok(Some(id))
    }

    /// Creates the object described by an initial object slot.
    ///
    /// Does nothing when the slot is already bound to a live object. A
    /// flagship becomes its admiral's ship unless the admiral already has
    /// one; owned build sites become the admiral's control, build site and
    /// target when those are unset.
    pub fn place_initial(
        &mut self,
        world: &mut World,
        initial: InitialId,
        out: &mut Vec<Event>,
    ) -> Result<Option<ObjectId>, InvariantError> {
        let level = world.level_arc();
        let Some(setup) = level.initial_objects.get(usize::from(initial.get())) else {
            return Ok(None);
        };
        if world
            .object(world.initial_object(initial))
            .is_some_and(|object| object.is_in_use())
        {
            return Ok(None);
        }

        let request = SpawnRequest::new(
            setup.base,
            Coord::from_center(setup.location.h, setup.location.v),
        )
        .owned_by(setup.owner)
        .as_destination(setup.can_build.clone(), setup.earning, setup.name.clone());
        let Some(id) = self.spawn_object(world, request, out)? else {
            warn!(initial = initial.get(), "no room for initial object");
            return Ok(None);
        };
        world.bind_initial(initial, id);

        if let Some(owner) = setup.owner {
            if setup.is_flagship {
                claim_flagship(world, owner, id);
            }
            let is_destination = world
                .object(id)
                .is_some_and(|object| object.attributes.contains(Attributes::IS_DESTINATION));
            if is_destination && !setup.can_build.is_empty() {
                if world.admiral_control(owner).is_none() {
                    world.set_admiral_control(owner, id);
                }
                if world.admiral_build_at(owner).is_none() {
                    world.set_admiral_build_at(owner, id);
                }
                if world.admiral_target(owner).is_none() {
                    world.set_admiral_target(owner, id);
                }
            }
        }
        if let Some(object) = world.object_mut(id) {
            if !setup.is_flagship {
                object.attributes.remove(Attributes::IS_PLAYER_SHIP);
            }
        }
        Ok(Some(id))
    }

    /// Orders an initial object toward the initial object it was placed heading for.
    ///
    /// The owner's target is pointed at the destination for the assignment
    /// and restored afterwards when `preserve` is set.
    pub fn set_initial_destination(
        &mut self,
        world: &mut World,
        initial: InitialId,
        preserve: bool,
        out: &mut Vec<Event>,
    ) {
        let level = world.level_arc();
        let Some(setup) = level.initial_objects.get(usize::from(initial.get())) else {
            return;
        };
        let (Some(owner), Some(destination)) = (setup.owner, setup.destination) else {
            return;
        };
        let object = world.initial_object(initial);
        let target = world.initial_object(destination);
        if world.object(object).is_none() || world.object(target).is_none() {
            return;
        }

        let saved = world.admiral_target(owner);
        world.set_admiral_target(owner, target);
        world.override_object_destination(object, target, out);
        if preserve {
            world.set_admiral_target(owner, saved);
        }
    }

    /// Creates every initial object in `first..=last` that is not yet in play.
    pub fn unhide_initials(
        &mut self,
        world: &mut World,
        first: i32,
        last: i32,
        out: &mut Vec<Event>,
    ) -> Result<(), InvariantError> {
        for index in first.max(0)..=last {
            let Ok(index) = u16::try_from(index) else {
                break;
            };
            let initial = InitialId::new(index);
            if self.place_initial(world, initial, out)?.is_some() {
                self.set_initial_destination(world, initial, true, out);
            }
        }
        Ok(())
    }

    /// Adds to an object's health, destroying it once health drops below zero.
    ///
    /// Healing never exceeds the template's health.
    pub fn alter_health(
        &mut self,
        world: &mut World,
        id: ObjectId,
        amount: i32,
        killer: Option<AdmiralId>,
        out: &mut Vec<Event>,
    ) -> Result<(), InvariantError> {
        let max = world
            .object(id)
            .and_then(|object| world.level().template(object.base))
            .map_or(0, |template| template.health);
        let Some(object) = world.object_mut(id) else {
            return Ok(());
        };
        if amount > 0 {
            object.health = object.health.saturating_add(amount).min(max.max(object.health));
        } else {
            object.health = object.health.saturating_add(amount);
        }
        if object.health < 0 {
            self.destroy(world, id, killer, out)?;
        }
        Ok(())
    }

    /// Applies a collision: `hitter` damages `target` and runs its collide list.
    pub fn hit_object(
        &mut self,
        world: &mut World,
        hitter: ObjectId,
        target: ObjectId,
        out: &mut Vec<Event>,
    ) -> Result<(), InvariantError> {
        let Some(source) = world.object(hitter) else {
            return Ok(());
        };
        let Some(victim) = world.object(target) else {
            return Ok(());
        };
        if !victim.is_in_use()
            || !victim.attributes.contains(Attributes::CAN_BE_HIT)
            || !source.attributes.contains(Attributes::CAN_COLLIDE)
        {
            return Ok(());
        }
        let killer = source.owner;
        let Some(template) = world.level().template(source.base) else {
            return Ok(());
        };
        let (damage, collide) = (template.damage, template.actions.collide);

        if let Some(victim) = world.object_mut(target) {
            victim.time_from_origin = 0;
        }
        self.alter_health(world, target, -damage, killer, out)?;
        self.exec(world, collide, hitter, target, None, out)
    }

    /// Destroys an object.
    ///
    /// Neutral-death objects survive unowned with full health and lose the
    /// attributes that made them dangerous. Everything else credits a kill,
    /// scatters energy pods when asked to, releases its destination record,
    /// runs its destroy list and is marked for removal unless the template
    /// keeps it.
    pub fn destroy(
        &mut self,
        world: &mut World,
        id: ObjectId,
        killer: Option<AdmiralId>,
        out: &mut Vec<Event>,
    ) -> Result<(), InvariantError> {
        let level = world.level_arc();
        let Some(object) = world.object(id) else {
            return Ok(());
        };
        if !object.is_in_use() {
            return Ok(());
        }
        let Some(template) = level.template(object.base) else {
            return Ok(());
        };
        let attributes = object.attributes;
        let (base, owner) = (object.base, object.owner);

        if attributes.contains(Attributes::NEUTRAL_DEATH) {
            if let Some(object) = world.object_mut(id) {
                object.health = template.health;
            }
            let mut hunters = std::mem::take(&mut self.followers);
            hunters.clear();
            hunters.extend(world.objects().iter().filter_map(|(handle, hunter)| {
                (hunter.attributes.contains(Attributes::CAN_ACCEPT_DESTINATION)
                    && hunter.target == id)
                    .then_some(handle)
            }));
            for &hunter in &hunters {
                if let Some(hunter) = world.object_mut(hunter) {
                    hunter.target = ObjectId::none();
                }
            }
            self.followers = hunters;

            world.alter_object_owner(id, None, true, out)?;
            if let Some(object) = world.object_mut(id) {
                object.attributes.remove(
                    Attributes::HATED
                        | Attributes::CAN_ENGAGE
                        | Attributes::CAN_COLLIDE
                        | Attributes::CAN_BE_HIT,
                );
            }
            debug!(object = ?id, "neutralised");
            out.push(Event::ObjectDestroyed {
                object: id,
                base,
                owner,
            });
            return self.exec(world, template.actions.destroy, id, ObjectId::none(), None, out);
        }

        world.record_kill(id, killer);
        if attributes.contains(Attributes::RELEASE_ENERGY_ON_DEATH) {
            if let Some(object) = world.object(id) {
                let pods = object.energy / flotilla_core::ENERGY_POD_AMOUNT;
                let (location, velocity, direction) =
                    (object.location, object.velocity, object.direction);
                self.scatter_energy(world, pods, location, velocity, direction, out)?;
            }
        }

        if attributes.contains(Attributes::IS_DESTINATION) && !template.destroy_dont_die {
            if let Some(record) = world.destination_of(id) {
                world.remove_destination(record);
            }
            let mut followers = std::mem::take(&mut self.followers);
            followers.clear();
            followers.extend(world.objects().iter().filter_map(|(handle, follower)| {
                (follower
                    .attributes
                    .contains(Attributes::CAN_ACCEPT_DESTINATION)
                    && follower.dest == id)
                    .then_some(handle)
            }));
            for &follower in &followers {
                world.remove_object_from_destination(follower);
                if let Some(follower) = world.object_mut(follower) {
                    follower.attributes.remove(Attributes::STATIC_DESTINATION);
                }
            }
            self.followers = followers;
        }

        out.push(Event::ObjectDestroyed {
            object: id,
            base,
            owner,
        });
        self.exec(world, template.actions.destroy, id, ObjectId::none(), None, out)?;

        if attributes.contains(Attributes::CAN_ACCEPT_DESTINATION) {
            world.remove_object_from_destination(id);
        }
        if !template.destroy_dont_die {
            world.mark_to_be_freed(id);
        }
        Ok(())
    }

    /// Fires one weapon slot when it is recharged, powered and loaded.
    ///
    /// Firing spends energy and ammo, restarts the slot's recharge and runs
    /// the weapon's activate list with the firer as subject.
    pub fn fire_weapon(
        &mut self,
        world: &mut World,
        ship: ObjectId,
        target: ObjectId,
        slot: WeaponSlot,
        out: &mut Vec<Event>,
    ) -> Result<(), InvariantError> {
        let level = world.level_arc();
        let Some(object) = world.object_mut(ship) else {
            return Ok(());
        };
        let state = object.weapons[slot.index()];
        let Some(weapon) = state.base.and_then(|base| level.template(base)) else {
            return Ok(());
        };
        let Some(stats) = weapon.weapon else {
            return Ok(());
        };
        if state.time > 0 || object.energy < stats.energy_cost || state.ammo == 0 {
            return Ok(());
        }

        object.energy -= stats.energy_cost;
        let state = &mut object.weapons[slot.index()];
        state.time = stats.fire_time;
        if state.ammo > 0 {
            state.ammo -= 1;
        }
        out.push(Event::WeaponFired { object: ship, slot });
        self.exec(world, weapon.actions.activate, ship, target, None, out)
    }

    pub(crate) fn scatter_energy(
        &mut self,
        world: &mut World,
        pods: i32,
        location: Coord,
        velocity: FixedPoint,
        direction: i32,
        out: &mut Vec<Event>,
    ) -> Result<(), InvariantError> {
        let Some(blob) = world.level().energy_blob else {
            return Ok(());
        };
        for _ in 0..pods {
            let request = SpawnRequest::new(blob, location)
                .with_velocity(velocity)
                .with_direction(direction);
            if self.spawn_object(world, request, out)?.is_none() {
                break;
            }
        }
        Ok(())
    }
}

fn claim_flagship(world: &mut World, owner: AdmiralId, id: ObjectId) {
    let Some(admiral) = world.admiral(owner) else {
        return;
    };
    let kind = admiral.kind;
    let current = admiral.flagship;
    if world
        .object(current)
        .is_some_and(|object| object.is_in_use())
    {
        if let Some(object) = world.object_mut(id) {
            object.attributes.remove(Attributes::IS_PLAYER_SHIP);
        }
        return;
    }
    if let Some(admiral) = world.admiral_mut(owner) {
        admiral.flagship = id;
    }
    if let Some(object) = world.object_mut(id) {
        match kind {
            AdmiralKind::Human => {
                object.attributes.insert(Attributes::IS_HUMAN_CONTROLLED | Attributes::IS_PLAYER_SHIP);
            }
            AdmiralKind::Remote => {
                object.attributes.insert(Attributes::IS_REMOTE | Attributes::IS_PLAYER_SHIP);
            }
            AdmiralKind::Computer => object.attributes.remove(Attributes::IS_PLAYER_SHIP),
        }
    }
}
