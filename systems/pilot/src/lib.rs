#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pilot system for every object that thinks or is flown by a player.
//!
//! Once per major tick the pilot decides which keys each ship holds. The
//! computer derives them from the ship's target and destination; humans
//! use their admiral's key mask. The keys are then turned into turning and
//! thrust, energy is recharged from the battery and weapons are fired.

mod steering;

use flotilla_core::{
    rotation, Attributes, BaseObject, Duty, Event, Fixed, Keys, Level, ObjectId, Point,
    RandomSource, RuntimeFlags, WeaponSlot,
};
use flotilla_system_actions::Interpreter;
use flotilla_world::{InvariantError, Presence, SpaceObject, World};
use tracing::debug;

use steering::{Orders, Sighting};

/// Degrees a ship veers away from a threatening target.
pub const EVADE_ANGLE: i32 = 30;
/// Half-angle inside which a target is considered to be looking at a ship.
pub const PARANOIA_ANGLE: i32 = 30;
/// Degrees off the bore inside which the computer opens fire.
pub const SHOOT_ANGLE: i32 = 15;
/// Heading error the computer tolerates before correcting its goal.
pub const DIRECTION_ERROR: i32 = 5;
/// Change in squared distance that the computer reacts to.
pub const MOTION_MARGIN: u64 = 5000;
/// Squared distance beyond which the computer considers warping.
pub const WARP_IN_DISTANCE: u64 = 16_777_216;
/// A ship needs more than its template energy shifted by this to warp.
pub const WARP_IN_ENERGY_SHIFT: u32 = 3;
/// Major ticks between recharge steps.
pub const RECHARGE_SPEED: i32 = 4;
/// Energy spent per point of health repaired.
pub const HEALTH_RATIO: i32 = 5;
/// Energy spent per round of ammunition restocked.
pub const WEAPON_RATIO: i32 = 2;
/// Energy moved from the battery per recharge step.
pub const ENERGY_CHUNK: i32 = HEALTH_RATIO + WEAPON_RATIO * 3;
/// Turn rate of freely spinning ships without their own, per minor tick.
pub const DEFAULT_TURN_RATE: Fixed = Fixed::from_int(2);

const FIRING: [(WeaponSlot, Keys); 3] = [
    (WeaponSlot::Pulse, Keys::PULSE),
    (WeaponSlot::Beam, Keys::BEAM),
    (WeaponSlot::Special, Keys::SPECIAL),
];

/// Steers ships and fires their weapons.
#[derive(Debug, Default)]
pub struct Pilot {
    handles: Vec<ObjectId>,
}

impl Pilot {
    /// Creates the system with an empty scratch buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs one pilot pass covering `ticks` minor ticks.
    ///
    /// Also recounts the ships every admiral has left.
    pub fn think(
        &mut self,
        world: &mut World,
        interpreter: &mut Interpreter,
        ticks: i32,
        out: &mut Vec<Event>,
    ) -> Result<(), InvariantError> {
        for admiral in world.admirals_mut() {
            admiral.ships_left = 0;
        }

        let mut handles = std::mem::take(&mut self.handles);
        world.objects().alive_handles(&mut handles);
        let mut result = Ok(());
        for &id in &handles {
            result = self.pilot(world, interpreter, id, ticks, out);
            if result.is_err() {
                break;
            }
        }
        self.handles = handles;
        result
    }

    fn pilot(
        &mut self,
        world: &mut World,
        interpreter: &mut Interpreter,
        id: ObjectId,
        ticks: i32,
        out: &mut Vec<Event>,
    ) -> Result<(), InvariantError> {
        let level = world.level_arc();
        let Some(object) = world.object(id) else {
            return Ok(());
        };
        let piloted = object.can_think()
            || object.is_remote_or_human()
            || object.attributes.contains(Attributes::IS_GUIDED);
        if !object.is_in_use() || !piloted {
            return Ok(());
        }
        let Some(template) = level.template(object.base) else {
            return Ok(());
        };

        let target = steering::resolve_target(world, object);
        let dest = Sighting::of(world, object.dest);
        let computer = object.is_computer_piloted();
        let owner = object.owner;
        let human_keys = owner
            .and_then(|owner| world.admiral(owner))
            .map_or(Keys::NONE, |admiral| admiral.keys & !world.disabled_keys());

        if let Some(admiral) = owner.and_then(|owner| world.admiral_mut(owner)) {
            admiral.ships_left += 1;
        }

        let Some(object) = world.object_mut(id) else {
            return Ok(());
        };
        object.direction_goal = object.direction;
        object.target_angle = object.direction;

        let presence = object.presence;
        let mut orders = match presence {
            Presence::Normal if computer => {
                steering::steer(object, &level, template, target, dest, ticks)
            }
            Presence::Normal => {
                aim_at(object, target);
                Orders {
                    keys: human_keys,
                    ..Orders::default()
                }
            }
            Presence::Warping { .. } if computer => {
                if let Some(dest) = dest {
                    object.direction_goal = steering::heading(object.location, dest.location);
                }
                Orders::default()
            }
            Presence::Warping { .. } | Presence::Landing { .. } => Orders::default(),
        };

        if object.offline_time > 0 {
            if object.random.next(object.offline_time) > 5 {
                orders.keys = Keys::NONE;
            }
            object.offline_time -= 1;
        }

        apply_keys(object, orders.keys);
        recharge(object, template, &level);
        for weapon in &mut object.weapons {
            if weapon.time > 0 {
                weapon.time -= ticks;
            }
        }
        let target = object.target;
        let dest = object.dest;
        let arrive = orders.arrived && !object.runtime.contains(RuntimeFlags::HAS_ARRIVED);
        if arrive {
            object.runtime.insert(RuntimeFlags::HAS_ARRIVED);
        }
        let warp = orders.keys.contains(Keys::WARP)
            && presence == Presence::Normal
            && template.warp_speed.is_positive()
            && object.energy > template.energy >> WARP_IN_ENERGY_SHIFT;

        if orders.lost_destination {
            world.remove_object_from_destination(id);
            if let Some(object) = world.object_mut(id) {
                object.duty = Duty::NoDuty;
                object.attributes.remove(Attributes::STATIC_DESTINATION);
            }
            debug!(object = ?id, "destination lost");
        }

        if arrive {
            out.push(Event::Arrived {
                object: id,
                destination: dest,
            });
            interpreter.exec(
                world,
                template.actions.arrive,
                id,
                dest,
                Some(Point::new(0, 0)),
                out,
            )?;
        }

        for (slot, key) in FIRING {
            if orders.keys.contains(key) {
                interpreter.fire_weapon(world, id, target, slot, out)?;
            }
        }

        if warp {
            interpreter.enter_warp(world, id, template.warp_speed, out)?;
        }
        Ok(())
    }
}

/// Points a player's target angle at the target it could engage.
fn aim_at(object: &mut SpaceObject, target: Option<(Sighting, u64)>) {
    object.target = target.map_or(ObjectId::none(), |(sighting, _)| sighting.id);
    if let Some((target, distance)) = target {
        if object.attributes.contains(Attributes::CAN_ENGAGE) && distance < object.engage_range {
            object.target_angle = steering::heading(object.location, target.location);
        }
    }
}

fn apply_keys(object: &mut SpaceObject, keys: Keys) {
    if object.attributes.contains(Attributes::HAS_DIRECTION_GOAL) {
        if keys.contains(Keys::LEFT) {
            object.direction_goal = rotation::normalize_angle(object.direction - 90);
        } else if keys.contains(Keys::RIGHT) {
            object.direction_goal = rotation::normalize_angle(object.direction + 90);
        }
    } else if object.attributes.contains(Attributes::CAN_TURN) {
        let rate = if object.max_turn_rate.is_positive() {
            object.max_turn_rate
        } else {
            DEFAULT_TURN_RATE
        };
        object.turn_velocity = if keys.contains(Keys::LEFT) {
            -rate
        } else if keys.contains(Keys::RIGHT) {
            rate
        } else {
            Fixed::ZERO
        };
    }

    if object.presence == Presence::Normal {
        object.thrust = if keys.contains(Keys::UP) {
            object.max_thrust
        } else if keys.contains(Keys::DOWN) {
            -object.max_thrust
        } else {
            Fixed::ZERO
        };
    }
}

/// Moves battery energy into the ship and spends it on repairs and ammunition.
fn recharge(object: &mut SpaceObject, template: &BaseObject, level: &Level) {
    if object.recharge_time < RECHARGE_SPEED {
        object.recharge_time += 1;
        return;
    }
    object.recharge_time = 0;

    match object.presence {
        Presence::Warping { .. } => object.energy = (object.energy - 1).max(0),
        Presence::Landing { .. } => {}
        Presence::Normal => {
            if object.energy < template.energy - ENERGY_CHUNK && object.battery > ENERGY_CHUNK {
                object.battery -= ENERGY_CHUNK;
                object.energy += ENERGY_CHUNK;
            }
            if object.health < template.health >> 1 && object.energy > HEALTH_RATIO {
                object.health += 1;
                object.energy -= HEALTH_RATIO;
            }
            for slot in WeaponSlot::ALL {
                let state = &mut object.weapons[slot.index()];
                let Some(stats) = state
                    .base
                    .and_then(|base| level.template(base))
                    .and_then(|weapon| weapon.weapon)
                else {
                    continue;
                };
                if stats.ammo > 0 && state.ammo < stats.ammo >> 1 && object.energy >= WEAPON_RATIO
                {
                    state.ammo += 1;
                    object.energy -= WEAPON_RATIO;
                }
            }
        }
    }
}
