//! Round-robin order assignment.
//!
//! Each think evaluates one (ship, candidate) pairing. When the candidate
//! cursor wraps, the ship under consideration adopts the best candidate it
//! saw and the next owned ship takes its place.

use flotilla_core::{AdmiralId, Attributes, Duty, Event, Fixed, ObjectId, RandomSource};
use flotilla_world::{SpaceObject, World};
use tracing::debug;

use crate::score::{importance, Party};

/// Half-width of the swing a blitzkrieg phase draws from the global stream.
pub const BLITZKRIEG_SPAN: i32 = 1200;

/// Counts the attack and defence phases down, flipping between them.
pub(crate) fn blitzkrieg(world: &mut World, admiral: AdmiralId) {
    let Some(mut counter) = world.admiral(admiral).map(|state| state.blitzkrieg) else {
        return;
    };
    let attacking = counter > 0;
    counter += if attacking { -1 } else { 1 };
    let flipped = if attacking { counter <= 0 } else { counter >= 0 };

    if flipped {
        let phase = world.random_mut().next(BLITZKRIEG_SPAN) + BLITZKRIEG_SPAN;
        counter = if attacking { -phase } else { phase };
        debug!(admiral = admiral.get(), phase = counter, "blitzkrieg flipped");

        let mut handles = Vec::new();
        world.objects().alive_handles(&mut handles);
        for id in handles {
            if let Some(object) = world.object_mut(id) {
                if object.owner == Some(admiral) {
                    object.current_target_value = Fixed::ZERO;
                }
            }
        }
    }
    if let Some(state) = world.admiral_mut(admiral) {
        state.blitzkrieg = counter;
    }
}

/// Advances both cursors by one pairing and scores it.
pub(crate) fn consider(world: &mut World, admiral: AdmiralId, out: &mut Vec<Event>) {
    let Some(state) = world.admiral(admiral) else {
        return;
    };
    let (mut ship, mut cursor) = (state.consider_ship, state.destination_cursor);
    let Some(first) = world.objects().first_alive() else {
        return;
    };
    if !in_use(world, ship) {
        ship = first;
    }
    if !in_use(world, cursor) {
        cursor = first;
    }

    let origin = cursor;
    loop {
        match world.objects().next_alive(cursor) {
            Some(next) => cursor = next,
            None => {
                decide(world, admiral, ship, out);
                ship = next_ship(world, admiral, ship);
                cursor = first;
            }
        }
        if is_candidate(world, cursor, ship) || cursor == origin {
            break;
        }
    }

    if let Some(state) = world.admiral_mut(admiral) {
        state.consider_ship = ship;
        state.destination_cursor = cursor;
    }
    evaluate(world, admiral, ship, cursor);
}

fn in_use(world: &World, id: ObjectId) -> bool {
    world.object(id).is_some_and(SpaceObject::is_in_use)
}

fn is_candidate(world: &World, id: ObjectId, ship: ObjectId) -> bool {
    id != ship
        && world.object(id).is_some_and(|object| {
            object.is_in_use() && object.attributes.contains(Attributes::CAN_BE_DESTINATION)
        })
}

fn takes_orders(object: &SpaceObject, admiral: AdmiralId) -> bool {
    object.owner == Some(admiral)
        && object.is_in_use()
        && object.attributes.contains(Attributes::CAN_ACCEPT_DESTINATION)
}

/// Lets the ship adopt the best candidate of the pass just finished.
fn decide(world: &mut World, admiral: AdmiralId, ship: ObjectId, out: &mut Vec<Event>) {
    let level = world.level_arc();
    let Some(object) = world.object(ship).filter(|object| takes_orders(object, admiral)) else {
        return;
    };
    let free = !matches!(object.duty, Duty::Escort | Duty::HostileBase);
    let adopt = free
        && object.best_considered_target_value > object.current_target_value
        && in_use(world, object.best_considered_target)
        && !object.attributes.contains(Attributes::STATIC_DESTINATION);
    let target = object.best_considered_target;
    let offense = object.offense(&level);

    if let Some(object) = world.object_mut(ship) {
        if adopt {
            let best = object.best_considered_target_value;
            let half = Fixed::HALF.raw();
            let swing = Fixed::from_raw(object.random.next(half) - (half >> 1));
            object.current_target_value = best + swing.mul(best);
        }
        object.best_considered_target_value = Fixed::UNSET;
    }
    if adopt {
        debug!(admiral = admiral.get(), ?ship, ?target, "new orders");
        world.set_object_destination(ship, Some(target), out);
    }
    if free {
        if let Some(state) = world.admiral_mut(admiral) {
            state.this_free_escort_strength += offense;
        }
    }
}

/// Next owned ship that accepts orders, wrapping once through the alive sequence.
fn next_ship(world: &mut World, admiral: AdmiralId, ship: ObjectId) -> ObjectId {
    let Some(first) = world.objects().first_alive() else {
        return ObjectId::none();
    };
    let origin = if in_use(world, ship) { ship } else { first };
    let mut current = origin;
    loop {
        match world.objects().next_alive(current) {
            Some(next) => current = next,
            None => {
                current = first;
                if let Some(state) = world.admiral_mut(admiral) {
                    state.last_free_escort_strength = state.this_free_escort_strength;
                    state.this_free_escort_strength = Fixed::ZERO;
                }
            }
        }
        let eligible = world
            .object(current)
            .is_some_and(|object| takes_orders(object, admiral));
        if eligible || current == origin {
            return current;
        }
    }
}

/// Scores the current pairing and remembers it when it beats the pass so far.
fn evaluate(world: &mut World, admiral: AdmiralId, ship: ObjectId, candidate: ObjectId) {
    let level = world.level_arc();
    let blitzkrieg = world.admiral(admiral).map_or(0, |state| state.blitzkrieg);
    let (Some(object), Some(dest)) = (world.object(ship), world.object(candidate)) else {
        return;
    };
    if !takes_orders(object, admiral)
        || !dest.is_in_use()
        || !dest.attributes.contains(Attributes::CAN_BE_DESTINATION)
    {
        return;
    }
    let (Some(ship_template), Some(dest_template)) =
        (level.template(object.base), level.template(dest.base))
    else {
        return;
    };
    if object.owner == dest.owner
        && ship_template.destination_class >= dest_template.destination_class
    {
        return;
    }

    let value = importance(
        &Party {
            object,
            template: ship_template,
        },
        &Party {
            object: dest,
            template: dest_template,
        },
        blitzkrieg,
    );

    let Some(object) = world.object_mut(ship) else {
        return;
    };
    let mut value = value;
    if value > Fixed::ZERO {
        let raw = value.raw();
        value += Fixed::from_raw(object.random.next(raw >> 1) - (raw >> 2));
    }
    if value > object.best_considered_target_value {
        object.best_considered_target_value = value;
        object.best_considered_target = candidate;
    }
}
