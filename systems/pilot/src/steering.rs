//! Computer steering: target resolution, engagement, evasion and homing.

use flotilla_core::{
    rotation, AdmiralId, Attributes, BaseObject, Coord, Keys, Level, ObjectId, Point,
    RandomSource, RuntimeFlags,
};
use flotilla_world::{SpaceObject, World, ENGAGE_RANGE, TIME_TO_CHECK_HOME};

use crate::{
    DIRECTION_ERROR, EVADE_ANGLE, FIRING, MOTION_MARGIN, PARANOIA_ANGLE, SHOOT_ANGLE,
    WARP_IN_DISTANCE, WARP_IN_ENERGY_SHIFT,
};

/// What a thinking object knows about another object.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Sighting {
    pub(crate) id: ObjectId,
    pub(crate) owner: Option<AdmiralId>,
    pub(crate) location: Coord,
    pub(crate) direction: i32,
    pub(crate) attributes: Attributes,
    pub(crate) runtime: RuntimeFlags,
    pub(crate) health: i32,
    pub(crate) longest_weapon_range: u32,
}

impl Sighting {
    pub(crate) fn of(world: &World, id: ObjectId) -> Option<Self> {
        let object = world.object(id).filter(|object| object.is_in_use())?;
        Some(Self {
            id,
            owner: object.owner,
            location: object.location,
            direction: object.direction,
            attributes: object.attributes,
            runtime: object.runtime,
            health: object.health,
            longest_weapon_range: object.longest_weapon_range,
        })
    }
}

/// Decisions of one pilot pass that need the world to carry out.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Orders {
    pub(crate) keys: Keys,
    pub(crate) arrived: bool,
    pub(crate) lost_destination: bool,
}

/// Picks the object to attack: the current target, else a hostile
/// destination, switching to the closest foe when it is much nearer.
pub(crate) fn resolve_target(world: &World, object: &SpaceObject) -> Option<(Sighting, u64)> {
    let hostile = |sighting: &Sighting| sighting.owner != object.owner;
    let mut target = Sighting::of(world, object.target)
        .filter(hostile)
        .or_else(|| Sighting::of(world, object.dest).filter(hostile));

    if let Some(closest) = Sighting::of(world, object.closest).filter(hostile) {
        match target {
            None => target = Some(closest),
            Some(current)
                if current.id != closest.id
                    && !object.attributes.contains(Attributes::IS_GUIDED) =>
            {
                let distance = object.location.distance_squared(current.location);
                if distance >> 1 > object.closest_distance
                    || !object.attributes.contains(Attributes::CAN_ENGAGE)
                    || object.is_remote_or_human()
                {
                    target = Some(closest);
                }
            }
            Some(_) => {}
        }
    }
    target.map(|sighting| (sighting, object.location.distance_squared(sighting.location)))
}

/// Steers a computer-flown object for one major tick.
pub(crate) fn steer(
    object: &mut SpaceObject,
    level: &Level,
    template: &BaseObject,
    target: Option<(Sighting, u64)>,
    dest: Option<Sighting>,
    ticks: i32,
) -> Orders {
    let mut orders = Orders::default();
    object.target = target.map_or(ObjectId::none(), |(sighting, _)| sighting.id);
    let guided = object.attributes.contains(Attributes::IS_GUIDED);
    let arrive_range = squared(template.arrive_distance);

    let engaging = target.filter(|(sighting, distance)| {
        guided
            || (object.attributes.contains(Attributes::CAN_ENGAGE)
                && !object.is_remote_or_human()
                && *distance < object.engage_range
                && object.time_from_origin < TIME_TO_CHECK_HOME
                && sighting.attributes.contains(Attributes::CAN_BE_ENGAGED))
    });

    if let Some((target, distance)) = engaging {
        let (keys, theta) = engage(object, level, &target, distance, ticks);
        orders.keys |= keys;

        let threatened = object.attributes.contains(Attributes::CAN_EVADE)
            && target.attributes.contains(Attributes::CAN_BE_EVADED)
            && target.attributes.contains(Attributes::HATED)
            && distance < squared(target.longest_weapon_range)
            && theta.abs() < PARANOIA_ANGLE
            && (!target.attributes.contains(Attributes::CAN_BE_ENGAGED)
                || object.health <= target.health);
        if threatened {
            orders.keys |= evade(object, &target, theta);
        } else if distance > squared(object.shortest_weapon_range) || guided {
            orders.keys |= Keys::UP;
        } else {
            orders.keys |= keep_distance(object, distance);
        }

        if dest.is_some_and(|dest| dest.id == target.id) && distance < arrive_range {
            orders.arrived = true;
        }
        return orders;
    }

    if guided {
        orders.keys |= Keys::UP;
        return orders;
    }

    // Heading home still shoots at anything that comes within reach.
    if let Some((target, distance)) = target {
        if !object.is_remote_or_human() && distance < object.engage_range {
            let (keys, _) = engage(object, level, &target, distance, ticks);
            orders.keys |= keys & (Keys::PULSE | Keys::BEAM | Keys::SPECIAL);
        }
    }

    head_home(object, template, dest, &mut orders);
    orders
}

fn engage(
    object: &mut SpaceObject,
    level: &Level,
    target: &Sighting,
    distance: u64,
    ticks: i32,
) -> (Keys, i32) {
    let mut aim = target.location;
    if target.runtime.contains(RuntimeFlags::IS_CLOAKED) {
        let h = object.random.next(140) - 70;
        let v = object.random.next(140) - 70;
        aim = aim.offset(Point::new(h, v));
    }

    let hated = target.attributes.contains(Attributes::HATED);
    let in_range = distance < squared(object.longest_weapon_range);
    if in_range
        && hated
        && target.attributes.contains(Attributes::CAN_BE_ENGAGED)
        && object.attributes.contains(Attributes::CAN_ACCEPT_DESTINATION)
    {
        object.time_from_origin = object.time_from_origin.saturating_add(ticks);
    }

    let angle = heading(object.location, aim);
    object.target_angle = angle;
    let theta = if object.attributes.contains(Attributes::HAS_DIRECTION_GOAL) {
        if rotation::angle_difference(object.direction_goal, angle).abs() > DIRECTION_ERROR
            || !object.attributes.contains(Attributes::IS_GUIDED)
        {
            object.direction_goal = angle;
        }
        rotation::angle_difference(angle, rotation::normalize_angle(target.direction + 180))
    } else {
        object.direction = angle;
        0
    };

    let mut keys = Keys::NONE;
    if in_range && hated {
        let off_bore = rotation::angle_difference(object.direction, angle).abs();
        for (slot, key) in FIRING {
            let Some(weapon) = object.weapons[slot.index()]
                .base
                .and_then(|base| level.template(base))
            else {
                continue;
            };
            let Some(stats) = weapon.weapon else {
                continue;
            };
            let aimed =
                off_bore <= SHOOT_ANGLE || weapon.attributes.contains(Attributes::AUTO_TARGET);
            if stats.usage_attacking && aimed && distance < squared(stats.range) {
                keys.insert(key);
            }
        }
    }
    (keys, theta)
}

fn evade(object: &mut SpaceObject, target: &Sighting, theta: i32) -> Keys {
    if !object.attributes.contains(Attributes::HAS_DIRECTION_GOAL) {
        let beta = if object.random.next(2) == 1 {
            -EVADE_ANGLE
        } else {
            EVADE_ANGLE
        };
        object.direction = rotation::normalize_angle(object.direction + beta);
        return Keys::UP;
    }

    let angle = if target.attributes.contains(Attributes::IS_GUIDED) {
        90
    } else {
        EVADE_ANGLE
    };
    let beta = match theta {
        t if t > 0 => angle,
        t if t < 0 => -angle,
        _ if object.location.h & 1 == 1 => -angle,
        _ => angle,
    };
    object.direction_goal = rotation::normalize_angle(target.direction + beta);
    Keys::UP
}

/// Holds position near the target: brakes while closing in, thrusts when falling behind.
fn keep_distance(object: &mut SpaceObject, distance: u64) -> Keys {
    if distance < MOTION_MARGIN || distance + MOTION_MARGIN < object.last_target_distance {
        object.last_target_distance = distance;
        Keys::DOWN
    } else if distance.saturating_sub(MOTION_MARGIN) > object.last_target_distance {
        object.last_target_distance = distance;
        Keys::UP
    } else {
        Keys::NONE
    }
}

fn head_home(
    object: &mut SpaceObject,
    template: &BaseObject,
    dest: Option<Sighting>,
    orders: &mut Orders,
) {
    if object.attributes.contains(Attributes::IS_DESTINATION) || object.dest.is_none() {
        orders.keys |= Keys::DOWN;
        object.time_from_origin = 0;
        return;
    }
    let Some(dest) = dest else {
        orders.keys |= Keys::DOWN;
        orders.lost_destination = true;
        return;
    };

    let distance = object.location.distance_squared(dest.location);
    let angle = heading(object.location, dest.location);
    let theta = if object.attributes.contains(Attributes::HAS_DIRECTION_GOAL) {
        if rotation::angle_difference(angle, object.direction_goal).abs() > DIRECTION_ERROR {
            object.direction_goal = angle;
        }
        rotation::angle_difference(object.direction, object.direction_goal).abs()
    } else {
        object.direction = angle;
        0
    };

    if distance < ENGAGE_RANGE {
        object.time_from_origin = 0;
    }

    let arrive_range = squared(template.arrive_distance);
    if distance > arrive_range {
        if theta < EVADE_ANGLE {
            orders.keys |= Keys::UP;
        }
        object.last_target_distance = distance;
        let charged = object.energy > template.energy >> WARP_IN_ENERGY_SHIFT;
        if template.warp_speed.is_positive()
            && charged
            && distance > WARP_IN_DISTANCE
            && theta <= DIRECTION_ERROR
        {
            orders.keys |= Keys::WARP;
        }
        return;
    }

    let formation = Attributes::HAS_DIRECTION_GOAL;
    if dest.owner == object.owner
        && dest.attributes.contains(formation)
        && object.attributes.contains(formation)
    {
        object.direction_goal = dest.direction;
    }
    if distance < arrive_range {
        orders.arrived = true;
    }
    if distance + MOTION_MARGIN < object.last_target_distance {
        orders.keys |= Keys::DOWN;
        object.last_target_distance = distance;
    } else if distance.saturating_sub(MOTION_MARGIN) > object.last_target_distance {
        orders.keys |= if theta < EVADE_ANGLE {
            Keys::UP
        } else {
            Keys::DOWN
        };
        object.last_target_distance = distance;
    }
}

/// Heading from one location toward another.
pub(crate) fn heading(from: Coord, to: Coord) -> i32 {
    let delta = from.delta_to(to);
    rotation::ratio_to_angle(i64::from(delta.h), i64::from(delta.v))
}

pub(crate) fn squared(range: u32) -> u64 {
    u64::from(range) * u64::from(range)
}
