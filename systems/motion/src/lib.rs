#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic motion system that turns, accelerates and displaces objects.
//!
//! Motion runs once per minor tick over the alive sequence. Every quantity
//! is fixed point; sub-unit movement is carried in the per-object fractions
//! so that identical inputs always land on identical coordinates.

use flotilla_core::{
    rotation, Attributes, Fixed, FixedPoint, ObjectId, Point, THINKIVERSE_HALF_EXTENT,
    UNIVERSAL_CENTER,
};
use flotilla_world::{ObjectState, Presence, SpaceObject, World};
use tracing::debug;

/// Turn rate of goal-directed objects whose template sets none, in degrees per minor tick.
pub const DEFAULT_TURN_RATE: Fixed = Fixed::from_int(2);

const LOWER_EDGE: u32 = UNIVERSAL_CENTER - THINKIVERSE_HALF_EXTENT;
const UPPER_EDGE: u32 = UNIVERSAL_CENTER + THINKIVERSE_HALF_EXTENT;

/// Moves every object in play.
#[derive(Debug, Default)]
pub struct Motion {
    handles: Vec<ObjectId>,
}

impl Motion {
    /// Creates the system with an empty scratch buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances motion by `minor_ticks` and settles landing and warp state.
    ///
    /// Objects that leave the playable area are marked for removal unless
    /// they bounce. Collision bounds and grid cells are refreshed once at the
    /// end of the call.
    pub fn advance(&mut self, world: &mut World, minor_ticks: i32) {
        let level = world.level_arc();
        world.objects().alive_handles(&mut self.handles);

        for _ in 0..minor_ticks {
            for &id in &self.handles {
                let Some(object) = world.object_mut(id) else {
                    continue;
                };
                if !object.is_in_use() {
                    continue;
                }
                move_object(object);
                if !confine(object) {
                    debug!(object = ?id, "left the playable area");
                }
            }
        }

        for &id in &self.handles {
            let Some(object) = world.object_mut(id) else {
                continue;
            };
            if !object.is_in_use() {
                continue;
            }
            settle_presence(object);
            let size = level.template(object.base).map_or(0, |template| template.size);
            object.refresh_cells();
            object.update_bounds(size);
        }
    }
}

fn move_object(object: &mut SpaceObject) {
    let can_turn = object.attributes.contains(Attributes::CAN_TURN);
    let warping = matches!(object.presence, Presence::Warping { .. });
    if !object.max_velocity.is_positive() && !can_turn && !warping {
        return;
    }

    if can_turn {
        let step = if object.attributes.contains(Attributes::HAS_DIRECTION_GOAL) {
            let rate = if object.max_turn_rate.is_positive() {
                object.max_turn_rate
            } else {
                DEFAULT_TURN_RATE
            };
            let wanted = rotation::angle_difference(object.direction, object.direction_goal);
            Fixed::from_int(wanted).clamp(-rate, rate)
        } else {
            object.turn_velocity
        };
        object.turn_fraction += step;
        let whole = object.turn_fraction.round();
        object.direction = rotation::normalize_angle(object.direction + whole);
        object.turn_fraction -= Fixed::from_int(whole);
    }

    if object.thrust != Fixed::ZERO {
        let (wanted, thrust) = if object.thrust.is_positive() {
            let speed = match object.presence {
                Presence::Warping { speed } => speed,
                _ => object.max_velocity,
            };
            let heading = rotation::rot_point(object.direction);
            (
                FixedPoint::new(
                    heading.h.mul(speed) - object.velocity.h,
                    heading.v.mul(speed) - object.velocity.v,
                ),
                object.thrust,
            )
        } else {
            (
                FixedPoint::new(-object.velocity.h, -object.velocity.v),
                -object.thrust,
            )
        };
        let angle = rotation::ratio_to_angle(i64::from(wanted.h.raw()), i64::from(wanted.v.raw()));
        let cap = rotation::rot_point(angle);
        object.velocity.h += clamp_toward(wanted.h, cap.h.mul(thrust));
        object.velocity.v += clamp_toward(wanted.v, cap.v.mul(thrust));
    }

    object.motion_fraction.h += object.velocity.h;
    object.motion_fraction.v += object.velocity.v;
    let h = object.motion_fraction.h.round();
    let v = object.motion_fraction.v.round();
    object.motion_fraction.h -= Fixed::from_int(h);
    object.motion_fraction.v -= Fixed::from_int(v);
    object.location = object.location.offset(Point::new(h, v));
}

/// Limits `value` to `limit` on the side `limit` points to.
fn clamp_toward(value: Fixed, limit: Fixed) -> Fixed {
    if limit < Fixed::ZERO {
        value.max(limit)
    } else {
        value.min(limit)
    }
}

/// Keeps the object inside the playable area; returns `false` when it was removed.
fn confine(object: &mut SpaceObject) -> bool {
    let location = object.location;
    let outside = |axis: u32| !(LOWER_EDGE..=UPPER_EDGE).contains(&axis);
    if !object.attributes.contains(Attributes::DOES_BOUNCE) {
        if outside(location.h) || outside(location.v) {
            object.state = ObjectState::ToBeFreed;
            return false;
        }
        return true;
    }

    if outside(location.h) {
        object.location.h = location.h.clamp(LOWER_EDGE, UPPER_EDGE);
        object.velocity.h = -object.velocity.h;
    }
    if outside(location.v) {
        object.location.v = location.v.clamp(LOWER_EDGE, UPPER_EDGE);
        object.velocity.v = -object.velocity.v;
    }
    true
}

fn settle_presence(object: &mut SpaceObject) {
    match object.presence {
        Presence::Normal => {}
        Presence::Landing { speed } => {
            object.thrust = -object.max_thrust;
            object.scale -= Fixed::from_raw(speed);
            if !object.scale.is_positive() {
                object.scale = Fixed::ZERO;
                object.state = ObjectState::ToBeFreed;
            }
        }
        Presence::Warping { .. } => {
            object.thrust = object.max_thrust;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flotilla_core::{BaseId, BaseObject, Coord, LevelBuilder};
    use flotilla_world::{Config, SpawnRequest};

    fn world_with(template: BaseObject) -> (World, BaseId) {
        let mut builder = LevelBuilder::new("motion");
        let base = builder.add_template(template);
        let world = World::from_level(builder.build(), Config::default()).expect("valid level");
        (world, base)
    }

    fn spawn_at(world: &mut World, base: BaseId, location: Coord) -> ObjectId {
        let mut out = Vec::new();
        world
            .spawn(SpawnRequest::new(base, location), &mut out)
            .expect("room")
    }

    #[test]
    fn velocity_displaces_one_step_per_minor_tick() {
        let mut rock = BaseObject::named("Rock");
        rock.max_velocity = Fixed::from_int(4);
        let (mut world, base) = world_with(rock);
        let id = spawn_at(&mut world, base, Coord::from_center(0, 0));
        if let Some(object) = world.object_mut(id) {
            object.velocity = FixedPoint::new(Fixed::ONE, -Fixed::HALF);
        }

        Motion::new().advance(&mut world, 3);

        let object = world.object(id).expect("present");
        assert_eq!(object.location, Coord::from_center(3, -1));
        assert_eq!(object.motion_fraction.v, -Fixed::HALF);
    }

    #[test]
    fn thrust_accelerates_up_to_the_speed_limit() {
        let mut ship = BaseObject::named("Ship");
        ship.max_velocity = Fixed::from_int(2);
        ship.max_thrust = Fixed::ONE;
        ship.initial_direction = 90;
        let (mut world, base) = world_with(ship);
        let id = spawn_at(&mut world, base, Coord::from_center(0, 0));

        let mut motion = Motion::new();
        motion.advance(&mut world, 1);
        assert_eq!(world.object(id).map(|o| o.velocity.h), Some(Fixed::ONE));

        motion.advance(&mut world, 5);
        let object = world.object(id).expect("present");
        assert_eq!(object.velocity, FixedPoint::new(Fixed::from_int(2), Fixed::ZERO));
    }

    #[test]
    fn goal_directed_objects_turn_at_their_rate() {
        let mut ship = BaseObject::named("Ship");
        ship.attributes = Attributes::CAN_TURN | Attributes::HAS_DIRECTION_GOAL;
        ship.max_turn_rate = Fixed::from_int(5);
        let (mut world, base) = world_with(ship);
        let id = spawn_at(&mut world, base, Coord::from_center(0, 0));
        if let Some(object) = world.object_mut(id) {
            object.direction_goal = 90;
        }

        let mut motion = Motion::new();
        motion.advance(&mut world, 3);
        assert_eq!(world.object(id).map(|o| o.direction), Some(15));

        motion.advance(&mut world, 30);
        assert_eq!(world.object(id).map(|o| o.direction), Some(90));
    }

    #[test]
    fn leaving_the_area_frees_unless_the_object_bounces() {
        let mut rock = BaseObject::named("Rock");
        rock.max_velocity = Fixed::from_int(8);
        let mut ball = rock.clone();
        ball.attributes = Attributes::DOES_BOUNCE;
        let mut builder = LevelBuilder::new("edge");
        let rock = builder.add_template(rock);
        let ball = builder.add_template(ball);
        let mut world = World::from_level(builder.build(), Config::default()).expect("valid");
        let edge = THINKIVERSE_HALF_EXTENT as i32 - 1;
        let rock = spawn_at(&mut world, rock, Coord::from_center(edge, 0));
        let ball = spawn_at(&mut world, ball, Coord::from_center(edge, 0));
        for id in [rock, ball] {
            if let Some(object) = world.object_mut(id) {
                object.velocity.h = Fixed::from_int(4);
            }
        }

        Motion::new().advance(&mut world, 1);

        assert_eq!(
            world.object(rock).map(|o| o.state),
            Some(ObjectState::ToBeFreed)
        );
        let ball = world.object(ball).expect("present");
        assert!(ball.is_in_use());
        assert_eq!(ball.location.h, UPPER_EDGE);
        assert_eq!(ball.velocity.h, Fixed::from_int(-4));
    }

    #[test]
    fn landing_objects_shrink_until_they_are_gone() {
        let (mut world, base) = world_with(BaseObject::named("Shuttle"));
        let id = spawn_at(&mut world, base, Coord::from_center(0, 0));
        if let Some(object) = world.object_mut(id) {
            object.presence = Presence::Landing { speed: 0x8000 };
        }

        let mut motion = Motion::new();
        motion.advance(&mut world, 3);
        assert_eq!(world.object(id).map(|o| o.scale), Some(Fixed::HALF));
        motion.advance(&mut world, 3);
        assert_eq!(
            world.object(id).map(|o| o.state),
            Some(ObjectState::ToBeFreed)
        );
    }
}
