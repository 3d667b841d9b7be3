#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Collision and locality system.
//!
//! Objects are bucketed twice per major tick: on a fine grid for impacts and
//! on a coarse grid for locality. Impacts damage both parties and push
//! space-occupying hulls apart. Locality tallies the friendly and hostile
//! strength around every object, records the closest engageable foe and
//! hides objects that come near a foe with a hiding effect.

mod grid;

use flotilla_core::{
    rotation, Attributes, BuildFlags, Event, Fixed, FixedPoint, Level, ObjectId, Point,
    RuntimeFlags, MAXIMUM_RELEVANT_DISTANCE, MAXIMUM_RELEVANT_DISTANCE_SQUARED,
};
use flotilla_system_actions::Interpreter;
use flotilla_world::{InvariantError, SpaceObject, World};
use tracing::{debug, trace};

use grid::ProximityGrid;

/// Attributes that put an object on the locality grid.
pub const CONSIDER_DISTANCE_ATTRIBUTES: Attributes = Attributes::from_bits(
    Attributes::CAN_COLLIDE.bits()
        | Attributes::CAN_BE_HIT.bits()
        | Attributes::IS_DESTINATION.bits()
        | Attributes::CAN_THINK.bits()
        | Attributes::CONSIDER_DISTANCE.bits()
        | Attributes::CAN_BE_EVADED.bits()
        | Attributes::IS_HUMAN_CONTROLLED.bits()
        | Attributes::IS_REMOTE.bits(),
);

/// Attributes that make an object notice its foes.
const NOTABLE: Attributes = Attributes::from_bits(
    Attributes::CAN_THINK.bits() | Attributes::REMOTE_OR_HUMAN.bits() | Attributes::HATED.bits(),
);

/// Steps taken to separate two hulls after a push before giving up.
const MAX_SEPARATION_STEPS: usize = 64;

/// Distance in units moved per separation step.
const SEPARATION_STEP: u32 = 2;

/// Resolves impacts and neighbourhoods.
#[derive(Debug, Default)]
pub struct Collision {
    handles: Vec<ObjectId>,
    impacts: ProximityGrid,
    locality: ProximityGrid,
    pairs: Vec<(ObjectId, ObjectId, bool)>,
}

impl Collision {
    /// Creates the system with empty grids.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the impact pass followed by the locality pass.
    pub fn resolve(
        &mut self,
        world: &mut World,
        interpreter: &mut Interpreter,
        out: &mut Vec<Event>,
    ) -> Result<(), InvariantError> {
        self.prepare(world);
        self.collide(world, interpreter, out)?;
        self.survey(world);
        Ok(())
    }

    /// Refreshes cells and bounds, resets locality tallies and fills both grids.
    fn prepare(&mut self, world: &mut World) {
        let level = world.level_arc();
        self.impacts.clear();
        self.locality.clear();
        world.objects().alive_handles(&mut self.handles);

        for &id in &self.handles {
            let Some(object) = world.object_mut(id) else {
                continue;
            };
            if !object.is_in_use() {
                continue;
            }
            let size = level.template(object.base).map_or(0, |template| template.size);
            object.refresh_cells();
            object.update_bounds(size);

            if object.attributes.intersects(CONSIDER_DISTANCE_ATTRIBUTES) {
                object.local_friend_strength = object.offense(&level);
                object.local_foe_strength = Fixed::ZERO;
                object.closest = ObjectId::none();
                object.closest_distance = MAXIMUM_RELEVANT_DISTANCE_SQUARED;
                object.runtime.remove(RuntimeFlags::IS_HIDDEN);
                self.locality.insert(id, object.distance_cell);
            }
            if object
                .attributes
                .intersects(Attributes::CAN_COLLIDE | Attributes::CAN_BE_HIT)
            {
                self.impacts.insert(id, object.collision_cell);
            }
        }
    }

    fn collide(
        &mut self,
        world: &mut World,
        interpreter: &mut Interpreter,
        out: &mut Vec<Event>,
    ) -> Result<(), InvariantError> {
        let level = world.level_arc();
        self.impacts.pairs(&mut self.pairs);
        for &(a, b, _) in &self.pairs {
            if !may_collide(world, a, b) {
                continue;
            }
            trace!(?a, ?b, "impact");
            interpreter.hit_object(world, a, b, out)?;
            interpreter.hit_object(world, b, a, out)?;
            if let Some((first, second)) = world.objects_mut().pair_mut(a, b) {
                push_apart(&level, first, second);
            }
        }
        Ok(())
    }

    fn survey(&mut self, world: &mut World) {
        let level = world.level_arc();
        self.locality.pairs(&mut self.pairs);
        for &(a, b, same_bucket) in &self.pairs {
            let Some((first, second)) = world.objects_mut().pair_mut(a, b) else {
                continue;
            };
            if !first.is_in_use() || !second.is_in_use() {
                continue;
            }
            let rivals = first.owner != second.owner;
            if rivals
                && first.attributes.intersects(NOTABLE)
                && second.attributes.intersects(NOTABLE)
            {
                let distance = relevant_distance(first, second);
                if distance < MAXIMUM_RELEVANT_DISTANCE_SQUARED {
                    shroud(first, second);
                    shroud(second, first);
                }
                consider_closest(&level, first, b, second, distance);
                consider_closest(&level, second, a, first, distance);
                exchange(first, second, true);
            } else if same_bucket {
                exchange(first, second, rivals);
            }
        }
    }
}

fn may_collide(world: &World, a: ObjectId, b: ObjectId) -> bool {
    let (Some(first), Some(second)) = (world.object(a), world.object(b)) else {
        return false;
    };
    if !first.is_in_use() || !second.is_in_use() || first.owner == second.owner {
        return false;
    }
    let either = first.attributes | second.attributes;
    if !either.contains(Attributes::CAN_COLLIDE) || !either.contains(Attributes::CAN_BE_HIT) {
        return false;
    }
    if first.attributes.contains(Attributes::IS_BEAM)
        && second.attributes.contains(Attributes::IS_BEAM)
    {
        return false;
    }
    first.bounds.intersects_inclusive(&second.bounds)
}

/// Squared distance, saturating once either axis is beyond relevance.
fn relevant_distance(a: &SpaceObject, b: &SpaceObject) -> u64 {
    let delta = a.location.delta_to(b.location);
    if delta.h.unsigned_abs() > MAXIMUM_RELEVANT_DISTANCE
        || delta.v.unsigned_abs() > MAXIMUM_RELEVANT_DISTANCE
    {
        MAXIMUM_RELEVANT_DISTANCE_SQUARED
    } else {
        a.location.distance_squared(b.location)
    }
}

fn shroud(source: &SpaceObject, other: &mut SpaceObject) {
    if source.attributes.contains(Attributes::HIDE_EFFECT) {
        other.runtime.insert(RuntimeFlags::IS_HIDDEN);
    }
}

fn consider_closest(
    level: &Level,
    object: &mut SpaceObject,
    other_id: ObjectId,
    other: &SpaceObject,
    distance: u64,
) {
    if distance < object.closest_distance
        && other.attributes.contains(Attributes::CAN_BE_ENGAGED)
        && engages(level, object, other)
    {
        object.closest = other_id;
        object.closest_distance = distance;
    }
}

/// Honours the engage key tags of templates that restrict who fights whom.
fn engages(level: &Level, object: &SpaceObject, other: &SpaceObject) -> bool {
    let restricted = |candidate: &SpaceObject, flag: BuildFlags| {
        level
            .template(candidate.base)
            .is_some_and(|template| template.build_flags.contains(flag))
    };
    if restricted(object, BuildFlags::CAN_ONLY_ENGAGE)
        && object.engage_key_tag != other.level_key_tag
    {
        return false;
    }
    if restricted(other, BuildFlags::ONLY_ENGAGED_BY)
        && other.engage_key_tag != object.level_key_tag
    {
        return false;
    }
    true
}

/// Adds the earlier object's local strengths to the later one's.
///
/// Rivals count each other's friends as foes; allies pass both tallies on.
fn exchange(first: &SpaceObject, second: &mut SpaceObject, rivals: bool) {
    if rivals {
        second.local_foe_strength = second
            .local_foe_strength
            .saturating_add(first.local_friend_strength);
        second.local_friend_strength = second
            .local_friend_strength
            .saturating_add(first.local_foe_strength);
    } else {
        second.local_foe_strength = second
            .local_foe_strength
            .saturating_add(first.local_foe_strength);
        second.local_friend_strength = second
            .local_friend_strength
            .saturating_add(first.local_friend_strength);
    }
}

/// Bounces two space-occupying hulls off each other and steps them apart.
fn push_apart(level: &Level, first: &mut SpaceObject, second: &mut SpaceObject) {
    if !first.is_in_use()
        || !second.is_in_use()
        || !first.attributes.contains(Attributes::OCCUPIES_SPACE)
        || !second.attributes.contains(Attributes::OCCUPIES_SPACE)
    {
        return;
    }
    let (Some(first_template), Some(second_template)) =
        (level.template(first.base), level.template(second.base))
    else {
        return;
    };

    let relative_h = i64::from(second.velocity.h.raw()) - i64::from(first.velocity.h.raw());
    let relative_v = i64::from(second.velocity.v.raw()) - i64::from(first.velocity.v.raw());
    let force = Fixed::from_raw(
        i32::try_from(integer_sqrt(relative_h * relative_h + relative_v * relative_v))
            .unwrap_or(i32::MAX),
    );

    let delta = second.location.delta_to(first.location);
    let angle = rotation::ratio_to_angle(i64::from(delta.h), i64::from(delta.v));
    let total_mass = first_template.mass + second_template.mass;

    first.velocity = recoil(angle, first_template.mass, total_mass, force, first.max_velocity);
    second.velocity = recoil(
        rotation::normalize_angle(angle + 180),
        second_template.mass,
        total_mass,
        force,
        second.max_velocity,
    );

    let away = rotation::rot_point(angle);
    let scale = Fixed::from_int(SEPARATION_STEP as i32);
    let step = Point::new(away.h.mul(scale).round(), away.v.mul(scale).round());
    let back = Point::new(-step.h, -step.v);
    let mut steps = 0;
    while first.bounds.intersects_inclusive(&second.bounds) && steps < MAX_SEPARATION_STEPS {
        first.location = first.location.offset(step);
        second.location = second.location.offset(back);
        first.update_bounds(first_template.size);
        second.update_bounds(second_template.size);
        steps += 1;
    }
    first.refresh_cells();
    second.refresh_cells();
    debug!(steps, "pushed hulls apart");
}

/// Velocity of one party after a push, shared out by mass.
fn recoil(angle: i32, mass: Fixed, total_mass: Fixed, force: Fixed, max_velocity: Fixed) -> FixedPoint {
    let share = mass
        .mul(force)
        .checked_div(total_mass)
        .unwrap_or(Fixed::UNSET);
    let speed = share + max_velocity.shr(1);
    let heading = rotation::rot_point(angle);
    FixedPoint::new(heading.h.mul(speed), heading.v.mul(speed))
}

fn integer_sqrt(value: i64) -> i64 {
    if value <= 0 {
        return 0;
    }
    let mut root = (value as f64).sqrt() as i64;
    while root * root > value {
        root -= 1;
    }
    while (root + 1) * (root + 1) <= value {
        root += 1;
    }
    root
}

#[cfg(test)]
mod tests {
    use super::*;
    use flotilla_core::{
        Action, AdmiralId, AdmiralSetup, Alter, AlterKind, BaseId, BaseObject, Coord, KeyTag,
        LevelBuilder, Verb,
    };
    use flotilla_world::{Config, SpawnRequest};

    const HULL: Attributes = Attributes::from_bits(
        Attributes::CAN_COLLIDE.bits()
            | Attributes::CAN_BE_HIT.bits()
            | Attributes::OCCUPIES_SPACE.bits(),
    );

    fn hull(name: &str) -> BaseObject {
        let mut hull = BaseObject::named(name);
        hull.attributes = HULL;
        hull.health = 100;
        hull.damage = 10;
        hull.size = 20;
        hull
    }

    fn spawn(world: &mut World, base: BaseId, owner: u8, at: (i32, i32)) -> ObjectId {
        let mut out = Vec::new();
        world
            .spawn(
                SpawnRequest::new(base, Coord::from_center(at.0, at.1))
                    .owned_by(Some(AdmiralId::new(owner))),
                &mut out,
            )
            .expect("room")
    }

    fn two_sides(name: &str) -> LevelBuilder {
        let mut builder = LevelBuilder::new(name);
        let _ = builder.add_admiral(AdmiralSetup::computer("Red"));
        let _ = builder.add_admiral(AdmiralSetup::computer("Blue"));
        builder
    }

    fn resolve(world: &mut World) -> Vec<Event> {
        let mut out = Vec::new();
        Collision::new()
            .resolve(world, &mut Interpreter::new(), &mut out)
            .expect("no invariant breaks");
        out
    }

    #[test]
    fn overlapping_rivals_damage_each_other_and_run_collide_lists() {
        let mut builder = two_sides("impact");
        let start = builder.push_actions([Action::new(Verb::Alter(Alter::adjust(
            AlterKind::Energy,
            -7,
        )))]);
        let mut ram = hull("Ram");
        ram.energy = 50;
        ram.actions.collide = start;
        let ram = builder.add_template(ram);
        let mut world = World::from_level(builder.build(), Config::default()).expect("valid");
        let a = spawn(&mut world, ram, 0, (0, 0));
        let b = spawn(&mut world, ram, 1, (5, 0));

        let _ = resolve(&mut world);

        for id in [a, b] {
            let object = world.object(id).expect("present");
            assert_eq!(object.health, 90);
            assert_eq!(object.energy, 43);
        }
    }

    #[test]
    fn allies_and_distant_super_cells_do_not_collide() {
        let mut builder = two_sides("no impact");
        let ram = builder.add_template(hull("Ram"));
        let mut world = World::from_level(builder.build(), Config::default()).expect("valid");
        let a = spawn(&mut world, ram, 0, (0, 0));
        let b = spawn(&mut world, ram, 0, (5, 0));
        let far = spawn(&mut world, ram, 1, (40_000, 0));

        let _ = resolve(&mut world);

        for id in [a, b, far] {
            assert_eq!(world.object(id).expect("present").health, 100);
        }
    }

    #[test]
    fn space_occupying_hulls_end_up_apart() {
        let mut builder = two_sides("push");
        let mut heavy = hull("Heavy");
        heavy.damage = 0;
        heavy.max_velocity = Fixed::from_int(2);
        let heavy = builder.add_template(heavy);
        let mut world = World::from_level(builder.build(), Config::default()).expect("valid");
        let a = spawn(&mut world, heavy, 0, (0, 0));
        let b = spawn(&mut world, heavy, 1, (6, 0));

        let _ = resolve(&mut world);

        let (first, second) = (
            world.object(a).expect("present"),
            world.object(b).expect("present"),
        );
        assert!(!first.bounds.intersects_inclusive(&second.bounds));
        assert!(first.location.h < second.location.h);
        assert!(first.velocity.h < Fixed::ZERO);
        assert!(second.velocity.h > Fixed::ZERO);
    }

    #[test]
    fn locality_tallies_strength_and_finds_the_closest_foe() {
        let mut builder = two_sides("locality");
        let mut fighter = BaseObject::named("Fighter");
        fighter.attributes = Attributes::CAN_THINK | Attributes::CAN_BE_ENGAGED;
        fighter.offense_value = Fixed::from_int(2);
        let fighter = builder.add_template(fighter);
        let mut shade = BaseObject::named("Shade");
        shade.attributes =
            Attributes::CAN_THINK | Attributes::CAN_BE_ENGAGED | Attributes::HIDE_EFFECT;
        shade.offense_value = Fixed::ONE;
        let shade = builder.add_template(shade);
        let mut world = World::from_level(builder.build(), Config::default()).expect("valid");
        let lead = spawn(&mut world, fighter, 0, (100, 0));
        let wing = spawn(&mut world, fighter, 0, (150, 0));
        let near = spawn(&mut world, shade, 1, (400, 0));
        let farther = spawn(&mut world, fighter, 1, (700, 0));

        let _ = resolve(&mut world);

        let lead = world.object(lead).expect("present");
        assert_eq!(lead.closest, near);
        assert_eq!(lead.closest_distance, 300 * 300);
        assert!(lead.runtime.contains(RuntimeFlags::IS_HIDDEN));
        assert_eq!(lead.local_friend_strength, Fixed::from_int(2));

        let near = world.object(near).expect("present");
        assert_eq!(near.closest, wing);
        assert_eq!(near.local_friend_strength, Fixed::ONE);
        assert_eq!(near.local_foe_strength, Fixed::from_int(6));

        let farther = world.object(farther).expect("present");
        assert_eq!(farther.closest, wing);
        assert!(!farther.runtime.contains(RuntimeFlags::IS_HIDDEN));
    }

    #[test]
    fn engage_key_tags_restrict_the_closest_foe() {
        let mut builder = two_sides("key tags");
        let mut picky = BaseObject::named("Picky");
        picky.attributes = Attributes::CAN_THINK | Attributes::CAN_BE_ENGAGED;
        picky.build_flags = BuildFlags::CAN_ONLY_ENGAGE;
        picky.engage_key_tag = KeyTag::new(3);
        let picky = builder.add_template(picky);
        let mut plain = BaseObject::named("Plain");
        plain.attributes = Attributes::CAN_THINK | Attributes::CAN_BE_ENGAGED;
        let plain = builder.add_template(plain);
        let mut world = World::from_level(builder.build(), Config::default()).expect("valid");
        let hunter = spawn(&mut world, picky, 0, (100, 0));
        let prey = spawn(&mut world, plain, 1, (200, 0));

        let _ = resolve(&mut world);

        assert!(world.object(hunter).expect("present").closest.is_none());
        assert_eq!(world.object(prey).expect("present").closest, hunter);
    }

    #[test]
    fn integer_square_root_is_exact_on_squares() {
        assert_eq!(integer_sqrt(0), 0);
        assert_eq!(integer_sqrt(65_536 * 65_536), 65_536);
        assert_eq!(integer_sqrt(99), 9);
    }
}
