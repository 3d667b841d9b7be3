//! The `Alter` verb: in-place changes to one object, an admiral or the conditions.

use flotilla_core::{
    rotation, Action, AdmiralId, Alter, AlterKind, Attributes, BaseId, Coord, Event, Fixed,
    FixedPoint, KeyTag, ObjectId, Point, RandomSource, RuntimeFlags, WeaponSlot,
};
use flotilla_world::{InvariantError, World};

use crate::{Interpreter, Targets};

impl Interpreter {
    pub(crate) fn alter(
        &mut self,
        world: &mut World,
        action: &Action,
        alter: &Alter,
        targets: Targets,
        out: &mut Vec<Event>,
    ) -> Result<(), InvariantError> {
        let Targets {
            subject,
            direct,
            focus,
        } = targets;
        let (min, range, relative) = (alter.minimum, alter.range, alter.relative);
        let level = world.level_arc();

        match alter.kind {
            AlterKind::Damage => {
                let killer = world.object(subject).and_then(|object| object.owner);
                self.alter_health(world, focus, min, killer, out)?;
            }
            AlterKind::Energy => world.alter_energy(focus, min),
            AlterKind::Velocity => alter_velocity(world, subject, focus, min, relative),
            AlterKind::Thrust => {
                let amount = roll(world, focus, min, range);
                if let Some(object) = world.object_mut(focus) {
                    let amount = Fixed::from_raw(amount);
                    object.thrust = if relative {
                        object.thrust + amount
                    } else {
                        amount
                    };
                }
            }
            AlterKind::MaxThrust => {
                if let Some(object) = world.object_mut(focus) {
                    object.max_thrust = adjust(object.max_thrust, min, relative);
                }
            }
            AlterKind::MaxTurnRate => {
                if let Some(object) = world.object_mut(focus) {
                    object.max_turn_rate = adjust(object.max_turn_rate, min, relative);
                }
            }
            AlterKind::MaxVelocity => {
                let Some(object) = world.object_mut(focus) else {
                    return Ok(());
                };
                object.max_velocity = if min < 0 {
                    level
                        .template(object.base)
                        .map_or(object.max_velocity, |template| template.max_velocity)
                } else {
                    Fixed::from_raw(min)
                };
            }
            AlterKind::Scale => {
                let Some(object) = world.object_mut(focus) else {
                    return Ok(());
                };
                object.scale = adjust(object.scale, min, relative);
                let size = level.template(object.base).map_or(0, |template| template.size);
                object.update_bounds(size);
            }
            AlterKind::Location => {
                let anchor = if relative {
                    world
                        .object(subject)
                        .or_else(|| world.object(focus))
                        .map(|object| object.location)
                } else {
                    Some(Coord::from_center(0, 0))
                };
                let Some(anchor) = anchor else {
                    return Ok(());
                };
                place(world, focus, anchor, |object| {
                    let h = object.random.next(min.saturating_mul(2)) - min;
                    let v = object.random.next(min.saturating_mul(2)) - min;
                    Point::new(h, v)
                });
            }
            AlterKind::AbsoluteLocation => {
                let anchor = if relative {
                    match world.object(focus) {
                        Some(object) => object.location.offset(Point::new(min, range)),
                        None => return Ok(()),
                    }
                } else {
                    Coord::from_center(min, range)
                };
                place(world, focus, anchor, |_| Point::new(0, 0));
            }
            AlterKind::Weapon1 | AlterKind::Weapon2 | AlterKind::Special => {
                let slot = match alter.kind {
                    AlterKind::Weapon1 => WeaponSlot::Pulse,
                    AlterKind::Weapon2 => WeaponSlot::Beam,
                    _ => WeaponSlot::Special,
                };
                let weapon = u32::try_from(min).ok().map(BaseId::new);
                if let Some(object) = world.object_mut(focus) {
                    object.mount_weapon(&level, slot, weapon);
                }
            }
            AlterKind::Owner => {
                let (owner, message) = if relative {
                    let source = if action.reflexive && world.object(direct).is_some() {
                        direct
                    } else {
                        subject
                    };
                    (world.object(source).and_then(|object| object.owner), true)
                } else {
                    (admiral_at(world, min), false)
                };
                world.alter_object_owner(focus, owner, message, out)?;
            }
            AlterKind::Hidden => self.unhide_initials(world, min, min.saturating_add(range), out)?,
            AlterKind::Cloak => {
                if let Some(object) = world.object_mut(focus) {
                    object.runtime.insert(RuntimeFlags::IS_CLOAKED);
                }
            }
            AlterKind::Offline => {
                let amount = roll(world, focus, min, range);
                if let Some(object) = world.object_mut(focus) {
                    let mass = level
                        .template(object.base)
                        .map_or(Fixed::ZERO, |template| template.mass);
                    object.offline_time = Fixed::from_raw(amount)
                        .checked_div(mass)
                        .map_or(-1, Fixed::to_int);
                }
            }
            AlterKind::Spin => {
                let amount = roll(world, focus, min, range);
                let Some(object) = world.object_mut(focus) else {
                    return Ok(());
                };
                if !object.attributes.contains(Attributes::CAN_TURN) {
                    return Ok(());
                }
                let Some(template) = level.template(object.base) else {
                    return Ok(());
                };
                let rate = if object.attributes.contains(Attributes::SHAPE_FROM_DIRECTION) {
                    template.max_turn_rate
                } else {
                    Fixed::from_raw(2)
                };
                object.turn_velocity = rate
                    .mul(Fixed::from_raw(amount))
                    .checked_div(template.mass)
                    .unwrap_or(Fixed::UNSET);
            }
            AlterKind::BaseType => {
                if action.reflexive || world.object(direct).is_some() {
                    if let Ok(base) = u32::try_from(min) {
                        world.change_base_type(focus, BaseId::new(base), relative);
                    }
                }
            }
            AlterKind::ConditionTrueYet => {
                let last = if range <= 0 { min } else { min.saturating_add(range) };
                for index in min.max(0)..=last {
                    if let Ok(index) = usize::try_from(index) {
                        world.set_condition_enabled(index, relative);
                    }
                }
            }
            AlterKind::Occupation => {
                let admiral = world.object(subject).and_then(|object| object.owner);
                world.alter_object_occupation(focus, admiral, min, true, out)?;
            }
            AlterKind::AbsoluteCash => {
                let admiral = if relative {
                    world.object(focus).and_then(|object| object.owner)
                } else {
                    admiral_at(world, range)
                };
                if let Some(state) = admiral.and_then(|admiral| world.admiral_mut(admiral)) {
                    state.pay_absolute(Fixed::from_int(min));
                }
            }
            AlterKind::Age => {
                let amount = roll(world, focus, min, range);
                if let Some(object) = world.object_mut(focus) {
                    if !relative {
                        object.age = amount;
                    } else if object.age >= 0 {
                        object.age = object.age.saturating_add(amount).max(0);
                    } else {
                        object.age = object.age.saturating_add(amount);
                    }
                }
            }
            AlterKind::Attributes => {
                if let Some(object) = world.object_mut(focus) {
                    object.attributes.insert(Attributes::from_bits(min as u32));
                    object.attributes.remove(Attributes::from_bits(range as u32));
                }
            }
            AlterKind::LevelKeyTag => {
                if let Some(object) = world.object_mut(focus) {
                    object.level_key_tag = key_tag(min);
                }
            }
            AlterKind::OrderKeyTag => {
                if let Some(object) = world.object_mut(focus) {
                    object.order_key_tag = key_tag(min);
                }
            }
            AlterKind::EngageKeyTag => {
                if let Some(object) = world.object_mut(focus) {
                    object.engage_key_tag = key_tag(min);
                }
            }
        }
        Ok(())
    }
}

/// Pushes, brakes or bursts the focus.
///
/// A relative change with a separate direct object pushes it away from the
/// subject like a collision would, or scales its velocity when `min` is
/// negative, then clamps it to its speed limit. Without a direct object the
/// focus bursts along its own heading.
fn alter_velocity(world: &mut World, subject: ObjectId, focus: ObjectId, min: i32, relative: bool) {
    let level = world.level_arc();
    let Some(source) = world.object(subject) else {
        return;
    };
    let (pusher_velocity, pusher_direction) = (source.velocity, source.direction);

    let Some(object) = world.object_mut(focus) else {
        return;
    };
    if focus == subject {
        let burst = rotation::rot_point(object.direction);
        let amount = Fixed::from_raw(min);
        let burst = FixedPoint::new(burst.h.mul(amount), burst.v.mul(amount));
        object.velocity = if relative {
            FixedPoint::new(object.velocity.h + burst.h, object.velocity.v + burst.v)
        } else {
            burst
        };
        return;
    }

    if !relative {
        let heading = rotation::rot_point(pusher_direction);
        let amount = Fixed::from_raw(min);
        object.velocity = FixedPoint::new(heading.h.mul(amount), heading.v.mul(amount));
        return;
    }

    let mass = level
        .template(object.base)
        .map_or(Fixed::ZERO, |template| template.mass);
    if !mass.is_positive() || !object.max_velocity.is_positive() {
        return;
    }
    if min >= 0 {
        let push = |pusher: Fixed, pushed: Fixed| {
            Fixed::from_raw(((pusher - pushed).raw() / mass.raw()) << 6)
        };
        object.velocity.h += push(pusher_velocity.h, object.velocity.h);
        object.velocity.v += push(pusher_velocity.v, object.velocity.v);
    } else {
        let factor = Fixed::from_raw(min);
        object.velocity.h += object.velocity.h.mul(factor);
        object.velocity.v += object.velocity.v.mul(factor);
    }

    let angle = rotation::ratio_to_angle(
        i64::from(object.velocity.h.raw()),
        i64::from(object.velocity.v.raw()),
    );
    let limit = rotation::rot_point(angle);
    object.velocity.h = clamp_toward(object.velocity.h, limit.h.mul(object.max_velocity));
    object.velocity.v = clamp_toward(object.velocity.v, limit.v.mul(object.max_velocity));
}

fn clamp_toward(value: Fixed, limit: Fixed) -> Fixed {
    if limit < Fixed::ZERO {
        value.max(limit)
    } else {
        value.min(limit)
    }
}

fn place(
    world: &mut World,
    focus: ObjectId,
    anchor: Coord,
    scatter: impl FnOnce(&mut flotilla_world::SpaceObject) -> Point,
) {
    let size = world
        .object(focus)
        .and_then(|object| world.level().template(object.base))
        .map_or(0, |template| template.size);
    let Some(object) = world.object_mut(focus) else {
        return;
    };
    let by = scatter(object);
    object.location = anchor.offset(by);
    object.refresh_cells();
    object.update_bounds(size);
}

fn roll(world: &mut World, id: ObjectId, min: i32, range: i32) -> i32 {
    let extra = match world.object_mut(id) {
        Some(object) if range > 0 => object.random.next(range),
        _ => 0,
    };
    min.saturating_add(extra)
}

fn adjust(value: Fixed, amount: i32, relative: bool) -> Fixed {
    if relative {
        value + Fixed::from_raw(amount)
    } else {
        Fixed::from_raw(amount)
    }
}

fn admiral_at(world: &World, index: i32) -> Option<AdmiralId> {
    let index = u8::try_from(index).ok()?;
    let admiral = AdmiralId::new(index);
    world.admiral(admiral).map(|_| admiral)
}

fn key_tag(value: i32) -> KeyTag {
    KeyTag::new(u8::try_from(value).unwrap_or(0))
}
