//! Importance of sending a ship to a candidate destination.

use flotilla_core::{
    Attributes, BaseObject, Duty, Fixed, OrderFlags, MAXIMUM_RELEVANT_DISTANCE,
};
use flotilla_world::SpaceObject;

/// Worthless.
pub const UNIMPORTANT_TARGET: Fixed = Fixed::from_raw(0x0000);
/// Worth a look when nothing else is around.
pub const LEAST_IMPORTANT_TARGET: Fixed = Fixed::from_raw(0x0100);
/// Mildly interesting.
pub const SOMEWHAT_IMPORTANT_TARGET: Fixed = Fixed::from_raw(0x0120);
/// Interesting.
pub const VERY_IMPORTANT_TARGET: Fixed = Fixed::from_raw(0x0160);
/// Top priority among ordinary choices.
pub const MOST_IMPORTANT_TARGET: Fixed = Fixed::from_raw(0x0200);
/// An own base short of escorts.
pub const ABSOLUTELY_ESSENTIAL: Fixed = Fixed::from_raw(0x8000);

/// One side of a scoring decision.
pub(crate) struct Party<'a> {
    pub(crate) object: &'a SpaceObject,
    pub(crate) template: &'a BaseObject,
}

/// Scores `candidate` for `ship`, before jitter.
///
/// `blitzkrieg` is positive during the attack phase.
pub(crate) fn importance(ship: &Party<'_>, candidate: &Party<'_>, blitzkrieg: i32) -> Fixed {
    let flags = ship.template.order_flags;
    let dest = candidate.object;
    let is_base = dest.attributes.contains(Attributes::IS_DESTINATION);

    let (friend, foe) = if dest.owner == ship.object.owner {
        (dest.local_friend_strength, dest.local_foe_strength)
    } else {
        (dest.local_foe_strength, dest.local_friend_strength)
    };
    let short_of_escorts = dest.escort_strength < candidate.template.friend_deficit;

    let mut value = UNIMPORTANT_TARGET;
    if dest.owner == ship.object.owner {
        if is_base {
            value = if short_of_escorts {
                ABSOLUTELY_ESSENTIAL
            } else if foe != Fixed::ZERO {
                if foe >= friend {
                    MOST_IMPORTANT_TARGET
                } else if foe > friend.shr(1) {
                    VERY_IMPORTANT_TARGET
                } else {
                    UNIMPORTANT_TARGET
                }
            } else {
                UNIMPORTANT_TARGET
            };
            value = prefer_base(value, flags, 3);
        } else {
            let outranked = candidate.template.destination_class > ship.template.destination_class;
            if outranked && (foe > friend || short_of_escorts) {
                value = MOST_IMPORTANT_TARGET;
            }
            value = prefer_ship(value, flags, 3);
        }
        if flags.contains(OrderFlags::TARGET_IS_FRIEND) {
            value = value.shl(3);
        }
        if flags.contains(OrderFlags::HARD_TARGET_IS_FOE) {
            value = Fixed::ZERO;
        }
    } else if dest.owner.is_some() {
        if matches!(ship.object.duty, Duty::Guard | Duty::NoDuty) {
            if is_base {
                value = if foe < friend {
                    MOST_IMPORTANT_TARGET
                } else {
                    SOMEWHAT_IMPORTANT_TARGET
                };
                if blitzkrieg > 0 {
                    value = value.shl(2);
                }
                value = prefer_base(value, flags, 3);
            } else {
                value = if friend == Fixed::ZERO {
                    LEAST_IMPORTANT_TARGET
                } else if friend < foe {
                    SOMEWHAT_IMPORTANT_TARGET
                } else {
                    UNIMPORTANT_TARGET
                };
                value = prefer_ship(value, flags, 1);
            }
        }
        value = prefer_foe(value, flags);
    } else {
        if is_base {
            value = VERY_IMPORTANT_TARGET;
            if blitzkrieg > 0 {
                value = value.shl(2);
            }
            value = prefer_base(value, flags, 3);
        } else {
            value = prefer_ship(value, flags, 3);
        }
        value = prefer_foe(value, flags);
    }

    let delta = ship.object.location.delta_to(dest.location);
    let local = delta.h.unsigned_abs() < MAXIMUM_RELEVANT_DISTANCE
        && delta.v.unsigned_abs() < MAXIMUM_RELEVANT_DISTANCE;
    let (prefer, exclude) = if local {
        (OrderFlags::TARGET_IS_LOCAL, OrderFlags::HARD_TARGET_IS_REMOTE)
    } else {
        (OrderFlags::TARGET_IS_REMOTE, OrderFlags::HARD_TARGET_IS_LOCAL)
    };
    if flags.contains(prefer) {
        value = value.shl(3);
    }
    if flags.contains(exclude) {
        value = Fixed::ZERO;
    }

    let tag = ship.template.order_key_tag;
    if tag.get() != 0 && tag == candidate.template.level_key_tag {
        value = value.shl(3);
    } else if flags.contains(OrderFlags::HARD_MATCHING_FOE) {
        value = Fixed::ZERO;
    }
    value
}

fn prefer_base(value: Fixed, flags: OrderFlags, shift: u32) -> Fixed {
    if flags.contains(OrderFlags::HARD_TARGET_IS_NOT_BASE) {
        Fixed::ZERO
    } else if flags.contains(OrderFlags::TARGET_IS_BASE) {
        value.shl(shift)
    } else {
        value
    }
}

fn prefer_ship(value: Fixed, flags: OrderFlags, shift: u32) -> Fixed {
    if flags.contains(OrderFlags::HARD_TARGET_IS_BASE) {
        Fixed::ZERO
    } else if flags.contains(OrderFlags::TARGET_IS_NOT_BASE) {
        value.shl(shift)
    } else {
        value
    }
}

fn prefer_foe(value: Fixed, flags: OrderFlags) -> Fixed {
    if flags.contains(OrderFlags::HARD_TARGET_IS_FRIEND) {
        Fixed::ZERO
    } else if flags.contains(OrderFlags::TARGET_IS_FOE) {
        value.shl(3)
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flotilla_core::{AdmiralId, AdmiralSetup, BaseId, Coord, KeyTag, LevelBuilder, ObjectId};
    use flotilla_world::{Config, SpawnRequest, World};

    struct Scene {
        world: World,
        ship: ObjectId,
        base: ObjectId,
    }

    fn scene(ship: BaseObject, base: BaseObject, base_owner: Option<AdmiralId>) -> Scene {
        let mut builder = LevelBuilder::new("scores");
        let red = builder.add_admiral(AdmiralSetup::computer("Red"));
        let _ = builder.add_admiral(AdmiralSetup::computer("Blue"));
        let ship_base = builder.add_template(ship);
        let base_base = builder.add_template(base);
        let mut world = World::from_level(builder.build(), Config::default()).expect("valid");
        let spawn = |world: &mut World, base: BaseId, owner, h| {
            world
                .spawn(
                    SpawnRequest::new(base, Coord::from_center(h, 0)).owned_by(owner),
                    &mut Vec::new(),
                )
                .expect("room")
        };
        let ship = spawn(&mut world, ship_base, Some(red), 0);
        let base = spawn(&mut world, base_base, base_owner, 1000);
        Scene { world, ship, base }
    }

    fn score(scene: &Scene, blitzkrieg: i32) -> Fixed {
        let level = scene.world.level_arc();
        let ship = scene.world.object(scene.ship).expect("ship");
        let base = scene.world.object(scene.base).expect("base");
        importance(
            &Party {
                object: ship,
                template: level.template(ship.base).expect("template"),
            },
            &Party {
                object: base,
                template: level.template(base.base).expect("template"),
            },
            blitzkrieg,
        )
    }

    fn outpost() -> BaseObject {
        let mut base = BaseObject::named("Outpost");
        base.attributes = Attributes::CAN_BE_DESTINATION | Attributes::IS_DESTINATION;
        base
    }

    #[test]
    fn neutral_bases_are_very_important_and_doubly_so_in_blitzkrieg() {
        let scene = scene(BaseObject::named("Cruiser"), outpost(), None);
        assert_eq!(score(&scene, -5), VERY_IMPORTANT_TARGET);
        assert_eq!(score(&scene, 5), VERY_IMPORTANT_TARGET.shl(2));
    }

    #[test]
    fn own_bases_short_of_escorts_are_essential() {
        let mut base = outpost();
        base.friend_deficit = Fixed::from_int(4);
        let scene = scene(BaseObject::named("Cruiser"), base, Some(AdmiralId::new(0)));
        assert_eq!(score(&scene, 0), ABSOLUTELY_ESSENTIAL);
    }

    #[test]
    fn order_flags_shift_and_zero_the_score() {
        let mut ship = BaseObject::named("Raider");
        ship.order_flags = OrderFlags::TARGET_IS_BASE | OrderFlags::TARGET_IS_LOCAL;
        let scene = scene(ship, outpost(), Some(AdmiralId::new(1)));
        assert_eq!(score(&scene, 0), SOMEWHAT_IMPORTANT_TARGET.shl(6));

        let mut ship = BaseObject::named("Picket");
        ship.order_flags = OrderFlags::HARD_TARGET_IS_NOT_BASE;
        let scene = self::scene(ship, outpost(), Some(AdmiralId::new(1)));
        assert_eq!(score(&scene, 0), Fixed::ZERO);
    }

    #[test]
    fn matching_order_key_tags_are_preferred() {
        let mut ship = BaseObject::named("Hunter");
        ship.order_key_tag = KeyTag::new(2);
        let mut base = outpost();
        base.level_key_tag = KeyTag::new(2);
        let scene = scene(ship, base, None);
        assert_eq!(score(&scene, 0), VERY_IMPORTANT_TARGET.shl(3));
    }
}
