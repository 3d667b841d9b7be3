//! Built-in two-sided skirmish used by the headless runner and replay tests.

use flotilla_core::{
    Action, AdmiralId, AdmiralSetup, Alter, AlterKind, Attributes, BaseObject, CompareOp,
    Condition, CreateObject, DieKind, EqOp, Fixed, InitialId, InitialObject, Level, LevelBuilder,
    ObjectRef, OwnerFilter, Point, Verb, WeaponSlot, WeaponStats, When,
};

/// Game time after which the level ends without a winner.
pub const SKIRMISH_TIME_LIMIT: i64 = 18_000;

const HOME_DISTANCE: i32 = 3_000;

/// Two computer fleets fighting over their outposts and a neutral relay.
///
/// Fighters landing on a foreign outpost occupy it. Whoever captures the
/// other side's outpost wins.
#[must_use]
pub fn skirmish() -> Level {
    let mut builder = LevelBuilder::new("Skirmish");
    let red = builder.add_admiral(AdmiralSetup::computer("Red").with_cash(Fixed::from_int(150)));
    let blue =
        builder.add_admiral(AdmiralSetup::computer("Blue").with_cash(Fixed::from_int(150)));

    let bolt = builder.add_template(bolt());
    let expire = builder.push_actions([Action::new(Verb::Die(DieKind::Expire))]);
    if let Some(template) = builder.template_mut(bolt) {
        template.actions.collide = expire;
    }

    let gun = builder.add_template(gun());
    let fire = builder.push_actions([Action::new(Verb::CreateObject(CreateObject {
        velocity_relative: true,
        direction_relative: true,
        ..CreateObject::new(bolt, 1)
    }))
    .reflexive()]);
    if let Some(template) = builder.template_mut(gun) {
        template.actions.activate = fire;
    }

    let occupy = builder.push_actions([Action::new(Verb::Alter(Alter::adjust(
        AlterKind::Occupation,
        1,
    )))
    .with_owner(OwnerFilter::Different)]);
    let mut fighter = fighter();
    fighter.weapons[WeaponSlot::Pulse.index()] = Some(gun);
    fighter.actions.arrive = occupy;
    let fighter = builder.add_template(fighter);
    let outpost = builder.add_template(outpost());

    let mut homes = Vec::new();
    for (admiral, side) in [(red, -1), (blue, 1)] {
        let home = builder.add_initial(
            InitialObject::new(outpost, Point::new(side * HOME_DISTANCE, 0))
                .owned_by(admiral)
                .earning(Fixed::ONE)
                .building(vec![fighter]),
        );
        for v in [-250, 250] {
            let _ = builder.add_initial(
                InitialObject::new(fighter, Point::new(side * (HOME_DISTANCE - 300), v))
                    .owned_by(admiral)
                    .heading_for(home),
            );
        }
        homes.push((admiral, home));
    }
    let _ = builder.add_initial(InitialObject::new(outpost, Point::new(0, 2_000)).named("Relay"));

    if let &[(red, red_home), (blue, blue_home)] = homes.as_slice() {
        add_capture_victory(&mut builder, red, blue_home);
        add_capture_victory(&mut builder, blue, red_home);
    }
    let stalemate = builder.push_actions([Action::new(Verb::DeclareWinner {
        admiral: None,
        next_level: None,
        text: 0,
    })]);
    builder.add_condition(Condition::new(
        When::Time {
            op: CompareOp::Ge,
            ticks: SKIRMISH_TIME_LIMIT,
        },
        stalemate,
    ));
    builder.build()
}

fn add_capture_victory(
    builder: &mut LevelBuilder,
    winner: AdmiralId,
    prize: InitialId,
) {
    let win = builder.push_actions([Action::new(Verb::DeclareWinner {
        admiral: Some(winner),
        next_level: None,
        text: 0,
    })]);
    builder.add_condition(Condition::new(
        When::Owner {
            op: EqOp::Eq,
            object: ObjectRef::Initial(prize),
            admiral: Some(winner),
        },
        win,
    ));
}

fn bolt() -> BaseObject {
    let mut bolt = BaseObject::named("Bolt");
    bolt.attributes = Attributes::CAN_COLLIDE | Attributes::AUTO_TARGET;
    bolt.damage = 12;
    bolt.size = 4;
    bolt.mass = Fixed::ZERO;
    bolt.initial_velocity = Fixed::from_int(12);
    bolt.max_velocity = Fixed::from_int(12);
    bolt.initial_age = 90;
    bolt
}

fn gun() -> BaseObject {
    let mut gun = BaseObject::named("Pulse Gun");
    gun.weapon = Some(WeaponStats {
        ammo: -1,
        fire_time: 24,
        range: 700,
        energy_cost: 4,
        usage_attacking: true,
    });
    gun
}

fn fighter() -> BaseObject {
    let mut fighter = BaseObject::named("Fighter");
    fighter.attributes = Attributes::CAN_THINK
        | Attributes::CAN_TURN
        | Attributes::CAN_BE_ENGAGED
        | Attributes::CAN_COLLIDE
        | Attributes::CAN_BE_HIT
        | Attributes::OCCUPIES_SPACE
        | Attributes::SHAPE_FROM_DIRECTION
        | Attributes::APPEAR_ON_RADAR;
    fighter.health = 60;
    fighter.energy = 120;
    fighter.offense_value = Fixed::ONE;
    fighter.max_velocity = Fixed::from_int(4);
    fighter.max_thrust = Fixed::HALF;
    fighter.max_turn_rate = Fixed::from_int(4);
    fighter.size = 24;
    fighter.arrive_distance = 400;
    fighter.price = 60;
    fighter.build_time = 300;
    fighter.build_ratio = Fixed::ONE;
    fighter.shape_count = 16;
    fighter
}

fn outpost() -> BaseObject {
    let mut outpost = BaseObject::named("Outpost");
    outpost.attributes = Attributes::CAN_BE_DESTINATION
        | Attributes::IS_DESTINATION
        | Attributes::CAN_ACCEPT_BUILD
        | Attributes::CAN_BE_ENGAGED
        | Attributes::CAN_BE_HIT
        | Attributes::NEUTRAL_DEATH
        | Attributes::APPEAR_ON_RADAR;
    outpost.health = 400;
    outpost.offense_value = Fixed::ONE;
    outpost.friend_deficit = Fixed::from_int(2);
    outpost.destination_class = 10;
    outpost.capture_threshold = 3;
    outpost.size = 64;
    outpost.mass = Fixed::ZERO;
    outpost
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skirmish_is_symmetric_and_loadable() {
        let level = skirmish();
        assert_eq!(level.admirals.len(), 2);
        assert_eq!(level.initial_objects.len(), 7);
        assert_eq!(level.conditions.len(), 3);
        let owned = |index: u8| {
            level
                .initial_objects
                .iter()
                .filter(|setup| setup.owner == Some(AdmiralId::new(index)))
                .count()
        };
        assert_eq!(owned(0), owned(1));
        assert!(flotilla_world::World::from_level(level, flotilla_world::Config::default()).is_ok());
    }
}
