#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Admiral AI: build sites, income and the computer's strategic orders.
//!
//! Every major tick the build sites count down and launch finished ships,
//! owners collect income, and each computer admiral takes one step of its
//! think loop. A step flips the blitzkrieg phase when due, scores one
//! pairing of an owned ship against a candidate destination and considers
//! spending its savings on a new ship.

mod build;
mod score;
mod think;

use flotilla_core::{AdmiralId, Event};
use flotilla_system_actions::Interpreter;
use flotilla_world::{InvariantError, World};

pub use build::{BUILD_ATTEMPTS, BUILD_STEP};
pub use score::{
    ABSOLUTELY_ESSENTIAL, LEAST_IMPORTANT_TARGET, MOST_IMPORTANT_TARGET,
    SOMEWHAT_IMPORTANT_TARGET, UNIMPORTANT_TARGET, VERY_IMPORTANT_TARGET,
};
pub use think::BLITZKRIEG_SPAN;

/// Runs the admiral phase.
#[derive(Debug, Default)]
pub struct AdmiralAi {
    thinkers: Vec<AdmiralId>,
}

impl AdmiralAi {
    /// Creates the system.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances build sites, pays income and lets every computer admiral think.
    pub fn run(
        &mut self,
        world: &mut World,
        interpreter: &mut Interpreter,
        out: &mut Vec<Event>,
    ) -> Result<(), InvariantError> {
        build::progress_sites(world, interpreter, out)?;

        self.thinkers.clear();
        self.thinkers.extend(
            world
                .admiral_ids()
                .filter(|&id| world.admiral(id).is_some_and(|state| state.is_computer())),
        );
        for &admiral in &self.thinkers {
            think::blitzkrieg(world, admiral);
            think::consider(world, admiral, out);
            build::consider_building(world, admiral, out);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flotilla_core::{
        AdmiralKind, AdmiralSetup, Attributes, BaseId, BaseObject, Coord, Fixed, LevelBuilder,
        ObjectId, RandomSource,
    };
    use flotilla_world::{Config, SpawnRequest, MAX_SHIP_BUFFER};
    use rand_chacha::rand_core::{RngCore, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    /// Global stream backed by ChaCha instead of the level generator.
    #[derive(Debug)]
    struct ChaChaSource(ChaCha8Rng);

    impl RandomSource for ChaChaSource {
        fn next(&mut self, range: i32) -> i32 {
            if range <= 0 {
                return 0;
            }
            (self.0.next_u32() % range as u32) as i32
        }
    }

    const RED: AdmiralId = AdmiralId::new(0);

    fn spawn(world: &mut World, request: SpawnRequest) -> ObjectId {
        world.spawn(request, &mut Vec::new()).expect("room")
    }

    fn run(world: &mut World, times: usize) -> Vec<Event> {
        let mut ai = AdmiralAi::new();
        let mut interpreter = Interpreter::new();
        let mut out = Vec::new();
        for _ in 0..times {
            ai.run(world, &mut interpreter, &mut out)
                .expect("no invariant breaks");
        }
        out
    }

    fn buoy() -> BaseObject {
        let mut buoy = BaseObject::named("Buoy");
        buoy.attributes = Attributes::CAN_BE_DESTINATION;
        buoy
    }

    fn cruiser() -> BaseObject {
        let mut ship = BaseObject::named("Cruiser");
        ship.attributes = Attributes::CAN_ACCEPT_DESTINATION;
        ship
    }

    #[test]
    fn equal_scores_go_to_the_earliest_candidate() {
        let mut builder = LevelBuilder::new("ties");
        let _ = builder.add_admiral(AdmiralSetup::computer("Red"));
        let ship = builder.add_template(cruiser());
        let buoy = builder.add_template(buoy());
        let mut world = World::from_level(builder.build(), Config::default()).expect("valid");
        let ship = spawn(
            &mut world,
            SpawnRequest::new(ship, Coord::from_center(0, 0)).owned_by(Some(RED)),
        );
        let first = spawn(&mut world, SpawnRequest::new(buoy, Coord::from_center(500, 0)));
        let _second = spawn(&mut world, SpawnRequest::new(buoy, Coord::from_center(-500, 0)));

        let _ = run(&mut world, 3);

        let ship = world.object(ship).expect("present");
        assert_eq!(ship.dest, first);
        assert_eq!(ship.current_target_value, Fixed::ZERO);
    }

    #[test]
    fn blitzkrieg_flips_and_forgets_current_targets() {
        let mut builder = LevelBuilder::new("blitz");
        let _ = builder.add_admiral(AdmiralSetup::computer("Red"));
        let ship = builder.add_template(cruiser());
        let mut world = World::from_level(builder.build(), Config::default()).expect("valid");
        let ship = spawn(
            &mut world,
            SpawnRequest::new(ship, Coord::from_center(0, 0)).owned_by(Some(RED)),
        );
        world.object_mut(ship).expect("present").current_target_value = Fixed::from_int(3);
        world.admiral_mut(RED).expect("admiral").blitzkrieg = 1;

        let _ = run(&mut world, 1);

        let phase = world.admiral(RED).expect("admiral").blitzkrieg;
        assert!((-2 * BLITZKRIEG_SPAN..=-BLITZKRIEG_SPAN).contains(&phase));
        assert_eq!(
            world.object(ship).expect("present").current_target_value,
            Fixed::ZERO
        );
    }

    fn shipyard(kind: AdmiralKind, config: Config) -> (World, BaseId) {
        let mut builder = LevelBuilder::new("shipyard");
        let _ = builder.add_admiral(
            AdmiralSetup::computer("Red")
                .with_kind(kind)
                .with_cash(Fixed::from_int(100)),
        );
        let mut fighter = BaseObject::named("Fighter");
        fighter.attributes = Attributes::CAN_ACCEPT_DESTINATION;
        fighter.build_ratio = Fixed::ONE;
        fighter.price = 10;
        fighter.build_time = 40;
        let fighter = builder.add_template(fighter);
        let mut outpost = BaseObject::named("Outpost");
        outpost.attributes = Attributes::CAN_BE_DESTINATION
            | Attributes::IS_DESTINATION
            | Attributes::CAN_ACCEPT_BUILD;
        let outpost = builder.add_template(outpost);
        let mut world = World::with_random_source(
            builder.build(),
            config,
            Box::new(ChaChaSource(ChaCha8Rng::seed_from_u64(7))),
        )
        .expect("valid");
        let _ = spawn(
            &mut world,
            SpawnRequest::new(outpost, Coord::from_center(0, 0))
                .owned_by(Some(RED))
                .as_destination(vec![fighter], Fixed::ONE, None),
        );
        world.recalc_build_data().expect("table fits");
        (world, fighter)
    }

    #[test]
    fn computer_admirals_build_and_launch_ships() {
        let (mut world, fighter) = shipyard(AdmiralKind::Computer, Config::default());

        let events = run(&mut world, 5);

        let started = events
            .iter()
            .filter(|event| matches!(event, Event::BuildStarted { .. }))
            .count();
        let launched: Vec<ObjectId> = events
            .iter()
            .filter_map(|event| match event {
                Event::BuildCompleted { object, base, .. } if *base == fighter => Some(*object),
                _ => None,
            })
            .collect();
        assert_eq!(started, 2);
        assert_eq!(launched.len(), 1);
        let ship = world.object(launched[0]).expect("launched");
        assert_eq!(ship.owner, Some(RED));
        assert_eq!(ship.location, Coord::from_center(0, 0));
        assert_eq!(world.admiral(RED).expect("admiral").cash, Fixed::from_int(85));
    }

    #[test]
    fn human_admirals_only_collect_income() {
        let (mut world, _) = shipyard(AdmiralKind::Human, Config::default());

        let events = run(&mut world, 3);

        assert!(!events
            .iter()
            .any(|event| matches!(event, Event::BuildStarted { .. })));
        assert_eq!(world.admiral(RED).expect("admiral").cash, Fixed::from_int(103));
    }

    #[test]
    fn computer_admirals_keep_their_cash_when_the_pool_is_nearly_full() {
        let config = Config::new(MAX_SHIP_BUFFER + 1, 10, 120, 7);
        let (mut world, _) = shipyard(AdmiralKind::Computer, config);

        let events = run(&mut world, 3);

        assert!(!events
            .iter()
            .any(|event| matches!(event, Event::BuildStarted { .. })));
        assert_eq!(world.admiral(RED).expect("admiral").cash, Fixed::from_int(103));
    }
}
