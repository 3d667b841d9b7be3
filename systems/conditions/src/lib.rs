#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Scenario trigger evaluator.
//!
//! Conditions are scanned in level order. An armed or persistent condition
//! whose predicate holds is disarmed and runs its action list, so the
//! effects of one condition are already visible to the next.

use flotilla_core::{Attributes, Event, Fixed, ObjectId, ObjectRef, When};
use flotilla_system_actions::Interpreter;
use flotilla_world::{InvariantError, World};
use tracing::info;

/// Polls the level's conditions.
#[derive(Debug, Default)]
pub struct Conditions;

impl Conditions {
    /// Creates the evaluator.
    pub fn new() -> Self {
        Self
    }

    /// Scans every condition once and fires those that hold.
    ///
    /// Returns the number of conditions fired.
    pub fn check(
        &mut self,
        world: &mut World,
        interpreter: &mut Interpreter,
        out: &mut Vec<Event>,
    ) -> Result<usize, InvariantError> {
        let level = world.level_arc();
        let mut fired = 0;
        for (index, condition) in level.conditions.iter().enumerate() {
            let armed = world.condition_enabled(index) || condition.persistent;
            if !armed || !holds(world, &condition.when) {
                continue;
            }
            world.set_condition_enabled(index, false);
            let subject = condition.subject.map_or(ObjectId::none(), |r| resolve(world, r));
            let direct = condition.direct.map_or(ObjectId::none(), |r| resolve(world, r));
            info!(index, time = world.time(), "condition fired");
            out.push(Event::ConditionFired { index });
            interpreter.exec(world, condition.actions, subject, direct, None, out)?;
            fired += 1;
        }
        Ok(fired)
    }
}

/// Resolves an object reference to a live object, or the none handle.
pub fn resolve(world: &World, reference: ObjectRef) -> ObjectId {
    let candidate = match reference {
        ObjectRef::Initial(initial) => world.initial_object(initial),
        ObjectRef::Flagship(admiral) => world
            .admiral(admiral)
            .map_or(ObjectId::none(), |state| state.flagship),
        ObjectRef::Control(admiral) => world.admiral_control(admiral).unwrap_or_default(),
        ObjectRef::Target(admiral) => world.admiral_target(admiral),
    };
    if world.object(candidate).is_some_and(|object| object.is_in_use()) {
        candidate
    } else {
        ObjectId::none()
    }
}

/// Evaluates a predicate against the current state.
pub fn holds(world: &mut World, when: &When) -> bool {
    match *when {
        When::Autopilot { op, admiral, value } => {
            let flagship = resolve(world, ObjectRef::Flagship(admiral));
            world.object(flagship).is_some_and(|object| {
                op.holds(object.attributes.contains(Attributes::ON_AUTO_PILOT), value)
            })
        }
        When::Building { op, admiral, value } => {
            let Some(record) = world.admiral_build_at(admiral) else {
                return false;
            };
            world
                .destination(record)
                .is_some_and(|site| op.holds(site.total_build_time > 0, value))
        }
        When::Cash { op, admiral, value } => world
            .admiral(admiral)
            .is_some_and(|state| op.holds(state.cash, value)),
        When::Computer { op, screen, line } => match line {
            Some(line) => op.holds(world.computer(), Some((screen, line))),
            None => op.holds(world.computer().map(|(current, _)| current), Some(screen)),
        },
        When::Counter { op, counter, value } => world
            .admiral(counter.admiral)
            .and_then(|state| state.scores.get(counter.which).copied())
            .is_some_and(|score| op.holds(score, value)),
        When::Destroyed { op, object, value } => {
            op.holds(resolve(world, object).is_none(), value)
        }
        When::Distance { op, from, to, value } => {
            let from = world.object(resolve(world, from));
            let to = world.object(resolve(world, to));
            match (from, to) {
                (Some(from), Some(to)) => op.holds(
                    from.location.distance_squared(to.location),
                    u64::from(value) * u64::from(value),
                ),
                _ => false,
            }
        }
        When::Health { op, object, value } => {
            let level = world.level_arc();
            let health = world
                .object(resolve(world, object))
                .map_or(Fixed::ZERO, |object| object.health_fraction(&level));
            op.holds(health, value)
        }
        When::Message { op, id, page } => match world.message() {
            Some(current) => op.holds(current, (id, page - 1)),
            None => false,
        },
        When::Object { op, a, b } => {
            let (a, b) = (resolve(world, a), resolve(world, b));
            !a.is_none() && !b.is_none() && op.holds(a, b)
        }
        When::Owner {
            op,
            object,
            admiral,
        } => world
            .object(resolve(world, object))
            .is_some_and(|object| op.holds(object.owner, admiral)),
        When::Ships { op, admiral, value } => world
            .admiral(admiral)
            .is_some_and(|state| op.holds(state.ships_left, value)),
        When::Speed { op, object, value } => world
            .object(resolve(world, object))
            .is_some_and(|object| op.holds(object.speed(), value)),
        When::Target { op, object, target } => {
            let target = resolve(world, target);
            !target.is_none()
                && world
                    .object(resolve(world, object))
                    .is_some_and(|object| op.holds(object.dest, target))
        }
        When::Time { op, ticks } => op.holds(world.time(), ticks),
        When::Zoom { op, value } => op.holds(world.zoom(), value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flotilla_core::{
        Action, AdmiralId, AdmiralSetup, BaseObject, CompareOp, Condition, Counter, EqOp,
        InitialObject, LevelBuilder, Point, Verb,
    };
    use flotilla_world::Config;

    const RED: AdmiralId = AdmiralId::new(0);

    fn score(which: usize) -> Verb {
        Verb::ChangeScore {
            admiral: Some(RED),
            which,
            amount: 1,
        }
    }

    fn scores(world: &World) -> [i32; 2] {
        let state = world.admiral(RED).expect("admiral");
        [state.scores[0], state.scores[1]]
    }

    fn check(world: &mut World) -> usize {
        let mut out = Vec::new();
        Conditions::new()
            .check(world, &mut Interpreter::new(), &mut out)
            .expect("no invariant breaks")
    }

    fn later(ticks: i64) -> When {
        When::Time {
            op: CompareOp::Ge,
            ticks,
        }
    }

    #[test]
    fn one_shot_conditions_fire_once_and_persistent_ones_every_check() {
        let mut builder = LevelBuilder::new("timers");
        let _ = builder.add_admiral(AdmiralSetup::computer("Red"));
        let first = builder.push_actions([Action::new(score(0))]);
        let second = builder.push_actions([Action::new(score(1))]);
        builder.add_condition(Condition::new(later(10), first));
        builder.add_condition(Condition::new(later(10), second).persistent());
        let mut world = World::from_level(builder.build(), Config::default()).expect("valid");

        assert_eq!(check(&mut world), 0);
        world.advance_clock(10);
        assert_eq!(check(&mut world), 2);
        assert_eq!(check(&mut world), 1);
        assert_eq!(scores(&world), [1, 2]);
    }

    #[test]
    fn earlier_effects_are_visible_later_in_the_same_scan() {
        let mut builder = LevelBuilder::new("chain");
        let _ = builder.add_admiral(AdmiralSetup::computer("Red"));
        let bump = builder.push_actions([Action::new(score(0))]);
        let follow = builder.push_actions([Action::new(score(1))]);
        builder.add_condition(Condition::new(later(0), bump));
        builder.add_condition(Condition::new(
            When::Counter {
                op: CompareOp::Eq,
                counter: Counter {
                    admiral: RED,
                    which: 0,
                },
                value: 1,
            },
            follow,
        ));
        let mut world = World::from_level(builder.build(), Config::default()).expect("valid");

        assert_eq!(check(&mut world), 2);
        assert_eq!(scores(&world), [1, 1]);
    }

    #[test]
    fn disarmed_conditions_wait_until_enabled() {
        let mut builder = LevelBuilder::new("disarmed");
        let _ = builder.add_admiral(AdmiralSetup::computer("Red"));
        let bump = builder.push_actions([Action::new(score(0))]);
        builder.add_condition(Condition::new(later(0), bump).disarmed());
        let mut world = World::from_level(builder.build(), Config::default()).expect("valid");

        assert_eq!(check(&mut world), 0);
        world.set_condition_enabled(0, true);
        assert_eq!(check(&mut world), 1);
        assert!(!world.condition_enabled(0));
    }

    #[test]
    fn object_predicates_read_live_initial_objects() {
        let mut builder = LevelBuilder::new("objects");
        let red = builder.add_admiral(AdmiralSetup::computer("Red"));
        let buoy = builder.add_template(BaseObject::named("Buoy"));
        let near = builder.add_initial(InitialObject::new(buoy, Point::new(0, 0)).owned_by(red));
        let far = builder.add_initial(InitialObject::new(buoy, Point::new(300, 400)));
        let ghost = builder.add_initial(InitialObject::new(buoy, Point::new(9, 9)));
        let mut world = World::from_level(builder.build(), Config::default()).expect("valid");
        let mut interpreter = Interpreter::new();
        let mut out = Vec::new();
        for initial in [near, far] {
            let _ = interpreter
                .place_initial(&mut world, initial, &mut out)
                .expect("no invariant breaks");
        }
        let (near, far, ghost) = (
            ObjectRef::Initial(near),
            ObjectRef::Initial(far),
            ObjectRef::Initial(ghost),
        );

        let distance = |op, value| When::Distance {
            op,
            from: near,
            to: far,
            value,
        };
        assert!(holds(&mut world, &distance(CompareOp::Eq, 500)));
        assert!(holds(&mut world, &distance(CompareOp::Lt, 501)));
        assert!(!holds(&mut world, &distance(CompareOp::Lt, 500)));

        let destroyed = |object| When::Destroyed {
            op: EqOp::Eq,
            object,
            value: true,
        };
        assert!(holds(&mut world, &destroyed(ghost)));
        assert!(!holds(&mut world, &destroyed(near)));

        let owned = |object, admiral| When::Owner {
            op: EqOp::Eq,
            object,
            admiral,
        };
        assert!(holds(&mut world, &owned(near, Some(red))));
        assert!(holds(&mut world, &owned(far, None)));
        assert!(!holds(&mut world, &owned(ghost, None)));

        let health = When::Health {
            op: CompareOp::Le,
            object: ghost,
            value: Fixed::ZERO,
        };
        assert!(holds(&mut world, &health));
    }
}
