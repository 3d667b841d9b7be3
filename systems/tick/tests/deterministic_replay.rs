use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

use flotilla_core::{AdmiralId, BaseId, Event, ObjectId};
use flotilla_system_bootstrap::skirmish;
use flotilla_system_tick::{Config, Progress, Simulation};
use flotilla_world::{self as world, query};

const STEPS: usize = 600;

#[test]
fn deterministic_replay_produces_identical_runs() {
    let first = replay(0x5eed, false);
    let second = replay(0x5eed, false);

    assert_eq!(first, second, "replay diverged between runs");
    assert_eq!(first.fingerprint(), second.fingerprint());
    assert!(
        first
            .events
            .iter()
            .any(|event| matches!(event, EventRecord::BuildCompleted { .. })),
        "no outpost finished a build"
    );
}

#[test]
fn fast_motion_replays_are_deterministic_too() {
    let first = replay(7, true);
    let second = replay(7, true);

    assert_eq!(first, second, "fast replay diverged between runs");
    assert!(first.time > 0);
}

#[test]
fn one_fast_frame_plays_like_four_normal_steps() {
    let mut fast = start(3);
    let mut normal = start(3);
    fast.set_fast(true);

    for _ in 0..30 {
        let mut fast_events = Vec::new();
        let _ = fast.step(&mut fast_events).expect("steps");
        let mut normal_events = Vec::new();
        for _ in 0..fast.major_ticks_per_step() {
            let _ = normal.step(&mut normal_events).expect("steps");
        }
        assert_eq!(fast_events, normal_events);
    }

    assert_eq!(fast.major_ticks_per_step(), 4);
    assert_eq!(fast.major_ticks(), normal.major_ticks());
    assert_eq!(fast.world().time(), normal.world().time());
    assert_eq!(fast.fingerprint(), normal.fingerprint());
}

#[test]
fn simulation_fingerprint_tracks_the_replay() {
    let mut left = start(11);
    let mut right = start(11);
    for _ in 0..50 {
        let _ = left.step(&mut Vec::new()).expect("steps");
        let _ = right.step(&mut Vec::new()).expect("steps");
    }
    assert_eq!(left.fingerprint(), right.fingerprint());
    let _ = left.step(&mut Vec::new()).expect("steps");
    assert_ne!(left.fingerprint(), right.fingerprint());
}

fn start(seed: i32) -> Simulation {
    Simulation::start(
        skirmish(),
        world::Config::default().with_seed(seed),
        Config::default(),
        &mut Vec::new(),
    )
    .expect("skirmish starts")
}

fn replay(seed: i32, fast: bool) -> ReplayOutcome {
    let mut simulation = start(seed);
    simulation.set_fast(fast);
    let mut log = Vec::new();

    for _ in 0..STEPS {
        let mut events = Vec::new();
        let progress = simulation.step(&mut events).expect("no invariant breaks");
        log.extend(events.iter().filter_map(EventRecord::from_event));
        if matches!(progress, Progress::Finished(_)) {
            break;
        }
    }

    let world = simulation.world();
    let objects = query::objects(world)
        .into_iter()
        .map(|snapshot| ObjectState {
            id: snapshot.id,
            base: snapshot.base,
            owner: snapshot.owner,
            location: (snapshot.location.h, snapshot.location.v),
            direction: snapshot.direction,
            health: snapshot.health.raw(),
        })
        .collect();
    let cash = query::admirals(world)
        .into_iter()
        .map(|admiral| admiral.cash.raw())
        .collect();

    ReplayOutcome {
        time: world.time(),
        objects,
        cash,
        events: log,
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct ReplayOutcome {
    time: i64,
    objects: Vec<ObjectState>,
    cash: Vec<i32>,
    events: Vec<EventRecord>,
}

impl ReplayOutcome {
    fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct ObjectState {
    id: ObjectId,
    base: BaseId,
    owner: Option<AdmiralId>,
    location: (u32, u32),
    direction: i32,
    health: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum EventRecord {
    Created { object: ObjectId, base: BaseId },
    Freed { object: ObjectId },
    WeaponFired { object: ObjectId },
    BuildCompleted { admiral: AdmiralId, object: ObjectId },
    OwnerChanged { object: ObjectId },
    ConditionFired { index: usize },
}

impl EventRecord {
    fn from_event(event: &Event) -> Option<Self> {
        let record = match *event {
            Event::ObjectCreated { object, base, .. } => Self::Created { object, base },
            Event::ObjectFreed { object } => Self::Freed { object },
            Event::WeaponFired { object, .. } => Self::WeaponFired { object },
            Event::BuildCompleted { admiral, object, .. } => {
                Self::BuildCompleted { admiral, object }
            }
            Event::OwnerChanged { object, .. } => Self::OwnerChanged { object },
            Event::ConditionFired { index } => Self::ConditionFired { index },
            _ => return None,
        };
        Some(record)
    }
}
