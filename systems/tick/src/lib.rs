#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Fixed-step driver that runs the simulation phases in order.
//!
//! Every major tick runs motion for each minor tick in it, then pilots and
//! admirals, then the delayed queue and upkeep, then collisions and
//! locality, then conditions and finally cleanup. One [`Simulation::step`]
//! is a frame of one major tick, or of several while fast motion is on.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use flotilla_core::{Event, Level};
use flotilla_system_actions::Interpreter;
use flotilla_system_admiral::AdmiralAi;
use flotilla_system_bootstrap::Bootstrap;
use flotilla_system_collision::Collision;
use flotilla_system_conditions::Conditions;
use flotilla_system_motion::Motion;
use flotilla_system_pilot::Pilot;
use flotilla_world::{query, InvariantError, LevelError, Outcome, World};
use thiserror::Error;
use tracing::info;

/// Tick lengths and scheduling of the driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    minor_ticks_per_major: i32,
    fast_motion_factor: i32,
    condition_interval: u32,
}

impl Config {
    /// Creates a configuration.
    #[must_use]
    pub const fn new(
        minor_ticks_per_major: i32,
        fast_motion_factor: i32,
        condition_interval: u32,
    ) -> Self {
        Self {
            minor_ticks_per_major,
            fast_motion_factor,
            condition_interval,
        }
    }

    /// Minor ticks in one major tick.
    #[must_use]
    pub const fn minor_ticks_per_major(&self) -> i32 {
        self.minor_ticks_per_major
    }

    /// Minor ticks in one frame while fast motion is on.
    #[must_use]
    pub const fn fast_motion_factor(&self) -> i32 {
        self.fast_motion_factor
    }

    /// Major ticks between regular condition checks.
    #[must_use]
    pub const fn condition_interval(&self) -> u32 {
        self.condition_interval
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(3, 12, 1)
    }
}

/// Failures that end a session.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SimulationError {
    /// The level could not be turned into a world.
    #[error("level rejected: {0}")]
    Level(#[from] LevelError),
    /// The world's bookkeeping broke during play.
    #[error("simulation invariant broken: {0}")]
    Invariant(#[from] InvariantError),
}

/// Whether play continues after a step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Progress {
    /// The level is still being played.
    Running,
    /// A winner was declared.
    Finished(Outcome),
}

/// Owns a world and the systems that advance it.
#[derive(Debug)]
pub struct Simulation {
    world: World,
    config: Config,
    fast: bool,
    major_ticks: u64,
    interpreter: Interpreter,
    motion: Motion,
    pilot: Pilot,
    admirals: AdmiralAi,
    collision: Collision,
    conditions: Conditions,
}

impl Simulation {
    /// Wraps a world that is already populated.
    #[must_use]
    pub fn new(world: World, config: Config) -> Self {
        Self {
            world,
            config,
            fast: false,
            major_ticks: 0,
            interpreter: Interpreter::new(),
            motion: Motion::new(),
            pilot: Pilot::new(),
            admirals: AdmiralAi::new(),
            collision: Collision::new(),
            conditions: Conditions::new(),
        }
    }

    /// Builds the world for a level and places its starting objects.
    pub fn start(
        level: Level,
        world_config: flotilla_world::Config,
        config: Config,
        out: &mut Vec<Event>,
    ) -> Result<Self, SimulationError> {
        let world = World::from_level(level, world_config)?;
        let mut simulation = Self::new(world, config);
        let _ = Bootstrap.populate(&mut simulation.world, &mut simulation.interpreter, out)?;
        Ok(simulation)
    }

    /// The simulated world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable access for applying commands between steps.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Switches fast motion on or off.
    pub fn set_fast(&mut self, fast: bool) {
        self.fast = fast;
    }

    /// Major ticks stepped so far.
    #[must_use]
    pub fn major_ticks(&self) -> u64 {
        self.major_ticks
    }

    /// Major ticks one call to [`Simulation::step`] runs.
    #[must_use]
    pub fn major_ticks_per_step(&self) -> i32 {
        if self.fast {
            (self.config.fast_motion_factor / self.config.minor_ticks_per_major.max(1)).max(1)
        } else {
            1
        }
    }

    /// Runs one frame: a single major tick, or several while fast motion is on.
    ///
    /// The frame stops early on the major tick that declares a winner. Once a
    /// winner is declared the world is frozen and every further call reports
    /// the outcome without advancing.
    pub fn step(&mut self, out: &mut Vec<Event>) -> Result<Progress, SimulationError> {
        for _ in 0..self.major_ticks_per_step() {
            if let Progress::Finished(outcome) = self.major_tick(out)? {
                return Ok(Progress::Finished(outcome));
            }
        }
        Ok(Progress::Running)
    }

    fn major_tick(&mut self, out: &mut Vec<Event>) -> Result<Progress, SimulationError> {
        if let Some(outcome) = self.world.outcome() {
            return Ok(Progress::Finished(outcome.clone()));
        }
        let ticks = self.config.minor_ticks_per_major;
        let world = &mut self.world;

        self.motion.advance(world, ticks);

        self.pilot.think(world, &mut self.interpreter, ticks, out)?;
        self.admirals.run(world, &mut self.interpreter, out)?;

        self.interpreter.run_queue(world, ticks, out)?;
        self.interpreter.upkeep(world, ticks, out)?;

        self.collision.resolve(world, &mut self.interpreter, out)?;

        let interval = u64::from(self.config.condition_interval.max(1));
        if world.take_condition_recheck() || self.major_ticks % interval == 0 {
            let _ = self.conditions.check(world, &mut self.interpreter, out)?;
        }

        world.release_freed(out);
        world.advance_clock(i64::from(ticks));
        self.major_ticks += 1;
        out.push(Event::TimeAdvanced { time: world.time() });

        match world.outcome() {
            Some(outcome) => {
                info!(winner = ?outcome.winner, time = world.time(), "game over");
                out.push(Event::GameOver {
                    winner: outcome.winner,
                });
                Ok(Progress::Finished(outcome.clone()))
            }
            None => Ok(Progress::Running),
        }
    }

    /// Hash of everything a replay must reproduce.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.world.time().hash(&mut hasher);
        for object in query::objects(&self.world) {
            object.id.hash(&mut hasher);
            object.base.hash(&mut hasher);
            object.owner.hash(&mut hasher);
            object.location.hash(&mut hasher);
            object.direction.hash(&mut hasher);
            object.health.hash(&mut hasher);
            object.energy.hash(&mut hasher);
        }
        for admiral in query::admirals(&self.world) {
            admiral.cash.hash(&mut hasher);
            admiral.kills.hash(&mut hasher);
            admiral.losses.hash(&mut hasher);
            admiral.scores.hash(&mut hasher);
        }
        self.world.outcome().hash(&mut hasher);
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flotilla_core::{
        Action, AdmiralSetup, CompareOp, Condition, LevelBuilder, Verb, When,
    };

    fn timed_victory(at: i64) -> Level {
        let mut builder = LevelBuilder::new("timer");
        let red = builder.add_admiral(AdmiralSetup::computer("Red"));
        let win = builder.push_actions([Action::new(Verb::DeclareWinner {
            admiral: Some(red),
            next_level: None,
            text: 0,
        })]);
        builder.add_condition(Condition::new(
            When::Time {
                op: CompareOp::Ge,
                ticks: at,
            },
            win,
        ));
        builder.build()
    }

    fn start(level: Level) -> Simulation {
        Simulation::start(
            level,
            flotilla_world::Config::default(),
            Config::default(),
            &mut Vec::new(),
        )
        .expect("level starts")
    }

    #[test]
    fn each_step_advances_one_major_tick() {
        let mut simulation = start(timed_victory(1_000));
        let mut out = Vec::new();
        assert_eq!(simulation.step(&mut out), Ok(Progress::Running));
        assert_eq!(simulation.world().time(), 3);
        assert_eq!(out.last(), Some(&Event::TimeAdvanced { time: 3 }));

        simulation.set_fast(true);
        out.clear();
        let _ = simulation.step(&mut out).expect("steps");
        assert_eq!(simulation.world().time(), 15);
        assert_eq!(simulation.major_ticks(), 5);
        let advances = out
            .iter()
            .filter(|event| matches!(event, Event::TimeAdvanced { .. }))
            .count();
        assert_eq!(advances, 4);
    }

    #[test]
    fn fast_frames_stop_on_the_winning_major_tick() {
        let mut simulation = start(timed_victory(6));
        simulation.set_fast(true);

        let progress = simulation.step(&mut Vec::new()).expect("steps");

        assert!(matches!(progress, Progress::Finished(_)));
        assert_eq!(simulation.world().time(), 9);
        assert_eq!(simulation.major_ticks(), 3);
    }

    #[test]
    fn play_stops_after_the_tick_that_declared_a_winner() {
        let mut simulation = start(timed_victory(6));
        let mut out = Vec::new();
        let mut steps = 0;
        let progress = loop {
            steps += 1;
            match simulation.step(&mut out).expect("steps") {
                Progress::Running => continue,
                finished => break finished,
            }
        };

        let Progress::Finished(outcome) = progress else {
            unreachable!("loop only breaks when finished");
        };
        assert_eq!(outcome.winner, Some(flotilla_core::AdmiralId::new(0)));
        assert_eq!(steps, 3);
        assert!(out
            .iter()
            .any(|event| matches!(event, Event::GameOver { .. })));

        let time = simulation.world().time();
        assert!(matches!(
            simulation.step(&mut out),
            Ok(Progress::Finished(_))
        ));
        assert_eq!(simulation.world().time(), time);
    }
}
