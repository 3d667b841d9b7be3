#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Headless command-line runner for flotilla levels.

mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use flotilla_core::{Coord, Event};
use flotilla_rendering::{Palette, Scene, Viewport};
use flotilla_system_bootstrap::skirmish;
use flotilla_system_tick::{Progress, Simulation};
use flotilla_world::query;
use glam::Vec2;
use rand::Rng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::RunConfig;

const SCENE_SIZE: Vec2 = Vec2::new(1280.0, 720.0);

#[derive(Debug, Parser)]
#[command(name = "flotilla", version, about = "Runs flotilla levels without a window")]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Plays the built-in skirmish until a winner is declared.
    Run(RunArgs),
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Seed of the global random stream.
    #[arg(long)]
    seed: Option<i32>,
    /// Frames to run at most; a fast frame spans several major ticks.
    #[arg(long)]
    ticks: Option<u64>,
    /// Uses the fast motion factor for every step.
    #[arg(long)]
    fast: bool,
    /// TOML file with run settings; flags take precedence.
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Entry point for the flotilla command-line interface.
fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        CliCommand::Run(args) => run(args),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn run(args: RunArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };
    config.seed = args.seed.or(config.seed);
    config.ticks = args.ticks.unwrap_or(config.ticks);
    config.fast |= args.fast;
    let seed = config
        .seed
        .unwrap_or_else(|| rand::thread_rng().gen_range(1..i32::MAX));
    info!(seed, ticks = config.ticks, fast = config.fast, "starting skirmish");

    let mut events = Vec::new();
    let mut simulation = Simulation::start(
        skirmish(),
        config.world_config(seed),
        config.tick_config(),
        &mut events,
    )
    .context("failed to start the skirmish")?;
    simulation.set_fast(config.fast);

    let mut tally = Tally::default();
    let mut outcome = None;
    let mut frames = 0;
    for _ in 0..config.ticks {
        frames += 1;
        events.clear();
        let progress = simulation
            .step(&mut events)
            .with_context(|| format!("frame {frames} failed"))?;
        tally.record(&events);
        if let Progress::Finished(finished) = progress {
            outcome = Some(finished);
            break;
        }
    }

    let world = simulation.world();
    println!("level      Skirmish (seed {seed})");
    println!(
        "time       {} minor ticks over {frames} steps ({} major ticks)",
        world.time(),
        simulation.major_ticks()
    );
    let winner = outcome
        .as_ref()
        .and_then(|outcome| outcome.winner)
        .and_then(|winner| world.admiral(winner))
        .map_or("none", |admiral| admiral.name.as_str());
    match outcome {
        Some(_) => println!("winner     {winner}"),
        None => println!("winner     undecided after {} steps", config.ticks),
    }
    println!(
        "activity   {} built, {} destroyed, {} shots, {} captures",
        tally.built, tally.destroyed, tally.shots, tally.captures
    );
    for admiral in query::admirals(world) {
        println!(
            "{:<10} cash {:>6}  kills {:>3}  losses {:>3}  ships {:>3}",
            admiral.name,
            admiral.cash.to_int(),
            admiral.kills,
            admiral.losses,
            admiral.ships_left
        );
    }

    let viewport = Viewport::new(Coord::from_center(0, 0), config.units_per_pixel, SCENE_SIZE)
        .context("invalid viewport scale")?;
    let scene = Scene::capture(world, viewport, &Palette::default());
    println!("scene      {} sprites in view", scene.sprites.len());
    println!("fingerprint {:#018x}", simulation.fingerprint());
    Ok(())
}

#[derive(Debug, Default)]
struct Tally {
    built: usize,
    destroyed: usize,
    shots: usize,
    captures: usize,
}

impl Tally {
    fn record(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::BuildCompleted { .. } => self.built += 1,
                Event::ObjectDestroyed { .. } => self.destroyed += 1,
                Event::WeaponFired { .. } => self.shots += 1,
                Event::OwnerChanged { .. } => self.captures += 1,
                _ => {}
            }
        }
    }
}
