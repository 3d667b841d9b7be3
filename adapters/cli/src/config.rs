use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Settings of a headless run, read from TOML and overridden by flags.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct RunConfig {
    /// Seed of the global random stream; drawn at random when absent.
    pub(crate) seed: Option<i32>,
    /// Frames to run before giving up on a winner.
    pub(crate) ticks: u64,
    /// Runs every step with the fast motion factor.
    pub(crate) fast: bool,
    pub(crate) minor_ticks_per_major: i32,
    pub(crate) fast_motion_factor: i32,
    pub(crate) condition_interval: u32,
    pub(crate) object_capacity: usize,
    pub(crate) destination_capacity: usize,
    pub(crate) queue_capacity: usize,
    /// World units per pixel of the final scene summary.
    pub(crate) units_per_pixel: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        let world = flotilla_world::Config::default();
        let tick = flotilla_system_tick::Config::default();
        Self {
            seed: None,
            ticks: 6_000,
            fast: false,
            minor_ticks_per_major: tick.minor_ticks_per_major(),
            fast_motion_factor: tick.fast_motion_factor(),
            condition_interval: tick.condition_interval(),
            object_capacity: world.object_capacity(),
            destination_capacity: world.destination_capacity(),
            queue_capacity: world.queue_capacity(),
            units_per_pixel: 16,
        }
    }
}

impl RunConfig {
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read run config at {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("failed to parse run config at {}", path.display()))
    }

    pub(crate) fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("invalid run config toml")
    }

    pub(crate) fn world_config(&self, seed: i32) -> flotilla_world::Config {
        flotilla_world::Config::new(
            self.object_capacity,
            self.destination_capacity,
            self.queue_capacity,
            seed,
        )
    }

    pub(crate) fn tick_config(&self) -> flotilla_system_tick::Config {
        flotilla_system_tick::Config::new(
            self.minor_ticks_per_major,
            self.fast_motion_factor,
            self.condition_interval,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let config = RunConfig::parse("seed = 42\nfast = true\n").expect("valid toml");

        assert_eq!(config.seed, Some(42));
        assert!(config.fast);
        assert_eq!(config.ticks, RunConfig::default().ticks);
        assert_eq!(config.tick_config(), flotilla_system_tick::Config::default());
        assert_eq!(
            config.world_config(42),
            flotilla_world::Config::default().with_seed(42)
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let error = RunConfig::parse("sede = 1\n").expect_err("typo must be rejected");

        assert!(format!("{error:#}").contains("sede"));
    }
}
