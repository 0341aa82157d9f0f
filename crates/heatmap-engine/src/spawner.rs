//! Population spawner for the demonstration host.
//!
//! At start-up the spawner scatters AI actors and infected across the map.
//! While the host runs it replaces entities that died or left, so the
//! population stays at the configured size.

use heatmap_types::{EntityClass, EntityId, Position};
use rand::Rng;
use serde::Deserialize;

use crate::error::EngineError;

// -----------------------------------------------------------------------
// Configuration
// -----------------------------------------------------------------------

/// Configuration for the demonstration host, loaded from the `host`
/// section of `heatmap-config.yaml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HostConfig {
    /// Real-time milliseconds between two host ticks.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Simulated seconds per real second.
    #[serde(default = "default_time_scale")]
    pub time_scale: f64,

    /// Stop after this many ticks (0 = run until interrupted).
    #[serde(default)]
    pub max_ticks: u64,

    /// Random seed for movement and event odds.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Side length of the square map in metres.
    #[serde(default = "default_map_size")]
    pub map_size: f64,

    /// AI actors kept alive at all times.
    #[serde(default = "default_ai_count")]
    pub ai_count: u32,

    /// Infected kept alive at all times.
    #[serde(default = "default_infected_count")]
    pub infected_count: u32,

    /// Per-second chance that an AI actor on foot mounts a vehicle.
    #[serde(default = "default_mount_chance")]
    pub mount_chance: f64,

    /// Per-second chance that a mounted AI actor dismounts.
    #[serde(default = "default_dismount_chance")]
    pub dismount_chance: f64,

    /// Per-second chance that an AI actor dies.
    #[serde(default = "default_ai_death_chance")]
    pub ai_death_chance: f64,

    /// Per-second chance that an infected dies.
    #[serde(default = "default_infected_death_chance")]
    pub infected_death_chance: f64,

    /// Per-second chance that a living AI actor leaves the server.
    #[serde(default = "default_leave_chance")]
    pub leave_chance: f64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            time_scale: default_time_scale(),
            max_ticks: 0,
            seed: default_seed(),
            map_size: default_map_size(),
            ai_count: default_ai_count(),
            infected_count: default_infected_count(),
            mount_chance: default_mount_chance(),
            dismount_chance: default_dismount_chance(),
            ai_death_chance: default_ai_death_chance(),
            infected_death_chance: default_infected_death_chance(),
            leave_chance: default_leave_chance(),
        }
    }
}

impl HostConfig {
    /// Simulated seconds covered by one host tick.
    pub fn tick_secs(&self) -> f64 {
        let real_secs = u32::try_from(self.tick_interval_ms).map_or(f64::from(u32::MAX), f64::from)
            / 1_000.0;
        real_secs * self.time_scale
    }

    /// Check the values the simulation relies on.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Host`] naming the first unusable field.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.tick_interval_ms == 0 {
            return Err(host_error("tick_interval_ms must be at least 1"));
        }
        if !(self.time_scale.is_finite() && self.time_scale > 0.0) {
            return Err(host_error("time_scale must be a positive number"));
        }
        if !(self.map_size.is_finite() && self.map_size > 0.0) {
            return Err(host_error("map_size must be a positive number"));
        }
        let chances = [
            ("mount_chance", self.mount_chance),
            ("dismount_chance", self.dismount_chance),
            ("ai_death_chance", self.ai_death_chance),
            ("infected_death_chance", self.infected_death_chance),
            ("leave_chance", self.leave_chance),
        ];
        for (field, chance) in chances {
            if !(0.0..=1.0).contains(&chance) {
                return Err(host_error(&format!("{field} must be within 0..=1")));
            }
        }
        Ok(())
    }
}

fn host_error(message: &str) -> EngineError {
    EngineError::Host {
        message: message.to_owned(),
    }
}

const fn default_tick_interval_ms() -> u64 {
    1_000
}

const fn default_time_scale() -> f64 {
    1.0
}

const fn default_seed() -> u64 {
    42
}

const fn default_map_size() -> f64 {
    15_360.0
}

const fn default_ai_count() -> u32 {
    24
}

const fn default_infected_count() -> u32 {
    80
}

const fn default_mount_chance() -> f64 {
    0.002
}

const fn default_dismount_chance() -> f64 {
    0.01
}

const fn default_ai_death_chance() -> f64 {
    0.000_5
}

const fn default_infected_death_chance() -> f64 {
    0.002
}

const fn default_leave_chance() -> f64 {
    0.000_2
}

// -----------------------------------------------------------------------
// Spawning
// -----------------------------------------------------------------------

/// A freshly placed entity, not yet known to the world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spawn {
    /// Identifier handed out by the spawner.
    pub id: EntityId,
    /// Entity kind.
    pub class: EntityClass,
    /// Starting position.
    pub position: Position,
    /// Starting heading in radians.
    pub heading: f64,
}

/// Hands out entity IDs and random starting placements.
#[derive(Debug, Clone)]
pub struct Spawner {
    next_id: u64,
    map_size: f64,
}

impl Spawner {
    /// Create a spawner for a map of the configured size.
    pub const fn new(config: &HostConfig) -> Self {
        Self {
            next_id: 1,
            map_size: config.map_size,
        }
    }

    /// Place one entity of `class` at a random point of the map.
    pub fn spawn(&mut self, class: EntityClass, rng: &mut impl Rng) -> Spawn {
        let id = EntityId::new(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        Spawn {
            id,
            class,
            position: Position::new(
                rng.random_range(0.0..self.map_size),
                rng.random_range(0.0..400.0),
                rng.random_range(0.0..self.map_size),
            ),
            heading: rng.random_range(0.0..core::f64::consts::TAU),
        }
    }

    /// Place the full starting population.
    pub fn populate(&mut self, config: &HostConfig, rng: &mut impl Rng) -> Vec<Spawn> {
        let ai = (0..config.ai_count).map(|_| EntityClass::Ai);
        let infected = (0..config.infected_count).map(|_| EntityClass::Infected);
        ai.chain(infected)
            .map(|class| self.spawn(class, rng))
            .collect()
    }
}
