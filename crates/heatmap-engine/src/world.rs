//! Simulated world for the demonstration host.
//!
//! Entities wander the map with a jittering heading. AI actors mount and
//! dismount vehicles, die, or leave the server; infected shamble and die.
//! Each [`SimulatedWorld::step`] returns the lifecycle events the host must
//! forward to the recorder. Corpses stay in the world for one step so the
//! recorder can still read their death position.

use std::collections::BTreeMap;

use heatmap_core::host::EntitySensors;
use heatmap_types::{EntityClass, EntityId, Position};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::spawner::{HostConfig, Spawn, Spawner};

/// Walking speed in metres per second.
const WALK_SPEED: f64 = 1.6;

/// Driving speed in metres per second.
const VEHICLE_SPEED: f64 = 14.0;

/// Infected wandering speed in metres per second.
const SHAMBLE_SPEED: f64 = 0.9;

/// Maximum heading change per second, in radians.
const HEADING_JITTER: f64 = 0.35;

/// A lifecycle change the host forwards to the recorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldEvent {
    /// A new entity entered the world and is selected by the host.
    Spawned(EntityId, EntityClass),
    /// An entity died this step. Its body is still present.
    Killed(EntityId),
    /// A living entity left the world.
    Left(EntityId),
}

/// One simulated entity.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Body {
    class: EntityClass,
    position: Position,
    heading: f64,
    alive: bool,
    in_vehicle: bool,
}

impl From<Spawn> for Body {
    fn from(spawn: Spawn) -> Self {
        Self {
            class: spawn.class,
            position: spawn.position,
            heading: spawn.heading,
            alive: true,
            in_vehicle: false,
        }
    }
}

/// Deterministic world state driven by a seeded RNG.
#[derive(Debug, Clone)]
pub struct SimulatedWorld {
    config: HostConfig,
    spawner: Spawner,
    rng: SmallRng,
    bodies: BTreeMap<EntityId, Body>,
}

impl SimulatedWorld {
    /// Create an empty world.
    pub fn new(config: &HostConfig) -> Self {
        Self {
            config: config.clone(),
            spawner: Spawner::new(config),
            rng: SmallRng::seed_from_u64(config.seed),
            bodies: BTreeMap::new(),
        }
    }

    /// Spawn the starting population.
    pub fn populate(&mut self) -> Vec<WorldEvent> {
        let spawns = self.spawner.populate(&self.config, &mut self.rng);
        spawns.into_iter().map(|spawn| self.insert(spawn)).collect()
    }

    /// Advance the world by `dt_secs` simulated seconds.
    pub fn step(&mut self, dt_secs: f64) -> Vec<WorldEvent> {
        let mut events = Vec::new();

        // Corpses from the previous step have been reported; clear them.
        self.bodies.retain(|_, body| body.alive);

        let mut departed = Vec::new();
        for (&id, body) in &mut self.bodies {
            let (death_chance, speed) = match body.class {
                EntityClass::Ai => {
                    if body.in_vehicle {
                        if self.rng.random_bool(odds(self.config.dismount_chance, dt_secs)) {
                            body.in_vehicle = false;
                        }
                    } else if self.rng.random_bool(odds(self.config.mount_chance, dt_secs)) {
                        body.in_vehicle = true;
                    }
                    let speed = if body.in_vehicle { VEHICLE_SPEED } else { WALK_SPEED };
                    (self.config.ai_death_chance, speed)
                }
                EntityClass::Infected => (self.config.infected_death_chance, SHAMBLE_SPEED),
            };

            let jitter = HEADING_JITTER * dt_secs;
            body.heading += self.rng.random_range(-1.0_f64..=1.0) * jitter;
            let distance = speed * dt_secs;
            body.position.x =
                (body.position.x + body.heading.cos() * distance).clamp(0.0, self.config.map_size);
            body.position.z =
                (body.position.z + body.heading.sin() * distance).clamp(0.0, self.config.map_size);

            if self.rng.random_bool(odds(death_chance, dt_secs)) {
                body.alive = false;
                body.in_vehicle = false;
                events.push(WorldEvent::Killed(id));
            } else if body.class == EntityClass::Ai
                && self.rng.random_bool(odds(self.config.leave_chance, dt_secs))
            {
                departed.push(id);
            }
        }

        for id in departed {
            self.bodies.remove(&id);
            events.push(WorldEvent::Left(id));
        }

        events.extend(self.refill());
        events
    }

    /// Number of living entities of `class`.
    pub fn living(&self, class: EntityClass) -> usize {
        self.bodies
            .values()
            .filter(|body| body.alive && body.class == class)
            .count()
    }

    fn refill(&mut self) -> Vec<WorldEvent> {
        let mut events = Vec::new();
        for (class, target) in [
            (EntityClass::Ai, self.config.ai_count),
            (EntityClass::Infected, self.config.infected_count),
        ] {
            let target = usize::try_from(target).unwrap_or(usize::MAX);
            for _ in self.living(class)..target {
                let spawn = self.spawner.spawn(class, &mut self.rng);
                events.push(self.insert(spawn));
            }
        }
        events
    }

    fn insert(&mut self, spawn: Spawn) -> WorldEvent {
        self.bodies.insert(spawn.id, Body::from(spawn));
        WorldEvent::Spawned(spawn.id, spawn.class)
    }
}

/// Chance of an event with per-second probability `per_sec` happening
/// within `dt_secs`, clamped to a valid probability.
const fn odds(per_sec: f64, dt_secs: f64) -> f64 {
    (per_sec * dt_secs).clamp(0.0, 1.0)
}

impl EntitySensors for SimulatedWorld {
    fn position(&self, entity: EntityId) -> Option<Position> {
        self.bodies.get(&entity).map(|body| body.position)
    }

    fn is_alive(&self, entity: EntityId) -> bool {
        self.bodies.get(&entity).is_some_and(|body| body.alive)
    }

    fn is_selected(&self, entity: EntityId) -> bool {
        self.bodies
            .get(&entity)
            .is_some_and(|body| body.class == EntityClass::Ai)
    }

    fn is_in_vehicle(&self, entity: EntityId) -> bool {
        self.bodies.get(&entity).is_some_and(|body| body.in_vehicle)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config() -> HostConfig {
        HostConfig {
            ai_count: 4,
            infected_count: 6,
            map_size: 1_000.0,
            ..HostConfig::default()
        }
    }

    #[test]
    fn populate_announces_every_spawn() {
        let mut world = SimulatedWorld::new(&config());
        let events = world.populate();

        assert_eq!(events.len(), 10);
        assert!(events.iter().all(|e| matches!(e, WorldEvent::Spawned(..))));
        assert_eq!(world.living(EntityClass::Ai), 4);
        assert_eq!(world.living(EntityClass::Infected), 6);
    }

    #[test]
    fn population_is_refilled_after_deaths() {
        let mut world = SimulatedWorld::new(&HostConfig {
            infected_death_chance: 1.0,
            ..config()
        });
        world.populate();

        let events = world.step(1.0);
        let killed: Vec<EntityId> = events
            .iter()
            .filter_map(|e| match e {
                WorldEvent::Killed(id) => Some(*id),
                _ => None,
            })
            .collect();
        assert_eq!(killed.len(), 6);

        // Corpses answer sensor calls until the next step.
        for id in &killed {
            assert!(!world.is_alive(*id));
            assert!(world.position(*id).is_some());
        }
        assert_eq!(world.living(EntityClass::Infected), 6);

        world.step(1.0);
        assert!(killed.iter().all(|id| world.position(*id).is_none()));
    }

    #[test]
    fn entities_stay_on_the_map() {
        let mut world = SimulatedWorld::new(&HostConfig {
            mount_chance: 1.0,
            ai_death_chance: 0.0,
            infected_death_chance: 0.0,
            leave_chance: 0.0,
            ..config()
        });
        let events = world.populate();

        for _ in 0..500 {
            world.step(5.0);
        }
        for event in events {
            if let WorldEvent::Spawned(id, _) = event {
                let position = world.position(id).unwrap();
                assert!((0.0..=1_000.0).contains(&position.x));
                assert!((0.0..=1_000.0).contains(&position.z));
            }
        }
    }

    #[test]
    fn only_ai_is_selected() {
        let mut world = SimulatedWorld::new(&config());
        let events = world.populate();
        for event in events {
            if let WorldEvent::Spawned(id, class) = event {
                assert_eq!(world.is_selected(id), class == EntityClass::Ai);
            }
        }
    }
}
