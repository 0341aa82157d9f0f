//! Per-entity track state and the sampling policy.
//!
//! Every tracked entity owns one [`Trackable`] tracker for its lifetime.
//! The host advances it once per tick and notifies it once on death:
//!
//! - [`AiTracker`] samples its entity on a cooldown while the entity is
//!   selected and alive, writing into a track published in the
//!   [`HeatmapDataset`]. The cooldown is shorter while the entity is in a
//!   vehicle.
//! - [`InfectedTracker`] only records the death position. Its own track is
//!   private and never published.
//!
//! On death both kinds append one terminal sample to their own track and
//! the same sample to the death collection for their class.
//!
//! # Cooldown semantics
//!
//! Elapsed time accumulates only on active ticks. When a sample is taken
//! the counter resets to exactly zero; overshoot past the interval is
//! discarded. Under irregular tick sizes this makes the effective interval
//! drift slightly longer than configured.

use heatmap_types::{EntityClass, EntityId, WaypointSample};
use tracing::debug;

use crate::config::SamplingConfig;
use crate::dataset::{DatasetError, HeatmapDataset, TrackHandle};
use crate::host::{EntitySensors, HostClock};

/// Everything a tracker may touch while handling a hook.
pub struct TrackContext<'a> {
    /// The session's aggregation buffer.
    pub dataset: &'a mut HeatmapDataset,
    /// Host entity sensors.
    pub sensors: &'a dyn EntitySensors,
    /// Host time source.
    pub clock: &'a dyn HostClock,
}

/// What a single tick did for one tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The entity is not eligible this tick (not selected, dead, or a kind
    /// that is not sampled per tick). The cooldown did not move.
    Inactive,
    /// Time accumulated but no sample was due.
    Cooling,
    /// A sample was appended to the entity's track.
    Sampled,
    /// A sample was due but the position lookup failed. The cooldown is
    /// kept, so the next active tick tries again.
    SensorSkipped,
}

/// What a death notification did for one tracker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KillOutcome {
    /// The terminal sample was appended to the entity's track and to the
    /// death collection for its class.
    Recorded(WaypointSample),
    /// The tracker had already handled a death; nothing was recorded.
    AlreadyDead,
    /// The position lookup failed; nothing was recorded.
    SensorSkipped,
}

/// Capability implemented by every tracked entity kind.
pub trait Trackable {
    /// The host entity this tracker follows.
    fn entity_id(&self) -> EntityId;

    /// The entity's kind.
    fn class(&self) -> EntityClass;

    /// Advance by one host tick of `dt_secs` seconds.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError`] if the tracker's track is not part of
    /// `ctx.dataset`.
    fn on_tick(
        &mut self,
        dt_secs: f64,
        ctx: &mut TrackContext<'_>,
    ) -> Result<TickOutcome, DatasetError>;

    /// Record the terminal sample. Only the first call has any effect.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError`] if the tracker's track is not part of
    /// `ctx.dataset`.
    fn on_killed(&mut self, ctx: &mut TrackContext<'_>) -> Result<KillOutcome, DatasetError>;

    /// The samples of this entity's own track.
    fn samples<'a>(&'a self, dataset: &'a HeatmapDataset) -> &'a [WaypointSample];
}

/// Sampling intervals shared by every [`AiTracker`] of a session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingPolicy {
    /// Seconds between samples on foot.
    pub base_interval_secs: f64,
    /// Seconds between samples while in a vehicle.
    pub vehicle_interval_secs: f64,
    /// Sample on the first active tick after activation.
    pub sample_on_activation: bool,
}

impl SamplingPolicy {
    /// Build a policy from the `sampling` config section.
    pub const fn from_config(config: &SamplingConfig) -> Self {
        Self {
            base_interval_secs: config.base_interval_secs,
            vehicle_interval_secs: config.vehicle_interval_secs,
            sample_on_activation: config.sample_on_activation,
        }
    }

    /// Whether a sample is due after `elapsed_secs` of active time.
    pub fn is_due(&self, elapsed_secs: f64, in_vehicle: bool) -> bool {
        (in_vehicle && elapsed_secs >= self.vehicle_interval_secs)
            || elapsed_secs >= self.base_interval_secs
    }

    const fn initial_cooldown(&self) -> f64 {
        if self.sample_on_activation {
            f64::MAX
        } else {
            0.0
        }
    }
}

impl Default for SamplingPolicy {
    fn default() -> Self {
        Self::from_config(&SamplingConfig::default())
    }
}

/// Build a sample for `entity` from the host's current position and time.
///
/// Returns `None` if the position lookup fails or yields non-finite
/// ground coordinates.
fn sample_entity(entity: EntityId, ctx: &TrackContext<'_>) -> Option<WaypointSample> {
    let position = ctx.sensors.position(entity)?;
    if !position.has_finite_ground() {
        return None;
    }
    Some(WaypointSample::at(position, ctx.clock.game_time_ms()))
}

/// Tick lengths that are negative or non-finite count as zero.
const fn sanitize_dt(dt_secs: f64) -> f64 {
    if dt_secs.is_finite() && dt_secs > 0.0 {
        dt_secs
    } else {
        0.0
    }
}

/// Tracker for an AI-controlled entity.
#[derive(Debug, Clone)]
pub struct AiTracker {
    entity: EntityId,
    policy: SamplingPolicy,
    cooldown_secs: f64,
    track: TrackHandle,
    dead: bool,
}

impl AiTracker {
    /// Register `entity` in `dataset` and start tracking it.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::AlreadyRegistered`] if the entity already
    /// owns a track.
    pub fn activate(
        entity: EntityId,
        policy: SamplingPolicy,
        dataset: &mut HeatmapDataset,
    ) -> Result<Self, DatasetError> {
        let track = dataset.register_tracked_entity(entity)?;
        Ok(Self {
            entity,
            policy,
            cooldown_secs: policy.initial_cooldown(),
            track,
            dead: false,
        })
    }

    /// Seconds of active time since the last sample.
    pub const fn cooldown_secs(&self) -> f64 {
        self.cooldown_secs
    }
}

impl Trackable for AiTracker {
    fn entity_id(&self) -> EntityId {
        self.entity
    }

    fn class(&self) -> EntityClass {
        EntityClass::Ai
    }

    fn on_tick(
        &mut self,
        dt_secs: f64,
        ctx: &mut TrackContext<'_>,
    ) -> Result<TickOutcome, DatasetError> {
        if self.dead || !ctx.sensors.is_selected(self.entity) || !ctx.sensors.is_alive(self.entity)
        {
            return Ok(TickOutcome::Inactive);
        }

        self.cooldown_secs += sanitize_dt(dt_secs);
        let in_vehicle = ctx.sensors.is_in_vehicle(self.entity);
        if !self.policy.is_due(self.cooldown_secs, in_vehicle) {
            return Ok(TickOutcome::Cooling);
        }

        let Some(sample) = sample_entity(self.entity, ctx) else {
            debug!(entity = %self.entity, "position unavailable, sample dropped");
            return Ok(TickOutcome::SensorSkipped);
        };
        ctx.dataset.append_to_track(self.track, sample)?;
        self.cooldown_secs = 0.0;
        Ok(TickOutcome::Sampled)
    }

    fn on_killed(&mut self, ctx: &mut TrackContext<'_>) -> Result<KillOutcome, DatasetError> {
        if self.dead {
            return Ok(KillOutcome::AlreadyDead);
        }
        self.dead = true;

        let Some(sample) = sample_entity(self.entity, ctx) else {
            debug!(entity = %self.entity_id(), "position unavailable, death point dropped");
            return Ok(KillOutcome::SensorSkipped);
        };
        ctx.dataset.append_to_track(self.track, sample)?;
        ctx.dataset.record_death(self.class(), sample);
        Ok(KillOutcome::Recorded(sample))
    }

    fn samples<'a>(&'a self, dataset: &'a HeatmapDataset) -> &'a [WaypointSample] {
        dataset.track(self.track).unwrap_or_default()
    }
}

/// Tracker for an infected entity.
#[derive(Debug, Clone)]
pub struct InfectedTracker {
    entity: EntityId,
    waypoints: Vec<WaypointSample>,
    dead: bool,
}

impl InfectedTracker {
    /// Start tracking `entity`.
    pub const fn new(entity: EntityId) -> Self {
        Self {
            entity,
            waypoints: Vec::new(),
            dead: false,
        }
    }
}

impl Trackable for InfectedTracker {
    fn entity_id(&self) -> EntityId {
        self.entity
    }

    fn class(&self) -> EntityClass {
        EntityClass::Infected
    }

    fn on_tick(
        &mut self,
        _dt_secs: f64,
        _ctx: &mut TrackContext<'_>,
    ) -> Result<TickOutcome, DatasetError> {
        Ok(TickOutcome::Inactive)
    }

    fn on_killed(&mut self, ctx: &mut TrackContext<'_>) -> Result<KillOutcome, DatasetError> {
        if self.dead {
            return Ok(KillOutcome::AlreadyDead);
        }
        self.dead = true;

        let Some(sample) = sample_entity(self.entity, ctx) else {
            debug!(entity = %self.entity_id(), "position unavailable, death point dropped");
            return Ok(KillOutcome::SensorSkipped);
        };
        self.waypoints.push(sample);
        ctx.dataset.record_death(self.class(), sample);
        Ok(KillOutcome::Recorded(sample))
    }

    fn samples<'a>(&'a self, _dataset: &'a HeatmapDataset) -> &'a [WaypointSample] {
        &self.waypoints
    }
}
