//! The session-wide aggregation buffer.
//!
//! [`HeatmapDataset`] accumulates every sample recorded during one session.
//! It holds three collections:
//!
//! - one track per tracked AI entity, addressed by a [`TrackHandle`],
//! - a flat list of AI death points,
//! - a flat list of infected (zombie) death points.
//!
//! Every mutation is an append. Nothing is ever removed or edited, so the
//! serialized form at any moment is a prefix-extension of every earlier
//! snapshot of the same session.
//!
//! The dataset serializes directly into the persisted JSON layout, using
//! the field names the downstream tooling expects.

use std::collections::BTreeMap;

use heatmap_types::{EntityClass, EntityId, WaypointSample};
use serde::Serialize;

use crate::reader::HeatmapSnapshot;

/// Errors raised by dataset mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DatasetError {
    /// The entity already owns a published track.
    #[error("entity {entity_id} is already registered")]
    AlreadyRegistered {
        /// The entity that was registered twice.
        entity_id: EntityId,
    },

    /// The handle does not address a track of this dataset.
    #[error("no track with handle {index}")]
    UnknownTrack {
        /// Raw index carried by the handle.
        index: usize,
    },
}

/// Opaque reference to one published AI track.
///
/// Only [`HeatmapDataset::register_tracked_entity`] creates handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TrackHandle(usize);

impl TrackHandle {
    /// Position of the track in the persisted track list.
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Aggregate counts over a dataset, used for log lines and save reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DatasetStats {
    /// Number of published AI tracks.
    pub tracks: usize,
    /// Total samples across all AI tracks.
    pub track_samples: usize,
    /// Number of AI death points.
    pub ai_deaths: usize,
    /// Number of infected death points.
    pub zombie_deaths: usize,
}

/// The append-only accumulator for one session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HeatmapDataset {
    /// One track per registered AI entity, in registration order.
    #[serde(rename = "m_AIWayPoints")]
    ai_tracks: Vec<Vec<WaypointSample>>,

    /// Terminal position of every tracked AI entity that died.
    #[serde(rename = "m_AIDeathPoints")]
    ai_death_points: Vec<WaypointSample>,

    /// Terminal position of every tracked infected entity that died.
    #[serde(rename = "m_ZombiePoints")]
    zombie_points: Vec<WaypointSample>,

    /// Which entity owns which track.
    #[serde(skip)]
    registry: BTreeMap<EntityId, TrackHandle>,
}

impl HeatmapDataset {
    /// Create an empty dataset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a new, empty track for `entity` and return its handle.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::AlreadyRegistered`] if the entity already
    /// has a track. Registering twice is a caller error; the existing
    /// track is left untouched.
    pub fn register_tracked_entity(
        &mut self,
        entity: EntityId,
    ) -> Result<TrackHandle, DatasetError> {
        if self.registry.contains_key(&entity) {
            return Err(DatasetError::AlreadyRegistered { entity_id: entity });
        }
        let handle = TrackHandle(self.ai_tracks.len());
        self.ai_tracks.push(Vec::new());
        self.registry.insert(entity, handle);
        Ok(handle)
    }

    /// Append a sample to the track behind `handle`.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::UnknownTrack`] if the handle was issued by a
    /// different dataset.
    pub fn append_to_track(
        &mut self,
        handle: TrackHandle,
        sample: WaypointSample,
    ) -> Result<(), DatasetError> {
        let track = self
            .ai_tracks
            .get_mut(handle.0)
            .ok_or(DatasetError::UnknownTrack { index: handle.0 })?;
        track.push(sample);
        Ok(())
    }

    /// Append an AI death point.
    pub fn record_ai_death(&mut self, sample: WaypointSample) {
        self.ai_death_points.push(sample);
    }

    /// Append an infected death point.
    pub fn record_zombie_death(&mut self, sample: WaypointSample) {
        self.zombie_points.push(sample);
    }

    /// Append a death point to the collection for `class`.
    pub fn record_death(&mut self, class: EntityClass, sample: WaypointSample) {
        match class {
            EntityClass::Ai => self.record_ai_death(sample),
            EntityClass::Infected => self.record_zombie_death(sample),
        }
    }

    /// All published AI tracks in registration order.
    pub fn ai_tracks(&self) -> &[Vec<WaypointSample>] {
        &self.ai_tracks
    }

    /// The samples of one track, if the handle belongs to this dataset.
    pub fn track(&self, handle: TrackHandle) -> Option<&[WaypointSample]> {
        self.ai_tracks.get(handle.0).map(Vec::as_slice)
    }

    /// AI death points in recording order.
    pub fn ai_death_points(&self) -> &[WaypointSample] {
        &self.ai_death_points
    }

    /// Infected death points in recording order.
    pub fn zombie_points(&self) -> &[WaypointSample] {
        &self.zombie_points
    }

    /// Number of entities with a published track.
    pub fn tracked_entity_count(&self) -> usize {
        self.ai_tracks.len()
    }

    /// Aggregate counts over all collections.
    pub fn stats(&self) -> DatasetStats {
        DatasetStats {
            tracks: self.ai_tracks.len(),
            track_samples: self.ai_tracks.iter().map(Vec::len).sum(),
            ai_deaths: self.ai_death_points.len(),
            zombie_deaths: self.zombie_points.len(),
        }
    }

    /// Copy the current contents into an owned, persisted-format snapshot.
    pub fn snapshot(&self) -> HeatmapSnapshot {
        HeatmapSnapshot {
            ai_tracks: self.ai_tracks.clone(),
            ai_death_points: self.ai_death_points.clone(),
            zombie_points: self.zombie_points.clone(),
        }
    }
}
