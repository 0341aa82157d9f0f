//! Reader for persisted session files.
//!
//! [`HeatmapSnapshot`] mirrors the on-disk layout written by
//! [`SessionWriter`](crate::writer::SessionWriter). Reading a file back
//! yields the same collections, in the same order, with the same sample
//! tuples. Missing keys are read as empty collections.

use std::path::{Path, PathBuf};

use heatmap_types::WaypointSample;
use serde::{Deserialize, Serialize};

use crate::dataset::DatasetStats;

/// Errors that can occur when reading a session file.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// The file could not be read.
    #[error("failed to read {path:?}: {source}")]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The contents are not a valid session snapshot.
    #[error("failed to parse snapshot: {source}")]
    Parse {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },
}

/// Owned contents of one session file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HeatmapSnapshot {
    /// One track per AI entity, in registration order.
    #[serde(rename = "m_AIWayPoints", default)]
    pub ai_tracks: Vec<Vec<WaypointSample>>,

    /// AI death points in recording order.
    #[serde(rename = "m_AIDeathPoints", default)]
    pub ai_death_points: Vec<WaypointSample>,

    /// Infected death points in recording order.
    #[serde(rename = "m_ZombiePoints", default)]
    pub zombie_points: Vec<WaypointSample>,
}

impl HeatmapSnapshot {
    /// Aggregate counts over all collections.
    pub fn stats(&self) -> DatasetStats {
        DatasetStats {
            tracks: self.ai_tracks.len(),
            track_samples: self.ai_tracks.iter().map(Vec::len).sum(),
            ai_deaths: self.ai_death_points.len(),
            zombie_deaths: self.zombie_points.len(),
        }
    }
}

/// Parse a snapshot from raw JSON bytes.
///
/// # Errors
///
/// Returns [`ReadError::Parse`] if the bytes are not a valid snapshot.
pub fn parse_snapshot(bytes: &[u8]) -> Result<HeatmapSnapshot, ReadError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Read and parse the session file at `path`.
///
/// # Errors
///
/// Returns [`ReadError::Io`] if the file cannot be read, or
/// [`ReadError::Parse`] if its contents are not a valid snapshot.
pub fn read_snapshot(path: &Path) -> Result<HeatmapSnapshot, ReadError> {
    let bytes = std::fs::read(path).map_err(|source| ReadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_snapshot(&bytes)
}
