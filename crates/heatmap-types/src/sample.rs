//! Positions and recorded waypoint samples.
//!
//! A [`WaypointSample`] reuses the host's 3-component vector layout, but
//! its middle component carries the host time in seconds instead of the
//! elevation. Downstream plotting tools read `x` and `z` as the ground
//! plane and the middle slot as a timestamp, so the layout must stay
//! exactly `[x, time, z]` on disk.

use serde::{Deserialize, Serialize};

/// Milliseconds per second of host game time.
const MS_PER_SECOND: u64 = 1_000;

/// A world-space position as reported by the host.
///
/// `y` is the elevation axis in the host's coordinate system.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// East-west ground coordinate.
    pub x: f64,
    /// Elevation.
    pub y: f64,
    /// North-south ground coordinate.
    pub z: f64,
}

impl Position {
    /// Create a position from its three components.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Return `true` if both ground coordinates are finite numbers.
    ///
    /// Elevation is not checked; a sample replaces it with the host time.
    pub const fn has_finite_ground(&self) -> bool {
        self.x.is_finite() && self.z.is_finite()
    }
}

/// One recorded observation: ground position plus a time marker.
///
/// Serialized as the 3-element array `[x, time_secs, z]`. Samples are
/// immutable once appended to a track or death-point collection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct WaypointSample {
    /// East-west ground coordinate.
    pub x: f64,
    /// Host time in whole seconds, stored in the elevation slot.
    pub time_secs: f64,
    /// North-south ground coordinate.
    pub z: f64,
}

impl WaypointSample {
    /// Build a sample from a host position and host game time.
    ///
    /// The elevation is discarded and replaced with `game_time_ms / 1000`
    /// truncated to whole seconds.
    pub fn at(position: Position, game_time_ms: u64) -> Self {
        let whole_secs = game_time_ms / MS_PER_SECOND;
        let time_secs = u32::try_from(whole_secs).map_or(f64::from(u32::MAX), f64::from);
        Self {
            x: position.x,
            time_secs,
            z: position.z,
        }
    }

    /// Create a sample from its raw components.
    pub const fn from_parts(x: f64, time_secs: f64, z: f64) -> Self {
        Self { x, time_secs, z }
    }

    /// Return the sample as the on-disk triple `[x, time_secs, z]`.
    pub const fn to_array(self) -> [f64; 3] {
        [self.x, self.time_secs, self.z]
    }
}

impl From<[f64; 3]> for WaypointSample {
    fn from([x, time_secs, z]: [f64; 3]) -> Self {
        Self { x, time_secs, z }
    }
}

impl From<WaypointSample> for [f64; 3] {
    fn from(sample: WaypointSample) -> Self {
        sample.to_array()
    }
}
