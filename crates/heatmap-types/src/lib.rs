//! Shared type definitions for the heatmap telemetry aggregator.
//!
//! This crate holds the value types that flow between the host seams, the
//! aggregation buffer, and the persisted snapshot format.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe wrapper for host entity identifiers
//! - [`enums`] -- Entity classification
//! - [`sample`] -- Positions and recorded waypoint samples

pub mod enums;
pub mod ids;
pub mod sample;

// Re-export all public types at crate root for convenience.
pub use enums::EntityClass;
pub use ids::EntityId;
pub use sample::{Position, WaypointSample};
