//! Enumeration types shared across the workspace.

use serde::{Deserialize, Serialize};

/// The kind of tracked entity.
///
/// Determines which death-point collection a terminal sample lands in and
/// whether the entity is sampled on every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityClass {
    /// An AI-controlled actor (including AI counterparts of players).
    /// Sampled on a cooldown while alive; its track is published.
    Ai,
    /// An infected (zombie). Only its death position is recorded.
    Infected,
}

impl core::fmt::Display for EntityClass {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Ai => write!(f, "ai"),
            Self::Infected => write!(f, "infected"),
        }
    }
}
