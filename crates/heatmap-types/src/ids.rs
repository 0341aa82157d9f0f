//! Type-safe identifier wrapper for host entities.
//!
//! The host hands out numeric network identifiers for every entity it
//! simulates. Wrapping them prevents mixing entity IDs with tick counters
//! or timestamps at compile time.

use serde::{Deserialize, Serialize};

/// Generates a newtype wrapper around a host-assigned `u64` with standard
/// derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl $name {
            /// Wrap a raw host identifier.
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// Return the inner host identifier.
            pub const fn into_inner(self) -> u64 {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Identifier of a host entity (AI actor or infected) under tracking.
    EntityId
}
