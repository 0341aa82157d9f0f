//! Error types for the heatmap engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during engine startup.

/// Top-level error for the heatmap engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Recorder configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: heatmap_core::config::ConfigError,
    },

    /// The recording session could not start.
    #[error("session error: {source}")]
    Session {
        /// The underlying session error.
        #[from]
        source: heatmap_core::session::SessionError,
    },

    /// The `host` config section is missing a usable value.
    #[error("host config error: {message}")]
    Host {
        /// Description of the host config failure.
        message: String,
    },
}
