//! Demonstration host for the heatmap recorder.
//!
//! Runs a simulated server: AI actors and infected wander a square map,
//! mount vehicles, die and respawn. Every lifecycle change is forwarded to
//! a [`HeatmapSession`] through the same hooks a game host would call.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `heatmap-config.yaml` (or the path given as
//!    the first argument)
//! 2. Initialize structured logging (tracing)
//! 3. Start the recording session on a simulated game clock
//! 4. Spawn the starting population
//! 5. Run the tick loop until `max_ticks` or Ctrl-C
//! 6. Write the final snapshot

mod error;
mod spawner;
mod world;

use std::path::{Path, PathBuf};
use std::time::Duration;

use heatmap_core::config::{HeatmapConfig, LogFormat, LoggingConfig};
use heatmap_core::host::{FsStorage, ManualClock, SnapshotStorage};
use heatmap_core::session::HeatmapSession;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::spawner::HostConfig;
use crate::world::{SimulatedWorld, WorldEvent};

/// Default configuration file, relative to the working directory.
const CONFIG_FILE: &str = "heatmap-config.yaml";

/// Application entry point for the demonstration host.
///
/// # Errors
///
/// Returns an error if configuration loading or session start-up fails.
/// A failed final save is logged, not returned.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from(CONFIG_FILE), PathBuf::from);

    // 1. Load configuration.
    let config = load_config(&config_path)?;
    let host = load_host_config(&config_path)?;

    // 2. Initialize structured logging.
    init_logging(&config.logging);
    info!(config = %config_path.display(), "heatmap-engine starting");
    info!(
        seed = host.seed,
        tick_interval_ms = host.tick_interval_ms,
        time_scale = host.time_scale,
        ai_count = host.ai_count,
        infected_count = host.infected_count,
        "Host configuration loaded"
    );

    // 3. Start the session.
    let mut clock = ManualClock::new(chrono::Local::now().naive_local());
    let mut session = start_session(&config, &clock, FsStorage::new())?;

    // 4. Spawn the starting population.
    let mut world = SimulatedWorld::new(&host);
    let spawned = world.populate();
    apply_events(&mut session, &world, &clock, &spawned);
    info!(entities = spawned.len(), "Starting population spawned");

    // 5. Tick loop.
    let dt_secs = host.tick_secs();
    let mut interval = tokio::time::interval(Duration::from_millis(host.tick_interval_ms));
    let mut ticks: u64 = 0;
    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!(ticks, "Interrupted, shutting down");
                break;
            }
        }

        clock.advance(dt_secs);
        let events = world.step(dt_secs);
        apply_events(&mut session, &world, &clock, &events);
        let summary = session.on_tick(dt_secs, &world, &clock);
        debug!(
            tick = ticks,
            samples_taken = summary.samples_taken,
            sensor_skips = summary.sensor_skips,
            trackers = session.active_trackers(),
            "Tick complete"
        );

        ticks = ticks.saturating_add(1);
        if host.max_ticks > 0 && ticks >= host.max_ticks {
            info!(ticks, "Tick limit reached, shutting down");
            break;
        }
    }

    // 6. Final save.
    match session.on_shutdown() {
        Ok(report) => info!(
            path = %report.path.display(),
            tracks = report.stats.tracks,
            track_samples = report.stats.track_samples,
            ai_deaths = report.stats.ai_deaths,
            zombie_deaths = report.stats.zombie_deaths,
            "heatmap-engine shutdown complete"
        ),
        Err(e) => error!(error = %e, "Final heatmap save failed"),
    }

    Ok(())
}

/// Start the recording session on the host clock.
fn start_session<S: SnapshotStorage>(
    config: &HeatmapConfig,
    clock: &ManualClock,
    storage: S,
) -> Result<HeatmapSession<S>, EngineError> {
    Ok(HeatmapSession::start(config, clock, storage)?)
}

/// Forward world events to the session hooks.
fn apply_events<S: SnapshotStorage>(
    session: &mut HeatmapSession<S>,
    world: &SimulatedWorld,
    clock: &ManualClock,
    events: &[WorldEvent],
) {
    for event in events {
        match *event {
            WorldEvent::Spawned(id, class) => {
                if let Err(e) = session.on_entity_activated(id, class) {
                    warn!(entity_id = %id, error = %e, "Entity activation rejected");
                }
            }
            WorldEvent::Killed(id) => {
                if session.on_entity_killed(id, world, clock).is_none() {
                    debug!(entity_id = %id, "Kill for untracked entity ignored");
                }
            }
            WorldEvent::Left(id) => {
                session.on_entity_removed(id);
            }
        }
    }
}

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins over the configured level when set.
fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.as_str()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    match logging.format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Load the recorder configuration.
///
/// A missing file falls back to defaults.
fn load_config(path: &Path) -> Result<HeatmapConfig, EngineError> {
    if path.exists() {
        Ok(HeatmapConfig::from_file(path)?)
    } else {
        let mut config = HeatmapConfig::default();
        config.storage.apply_env_overrides();
        Ok(config)
    }
}

/// Load the `host` section of the config file.
///
/// If the file does not exist or lacks the `host` key, defaults are used.
fn load_host_config(path: &Path) -> Result<HostConfig, EngineError> {
    let host = if path.exists() {
        let contents = std::fs::read_to_string(path).map_err(|e| EngineError::Host {
            message: format!("failed to read config file: {e}"),
        })?;

        // Parse the full YAML and extract just the "host" section.
        let raw: serde_yml::Value =
            serde_yml::from_str(&contents).map_err(|e| EngineError::Host {
                message: format!("failed to parse config YAML: {e}"),
            })?;

        match raw.get("host") {
            Some(value) => {
                serde_yml::from_value(value.clone()).map_err(|e| EngineError::Host {
                    message: format!("failed to parse host config: {e}"),
                })?
            }
            None => HostConfig::default(),
        }
    } else {
        HostConfig::default()
    };
    host.validate()?;
    Ok(host)
}
