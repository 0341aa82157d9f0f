//! Seams to the host simulation.
//!
//! The recorder never talks to the game directly. It reads entity state and
//! time through [`EntitySensors`] and [`HostClock`], and writes files through
//! [`SnapshotStorage`]. The host implements these traits over its own
//! entity and file APIs; tests implement them with scripted fakes.

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{Local, NaiveDateTime};
use heatmap_types::{EntityId, Position};

/// Errors raised by a [`SnapshotStorage`] backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The output directory could not be created.
    #[error("failed to create directory {path:?}: {source}")]
    CreateDir {
        /// Directory that was being created.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The snapshot file could not be written.
    #[error("failed to write {path:?}: {source}")]
    Write {
        /// File that was being written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The dataset could not be encoded as JSON.
    #[error("failed to serialize snapshot: {source}")]
    Serialize {
        /// The underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

/// Read-only time sources offered by the host.
pub trait HostClock {
    /// Current wall-clock date and time in the server's local zone.
    fn wall_clock(&self) -> NaiveDateTime;

    /// Monotonic host game time in milliseconds since the host started.
    fn game_time_ms(&self) -> u64;
}

/// Read-only per-entity sensor calls offered by the host.
///
/// Lookups for unknown entities should answer `None` / `false` rather
/// than fail; the recorder treats that as "nothing to sample".
pub trait EntitySensors {
    /// Current world position, or `None` if the lookup failed.
    fn position(&self, entity: EntityId) -> Option<Position>;

    /// Whether the entity is alive.
    fn is_alive(&self, entity: EntityId) -> bool;

    /// Whether the host currently has the entity selected (active).
    fn is_selected(&self, entity: EntityId) -> bool;

    /// Whether the entity is currently mounted in a vehicle.
    fn is_in_vehicle(&self, entity: EntityId) -> bool;
}

/// Storage primitives offered by the host.
///
/// `write_file` must fully replace any existing file at the path.
pub trait SnapshotStorage {
    /// Whether anything exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Create `path` and any missing parents.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::CreateDir`] if the directory cannot be created.
    fn create_dir(&self, path: &Path) -> Result<(), StorageError>;

    /// Write `contents` to `path`, overwriting any existing file.
    ///
    /// A failed write must leave any previous file at `path` intact.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Write`] if the file cannot be written.
    fn write_file(&self, path: &Path, contents: &[u8]) -> Result<(), StorageError>;
}

impl<T: SnapshotStorage + ?Sized> SnapshotStorage for &T {
    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }

    fn create_dir(&self, path: &Path) -> Result<(), StorageError> {
        (**self).create_dir(path)
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> Result<(), StorageError> {
        (**self).write_file(path, contents)
    }
}

/// [`SnapshotStorage`] over the local filesystem.
///
/// Files are written to a temporary sibling and renamed over the target,
/// so readers only ever see a complete snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStorage;

impl FsStorage {
    /// Create a filesystem storage backend.
    pub const fn new() -> Self {
        Self
    }
}

impl SnapshotStorage for FsStorage {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir(&self, path: &Path) -> Result<(), StorageError> {
        std::fs::create_dir_all(path).map_err(|source| StorageError::CreateDir {
            path: path.to_path_buf(),
            source,
        })
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> Result<(), StorageError> {
        let write_error = |source| StorageError::Write {
            path: path.to_path_buf(),
            source,
        };
        let dir = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut staged = tempfile::NamedTempFile::new_in(dir).map_err(write_error)?;
        staged.write_all(contents).map_err(write_error)?;
        staged.as_file().sync_all().map_err(write_error)?;
        staged
            .persist(path)
            .map_err(|persist| write_error(persist.error))?;
        Ok(())
    }
}

/// [`HostClock`] backed by the operating system.
///
/// Game time counts from the moment the clock was created.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    started: Instant,
}

impl SystemClock {
    /// Start a new system clock at game time zero.
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl HostClock for SystemClock {
    fn wall_clock(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn game_time_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// [`HostClock`] advanced explicitly by the caller.
///
/// Used by hosts that run on simulated time and by tests. The wall clock
/// is frozen at the value given on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManualClock {
    wall: NaiveDateTime,
    game_time_ms: u64,
}

impl ManualClock {
    /// Create a clock frozen at `wall` with game time zero.
    pub const fn new(wall: NaiveDateTime) -> Self {
        Self {
            wall,
            game_time_ms: 0,
        }
    }

    /// Advance game time by `dt_secs` seconds. Negative or non-finite
    /// values are ignored.
    pub fn advance(&mut self, dt_secs: f64) {
        if !dt_secs.is_finite() || dt_secs <= 0.0 {
            return;
        }
        // Bounded by the check above and the saturating conversion below.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let dt_ms = (dt_secs * 1_000.0).round() as u64;
        self.game_time_ms = self.game_time_ms.saturating_add(dt_ms);
    }

    /// Jump game time to an absolute value.
    pub const fn set_game_time_ms(&mut self, game_time_ms: u64) {
        self.game_time_ms = game_time_ms;
    }
}

impl HostClock for ManualClock {
    fn wall_clock(&self) -> NaiveDateTime {
        self.wall
    }

    fn game_time_ms(&self) -> u64 {
        self.game_time_ms
    }
}
