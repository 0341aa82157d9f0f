//! Session file naming and snapshot writing.
//!
//! The output path is derived once per session from the wall clock and
//! reused by every save, so each autosave overwrites the same file. Two
//! sessions started within the same wall-clock second share a path and
//! overwrite each other; the name carries no further disambiguation.

use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDateTime, Timelike};
use tracing::warn;

use crate::config::{AutosaveConfig, StorageConfig};
use crate::dataset::{DatasetStats, HeatmapDataset};
use crate::host::{SnapshotStorage, StorageError};

/// Build the session file name for a session started at `started`.
///
/// Components are plain integers without zero padding:
/// `session_2026-3-7_9-5-2_Heatmap.json`.
pub fn session_file_name(started: NaiveDateTime) -> String {
    format!(
        "session_{}-{}-{}_{}-{}-{}_Heatmap.json",
        started.year(),
        started.month(),
        started.day(),
        started.hour(),
        started.minute(),
        started.second(),
    )
}

/// Outcome of one successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    /// File that was written.
    pub path: PathBuf,
    /// Size of the written file in bytes.
    pub bytes: usize,
    /// Collection sizes at the moment of the save.
    pub stats: DatasetStats,
}

/// Writes the session's dataset to its fixed output path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionWriter {
    dir: PathBuf,
    path: PathBuf,
    pretty: bool,
}

impl SessionWriter {
    /// Derive the session path and make sure its directory exists.
    ///
    /// A directory that cannot be created is logged and retried on every
    /// save; it never prevents the session from starting. A directory
    /// removed later in the session is recreated by the next save.
    pub fn derive<S: SnapshotStorage + ?Sized>(
        storage_config: &StorageConfig,
        autosave_config: &AutosaveConfig,
        started: NaiveDateTime,
        storage: &S,
    ) -> Self {
        let dir = storage_config.output_dir();
        let path = dir.join(session_file_name(started));
        let writer = Self {
            dir,
            path,
            pretty: autosave_config.pretty,
        };
        if let Err(e) = writer.ensure_dir(storage) {
            warn!(error = %e, dir = %writer.dir.display(), "Heatmap directory unavailable, will retry on save");
        }
        writer
    }

    /// The session's output file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize `dataset` and overwrite the session file with it.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the directory cannot be created, the
    /// dataset cannot be encoded, or the file cannot be written. Nothing
    /// is retried here; the next scheduled save tries again.
    pub fn save<S: SnapshotStorage + ?Sized>(
        &self,
        storage: &S,
        dataset: &HeatmapDataset,
    ) -> Result<SaveReport, StorageError> {
        self.ensure_dir(storage)?;
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(dataset)?
        } else {
            serde_json::to_vec(dataset)?
        };
        storage.write_file(&self.path, &bytes)?;
        Ok(SaveReport {
            path: self.path.clone(),
            bytes: bytes.len(),
            stats: dataset.stats(),
        })
    }

    fn ensure_dir<S: SnapshotStorage + ?Sized>(&self, storage: &S) -> Result<(), StorageError> {
        if storage.exists(&self.dir) {
            return Ok(());
        }
        storage.create_dir(&self.dir)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;
    use heatmap_types::{EntityId, WaypointSample};

    use super::*;
    use crate::host::FsStorage;
    use crate::reader::read_snapshot;

    fn started() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 7)
            .unwrap()
            .and_hms_opt(9, 5, 2)
            .unwrap()
    }

    fn storage_config(root: &Path) -> StorageConfig {
        StorageConfig {
            profile_root: root.to_path_buf(),
            folder: "Heatmap".to_owned(),
        }
    }

    #[test]
    fn file_name_is_unpadded() {
        assert_eq!(
            session_file_name(started()),
            "session_2026-3-7_9-5-2_Heatmap.json"
        );
        let late = NaiveDate::from_ymd_opt(2026, 12, 31)
            .unwrap()
            .and_hms_opt(23, 59, 58)
            .unwrap();
        assert_eq!(
            session_file_name(late),
            "session_2026-12-31_23-59-58_Heatmap.json"
        );
    }

    #[test]
    fn derive_creates_directory() {
        let tmp = tempfile::TempDir::new().unwrap();
        let writer = SessionWriter::derive(
            &storage_config(tmp.path()),
            &AutosaveConfig::default(),
            started(),
            &FsStorage::new(),
        );

        assert!(tmp.path().join("Heatmap").is_dir());
        assert_eq!(
            writer.path(),
            tmp.path()
                .join("Heatmap")
                .join("session_2026-3-7_9-5-2_Heatmap.json")
        );
    }

    #[test]
    fn repeated_saves_overwrite_one_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let storage = FsStorage::new();
        let writer = SessionWriter::derive(
            &storage_config(tmp.path()),
            &AutosaveConfig::default(),
            started(),
            &storage,
        );

        let mut dataset = HeatmapDataset::new();
        let handle = dataset.register_tracked_entity(EntityId::new(3)).unwrap();
        let first = writer.save(&storage, &dataset).unwrap();

        dataset
            .append_to_track(handle, WaypointSample::from_parts(1.0, 2.0, 3.0))
            .unwrap();
        dataset.record_ai_death(WaypointSample::from_parts(1.0, 2.0, 3.0));
        let second = writer.save(&storage, &dataset).unwrap();

        assert_eq!(first.path, second.path);
        assert_eq!(second.stats.track_samples, 1);
        assert_eq!(std::fs::read_dir(tmp.path().join("Heatmap")).unwrap().count(), 1);
        assert_eq!(read_snapshot(&second.path).unwrap(), dataset.snapshot());
    }

    #[test]
    fn compact_output_is_single_line() {
        let tmp = tempfile::TempDir::new().unwrap();
        let storage = FsStorage::new();
        let compact = AutosaveConfig {
            pretty: false,
            ..AutosaveConfig::default()
        };
        let writer =
            SessionWriter::derive(&storage_config(tmp.path()), &compact, started(), &storage);

        let report = writer.save(&storage, &HeatmapDataset::new()).unwrap();
        let text = std::fs::read_to_string(&report.path).unwrap();
        assert_eq!(
            text,
            r#"{"m_AIWayPoints":[],"m_AIDeathPoints":[],"m_ZombiePoints":[]}"#
        );
        assert_eq!(report.bytes, text.len());
    }

    #[test]
    fn save_retries_directory_creation() {
        let tmp = tempfile::TempDir::new().unwrap();
        let blocker = tmp.path().join("profile");
        // A plain file where the profile directory should be.
        std::fs::write(&blocker, b"").unwrap();
        let storage = FsStorage::new();
        let writer = SessionWriter::derive(
            &storage_config(&blocker),
            &AutosaveConfig::default(),
            started(),
            &storage,
        );

        let err = writer.save(&storage, &HeatmapDataset::new()).unwrap_err();
        assert!(matches!(err, StorageError::CreateDir { .. }));

        std::fs::remove_file(&blocker).unwrap();
        assert!(writer.save(&storage, &HeatmapDataset::new()).is_ok());
        assert!(writer.path().is_file());
    }

    #[test]
    fn save_recreates_directory_removed_mid_session() {
        let tmp = tempfile::TempDir::new().unwrap();
        let storage = FsStorage::new();
        let writer = SessionWriter::derive(
            &storage_config(tmp.path()),
            &AutosaveConfig::default(),
            started(),
            &storage,
        );
        writer.save(&storage, &HeatmapDataset::new()).unwrap();

        std::fs::remove_dir_all(tmp.path().join("Heatmap")).unwrap();
        for _ in 0..3 {
            assert!(writer.save(&storage, &HeatmapDataset::new()).is_ok());
        }
        assert!(writer.path().is_file());
    }
}
