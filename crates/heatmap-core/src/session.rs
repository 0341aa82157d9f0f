//! Session lifecycle: the hooks the host calls.
//!
//! [`HeatmapSession`] is the explicit context for one recording session.
//! It bundles the dataset, the per-entity trackers, the autosave scheduler,
//! and the session writer, and exposes one method per host hook:
//!
//! | Host hook            | Method                                   |
//! |----------------------|------------------------------------------|
//! | `OnInit`             | [`HeatmapSession::start`]                |
//! | `OnTick(dt)`         | [`HeatmapSession::on_tick`]              |
//! | `OnEntityActivated`  | [`HeatmapSession::on_entity_activated`]  |
//! | `OnEntityKilled`     | [`HeatmapSession::on_entity_killed`]     |
//! | `OnEntityRemoved`    | [`HeatmapSession::on_entity_removed`]    |
//! | `OnShutdown`         | [`HeatmapSession::on_shutdown`]          |
//!
//! All hooks take `&mut self`, so the host's update loop is the only
//! writer. [`HeatmapSession::on_shutdown`] consumes the session: once the
//! final save has run no further tick can be delivered.

use std::collections::BTreeMap;
use std::path::Path;

use heatmap_types::{EntityClass, EntityId};
use tracing::{debug, info, warn};

use crate::autosave::AutosaveScheduler;
use crate::config::{ConfigError, HeatmapConfig};
use crate::dataset::{DatasetError, HeatmapDataset};
use crate::host::{EntitySensors, HostClock, SnapshotStorage, StorageError};
use crate::tracking::{
    AiTracker, InfectedTracker, KillOutcome, SamplingPolicy, TickOutcome, TrackContext, Trackable,
};
use crate::writer::{SaveReport, SessionWriter};

/// Errors returned by session hooks that a caller can cause.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The configuration handed to [`HeatmapSession::start`] is unusable.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// The entity is already being tracked in this session.
    #[error("entity {entity_id} is already tracked")]
    AlreadyTracked {
        /// The entity that was activated twice.
        entity_id: EntityId,
    },

    /// The dataset rejected the registration.
    #[error("dataset error: {source}")]
    Dataset {
        /// The underlying dataset error.
        #[from]
        source: DatasetError,
    },
}

/// What one call to [`HeatmapSession::on_tick`] did.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TickSummary {
    /// Trackers that appended a sample this tick.
    pub samples_taken: usize,
    /// Trackers whose due sample was dropped for missing sensor data.
    pub sensor_skips: usize,
    /// The autosave that ran this tick, if any.
    pub autosave: Option<SaveReport>,
}

/// One recording session.
pub struct HeatmapSession<S: SnapshotStorage> {
    dataset: HeatmapDataset,
    trackers: BTreeMap<EntityId, Box<dyn Trackable>>,
    policy: SamplingPolicy,
    scheduler: AutosaveScheduler,
    writer: SessionWriter,
    storage: S,
}

impl<S: SnapshotStorage> HeatmapSession<S> {
    /// Start a session: derive the output path from the host wall clock
    /// and make sure the output directory exists.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Config`] if `config` fails validation. A
    /// missing or uncreatable directory is logged, not returned.
    pub fn start(
        config: &HeatmapConfig,
        clock: &dyn HostClock,
        storage: S,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        let writer = SessionWriter::derive(
            &config.storage,
            &config.autosave,
            clock.wall_clock(),
            &storage,
        );

        info!(session_file = %writer.path().display(), "Heatmap initialized");
        info!(
            interval_secs = config.autosave.interval_secs,
            base_interval_secs = config.sampling.base_interval_secs,
            vehicle_interval_secs = config.sampling.vehicle_interval_secs,
            "Heatmap autosave scheduled"
        );

        Ok(Self {
            dataset: HeatmapDataset::new(),
            trackers: BTreeMap::new(),
            policy: SamplingPolicy::from_config(&config.sampling),
            scheduler: AutosaveScheduler::from_config(&config.autosave),
            writer,
            storage,
        })
    }

    /// Advance every tracker and then the autosave scheduler by one host
    /// tick of `dt_secs` seconds.
    ///
    /// Entity trackers run first so an autosave fired this tick includes
    /// this tick's samples.
    pub fn on_tick(
        &mut self,
        dt_secs: f64,
        sensors: &dyn EntitySensors,
        clock: &dyn HostClock,
    ) -> TickSummary {
        let mut summary = TickSummary::default();
        let mut ctx = TrackContext {
            dataset: &mut self.dataset,
            sensors,
            clock,
        };

        for (entity, tracker) in &mut self.trackers {
            match tracker.on_tick(dt_secs, &mut ctx) {
                Ok(TickOutcome::Sampled) => {
                    summary.samples_taken = summary.samples_taken.saturating_add(1);
                }
                Ok(TickOutcome::SensorSkipped) => {
                    summary.sensor_skips = summary.sensor_skips.saturating_add(1);
                }
                Ok(TickOutcome::Inactive | TickOutcome::Cooling) => {}
                Err(e) => warn!(entity = %entity, error = %e, "tracker tick failed"),
            }
        }

        let writer = &self.writer;
        let storage = &self.storage;
        let dataset = &self.dataset;
        summary.autosave = self
            .scheduler
            .tick(dt_secs, |_| writer.save(storage, dataset))
            .and_then(|result| match result {
                Ok(report) => {
                    info!(
                        path = %report.path.display(),
                        bytes = report.bytes,
                        tracks = report.stats.tracks,
                        ai_deaths = report.stats.ai_deaths,
                        zombie_deaths = report.stats.zombie_deaths,
                        "Auto-saved heatmap data"
                    );
                    Some(report)
                }
                Err(e) => {
                    warn!(error = %e, "Heatmap autosave failed, retrying at next interval");
                    None
                }
            });

        summary
    }

    /// Start tracking a newly activated entity.
    ///
    /// AI entities get a published track; infected entities get a private
    /// one that only receives their death point.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::AlreadyTracked`] if the entity has a live
    /// tracker, or [`SessionError::Dataset`] if an AI entity already owns
    /// a published track from earlier in the session.
    pub fn on_entity_activated(
        &mut self,
        entity: EntityId,
        class: EntityClass,
    ) -> Result<(), SessionError> {
        if self.trackers.contains_key(&entity) {
            return Err(SessionError::AlreadyTracked { entity_id: entity });
        }
        let tracker: Box<dyn Trackable> = match class {
            EntityClass::Ai => Box::new(AiTracker::activate(
                entity,
                self.policy,
                &mut self.dataset,
            )?),
            EntityClass::Infected => Box::new(InfectedTracker::new(entity)),
        };
        debug!(entity = %entity, class = %class, "entity tracked");
        self.trackers.insert(entity, tracker);
        Ok(())
    }

    /// Record the terminal sample of a tracked entity and stop tracking it.
    ///
    /// Returns `None` if the entity is not tracked (never activated, or
    /// its death was already handled).
    pub fn on_entity_killed(
        &mut self,
        entity: EntityId,
        sensors: &dyn EntitySensors,
        clock: &dyn HostClock,
    ) -> Option<KillOutcome> {
        let Some(mut tracker) = self.trackers.remove(&entity) else {
            debug!(entity = %entity, "kill for untracked entity ignored");
            return None;
        };
        let mut ctx = TrackContext {
            dataset: &mut self.dataset,
            sensors,
            clock,
        };
        match tracker.on_killed(&mut ctx) {
            Ok(outcome) => {
                debug!(
                    entity = %tracker.entity_id(),
                    class = %tracker.class(),
                    ?outcome,
                    "entity killed"
                );
                Some(outcome)
            }
            Err(e) => {
                warn!(entity = %entity, error = %e, "death point not recorded");
                None
            }
        }
    }

    /// Stop tracking an entity that left the world without dying.
    ///
    /// Its published track stays in the dataset. Returns `false` if the
    /// entity was not tracked.
    pub fn on_entity_removed(&mut self, entity: EntityId) -> bool {
        self.trackers.remove(&entity).is_some()
    }

    /// Run the final save and end the session.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the final save fails. The failure is
    /// also logged.
    pub fn on_shutdown(mut self) -> Result<SaveReport, StorageError> {
        info!("Saving heatmap data...");
        let writer = &self.writer;
        let storage = &self.storage;
        let dataset = &self.dataset;
        let result = self
            .scheduler
            .shutdown(|_| writer.save(storage, dataset))
            .unwrap_or_else(|| writer.save(storage, dataset));

        match &result {
            Ok(report) => info!(
                path = %report.path.display(),
                bytes = report.bytes,
                tracks = report.stats.tracks,
                track_samples = report.stats.track_samples,
                ai_deaths = report.stats.ai_deaths,
                zombie_deaths = report.stats.zombie_deaths,
                "Data saved successfully"
            ),
            Err(e) => warn!(error = %e, "Heatmap final save failed"),
        }
        result
    }

    /// The session's aggregation buffer.
    pub const fn dataset(&self) -> &HeatmapDataset {
        &self.dataset
    }

    /// The session's output file.
    pub fn session_path(&self) -> &Path {
        self.writer.path()
    }

    /// The live tracker for `entity`, if any.
    pub fn tracker(&self, entity: EntityId) -> Option<&dyn Trackable> {
        self.trackers.get(&entity).map(|tracker| &**tracker)
    }

    /// Number of entities currently tracked.
    pub fn active_trackers(&self) -> usize {
        self.trackers.len()
    }
}

impl<S: SnapshotStorage> core::fmt::Debug for HeatmapSession<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HeatmapSession")
            .field("session_path", &self.writer.path())
            .field("active_trackers", &self.trackers.len())
            .field("stats", &self.dataset.stats())
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::collections::{BTreeMap, BTreeSet};
    use std::path::PathBuf;

    use chrono::NaiveDate;
    use heatmap_types::Position;

    use super::*;
    use crate::host::ManualClock;

    /// In-memory storage that records every write.
    ///
    /// Writes fail while `failing_writes` is non-zero or when the parent
    /// directory is missing.
    #[derive(Default)]
    struct MemoryStorage {
        dirs: RefCell<BTreeSet<PathBuf>>,
        files: RefCell<BTreeMap<PathBuf, Vec<u8>>>,
        writes: RefCell<Vec<PathBuf>>,
        failing_writes: Cell<usize>,
    }

    impl SnapshotStorage for MemoryStorage {
        fn exists(&self, path: &Path) -> bool {
            self.dirs.borrow().contains(path) || self.files.borrow().contains_key(path)
        }
        fn create_dir(&self, path: &Path) -> Result<(), StorageError> {
            self.dirs.borrow_mut().insert(path.to_path_buf());
            Ok(())
        }
        fn write_file(&self, path: &Path, contents: &[u8]) -> Result<(), StorageError> {
            let parent_missing = path
                .parent()
                .is_some_and(|parent| !self.dirs.borrow().contains(parent));
            let failing = self.failing_writes.get();
            if failing > 0 || parent_missing {
                self.failing_writes.set(failing.saturating_sub(1));
                return Err(StorageError::Write {
                    path: path.to_path_buf(),
                    source: std::io::Error::other("no space left on device"),
                });
            }
            self.files
                .borrow_mut()
                .insert(path.to_path_buf(), contents.to_vec());
            self.writes.borrow_mut().push(path.to_path_buf());
            Ok(())
        }
    }

    /// Every entity is selected, alive, on foot, at a fixed position.
    struct Everyone;

    impl EntitySensors for Everyone {
        fn position(&self, entity: EntityId) -> Option<Position> {
            let offset = f64::from(u32::try_from(entity.into_inner()).unwrap_or(0));
            Some(Position::new(offset, 0.0, -offset))
        }
        fn is_alive(&self, _entity: EntityId) -> bool {
            true
        }
        fn is_selected(&self, _entity: EntityId) -> bool {
            true
        }
        fn is_in_vehicle(&self, _entity: EntityId) -> bool {
            false
        }
    }

    fn clock() -> ManualClock {
        ManualClock::new(
            NaiveDate::from_ymd_opt(2026, 10, 14)
                .unwrap()
                .and_hms_opt(8, 30, 15)
                .unwrap(),
        )
    }

    fn config() -> HeatmapConfig {
        let mut config = HeatmapConfig::default();
        config.storage.profile_root = PathBuf::from("/profile");
        config.sampling.base_interval_secs = 10.0;
        config.autosave.interval_secs = 120.0;
        config
    }

    #[test]
    fn start_derives_path_and_creates_directory() {
        let storage = MemoryStorage::default();
        let session = HeatmapSession::start(&config(), &clock(), &storage).unwrap();

        assert_eq!(
            session.session_path(),
            Path::new("/profile/Heatmap/session_2026-10-14_8-30-15_Heatmap.json")
        );
        assert!(storage.dirs.borrow().contains(Path::new("/profile/Heatmap")));
        assert!(storage.writes.borrow().is_empty());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut bad = config();
        bad.autosave.interval_secs = 0.0;
        let err = HeatmapSession::start(&bad, &clock(), MemoryStorage::default()).unwrap_err();
        assert!(matches!(err, SessionError::Config { .. }));
    }

    #[test]
    fn autosaves_every_interval_and_once_at_shutdown() {
        let storage = MemoryStorage::default();
        let mut clock = clock();
        let mut session = HeatmapSession::start(&config(), &clock, &storage).unwrap();

        let mut autosaves = 0;
        for _ in 0..285 {
            clock.advance(1.0);
            if session.on_tick(1.0, &Everyone, &clock).autosave.is_some() {
                autosaves += 1;
            }
        }
        assert_eq!(autosaves, 2);

        let path = session.session_path().to_path_buf();
        let report = session.on_shutdown().unwrap();
        assert_eq!(report.path, path);

        let writes = storage.writes.borrow();
        assert_eq!(writes.len(), 3);
        assert!(writes.iter().all(|p| *p == path));
        assert_eq!(storage.files.borrow().len(), 1);
    }

    #[test]
    fn shutdown_before_first_interval_still_saves() {
        let storage = MemoryStorage::default();
        let mut clock = clock();
        let mut session = HeatmapSession::start(&config(), &clock, &storage).unwrap();
        for _ in 0..45 {
            clock.advance(1.0);
            session.on_tick(1.0, &Everyone, &clock);
        }
        assert!(storage.writes.borrow().is_empty());

        session.on_shutdown().unwrap();
        assert_eq!(storage.writes.borrow().len(), 1);
    }

    #[test]
    fn double_activation_is_an_error() {
        let mut session =
            HeatmapSession::start(&config(), &clock(), MemoryStorage::default()).unwrap();
        session
            .on_entity_activated(EntityId::new(1), EntityClass::Ai)
            .unwrap();

        let err = session
            .on_entity_activated(EntityId::new(1), EntityClass::Ai)
            .unwrap_err();
        assert!(matches!(err, SessionError::AlreadyTracked { .. }));

        // Reactivating after removal would publish a second track.
        assert!(session.on_entity_removed(EntityId::new(1)));
        let err = session
            .on_entity_activated(EntityId::new(1), EntityClass::Ai)
            .unwrap_err();
        assert!(matches!(err, SessionError::Dataset { .. }));
        assert_eq!(session.dataset().tracked_entity_count(), 1);
    }

    #[test]
    fn kill_records_once_and_stops_tracking() {
        let mut clock = clock();
        let mut session =
            HeatmapSession::start(&config(), &clock, MemoryStorage::default()).unwrap();
        session
            .on_entity_activated(EntityId::new(1), EntityClass::Ai)
            .unwrap();
        session
            .on_entity_activated(EntityId::new(2), EntityClass::Infected)
            .unwrap();

        for _ in 0..25 {
            clock.advance(1.0);
            session.on_tick(1.0, &Everyone, &clock);
        }
        assert_eq!(session.dataset().stats().track_samples, 2);

        let ai = session.on_entity_killed(EntityId::new(1), &Everyone, &clock);
        let zombie = session.on_entity_killed(EntityId::new(2), &Everyone, &clock);
        assert!(matches!(ai, Some(KillOutcome::Recorded(_))));
        assert!(matches!(zombie, Some(KillOutcome::Recorded(_))));
        assert_eq!(
            session.on_entity_killed(EntityId::new(1), &Everyone, &clock),
            None
        );

        let stats = session.dataset().stats();
        assert_eq!(stats.track_samples, 3);
        assert_eq!(stats.ai_deaths, 1);
        assert_eq!(stats.zombie_deaths, 1);
        assert_eq!(session.active_trackers(), 0);

        // The published track outlives the tracker.
        for _ in 0..25 {
            clock.advance(1.0);
            session.on_tick(1.0, &Everyone, &clock);
        }
        assert_eq!(session.dataset().stats().track_samples, 3);
    }

    #[test]
    fn removed_entity_keeps_its_track() {
        let mut clock = clock();
        let mut session =
            HeatmapSession::start(&config(), &clock, MemoryStorage::default()).unwrap();
        session
            .on_entity_activated(EntityId::new(5), EntityClass::Ai)
            .unwrap();
        for _ in 0..10 {
            clock.advance(1.0);
            session.on_tick(1.0, &Everyone, &clock);
        }

        assert!(session.on_entity_removed(EntityId::new(5)));
        assert!(!session.on_entity_removed(EntityId::new(5)));
        assert!(session.tracker(EntityId::new(5)).is_none());
        assert_eq!(session.dataset().ai_tracks().first().map(Vec::len), Some(1));
    }

    #[test]
    fn failed_autosave_is_skipped_and_next_interval_succeeds() {
        let storage = MemoryStorage::default();
        let mut clock = clock();
        let mut session = HeatmapSession::start(&config(), &clock, &storage).unwrap();
        session
            .on_entity_activated(EntityId::new(1), EntityClass::Ai)
            .unwrap();
        storage.failing_writes.set(1);

        let mut autosaves = Vec::new();
        for second in 1..=240_u32 {
            clock.advance(1.0);
            let summary = session.on_tick(1.0, &Everyone, &clock);
            if second % 120 == 0 {
                autosaves.push(summary.autosave);
            }
        }

        // The first interval's save failed; ticking and sampling went on.
        assert_eq!(autosaves.len(), 2);
        assert!(autosaves.first().unwrap().is_none());
        let report = autosaves.last().unwrap().as_ref().unwrap();
        assert_eq!(report.stats.track_samples, 24);
        assert_eq!(storage.writes.borrow().len(), 1);
    }

    #[test]
    fn autosave_recreates_directory_removed_mid_session() {
        let storage = MemoryStorage::default();
        let mut clock = clock();
        let mut session = HeatmapSession::start(&config(), &clock, &storage).unwrap();

        let mut saved = 0;
        for second in 1..=240_u32 {
            clock.advance(1.0);
            if session.on_tick(1.0, &Everyone, &clock).autosave.is_some() {
                saved += 1;
            }
            if second == 150 {
                storage.dirs.borrow_mut().clear();
            }
        }

        assert_eq!(saved, 2);
        assert!(storage.dirs.borrow().contains(Path::new("/profile/Heatmap")));
    }
}
