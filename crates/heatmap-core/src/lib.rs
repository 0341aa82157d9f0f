//! Aggregation buffer, sampling policy, autosave, and session files for the
//! heatmap recorder.
//!
//! The host simulation drives a [`HeatmapSession`] through its lifecycle
//! hooks. Tracked entities append position samples into one shared
//! [`HeatmapDataset`]; an [`AutosaveScheduler`] periodically hands the
//! dataset to a [`SessionWriter`], which overwrites a single JSON file per
//! session.
//!
//! # Modules
//!
//! - [`autosave`] -- Interval and shutdown save trigger.
//! - [`config`] -- Configuration loading from `heatmap-config.yaml` into
//!   strongly-typed structs.
//! - [`dataset`] -- The append-only aggregation buffer.
//! - [`host`] -- Traits for host sensors, clock, and storage, plus
//!   filesystem and clock implementations.
//! - [`reader`] -- Reader for persisted session files.
//! - [`session`] -- Lifecycle hooks bundled into one session context.
//! - [`tracking`] -- Per-entity trackers and the sampling policy.
//! - [`writer`] -- Session file naming and snapshot writing.
//!
//! [`HeatmapSession`]: session::HeatmapSession
//! [`HeatmapDataset`]: dataset::HeatmapDataset
//! [`AutosaveScheduler`]: autosave::AutosaveScheduler
//! [`SessionWriter`]: writer::SessionWriter

pub mod autosave;
pub mod config;
pub mod dataset;
pub mod host;
pub mod reader;
pub mod session;
pub mod tracking;
pub mod writer;
