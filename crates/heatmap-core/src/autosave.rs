//! Interval-driven autosave trigger.
//!
//! [`AutosaveScheduler`] is a small state machine fed with host tick
//! lengths. It owns its accumulator and never reads a clock, so tests
//! drive it with synthetic tick sizes.
//!
//! ```text
//!   Idle --(accumulator >= interval)--> Firing --(save returns)--> Idle
//!     \                                                          /
//!      `------------------(shutdown)--> Firing --> Terminated <-'
//! ```
//!
//! Firing runs the caller's save closure synchronously, so at most one
//! save is ever in flight.

use crate::config::AutosaveConfig;

/// Current scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Accumulating tick time.
    Idle,
    /// A save closure is running.
    Firing,
    /// The shutdown save has run; ticks are ignored.
    Terminated,
}

/// Why a save was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutosaveTrigger {
    /// The autosave interval elapsed.
    Interval,
    /// The host is shutting down.
    Shutdown,
}

/// Periodic plus one-shot save trigger.
#[derive(Debug, Clone, PartialEq)]
pub struct AutosaveScheduler {
    interval_secs: f64,
    accumulator_secs: f64,
    state: SchedulerState,
    saves_fired: u64,
}

impl AutosaveScheduler {
    /// Create an idle scheduler that fires every `interval_secs`.
    pub const fn new(interval_secs: f64) -> Self {
        Self {
            interval_secs,
            accumulator_secs: 0.0,
            state: SchedulerState::Idle,
            saves_fired: 0,
        }
    }

    /// Create a scheduler from the `autosave` config section.
    pub const fn from_config(config: &AutosaveConfig) -> Self {
        Self::new(config.interval_secs)
    }

    /// Account for one host tick of `dt_secs` seconds.
    ///
    /// When the accumulated time reaches the interval, `save` runs with
    /// [`AutosaveTrigger::Interval`], the accumulator resets to zero and
    /// the closure's result is returned. Otherwise returns `None`. After
    /// shutdown every call returns `None` without running `save`.
    pub fn tick<R>(&mut self, dt_secs: f64, save: impl FnOnce(AutosaveTrigger) -> R) -> Option<R> {
        if self.state != SchedulerState::Idle {
            return None;
        }
        if dt_secs.is_finite() && dt_secs > 0.0 {
            self.accumulator_secs += dt_secs;
        }
        if self.accumulator_secs < self.interval_secs {
            return None;
        }

        self.accumulator_secs = 0.0;
        Some(self.fire(AutosaveTrigger::Interval, save, SchedulerState::Idle))
    }

    /// Run the final save regardless of the accumulator and terminate.
    ///
    /// Returns `None` without running `save` if shutdown already happened.
    pub fn shutdown<R>(&mut self, save: impl FnOnce(AutosaveTrigger) -> R) -> Option<R> {
        if self.state == SchedulerState::Terminated {
            return None;
        }
        Some(self.fire(AutosaveTrigger::Shutdown, save, SchedulerState::Terminated))
    }

    fn fire<R>(
        &mut self,
        trigger: AutosaveTrigger,
        save: impl FnOnce(AutosaveTrigger) -> R,
        next: SchedulerState,
    ) -> R {
        self.state = SchedulerState::Firing;
        let result = save(trigger);
        self.saves_fired = self.saves_fired.saturating_add(1);
        self.state = next;
        result
    }

    /// Current state.
    pub const fn state(&self) -> SchedulerState {
        self.state
    }

    /// Seconds accumulated since the last interval save.
    pub const fn accumulator_secs(&self) -> f64 {
        self.accumulator_secs
    }

    /// Configured interval in seconds.
    pub const fn interval_secs(&self) -> f64 {
        self.interval_secs
    }

    /// Number of saves triggered so far, shutdown included.
    pub const fn saves_fired(&self) -> u64 {
        self.saves_fired
    }
}
