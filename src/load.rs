//! Request generations and per-panel load state.
//!
//! Every load is tagged with a [`Generation`] when it starts. A finished load
//! only replaces the panel's result if its generation is still the latest one
//! issued for that panel, so a slow earlier load can never overwrite a newer
//! selection.

use serde::Serialize;
use tracing::{debug, error};

/// Monotonic tag for one load request. Generation 0 is never issued.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Generation(u64);

impl Generation {
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Issues generations for one panel.
#[derive(Debug, Default)]
pub struct LoadTracker {
    latest: Generation,
}

impl LoadTracker {
    pub fn issue(&mut self) -> Generation {
        self.latest = Generation(self.latest.0 + 1);
        self.latest
    }

    pub fn latest(&self) -> Generation {
        self.latest
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        generation == self.latest
    }
}

/// What a panel currently shows. There is no error state: a failed load
/// is logged and the panel keeps showing `Loading`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "data", rename_all = "snake_case")]
pub enum LoadState<T> {
    Loading,
    Ready(T),
}

impl<T> LoadState<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            LoadState::Ready(value) => Some(value),
            LoadState::Loading => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }
}

/// Owns one visualization's result. Results are replaced wholesale on commit.
#[derive(Debug)]
pub struct Panel<T> {
    name: &'static str,
    tracker: LoadTracker,
    state: LoadState<T>,
    committed: Option<Generation>,
}

impl<T> Panel<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            tracker: LoadTracker::default(),
            state: LoadState::Loading,
            committed: None,
        }
    }

    /// Starts a new load: issues a generation and puts the panel back into
    /// `Loading`. Any load already in flight becomes stale.
    pub fn begin(&mut self) -> Generation {
        self.state = LoadState::Loading;
        let generation = self.tracker.issue();
        debug!(panel = self.name, generation = generation.get(), "Load started");
        generation
    }

    /// Stores `value` if `generation` is still current. Returns whether it was kept.
    pub fn commit(&mut self, generation: Generation, value: T) -> bool {
        if !self.tracker.is_current(generation) {
            debug!(
                panel = self.name,
                generation = generation.get(),
                latest = self.tracker.latest().get(),
                "Discarding stale load"
            );
            return false;
        }

        self.state = LoadState::Ready(value);
        self.committed = Some(generation);
        debug!(panel = self.name, generation = generation.get(), "Load committed");
        true
    }

    /// Records a failed load. The panel stays in `Loading`.
    pub fn fail(&mut self, generation: Generation, err: &anyhow::Error) {
        error!(
            panel = self.name,
            generation = generation.get(),
            current = self.tracker.is_current(generation),
            error = %err,
            "Load failed"
        );
    }

    pub fn state(&self) -> &LoadState<T> {
        &self.state
    }

    pub fn committed(&self) -> Option<Generation> {
        self.committed
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Hands the result to the caller, leaving the panel in `Loading`.
    pub fn take(&mut self) -> LoadState<T> {
        std::mem::replace(&mut self.state, LoadState::Loading)
    }
}
