//! Rebuild scheduling for watch mode.
//!
//! ```text
//!            start()                    on_build_finished()
//!   Idle ─────────────► Building ───────────────────────────► Idle
//!     ▲                    │                                     │
//!     │       on_change()  ▼                                     │
//!     │          BuildingWithPending ── on_build_finished() ──► Building
//!     └──────────────────────────────── on_change() ─────────────┘
//! ```
//!
//! The scheduler owns no threads. The watch loop feeds it file changes and
//! build completions and starts whatever [`BuildScope`] it hands back, so at
//! most one build is ever in flight.

use std::mem;

use rustc_hash::FxHashSet;

use crate::{
    build::BuildScope,
    compiler::deps::{DependencyRecord, DependencyState},
    utils::path::is_within_dot_directory,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Building,
    BuildingWithPending,
}

/// How a build pass ended.
#[derive(Debug)]
pub enum BuildOutcome {
    /// The pass ran to the end (individual files may still have failed).
    Completed(DependencyRecord),
    /// The pass aborted before producing a record.
    Aborted,
}

#[derive(Debug)]
pub struct Scheduler {
    phase: Phase,
    pending: FxHashSet<String>,
    /// Changed paths the running build was started for.
    in_flight: FxHashSet<String>,
    state: DependencyState,
    /// Restricted rebuilds need a graph from at least one full pass.
    has_full_build: bool,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            pending: FxHashSet::default(),
            in_flight: FxHashSet::default(),
            state: DependencyState::default(),
            has_full_build: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Begin the initial full build.
    pub fn start(&mut self) -> BuildScope {
        self.phase = Phase::Building;
        BuildScope::Full
    }

    /// Record changed input paths. Returns the build to start, if any.
    pub fn on_change<I>(&mut self, paths: I) -> Option<BuildScope>
    where
        I: IntoIterator<Item = String>,
    {
        self.pending.extend(paths);
        if self.pending.is_empty() {
            return None;
        }

        match self.phase {
            Phase::Idle => Some(self.launch()),
            Phase::Building => {
                self.phase = Phase::BuildingWithPending;
                None
            }
            Phase::BuildingWithPending => None,
        }
    }

    /// Fold the finished pass into the graph and start queued work.
    ///
    /// An aborted pass hands its changed paths back to the queue. They run
    /// with the next change rather than immediately, so a build that keeps
    /// aborting does not spin.
    pub fn on_build_finished(&mut self, outcome: BuildOutcome) -> Option<BuildScope> {
        let in_flight = mem::take(&mut self.in_flight);
        match outcome {
            BuildOutcome::Completed(record) => {
                // Failed files keep their previous edges
                if record.full {
                    self.has_full_build = true;
                }
                self.state.apply(record);
            }
            BuildOutcome::Aborted => self.pending.extend(in_flight),
        }

        match self.phase {
            Phase::BuildingWithPending if !self.pending.is_empty() => Some(self.launch()),
            _ => {
                self.phase = Phase::Idle;
                None
            }
        }
    }

    fn launch(&mut self) -> BuildScope {
        self.phase = Phase::Building;
        self.in_flight = mem::take(&mut self.pending);
        if !self.has_full_build {
            return BuildScope::Full;
        }
        BuildScope::Files(expand(&self.state, &self.in_flight))
    }
}

/// Files to re-render after `changed` were modified.
///
/// Seeds are the changed paths plus every always-rebuild file; the result
/// adds their direct dependents. Dot-directory files are never rendered on
/// their own, so their dependents are followed through as well.
pub fn expand(state: &DependencyState, changed: &FxHashSet<String>) -> FxHashSet<String> {
    let mut rebuild: FxHashSet<String> = changed.clone();
    rebuild.extend(state.always_rebuild.iter().cloned());

    let mut queue: Vec<String> = rebuild.iter().cloned().collect();
    let mut visited = FxHashSet::default();

    while let Some(path) = queue.pop() {
        if !visited.insert(path.clone()) {
            continue;
        }
        for dependent in state.graph.dependents_of(&path) {
            rebuild.insert(dependent.to_owned());
            if is_within_dot_directory(dependent) {
                queue.push(dependent.to_owned());
            }
        }
    }

    rebuild
}
