//! File system watcher for live rebuilds.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  Changed   ┌─────────────────────────────┐
//! │ notify       │───────────▶│          Event Loop         │
//! │ callback     │            │                             │
//! └──────────────┘            │  Debouncer ──► Scheduler    │
//!                             │                   │         │
//! ┌──────────────┐  Finished  │                   ▼ scope   │
//! │ build worker │◀───────────┼───────────── spawn_build()  │
//! │ thread       │───────────▶│                             │
//! └──────────────┘            └─────────────────────────────┘
//! ```
//!
//! Both event sources share one channel, so the loop never blocks the
//! watcher and a finished (or crashed) build always reaches the scheduler.

use std::{
    panic::{self, AssertUnwindSafe},
    path::{Path, PathBuf},
    sync::mpsc::{self, Receiver, RecvTimeoutError, Sender},
    thread,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use rustc_hash::FxHashSet;

use crate::{
    build::{BuildOptions, BuildScope, build_site},
    debug, log,
    scheduler::{BuildOutcome, Scheduler},
    utils::path::{is_temp_file, to_rel_key},
};

// =============================================================================
// Constants
// =============================================================================

const DEBOUNCE_MS: u64 = 100;

/// Include chains recurse through minijinja; give the worker room.
const BUILD_STACK_SIZE: usize = 64 * 1024 * 1024;

enum Event {
    Changed(Vec<PathBuf>),
    Finished(BuildOutcome),
}

// =============================================================================
// Debounce State
// =============================================================================

/// Batches bursts of file events (editors often write several times per save).
struct Debouncer {
    pending: FxHashSet<String>,
    last_event: Option<Instant>,
}

impl Debouncer {
    fn new() -> Self {
        Self {
            pending: FxHashSet::default(),
            last_event: None,
        }
    }

    fn add(&mut self, paths: impl IntoIterator<Item = String>) {
        self.pending.extend(paths);
        self.last_event = Some(Instant::now());
    }

    fn ready(&self) -> bool {
        !self.pending.is_empty()
            && self
                .last_event
                .is_some_and(|t| t.elapsed() >= Duration::from_millis(DEBOUNCE_MS))
    }

    fn take(&mut self) -> FxHashSet<String> {
        self.last_event = None;
        std::mem::take(&mut self.pending)
    }

    fn timeout(&self) -> Duration {
        if self.pending.is_empty() {
            Duration::from_secs(60)
        } else {
            Duration::from_millis(DEBOUNCE_MS)
        }
    }
}

// =============================================================================
// Path Filtering
// =============================================================================

const fn is_relevant(event: &notify::Event) -> bool {
    matches!(
        event.kind,
        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
    )
}

/// Relative input key for a changed path, or `None` when it should not
/// trigger a rebuild.
fn changed_key(path: &Path, input: &Path, output: &Path) -> Option<String> {
    if is_temp_file(path) || path.starts_with(output) {
        return None;
    }
    let rel = path.strip_prefix(input).ok()?;
    let key = to_rel_key(rel);
    (!key.is_empty()).then_some(key)
}

// =============================================================================
// Public API
// =============================================================================

/// Watch `options.input` and keep `options.output` up to date.
///
/// Runs the initial full build right away. The returned watcher must be kept
/// alive for as long as rebuilds should happen.
pub fn start(options: BuildOptions) -> Result<RecommendedWatcher> {
    let (tx, rx) = mpsc::channel();

    let watcher_tx = tx.clone();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        match res {
            Ok(event) if is_relevant(&event) => {
                watcher_tx.send(Event::Changed(event.paths)).ok();
            }
            Ok(_) => {}
            Err(e) => log!("watch"; "error: {e}"),
        }
    })
    .context("Failed to create file watcher")?;

    watcher
        .watch(&options.input, RecursiveMode::Recursive)
        .with_context(|| format!("Failed to watch {}", options.input.display()))?;
    log!("watch"; "{}", options.input.display());

    thread::Builder::new()
        .name("quill-watch".into())
        .spawn(move || event_loop(&options, &tx, &rx))
        .context("Failed to spawn watch thread")?;

    Ok(watcher)
}

fn event_loop(options: &BuildOptions, tx: &Sender<Event>, rx: &Receiver<Event>) {
    let mut scheduler = Scheduler::new();
    let mut debouncer = Debouncer::new();

    spawn_build(options, scheduler.start(), tx);

    loop {
        let next = match rx.recv_timeout(debouncer.timeout()) {
            Ok(Event::Changed(paths)) => {
                let keys = paths
                    .iter()
                    .filter_map(|p| changed_key(p, &options.input, &options.output));
                debouncer.add(keys);
                None
            }
            Ok(Event::Finished(outcome)) => scheduler.on_build_finished(outcome),
            Err(RecvTimeoutError::Timeout) if debouncer.ready() => {
                let changed = debouncer.take();
                for path in &changed {
                    log!("watch"; "{path} changed");
                }
                scheduler.on_change(changed)
            }
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        if let Some(scope) = next {
            spawn_build(options, scope, tx);
        }
    }
}

/// Run one build on a worker thread and report back over `tx`.
fn spawn_build(options: &BuildOptions, scope: BuildScope, tx: &Sender<Event>) {
    match &scope {
        BuildScope::Full => log!("build"; "full build"),
        BuildScope::Files(files) => {
            log!("build"; "rebuilding {} files", files.len());
            for file in files {
                debug!("build"; "{file}");
            }
        }
    }

    let options = options.clone();
    let worker_tx = tx.clone();
    let spawned = thread::Builder::new()
        .name("quill-build".into())
        .stack_size(BUILD_STACK_SIZE)
        .spawn(move || {
            let outcome = run_build(&options, &scope);
            worker_tx.send(Event::Finished(outcome)).ok();
        });

    if let Err(e) = spawned {
        log!("error"; "failed to start build: {e}");
        tx.send(Event::Finished(BuildOutcome::Aborted)).ok();
    }
}

fn run_build(options: &BuildOptions, scope: &BuildScope) -> BuildOutcome {
    match panic::catch_unwind(AssertUnwindSafe(|| build_site(options, scope))) {
        Ok(Ok(report)) => {
            report.log_summary();
            BuildOutcome::Completed(report.record)
        }
        Ok(Err(e)) => {
            log!("error"; "build failed: {e:#}");
            BuildOutcome::Aborted
        }
        Err(_) => {
            log!("error"; "build panicked");
            BuildOutcome::Aborted
        }
    }
}
