//! Watch lifecycle and regeneration orchestration.
//!
//! [`TreeSyncController`] owns the `Idle <-> Watching` state transition,
//! wires the notify observer to the debounce loop, writes the output
//! document atomically, and records every regeneration in the activity
//! log. It is an explicit object constructed once and handed to whoever
//! needs it - there is no process-global watch flag.

use crate::coalescer::{classify, run_debounce, ChangeEvent, EventFilter, DEFAULT_DEBOUNCE_WINDOW};
use crate::renderer::{render_tree, TreeSummary};
use crate::{tmp_sibling, Result, TreeSyncError};
use activity_log::{ActivityLog, ActivityRecord, OperationSummary, TreeResult, WatchResult};
use chrono::{DateTime, Local};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Configuration for one vault's tree synchronization.
#[derive(Debug, Clone)]
pub struct TreeConfig {
    pub vault_root: PathBuf,
    /// Where the rendered tree document lives (inside the vault)
    pub output_path: PathBuf,
    /// Quiet window for the debounce coalescer
    pub window: Duration,
}

impl TreeConfig {
    pub fn new(vault_root: impl Into<PathBuf>) -> Self {
        let vault_root = vault_root.into();
        let output_path = vault_root.join("vault-tree.md");
        Self {
            vault_root,
            output_path,
            window: DEFAULT_DEBOUNCE_WINDOW,
        }
    }

    pub fn with_output(mut self, output_path: impl Into<PathBuf>) -> Self {
        self.output_path = output_path.into();
        self
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }
}

/// Timestamp and counts of the last successful regeneration.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub at: DateTime<Local>,
    pub summary: TreeSummary,
}

/// Snapshot reported by [`TreeSyncController::status`].
#[derive(Debug, Clone)]
pub struct WatchStatus {
    pub watching: bool,
    pub window: Duration,
    pub output_path: PathBuf,
    pub last_run: Option<RunSummary>,
}

/// Outcome of [`TreeSyncController::stop`]. Stopping an idle controller
/// is a benign no-op, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    NotRunning,
}

enum WatchState {
    Idle,
    Watching {
        /// Keeps the observer registered; dropping it stops delivery and
        /// closes the event queue
        _watcher: RecommendedWatcher,
        /// Debounce consumer; exits on its own once the queue closes
        _task: tokio::task::JoinHandle<()>,
    },
}

/// Controller for one vault's live tree document.
pub struct TreeSyncController {
    config: TreeConfig,
    log: ActivityLog,
    state: Mutex<WatchState>,
    last_run: Arc<Mutex<Option<RunSummary>>>,
}

impl TreeSyncController {
    pub fn new(config: TreeConfig, log: ActivityLog) -> Self {
        Self {
            config,
            log,
            state: Mutex::new(WatchState::Idle),
            last_run: Arc::new(Mutex::new(None)),
        }
    }

    /// Start watching the vault recursively.
    ///
    /// Performs one synchronous regeneration before arming the watch, so
    /// the output document is fresh even after a prior unclean shutdown.
    /// Fails with [`TreeSyncError::AlreadyRunning`] if a watch is active;
    /// any failure leaves no observer registered.
    ///
    /// Must be called from within a tokio runtime (the debounce consumer
    /// is spawned onto it).
    pub fn start(&self) -> Result<()> {
        let mut state = self.state.lock().expect("watch state mutex poisoned");
        if matches!(*state, WatchState::Watching { .. }) {
            return Err(TreeSyncError::AlreadyRunning);
        }

        // Some backends report canonical absolute event paths, so the
        // filter must be keyed on canonical paths or a relative/symlinked
        // root would silently match nothing
        let vault_root = self
            .config
            .vault_root
            .canonicalize()
            .map_err(|_| TreeSyncError::NotFound(self.config.vault_root.clone()))?;

        regenerate(&self.config, &self.log, &self.last_run)?;

        let output_path = self
            .config
            .output_path
            .canonicalize()
            .unwrap_or_else(|_| self.config.output_path.clone());

        let (tx, rx) = mpsc::unbounded_channel();
        let filter = EventFilter::new(&vault_root, &output_path);
        let mut watcher =
            notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
                match result {
                    Ok(event) => {
                        let Some(kind) = classify(&event.kind) else {
                            return;
                        };
                        for path in event.paths {
                            if filter.qualifies(&path)
                                && tx.send(ChangeEvent::now(path, kind)).is_err()
                            {
                                // Consumer gone; watch is shutting down
                                return;
                            }
                        }
                    }
                    Err(err) => tracing::error!("vault watch error: {}", err),
                }
            })?;
        watcher.watch(&vault_root, RecursiveMode::Recursive)?;

        let config = self.config.clone();
        let log = self.log.clone();
        let last_run = Arc::clone(&self.last_run);
        let window = self.config.window;
        let task = tokio::spawn(async move {
            run_debounce(rx, window, move || {
                if let Err(err) = regenerate(&config, &log, &last_run) {
                    tracing::warn!("watch-triggered regeneration failed: {}", err);
                }
            })
            .await;
            tracing::debug!("debounce consumer exited");
        });

        *state = WatchState::Watching {
            _watcher: watcher,
            _task: task,
        };
        drop(state);

        tracing::info!(
            "watching {} (window {:?})",
            self.config.vault_root.display(),
            self.config.window
        );
        self.record_watch_transition("start_watching", true);
        Ok(())
    }

    /// Stop watching.
    ///
    /// Dropping the observer closes the event queue: the debounce
    /// consumer drains whatever is buffered without firing, cancels any
    /// pending deadline, and exits. A regeneration already in flight is
    /// allowed to finish; no new one can start.
    pub fn stop(&self) -> StopOutcome {
        let mut state = self.state.lock().expect("watch state mutex poisoned");
        match std::mem::replace(&mut *state, WatchState::Idle) {
            WatchState::Idle => StopOutcome::NotRunning,
            WatchState::Watching { _watcher: watcher, _task: task } => {
                drop(state);
                // Deregister the observer first; this closes the event
                // queue and lets the consumer task wind down
                drop(watcher);
                drop(task);
                tracing::info!("stopped watching {}", self.config.vault_root.display());
                self.record_watch_transition("stop_watching", false);
                StopOutcome::Stopped
            }
        }
    }

    /// Manual out-of-band regeneration; works with or without an active
    /// watch. May race with a watch-triggered regeneration - the atomic
    /// rename makes the result one complete render either way
    /// (last-writer-wins).
    pub fn regenerate_now(&self) -> Result<TreeSummary> {
        regenerate(&self.config, &self.log, &self.last_run)
    }

    pub fn status(&self) -> WatchStatus {
        let watching = matches!(
            *self.state.lock().expect("watch state mutex poisoned"),
            WatchState::Watching { .. }
        );
        WatchStatus {
            watching,
            window: self.config.window,
            output_path: self.config.output_path.clone(),
            last_run: self.last_run.lock().expect("last run mutex poisoned").clone(),
        }
    }

    fn record_watch_transition(&self, command: &str, active: bool) {
        let record = ActivityRecord::success(
            command,
            Duration::ZERO,
            OperationSummary::Watch(WatchResult {
                output_path: self.config.output_path.display().to_string(),
                active,
            }),
        );
        if let Err(err) = self.log.record(record) {
            tracing::warn!("failed to record {}: {}", command, err);
        }
    }
}

/// Render, atomically replace the output document, and append exactly
/// one activity record for the attempt.
///
/// A write failure leaves the previous document untouched (the rename
/// never happened) and is reflected in a failure-tagged record. A log
/// write failure is only a warning - it never rolls back the
/// regeneration it describes.
fn regenerate(
    config: &TreeConfig,
    log: &ActivityLog,
    last_run: &Mutex<Option<RunSummary>>,
) -> Result<TreeSummary> {
    let started = std::time::Instant::now();
    let outcome = render_and_write(config);
    let duration = started.elapsed();

    let output = config.output_path.display().to_string();
    let record = match &outcome {
        Ok(summary) => ActivityRecord::success(
            "generate_tree",
            duration,
            OperationSummary::Tree(TreeResult {
                total_folders: summary.total_folders,
                total_files: summary.total_files,
                md_files: summary.md_files,
                tree_lines: summary.tree_lines,
                output_path: output,
            }),
        ),
        Err(err) => ActivityRecord::failure(
            "generate_tree",
            duration,
            OperationSummary::Tree(TreeResult {
                output_path: output,
                ..TreeResult::default()
            }),
            err.to_string(),
        ),
    };
    if let Err(err) = log.record(record) {
        tracing::warn!("failed to append activity record: {}", err);
    }

    if let Ok(summary) = &outcome {
        *last_run.lock().expect("last run mutex poisoned") = Some(RunSummary {
            at: Local::now(),
            summary: summary.clone(),
        });
        tracing::debug!(
            "tree regenerated: {} folders, {} files",
            summary.total_folders,
            summary.total_files
        );
    }
    outcome
}

fn render_and_write(config: &TreeConfig) -> Result<TreeSummary> {
    let rendered = render_tree(&config.vault_root)?;
    write_atomic(&config.output_path, &rendered.document).map_err(TreeSyncError::WriteFailure)?;
    Ok(rendered.summary)
}

/// Write to a same-directory temp file, then rename over the target.
fn write_atomic(path: &Path, content: &str) -> std::io::Result<()> {
    let tmp = tmp_sibling(path);
    std::fs::write(&tmp, content)?;
    std::fs::rename(&tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(dir: &Path) -> TreeSyncController {
        let log = ActivityLog::open(dir.join("logs")).unwrap();
        let config = TreeConfig::new(dir.join("vault"));
        TreeSyncController::new(config, log)
    }

    #[test]
    fn stop_without_watch_is_benign() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("vault")).unwrap();
        let controller = controller(dir.path());
        assert_eq!(controller.stop(), StopOutcome::NotRunning);
        // No activity record was written for the no-op
        let log = ActivityLog::open(dir.path().join("logs")).unwrap();
        assert_eq!(log.stats().unwrap().total_runs, 0);
    }

    #[test]
    fn status_reflects_idle_and_last_run() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("vault")).unwrap();
        std::fs::write(dir.path().join("vault/a.md"), "").unwrap();
        let controller = controller(dir.path());

        let before = controller.status();
        assert!(!before.watching);
        assert!(before.last_run.is_none());

        controller.regenerate_now().unwrap();
        let after = controller.status();
        assert_eq!(after.last_run.unwrap().summary.md_files, 1);
    }

    #[test]
    fn regenerate_on_missing_vault_records_failure() {
        let dir = tempfile::tempdir().unwrap();
        // Note: vault directory deliberately not created
        let controller = controller(dir.path());
        let err = controller.regenerate_now().unwrap_err();
        assert!(matches!(err, TreeSyncError::NotFound(_)));

        let log = ActivityLog::open(dir.path().join("logs")).unwrap();
        let recent = log.recent(1).unwrap();
        assert!(!recent[0].success);
        assert_eq!(recent[0].command, "generate_tree");
    }

    #[test]
    fn write_failure_leaves_previous_document_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let vault = dir.path().join("vault");
        std::fs::create_dir(&vault).unwrap();
        let controller = controller(dir.path());

        controller.regenerate_now().unwrap();
        let output = vault.join("vault-tree.md");
        let previous = std::fs::read_to_string(&output).unwrap();

        // Occupy the temp sibling with a directory so the next write fails
        std::fs::create_dir(tmp_sibling(&output)).unwrap();
        let err = controller.regenerate_now().unwrap_err();
        assert!(matches!(err, TreeSyncError::WriteFailure(_)));
        assert_eq!(std::fs::read_to_string(&output).unwrap(), previous);

        let log = ActivityLog::open(dir.path().join("logs")).unwrap();
        assert!(!log.recent(1).unwrap()[0].success);
    }
}
