//! Live vault-tree synchronization.
//!
//! Keeps a human-readable tree document of the vault's folder/file
//! hierarchy up to date while files change underneath it. Sync clients
//! and editors emit bursts of filesystem events for a single logical
//! change, so raw notifications flow through an event filter and a
//! debounce coalescer before triggering a full re-render:
//!
//! ```text
//! notify observer -> EventFilter -> mpsc queue -> debounce task
//!     -> render tree -> atomic write -> activity record
//! ```
//!
//! The tree is always rebuilt from scratch and the output document is
//! replaced with an atomic rename, so readers (including the watcher
//! itself) never observe a half-written file.

mod coalescer;
mod controller;
mod node;
mod renderer;

pub use coalescer::{classify, ChangeEvent, ChangeKind, EventFilter, DEFAULT_DEBOUNCE_WINDOW};
pub use controller::{RunSummary, StopOutcome, TreeConfig, TreeSyncController, WatchStatus};
pub use node::{NodeKind, ScanOutcome, VaultNode};
pub use renderer::{render_tree, RenderedTree, TreeSummary};

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Temporary sibling used for atomic replacement of `path`.
///
/// Lives in the same directory so the final `rename` stays on one
/// filesystem; the event filter excludes it alongside the output itself.
pub(crate) fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

#[derive(Debug, Error)]
pub enum TreeSyncError {
    #[error("vault root not found or not a directory: {0}")]
    NotFound(PathBuf),

    #[error("a watch is already running")]
    AlreadyRunning,

    #[error("failed to replace tree document: {0}")]
    WriteFailure(#[source] std::io::Error),

    #[error("filesystem watch error: {0}")]
    Watch(#[from] notify::Error),
}

pub type Result<T> = std::result::Result<T, TreeSyncError>;
