//! End-to-end tests for the watch lifecycle.
//!
//! Uses a real notify watcher over a tempdir vault, with a short debounce
//! window and generous waits to stay robust on slow CI machines.

use activity_log::ActivityLog;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use tree_sync::{StopOutcome, TreeConfig, TreeSyncController, TreeSyncError};

const WINDOW: Duration = Duration::from_millis(300);

/// Time to wait for a debounced regeneration to land on disk.
const SETTLE: Duration = Duration::from_millis(1500);

struct Fixture {
    _dir: TempDir,
    vault: std::path::PathBuf,
    log: ActivityLog,
    controller: TreeSyncController,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let vault = dir.path().join("vault");
    std::fs::create_dir(&vault).unwrap();
    std::fs::create_dir(vault.join("10-Projects")).unwrap();

    // The log lives outside the vault so its writes can't reach the watcher
    let log = ActivityLog::open(dir.path().join("logs")).unwrap();
    let config = TreeConfig::new(&vault).with_window(WINDOW);
    let controller = TreeSyncController::new(config, log.clone());
    Fixture {
        _dir: dir,
        vault,
        log,
        controller,
    }
}

fn regeneration_count(log: &ActivityLog) -> usize {
    log.stats().unwrap().command_counts.get("generate_tree").copied().unwrap_or(0)
}

fn tree_document(vault: &Path) -> String {
    std::fs::read_to_string(vault.join("vault-tree.md")).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn burst_of_creates_coalesces_into_one_regeneration() {
    let fx = fixture();
    fx.controller.start().unwrap();
    // start() performs one immediate regeneration
    assert_eq!(regeneration_count(&fx.log), 1);
    assert!(fx.vault.join("vault-tree.md").exists());

    for i in 0..5 {
        std::fs::write(fx.vault.join(format!("10-Projects/note-{i}.md")), "x").unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    tokio::time::sleep(SETTLE).await;

    // One coalesced regeneration covering all five files
    assert_eq!(regeneration_count(&fx.log), 2);
    let doc = tree_document(&fx.vault);
    for i in 0..5 {
        assert!(doc.contains(&format!("note-{i}.md")), "missing note-{i} in:\n{doc}");
    }

    // The write of the output document itself must not re-arm the timer
    tokio::time::sleep(SETTLE).await;
    assert_eq!(regeneration_count(&fx.log), 2);

    assert_eq!(fx.controller.stop(), StopOutcome::Stopped);
}

#[tokio::test(flavor = "multi_thread")]
async fn events_separated_by_quiet_gap_regenerate_twice() {
    let fx = fixture();
    fx.controller.start().unwrap();

    std::fs::write(fx.vault.join("first.md"), "1").unwrap();
    tokio::time::sleep(SETTLE).await;
    assert_eq!(regeneration_count(&fx.log), 2);

    std::fs::write(fx.vault.join("second.md"), "2").unwrap();
    tokio::time::sleep(SETTLE).await;
    assert_eq!(regeneration_count(&fx.log), 3);

    let doc = tree_document(&fx.vault);
    assert!(doc.contains("first.md") && doc.contains("second.md"));

    fx.controller.stop();
}

#[tokio::test(flavor = "multi_thread")]
async fn ignored_directories_do_not_trigger_regeneration() {
    let fx = fixture();
    std::fs::create_dir(fx.vault.join(".obsidian")).unwrap();
    fx.controller.start().unwrap();

    std::fs::write(fx.vault.join(".obsidian/workspace.json"), "{}").unwrap();
    tokio::time::sleep(SETTLE).await;
    assert_eq!(regeneration_count(&fx.log), 1);

    fx.controller.stop();
}

#[tokio::test(flavor = "multi_thread")]
async fn double_start_is_rejected_and_stop_disarms() {
    let fx = fixture();
    fx.controller.start().unwrap();
    assert!(matches!(fx.controller.start(), Err(TreeSyncError::AlreadyRunning)));
    assert!(fx.controller.status().watching);

    assert_eq!(fx.controller.stop(), StopOutcome::Stopped);
    assert!(!fx.controller.status().watching);
    assert_eq!(fx.controller.stop(), StopOutcome::NotRunning);

    // Changes after stop never regenerate
    let count = regeneration_count(&fx.log);
    std::fs::write(fx.vault.join("late.md"), "too late").unwrap();
    tokio::time::sleep(SETTLE).await;
    assert_eq!(regeneration_count(&fx.log), count);
}

#[tokio::test(flavor = "multi_thread")]
async fn start_on_missing_vault_fails_without_registering_a_watch() {
    let dir = tempfile::tempdir().unwrap();
    let log = ActivityLog::open(dir.path().join("logs")).unwrap();
    let config = TreeConfig::new(dir.path().join("gone")).with_window(WINDOW);
    let controller = TreeSyncController::new(config, log);

    assert!(matches!(controller.start(), Err(TreeSyncError::NotFound(_))));
    assert!(!controller.status().watching);
    // A later stop is still the benign no-op
    assert_eq!(controller.stop(), StopOutcome::NotRunning);
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread")]
async fn symlinked_vault_root_still_observes_changes() {
    let dir = tempfile::tempdir().unwrap();
    let real = dir.path().join("real-vault");
    std::fs::create_dir(&real).unwrap();
    let link = dir.path().join("vault-link");
    std::os::unix::fs::symlink(&real, &link).unwrap();

    let log = ActivityLog::open(dir.path().join("logs")).unwrap();
    let config = TreeConfig::new(&link).with_window(WINDOW);
    let controller = TreeSyncController::new(config, log.clone());
    controller.start().unwrap();
    assert_eq!(regeneration_count(&log), 1);

    // Change arrives under the resolved path; the watch must still see it
    std::fs::write(real.join("note.md"), "x").unwrap();
    tokio::time::sleep(SETTLE).await;
    assert_eq!(regeneration_count(&log), 2);
    assert!(tree_document(&link).contains("note.md"));

    assert_eq!(controller.stop(), StopOutcome::Stopped);
}

#[tokio::test(flavor = "multi_thread")]
async fn manual_regeneration_works_alongside_watch() {
    let fx = fixture();
    fx.controller.start().unwrap();

    std::fs::write(fx.vault.join("manual.md"), "m").unwrap();
    let summary = fx.controller.regenerate_now().unwrap();
    assert_eq!(summary.md_files, 1);
    assert!(tree_document(&fx.vault).contains("manual.md"));

    fx.controller.stop();
}
