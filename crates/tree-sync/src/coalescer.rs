//! Event filtering and debounce coalescing.
//!
//! The notify observer delivers raw events on its own thread. Qualifying
//! events are pushed onto an unbounded queue; a single consumer task owns
//! the debounce state and pulls from it, so no debounce state is ever
//! shared between execution contexts.
//!
//! Debounce contract: N qualifying events within the quiet window of one
//! another produce exactly one fire, scheduled at (last event + window).
//! Closing the queue cancels a pending fire.

use notify::event::ModifyKind;
use notify::EventKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use vault_notes::is_ignored_component;

/// Default quiet window before a regeneration fires.
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_secs(2);

/// What happened to a path. Ephemeral - consumed by the debounce loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Deleted,
    Moved,
    Modified,
}

/// One qualifying filesystem notification.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
    /// When the event was observed; the debounce deadline re-arms to
    /// `at + window`
    pub at: Instant,
}

impl ChangeEvent {
    pub fn now(path: PathBuf, kind: ChangeKind) -> Self {
        Self {
            path,
            kind,
            at: Instant::now(),
        }
    }
}

/// Map a raw notify event kind onto a [`ChangeKind`].
///
/// Access events (opens, reads) are dropped: they say nothing about the
/// tree and would otherwise re-arm the timer on every read.
pub fn classify(kind: &EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(_) => Some(ChangeKind::Created),
        EventKind::Remove(_) => Some(ChangeKind::Deleted),
        EventKind::Modify(ModifyKind::Name(_)) => Some(ChangeKind::Moved),
        EventKind::Modify(_) => Some(ChangeKind::Modified),
        EventKind::Access(_) => None,
        EventKind::Any | EventKind::Other => Some(ChangeKind::Modified),
    }
}

/// Decides which observed paths may reach the debounce logic.
///
/// Drops everything outside the vault root, anything under an ignored or
/// hidden component, and - crucially - the output document and its
/// temporary sibling, so the controller's own writes can never re-arm
/// the timer (self-trigger loop).
#[derive(Debug, Clone)]
pub struct EventFilter {
    root: PathBuf,
    output: PathBuf,
    output_tmp: PathBuf,
}

impl EventFilter {
    pub fn new(root: &Path, output: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            output: output.to_path_buf(),
            output_tmp: crate::tmp_sibling(output),
        }
    }

    pub fn qualifies(&self, path: &Path) -> bool {
        if path == self.output || path == self.output_tmp {
            return false;
        }
        let Ok(rel) = path.strip_prefix(&self.root) else {
            return false;
        };
        !rel.components()
            .any(|c| is_ignored_component(&c.as_os_str().to_string_lossy()))
    }
}

/// The debounce loop. Runs until the event queue closes.
///
/// State is a single optional deadline: armed by the first qualifying
/// event after an idle period, re-armed by each further event, cleared
/// when it elapses (firing once) or when the queue closes (firing
/// nothing).
pub(crate) async fn run_debounce<F>(
    mut events: mpsc::UnboundedReceiver<ChangeEvent>,
    window: Duration,
    mut fire: F,
) where
    F: FnMut(),
{
    let mut deadline: Option<Instant> = None;
    loop {
        match deadline {
            None => match events.recv().await {
                Some(event) => {
                    tracing::trace!("arming debounce for {:?} {}", event.kind, event.path.display());
                    deadline = Some(event.at + window);
                }
                // Queue closed while idle
                None => return,
            },
            Some(at) => {
                tokio::select! {
                    // The queue is checked first: a close that lands in the
                    // same poll as an elapsed deadline must cancel, not fire
                    biased;
                    maybe = events.recv() => match maybe {
                        Some(event) => deadline = Some(event.at + window),
                        // Stop: the pending fire is canceled, never delivered
                        None => return,
                    },
                    _ = time::sleep_until(at) => {
                        deadline = None;
                        fire();
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const WINDOW: Duration = Duration::from_secs(2);

    fn filter_for(root: &Path) -> EventFilter {
        EventFilter::new(root, &root.join("vault-tree.md"))
    }

    #[test]
    fn filter_excludes_output_and_its_tmp() {
        let root = Path::new("/vault");
        let filter = filter_for(root);
        assert!(!filter.qualifies(Path::new("/vault/vault-tree.md")));
        assert!(!filter.qualifies(Path::new("/vault/vault-tree.md.tmp")));
        assert!(filter.qualifies(Path::new("/vault/10-Projects/a.md")));
    }

    #[test]
    fn filter_excludes_ignored_and_foreign_paths() {
        let filter = filter_for(Path::new("/vault"));
        assert!(!filter.qualifies(Path::new("/vault/.obsidian/workspace.json")));
        assert!(!filter.qualifies(Path::new("/vault/.git/HEAD")));
        assert!(!filter.qualifies(Path::new("/elsewhere/a.md")));
        // Non-note files still qualify: they affect the count table
        assert!(filter.qualifies(Path::new("/vault/img.png")));
    }

    #[test]
    fn classify_maps_kinds() {
        assert_eq!(
            classify(&EventKind::Create(CreateKind::File)),
            Some(ChangeKind::Created)
        );
        assert_eq!(classify(&EventKind::Access(AccessKind::Any)), None);
        assert_eq!(classify(&EventKind::Any), Some(ChangeKind::Modified));
    }

    fn spawn_debounce(
        window: Duration,
    ) -> (
        mpsc::UnboundedSender<ChangeEvent>,
        Arc<AtomicUsize>,
        tokio::task::JoinHandle<()>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let fires = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fires);
        let task = tokio::spawn(run_debounce(rx, window, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        (tx, fires, task)
    }

    fn event(name: &str) -> ChangeEvent {
        ChangeEvent::now(PathBuf::from(name), ChangeKind::Created)
    }

    #[tokio::test(start_paused = true)]
    async fn burst_coalesces_into_one_fire_at_last_plus_window() {
        let (tx, fires, task) = spawn_debounce(WINDOW);
        tokio::task::yield_now().await;

        for i in 0..5 {
            tx.send(event(&format!("note-{i}.md"))).unwrap();
            time::advance(Duration::from_millis(10)).await;
        }
        // Last event at t=40ms, so the fire is due at t=2040ms. We're at
        // t=50ms now; nothing may fire up to t=2039ms.
        time::advance(Duration::from_millis(1989)).await;
        assert_eq!(fires.load(Ordering::SeqCst), 0);

        time::advance(Duration::from_millis(1)).await;
        tokio::task::yield_now().await;
        assert_eq!(fires.load(Ordering::SeqCst), 1);

        drop(tx);
        task.await.unwrap();
        assert_eq!(fires.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn quiet_gap_produces_two_fires() {
        let (tx, fires, task) = spawn_debounce(WINDOW);
        tokio::task::yield_now().await;

        tx.send(event("first.md")).unwrap();
        time::advance(WINDOW).await;
        tokio::task::yield_now().await;
        assert_eq!(fires.load(Ordering::SeqCst), 1);

        // Idle for a while, then a second burst
        time::advance(Duration::from_secs(3)).await;
        tx.send(event("second.md")).unwrap();
        time::advance(WINDOW).await;
        tokio::task::yield_now().await;
        assert_eq!(fires.load(Ordering::SeqCst), 2);

        drop(tx);
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn closing_queue_cancels_pending_fire() {
        let (tx, fires, task) = spawn_debounce(WINDOW);
        tokio::task::yield_now().await;

        tx.send(event("pending.md")).unwrap();
        tokio::task::yield_now().await;
        drop(tx);
        task.await.unwrap();

        // The armed deadline never fires after stop
        time::advance(WINDOW * 2).await;
        assert_eq!(fires.load(Ordering::SeqCst), 0);
    }

    fn poll_once<F: std::future::Future>(fut: std::pin::Pin<&mut F>) -> std::task::Poll<F::Output> {
        let mut cx = std::task::Context::from_waker(std::task::Waker::noop());
        fut.poll(&mut cx)
    }

    #[tokio::test(start_paused = true)]
    async fn close_racing_an_elapsed_deadline_does_not_fire() {
        let (tx, rx) = mpsc::unbounded_channel();
        let fires = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fires);
        let fut = run_debounce(rx, WINDOW, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        tokio::pin!(fut);

        // Arm the deadline
        tx.send(event("racy.md")).unwrap();
        assert!(poll_once(fut.as_mut()).is_pending());

        // The deadline elapses and the queue closes before the consumer
        // polls again: both branches are ready at once, and the close
        // must win
        time::advance(WINDOW * 2).await;
        drop(tx);
        assert!(poll_once(fut.as_mut()).is_ready());
        assert_eq!(fires.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn each_event_rearms_the_timer() {
        let (tx, fires, task) = spawn_debounce(WINDOW);
        tokio::task::yield_now().await;

        // Keep poking just inside the window; nothing may ever fire
        for _ in 0..10 {
            tx.send(event("busy.md")).unwrap();
            time::advance(WINDOW - Duration::from_millis(1)).await;
        }
        assert_eq!(fires.load(Ordering::SeqCst), 0);

        time::advance(Duration::from_millis(1)).await;
        tokio::task::yield_now().await;
        assert_eq!(fires.load(Ordering::SeqCst), 1);

        drop(tx);
        task.await.unwrap();
    }
}
