//! Per-path coalescing of raw watcher events.
//!
//! Editors typically emit several notifications for one save (truncate,
//! write, rename). The debouncer folds them into one event per path and
//! releases it once the path has been quiet for the debounce window.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use portal_storage::{StorageEvent, StorageEventKind};

/// An event waiting for its quiet period to elapse.
struct Pending {
    kind: StorageEventKind,
    deadline: Instant,
    /// Arrival order of the first event for this path.
    seq: u64,
}

#[derive(Default)]
struct State {
    pending: HashMap<PathBuf, Pending>,
    next_seq: u64,
}

/// Thread-safe change debouncer.
pub(crate) struct ChangeDebouncer {
    state: Mutex<State>,
    window: Duration,
}

impl ChangeDebouncer {
    pub(crate) fn new(window: Duration) -> Self {
        Self {
            state: Mutex::new(State::default()),
            window,
        }
    }

    /// Record a raw event for a site-relative path.
    pub(crate) fn record(&self, path: PathBuf, kind: StorageEventKind) {
        let mut state = self.state.lock().unwrap();
        let deadline = Instant::now() + self.window;

        if let Some(existing) = state.pending.get_mut(&path) {
            match merge(existing.kind, kind) {
                Some(merged) => {
                    existing.kind = merged;
                    existing.deadline = deadline;
                }
                None => {
                    state.pending.remove(&path);
                }
            }
            return;
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        state.pending.insert(
            path,
            Pending {
                kind,
                deadline,
                seq,
            },
        );
    }

    /// Take every event whose quiet period has elapsed, in arrival order.
    pub(crate) fn drain_ready(&self) -> Vec<StorageEvent> {
        let mut state = self.state.lock().unwrap();
        let now = Instant::now();

        let mut ready: Vec<(u64, PathBuf)> = state
            .pending
            .iter()
            .filter(|(_, p)| p.deadline <= now)
            .map(|(path, p)| (p.seq, path.clone()))
            .collect();
        ready.sort_unstable_by_key(|(seq, _)| *seq);

        ready
            .into_iter()
            .filter_map(|(_, path)| {
                let pending = state.pending.remove(&path)?;
                Some(StorageEvent::new(path, pending.kind))
            })
            .collect()
    }
}

/// Fold a new event kind into a pending one.
///
/// `None` means the pair cancels out: a file created and removed inside one
/// window never existed as far as consumers are concerned.
#[allow(clippy::match_same_arms)]
fn merge(pending: StorageEventKind, new: StorageEventKind) -> Option<StorageEventKind> {
    use StorageEventKind::{Created, Modified, Removed};

    match (pending, new) {
        (Created, Removed) => None,
        (Created, _) => Some(Created),
        (Modified, Created) => Some(Created),
        (Modified, kind) => Some(kind),
        // Replaced in place
        (Removed, Created) => Some(Modified),
        (Removed, _) => Some(Removed),
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    const WINDOW: Duration = Duration::from_millis(10);

    fn settle() {
        thread::sleep(Duration::from_millis(20));
    }

    #[test]
    fn test_event_held_until_window_elapses() {
        let debouncer = ChangeDebouncer::new(WINDOW);

        debouncer.record(PathBuf::from("website.yml"), StorageEventKind::Modified);
        assert!(debouncer.drain_ready().is_empty());

        settle();
        let events = debouncer.drain_ready();
        assert_eq!(
            events,
            vec![StorageEvent::new("website.yml", StorageEventKind::Modified)]
        );
        assert!(debouncer.drain_ready().is_empty());
    }

    #[test]
    fn test_repeated_modifications_coalesce() {
        let debouncer = ChangeDebouncer::new(WINDOW);
        let path = PathBuf::from("lists/orders.list.yml");

        for _ in 0..3 {
            debouncer.record(path.clone(), StorageEventKind::Modified);
        }

        settle();
        assert_eq!(debouncer.drain_ready().len(), 1);
    }

    #[test]
    fn test_created_then_removed_cancels() {
        let debouncer = ChangeDebouncer::new(WINDOW);
        let path = PathBuf::from("lists/tmp.list.yml");

        debouncer.record(path.clone(), StorageEventKind::Created);
        debouncer.record(path, StorageEventKind::Removed);

        settle();
        assert!(debouncer.drain_ready().is_empty());
    }

    #[test]
    fn test_removed_then_created_is_modification() {
        let debouncer = ChangeDebouncer::new(WINDOW);
        let path = PathBuf::from("website.yml");

        debouncer.record(path.clone(), StorageEventKind::Removed);
        debouncer.record(path, StorageEventKind::Created);

        settle();
        let events = debouncer.drain_ready();
        assert_eq!(events[0].kind, StorageEventKind::Modified);
    }

    #[test]
    fn test_drain_preserves_arrival_order() {
        let debouncer = ChangeDebouncer::new(WINDOW);

        debouncer.record(PathBuf::from("c.yml"), StorageEventKind::Modified);
        debouncer.record(PathBuf::from("a.yml"), StorageEventKind::Modified);
        debouncer.record(PathBuf::from("b.yml"), StorageEventKind::Modified);

        settle();
        let paths: Vec<_> = debouncer
            .drain_ready()
            .into_iter()
            .map(|e| e.path)
            .collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("c.yml"),
                PathBuf::from("a.yml"),
                PathBuf::from("b.yml")
            ]
        );
    }

    #[test]
    fn test_merge_matrix() {
        use StorageEventKind::{Created, Modified, Removed};

        assert_eq!(merge(Created, Modified), Some(Created));
        assert_eq!(merge(Created, Removed), None);
        assert_eq!(merge(Modified, Created), Some(Created));
        assert_eq!(merge(Modified, Modified), Some(Modified));
        assert_eq!(merge(Modified, Removed), Some(Removed));
        assert_eq!(merge(Removed, Created), Some(Modified));
        assert_eq!(merge(Removed, Modified), Some(Removed));
    }
}
