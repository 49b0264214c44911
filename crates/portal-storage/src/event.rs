//! Storage event types for change notification.
//!
//! Provides types for subscribing to site tree changes through the
//! [`Storage::watch`](crate::Storage::watch) method.

use std::path::PathBuf;
use std::sync::mpsc;

/// Kind of storage event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageEventKind {
    /// File was created.
    Created,
    /// File was modified.
    Modified,
    /// File was removed.
    Removed,
}

/// A storage change event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageEvent {
    /// Site-relative path of the changed file (e.g. `"web-pages/home/home.webpage.yml"`).
    pub path: PathBuf,
    /// Kind of change.
    pub kind: StorageEventKind,
}

impl StorageEvent {
    /// Create a new event.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, kind: StorageEventKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Receiver for storage events.
///
/// Wraps a [`std::sync::mpsc::Receiver`] for synchronous event delivery.
/// Events are delivered in the order they were sent, so a consumer that
/// handles one event at a time processes changes strictly in sequence.
pub struct StorageEventReceiver {
    rx: mpsc::Receiver<StorageEvent>,
}

impl StorageEventReceiver {
    /// Create a new receiver from a channel receiver.
    ///
    /// Used by storage backends to hand out their event stream.
    #[must_use]
    pub fn new(rx: mpsc::Receiver<StorageEvent>) -> Self {
        Self { rx }
    }

    /// Wait for the next event (blocking).
    ///
    /// Returns `None` when the sender is dropped.
    #[must_use]
    pub fn recv(&self) -> Option<StorageEvent> {
        self.rx.recv().ok()
    }

    /// Try to receive an event without blocking.
    ///
    /// Returns `None` if no event is available or the sender is dropped.
    #[must_use]
    pub fn try_recv(&self) -> Option<StorageEvent> {
        self.rx.try_recv().ok()
    }

    /// Returns an iterator over events.
    ///
    /// Blocks until an event is available. Stops when the sender is dropped.
    pub fn iter(&self) -> impl Iterator<Item = StorageEvent> + '_ {
        self.rx.iter()
    }

    /// Create a no-op receiver that never yields events.
    pub(crate) fn no_op() -> Self {
        let (_tx, rx) = mpsc::channel();
        Self { rx }
    }
}

/// Handle to stop watching for changes.
///
/// Dropping the handle stops watching: the internal shutdown sender is
/// dropped, which the backend's worker observes as a disconnect.
pub struct WatchHandle {
    _shutdown: Option<mpsc::Sender<()>>,
}

impl WatchHandle {
    /// Create a new watch handle with a shutdown signal sender.
    #[must_use]
    pub fn new(shutdown: mpsc::Sender<()>) -> Self {
        Self {
            _shutdown: Some(shutdown),
        }
    }

    /// Stop watching immediately (consumes the handle).
    pub fn stop(mut self) {
        self._shutdown.take();
    }

    /// Create a no-op handle that does nothing on drop.
    #[must_use]
    pub fn no_op() -> Self {
        Self { _shutdown: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static_assertions::assert_impl_all!(WatchHandle: Send);
    static_assertions::assert_impl_all!(StorageEventReceiver: Send);

    #[test]
    fn test_receiver_preserves_order() {
        let (tx, rx) = mpsc::channel();
        let receiver = StorageEventReceiver::new(rx);

        let events = vec![
            StorageEvent::new("website.yml", StorageEventKind::Modified),
            StorageEvent::new("lists/a.list.yml", StorageEventKind::Created),
            StorageEvent::new("lists/a.list.yml", StorageEventKind::Removed),
        ];
        for event in &events {
            tx.send(event.clone()).unwrap();
        }
        drop(tx);

        let received: Vec<_> = receiver.iter().collect();
        assert_eq!(received, events);
    }

    #[test]
    fn test_receiver_recv_on_closed_channel() {
        let (tx, rx) = mpsc::channel();
        let receiver = StorageEventReceiver::new(rx);

        drop(tx);

        assert!(receiver.recv().is_none());
    }

    #[test]
    fn test_receiver_no_op() {
        let receiver = StorageEventReceiver::no_op();

        assert!(receiver.try_recv().is_none());
    }

    #[test]
    fn test_watch_handle_stop_closes_channel() {
        let (tx, rx) = mpsc::channel();
        let handle = WatchHandle::new(tx);

        handle.stop();

        assert!(rx.recv().is_err());
    }

    #[test]
    fn test_watch_handle_drop_closes_channel() {
        let (tx, rx) = mpsc::channel();
        let handle = WatchHandle::new(tx);

        drop(handle);

        assert!(rx.recv().is_err());
    }
}
