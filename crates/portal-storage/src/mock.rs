//! Mock storage implementation for testing.
//!
//! Provides [`MockStorage`], an in-memory site tree.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, mpsc};

use crate::event::{StorageEvent, StorageEventKind, StorageEventReceiver, WatchHandle};
use crate::storage::{DirEntry, Storage, StorageError, StorageErrorKind};

const BACKEND: &str = "Mock";

/// Mock storage for testing.
///
/// Holds file contents in memory keyed by site-relative path. Directories
/// are implied by the files they contain; empty directories can be added
/// with [`with_dir`](Self::with_dir).
///
/// # Example
///
/// ```ignore
/// use std::path::Path;
/// use portal_storage::{MockStorage, Storage};
///
/// let storage = MockStorage::new()
///     .with_file("website.yml", "adx_websiteid: 1111")
///     .with_file("lists/orders.list.yml", "adx_name: Orders");
///
/// let entries = storage.list(Path::new("lists")).unwrap();
/// assert_eq!(entries[0].name, "orders.list.yml");
/// ```
#[derive(Debug, Default)]
pub struct MockStorage {
    files: RwLock<BTreeMap<PathBuf, String>>,
    dirs: RwLock<BTreeSet<PathBuf>>,
    event_sender: RwLock<Option<mpsc::Sender<StorageEvent>>>,
}

impl MockStorage {
    /// Create a new empty mock storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file with content.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_file(self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.set_file(path, content);
        self
    }

    /// Add an empty directory.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_dir(self, path: impl Into<PathBuf>) -> Self {
        self.dirs.write().unwrap().insert(path.into());
        self
    }

    /// Create or overwrite a file in place.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn set_file(&self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.files
            .write()
            .unwrap()
            .insert(path.into(), content.into());
    }

    /// Remove a file. Returns `true` if it existed.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn remove_file(&self, path: impl AsRef<Path>) -> bool {
        self.files.write().unwrap().remove(path.as_ref()).is_some()
    }

    /// Emit a storage event.
    ///
    /// Only works if `watch()` has been called first.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn emit(&self, event: StorageEvent) {
        if let Some(sender) = self.event_sender.read().unwrap().as_ref() {
            let _ = sender.send(event);
        }
    }

    /// Emit a Modified event.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn emit_modified(&self, path: impl Into<PathBuf>) {
        self.emit(StorageEvent::new(path, StorageEventKind::Modified));
    }

    /// Emit a Created event.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn emit_created(&self, path: impl Into<PathBuf>) {
        self.emit(StorageEvent::new(path, StorageEventKind::Created));
    }

    /// Drop the event sender so receivers observe the end of the stream.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn close_events(&self) {
        self.event_sender.write().unwrap().take();
    }

    fn not_found(path: &Path) -> StorageError {
        StorageError::new(StorageErrorKind::NotFound)
            .with_path(path)
            .with_backend(BACKEND)
    }
}

impl Storage for MockStorage {
    fn read(&self, path: &Path) -> Result<String, StorageError> {
        self.files
            .read()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| Self::not_found(path))
    }

    fn list(&self, dir: &Path) -> Result<Vec<DirEntry>, StorageError> {
        let files = self.files.read().unwrap();
        let dirs = self.dirs.read().unwrap();

        let mut children: BTreeMap<String, bool> = BTreeMap::new();
        let mut found = dir.as_os_str().is_empty() || dirs.contains(dir);

        for path in files.keys().chain(dirs.iter()) {
            let Ok(rest) = path.strip_prefix(dir) else {
                continue;
            };
            let mut components = rest.components();
            let Some(first) = components.next() else {
                continue;
            };
            found = true;
            let name = first.as_os_str().to_string_lossy().into_owned();
            let is_dir = components.next().is_some() || dirs.contains(path);
            *children.entry(name).or_insert(false) |= is_dir;
        }

        if files.contains_key(dir) {
            return Err(StorageError::new(StorageErrorKind::NotADirectory)
                .with_path(dir)
                .with_backend(BACKEND));
        }
        if !found {
            return Err(Self::not_found(dir));
        }

        // Directories first, then alphabetical (matches the filesystem backend)
        let mut entries: Vec<DirEntry> = children
            .into_iter()
            .map(|(name, is_dir)| {
                if is_dir {
                    DirEntry::dir(name)
                } else {
                    DirEntry::file(name)
                }
            })
            .collect();
        entries.sort_by(|a, b| {
            b.is_dir()
                .cmp(&a.is_dir())
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        });
        Ok(entries)
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.read().unwrap().contains_key(path) || self.list(path).is_ok()
    }

    fn watch(&self) -> Result<(StorageEventReceiver, WatchHandle), StorageError> {
        let (tx, rx) = mpsc::channel();

        // Store sender for emit methods
        *self.event_sender.write().unwrap() = Some(tx);

        Ok((StorageEventReceiver::new(rx), WatchHandle::no_op()))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    static_assertions::assert_impl_all!(MockStorage: Send, Sync);

    fn sample() -> MockStorage {
        MockStorage::new()
            .with_file("website.yml", "adx_websiteid: 1")
            .with_file("web-pages/home/home.webpage.yml", "adx_name: Home")
            .with_file("web-pages/home/home.webpage.copy.html", "<p>Hi</p>")
            .with_file("web-pages/about/about.webpage.yml", "adx_name: About")
            .with_dir("web-templates")
    }

    #[test]
    fn test_read_existing() {
        let storage = sample();

        assert_eq!(
            storage.read(Path::new("website.yml")).unwrap(),
            "adx_websiteid: 1"
        );
    }

    #[test]
    fn test_read_missing() {
        let storage = sample();

        let err = storage.read(Path::new("missing.yml")).unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(err.backend(), Some("Mock"));
        assert_eq!(err.path(), Some(Path::new("missing.yml")));
    }

    #[test]
    fn test_list_root_dirs_first() {
        let storage = sample();

        let entries = storage.list(Path::new("")).unwrap();

        assert_eq!(
            entries,
            vec![
                DirEntry::dir("web-pages"),
                DirEntry::dir("web-templates"),
                DirEntry::file("website.yml"),
            ]
        );
    }

    #[test]
    fn test_list_nested() {
        let storage = sample();

        let entries = storage.list(Path::new("web-pages/home")).unwrap();

        assert_eq!(
            entries,
            vec![
                DirEntry::file("home.webpage.copy.html"),
                DirEntry::file("home.webpage.yml"),
            ]
        );
    }

    #[test]
    fn test_list_empty_dir() {
        let storage = sample();

        assert!(storage.list(Path::new("web-templates")).unwrap().is_empty());
    }

    #[test]
    fn test_list_missing_dir() {
        let storage = sample();

        let err = storage.list(Path::new("content-snippets")).unwrap_err();

        assert!(err.is_not_found());
    }

    #[test]
    fn test_list_file_is_not_a_directory() {
        let storage = sample();

        let err = storage.list(Path::new("website.yml")).unwrap_err();

        assert_eq!(err.kind(), StorageErrorKind::NotADirectory);
    }

    #[test]
    fn test_set_and_remove_file() {
        let storage = sample();

        storage.set_file("lists/orders.list.yml", "adx_name: Orders");
        assert!(storage.exists(Path::new("lists")));
        assert!(storage.remove_file("lists/orders.list.yml"));
        assert!(!storage.exists(Path::new("lists/orders.list.yml")));
    }

    #[test]
    fn test_watch_and_emit() {
        let storage = sample();
        let (rx, _handle) = storage.watch().unwrap();

        storage.emit_modified("website.yml");
        storage.emit_created("lists/orders.list.yml");

        let first = rx.try_recv().unwrap();
        let second = rx.try_recv().unwrap();
        assert_eq!(first.path, PathBuf::from("website.yml"));
        assert_eq!(first.kind, StorageEventKind::Modified);
        assert_eq!(second.kind, StorageEventKind::Created);
    }

    #[test]
    fn test_close_events_ends_stream() {
        let storage = sample();
        let (rx, _handle) = storage.watch().unwrap();

        storage.emit_modified("website.yml");
        storage.close_events();

        assert_eq!(rx.iter().count(), 1);
    }

    #[test]
    fn test_emit_before_watch_does_nothing() {
        let storage = sample();

        storage.emit_modified("website.yml");
    }
}
