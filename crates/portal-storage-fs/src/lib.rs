//! Filesystem storage backend for portal site trees.
//!
//! This crate provides [`FsStorage`], a filesystem implementation of the
//! [`Storage`](portal_storage::Storage) trait. It handles:
//!
//! - Reading site files relative to a root directory
//! - Ordered directory listing (directories first, then by name)
//! - Rejecting paths that escape the root
//! - File watching with per-path event debouncing
//!
//! # Example
//!
//! ```ignore
//! use std::path::{Path, PathBuf};
//! use portal_storage::Storage;
//! use portal_storage_fs::FsStorage;
//!
//! let storage = FsStorage::new(PathBuf::from("my-site"));
//! let website = storage.read(Path::new("website.yml"))?;
//! ```

mod debouncer;

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, mpsc};
use std::time::Duration;

use glob::Pattern;
use notify::{RecursiveMode, Watcher};

use debouncer::ChangeDebouncer;
use portal_storage::{
    DirEntry, Storage, StorageError, StorageErrorKind, StorageEventKind, StorageEventReceiver,
    WatchHandle,
};

/// Backend identifier for error messages.
const BACKEND: &str = "Fs";

/// Default quiet period before a change is delivered.
const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// How often the drain thread polls the debouncer.
const DRAIN_INTERVAL: Duration = Duration::from_millis(50);

/// Create a storage error from a notify error.
fn notify_error(e: notify::Error) -> StorageError {
    StorageError::new(StorageErrorKind::Other)
        .with_backend(BACKEND)
        .with_source(e)
}

/// Convert a `notify::EventKind` to a `StorageEventKind`.
///
/// Returns `None` for event kinds that are not relevant (e.g., Access).
fn storage_event_kind(kind: notify::EventKind) -> Option<StorageEventKind> {
    match kind {
        notify::EventKind::Create(_) => Some(StorageEventKind::Created),
        notify::EventKind::Modify(_) => Some(StorageEventKind::Modified),
        notify::EventKind::Remove(_) => Some(StorageEventKind::Removed),
        _ => None,
    }
}

/// True if any component of a relative path is hidden (`.git`, `.DS_Store`).
fn is_hidden(rel_path: &Path) -> bool {
    rel_path
        .components()
        .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
}

/// Filesystem storage implementation.
///
/// All paths passed to the [`Storage`] methods are relative to `root`.
pub struct FsStorage {
    /// Site root directory.
    root: PathBuf,
    /// Patterns for file watching (empty means every file).
    watch_patterns: Vec<Pattern>,
    /// Quiet period applied to watcher events.
    debounce: Duration,
}

impl FsStorage {
    /// Create a new filesystem storage rooted at `root`.
    ///
    /// Watches every file below the root.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            watch_patterns: Vec::new(),
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    /// Create a new filesystem storage with glob patterns restricting which
    /// changes are reported (e.g. `["**/*.yml", "**/*.html"]`).
    ///
    /// # Errors
    ///
    /// Returns [`StorageErrorKind::InvalidPath`] if a pattern does not parse.
    pub fn with_patterns(root: PathBuf, patterns: &[String]) -> Result<Self, StorageError> {
        let watch_patterns = patterns
            .iter()
            .map(|p| {
                Pattern::new(p).map_err(|e| {
                    StorageError::new(StorageErrorKind::InvalidPath)
                        .with_path(p)
                        .with_backend(BACKEND)
                        .with_source(e)
                })
            })
            .collect::<Result<_, _>>()?;

        Ok(Self {
            watch_patterns,
            ..Self::new(root)
        })
    }

    /// Set the debounce window for watcher events.
    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Site root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validate that a path stays inside the root.
    ///
    /// Rejects absolute paths and paths containing parent directory
    /// components (`..`).
    fn validate_path(path: &Path) -> Result<(), StorageError> {
        let escapes = path.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });

        if escapes {
            return Err(StorageError::new(StorageErrorKind::InvalidPath)
                .with_path(path)
                .with_backend(BACKEND));
        }
        Ok(())
    }

    fn io_error(e: std::io::Error, path: &Path) -> StorageError {
        StorageError::io(e, Some(path.to_path_buf())).with_backend(BACKEND)
    }
}

impl Storage for FsStorage {
    fn read(&self, path: &Path) -> Result<String, StorageError> {
        Self::validate_path(path)?;
        fs::read_to_string(self.root.join(path)).map_err(|e| Self::io_error(e, path))
    }

    fn list(&self, dir: &Path) -> Result<Vec<DirEntry>, StorageError> {
        Self::validate_path(dir)?;
        let entries = fs::read_dir(self.root.join(dir)).map_err(|e| Self::io_error(e, dir))?;

        let mut entries: Vec<DirEntry> = entries
            .filter_map(Result::ok)
            .filter_map(|e| {
                let name = e.file_name().to_string_lossy().into_owned();
                if name.starts_with('.') {
                    return None;
                }
                let is_dir = fs::metadata(e.path()).is_ok_and(|m| m.is_dir());
                Some(if is_dir {
                    DirEntry::dir(name)
                } else {
                    DirEntry::file(name)
                })
            })
            .collect();

        // Directories first, then alphabetical
        entries.sort_by(|a, b| {
            b.is_dir()
                .cmp(&a.is_dir())
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        });

        Ok(entries)
    }

    fn exists(&self, path: &Path) -> bool {
        Self::validate_path(path).is_ok() && self.root.join(path).exists()
    }

    fn watch(&self) -> Result<(StorageEventReceiver, WatchHandle), StorageError> {
        let (event_tx, event_rx) = mpsc::channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let debouncer = Arc::new(ChangeDebouncer::new(self.debounce));

        // notify reports canonical paths on some platforms
        let root = fs::canonicalize(&self.root).unwrap_or_else(|_| self.root.clone());
        let patterns = self.watch_patterns.clone();
        let watcher_debouncer = Arc::clone(&debouncer);

        let mut watcher =
            notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
                let Ok(event) = res else { return };
                let Some(kind) = storage_event_kind(event.kind) else {
                    return;
                };
                for path in event.paths {
                    let Ok(rel_path) = path.strip_prefix(&root) else {
                        continue;
                    };
                    if is_hidden(rel_path) {
                        continue;
                    }
                    if !patterns.is_empty() && !patterns.iter().any(|p| p.matches_path(rel_path))
                    {
                        continue;
                    }
                    watcher_debouncer.record(rel_path.to_path_buf(), kind);
                }
            })
            .map_err(notify_error)?;

        watcher
            .watch(&self.root, RecursiveMode::Recursive)
            .map_err(notify_error)?;

        tracing::debug!(root = %self.root.display(), "Watching site tree");

        // Drain thread owns the watcher to keep it alive.
        std::thread::spawn(move || {
            let _watcher = watcher;

            loop {
                match shutdown_rx.recv_timeout(DRAIN_INTERVAL) {
                    Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
                    Err(mpsc::RecvTimeoutError::Timeout) => {}
                }

                for event in debouncer.drain_ready() {
                    if event_tx.send(event).is_err() {
                        return;
                    }
                }
            }
        });

        Ok((
            StorageEventReceiver::new(event_rx),
            WatchHandle::new(shutdown_tx),
        ))
    }
}
