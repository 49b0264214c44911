//! Storage abstraction for portal site trees.
//!
//! A portal site is a directory tree whose file names follow a fixed
//! convention. This crate provides a [`Storage`] trait for the small set of
//! operations the content model needs from that tree:
//!
//! - `read()` a file as text
//! - `list()` the entries of a directory in a stable order
//! - `watch()` the tree for change notifications
//!
//! Keeping these behind a trait enables:
//!
//! - **Unit testing** without touching the real filesystem ([`MockStorage`])
//! - **Backend flexibility** (local filesystem, remote workspaces)
//! - **Clean separation** between content-model logic and I/O
//!
//! # Path Convention
//!
//! All paths are relative to the site root and use `/` separated components,
//! e.g. `"website.yml"` or `"web-pages/home/home.webpage.yml"`. The empty path
//! denotes the site root itself.

mod event;
#[cfg(feature = "mock")]
mod mock;
mod storage;

pub use event::{StorageEvent, StorageEventKind, StorageEventReceiver, WatchHandle};
#[cfg(feature = "mock")]
pub use mock::MockStorage;
pub use storage::{DirEntry, EntryKind, Storage, StorageError, StorageErrorKind};
