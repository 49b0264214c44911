//! Content model for portal sites.
//!
//! This crate provides:
//! - [`classify`]: path to [`FileKind`] classification
//! - [`EntityLoader`]: per-entity composition of site files into [`Record`]s
//! - [`ContentStore`]: the site record plus one collection per [`EntityType`]
//! - [`SyncController`]: incremental store updates from change notifications
//! - [`build_item_tree`] and [`DependencyGraph`]: the item tree annotated with
//!   directive references and unused components
//!
//! # Quick Start
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use std::path::{Path, PathBuf};
//! use std::sync::Arc;
//! use portal_model::{DependencyGraph, SyncController, build_item_tree};
//! use portal_storage_fs::FsStorage;
//!
//! let storage = Arc::new(FsStorage::new(PathBuf::from("my-site")));
//! let controller = SyncController::new(storage);
//! controller.initialize()?;
//!
//! // After a file change
//! controller.apply(Path::new("web-pages/home/home.webpage.copy.html"))?;
//!
//! let store = controller.snapshot().expect("initialized");
//! let report = DependencyGraph::new(&store).build(build_item_tree(&store));
//! println!("{} unresolved references", report.unresolved.len());
//! # Ok(())
//! # }
//! ```

mod classify;
mod entity;
mod error;
mod graph;
mod item;
mod loader;
mod record;
mod store;
mod sync;

pub use classify::{FileKind, classify};
pub use entity::{EntityType, LABEL_ATTRIBUTE, SITE_FILE, SITE_ID_ATTRIBUTE};
pub use error::{LoadError, SyncError};
pub use graph::{DependencyGraph, GraphReport, UnresolvedReference};
pub use item::{DEPENDENCIES_LABEL, Item, ItemKind, UNUSED_LABEL, build_item_tree};
pub use loader::EntityLoader;
pub use record::{Attributes, Record, RecordFile, Site};
pub use store::{ContentStore, LoadFailure, StoreBuild};
pub use sync::{SyncController, SyncOutcome};
