//! Incremental synchronization of the content store.
//!
//! Provides [`SyncController`], which owns the current [`ContentStore`]
//! snapshot and applies file change notifications to it with the smallest
//! reload that keeps the store correct:
//!
//! - Unknown files are ignored
//! - `website.yml` reloads the site record, or rebuilds everything when the
//!   site identity changed
//! - Array files (site settings, site markers, web links) reload their whole
//!   collection
//! - Any other file reloads the one record it belongs to and replaces it in
//!   place; records that cannot be matched trigger a collection reload
//!
//! # Thread Safety
//!
//! - `snapshot()` returns `Arc<ContentStore>` (just an Arc clone)
//! - Changes are serialized by a `Mutex<()>`; a second change waits behind
//!   the one in progress
//! - Each change builds a new snapshot and swaps it in, so readers never see
//!   a partially applied change and a failed reload leaves the previous
//!   snapshot untouched

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;

use portal_storage::{Storage, StorageEventReceiver};

use crate::classify::{FileKind, classify, owning_page};
use crate::entity::EntityType;
use crate::error::{LoadError, SyncError};
use crate::loader::EntityLoader;
use crate::store::{ContentStore, LoadFailure, elapsed_ms};

/// What a change did to the store.
#[derive(Debug)]
pub enum SyncOutcome {
    /// The path is not part of the content model.
    Ignored,
    /// Only the site record was refreshed.
    SiteUpdated,
    /// The site identity changed and the whole store was rebuilt.
    StoreRebuilt { failures: Vec<LoadFailure> },
    /// One record was replaced at its existing index.
    RecordReplaced { entity: EntityType, index: usize },
    /// A whole collection was reloaded.
    CollectionReloaded { entity: EntityType, len: usize },
}

/// Applies change notifications to a content store.
pub struct SyncController {
    storage: Arc<dyn Storage>,
    /// Mutex for serializing reload operations.
    reload_lock: Mutex<()>,
    /// Current store snapshot (`None` until initialized).
    current: RwLock<Option<Arc<ContentStore>>>,
}

impl SyncController {
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            reload_lock: Mutex::new(()),
            current: RwLock::new(None),
        }
    }

    /// Build the store from scratch.
    ///
    /// Returns the collections that degraded to empty.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Site`] if the site record cannot be loaded.
    ///
    /// # Panics
    ///
    /// Panics if internal locks are poisoned.
    pub fn initialize(&self) -> Result<Vec<LoadFailure>, SyncError> {
        let _guard = self.reload_lock.lock().unwrap();
        let build = ContentStore::build(self.storage.as_ref()).map_err(SyncError::Site)?;
        self.publish(build.store);
        Ok(build.failures)
    }

    /// Current store snapshot, `None` before [`initialize`](Self::initialize).
    ///
    /// # Panics
    ///
    /// Panics if the internal `RwLock` is poisoned.
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<ContentStore>> {
        self.current.read().unwrap().clone()
    }

    /// Apply a change to one site-relative path.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] if the reload fails; the previous snapshot is
    /// kept.
    ///
    /// # Panics
    ///
    /// Panics if internal locks are poisoned.
    pub fn apply(&self, path: &Path) -> Result<SyncOutcome, SyncError> {
        let kind = classify(path);
        if kind == FileKind::Unknown {
            tracing::trace!(path = %path.display(), "Ignoring unclassified path");
            return Ok(SyncOutcome::Ignored);
        }

        let _guard = self.reload_lock.lock().unwrap();
        let current = self.snapshot().ok_or(SyncError::Uninitialized)?;
        let locator = kind
            .locate(path)
            .ok_or_else(|| SyncError::AmbiguousClassification {
                path: path.to_path_buf(),
                kind,
            })?;

        let start = Instant::now();
        let loader = EntityLoader::new(self.storage.as_ref());
        let outcome = match kind.entity() {
            None => self.reload_site(&loader, &current)?,
            Some(entity) if entity.is_array() => {
                self.reload_collection(&loader, &current, entity)?
            }
            Some(entity) => self.reload_record(&loader, &current, entity, &locator)?,
        };

        tracing::debug!(
            path = %path.display(),
            ?kind,
            ?outcome,
            elapsed_ms = elapsed_ms(start),
            "Applied change"
        );
        Ok(outcome)
    }

    /// Apply every event from a watch stream until it closes.
    ///
    /// Events are handled strictly one after another. `observe` is called
    /// with each path and its result; failures are logged and never stop
    /// the loop.
    pub fn run<F>(&self, events: &StorageEventReceiver, mut observe: F)
    where
        F: FnMut(&Path, &Result<SyncOutcome, SyncError>),
    {
        for event in events.iter() {
            let result = self.apply(&event.path);
            match &result {
                Ok(SyncOutcome::Ignored) => {}
                Ok(outcome) => {
                    tracing::info!(path = %event.path.display(), ?outcome, "Store updated");
                }
                Err(e) => {
                    tracing::warn!(
                        path = %event.path.display(),
                        error = %e,
                        "Reload failed, keeping previous state"
                    );
                }
            }
            observe(&event.path, &result);
        }
        tracing::debug!("Change stream closed");
    }

    fn reload_site(
        &self,
        loader: &EntityLoader<'_>,
        current: &ContentStore,
    ) -> Result<SyncOutcome, SyncError> {
        let site = loader.load_site().map_err(SyncError::Site)?;

        if site.id() != current.site().id() {
            tracing::info!(site_id = %site.id(), "Site identity changed, rebuilding store");
            let build = ContentStore::build_for_site(loader, site);
            self.publish(build.store);
            return Ok(SyncOutcome::StoreRebuilt {
                failures: build.failures,
            });
        }

        // Records stamp only the identity, which is unchanged
        let mut next = current.clone();
        next.set_site(site);
        self.publish(next);
        Ok(SyncOutcome::SiteUpdated)
    }

    fn reload_collection(
        &self,
        loader: &EntityLoader<'_>,
        current: &ContentStore,
        entity: EntityType,
    ) -> Result<SyncOutcome, SyncError> {
        let records = loader
            .load_collection(entity, current.site().id())
            .map_err(|source| SyncError::Reload { entity, source })?;
        let len = records.len();

        let mut next = current.clone();
        next.replace_collection(entity, records);
        self.publish(next);
        Ok(SyncOutcome::CollectionReloaded { entity, len })
    }

    fn reload_record(
        &self,
        loader: &EntityLoader<'_>,
        current: &ContentStore,
        entity: EntityType,
        locator: &Path,
    ) -> Result<SyncOutcome, SyncError> {
        let locator = record_locator(entity, locator);

        let record = match loader.load_record(entity, &locator, current.site().id()) {
            Ok(record) => record,
            Err(e) if e.is_not_found() => {
                tracing::debug!(
                    entity = %entity,
                    locator = %locator.display(),
                    "Record files missing, reloading collection"
                );
                return self.reload_collection(loader, current, entity);
            }
            Err(source) => return Err(SyncError::Reload { entity, source }),
        };

        let records = current.get_collection(entity);
        let matched = record
            .identity()
            .and_then(|id| records.iter().position(|r| r.identity() == Some(id)));

        // An identity held by a record at another locator is either a copy or
        // a rename; only a collection load can place or reject it
        let index = match matched {
            Some(index) if records[index].locator() == record.locator() => index,
            Some(index) => {
                tracing::debug!(
                    entity = %entity,
                    locator = %locator.display(),
                    holder = %records[index].locator().display(),
                    "Identity held by another record, reloading collection"
                );
                return self.reload_collection(loader, current, entity);
            }
            None => {
                tracing::debug!(
                    entity = %entity,
                    locator = %locator.display(),
                    "No matching record, reloading collection"
                );
                return self.reload_collection(loader, current, entity);
            }
        };

        let mut next = current.clone();
        if !next.replace_element(entity, index, record) {
            return Err(SyncError::Reload {
                entity,
                source: LoadError::NotFound(locator),
            });
        }
        self.publish(next);
        Ok(SyncOutcome::RecordReplaced { entity, index })
    }

    fn publish(&self, store: ContentStore) {
        *self.current.write().unwrap() = Some(Arc::new(store));
    }
}

/// Locator of the top-level record a change applies to.
///
/// Content pages are not addressable in the page collection, so their
/// changes go to the owning page.
fn record_locator(entity: EntityType, locator: &Path) -> PathBuf {
    if entity == EntityType::Page
        && let Some(owner) = owning_page(locator)
    {
        return owner;
    }
    locator.to_path_buf()
}
