//! In-memory content model.
//!
//! Provides [`ContentStore`]: the site record plus one collection per
//! [`EntityType`]. Collections are shared slices, so cloning a store to
//! apply one change copies only the map of handles, and the changed
//! collection is copied on write.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use portal_storage::Storage;
use rayon::prelude::*;

use crate::entity::EntityType;
use crate::error::LoadError;
use crate::loader::EntityLoader;
use crate::record::{Record, Site};

/// Convert Duration to milliseconds as f64.
pub(crate) fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// A collection that failed to load during a build.
#[derive(Debug)]
pub struct LoadFailure {
    pub entity: EntityType,
    pub error: LoadError,
}

/// Result of [`ContentStore::build`].
#[derive(Debug)]
pub struct StoreBuild {
    pub store: ContentStore,
    /// Collections that degraded to empty.
    pub failures: Vec<LoadFailure>,
}

/// Site record and collections.
#[derive(Clone, Debug, PartialEq)]
pub struct ContentStore {
    site: Site,
    collections: BTreeMap<EntityType, Arc<[Record]>>,
    /// Load error messages of collections that degraded to empty.
    degraded: BTreeMap<EntityType, String>,
}

impl ContentStore {
    /// Build a store: site first, then every collection.
    ///
    /// # Errors
    ///
    /// Fails only if the site record cannot be loaded. Collection failures
    /// degrade that collection to empty and are listed in
    /// [`StoreBuild::failures`].
    pub fn build(storage: &dyn Storage) -> Result<StoreBuild, LoadError> {
        let loader = EntityLoader::new(storage);
        let site = loader.load_site()?;
        Ok(Self::build_for_site(&loader, site))
    }

    pub(crate) fn build_for_site(loader: &EntityLoader<'_>, site: Site) -> StoreBuild {
        let start = Instant::now();

        let results: Vec<(EntityType, Result<Vec<Record>, LoadError>)> = EntityType::ALL
            .par_iter()
            .map(|&entity| (entity, loader.load_collection(entity, site.id())))
            .collect();

        let mut store = Self {
            site,
            collections: BTreeMap::new(),
            degraded: BTreeMap::new(),
        };
        let mut failures = Vec::new();

        for (entity, result) in results {
            match result {
                Ok(records) => {
                    store.collections.insert(entity, records.into());
                }
                Err(error) => {
                    tracing::warn!(entity = %entity, error = %error, "Collection degraded to empty");
                    store.collections.insert(entity, Vec::<Record>::new().into());
                    store.degraded.insert(entity, error.to_string());
                    failures.push(LoadFailure { entity, error });
                }
            }
        }

        tracing::info!(
            records = store.record_count(),
            degraded = failures.len(),
            elapsed_ms = elapsed_ms(start),
            "Content store built"
        );

        StoreBuild { store, failures }
    }

    #[must_use]
    pub fn site(&self) -> &Site {
        &self.site
    }

    /// Records of one entity type in enumeration order.
    #[must_use]
    pub fn get_collection(&self, entity: EntityType) -> &[Record] {
        match self.collections.get(&entity) {
            Some(collection) => collection,
            None => &[],
        }
    }

    /// Every collection in [`EntityType::ALL`] order.
    pub fn collections(&self) -> impl Iterator<Item = (EntityType, &[Record])> {
        EntityType::ALL
            .into_iter()
            .map(|entity| (entity, self.get_collection(entity)))
    }

    /// Load error of a collection that degraded to empty.
    #[must_use]
    pub fn degraded(&self, entity: EntityType) -> Option<&str> {
        self.degraded.get(&entity).map(String::as_str)
    }

    /// Total number of top-level records.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.collections.values().map(|c| c.len()).sum()
    }

    pub(crate) fn set_site(&mut self, site: Site) {
        self.site = site;
    }

    /// Replace a whole collection.
    pub(crate) fn replace_collection(&mut self, entity: EntityType, records: Vec<Record>) {
        self.collections.insert(entity, records.into());
        self.degraded.remove(&entity);
    }

    /// Replace one element in place. Returns `false` if `index` is out of
    /// range.
    pub(crate) fn replace_element(
        &mut self,
        entity: EntityType,
        index: usize,
        record: Record,
    ) -> bool {
        let Some(collection) = self.collections.get_mut(&entity) else {
            return false;
        };
        if index >= collection.len() {
            return false;
        }
        Arc::make_mut(collection)[index] = record;
        true
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use portal_storage::MockStorage;
    use pretty_assertions::assert_eq;

    use super::*;

    static_assertions::assert_impl_all!(ContentStore: Send, Sync);

    fn storage() -> MockStorage {
        MockStorage::new()
            .with_file("website.yml", "adx_websiteid: site-1")
            .with_file("lists/a.list.yml", "adx_entitylistid: a\nadx_name: A")
            .with_file("lists/b.list.yml", "adx_entitylistid: b\nadx_name: B")
            .with_file(
                "web-templates/broken/broken.webtemplate.yml",
                "adx_webtemplateid: t1",
            )
    }

    #[test]
    fn test_build_degrades_failing_collection() {
        let build = ContentStore::build(&storage()).unwrap();

        assert_eq!(build.failures.len(), 1);
        assert_eq!(build.failures[0].entity, EntityType::Template);
        assert!(build.store.get_collection(EntityType::Template).is_empty());
        assert!(build.store.degraded(EntityType::Template).is_some());
        assert_eq!(build.store.get_collection(EntityType::List).len(), 2);
    }

    #[test]
    fn test_build_without_site_fails() {
        let err = ContentStore::build(&MockStorage::new()).unwrap_err();

        assert!(err.is_not_found());
    }

    #[test]
    fn test_every_collection_present() {
        let build = ContentStore::build(&storage()).unwrap();

        let entities: Vec<_> = build.store.collections().map(|(e, _)| e).collect();
        assert_eq!(entities, EntityType::ALL.to_vec());
        assert_eq!(build.store.record_count(), 2);
    }

    #[test]
    fn test_replace_element_copies_on_write() {
        let original = ContentStore::build(&storage()).unwrap().store;
        let mut next = original.clone();
        let mut replacement = original.get_collection(EntityType::List)[1].clone();
        replacement.insert("adx_name", "Changed".into());

        assert!(next.replace_element(EntityType::List, 1, replacement));

        assert_eq!(original.get_collection(EntityType::List)[1].label(), Some("B"));
        assert_eq!(next.get_collection(EntityType::List)[1].label(), Some("Changed"));
        assert_eq!(next.get_collection(EntityType::List).len(), 2);
    }

    #[test]
    fn test_replace_element_out_of_range() {
        let mut store = ContentStore::build(&storage()).unwrap().store;
        let record = store.get_collection(EntityType::List)[0].clone();

        assert!(!store.replace_element(EntityType::List, 5, record));
    }

    #[test]
    fn test_replace_collection_clears_degraded() {
        let mut store = ContentStore::build(&storage()).unwrap().store;

        store.replace_collection(EntityType::Template, Vec::new());

        assert_eq!(store.degraded(EntityType::Template), None);
        assert_eq!(
            store.get_collection(EntityType::List)[0].locator(),
            PathBuf::from("lists/a")
        );
    }
}
