//! Item tree of a content store.
//!
//! One [`Item`] type represents every node: the site, category nodes per
//! entity type, records, their files, and the synthetic nodes the
//! dependency graph adds.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::entity::{EntityType, SITE_FILE};
use crate::record::{Record, value_to_string};
use crate::store::ContentStore;

/// Label of the per-record dependencies node.
pub const DEPENDENCIES_LABEL: &str = "Dependencies";

/// Label of the unused components branch.
pub const UNUSED_LABEL: &str = "Unused Components";

/// Role of a node in the tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", content = "entity")]
pub enum ItemKind {
    Site,
    Category(EntityType),
    Record(EntityType),
    File(EntityType),
    Dependencies,
    Unused,
    UnusedGroup(EntityType),
}

/// A node of the item tree.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub label: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub is_file: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub path: PathBuf,
    pub kind: ItemKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Item>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Item {
    /// Create a node. The title defaults to the label.
    pub fn new(kind: ItemKind, label: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let label = label.into();
        Self {
            title: label.clone(),
            label,
            id: None,
            is_file: matches!(kind, ItemKind::File(_)),
            content: None,
            path: path.into(),
            kind,
            children: Vec::new(),
            error: None,
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    #[must_use]
    pub fn with_id(mut self, id: Option<String>) -> Self {
        self.id = id;
        self
    }

    #[must_use]
    pub fn with_content(mut self, content: Option<String>) -> Self {
        self.content = content;
        self
    }

    #[must_use]
    pub fn with_error(mut self, error: Option<String>) -> Self {
        self.error = error;
        self
    }

    #[must_use]
    pub fn with_children(mut self, children: Vec<Item>) -> Self {
        self.children = children;
        self
    }

    /// Add a child unless one with the same kind and path is already listed.
    ///
    /// Returns `true` if the child was added.
    pub fn push_child(&mut self, child: Item) -> bool {
        if self
            .children
            .iter()
            .any(|c| c.kind == child.kind && c.path == child.path)
        {
            return false;
        }
        self.children.push(child);
        true
    }

    /// Depth-first search for the first node matching `predicate`.
    pub fn find(&self, predicate: &impl Fn(&Item) -> bool) -> Option<&Item> {
        if predicate(self) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(predicate))
    }

    /// Child with the given label.
    #[must_use]
    pub fn child(&self, label: &str) -> Option<&Item> {
        self.children.iter().find(|c| c.label == label)
    }
}

/// Build the item tree of a store.
///
/// Site, then one category per entity type, then records with their files.
/// Content pages are nested under their page after its files.
#[must_use]
pub fn build_item_tree(store: &ContentStore) -> Item {
    let site = store.site();
    let categories = store
        .collections()
        .map(|(entity, records)| {
            Item::new(ItemKind::Category(entity), entity.name(), entity.source_path())
                .with_error(store.degraded(entity).map(str::to_owned))
                .with_children(records.iter().map(record_item).collect())
        })
        .collect();

    Item::new(ItemKind::Site, site.name().unwrap_or("Site"), SITE_FILE)
        .with_id(value_to_string(site.id()))
        .with_children(categories)
}

fn record_item(record: &Record) -> Item {
    let entity = record.entity();
    let id = record.identity_string();
    let label = record
        .label()
        .map(str::to_owned)
        .or_else(|| id.clone())
        .unwrap_or_else(|| file_label(record.locator()));

    let mut children: Vec<Item> = record
        .files()
        .iter()
        .map(|file| {
            let content = file
                .attribute
                .and_then(|attr| record.text(attr))
                .map(str::to_owned);
            Item::new(ItemKind::File(entity), file_label(&file.path), &file.path)
                .with_content(content)
        })
        .collect();
    children.extend(record.content_pages().iter().map(record_item));

    Item::new(ItemKind::Record(entity), label.clone(), record.locator())
        .with_title(format!("{entity}: {label}"))
        .with_id(id)
        .with_children(children)
}

/// Last path component as a label.
pub(crate) fn file_label(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}
