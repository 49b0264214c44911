//! Dependency graph between records.
//!
//! [`DependencyGraph`] scans every text attachment in an item tree for
//! directive references, resolves them against the store and annotates the
//! tree:
//!
//! - each referencing record gets a "Dependencies" node listing the primary
//!   files it references (without repeats)
//! - an "Unused Components" branch lists, per referenceable entity type,
//!   the primary files no resolved reference points at
//!
//! All usage state lives in the [`GraphReport`] of one build.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use portal_liquid::{LiquidTokenizer, Reference, ReferenceScanner, Tokenizer, unquote};
use serde::Serialize;

use crate::entity::EntityType;
use crate::item::{DEPENDENCIES_LABEL, Item, ItemKind, UNUSED_LABEL, file_label};
use crate::record::Record;
use crate::store::ContentStore;

/// Directive names with an explicit target, tried before the template
/// fallback.
const DIRECTIVE_TARGETS: &[(&str, EntityType)] = &[
    ("snippet", EntityType::Snippet),
    ("snippets", EntityType::Snippet),
    ("entityform", EntityType::BasicForm),
    ("entity_form", EntityType::BasicForm),
    ("entitylist", EntityType::List),
    ("entity_list", EntityType::List),
    ("webform", EntityType::AdvancedForm),
    ("include", EntityType::Template),
    ("extends", EntityType::Template),
];

/// Parameters whose value is a record identity.
const ID_PARAMETERS: &[&str] = &["id"];

/// Parameters whose value is a record label.
const LABEL_PARAMETERS: &[&str] = &["name", "key"];

/// How a reference selects its target record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Lookup<'a> {
    Identity(&'a str),
    Label(&'a str),
    /// A value that can never match (numeric ids).
    Unmatchable,
}

/// A reference that matched no record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UnresolvedReference {
    /// File the reference was found in.
    pub source: PathBuf,
    pub directive: String,
    pub parameter: Option<String>,
    pub value: String,
}

/// Output of one graph build.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GraphReport {
    /// The annotated tree.
    pub tree: Item,
    /// Referenced primary files per entity type.
    pub used: BTreeMap<EntityType, BTreeSet<PathBuf>>,
    /// Unreferenced primary files per referenceable entity type.
    pub unused: BTreeMap<EntityType, Vec<PathBuf>>,
    /// References to explicitly targeted types that matched nothing.
    pub unresolved: Vec<UnresolvedReference>,
}

/// Builds dependency annotations over a store snapshot.
pub struct DependencyGraph<'s, T: Tokenizer = LiquidTokenizer> {
    store: &'s ContentStore,
    scanner: ReferenceScanner<T>,
}

impl<'s> DependencyGraph<'s> {
    #[must_use]
    pub fn new(store: &'s ContentStore) -> Self {
        Self::with_scanner(store, ReferenceScanner::new())
    }
}

impl<'s, T: Tokenizer> DependencyGraph<'s, T> {
    #[must_use]
    pub fn with_scanner(store: &'s ContentStore, scanner: ReferenceScanner<T>) -> Self {
        Self { store, scanner }
    }

    /// Annotate `tree` and compute the used and unused sets.
    ///
    /// Existing "Dependencies" and "Unused Components" nodes are replaced, so
    /// building twice over an unchanged store gives the same report.
    #[must_use]
    pub fn build(&self, mut tree: Item) -> GraphReport {
        strip_annotations(&mut tree);

        let mut state = BuildState::default();
        self.annotate(&mut tree, &mut state);

        let unused = self.unused(&state.used);
        tree.children.push(unused_branch(&unused));

        tracing::debug!(
            used = state.used.values().map(BTreeSet::len).sum::<usize>(),
            unused = unused.values().map(Vec::len).sum::<usize>(),
            unresolved = state.unresolved.len(),
            "Dependency graph built"
        );

        GraphReport {
            tree,
            used: state.used,
            unused,
            unresolved: state.unresolved,
        }
    }

    fn annotate(&self, item: &mut Item, state: &mut BuildState) {
        for child in &mut item.children {
            self.annotate(child, state);
        }

        if !matches!(item.kind, ItemKind::Record(_)) {
            return;
        }

        let mut dependencies = Item::new(ItemKind::Dependencies, DEPENDENCIES_LABEL, &item.path);
        for file in item.children.iter().filter(|c| c.is_file) {
            let Some(content) = file.content.as_deref() else {
                continue;
            };
            for reference in self.scanner.scan(content) {
                match self.resolve(&reference) {
                    Resolution::Found(entity, record) => {
                        let Some(primary) = record.primary_file() else {
                            continue;
                        };
                        dependencies.push_child(Item::new(
                            ItemKind::File(entity),
                            file_label(&primary.path),
                            &primary.path,
                        ));
                        state
                            .used
                            .entry(entity)
                            .or_default()
                            .insert(primary.path.clone());
                    }
                    Resolution::Unresolved => {
                        tracing::trace!(
                            source = %file.path.display(),
                            directive = reference.directive,
                            value = reference.value,
                            "Unresolved reference"
                        );
                        state.unresolved.push(UnresolvedReference {
                            source: file.path.clone(),
                            directive: reference.directive.to_owned(),
                            parameter: reference.parameter.map(str::to_owned),
                            value: reference.value.to_owned(),
                        });
                    }
                    Resolution::Skipped => {}
                }
            }
        }

        if !dependencies.children.is_empty() {
            item.children.push(dependencies);
        }
    }

    fn resolve(&self, reference: &Reference<'_>) -> Resolution<'s> {
        let target = DIRECTIVE_TARGETS
            .iter()
            .find(|(name, _)| *name == reference.directive)
            .map(|&(_, entity)| entity);

        let Some(entity) = target else {
            // Any other tag may be a custom template tag named after the template
            return self
                .find(EntityType::Template, Lookup::Label(reference.directive))
                .map_or(Resolution::Skipped, |r| {
                    Resolution::Found(EntityType::Template, r)
                });
        };

        let Some(selector) = lookup(reference) else {
            return Resolution::Skipped;
        };
        self.find(entity, selector)
            .map_or(Resolution::Unresolved, |r| Resolution::Found(entity, r))
    }

    fn find(&self, entity: EntityType, lookup: Lookup<'_>) -> Option<&'s Record> {
        self.store
            .get_collection(entity)
            .iter()
            .find(|record| match lookup {
                Lookup::Identity(id) => record
                    .identity_string()
                    .is_some_and(|own| own.eq_ignore_ascii_case(id)),
                Lookup::Label(label) => record.label().is_some_and(|own| normalize(own) == label),
                Lookup::Unmatchable => false,
            })
    }

    fn unused(
        &self,
        used: &BTreeMap<EntityType, BTreeSet<PathBuf>>,
    ) -> BTreeMap<EntityType, Vec<PathBuf>> {
        EntityType::REFERENCEABLE
            .into_iter()
            .map(|entity| {
                let used = used.get(&entity);
                let files = self
                    .store
                    .get_collection(entity)
                    .iter()
                    .filter_map(Record::primary_file)
                    .filter(|f| !used.is_some_and(|u| u.contains(&f.path)))
                    .map(|f| f.path.clone())
                    .collect();
                (entity, files)
            })
            .collect()
    }
}

enum Resolution<'s> {
    Found(EntityType, &'s Record),
    Unresolved,
    /// Not a record reference (unknown parameter, or fallback miss).
    Skipped,
}

#[derive(Default)]
struct BuildState {
    used: BTreeMap<EntityType, BTreeSet<PathBuf>>,
    unresolved: Vec<UnresolvedReference>,
}

/// Lookup selected by a reference's parameter.
///
/// Numeric ids are not record identities and never match. `None` means the
/// parameter does not select a record at all.
fn lookup<'a>(reference: &Reference<'a>) -> Option<Lookup<'a>> {
    let value = normalize(reference.value);
    match reference.parameter {
        Some(p) if ID_PARAMETERS.contains(&p) => {
            let numeric = !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit());
            Some(if numeric {
                Lookup::Unmatchable
            } else {
                Lookup::Identity(value)
            })
        }
        Some(p) if LABEL_PARAMETERS.contains(&p) => Some(Lookup::Label(value)),
        Some(_) => None,
        None => Some(Lookup::Label(value)),
    }
}

/// Quote and whitespace normalization shared by both sides of a lookup.
fn normalize(value: &str) -> &str {
    unquote(value.trim()).trim()
}

/// Remove annotations left by a previous build.
fn strip_annotations(item: &mut Item) {
    item.children
        .retain(|c| !matches!(c.kind, ItemKind::Dependencies | ItemKind::Unused));
    for child in &mut item.children {
        strip_annotations(child);
    }
}

fn unused_branch(unused: &BTreeMap<EntityType, Vec<PathBuf>>) -> Item {
    let groups = EntityType::REFERENCEABLE
        .into_iter()
        .filter_map(|entity| {
            let files = unused.get(&entity).filter(|f| !f.is_empty())?;
            let children = files
                .iter()
                .map(|path| Item::new(ItemKind::File(entity), file_label(path), path))
                .collect();
            Some(
                Item::new(ItemKind::UnusedGroup(entity), entity.name(), entity.source_path())
                    .with_children(children),
            )
        })
        .collect();

    Item::new(ItemKind::Unused, UNUSED_LABEL, "").with_children(groups)
}
