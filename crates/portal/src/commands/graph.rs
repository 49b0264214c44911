//! `portal graph` command implementation.

use clap::Args;
use portal_config::CliSettings;
use portal_model::{ContentStore, DependencyGraph, Item, ItemKind, UNUSED_LABEL, build_item_tree};
use portal_storage_fs::FsStorage;

use super::SiteArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the graph command.
#[derive(Args)]
pub(crate) struct GraphArgs {
    #[command(flatten)]
    pub site: SiteArgs,

    /// Print the tree as JSON.
    #[arg(long)]
    json: bool,

    /// Print only the unused components branch.
    #[arg(long)]
    unused_only: bool,
}

impl GraphArgs {
    /// Build the store, annotate the item tree and print it.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.site.load_config(CliSettings::default())?;

        let storage = FsStorage::new(config.site_resolved.source_dir.clone());
        let build = ContentStore::build(&storage)?;
        for failure in &build.failures {
            output.warning(&format!(
                "{} could not be loaded: {}",
                failure.entity, failure.error
            ));
        }

        let report = DependencyGraph::new(&build.store).build(build_item_tree(&build.store));
        let root = if self.unused_only {
            report.tree.child(UNUSED_LABEL).unwrap_or(&report.tree)
        } else {
            &report.tree
        };

        if self.json {
            output.data(&serde_json::to_string_pretty(root)?);
        } else {
            for (line, is_file) in tree_lines(root) {
                if is_file {
                    output.data_dim(&line);
                } else {
                    output.data(&line);
                }
            }
        }

        for unresolved in &report.unresolved {
            output.warning(&format!(
                "Unresolved {} reference '{}' in {}",
                unresolved.directive,
                unresolved.value,
                unresolved.source.display()
            ));
        }

        Ok(())
    }
}

/// Indented text lines of a tree, each with whether it is a file node.
fn tree_lines(root: &Item) -> Vec<(String, bool)> {
    let mut lines = Vec::new();
    push_lines(root, 0, &mut lines);
    lines
}

fn push_lines(item: &Item, depth: usize, lines: &mut Vec<(String, bool)>) {
    let name = match item.kind {
        ItemKind::Record(_) => &item.title,
        _ => &item.label,
    };
    let mut line = format!("{}{name}", "  ".repeat(depth));
    if let Some(error) = &item.error {
        line.push_str(&format!(" [{error}]"));
    }
    lines.push((line, item.is_file));

    for child in &item.children {
        push_lines(child, depth + 1, lines);
    }
}

#[cfg(test)]
mod tests {
    use portal_model::EntityType;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_tree_lines_indentation() {
        let file = Item::new(
            ItemKind::File(EntityType::Snippet),
            "greeting.contentsnippet.value.html",
            "content-snippets/greeting/greeting.contentsnippet.value.html",
        );
        let record = Item::new(
            ItemKind::Record(EntityType::Snippet),
            "greeting",
            "content-snippets/greeting/greeting",
        )
        .with_title("Snippet: greeting")
        .with_children(vec![file]);
        let category = Item::new(
            ItemKind::Category(EntityType::Snippet),
            "Snippet",
            "content-snippets",
        )
        .with_children(vec![record]);

        let lines = tree_lines(&category);

        assert_eq!(
            lines,
            vec![
                ("Snippet".to_owned(), false),
                ("  Snippet: greeting".to_owned(), false),
                ("    greeting.contentsnippet.value.html".to_owned(), true),
            ]
        );
    }

    #[test]
    fn test_tree_lines_show_errors() {
        let category = Item::new(ItemKind::Category(EntityType::List), "List", "lists")
            .with_error(Some("Failed to parse lists/a.list.yml".to_owned()));

        let lines = tree_lines(&category);

        assert_eq!(lines[0].0, "List [Failed to parse lists/a.list.yml]");
    }
}
