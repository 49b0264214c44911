//! `portal watch` command implementation.

use std::sync::Arc;

use clap::Args;
use portal_config::CliSettings;
use portal_model::{SyncController, SyncOutcome};
use portal_storage::Storage;
use portal_storage_fs::FsStorage;

use super::SiteArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the watch command.
#[derive(Args)]
pub(crate) struct WatchArgs {
    #[command(flatten)]
    pub site: SiteArgs,

    /// Quiet period in milliseconds before a change is applied (overrides config).
    #[arg(long)]
    debounce_ms: Option<u64>,
}

impl WatchArgs {
    /// Build the store and apply every change until interrupted.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let settings = CliSettings {
            debounce_ms: self.debounce_ms,
            ..CliSettings::default()
        };
        let config = self.site.load_config(settings)?;

        if !config.watch.enabled {
            return Err(CliError::Validation(
                "Watching is disabled (watch.enabled = false)".to_owned(),
            ));
        }

        let root = config.site_resolved.source_dir.clone();
        let storage = match &config.watch.patterns {
            Some(patterns) => FsStorage::with_patterns(root, patterns)?,
            None => FsStorage::new(root),
        }
        .with_debounce(config.watch.debounce());
        let storage = Arc::new(storage);

        let shared: Arc<dyn Storage> = Arc::<FsStorage>::clone(&storage);
        let controller = SyncController::new(shared);
        for failure in controller.initialize()? {
            output.warning(&format!(
                "{} could not be loaded: {}",
                failure.entity, failure.error
            ));
        }

        let (events, _handle) = storage.watch()?;
        output.info(&format!(
            "Watching {} (debounce {} ms)",
            storage.root().display(),
            config.watch.debounce_ms
        ));

        controller.run(&events, |path, result| match result {
            Ok(SyncOutcome::Ignored) => {}
            Ok(outcome) => output.success(&format!("{}: {}", path.display(), describe(outcome))),
            Err(e) => output.error(&format!("{}: {e}", path.display())),
        });

        tracing::info!(root = %storage.root().display(), "Stopped watching");
        Ok(())
    }
}

/// Short human description of a sync outcome.
fn describe(outcome: &SyncOutcome) -> String {
    match outcome {
        SyncOutcome::Ignored => "ignored".to_owned(),
        SyncOutcome::SiteUpdated => "site updated".to_owned(),
        SyncOutcome::StoreRebuilt { failures } if failures.is_empty() => {
            "site changed, store rebuilt".to_owned()
        }
        SyncOutcome::StoreRebuilt { failures } => format!(
            "site changed, store rebuilt ({} collections failed)",
            failures.len()
        ),
        SyncOutcome::RecordReplaced { entity, index } => {
            format!("{entity} #{index} reloaded")
        }
        SyncOutcome::CollectionReloaded { entity, len } => {
            format!("{entity} reloaded ({len} records)")
        }
    }
}
