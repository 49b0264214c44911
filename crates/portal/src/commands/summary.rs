//! `portal summary` command implementation.

use clap::Args;
use portal_config::CliSettings;
use portal_model::ContentStore;
use portal_storage_fs::FsStorage;

use super::SiteArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the summary command.
#[derive(Args)]
pub(crate) struct SummaryArgs {
    #[command(flatten)]
    pub site: SiteArgs,
}

impl SummaryArgs {
    /// Build the store and print record counts per collection.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.site.load_config(CliSettings::default())?;

        let storage = FsStorage::new(config.site_resolved.source_dir.clone());
        let build = ContentStore::build(&storage)?;
        let store = &build.store;

        let site = store.site();
        output.highlight(&format!(
            "{} ({})",
            site.name().unwrap_or("Site"),
            config.site_resolved.source_dir.display()
        ));
        output.separator();

        for (entity, records) in store.collections() {
            let line = format!("{:<16}{:>6}", entity.name(), records.len());
            if store.degraded(entity).is_some() {
                output.data_dim(&line);
            } else {
                output.data(&line);
            }
        }
        output.separator();
        output.data(&format!("{:<16}{:>6}", "Total", store.record_count()));

        for failure in &build.failures {
            output.warning(&format!(
                "{} could not be loaded: {}",
                failure.entity, failure.error
            ));
        }

        Ok(())
    }
}
