//! CLI command implementations.

pub(crate) mod graph;
pub(crate) mod summary;
pub(crate) mod watch;

use std::path::{Path, PathBuf};

use clap::Args;
use portal_config::{CliSettings, Config};
use portal_model::SITE_FILE;
use portal_storage::Storage;
use portal_storage_fs::FsStorage;

use crate::error::CliError;

pub(crate) use graph::GraphArgs;
pub(crate) use summary::SummaryArgs;
pub(crate) use watch::WatchArgs;

/// Arguments shared by every command that opens a site.
#[derive(Args)]
pub(crate) struct SiteArgs {
    /// Path to configuration file (default: auto-discover portal.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Site source directory (overrides config).
    #[arg(short, long)]
    source_dir: Option<PathBuf>,

    /// Enable verbose output (load and reload timing logs).
    #[arg(short, long)]
    pub verbose: bool,
}

impl SiteArgs {
    /// Load configuration with this command's overrides and check that the
    /// source directory holds a site.
    pub(crate) fn load_config(&self, mut settings: CliSettings) -> Result<Config, CliError> {
        settings.source_dir.clone_from(&self.source_dir);
        let config = Config::load(self.config.as_deref(), Some(&settings))?;

        let root = &config.site_resolved.source_dir;
        require_site(&FsStorage::new(root.clone()), root)?;

        Ok(config)
    }
}

/// Fail unless `storage` has a site file at its root.
fn require_site(storage: &dyn Storage, root: &Path) -> Result<(), CliError> {
    if storage.exists(Path::new(SITE_FILE)) {
        return Ok(());
    }
    Err(CliError::Validation(format!(
        "No {SITE_FILE} found in {}",
        root.display()
    )))
}

#[cfg(test)]
mod tests {
    use portal_storage::MockStorage;

    use super::*;

    #[test]
    fn test_require_site_present() {
        let storage = MockStorage::new().with_file(SITE_FILE, "adx_websiteid: site-1");

        assert!(require_site(&storage, Path::new("site")).is_ok());
    }

    #[test]
    fn test_require_site_missing() {
        let storage = MockStorage::new().with_file("lists/a.list.yml", "adx_entitylistid: a");

        let err = require_site(&storage, Path::new("site")).unwrap_err();

        assert_eq!(err.to_string(), "No website.yml found in site");
    }
}
