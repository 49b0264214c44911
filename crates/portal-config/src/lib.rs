//! Configuration management for portal site tooling.
//!
//! Parses `portal.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! `site.source_dir` supports `~` and environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Watch patterns support environment variable expansion only.

mod expand;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override site source directory.
    pub source_dir: Option<PathBuf>,
    /// Override watch debounce in milliseconds.
    pub debounce_ms: Option<u64>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "portal.toml";

const DEFAULT_DEBOUNCE_MS: u64 = 100;
const MAX_DEBOUNCE_MS: u64 = 10_000;

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Site configuration (paths are relative strings from TOML).
    site: SiteConfigRaw,
    /// Change watching configuration.
    pub watch: WatchConfig,

    /// Resolved site configuration (set after loading).
    #[serde(skip)]
    pub site_resolved: SiteConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Raw site configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct SiteConfigRaw {
    source_dir: Option<String>,
}

/// Resolved site configuration with absolute paths.
#[derive(Debug, Default)]
pub struct SiteConfig {
    /// Root of the site tree (the directory holding `website.yml`).
    pub source_dir: PathBuf,
}

/// Change watching configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Whether `watch` is allowed to run.
    pub enabled: bool,
    /// Quiet period before a change is delivered.
    pub debounce_ms: u64,
    /// Glob patterns of files to watch. All files when unset.
    pub patterns: Option<Vec<String>>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            patterns: None,
        }
    }
}

impl WatchConfig {
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`site.source_dir`").
        field: String,
        /// Error message (e.g., "${`SITE_ROOT`} not set").
        message: String,
    },
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `portal.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, and the
    /// result is validated again so overrides obey the same limits.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(source_dir) = &settings.source_dir {
            self.site_resolved.source_dir.clone_from(source_dir);
        }
        if let Some(debounce_ms) = settings.debounce_ms {
            self.watch.debounce_ms = debounce_ms;
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        Self::discover_from(&current)
    }

    fn discover_from(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(CONFIG_FILENAME))
            .find(|candidate| candidate.exists())
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    fn default_with_base(base: &Path) -> Self {
        Self {
            site: SiteConfigRaw::default(),
            watch: WatchConfig::default(),
            site_resolved: SiteConfig {
                source_dir: base.to_path_buf(),
            },
            config_path: None,
        }
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let debounce = self.watch.debounce_ms;
        if debounce == 0 || debounce > MAX_DEBOUNCE_MS {
            return Err(ConfigError::Validation(format!(
                "watch.debounce_ms must be between 1 and {MAX_DEBOUNCE_MS}"
            )));
        }

        if let Some(patterns) = &self.watch.patterns {
            if patterns.is_empty() {
                return Err(ConfigError::Validation(
                    "watch.patterns cannot be an empty list".to_owned(),
                ));
            }
            if patterns.iter().any(String::is_empty) {
                return Err(ConfigError::Validation(
                    "watch.patterns cannot contain empty patterns".to_owned(),
                ));
            }
        }

        Ok(())
    }

    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref source_dir) = self.site.source_dir {
            self.site.source_dir = Some(expand::expand_path(source_dir, "site.source_dir")?);
        }

        if let Some(ref mut patterns) = self.watch.patterns {
            for pattern in patterns.iter_mut() {
                *pattern = expand::expand_env(pattern, "watch.patterns")?;
            }
        }

        Ok(())
    }

    /// Resolve relative paths against the config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        // An absolute source_dir replaces config_dir entirely
        self.site_resolved = SiteConfig {
            source_dir: config_dir.join(self.site.source_dir.as_deref().unwrap_or(".")),
        };
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;

    use super::*;

    fn create_test_dir() -> tempfile::TempDir {
        tempfile::tempdir().unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default_with_base(Path::new("/test"));

        assert_eq!(config.site_resolved.source_dir, PathBuf::from("/test"));
        assert!(config.watch.enabled);
        assert_eq!(config.watch.debounce_ms, 100);
        assert_eq!(config.watch.debounce(), Duration::from_millis(100));
        assert_eq!(config.watch.patterns, None);
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str("").unwrap();

        assert!(config.watch.enabled);
        assert_eq!(config.site.source_dir, None);
    }

    #[test]
    fn test_parse_watch_config() {
        let toml = r#"
[watch]
enabled = false
debounce_ms = 250
patterns = ["**/*.yml", "**/*.html"]
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert!(!config.watch.enabled);
        assert_eq!(config.watch.debounce_ms, 250);
        assert_eq!(
            config.watch.patterns,
            Some(vec!["**/*.yml".to_owned(), "**/*.html".to_owned()])
        );
    }

    #[test]
    fn test_resolve_paths() {
        let toml = r#"
[site]
source_dir = "site"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(
            config.site_resolved.source_dir,
            PathBuf::from("/project/site")
        );
    }

    #[test]
    fn test_resolve_paths_default_is_config_dir() {
        let mut config: Config = toml::from_str("").unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(config.site_resolved.source_dir, PathBuf::from("/project/."));
    }

    #[test]
    fn test_resolve_paths_absolute_source_dir() {
        let toml = r#"
[site]
source_dir = "/srv/site"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(config.site_resolved.source_dir, PathBuf::from("/srv/site"));
    }

    #[test]
    fn test_apply_cli_settings() {
        let mut config = Config::default_with_base(Path::new("/test"));
        let settings = CliSettings {
            source_dir: Some(PathBuf::from("/other")),
            debounce_ms: Some(500),
        };

        config.apply_cli_settings(&settings);

        assert_eq!(config.site_resolved.source_dir, PathBuf::from("/other"));
        assert!(config.watch.enabled);
        assert_eq!(config.watch.debounce_ms, 500);
    }

    #[test]
    fn test_apply_cli_settings_empty() {
        let mut config = Config::default_with_base(Path::new("/test"));

        config.apply_cli_settings(&CliSettings::default());

        assert_eq!(config.site_resolved.source_dir, PathBuf::from("/test"));
        assert_eq!(config.watch.debounce_ms, 100);
    }

    #[test]
    fn test_expand_env_vars_source_dir() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("PORTAL_TEST_SITE", "/sites/contoso");
        }

        let toml = r#"
[site]
source_dir = "${PORTAL_TEST_SITE}/src"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.expand_env_vars().unwrap();

        assert_eq!(
            config.site.source_dir.as_deref(),
            Some("/sites/contoso/src")
        );

        unsafe {
            std::env::remove_var("PORTAL_TEST_SITE");
        }
    }

    #[test]
    fn test_expand_env_vars_missing_required_var() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("MISSING_VAR_PORTAL_CONFIG_TEST");
        }

        let toml = r#"
[watch]
patterns = ["${MISSING_VAR_PORTAL_CONFIG_TEST}/**"]
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        let err = config.expand_env_vars().unwrap_err();

        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert!(err.to_string().contains("MISSING_VAR_PORTAL_CONFIG_TEST"));
        assert!(err.to_string().contains("watch.patterns"));
    }

    #[test]
    fn test_validate_default_config_passes() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_debounce_zero() {
        let mut config = Config::default();
        config.watch.debounce_ms = 0;

        let err = config.validate().unwrap_err();

        assert!(err.to_string().contains("watch.debounce_ms"));
    }

    #[test]
    fn test_validate_debounce_too_high() {
        let mut config = Config::default();
        config.watch.debounce_ms = 10_001;

        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_debounce_upper_bound_inclusive() {
        let mut config = Config::default();
        config.watch.debounce_ms = 10_000;

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_patterns() {
        let mut config = Config::default();
        config.watch.patterns = Some(Vec::new());

        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_load_explicit_path_not_found() {
        let dir = create_test_dir();
        let path = dir.path().join("missing.toml");

        let err = Config::load(Some(&path), None).unwrap_err();

        assert!(matches!(err, ConfigError::NotFound(p) if p == path));
    }

    #[test]
    fn test_load_from_file() {
        let dir = create_test_dir();
        let path = dir.path().join(CONFIG_FILENAME);
        fs::write(
            &path,
            "[site]\nsource_dir = \"src\"\n\n[watch]\ndebounce_ms = 50\n",
        )
        .unwrap();

        let config = Config::load(Some(&path), None).unwrap();

        assert_eq!(config.site_resolved.source_dir, dir.path().join("src"));
        assert_eq!(config.watch.debounce_ms, 50);
        assert_eq!(config.config_path, Some(path));
    }

    #[test]
    fn test_load_rejects_invalid_cli_override() {
        let dir = create_test_dir();
        let path = dir.path().join(CONFIG_FILENAME);
        fs::write(&path, "").unwrap();
        let settings = CliSettings {
            debounce_ms: Some(0),
            ..CliSettings::default()
        };

        let result = Config::load(Some(&path), Some(&settings));

        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_load_parse_error() {
        let dir = create_test_dir();
        let path = dir.path().join(CONFIG_FILENAME);
        fs::write(&path, "[watch\n").unwrap();

        let result = Config::load(Some(&path), None);

        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_discover_from_parent_directory() {
        let dir = create_test_dir();
        fs::write(dir.path().join(CONFIG_FILENAME), "").unwrap();
        let nested = dir.path().join("web-pages/home");
        fs::create_dir_all(&nested).unwrap();

        let found = Config::discover_from(&nested);

        assert_eq!(found, Some(dir.path().join(CONFIG_FILENAME)));
    }
}
