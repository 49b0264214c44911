//! Environment variable expansion for configuration strings.

use std::borrow::Cow;
use std::env::VarError;

use shellexpand::LookupError;

use crate::ConfigError;

/// Expand `${VAR}` and `${VAR:-default}` references.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    shellexpand::env(value)
        .map(Cow::into_owned)
        .map_err(|e| lookup_error(field, &e))
}

/// Expand a leading `~` and environment variable references.
pub(crate) fn expand_path(value: &str, field: &str) -> Result<String, ConfigError> {
    shellexpand::full(value)
        .map(Cow::into_owned)
        .map_err(|e| lookup_error(field, &e))
}

fn lookup_error(field: &str, error: &LookupError<VarError>) -> ConfigError {
    ConfigError::EnvVar {
        field: field.to_owned(),
        message: format!("${{{}}} not set", error.var_name),
    }
}
