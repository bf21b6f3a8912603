//! Configuration loading from disk.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::EnforcerConfig;
use crate::config::validation::{validate_config, ValidationError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Read, parse and validate the TOML file at `path`.
pub fn load_config(path: &Path) -> Result<EnforcerConfig, ConfigError> {
    let config: EnforcerConfig = toml::from_str(&fs::read_to_string(path)?)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// `path` when given, otherwise the built-in defaults. Both are validated.
pub fn load_or_default(path: Option<&Path>) -> Result<EnforcerConfig, ConfigError> {
    let Some(path) = path else {
        let config = EnforcerConfig::default();
        validate_config(&config).map_err(ConfigError::Validation)?;
        return Ok(config);
    };
    load_config(path)
}
