//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (poll interval > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: EnforcerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::EnforcerConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("store.path must not be empty")]
    EmptyStorePath,

    #[error("store.poll_interval_secs must be greater than zero")]
    ZeroPollInterval,

    #[error("interception.resource_types must not be empty")]
    NoResourceTypes,

    #[error("observability.log_level {0:?} is not one of trace, debug, info, warn, error")]
    UnknownLogLevel(String),

    #[error("observability.metrics_address {0:?} is not a socket address")]
    InvalidMetricsAddress(String),
}

pub fn validate_config(config: &EnforcerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.store.path.trim().is_empty() {
        errors.push(ValidationError::EmptyStorePath);
    }
    if config.store.poll_interval_secs == 0 {
        errors.push(ValidationError::ZeroPollInterval);
    }
    if config.interception.resource_types.is_empty() {
        errors.push(ValidationError::NoResourceTypes);
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::UnknownLogLevel(config.observability.log_level.clone()));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
