//! Configuration schema definitions.
//!
//! This module defines the process-level configuration for the enforcer.
//! All types derive Serde traits for deserialization from TOML.

use serde::{Deserialize, Serialize};

use crate::intercept::ResourceType;
use crate::store::StorageArea;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct EnforcerConfig {
    /// Where persisted rules live.
    pub store: StoreConfig,

    /// What the interceptor subscribes to.
    pub interception: InterceptionConfig,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,
}

/// Store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path of the JSON store file.
    pub path: String,

    /// Pick up edits made by other processes.
    pub watch: bool,

    /// Poll interval for the file watcher backend, in seconds.
    pub poll_interval_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: "query-enforcer.json".to_string(),
            watch: true,
            poll_interval_secs: 2,
        }
    }
}

/// Interception configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InterceptionConfig {
    /// Request types the interceptor observes.
    pub resource_types: Vec<ResourceType>,

    /// Storage area whose changes the reactor follows.
    pub area: StorageArea,
}

impl Default for InterceptionConfig {
    fn default() -> Self {
        Self {
            resource_types: ResourceType::DEFAULT_SET.to_vec(),
            area: StorageArea::Local,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_toml() {
        let config: EnforcerConfig = toml::from_str("").unwrap();
        assert_eq!(config.store.path, "query-enforcer.json");
        assert_eq!(config.interception.resource_types.len(), 4);
        assert_eq!(config.interception.area, StorageArea::Local);
        assert!(!config.observability.metrics_enabled);
    }

    #[test]
    fn test_partial_toml() {
        let config: EnforcerConfig = toml::from_str(
            r#"
            [store]
            path = "/tmp/rules.json"

            [interception]
            resource_types = ["main_frame"]
            area = "sync"
            "#,
        )
        .unwrap();
        assert_eq!(config.store.path, "/tmp/rules.json");
        assert!(config.store.watch);
        assert_eq!(config.interception.resource_types, vec![ResourceType::MainFrame]);
        assert_eq!(config.interception.area, StorageArea::Sync);
    }
}
