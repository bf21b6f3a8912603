//! Configuration store subsystem.
//!
//! # Data Flow
//! ```text
//! Writers (rule editor, CLI, other processes)
//!     → ConfigStore::set / remove (whole values per key)
//!     → StoreChange { changed_keys, area } on the broadcast channel
//!     → reactor decides whether the change is relevant
//!
//! Backends:
//!     memory.rs   DashMap, used in tests and embedding
//!     file.rs     JSON object on disk, atomic rename on write
//!     watcher.rs  notify watcher turning external edits into StoreChange
//! ```
//!
//! # Design Decisions
//! - Values are plain JSON; interpretation belongs to the reader
//! - Change events only name keys whose value actually changed
//! - A store never mutates state held by the reactor; it only notifies

pub mod file;
pub mod memory;
pub mod watcher;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::broadcast;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use watcher::StoreWatcher;

/// Store key holding the raw, unnormalized target pattern.
pub const TARGET_URL_KEY: &str = "targetUrl";

/// Store key holding the ordered rule collection.
pub const RULES_KEY: &str = "rules";

/// Capacity of each store's change channel.
pub(crate) const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// A key/value snapshot read from or written to the store.
pub type StoreValues = Map<String, Value>;

/// Errors raised by store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store contents are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store root must be a JSON object")]
    NotAnObject,

    #[error("store watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Storage area a change originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageArea {
    #[default]
    Local,
    Sync,
    Managed,
}

/// Notification that one or more keys changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreChange {
    pub changed_keys: Vec<String>,
    pub area: StorageArea,
}

impl StoreChange {
    /// Returns true if any of `keys` changed.
    pub fn touches(&self, keys: &[&str]) -> bool {
        self.changed_keys.iter().any(|k| keys.contains(&k.as_str()))
    }
}

/// Asynchronous key/value configuration store.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Read the given keys. Missing keys are absent from the result.
    async fn get(&self, keys: &[&str]) -> Result<StoreValues, StoreError>;

    /// Write every entry of `values`, replacing existing values whole.
    async fn set(&self, values: StoreValues) -> Result<(), StoreError>;

    /// Delete the given keys. Deleting a missing key is not an error.
    async fn remove(&self, keys: &[&str]) -> Result<(), StoreError>;

    /// Subscribe to change notifications.
    fn subscribe(&self) -> broadcast::Receiver<StoreChange>;
}

/// Keys whose value differs between `before` and `after`.
pub(crate) fn changed_keys(before: &StoreValues, after: &StoreValues) -> Vec<String> {
    let mut keys: Vec<String> = before
        .iter()
        .filter(|(k, v)| after.get(*k) != Some(*v))
        .map(|(k, _)| k.clone())
        .collect();
    keys.extend(
        after
            .keys()
            .filter(|k| !before.contains_key(*k))
            .cloned(),
    );
    keys.sort();
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn values(v: Value) -> StoreValues {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_changed_keys() {
        let before = values(json!({"a": 1, "b": 2, "c": 3}));
        let after = values(json!({"a": 1, "b": 5, "d": 4}));
        assert_eq!(changed_keys(&before, &after), vec!["b", "c", "d"]);
        assert!(changed_keys(&before, &before).is_empty());
    }

    #[test]
    fn test_change_touches() {
        let change = StoreChange {
            changed_keys: vec!["theme".into(), RULES_KEY.into()],
            area: StorageArea::Local,
        };
        assert!(change.touches(&[TARGET_URL_KEY, RULES_KEY]));
        assert!(!change.touches(&[TARGET_URL_KEY]));
    }
}
