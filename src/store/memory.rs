//! In-memory configuration store.

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::store::{
    ConfigStore, StorageArea, StoreChange, StoreError, StoreValues, CHANGE_CHANNEL_CAPACITY,
};

/// A thread-safe in-memory store with change notifications.
pub struct MemoryStore {
    entries: DashMap<String, serde_json::Value>,
    area: StorageArea,
    changes: broadcast::Sender<StoreChange>,
}

impl MemoryStore {
    pub fn new(area: StorageArea) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            entries: DashMap::new(),
            area,
            changes,
        }
    }

    /// Create a store pre-populated with `values`, without emitting events.
    pub fn with_values(area: StorageArea, values: StoreValues) -> Self {
        let store = Self::new(area);
        for (k, v) in values {
            store.entries.insert(k, v);
        }
        store
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn notify(&self, changed_keys: Vec<String>) {
        if changed_keys.is_empty() {
            return;
        }
        tracing::trace!(keys = ?changed_keys, "Memory store changed");
        // No subscribers is fine.
        let _ = self.changes.send(StoreChange {
            changed_keys,
            area: self.area,
        });
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(StorageArea::Local)
    }
}

#[async_trait]
impl ConfigStore for MemoryStore {
    async fn get(&self, keys: &[&str]) -> Result<StoreValues, StoreError> {
        Ok(keys
            .iter()
            .filter_map(|k| self.entries.get(*k).map(|v| (k.to_string(), v.value().clone())))
            .collect())
    }

    async fn set(&self, values: StoreValues) -> Result<(), StoreError> {
        let mut changed = Vec::new();
        for (k, v) in values {
            let previous = self.entries.insert(k.clone(), v.clone());
            if previous.as_ref() != Some(&v) {
                changed.push(k);
            }
        }
        self.notify(changed);
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), StoreError> {
        let changed = keys
            .iter()
            .filter_map(|k| self.entries.remove(*k).map(|(k, _)| k))
            .collect();
        self.notify(changed);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }
}
