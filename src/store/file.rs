//! JSON file backed configuration store.
//!
//! # Responsibilities
//! - Persist the store as one JSON object on disk
//! - Read-merge-write on every `set`/`remove`, replaced atomically via rename
//! - Keep the last known snapshot so external edits can be diffed (watcher.rs)
//!
//! # Design Decisions
//! - A missing file is an empty store, not an error
//! - Snapshot is updated under the same lock as the write so the watcher
//!   never reports our own writes as external changes

use async_trait::async_trait;
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

use crate::store::{
    changed_keys, ConfigStore, StorageArea, StoreChange, StoreError, StoreValues,
    CHANGE_CHANNEL_CAPACITY,
};

/// State shared between the store and its watcher.
pub(crate) struct FileState {
    pub(crate) path: PathBuf,
    pub(crate) area: StorageArea,
    pub(crate) snapshot: Mutex<StoreValues>,
    pub(crate) changes: broadcast::Sender<StoreChange>,
}

impl FileState {
    /// Replace the snapshot with `next` and broadcast the keys that differ.
    pub(crate) fn publish(&self, snapshot: &mut StoreValues, next: StoreValues) {
        let keys = changed_keys(snapshot, &next);
        *snapshot = next;
        if keys.is_empty() {
            return;
        }
        tracing::debug!(path = ?self.path, keys = ?keys, "Store file changed");
        let _ = self.changes.send(StoreChange {
            changed_keys: keys,
            area: self.area,
        });
    }
}

/// A configuration store persisted as a JSON object file.
#[derive(Clone)]
pub struct FileStore {
    pub(crate) state: Arc<FileState>,
}

impl FileStore {
    /// Open the store at `path`, loading its current contents.
    pub fn open(path: &Path, area: StorageArea) -> Result<Self, StoreError> {
        let snapshot = read_file(path)?;
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);

        tracing::info!(path = ?path, keys = snapshot.len(), "Opened store file");

        Ok(Self {
            state: Arc::new(FileState {
                path: path.to_path_buf(),
                area,
                snapshot: Mutex::new(snapshot),
                changes,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.state.path
    }

    fn modify<F>(&self, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut StoreValues),
    {
        let mut snapshot = self
            .state
            .snapshot
            .lock()
            .map_err(|_| StoreError::Unavailable("store snapshot lock poisoned".into()))?;

        // Start from disk so edits made by other processes are not lost.
        let mut next = read_file(&self.state.path)?;
        f(&mut next);
        write_file(&self.state.path, &next)?;
        self.state.publish(&mut snapshot, next);
        Ok(())
    }
}

#[async_trait]
impl ConfigStore for FileStore {
    async fn get(&self, keys: &[&str]) -> Result<StoreValues, StoreError> {
        let contents = match tokio::fs::read_to_string(&self.state.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(StoreValues::new()),
            Err(e) => return Err(e.into()),
        };
        let mut all = parse(&contents)?;
        Ok(keys
            .iter()
            .filter_map(|k| all.remove(*k).map(|v| (k.to_string(), v)))
            .collect())
    }

    async fn set(&self, values: StoreValues) -> Result<(), StoreError> {
        self.modify(|current| {
            for (k, v) in values {
                current.insert(k, v);
            }
        })
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), StoreError> {
        self.modify(|current| {
            for k in keys {
                current.remove(*k);
            }
        })
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.state.changes.subscribe()
    }
}

pub(crate) fn read_file(path: &Path) -> Result<StoreValues, StoreError> {
    match fs::read_to_string(path) {
        Ok(contents) => parse(&contents),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(StoreValues::new()),
        Err(e) => Err(e.into()),
    }
}

fn parse(contents: &str) -> Result<StoreValues, StoreError> {
    if contents.trim().is_empty() {
        return Ok(StoreValues::new());
    }
    match serde_json::from_str::<Value>(contents)? {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::NotAnObject),
    }
}

fn write_file(path: &Path, values: &StoreValues) -> Result<(), StoreError> {
    let body = serde_json::to_string_pretty(values)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, body)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
