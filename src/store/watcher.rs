//! Store file watcher for edits made outside this process.

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::store::file::{read_file, FileState, FileStore};

/// Watches a [`FileStore`]'s file and republishes external edits as changes.
pub struct StoreWatcher {
    state: Arc<FileState>,
    poll_interval: Duration,
}

impl StoreWatcher {
    pub fn new(store: &FileStore, poll_interval: Duration) -> Self {
        Self {
            state: store.state.clone(),
            poll_interval,
        }
    }

    /// Start watching. The returned watcher must be kept alive.
    ///
    /// The parent directory is watched because atomic writes replace the
    /// file, and because the file may not exist yet.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let state = self.state.clone();
        let file_name = state.path.file_name().map(|n| n.to_os_string());

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let ours = event
                        .paths
                        .iter()
                        .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                    if !ours || event.kind.is_access() {
                        return;
                    }
                    reload(&state);
                }
                Err(e) => tracing::error!("Store watch error: {:?}", e),
            },
            Config::default().with_poll_interval(self.poll_interval),
        )?;

        let dir = match self.state.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => Path::new(".").to_path_buf(),
        };
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.state.path, "Store watcher started");
        Ok(watcher)
    }
}

fn reload(state: &FileState) {
    let Ok(mut snapshot) = state.snapshot.lock() else {
        tracing::error!("Store snapshot lock poisoned, ignoring file event");
        return;
    };
    match read_file(&state.path) {
        Ok(next) => state.publish(&mut snapshot, next),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to reload store file. Keeping last known contents.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ConfigStore, StorageArea};
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_external_edit_is_published() {
        let path = std::env::temp_dir().join(format!("query-enforcer-watch-{}.json", uuid::Uuid::new_v4()));
        let store = FileStore::open(&path, StorageArea::Local).unwrap();
        let mut rx = store.subscribe();
        let _watcher = StoreWatcher::new(&store, Duration::from_millis(100)).run().unwrap();

        std::fs::write(&path, r#"{"targetUrl": "example.com"}"#).unwrap();

        let change = timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no change observed")
            .unwrap();
        assert_eq!(change.changed_keys, vec!["targetUrl".to_string()]);

        std::fs::remove_file(&path).unwrap_or_default();
    }
}
