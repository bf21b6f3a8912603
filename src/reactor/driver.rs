//! The configuration change reactor.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::intercept::{HostError, InterceptionHost};
use crate::lifecycle::{ApplyOutcome, LifecycleManager};
use crate::observability::metrics;
use crate::reactor::snapshot::StoredSnapshot;
use crate::store::{ConfigStore, StorageArea, StoreChange, StoreError, RULES_KEY, TARGET_URL_KEY};

/// Keys whose changes trigger a reload.
pub const WATCHED_KEYS: [&str; 2] = [TARGET_URL_KEY, RULES_KEY];

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to read configuration: {0}")]
    Store(#[from] StoreError),

    #[error("failed to install interceptor: {0}")]
    Host(#[from] HostError),
}

/// Reloads persisted configuration on relevant changes and hands it to the
/// lifecycle manager.
///
/// Processes one event at a time, so a reload (including deregister and
/// register) always finishes before the next event is looked at.
pub struct ConfigReactor<H: InterceptionHost> {
    store: Arc<dyn ConfigStore>,
    manager: LifecycleManager<H>,
    area: StorageArea,
}

impl<H: InterceptionHost> ConfigReactor<H> {
    pub fn new(store: Arc<dyn ConfigStore>, manager: LifecycleManager<H>, area: StorageArea) -> Self {
        Self {
            store,
            manager,
            area,
        }
    }

    pub fn manager(&self) -> &LifecycleManager<H> {
        &self.manager
    }

    /// Whether `change` should trigger a reload.
    pub fn is_relevant(&self, change: &StoreChange) -> bool {
        change.area == self.area && change.touches(&WATCHED_KEYS)
    }

    /// Reload both keys in full and apply them.
    pub async fn sync(&mut self) -> Result<ApplyOutcome, SyncError> {
        let values = self.store.get(&WATCHED_KEYS).await?;
        let snapshot = StoredSnapshot::from_values(&values);
        if snapshot.skipped_rules > 0 {
            tracing::warn!(skipped = snapshot.skipped_rules, "Ignoring unreadable stored rules");
        }

        let active = snapshot.to_active();
        if active.pattern.is_none() && !snapshot.raw_target.trim().is_empty() {
            tracing::debug!(raw = %snapshot.raw_target, "Target did not normalize to a pattern");
        }
        Ok(self.manager.apply(active)?)
    }

    /// Sync, logging failures instead of returning them.
    ///
    /// A failed store read keeps the current interceptor as it is.
    pub async fn sync_logged(&mut self) -> Option<ApplyOutcome> {
        match self.sync().await {
            Ok(outcome) => {
                tracing::debug!(outcome = ?outcome, "Configuration synced");
                Some(outcome)
            }
            Err(SyncError::Store(e)) => {
                metrics::record_sync_failure("store");
                tracing::warn!(error = %e, "Store read failed. Keeping current interceptor.");
                None
            }
            Err(SyncError::Host(e)) => {
                metrics::record_sync_failure("host");
                tracing::warn!(error = %e, "Interceptor not installed");
                None
            }
        }
    }

    /// React to one store change. Returns `None` if it was ignored or failed.
    pub async fn handle_change(&mut self, change: &StoreChange) -> Option<ApplyOutcome> {
        if !self.is_relevant(change) {
            tracing::trace!(keys = ?change.changed_keys, area = ?change.area, "Ignoring store change");
            return None;
        }
        self.sync_logged().await
    }

    /// Sync once, then follow store changes until shutdown or until the
    /// store's change stream closes. Tears the interceptor down on exit.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> LifecycleManager<H> {
        // Subscribe before the initial read so no change can slip between them.
        let mut changes = self.store.subscribe();
        self.sync_logged().await;
        tracing::info!(area = ?self.area, "Configuration reactor started");

        loop {
            tokio::select! {
                received = changes.recv() => match received {
                    Ok(change) => {
                        self.handle_change(&change).await;
                    }
                    Err(RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "Missed store changes, resyncing");
                        self.sync_logged().await;
                    }
                    Err(RecvError::Closed) => {
                        tracing::info!("Store change stream closed");
                        break;
                    }
                },
                _ = shutdown.recv() => {
                    tracing::info!("Configuration reactor received shutdown signal, exiting loop");
                    break;
                }
            }
        }

        self.manager.teardown();
        self.manager
    }
}
