//! Startup orchestration.
//!
//! # Responsibilities
//! - Open the store and start its watcher
//! - Create the in-process host and the lifecycle manager
//! - Run the initial sync, then spawn the reactor
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Must run inside a tokio runtime

use notify::RecommendedWatcher;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::config::EnforcerConfig;
use crate::intercept::LocalInterceptor;
use crate::lifecycle::manager::LifecycleManager;
use crate::lifecycle::shutdown::Shutdown;
use crate::observability::metrics;
use crate::reactor::ConfigReactor;
use crate::store::{FileStore, StoreError, StoreWatcher};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to start store watcher: {0}")]
    Watch(#[from] notify::Error),

    #[error("failed to start metrics endpoint: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("invalid metrics address {0:?}")]
    MetricsAddress(String),
}

/// A running enforcer: store, host, and the reactor task following the store.
pub struct Enforcer {
    pub store: Arc<FileStore>,
    pub host: Arc<LocalInterceptor>,
    shutdown: Arc<Shutdown>,
    reactor: JoinHandle<LifecycleManager<LocalInterceptor>>,
    _watcher: Option<RecommendedWatcher>,
}

impl Enforcer {
    /// Wire everything up from `config`, sync once, and spawn the reactor.
    ///
    /// The interceptor reflects the persisted configuration by the time
    /// this returns.
    pub async fn start(config: &EnforcerConfig) -> Result<Self, StartupError> {
        if config.observability.metrics_enabled {
            let addr = config
                .observability
                .metrics_address
                .parse()
                .map_err(|_| StartupError::MetricsAddress(config.observability.metrics_address.clone()))?;
            metrics::init_metrics(addr)?;
        }

        let store = Arc::new(FileStore::open(
            Path::new(&config.store.path),
            config.interception.area,
        )?);

        let watcher = if config.store.watch {
            let interval = Duration::from_secs(config.store.poll_interval_secs);
            Some(StoreWatcher::new(&store, interval).run()?)
        } else {
            None
        };

        let host = Arc::new(LocalInterceptor::new());
        let manager = LifecycleManager::new(host.clone(), config.interception.resource_types.clone());
        let mut reactor = ConfigReactor::new(store.clone(), manager, config.interception.area);
        reactor.sync_logged().await;

        let shutdown = Arc::new(Shutdown::new());
        let reactor = tokio::spawn(reactor.run(shutdown.subscribe()));

        tracing::info!(
            store = %config.store.path,
            watch = config.store.watch,
            resource_types = ?config.interception.resource_types,
            "Enforcer started"
        );

        Ok(Self {
            store,
            host,
            shutdown,
            reactor,
            _watcher: watcher,
        })
    }

    pub fn shutdown_handle(&self) -> Arc<Shutdown> {
        self.shutdown.clone()
    }

    /// Stop the reactor and wait for it to tear the interceptor down.
    pub async fn stop(self) {
        self.shutdown.trigger();
        if let Err(e) = self.reactor.await {
            tracing::error!(error = %e, "Reactor task failed");
        }
        tracing::info!("Enforcer stopped");
    }
}
