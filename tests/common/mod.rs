//! Shared utilities for integration tests.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use query_enforcer::intercept::{LocalInterceptor, RequestDetails, ResourceType};
use query_enforcer::lifecycle::LifecycleManager;
use query_enforcer::reactor::ConfigReactor;
use query_enforcer::store::{
    ConfigStore, MemoryStore, StorageArea, StoreChange, StoreError, StoreValues,
};

/// Build store values from a JSON object literal.
#[allow(dead_code)]
pub fn values(v: Value) -> StoreValues {
    v.as_object().cloned().expect("store values must be a JSON object")
}

/// A stored rule entry in the persisted shape.
#[allow(dead_code)]
pub fn stored_rule(id: &str, name: &str, value: &str, enabled: bool) -> Value {
    json!({ "id": id, "paramName": name, "paramValue": value, "enabled": enabled })
}

/// A local-area memory store holding `target` and `rules`.
#[allow(dead_code)]
pub fn seeded_store(target: &str, rules: Vec<Value>) -> Arc<MemoryStore> {
    Arc::new(MemoryStore::with_values(
        StorageArea::Local,
        values(json!({ "targetUrl": target, "rules": rules })),
    ))
}

/// A main-frame request for `url`.
#[allow(dead_code)]
pub fn request(url: &str) -> RequestDetails {
    RequestDetails {
        request_id: 1,
        url: url.to_string(),
        resource_type: ResourceType::MainFrame,
    }
}

/// Host, store and reactor wired together the way the enforcer does it.
#[allow(dead_code)]
pub fn reactor_for(
    store: Arc<dyn ConfigStore>,
) -> (Arc<LocalInterceptor>, ConfigReactor<LocalInterceptor>) {
    let host = Arc::new(LocalInterceptor::new());
    let manager = LifecycleManager::new(host.clone(), ResourceType::DEFAULT_SET.to_vec());
    let reactor = ConfigReactor::new(store, manager, StorageArea::Local);
    (host, reactor)
}

/// Poll `condition` every few milliseconds until it holds or `timeout` passes.
#[allow(dead_code)]
pub async fn wait_for<F: Fn() -> bool>(condition: F, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// A memory store whose reads can be made to fail on demand.
#[allow(dead_code)]
pub struct FlakyStore {
    inner: MemoryStore,
    fail_reads: AtomicBool,
}

#[allow(dead_code)]
impl FlakyStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            fail_reads: AtomicBool::new(false),
        }
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConfigStore for FlakyStore {
    async fn get(&self, keys: &[&str]) -> Result<StoreValues, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected read failure".into()));
        }
        self.inner.get(keys).await
    }

    async fn set(&self, values: StoreValues) -> Result<(), StoreError> {
        self.inner.set(values).await
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), StoreError> {
        self.inner.remove(keys).await
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.inner.subscribe()
    }
}
