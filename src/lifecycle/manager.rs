//! Interceptor lifecycle state machine.
//!
//! # States
//! - Unregistered: no callback with the host (initial)
//! - Registered: exactly one callback, built from the cached configuration
//!
//! # State Transitions
//! ```text
//! Unregistered → Registered:  pattern present
//! Registered   → Unregistered: pattern gone, or just before re-registration
//! Registered   → Registered:  pattern or rule signature changed
//! anything else:               no-op
//! ```
//!
//! # Design Decisions
//! - The callback captures an immutable rule snapshot; changes re-register
//!   instead of mutating what a live callback sees
//! - Deregistering with nothing registered is a no-op
//! - The cache only records snapshots the host accepted

use std::sync::Arc;

use crate::intercept::{
    BlockingResponse, HostError, InterceptCallback, InterceptionHost, ListenerHandle,
    RequestDetails, RequestFilter, ResourceType,
};
use crate::lifecycle::active::ActiveConfiguration;
use crate::observability::metrics;
use crate::redirect::{decide, Decision};
use crate::rules::{ConfigurationSignature, EnabledRules};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListenerState {
    Unregistered,
    Registered(ListenerHandle),
}

/// What `apply` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Nothing relevant changed.
    Unchanged,
    Registered,
    Reregistered,
    Deregistered,
}

/// Owns the single host registration and the configuration it was built from.
pub struct LifecycleManager<H: InterceptionHost> {
    host: Arc<H>,
    resource_types: Vec<ResourceType>,
    active: ActiveConfiguration,
    signature: ConfigurationSignature,
    state: ListenerState,
}

impl<H: InterceptionHost> LifecycleManager<H> {
    pub fn new(host: Arc<H>, resource_types: Vec<ResourceType>) -> Self {
        Self {
            host,
            resource_types,
            active: ActiveConfiguration::default(),
            signature: ConfigurationSignature::default(),
            state: ListenerState::Unregistered,
        }
    }

    /// The last configuration the host accepted.
    pub fn active(&self) -> &ActiveConfiguration {
        &self.active
    }

    pub fn is_registered(&self) -> bool {
        matches!(self.state, ListenerState::Registered(_))
    }

    /// Bring the host registration in line with `next`.
    ///
    /// On `Err` the manager is left unregistered with an empty cache, so
    /// the next call retries.
    pub fn apply(&mut self, next: ActiveConfiguration) -> Result<ApplyOutcome, HostError> {
        let signature = next.signature();
        let unchanged = next.pattern == self.active.pattern && signature == self.signature;
        if unchanged && self.is_registered() == next.pattern.is_some() {
            tracing::trace!("Configuration unchanged, keeping current interceptor");
            return Ok(ApplyOutcome::Unchanged);
        }

        let was_registered = self.deregister();

        let Some(pattern) = next.pattern.clone() else {
            self.active = next;
            self.signature = signature;
            if was_registered {
                tracing::info!("Target cleared, interceptor removed");
                return Ok(ApplyOutcome::Deregistered);
            }
            return Ok(ApplyOutcome::Unchanged);
        };

        // The signature is order-blind, so a reorder of duplicates alone
        // does not get here; the installed winner stays until a real change.
        let duplicates = next.enabled_rules.duplicate_names();
        if !duplicates.is_empty() {
            tracing::warn!(params = ?duplicates, "Several enabled rules share a parameter; the last one wins");
        }

        let filter = RequestFilter {
            urls: vec![pattern.clone()],
            types: self.resource_types.clone(),
        };
        let callback = interceptor(next.enabled_rules.clone());

        match self.host.register(callback, filter) {
            Ok(handle) => {
                tracing::info!(
                    pattern = %pattern,
                    listener = %handle,
                    enabled_rules = next.enabled_rules.len(),
                    "Interceptor registered"
                );
                metrics::record_registration();
                metrics::record_enabled_rules(next.enabled_rules.len());
                self.state = ListenerState::Registered(handle);
                self.active = next;
                self.signature = signature;
                Ok(if was_registered {
                    ApplyOutcome::Reregistered
                } else {
                    ApplyOutcome::Registered
                })
            }
            Err(e) => {
                tracing::warn!(pattern = %pattern, error = %e, "Host rejected interceptor");
                self.active = ActiveConfiguration::default();
                self.signature = ConfigurationSignature::default();
                Err(e)
            }
        }
    }

    /// Remove the registration and forget the cached configuration.
    pub fn teardown(&mut self) {
        if self.deregister() {
            tracing::info!("Interceptor torn down");
        }
        self.active = ActiveConfiguration::default();
        self.signature = ConfigurationSignature::default();
    }

    fn deregister(&mut self) -> bool {
        let ListenerState::Registered(handle) = self.state else {
            return false;
        };
        self.state = ListenerState::Unregistered;
        if !self.host.deregister(handle) {
            tracing::debug!(listener = %handle, "Listener was already gone");
        }
        metrics::record_deregistration();
        true
    }
}

/// Build the per-request callback over an immutable rule snapshot.
fn interceptor(rules: EnabledRules) -> InterceptCallback {
    Arc::new(move |details: &RequestDetails| {
        let decision = decide(&details.url, &rules);
        metrics::record_decision(decision.label());
        match decision {
            Decision::Redirect { target } => {
                tracing::debug!(request_id = details.request_id, target = %target, "Redirecting request");
                BlockingResponse::redirect(target)
            }
            Decision::PassThrough { reason } => {
                tracing::trace!(request_id = details.request_id, reason = ?reason, "Passing request through");
                BlockingResponse::pass()
            }
        }
    })
}
