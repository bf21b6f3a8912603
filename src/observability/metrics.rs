//! Metrics collection and exposition.
//!
//! # Metrics
//! - `query_enforcer_decisions_total` (counter): redirect decisions by outcome
//! - `query_enforcer_registrations_total` (counter): interceptors registered
//! - `query_enforcer_deregistrations_total` (counter): interceptors removed
//! - `query_enforcer_sync_failures_total` (counter): failed reloads by source
//! - `query_enforcer_enabled_rules` (gauge): rules in the live interceptor
//!
//! Without an installed recorder every call is a no-op.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;

/// Install the Prometheus recorder and its scrape endpoint.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_decision(outcome: &'static str) {
    ::metrics::counter!("query_enforcer_decisions_total", "outcome" => outcome).increment(1);
}

pub fn record_registration() {
    ::metrics::counter!("query_enforcer_registrations_total").increment(1);
}

pub fn record_deregistration() {
    ::metrics::counter!("query_enforcer_deregistrations_total").increment(1);
}

pub fn record_sync_failure(source: &'static str) {
    ::metrics::counter!("query_enforcer_sync_failures_total", "source" => source).increment(1);
}

pub fn record_enabled_rules(count: usize) {
    ::metrics::gauge!("query_enforcer_enabled_rules").set(count as f64);
}
