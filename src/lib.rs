//! Query parameter enforcer.
//!
//! Keeps a single host network interceptor in sync with persisted
//! configuration and, for every matching request, redirects to a URL whose
//! query parameters carry the configured values.

pub mod config;
pub mod intercept;
pub mod lifecycle;
pub mod observability;
pub mod reactor;
pub mod redirect;
pub mod routing;
pub mod rules;
pub mod store;

pub use config::EnforcerConfig;
pub use lifecycle::{ActiveConfiguration, Enforcer, LifecycleManager};
pub use reactor::ConfigReactor;
pub use redirect::{decide, Decision};
pub use routing::{normalize, MatchPattern};
