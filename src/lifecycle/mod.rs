//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Interceptor (manager.rs):
//!     ActiveConfiguration → compare with cache → deregister/register
//!
//! Startup (startup.rs):
//!     Open store → Start watcher → Create host + manager → Spawn reactor
//!
//! Shutdown (shutdown.rs, signals.rs):
//!     SIGTERM/SIGINT → broadcast → reactor tears interceptor down → exit
//! ```
//!
//! # Design Decisions
//! - One manager instance owns the registration; no process globals
//! - Ordered shutdown: stop following the store, then deregister

pub mod active;
pub mod manager;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use active::ActiveConfiguration;
pub use manager::{ApplyOutcome, LifecycleManager};
pub use shutdown::Shutdown;
pub use startup::{Enforcer, StartupError};
