//! Network interception subsystem.
//!
//! # Data Flow
//! ```text
//! Lifecycle manager
//!     → InterceptionHost::register(callback, filter{urls, types})
//!     → host keeps the callback until deregister(handle)
//!
//! Per request (host side):
//!     RequestDetails { url, type }
//!     → filter match (pattern + resource type)
//!     → callback(details) → BlockingResponse ({} or {redirectUrl})
//! ```
//!
//! # Design Decisions
//! - host.rs is the contract; local.rs is the in-process implementation
//!   used by the binary and the tests
//! - Callbacks are plain `Fn`: no async, no blocking, no shared mutation

pub mod host;
pub mod local;

pub use host::{
    BlockingResponse, HostError, InterceptCallback, InterceptionHost, ListenerHandle,
    RequestDetails, RequestFilter, ResourceType,
};
pub use local::LocalInterceptor;
