//! Redirect computation subsystem.
//!
//! # Data Flow
//! ```text
//! Intercepted request URL + immutable EnabledRules snapshot
//!     → decision.rs (scheme guard, parse, apply rules, loop guard)
//!     → Decision::Redirect { target } | Decision::PassThrough { reason }
//!     → interceptor callback maps it to a BlockingResponse
//! ```
//!
//! # Design Decisions
//! - Pure and synchronous: no I/O, no locks, safe on the request hot path
//! - Output of a redirect is always a fixed point for the same rules

pub mod decision;

pub use decision::{decide, Decision, PassReason};
