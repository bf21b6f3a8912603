//! Target pattern subsystem.
//!
//! # Data Flow
//! ```text
//! Raw target string from the store ("example.com", "*/*", "https://a.com/x")
//!     → pattern.rs (normalize into a MatchPattern, or None when empty)
//!     → lifecycle manager (filter for the host registration)
//!     → matcher.rs (host side: compile the pattern, test request URLs)
//! ```
//!
//! # Design Decisions
//! - Normalization is best effort and never rejects input
//! - Rejection of malformed patterns belongs to the host (matcher.rs)
//! - No regex: scheme/host comparisons plus one glob for the path

pub mod matcher;
pub mod pattern;

pub use matcher::{PatternError, PatternMatcher};
pub use pattern::{normalize, MatchPattern, UNIVERSAL_PATTERN};
