//! Parameter rule subsystem.
//!
//! # Data Flow
//! ```text
//! Store value under "rules" (JSON array)
//!     → model.rs (RuleSet::from_value, lenient per entry)
//!     → RuleSet::enabled_rules (filter enabled, drop id/flag)
//!     → EnabledRules snapshot (shared with the interceptor callback)
//!     → signature.rs (order-independent fingerprint for change detection)
//!
//! Editing (editor.rs):
//!     read full collection → RuleSet edit → write full collection back
//! ```
//!
//! # Design Decisions
//! - Rule identity is the id; order is storage order but carries no meaning
//! - Parameter names are unique per set when edited through RuleSet
//! - Edits return a new set instead of mutating in place

pub mod editor;
pub mod model;
pub mod signature;

pub use editor::{EditError, RuleEditor};
pub use model::{EnabledRules, Rule, RuleBinding, RuleError, RuleId, RuleSet};
pub use signature::ConfigurationSignature;
