//! Configuration change reactor subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     subscribe to store changes → sync once
//!
//! StoreChange { changed_keys, area }
//!     → driver.rs (relevant? area matches and targetUrl/rules touched)
//!     → store.get([targetUrl, rules]) (full reload, never incremental)
//!     → snapshot.rs (lenient parse, normalize, enabled bindings)
//!     → LifecycleManager::apply (no-op when pattern + signature match)
//! ```
//!
//! # Design Decisions
//! - All async work happens here, before registration; callbacks never await
//! - Store failures are logged and leave the current interceptor in place
//! - A lagged change channel forces a resync rather than guessing

pub mod driver;
pub mod snapshot;

pub use driver::{ConfigReactor, SyncError, WATCHED_KEYS};
pub use snapshot::StoredSnapshot;
