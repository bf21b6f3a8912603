//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → EnforcerConfig (validated, immutable)
//!     → startup wiring (store path, resource types, log level)
//! ```
//!
//! This is process configuration only. The rules and the target pattern
//! live in the configuration store and are followed by the reactor.
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_or_default, ConfigError};
pub use schema::{EnforcerConfig, InterceptionConfig, ObservabilityConfig, StoreConfig};
pub use validation::ValidationError;
