//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → cli.rs (command-line flags override file values)
//!     → validation.rs (semantic checks, serving-mode resolution)
//!     → CoreConfig (mode, upstream, timeout, capture, fixture root)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{FixtureConfig, LimitsConfig, ListenerConfig, MockProxyConfig, ObservabilityConfig, UpstreamConfig};
pub use validation::{resolve_mode, validate_config, CoreConfig, ValidationError};
