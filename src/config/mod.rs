//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize, defaults if missing)
//!     → cli.rs (--host/--port overrides)
//!     → validation.rs (semantic checks, run once on the merged result)
//!     → ServerConfig (validated, immutable)
//!
//! [components] table or --strategy/--connection
//!     → cli.rs resolve_components
//!     → StrategyDescriptor
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; no reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod cli;
pub mod loader;
pub mod schema;
pub mod validation;

pub use cli::{resolve_components, Cli};
pub use loader::{load_config, load_or_default, ConfigError, ConfigSource};
pub use schema::{Endpoint, ServerConfig};
pub use validation::{validate_config, ValidationError};
