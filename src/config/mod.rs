//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → CollectorConfig (validated, immutable)
//!     → consumed once by CollectorBuilder::build
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the collector is rebuilt to change it
//! - All fields have defaults to allow an empty file
//! - Validation separates syntactic (serde) from semantic checks
//! - Secrets never live here; the file names the settings keys to look up

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    BreakerConfig, CaptureConfig, ChecksConfig, CollectorConfig, ObservabilityConfig,
    ReportConfig, ScheduleConfig, ThrottleConfig,
};
pub use validation::{validate_config, ValidationError};
