//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, ERROR events fed back to capture)
//!     → metrics.rs (counters and gauges through the `metrics` facade)
//!
//! Consumers:
//!     → Log sink (stdout, plain or JSON)
//!     → Whatever metrics recorder the host installs
//! ```
//!
//! # Design Decisions
//! - No exporter is installed here; without a recorder every metric call is
//!   a no-op
//! - Log level comes from config and can be overridden by `RUST_LOG`

pub mod logging;
pub mod metrics;
