//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active checks (orchestrator.rs):
//!     run_all()
//!     → checks.rs (environment, primary-datastore, backend-service,
//!                  ai-provider, mail-provider), concurrently
//!     → commit one result per check into state.rs
//!
//! Passive marking (passive.rs):
//!     Network failure captured by the interceptor
//!     → match URL to a dependency
//!     → commit Error into state.rs
//!
//! State (state.rs):
//!     Unknown → Success | Warning | Error, then free transitions
//! ```
//!
//! # Design Decisions
//! - The set of checks is fixed; every check always has a result
//! - Active and passive results share one map; the latest write wins
//! - No per-check timeout: a check that never settles keeps its previous
//!   result and holds its run open

pub mod checks;
pub mod orchestrator;
pub mod passive;
pub mod state;

pub use checks::{CheckContext, CheckOutcome};
pub use orchestrator::HealthOrchestrator;
pub use passive::PassiveMarker;
pub use state::{CheckName, CheckStatus, DiagnosticResult, DiagnosticsMap, ServiceMap};
