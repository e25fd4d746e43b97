//! Failure capture subsystem.
//!
//! # Data Flow
//! ```text
//! Sources:
//!     panic hook (hooks.rs)            → UncaughtException
//!     spawn_observed (hooks.rs)        → RejectedPromise
//!     ERROR events (layer.rs)          → LoggedError
//!     Collector::capture               → any category
//!     InterceptedNetwork (interceptor) → HttpStatusFailure / NetworkTransportFailure
//!
//! Interceptor (interceptor.rs):
//!     reentrancy guard → suppression.rs → ErrorEntry (entry.rs)
//!     → ErrorBuffer (buffer.rs) → mirror to log → failure observers
//! ```
//!
//! # Design Decisions
//! - Capture never fails and never blocks on I/O
//! - A nested capture on the same thread is dropped, so a failure while
//!   logging a failure cannot cascade
//! - Network failures are observed, never swallowed: the caller always gets
//!   the original response or error back

pub mod buffer;
pub mod entry;
pub mod hooks;
pub mod interceptor;
pub mod layer;
pub mod suppression;

pub use buffer::{ErrorBuffer, ErrorStats};
pub use entry::{EntryContext, ErrorCategory, ErrorEntry};
pub use interceptor::{FailureObserver, InterceptedNetwork, Interceptor};
pub use layer::CaptureLayer;
pub use suppression::{PathMatch, SuppressionRule, SuppressionRules};
