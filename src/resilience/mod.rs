//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Throttle-guarded check (ai-provider):
//!     → throttle.rs (skip the probe while now < until)
//!     → probe rejected with 401/403/429 → throttle.rs trip
//!         → backoff.rs (how long until the next attempt)
//!
//! Remote summary dependency (any call site):
//!     → breaker.rs (read the session flag first)
//!     → disabled: static fallback, no network call
//!     → first 4xx: persist the flag, static fallback
//! ```
//!
//! # Design Decisions
//! - A throttled check still reports; it says when it will retry
//! - The session breaker has no half-open state; only clearing the stored
//!   flag re-enables the dependency
//! - Both mechanisms read the injected clock and store, never globals

pub mod backoff;
pub mod breaker;
pub mod throttle;

pub use backoff::{BackoffKind, BackoffPolicy};
pub use breaker::{GuardedSummary, SessionBreaker, SessionDisableFlag, SummaryOutcome, SummarySource};
pub use throttle::{ThrottleRegistry, ThrottleState};
