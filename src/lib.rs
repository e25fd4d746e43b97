//! Diagnostics & resilience collector.
//!
//! # Architecture Overview
//!
//! ```text
//!     host failures                ┌──────────────────────────────────────────────┐
//!     (panics, failed tasks,       │                  COLLECTOR                    │
//!      error! events, failed  ─────┼─▶ capture ──▶ ring buffer ──┐                │
//!      network calls)              │      │                      │                │
//!                                  │      └─▶ passive marker ─┐  │                │
//!                                  │                          ▼  ▼                │
//!     host scheduler ──────────────┼─▶ health orchestrator ─▶ diagnostics map ─┐  │
//!      (run_diagnostics)           │      │                                     │  │
//!                                  │      └─▶ resilience (throttle, breaker)    │  │
//!                                  │                                            ▼  │
//!     presentation layer ◀─────────┼──────────────────────────────── report      │
//!                                  └──────────────────────────────────────────────┘
//! ```
//!
//! The host constructs one [`Collector`], calls [`Collector::install`] once to
//! route panics and `ERROR` events into it, and drives
//! [`Collector::run_diagnostics`] from whatever scheduler it owns.

pub mod capabilities;
pub mod capture;
pub mod collector;
pub mod config;
pub mod error;
pub mod health;
pub mod observability;
pub mod report;
pub mod resilience;
pub mod runner;

pub use collector::{Collector, CollectorBuilder};
pub use config::CollectorConfig;
pub use error::{CollectorError, CollectorResult};
