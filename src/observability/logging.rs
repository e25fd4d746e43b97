//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the global `tracing` subscriber
//! - Feed `ERROR` events back into the collector through the capture layer
//!
//! # Design Decisions
//! - JSON output for machine parsing, plain text for terminals
//! - `RUST_LOG` wins over the configured level when it parses

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer};

use crate::capture::CaptureLayer;
use crate::config::ObservabilityConfig;

/// Install the global subscriber.
///
/// Fails if a subscriber is already set, which hosts that own their logging
/// can ignore and add [`CaptureLayer`] to their own registry instead.
pub fn init(config: &ObservabilityConfig, capture: Option<CaptureLayer>) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let output = if config.json {
        fmt::layer().json().with_target(true).boxed()
    } else {
        fmt::layer().with_target(true).boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(output)
        .with(capture)
        .try_init()
}
