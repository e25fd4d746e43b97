//! Crate-wide error definitions.

use thiserror::Error;

use crate::capabilities::network::TransportError;
use crate::config::loader::ConfigError;

/// Failures reported by host-provided capabilities other than the network.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CapabilityError {
    /// The identity provider could not tell whether a user is signed in.
    #[error("identity provider failed: {0}")]
    Identity(String),

    /// The session-scoped store could not be read or written.
    #[error("session store unavailable: {0}")]
    Session(String),
}

/// Errors surfaced by the collector's fallible internals.
///
/// None of these escape the public capture/diagnostics surface; they are
/// recorded as entries or check results instead.
#[derive(Debug, Error)]
pub enum CollectorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Capability(#[from] CapabilityError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Result type for collector operations.
pub type CollectorResult<T> = Result<T, CollectorError>;
