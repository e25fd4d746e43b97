//! Captured failure records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// What kind of failure an entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// A panic that reached the process hook.
    UncaughtException,
    /// A spawned task that failed with nobody awaiting its error.
    RejectedPromise,
    /// An explicit application-level error report.
    LoggedError,
    /// The request could not complete.
    NetworkTransportFailure,
    /// The request completed with a non-success status.
    HttpStatusFailure,
    /// A health check errored while running.
    CheckFailure,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::UncaughtException => "UncaughtException",
            ErrorCategory::RejectedPromise => "RejectedPromise",
            ErrorCategory::LoggedError => "LoggedError",
            ErrorCategory::NetworkTransportFailure => "NetworkTransportFailure",
            ErrorCategory::HttpStatusFailure => "HttpStatusFailure",
            ErrorCategory::CheckFailure => "CheckFailure",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host metadata attached to every entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryContext {
    /// Who is capturing, e.g. an agent string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Where the host was when it captured, e.g. the current page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// One captured failure. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub category: ErrorCategory,
    pub payload: serde_json::Value,
    pub context: EntryContext,
}

impl ErrorEntry {
    pub fn new(
        category: ErrorCategory,
        payload: serde_json::Value,
        context: EntryContext,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp,
            category,
            payload,
            context,
        }
    }
}
