//! Dependency health state.
//!
//! # States
//! - Unknown: no run has completed for the check yet
//! - Success / Warning / Error: outcome of the latest completed run
//!
//! # State Transitions
//! ```text
//! Unknown → {Success | Warning | Error}: first completed run
//! Success ↔ Warning ↔ Error: any later run
//! ```
//!
//! # Design Decisions
//! - The whole map lives behind one `ArcSwap`; a commit swaps in a copy with
//!   one key replaced, so a reader holds either the old or the new result
//! - The key set is fixed when the map is built and never shrinks

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Registered checks, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckName {
    Environment,
    PrimaryDatastore,
    BackendService,
    AiProvider,
    MailProvider,
}

impl CheckName {
    pub const ALL: [CheckName; 5] = [
        CheckName::Environment,
        CheckName::PrimaryDatastore,
        CheckName::BackendService,
        CheckName::AiProvider,
        CheckName::MailProvider,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckName::Environment => "environment",
            CheckName::PrimaryDatastore => "primary-datastore",
            CheckName::BackendService => "backend-service",
            CheckName::AiProvider => "ai-provider",
            CheckName::MailProvider => "mail-provider",
        }
    }
}

impl fmt::Display for CheckName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheckName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CheckName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| format!("unknown check '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    #[default]
    Unknown,
    Success,
    Warning,
    Error,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Unknown => "unknown",
            CheckStatus::Success => "success",
            CheckStatus::Warning => "warning",
            CheckStatus::Error => "error",
        }
    }

    /// Gauge encoding.
    pub fn metric_value(&self) -> f64 {
        match self {
            CheckStatus::Unknown => 0.0,
            CheckStatus::Success => 1.0,
            CheckStatus::Warning => 2.0,
            CheckStatus::Error => 3.0,
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticResult {
    pub status: CheckStatus,
    pub details: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

impl DiagnosticResult {
    pub fn new(status: CheckStatus, details: serde_json::Value, updated_at: DateTime<Utc>) -> Self {
        Self {
            status,
            details,
            updated_at,
        }
    }

    pub fn unknown(at: DateTime<Utc>) -> Self {
        Self::new(CheckStatus::Unknown, serde_json::Value::Null, at)
    }
}

/// Owned copy of every check's latest result.
pub type ServiceMap = BTreeMap<CheckName, DiagnosticResult>;

pub struct DiagnosticsMap {
    inner: ArcSwap<ServiceMap>,
}

impl DiagnosticsMap {
    /// Every registered check starts out `Unknown`.
    pub fn new(created_at: DateTime<Utc>) -> Self {
        let map = CheckName::ALL
            .into_iter()
            .map(|name| (name, DiagnosticResult::unknown(created_at)))
            .collect();
        Self {
            inner: ArcSwap::from_pointee(map),
        }
    }

    pub fn snapshot(&self) -> ServiceMap {
        ServiceMap::clone(&self.inner.load())
    }

    pub fn get(&self, name: CheckName) -> Option<DiagnosticResult> {
        self.inner.load().get(&name).cloned()
    }

    /// Replace one check's result, returning the previous one.
    pub fn commit(&self, name: CheckName, result: DiagnosticResult) -> Option<DiagnosticResult> {
        let previous = self.inner.rcu(|current| {
            let mut next = ServiceMap::clone(current);
            next.insert(name, result.clone());
            next
        });
        previous.get(&name).cloned()
    }
}
