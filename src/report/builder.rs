//! Report snapshot.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::capture::buffer::ErrorStats;
use crate::capture::entry::ErrorEntry;
use crate::capture::interceptor::Interceptor;
use crate::health::state::{CheckStatus, DiagnosticsMap, ServiceMap};

/// Everything the presentation layer needs, frozen at `generated_at`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub services: ServiceMap,
    pub recent_errors: Vec<ErrorEntry>,
    pub stats: ErrorStats,
}

/// Service counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub success: usize,
    pub warning: usize,
    pub error: usize,
    pub unknown: usize,
}

impl ReportSummary {
    pub fn of(services: &ServiceMap) -> Self {
        services
            .values()
            .fold(ReportSummary::default(), |mut summary, result| {
                match result.status {
                    CheckStatus::Success => summary.success += 1,
                    CheckStatus::Warning => summary.warning += 1,
                    CheckStatus::Error => summary.error += 1,
                    CheckStatus::Unknown => summary.unknown += 1,
                }
                summary
            })
    }
}

impl Report {
    pub fn summary(&self) -> ReportSummary {
        ReportSummary::of(&self.services)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

pub fn build_report(
    map: &DiagnosticsMap,
    interceptor: &Interceptor,
    recent_errors: usize,
    generated_at: DateTime<Utc>,
) -> Report {
    Report {
        generated_at,
        services: map.snapshot(),
        recent_errors: interceptor.recent(recent_errors),
        stats: interceptor.stats(),
    }
}
