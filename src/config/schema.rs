//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! collector. All types derive Serde traits for deserialization from
//! config files.

use serde::{Deserialize, Serialize};

use crate::capture::suppression::SuppressionRule;
use crate::resilience::backoff::BackoffKind;

/// Root configuration for the collector.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CollectorConfig {
    /// Ring buffer and interception settings.
    pub capture: CaptureConfig,

    /// Settings keys and endpoints used by the health checks.
    pub checks: ChecksConfig,

    /// Per-check throttle after auth or rate-limit rejections.
    pub throttle: ThrottleConfig,

    /// Session-wide breaker around the remote summary dependency.
    pub breaker: BreakerConfig,

    /// Report rendering.
    pub report: ReportConfig,

    /// Logging settings.
    pub observability: ObservabilityConfig,

    /// Host-side periodic runner.
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Maximum number of retained entries.
    pub capacity: usize,

    /// Trailing window for `recent_count`, in seconds.
    pub recent_window_secs: u64,

    /// Emit every stored entry to the log sink.
    pub mirror_to_log: bool,

    /// Benign failure shapes. Replaces the built-in list when present.
    pub suppression: Option<Vec<SuppressionRule>>,

    /// Host label attached to every entry.
    pub source: Option<String>,

    /// Where the host currently is (route, screen, job).
    pub location: Option<String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            recent_window_secs: 300,
            mirror_to_log: true,
            suppression: None,
            source: None,
            location: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChecksConfig {
    /// Keys the environment check requires to be set.
    pub required_keys: Vec<String>,

    pub datastore_url_key: String,
    pub backend_url_key: String,
    pub ai_key_key: String,
    pub ai_project_key: String,
    pub ai_direct_enabled_key: String,
    pub mail_key_key: String,
    pub mail_domain_key: String,

    /// Base URL of the AI provider API.
    pub ai_base_url: String,

    /// Header carrying the optional AI project id.
    pub ai_project_header: String,

    /// Path appended to the backend URL for its health probe.
    pub backend_health_path: String,

    /// Path appended to the backend URL to ask it about the mail provider.
    pub mail_probe_path: String,
}

impl Default for ChecksConfig {
    fn default() -> Self {
        Self {
            required_keys: [
                "DATASTORE_URL",
                "DATASTORE_API_KEY",
                "DATASTORE_PROJECT_ID",
                "BACKEND_BASE_URL",
                "AI_API_KEY",
                "MAIL_API_KEY",
                "MAIL_DOMAIN",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            datastore_url_key: "DATASTORE_URL".to_string(),
            backend_url_key: "BACKEND_BASE_URL".to_string(),
            ai_key_key: "AI_API_KEY".to_string(),
            ai_project_key: "AI_PROJECT_ID".to_string(),
            ai_direct_enabled_key: "AI_DIRECT_ENABLED".to_string(),
            mail_key_key: "MAIL_API_KEY".to_string(),
            mail_domain_key: "MAIL_DOMAIN".to_string(),
            ai_base_url: "https://api.openai.com".to_string(),
            ai_project_header: "OpenAI-Project".to_string(),
            backend_health_path: "/health".to_string(),
            mail_probe_path: "/api/mail/test".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Backoff after the first trip, in seconds.
    pub backoff_secs: u64,

    /// `flat` keeps every backoff at `backoff_secs`; `exponential` doubles it
    /// per consecutive trip.
    pub policy: BackoffKind,

    /// Ceiling for the exponential policy, in seconds.
    pub max_backoff_secs: u64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            backoff_secs: 600,
            policy: BackoffKind::Flat,
            max_backoff_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Session store key holding the disable flag.
    pub flag_key: String,

    /// Remote summary endpoint. Without one, callers always get the fallback.
    pub summary_url: Option<String>,

    /// Payload returned while the dependency is disabled or unreachable.
    pub fallback: serde_json::Value,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            flag_key: "diagnostics.summary-breaker".to_string(),
            summary_url: None,
            fallback: serde_json::json!({ "available": false, "items": [] }),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Entries included in the recent-errors section.
    pub recent_errors: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { recent_errors: 20 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive.
    pub log_level: String,

    /// Emit JSON log lines instead of plain text.
    pub json: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Seconds between diagnostics runs in watch mode.
    pub interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self { interval_secs: 30 }
    }
}
