//! Passive health marking.
//!
//! # Responsibilities
//! - Observe network failures captured anywhere in the host
//! - Map the failing URL to the dependency it belongs to
//! - Mark that dependency's check as `Error` without waiting for a run
//!
//! # Design Decisions
//! - Longest matching base URL wins, so a route under the backend (mail) is
//!   attributed to its own check rather than the backend
//! - Only registered keys are written; the next active run overwrites the
//!   passive result
//! - Suppressed failures never reach this observer

use serde_json::json;
use std::sync::Arc;

use crate::capabilities::settings::{configured, Settings};
use crate::capture::entry::ErrorEntry;
use crate::capture::interceptor::FailureObserver;
use crate::config::ChecksConfig;
use crate::health::state::{CheckName, CheckStatus, DiagnosticResult, DiagnosticsMap};
use crate::observability::metrics;

pub struct PassiveMarker {
    map: Arc<DiagnosticsMap>,
    routes: Vec<(String, CheckName)>,
}

impl PassiveMarker {
    pub fn new(map: Arc<DiagnosticsMap>) -> Self {
        Self {
            map,
            routes: Vec::new(),
        }
    }

    /// Attribute failures under `base_url` to `check`.
    pub fn route(mut self, base_url: &str, check: CheckName) -> Self {
        let base = base_url.trim_end_matches('/');
        if !base.is_empty() {
            self.routes.push((base.to_string(), check));
        }
        self
    }

    /// Routes for every dependency whose base URL is configured.
    pub fn from_settings(map: Arc<DiagnosticsMap>, settings: &dyn Settings, config: &ChecksConfig) -> Self {
        let mut marker = Self::new(map).route(&config.ai_base_url, CheckName::AiProvider);

        if let Some(datastore) = configured(settings, &config.datastore_url_key) {
            marker = marker.route(&datastore, CheckName::PrimaryDatastore);
        }
        if let Some(backend) = configured(settings, &config.backend_url_key) {
            let backend = backend.trim_end_matches('/').to_string();
            marker = marker.route(&backend, CheckName::BackendService);
            if let Some((mail_root, _)) = config.mail_probe_path.rsplit_once('/') {
                if !mail_root.is_empty() {
                    marker = marker.route(&format!("{}{}", backend, mail_root), CheckName::MailProvider);
                }
            }
        }
        marker
    }

    pub fn matching(&self, url: &str) -> Option<CheckName> {
        self.routes
            .iter()
            .filter(|(base, _)| under(url, base))
            .max_by_key(|(base, _)| base.len())
            .map(|(_, check)| *check)
    }
}

/// `url` is `base` or a path, query or fragment below it.
fn under(url: &str, base: &str) -> bool {
    url.strip_prefix(base)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(['/', '?', '#']))
}

impl FailureObserver for PassiveMarker {
    fn on_network_failure(&self, url: &str, entry: &ErrorEntry) {
        let Some(check) = self.matching(url) else {
            return;
        };
        let result = DiagnosticResult::new(
            CheckStatus::Error,
            json!({
                "source": "passive",
                "entry_id": entry.id,
                "category": entry.category,
                "failure": entry.payload,
            }),
            entry.timestamp,
        );
        self.map.commit(check, result);
        metrics::record_check_status(check, CheckStatus::Error);
        tracing::debug!(check = %check, url, "Dependency marked failed from observed traffic");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::settings::MapSettings;
    use crate::capture::entry::{EntryContext, ErrorCategory};
    use chrono::Utc;

    fn marker() -> PassiveMarker {
        let settings = MapSettings::new()
            .with("BACKEND_BASE_URL", "https://backend.test/")
            .with("DATASTORE_URL", "https://datastore.test/v1");
        PassiveMarker::from_settings(
            Arc::new(DiagnosticsMap::new(Utc::now())),
            &settings,
            &ChecksConfig::default(),
        )
    }

    #[test]
    fn test_longest_prefix_wins() {
        let marker = marker();
        assert_eq!(
            marker.matching("https://backend.test/api/guests"),
            Some(CheckName::BackendService)
        );
        assert_eq!(
            marker.matching("https://backend.test/api/mail/send"),
            Some(CheckName::MailProvider)
        );
        assert_eq!(
            marker.matching("https://datastore.test/v1/users/u-1"),
            Some(CheckName::PrimaryDatastore)
        );
        assert_eq!(
            marker.matching("https://api.openai.com/v1/chat/completions"),
            Some(CheckName::AiProvider)
        );
        assert_eq!(marker.matching("https://backend.test.other/x"), None);
        assert_eq!(marker.matching("https://cdn.test/logo.png"), None);
    }

    #[test]
    fn test_failure_marks_matching_check() {
        let marker = marker();
        let entry = ErrorEntry::new(
            ErrorCategory::HttpStatusFailure,
            json!({ "url": "https://backend.test/api/rsvp", "status": 500 }),
            EntryContext::default(),
            Utc::now(),
        );

        marker.on_network_failure("https://backend.test/api/rsvp", &entry);

        let result = marker.map.get(CheckName::BackendService).unwrap();
        assert_eq!(result.status, CheckStatus::Error);
        assert_eq!(result.details["source"], "passive");
        assert_eq!(result.details["failure"]["status"], 500);
        assert_eq!(
            marker.map.get(CheckName::MailProvider).map(|r| r.status),
            Some(CheckStatus::Unknown)
        );
    }
}
