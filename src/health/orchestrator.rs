//! Health check orchestration.
//!
//! # Responsibilities
//! - Run every registered check concurrently and wait for all of them
//! - Isolate each check: an error or panic in one never reaches another
//! - Commit exactly one result per check per run

use futures_util::future::join_all;
use serde_json::json;
use std::sync::Arc;

use crate::capabilities::clock::Clock;
use crate::capabilities::identity::IdentityProvider;
use crate::capabilities::network::Network;
use crate::capabilities::settings::Settings;
use crate::capture::entry::ErrorCategory;
use crate::capture::hooks::catch_panic;
use crate::capture::interceptor::Interceptor;
use crate::config::ChecksConfig;
use crate::health::checks::{self, CheckContext, CheckOutcome};
use crate::health::state::{CheckName, CheckStatus, DiagnosticResult, DiagnosticsMap, ServiceMap};
use crate::observability::metrics;
use crate::resilience::throttle::ThrottleRegistry;

pub struct HealthOrchestrator {
    map: Arc<DiagnosticsMap>,
    settings: Arc<dyn Settings>,
    network: Arc<dyn Network>,
    identity: Arc<dyn IdentityProvider>,
    throttle: Arc<ThrottleRegistry>,
    clock: Arc<dyn Clock>,
    interceptor: Arc<Interceptor>,
    config: ChecksConfig,
}

impl HealthOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        map: Arc<DiagnosticsMap>,
        settings: Arc<dyn Settings>,
        network: Arc<dyn Network>,
        identity: Arc<dyn IdentityProvider>,
        throttle: Arc<ThrottleRegistry>,
        clock: Arc<dyn Clock>,
        interceptor: Arc<Interceptor>,
        config: ChecksConfig,
    ) -> Self {
        Self {
            map,
            settings,
            network,
            identity,
            throttle,
            clock,
            interceptor,
            config,
        }
    }

    pub fn map(&self) -> &DiagnosticsMap {
        &self.map
    }

    /// Run every check once and return the map as it stands afterwards.
    pub async fn run_all(&self) -> ServiceMap {
        tracing::debug!(checks = CheckName::ALL.len(), "Running diagnostics");
        join_all(CheckName::ALL.into_iter().map(|name| self.run_guarded(name))).await;
        self.map.snapshot()
    }

    /// Run one check, converting its failure into an `Error` result.
    pub async fn run_guarded(&self, name: CheckName) -> DiagnosticResult {
        let outcome = match catch_panic(self.run_check(name)).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(error)) => self.check_failed(name, json!({ "error": error.to_string() })),
            Err(message) => self.check_failed(name, json!({ "error": message, "panicked": true })),
        };
        self.commit(name, outcome)
    }

    async fn run_check(&self, name: CheckName) -> crate::error::CollectorResult<CheckOutcome> {
        let ctx = CheckContext {
            settings: self.settings.as_ref(),
            network: self.network.as_ref(),
            identity: self.identity.as_ref(),
            throttle: &self.throttle,
            clock: self.clock.as_ref(),
            config: &self.config,
        };
        checks::run(name, &ctx).await
    }

    fn check_failed(&self, name: CheckName, details: serde_json::Value) -> CheckOutcome {
        let mut payload = details.clone();
        payload["check"] = json!(name);
        self.interceptor.capture(ErrorCategory::CheckFailure, payload);
        CheckOutcome::error(details)
    }

    fn commit(&self, name: CheckName, outcome: CheckOutcome) -> DiagnosticResult {
        let result = DiagnosticResult::new(outcome.status, outcome.details, self.clock.now());
        let previous = self.map.commit(name, result.clone());
        let previous_status = previous.map(|r| r.status).unwrap_or_default();

        if previous_status != result.status {
            match result.status {
                CheckStatus::Success => {
                    tracing::info!(check = %name, from = %previous_status, status = %result.status, "Check status changed")
                }
                _ => {
                    tracing::warn!(check = %name, from = %previous_status, status = %result.status, "Check status changed")
                }
            }
        }
        metrics::record_check_status(name, result.status);
        result
    }
}
