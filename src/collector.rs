//! The collector context object.
//!
//! # Responsibilities
//! - Wire capabilities, capture, health and resilience together once
//! - Expose the host-facing surface: capture, diagnostics, reports
//! - Provide the single install step for process-wide interception
//!
//! # Design Decisions
//! - One instance per process, shared by `Arc`; tests build as many as
//!   they like
//! - Every capability is injected; the builder falls back to the process
//!   environment, a `reqwest` client, an anonymous identity and an
//!   in-memory session store
//! - The network handed out by [`Collector::network`] is already wrapped,
//!   so hosts route their own traffic through capture by using it

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing_subscriber::util::TryInitError;

use crate::capabilities::clock::{Clock, SystemClock};
use crate::capabilities::identity::{AnonymousIdentity, IdentityProvider};
use crate::capabilities::network::{Network, ReqwestNetwork};
use crate::capabilities::session::{MemorySessionStore, SessionStore};
use crate::capabilities::settings::{EnvSettings, Settings};
use crate::capture::buffer::{ErrorBuffer, ErrorStats};
use crate::capture::entry::{EntryContext, ErrorCategory, ErrorEntry};
use crate::capture::hooks;
use crate::capture::interceptor::{InterceptedNetwork, Interceptor};
use crate::capture::layer::CaptureLayer;
use crate::capture::suppression::SuppressionRules;
use crate::config::{validate_config, CollectorConfig, ConfigError, ValidationError};
use crate::error::CollectorResult;
use crate::health::orchestrator::HealthOrchestrator;
use crate::health::passive::PassiveMarker;
use crate::health::state::{CheckName, DiagnosticsMap, ServiceMap};
use crate::observability::logging;
use crate::report::builder::{self, Report, ReportSummary};
use crate::report::export::{self, ExportOutcome, ReportSink};
use crate::resilience::backoff::{BackoffKind, BackoffPolicy};
use crate::resilience::breaker::{GuardedSummary, SessionBreaker};
use crate::resilience::throttle::{ThrottleRegistry, ThrottleState};

#[derive(Default)]
pub struct CollectorBuilder {
    config: CollectorConfig,
    clock: Option<Arc<dyn Clock>>,
    settings: Option<Arc<dyn Settings>>,
    network: Option<Arc<dyn Network>>,
    identity: Option<Arc<dyn IdentityProvider>>,
    session_store: Option<Arc<dyn SessionStore>>,
    sink: Option<Arc<dyn ReportSink>>,
}

impl CollectorBuilder {
    pub fn new(config: CollectorConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn settings(mut self, settings: Arc<dyn Settings>) -> Self {
        self.settings = Some(settings);
        self
    }

    /// The raw request primitive. The collector wraps it.
    pub fn network(mut self, network: Arc<dyn Network>) -> Self {
        self.network = Some(network);
        self
    }

    pub fn identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.session_store = Some(store);
        self
    }

    /// Default output channel for [`Collector::export_report`].
    pub fn sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn build(self) -> CollectorResult<Collector> {
        let config = self.config;
        validate_config(&config).map_err(ConfigError::Validation)?;

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let settings = self.settings.unwrap_or_else(|| Arc::new(EnvSettings::new()));
        let raw_network: Arc<dyn Network> = match self.network {
            Some(network) => network,
            None => Arc::new(ReqwestNetwork::new()?),
        };
        let identity = self.identity.unwrap_or_else(|| Arc::new(AnonymousIdentity));
        let store = self
            .session_store
            .unwrap_or_else(|| Arc::new(MemorySessionStore::new()));

        let rules = match &config.capture.suppression {
            Some(rules) => SuppressionRules::new(rules.clone()).map_err(|e| {
                ConfigError::Validation(vec![ValidationError::InvalidSuppression(e.to_string())])
            })?,
            None => SuppressionRules::defaults(),
        };

        let map = Arc::new(DiagnosticsMap::new(clock.now()));
        let marker = Arc::new(PassiveMarker::from_settings(
            map.clone(),
            settings.as_ref(),
            &config.checks,
        ));

        let buffer = ErrorBuffer::new(
            config.capture.capacity,
            Duration::from_secs(config.capture.recent_window_secs),
        );
        let interceptor = Arc::new(
            Interceptor::new(buffer, clock.clone(), rules)
                .with_context(EntryContext {
                    source: config.capture.source.clone(),
                    location: config.capture.location.clone(),
                })
                .with_mirror_to_log(config.capture.mirror_to_log)
                .with_observer(marker),
        );
        let network: Arc<dyn Network> = Arc::new(InterceptedNetwork::new(raw_network, interceptor.clone()));

        let throttle = Arc::new(ThrottleRegistry::new(backoff_policy(&config)));
        let orchestrator = HealthOrchestrator::new(
            map,
            settings,
            network.clone(),
            identity,
            throttle.clone(),
            clock.clone(),
            interceptor.clone(),
            config.checks.clone(),
        );

        let breaker = Arc::new(SessionBreaker::new(store, config.breaker.flag_key.clone()));
        let summary = Arc::new(GuardedSummary::new(
            breaker,
            network.clone(),
            config.breaker.summary_url.clone(),
            config.breaker.fallback.clone(),
        ));

        tracing::debug!(
            capacity = config.capture.capacity,
            backoff_secs = config.throttle.backoff_secs,
            summary_configured = config.breaker.summary_url.is_some(),
            "Collector built"
        );

        Ok(Collector {
            config,
            clock,
            interceptor,
            network,
            orchestrator,
            throttle,
            summary,
            sink: self.sink,
            hook_installed: AtomicBool::new(false),
        })
    }
}

fn backoff_policy(config: &CollectorConfig) -> BackoffPolicy {
    let base = Duration::from_secs(config.throttle.backoff_secs);
    match config.throttle.policy {
        BackoffKind::Flat => BackoffPolicy::flat(base),
        BackoffKind::Exponential => {
            BackoffPolicy::exponential(base, Duration::from_secs(config.throttle.max_backoff_secs))
        }
    }
}

pub struct Collector {
    config: CollectorConfig,
    clock: Arc<dyn Clock>,
    interceptor: Arc<Interceptor>,
    network: Arc<dyn Network>,
    orchestrator: HealthOrchestrator,
    throttle: Arc<ThrottleRegistry>,
    summary: Arc<GuardedSummary>,
    sink: Option<Arc<dyn ReportSink>>,
    hook_installed: AtomicBool,
}

impl Collector {
    pub fn builder(config: CollectorConfig) -> CollectorBuilder {
        CollectorBuilder::new(config)
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Record a failure. Never fails, never blocks on I/O.
    pub fn capture(&self, category: ErrorCategory, details: serde_json::Value) {
        self.interceptor.capture(category, details);
    }

    /// Run every health check once.
    pub async fn run_diagnostics(&self) -> ServiceMap {
        let services = self.orchestrator.run_all().await;
        let summary = ReportSummary::of(&services);
        tracing::info!(
            success = summary.success,
            warning = summary.warning,
            error = summary.error,
            "Diagnostics complete"
        );
        services
    }

    pub fn diagnostics_snapshot(&self) -> ServiceMap {
        self.orchestrator.map().snapshot()
    }

    /// The `n` most recent entries, newest first.
    pub fn recent_errors(&self, n: usize) -> Vec<ErrorEntry> {
        self.interceptor.recent(n)
    }

    pub fn stats(&self) -> ErrorStats {
        self.interceptor.stats()
    }

    pub fn build_report(&self) -> Report {
        builder::build_report(
            self.orchestrator.map(),
            &self.interceptor,
            self.config.report.recent_errors,
            self.clock.now(),
        )
    }

    /// Render the report and hand it to the configured sink, if any.
    pub fn export_report(&self) -> ExportOutcome {
        export::export(&self.build_report(), self.sink.as_deref())
    }

    pub fn export_report_to(&self, sink: &dyn ReportSink) -> ExportOutcome {
        export::export(&self.build_report(), Some(sink))
    }

    /// The host's network, wrapped so failures are captured.
    pub fn network(&self) -> Arc<dyn Network> {
        self.network.clone()
    }

    /// The remote summary dependency behind the session breaker.
    pub fn summary(&self) -> Arc<GuardedSummary> {
        self.summary.clone()
    }

    pub fn throttle_state(&self, check: CheckName) -> Option<ThrottleState> {
        self.throttle.state(check)
    }

    pub fn interceptor(&self) -> Arc<Interceptor> {
        self.interceptor.clone()
    }

    /// A layer for hosts that own their `tracing` registry.
    pub fn capture_layer(&self) -> CaptureLayer {
        CaptureLayer::new(self.interceptor.clone())
    }

    /// Route panics into the collector. Later calls do nothing.
    pub fn install_panic_hook(&self) {
        if !self.hook_installed.swap(true, Ordering::SeqCst) {
            hooks::install_panic_hook(self.interceptor.clone());
        }
    }

    /// Install the panic hook and the global subscriber with the capture layer.
    ///
    /// The hook is installed even when a subscriber already exists.
    pub fn install(&self) -> Result<(), TryInitError> {
        self.install_panic_hook();
        logging::init(&self.config.observability, Some(self.capture_layer()))
    }

    /// Spawn a task whose failure is captured as `RejectedPromise`.
    pub fn spawn_observed<F, T, E>(&self, label: impl Into<String>, future: F) -> JoinHandle<Option<T>>
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: std::fmt::Display,
    {
        hooks::spawn_observed(self.interceptor.clone(), label, future)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::clock::ManualClock;
    use crate::capabilities::network::testing::ScriptedNetwork;
    use crate::capabilities::network::{HttpRequest, HttpResponse};
    use crate::capabilities::settings::MapSettings;
    use crate::error::CollectorError;
    use crate::health::state::CheckStatus;
    use serde_json::json;

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = CollectorConfig::default();
        config.capture.capacity = 0;
        let result = Collector::builder(config)
            .network(Arc::new(ScriptedNetwork::new()))
            .build();
        assert!(matches!(result, Err(CollectorError::Config(ConfigError::Validation(_)))));
    }

    #[tokio::test]
    async fn test_host_traffic_marks_dependency_passively() {
        let settings = MapSettings::new().with("BACKEND_BASE_URL", "https://backend.test");
        let collector = Collector::builder(CollectorConfig::default())
            .clock(Arc::new(ManualClock::default()))
            .settings(Arc::new(settings))
            .network(Arc::new(
                ScriptedNetwork::new().route("/api/guests", Ok(HttpResponse::new(500, ""))),
            ))
            .build()
            .unwrap();

        let response = collector
            .network()
            .perform(HttpRequest::get("https://backend.test/api/guests"))
            .await
            .unwrap();
        assert_eq!(response.status, 500);

        let snapshot = collector.diagnostics_snapshot();
        assert_eq!(snapshot[&CheckName::BackendService].status, CheckStatus::Error);
        assert_eq!(collector.stats().total, 1);
    }

    #[test]
    fn test_context_is_attached_to_entries() {
        let mut config = CollectorConfig::default();
        config.capture.source = Some("planner-web/1.4".into());
        config.capture.location = Some("/weddings/w-1/guests".into());
        let collector = Collector::builder(config)
            .network(Arc::new(ScriptedNetwork::new()))
            .build()
            .unwrap();

        collector.capture(ErrorCategory::LoggedError, json!({ "message": "x" }));
        let entry = &collector.recent_errors(1)[0];
        assert_eq!(entry.context.source.as_deref(), Some("planner-web/1.4"));
        assert_eq!(entry.context.location.as_deref(), Some("/weddings/w-1/guests"));
    }
}
