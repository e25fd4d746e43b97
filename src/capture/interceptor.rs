//! Capture entry point and network decorator.
//!
//! # Responsibilities
//! - Turn a failure into exactly one stored [`ErrorEntry`]
//! - Mirror each stored entry to the log sink once
//! - Observe failed network calls without altering their outcome
//! - Notify failure observers (passive health marking)
//!
//! # Design Decisions
//! - The reentrancy guard is thread-local: a capture triggered from inside a
//!   capture (the mirror log line reaching the capture layer, an observer
//!   that logs an error) is dropped, while captures on other threads proceed
//! - The buffer lock is held only for the append itself

use async_trait::async_trait;
use serde_json::json;
use std::cell::Cell;
use std::sync::{Arc, Mutex, PoisonError};

use crate::capabilities::clock::Clock;
use crate::capabilities::network::{HttpRequest, HttpResponse, Network, TransportError};
use crate::capture::buffer::{ErrorBuffer, ErrorStats};
use crate::capture::entry::{EntryContext, ErrorCategory, ErrorEntry};
use crate::capture::suppression::{self, FailureShape, SuppressionRules};
use crate::observability::metrics;

/// Log target used when mirroring captured entries.
pub const CAPTURE_TARGET: &str = "diagnostics_collector::capture";

thread_local! {
    static CAPTURING: Cell<bool> = const { Cell::new(false) };
}

/// Marks the current thread as inside `capture` until dropped.
struct ReentrancyGuard;

impl ReentrancyGuard {
    fn enter() -> Option<Self> {
        CAPTURING.with(|flag| {
            if flag.get() {
                None
            } else {
                flag.set(true);
                Some(ReentrancyGuard)
            }
        })
    }
}

impl Drop for ReentrancyGuard {
    fn drop(&mut self) {
        CAPTURING.with(|flag| flag.set(false));
    }
}

/// Receives network failures after they have been stored.
pub trait FailureObserver: Send + Sync {
    fn on_network_failure(&self, url: &str, entry: &ErrorEntry);
}

pub struct Interceptor {
    buffer: Mutex<ErrorBuffer>,
    clock: Arc<dyn Clock>,
    rules: SuppressionRules,
    context: EntryContext,
    mirror_to_log: bool,
    observers: Vec<Arc<dyn FailureObserver>>,
}

impl Interceptor {
    pub fn new(buffer: ErrorBuffer, clock: Arc<dyn Clock>, rules: SuppressionRules) -> Self {
        Self {
            buffer: Mutex::new(buffer),
            clock,
            rules,
            context: EntryContext::default(),
            mirror_to_log: true,
            observers: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: EntryContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_mirror_to_log(mut self, enabled: bool) -> Self {
        self.mirror_to_log = enabled;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn FailureObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Record a failure. Nested calls on the same thread are ignored.
    pub fn capture(&self, category: ErrorCategory, details: serde_json::Value) {
        let Some(_guard) = ReentrancyGuard::enter() else {
            return;
        };
        self.store(category, details);
    }

    fn store(&self, category: ErrorCategory, details: serde_json::Value) -> ErrorEntry {
        let entry = ErrorEntry::new(category, details, self.context.clone(), self.clock.now());
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .append(entry.clone());
        metrics::record_error_captured(category);

        if self.mirror_to_log {
            tracing::error!(
                target: CAPTURE_TARGET,
                id = %entry.id,
                category = %category,
                payload = %entry.payload,
                "captured failure"
            );
        }
        entry
    }

    /// Record a non-success response unless it is suppressed.
    pub fn observe_response(&self, request: &HttpRequest, opted_out: bool, response: &HttpResponse) {
        if response.is_success() {
            return;
        }
        let shape = FailureShape {
            method: request.method,
            url: &request.url,
            status: Some(response.status),
        };
        if self.suppressed(shape, opted_out) {
            return;
        }
        self.capture_network(
            &request.url,
            ErrorCategory::HttpStatusFailure,
            json!({
                "url": request.url,
                "status": response.status,
                "status_text": response.status_text,
                "method": request.method,
            }),
        );
    }

    /// Record a transport failure unless the caller opted out.
    pub fn observe_transport(&self, request: &HttpRequest, opted_out: bool, error: &TransportError) {
        let shape = FailureShape {
            method: request.method,
            url: &request.url,
            status: None,
        };
        if self.suppressed(shape, opted_out) {
            return;
        }
        self.capture_network(
            &request.url,
            ErrorCategory::NetworkTransportFailure,
            json!({
                "url": request.url,
                "method": request.method,
                "error": error.to_string(),
            }),
        );
    }

    fn suppressed(&self, shape: FailureShape<'_>, opted_out: bool) -> bool {
        let rule = if opted_out {
            Some("opt-out")
        } else {
            self.rules.matching(shape)
        };
        match rule {
            Some(rule) => {
                tracing::debug!(url = %shape.url, status = ?shape.status, rule, "Failure suppressed");
                metrics::record_error_suppressed(rule);
                true
            }
            None => false,
        }
    }

    fn capture_network(&self, url: &str, category: ErrorCategory, details: serde_json::Value) {
        let Some(_guard) = ReentrancyGuard::enter() else {
            return;
        };
        let entry = self.store(category, details);
        for observer in &self.observers {
            observer.on_network_failure(url, &entry);
        }
    }

    pub fn stats(&self) -> ErrorStats {
        let now = self.clock.now();
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .stats(now)
    }

    /// The `n` most recent entries, newest first.
    pub fn recent(&self, n: usize) -> Vec<ErrorEntry> {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot(n)
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Wraps a [`Network`] so every failed call is captured on its way back.
#[derive(Clone)]
pub struct InterceptedNetwork<N> {
    inner: N,
    interceptor: Arc<Interceptor>,
}

impl<N: Network> InterceptedNetwork<N> {
    pub fn new(inner: N, interceptor: Arc<Interceptor>) -> Self {
        Self { inner, interceptor }
    }
}

#[async_trait]
impl<N: Network> Network for InterceptedNetwork<N> {
    async fn perform(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let opted_out = suppression::opted_out(&request);
        let observed = request.clone();

        match self.inner.perform(request).await {
            Ok(response) => {
                self.interceptor.observe_response(&observed, opted_out, &response);
                Ok(response)
            }
            Err(error) => {
                self.interceptor.observe_transport(&observed, opted_out, &error);
                Err(error)
            }
        }
    }
}
