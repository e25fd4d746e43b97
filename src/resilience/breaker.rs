//! Session-wide breaker around the remote summary dependency.
//!
//! # States
//! - Enabled: no flag stored (or a flag with `disabled = false`)
//! - Disabled: flag stored with a reason; every call returns the fallback
//!
//! # State Transitions
//! ```text
//! Enabled → Disabled: first 4xx response from the summary endpoint
//! Disabled → Enabled: only when the stored flag is cleared externally
//! ```
//!
//! # Design Decisions
//! - The flag lives in the session store so every call site (and every
//!   collector instance in the session) sees the same decision
//! - The store is read on every call; a cleared flag takes effect at once
//! - 5xx and transport failures return the fallback without tripping
//! - When the store cannot be read, the last flag this instance saw wins
//! - A trip that could not be persisted is held in memory until the store
//!   explicitly records `disabled = false`

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};

use crate::capabilities::network::{HttpRequest, Network};
use crate::capabilities::session::SessionStore;
use crate::observability::metrics;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDisableFlag {
    pub disabled: bool,
    pub reason: String,
}

#[derive(Debug, Default)]
struct Held {
    flag: Option<SessionDisableFlag>,
    persisted: bool,
}

impl Held {
    /// Nothing usable is stored: only a local trip the store never recorded
    /// survives.
    fn keep_unpersisted(&mut self) -> Option<SessionDisableFlag> {
        if self.persisted {
            *self = Held::default();
        }
        self.flag.clone()
    }
}

pub struct SessionBreaker {
    store: Arc<dyn SessionStore>,
    key: String,
    last_known: Mutex<Held>,
}

impl SessionBreaker {
    pub fn new(store: Arc<dyn SessionStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            last_known: Mutex::new(Held::default()),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// The active disable flag, if any.
    pub fn status(&self) -> Option<SessionDisableFlag> {
        let mut held = self.last_known.lock().unwrap_or_else(PoisonError::into_inner);
        match self.store.get(&self.key) {
            Ok(Some(raw)) => match serde_json::from_str::<SessionDisableFlag>(&raw) {
                Ok(flag) if flag.disabled => {
                    *held = Held {
                        flag: Some(flag.clone()),
                        persisted: true,
                    };
                    Some(flag)
                }
                Ok(_) => {
                    *held = Held::default();
                    None
                }
                Err(e) => {
                    tracing::warn!(key = %self.key, error = %e, "Ignoring malformed breaker flag");
                    held.keep_unpersisted()
                }
            },
            Ok(None) => held.keep_unpersisted(),
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Session store unreadable, using last known breaker state");
                held.flag.clone()
            }
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.status().is_some()
    }

    /// Disable the guarded dependency for the rest of the session.
    pub fn trip(&self, reason: impl Into<String>) -> SessionDisableFlag {
        let flag = SessionDisableFlag {
            disabled: true,
            reason: reason.into(),
        };
        let persisted = match serde_json::to_string(&flag) {
            Ok(raw) => match self.store.set(&self.key, &raw) {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(key = %self.key, error = %e, "Failed to persist breaker flag, holding it in memory");
                    false
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize breaker flag");
                false
            }
        };
        *self.last_known.lock().unwrap_or_else(PoisonError::into_inner) = Held {
            flag: Some(flag.clone()),
            persisted,
        };

        tracing::warn!(key = %self.key, reason = %flag.reason, "Summary dependency disabled for this session");
        metrics::record_breaker_trip();
        flag
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum SummarySource {
    Live,
    Fallback { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryOutcome {
    pub payload: serde_json::Value,
    #[serde(flatten)]
    pub source: SummarySource,
}

impl SummaryOutcome {
    pub fn is_fallback(&self) -> bool {
        matches!(self.source, SummarySource::Fallback { .. })
    }
}

/// The remote summary dependency, reachable only through the breaker.
///
/// Clone the `Arc` into every call site; they all share one breaker.
pub struct GuardedSummary {
    breaker: Arc<SessionBreaker>,
    network: Arc<dyn Network>,
    url: Option<String>,
    fallback: serde_json::Value,
}

impl GuardedSummary {
    pub fn new(
        breaker: Arc<SessionBreaker>,
        network: Arc<dyn Network>,
        url: Option<String>,
        fallback: serde_json::Value,
    ) -> Self {
        Self {
            breaker,
            network,
            url,
            fallback,
        }
    }

    pub fn breaker(&self) -> &SessionBreaker {
        &self.breaker
    }

    pub async fn fetch(&self) -> SummaryOutcome {
        if let Some(flag) = self.breaker.status() {
            return self.fallback(flag.reason);
        }
        let Some(url) = &self.url else {
            return self.fallback("summary endpoint not configured");
        };

        match self.network.perform(HttpRequest::get(url.as_str())).await {
            Ok(response) if response.is_success() => match response.json() {
                Ok(payload) => SummaryOutcome {
                    payload,
                    source: SummarySource::Live,
                },
                Err(e) => self.fallback(format!("malformed summary body: {}", e)),
            },
            Ok(response) if response.is_client_error() => {
                let flag = self
                    .breaker
                    .trip(format!("HTTP {} {}", response.status, response.status_text));
                self.fallback(flag.reason)
            }
            Ok(response) => self.fallback(format!("HTTP {} {}", response.status, response.status_text)),
            Err(e) => self.fallback(e.to_string()),
        }
    }

    fn fallback(&self, reason: impl Into<String>) -> SummaryOutcome {
        SummaryOutcome {
            payload: self.fallback.clone(),
            source: SummarySource::Fallback {
                reason: reason.into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::network::testing::ScriptedNetwork;
    use crate::capabilities::network::{HttpResponse, TransportError};
    use crate::capabilities::session::MemorySessionStore;
    use crate::error::CapabilityError;
    use serde_json::json;

    const KEY: &str = "diagnostics.summary-breaker";
    const URL: &str = "https://backend.test/api/summary";

    fn guarded(network: Arc<ScriptedNetwork>, store: Arc<dyn SessionStore>) -> GuardedSummary {
        GuardedSummary::new(
            Arc::new(SessionBreaker::new(store, KEY)),
            network,
            Some(URL.to_string()),
            json!({ "available": false }),
        )
    }

    #[tokio::test]
    async fn test_first_client_error_disables_for_session() {
        let network = Arc::new(
            ScriptedNetwork::new().route("/api/summary", Ok(HttpResponse::new(403, "forbidden"))),
        );
        let store = Arc::new(MemorySessionStore::new());
        let summary = guarded(network.clone(), store.clone());

        let first = summary.fetch().await;
        assert!(first.is_fallback());
        assert_eq!(first.payload, json!({ "available": false }));

        for _ in 0..3 {
            let again = summary.fetch().await;
            assert_eq!(
                again.source,
                SummarySource::Fallback {
                    reason: "HTTP 403 Forbidden".into()
                }
            );
        }
        assert_eq!(network.calls_to("/api/summary"), 1);

        let stored: SessionDisableFlag = serde_json::from_str(&store.get(KEY).unwrap().unwrap()).unwrap();
        assert!(stored.disabled);
    }

    #[tokio::test]
    async fn test_server_errors_do_not_trip() {
        let network = Arc::new(ScriptedNetwork::new().sequence(
            "/api/summary",
            vec![
                Ok(HttpResponse::new(503, "")),
                Err(TransportError::Timeout),
                Ok(HttpResponse::new(200, r#"{"guests": 120}"#)),
            ],
        ));
        let summary = guarded(network.clone(), Arc::new(MemorySessionStore::new()));

        assert!(summary.fetch().await.is_fallback());
        assert!(summary.fetch().await.is_fallback());
        let live = summary.fetch().await;
        assert_eq!(live.source, SummarySource::Live);
        assert_eq!(live.payload["guests"], 120);
        assert!(!summary.breaker().is_disabled());
    }

    #[tokio::test]
    async fn test_clearing_flag_reenables() {
        let network = Arc::new(
            ScriptedNetwork::new().route("/api/summary", Ok(HttpResponse::new(200, "{}"))),
        );
        let store = Arc::new(MemorySessionStore::new());
        let summary = guarded(network.clone(), store.clone());

        summary.breaker().trip("manual");
        assert!(summary.fetch().await.is_fallback());
        assert_eq!(network.calls_to("/api/summary"), 0);

        store.remove(KEY).unwrap();
        assert_eq!(summary.fetch().await.source, SummarySource::Live);
    }

    struct BrokenStore;

    impl SessionStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, CapabilityError> {
            Err(CapabilityError::Session("locked".into()))
        }
        fn set(&self, _key: &str, _value: &str) -> Result<(), CapabilityError> {
            Err(CapabilityError::Session("locked".into()))
        }
        fn remove(&self, _key: &str) -> Result<(), CapabilityError> {
            Err(CapabilityError::Session("locked".into()))
        }
    }

    #[test]
    fn test_unreadable_store_keeps_last_known_flag() {
        let breaker = SessionBreaker::new(Arc::new(BrokenStore), KEY);
        assert!(!breaker.is_disabled());
        breaker.trip("HTTP 401 Unauthorized");
        assert_eq!(breaker.status().map(|f| f.reason), Some("HTTP 401 Unauthorized".into()));
    }

    /// Reads succeed with nothing stored; writes always fail.
    #[derive(Default)]
    struct ReadOnlyStore {
        stored: Mutex<Option<String>>,
    }

    impl SessionStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> Result<Option<String>, CapabilityError> {
            Ok(self.stored.lock().unwrap().clone())
        }
        fn set(&self, _key: &str, _value: &str) -> Result<(), CapabilityError> {
            Err(CapabilityError::Session("read-only".into()))
        }
        fn remove(&self, _key: &str) -> Result<(), CapabilityError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_unpersisted_trip_stays_disabled() {
        let network = Arc::new(
            ScriptedNetwork::new().route("/api/summary", Ok(HttpResponse::new(403, "forbidden"))),
        );
        let store = Arc::new(ReadOnlyStore::default());
        let summary = guarded(network.clone(), store.clone());

        for _ in 0..4 {
            let outcome = summary.fetch().await;
            assert_eq!(
                outcome.source,
                SummarySource::Fallback {
                    reason: "HTTP 403 Forbidden".into()
                }
            );
        }
        assert_eq!(network.calls_to("/api/summary"), 1);

        *store.stored.lock().unwrap() = Some("not a flag".into());
        assert!(summary.breaker().is_disabled());

        *store.stored.lock().unwrap() = Some(r#"{"disabled":false,"reason":""}"#.into());
        assert!(!summary.breaker().is_disabled());
        *store.stored.lock().unwrap() = None;
        assert!(!summary.breaker().is_disabled());
    }
}
