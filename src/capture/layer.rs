//! `tracing` layer that turns `ERROR` events into captured entries.

use serde_json::{json, Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use crate::capture::entry::ErrorCategory;
use crate::capture::interceptor::Interceptor;

/// Captures every `ERROR`-level event as a `LoggedError`.
///
/// The collector's own mirror lines are emitted while a capture is in
/// progress and are therefore dropped by the interceptor's reentrancy guard.
#[derive(Clone)]
pub struct CaptureLayer {
    interceptor: Arc<Interceptor>,
}

impl CaptureLayer {
    pub fn new(interceptor: Arc<Interceptor>) -> Self {
        Self { interceptor }
    }
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if *metadata.level() != Level::ERROR {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        self.interceptor.capture(
            ErrorCategory::LoggedError,
            json!({
                "message": visitor.message,
                "target": metadata.target(),
                "fields": Value::Object(visitor.fields),
            }),
        );
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    fields: Map<String, Value>,
}

impl FieldVisitor {
    fn insert(&mut self, field: &Field, value: Value) {
        if field.name() == "message" {
            self.message = Some(match value {
                Value::String(s) => s,
                other => other.to_string(),
            });
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, Value::String(format!("{:?}", value)));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, Value::String(value.to_string()));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, json!(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, json!(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, json!(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::clock::SystemClock;
    use crate::capture::buffer::ErrorBuffer;
    use crate::capture::suppression::SuppressionRules;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn test_error_events_become_logged_errors() {
        let interceptor = Arc::new(Interceptor::new(
            ErrorBuffer::default(),
            Arc::new(SystemClock),
            SuppressionRules::default(),
        ));
        let subscriber = tracing_subscriber::registry().with(CaptureLayer::new(interceptor.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!("not captured");
            tracing::error!(guest_id = 42, "seating sync failed");
        });

        let entries = interceptor.recent(10);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].category, ErrorCategory::LoggedError);
        assert_eq!(entries[0].payload["message"], "seating sync failed");
        assert_eq!(entries[0].payload["fields"]["guest_id"], 42);
    }
}
