//! Collector metrics.
//!
//! # Metrics
//! - `collector_errors_captured_total` (counter): stored entries by category
//! - `collector_errors_suppressed_total` (counter): skipped failures by rule
//! - `collector_check_status` (gauge): 0=unknown, 1=success, 2=warning, 3=error
//! - `collector_throttle_trips_total` (counter): throttle trips by check
//! - `collector_breaker_trips_total` (counter): session breaker trips

use crate::capture::entry::ErrorCategory;
use crate::health::state::{CheckName, CheckStatus};

pub fn record_error_captured(category: ErrorCategory) {
    ::metrics::counter!("collector_errors_captured_total", "category" => category.as_str()).increment(1);
}

pub fn record_error_suppressed(rule: &str) {
    ::metrics::counter!("collector_errors_suppressed_total", "rule" => rule.to_string()).increment(1);
}

pub fn record_check_status(check: CheckName, status: CheckStatus) {
    ::metrics::gauge!("collector_check_status", "check" => check.as_str()).set(status.metric_value());
}

pub fn record_throttle_trip(check: CheckName) {
    ::metrics::counter!("collector_throttle_trips_total", "check" => check.as_str()).increment(1);
}

pub fn record_breaker_trip() {
    ::metrics::counter!("collector_breaker_trips_total").increment(1);
}
