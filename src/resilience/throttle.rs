//! Per-check throttle.
//!
//! # States
//! - Active: no entry, or an entry whose `until` has passed
//! - Throttled: `now < until`; the check skips its network call
//!
//! # State Transitions
//! ```text
//! Active → Throttled: auth or rate-limit rejection (trip)
//! Throttled → Active: now >= until
//! Active → (entry removed): successful probe (clear)
//! ```
//!
//! # Design Decisions
//! - Expired entries are kept so the exponential policy can count
//!   consecutive trips; a success clears them
//! - Time always comes from the caller, never from the system clock

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

use crate::health::state::CheckName;
use crate::observability::metrics;
use crate::resilience::backoff::BackoffPolicy;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThrottleState {
    pub until: DateTime<Utc>,
    pub reason: String,
    /// Consecutive trips without an intervening success.
    pub trips: u32,
}

impl ThrottleState {
    pub fn remaining_ms(&self, now: DateTime<Utc>) -> i64 {
        (self.until - now).num_milliseconds().max(0)
    }
}

/// True for responses that mean "stop asking for a while".
pub fn is_throttle_status(status: u16) -> bool {
    matches!(status, 401 | 403 | 429)
}

#[derive(Debug, Default)]
pub struct ThrottleRegistry {
    states: DashMap<CheckName, ThrottleState>,
    policy: BackoffPolicy,
}

impl ThrottleRegistry {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            states: DashMap::new(),
            policy,
        }
    }

    /// The active throttle for `check`, if it still suppresses the check at `now`.
    pub fn check(&self, check: CheckName, now: DateTime<Utc>) -> Option<ThrottleState> {
        self.states
            .get(&check)
            .filter(|state| now < state.until)
            .map(|state| state.value().clone())
    }

    pub fn trip(&self, check: CheckName, now: DateTime<Utc>, reason: impl Into<String>) -> ThrottleState {
        let trips = self.states.get(&check).map_or(0, |s| s.trips) + 1;
        let delay = chrono::Duration::from_std(self.policy.delay(trips))
            .unwrap_or_else(|_| chrono::Duration::days(1));
        let state = ThrottleState {
            until: now.checked_add_signed(delay).unwrap_or(DateTime::<Utc>::MAX_UTC),
            reason: reason.into(),
            trips,
        };
        self.states.insert(check, state.clone());

        tracing::warn!(
            check = %check,
            until = %state.until,
            trips,
            reason = %state.reason,
            "Check throttled"
        );
        metrics::record_throttle_trip(check);
        state
    }

    pub fn clear(&self, check: CheckName) {
        if self.states.remove(&check).is_some() {
            tracing::info!(check = %check, "Throttle cleared");
        }
    }

    /// The stored entry, expired or not.
    pub fn state(&self, check: CheckName) -> Option<ThrottleState> {
        self.states.get(&check).map(|s| s.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_throttle_window_is_half_open() {
        let registry = ThrottleRegistry::new(BackoffPolicy::flat(Duration::from_secs(600)));
        let t0 = Utc::now();

        assert!(registry.check(CheckName::AiProvider, t0).is_none());
        let state = registry.trip(CheckName::AiProvider, t0, "HTTP 401");
        assert_eq!(state.until, t0 + chrono::Duration::minutes(10));

        let almost = t0 + chrono::Duration::minutes(10) - chrono::Duration::milliseconds(1);
        assert!(registry.check(CheckName::AiProvider, almost).is_some());
        assert!(registry
            .check(CheckName::AiProvider, t0 + chrono::Duration::minutes(10))
            .is_none());
        // Other checks are unaffected.
        assert!(registry.check(CheckName::MailProvider, t0).is_none());
    }

    #[test]
    fn test_consecutive_trips_are_counted_until_cleared() {
        let registry = ThrottleRegistry::new(BackoffPolicy::flat(Duration::from_secs(600)));
        let t0 = Utc::now();

        registry.trip(CheckName::AiProvider, t0, "HTTP 429");
        let second = registry.trip(CheckName::AiProvider, t0 + chrono::Duration::minutes(11), "HTTP 429");
        assert_eq!(second.trips, 2);
        assert_eq!(second.remaining_ms(t0 + chrono::Duration::minutes(11)), 600_000);

        registry.clear(CheckName::AiProvider);
        assert!(registry.state(CheckName::AiProvider).is_none());
        assert_eq!(registry.trip(CheckName::AiProvider, t0, "HTTP 403").trips, 1);
    }

    #[test]
    fn test_exponential_policy_extends_window() {
        let registry = ThrottleRegistry::new(BackoffPolicy::exponential(
            Duration::from_secs(60),
            Duration::from_secs(3600),
        ));
        let t0 = Utc::now();

        let first = registry.trip(CheckName::AiProvider, t0, "HTTP 429");
        let second = registry.trip(CheckName::AiProvider, t0, "HTTP 429");
        assert!(first.remaining_ms(t0) >= 60_000);
        assert!(second.remaining_ms(t0) >= 120_000);
    }

    #[test]
    fn test_throttle_statuses() {
        assert!(is_throttle_status(401));
        assert!(is_throttle_status(403));
        assert!(is_throttle_status(429));
        assert!(!is_throttle_status(404));
        assert!(!is_throttle_status(500));
    }
}
