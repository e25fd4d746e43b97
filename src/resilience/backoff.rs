//! Throttle backoff: flat by default, optionally exponential with jitter.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    #[default]
    Flat,
    Exponential,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub kind: BackoffKind,
    pub base: Duration,
    pub max: Duration,
}

impl BackoffPolicy {
    pub fn flat(base: Duration) -> Self {
        Self {
            kind: BackoffKind::Flat,
            base,
            max: base,
        }
    }

    pub fn exponential(base: Duration, max: Duration) -> Self {
        Self {
            kind: BackoffKind::Exponential,
            base,
            max,
        }
    }

    /// Delay for the `trip`-th consecutive trip (1-based).
    pub fn delay(&self, trip: u32) -> Duration {
        match self.kind {
            BackoffKind::Flat => self.base,
            BackoffKind::Exponential => calculate_backoff(
                trip.max(1),
                self.base.as_millis() as u64,
                self.max.as_millis() as u64,
            ),
        }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::flat(Duration::from_secs(600))
    }
}

/// Calculate exponential backoff delay with jitter.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    let capped_delay = delay_ms.min(max_ms);

    // Jitter of 0 to 10% of the delay
    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}
