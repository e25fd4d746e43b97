//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (capacity, windows, backoff > 0)
//! - Check that configured URLs and suppression patterns parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: CollectorConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::capture::suppression::SuppressionRules;
use crate::config::schema::CollectorConfig;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },

    #[error("throttle.max_backoff_secs ({max}) is below throttle.backoff_secs ({base})")]
    BackoffCeiling { base: u64, max: u64 },

    #[error("{field} is not a valid URL: {value}")]
    InvalidUrl { field: &'static str, value: String },

    #[error("{field} must not be empty")]
    EmptyKey { field: String },

    #[error("capture.suppression is invalid: {0}")]
    InvalidSuppression(String),
}

pub fn validate_config(config: &CollectorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let positives = [
        ("capture.capacity", config.capture.capacity as u64),
        ("capture.recent_window_secs", config.capture.recent_window_secs),
        ("throttle.backoff_secs", config.throttle.backoff_secs),
        ("schedule.interval_secs", config.schedule.interval_secs),
    ];
    for (field, value) in positives {
        if value == 0 {
            errors.push(ValidationError::NotPositive { field });
        }
    }

    if config.throttle.max_backoff_secs < config.throttle.backoff_secs {
        errors.push(ValidationError::BackoffCeiling {
            base: config.throttle.backoff_secs,
            max: config.throttle.max_backoff_secs,
        });
    }

    if url::Url::parse(&config.checks.ai_base_url).is_err() {
        errors.push(ValidationError::InvalidUrl {
            field: "checks.ai_base_url",
            value: config.checks.ai_base_url.clone(),
        });
    }
    if let Some(summary_url) = &config.breaker.summary_url {
        if url::Url::parse(summary_url).is_err() {
            errors.push(ValidationError::InvalidUrl {
                field: "breaker.summary_url",
                value: summary_url.clone(),
            });
        }
    }

    let checks = &config.checks;
    let named_keys = [
        ("checks.datastore_url_key", &checks.datastore_url_key),
        ("checks.backend_url_key", &checks.backend_url_key),
        ("checks.ai_key_key", &checks.ai_key_key),
        ("checks.ai_project_key", &checks.ai_project_key),
        ("checks.ai_direct_enabled_key", &checks.ai_direct_enabled_key),
        ("checks.mail_key_key", &checks.mail_key_key),
        ("checks.mail_domain_key", &checks.mail_domain_key),
        ("breaker.flag_key", &config.breaker.flag_key),
    ];
    for (field, key) in named_keys {
        if key.trim().is_empty() {
            errors.push(ValidationError::EmptyKey {
                field: field.to_string(),
            });
        }
    }
    for (i, key) in checks.required_keys.iter().enumerate() {
        if key.trim().is_empty() {
            errors.push(ValidationError::EmptyKey {
                field: format!("checks.required_keys[{}]", i),
            });
        }
    }

    if let Some(rules) = &config.capture.suppression {
        if let Err(e) = SuppressionRules::new(rules.clone()) {
            errors.push(ValidationError::InvalidSuppression(e.to_string()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::suppression::{PathMatch, SuppressionRule};

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&CollectorConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_every_problem() {
        let mut config = CollectorConfig::default();
        config.capture.recent_window_secs = 0;
        config.throttle.max_backoff_secs = 10;
        config.checks.ai_base_url = "not a url".into();
        config.checks.required_keys.push(" ".into());
        config.capture.suppression = Some(vec![SuppressionRule {
            name: "broken".into(),
            method: None,
            status: None,
            path: PathMatch::Regex("[".into()),
        }]);

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(errors.contains(&ValidationError::NotPositive {
            field: "capture.recent_window_secs"
        }));
        assert!(errors.contains(&ValidationError::BackoffCeiling { base: 600, max: 10 }));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::EmptyKey { field } if field == "checks.required_keys[7]")));
    }

    #[test]
    fn test_summary_url_must_parse() {
        let mut config = CollectorConfig::default();
        config.breaker.summary_url = Some("/relative/only".into());
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::InvalidUrl {
                field: "breaker.summary_url",
                value: "/relative/only".into(),
            }]
        );
    }
}
