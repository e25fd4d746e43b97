//! The registered health checks.
//!
//! Every check turns what it observed into a [`CheckOutcome`]. A check
//! returns `Err` only when its own logic could not run (the identity
//! provider failed, for instance); the orchestrator records that as a
//! `CheckFailure` and reports the check as `Error`.

use serde_json::{json, Map, Value};

use crate::capabilities::clock::Clock;
use crate::capabilities::identity::IdentityProvider;
use crate::capabilities::network::{HttpRequest, HttpResponse, Network};
use crate::capabilities::settings::{configured, Settings};
use crate::config::ChecksConfig;
use crate::error::CollectorResult;
use crate::health::state::{CheckName, CheckStatus};
use crate::resilience::throttle::{is_throttle_status, ThrottleRegistry};

/// Characters of a configured value kept visible in reports.
const REDACT_PREFIX: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutcome {
    pub status: CheckStatus,
    pub details: Value,
}

impl CheckOutcome {
    pub fn success(details: Value) -> Self {
        Self {
            status: CheckStatus::Success,
            details,
        }
    }

    pub fn warning(details: Value) -> Self {
        Self {
            status: CheckStatus::Warning,
            details,
        }
    }

    pub fn error(details: Value) -> Self {
        Self {
            status: CheckStatus::Error,
            details,
        }
    }
}

/// Everything a check may touch.
pub struct CheckContext<'a> {
    pub settings: &'a dyn Settings,
    pub network: &'a dyn Network,
    pub identity: &'a dyn IdentityProvider,
    pub throttle: &'a ThrottleRegistry,
    pub clock: &'a dyn Clock,
    pub config: &'a ChecksConfig,
}

impl CheckContext<'_> {
    fn setting(&self, key: &str) -> Option<String> {
        configured(self.settings, key)
    }

    fn base_url(&self, key: &str) -> Option<String> {
        self.setting(key).map(|url| url.trim_end_matches('/').to_string())
    }
}

pub async fn run(name: CheckName, ctx: &CheckContext<'_>) -> CollectorResult<CheckOutcome> {
    match name {
        CheckName::Environment => Ok(environment(ctx)),
        CheckName::PrimaryDatastore => primary_datastore(ctx).await,
        CheckName::BackendService => Ok(backend_service(ctx).await),
        CheckName::AiProvider => Ok(ai_provider(ctx).await),
        CheckName::MailProvider => Ok(mail_provider(ctx).await),
    }
}

/// Keep a short prefix of a secret so operators can tell which one is set.
pub fn redact(value: &str) -> String {
    let prefix: String = value.chars().take(REDACT_PREFIX).collect();
    format!("{}...", prefix)
}

pub fn environment(ctx: &CheckContext<'_>) -> CheckOutcome {
    let mut present = Map::new();
    let mut missing = Vec::new();

    for key in &ctx.config.required_keys {
        match ctx.setting(key) {
            Some(value) => {
                present.insert(key.clone(), Value::String(redact(&value)));
            }
            None => missing.push(key.clone()),
        }
    }

    let details = json!({
        "present": present,
        "missing": missing,
        "total": ctx.config.required_keys.len(),
    });
    if missing.is_empty() {
        CheckOutcome::success(details)
    } else {
        CheckOutcome::error(details)
    }
}

pub async fn primary_datastore(ctx: &CheckContext<'_>) -> CollectorResult<CheckOutcome> {
    let Some(base) = ctx.base_url(&ctx.config.datastore_url_key) else {
        return Ok(CheckOutcome::error(json!({
            "message": "datastore URL not configured",
            "key": ctx.config.datastore_url_key,
        })));
    };

    let outcome = match ctx.identity.current().await? {
        Some(identity) => {
            let url = format!("{}/users/{}", base, identity.uid);
            match ctx.network.perform(HttpRequest::get(&url).bearer(&identity.token)).await {
                Ok(response) if response.is_success() => CheckOutcome::success(json!({
                    "message": "authenticated read succeeded",
                    "uid": identity.uid,
                    "status": response.status,
                })),
                Ok(response) => CheckOutcome::error(json!({
                    "message": "authenticated read rejected",
                    "uid": identity.uid,
                    "status": response.status,
                    "status_text": response.status_text,
                })),
                Err(e) => CheckOutcome::error(json!({
                    "message": "datastore unreachable",
                    "error": e.to_string(),
                })),
            }
        }
        None => match ctx.network.perform(HttpRequest::get(&base).silent()).await {
            Ok(response) => CheckOutcome::warning(json!({
                "message": "no identity yet",
                "reachable": true,
                "status": response.status,
            })),
            Err(e) => CheckOutcome::error(json!({
                "message": "datastore unreachable",
                "error": e.to_string(),
            })),
        },
    };
    Ok(outcome)
}

pub async fn backend_service(ctx: &CheckContext<'_>) -> CheckOutcome {
    let Some(base) = ctx.base_url(&ctx.config.backend_url_key) else {
        return CheckOutcome::error(json!({
            "message": "backend URL not configured",
            "key": ctx.config.backend_url_key,
        }));
    };
    let url = format!("{}{}", base, ctx.config.backend_health_path);

    match ctx.network.perform(HttpRequest::get(&url)).await {
        Ok(response) if response.is_success() => match response.json() {
            Ok(body) => CheckOutcome::success(json!({
                "url": url,
                "status": response.status,
                "body": body,
            })),
            Err(e) => CheckOutcome::error(json!({
                "url": url,
                "message": "malformed health response",
                "error": e.to_string(),
            })),
        },
        Ok(response) => CheckOutcome::error(status_details(&url, &response)),
        Err(e) => CheckOutcome::error(json!({
            "url": url,
            "message": "backend unreachable",
            "error": e.to_string(),
        })),
    }
}

pub async fn ai_provider(ctx: &CheckContext<'_>) -> CheckOutcome {
    let now = ctx.clock.now();
    if let Some(state) = ctx.throttle.check(CheckName::AiProvider, now) {
        return CheckOutcome::warning(json!({
            "reason": "throttled",
            "message": state.reason,
            "next_retry_in_ms": state.remaining_ms(now),
            "retry_at": state.until,
        }));
    }

    if ctx.setting(&ctx.config.ai_direct_enabled_key).as_deref() != Some("true") {
        return CheckOutcome::warning(json!({
            "reason": "direct-ai-disabled",
            "message": "direct AI integration is disabled",
        }));
    }

    let Some(key) = ctx.setting(&ctx.config.ai_key_key) else {
        return CheckOutcome::error(json!({
            "message": "AI API key not configured",
            "key": ctx.config.ai_key_key,
        }));
    };

    let url = format!("{}/v1/models", ctx.config.ai_base_url.trim_end_matches('/'));
    let mut request = HttpRequest::get(&url).bearer(&key);
    if let Some(project) = ctx.setting(&ctx.config.ai_project_key) {
        request = request.header(ctx.config.ai_project_header.as_str(), project);
    }

    match ctx.network.perform(request).await {
        Ok(response) if response.is_success() => {
            ctx.throttle.clear(CheckName::AiProvider);
            let models = response
                .json()
                .ok()
                .and_then(|body| body.get("data").and_then(Value::as_array).map(Vec::len));
            CheckOutcome::success(json!({
                "status": response.status,
                "models": models,
            }))
        }
        Ok(response) if is_throttle_status(response.status) => {
            let state = ctx.throttle.trip(
                CheckName::AiProvider,
                now,
                format!("HTTP {} {}", response.status, response.status_text),
            );
            CheckOutcome::warning(json!({
                "reason": "throttled",
                "message": state.reason,
                "status": response.status,
                "next_retry_in_ms": state.remaining_ms(now),
                "retry_at": state.until,
            }))
        }
        Ok(response) => CheckOutcome::error(status_details(&url, &response)),
        Err(e) => CheckOutcome::error(json!({
            "url": url,
            "message": "AI provider unreachable",
            "error": e.to_string(),
        })),
    }
}

pub async fn mail_provider(ctx: &CheckContext<'_>) -> CheckOutcome {
    let key = ctx.setting(&ctx.config.mail_key_key);
    let domain = ctx.setting(&ctx.config.mail_domain_key);
    let (Some(_), Some(domain)) = (&key, domain) else {
        let missing: Vec<&str> = [
            (key.is_none(), ctx.config.mail_key_key.as_str()),
            (ctx.setting(&ctx.config.mail_domain_key).is_none(), ctx.config.mail_domain_key.as_str()),
        ]
        .into_iter()
        .filter_map(|(absent, name)| absent.then_some(name))
        .collect();
        return CheckOutcome::error(json!({
            "message": "mail provider not configured",
            "missing": missing,
        }));
    };

    let Some(base) = ctx.base_url(&ctx.config.backend_url_key) else {
        return CheckOutcome::warning(json!({
            "message": "backend not available to test",
            "domain": domain,
        }));
    };
    let url = format!("{}{}", base, ctx.config.mail_probe_path);

    match ctx.network.perform(HttpRequest::get(&url)).await {
        Ok(response) if response.is_success() => {
            let body = response.json().unwrap_or(Value::Null);
            let status = match body.get("status").and_then(Value::as_str) {
                Some("warning") => CheckStatus::Warning,
                Some("error") => CheckStatus::Error,
                _ => CheckStatus::Success,
            };
            CheckOutcome {
                status,
                details: json!({
                    "domain": domain,
                    "status": response.status,
                    "body": body,
                }),
            }
        }
        Ok(response) => CheckOutcome::error(status_details(&url, &response)),
        Err(e) => CheckOutcome::warning(json!({
            "message": "backend unavailable to test mail provider",
            "domain": domain,
            "error": e.to_string(),
        })),
    }
}

fn status_details(url: &str, response: &HttpResponse) -> Value {
    json!({
        "url": url,
        "status": response.status,
        "status_text": response.status_text,
    })
}
