//! Known-benign failure shapes.
//!
//! Some failures are expected and already handled by their callers: an
//! existence poll that legitimately answers "not found", a best-effort asset
//! that may be missing, a read-state toggle on a message that does not
//! exist yet. Capturing them would bury real failures, so they are skipped.
//!
//! A failure is suppressed when the caller opted out explicitly (the
//! `x-suppress-error-logging: 1` header or query parameter) or when it
//! matches one of the configured rules.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::capabilities::network::{HttpRequest, Method, SUPPRESS_HEADER};

/// How a rule matches the request path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathMatch {
    Contains(String),
    Suffix(String),
    Regex(String),
}

/// One benign shape. Unset fields match anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuppressionRule {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<Method>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub path: PathMatch,
}

impl SuppressionRule {
    /// The shapes every host of the planner produces.
    pub fn defaults() -> Vec<SuppressionRule> {
        vec![
            SuppressionRule {
                name: "public-wedding-existence-check".into(),
                method: Some(Method::Get),
                status: None,
                path: PathMatch::Contains("/api/public/weddings/".into()),
            },
            SuppressionRule {
                name: "optional-logo-asset".into(),
                method: None,
                status: Some(404),
                path: PathMatch::Suffix("/logo.png".into()),
            },
            SuppressionRule {
                name: "mail-read-state-toggle".into(),
                method: None,
                status: Some(404),
                path: PathMatch::Regex(r"(?i)/api/mail/[^/]+/(read|unread)$".into()),
            },
        ]
    }
}

/// The shape of an observed failure.
#[derive(Debug, Clone, Copy)]
pub struct FailureShape<'a> {
    pub method: Method,
    pub url: &'a str,
    /// `None` for transport failures.
    pub status: Option<u16>,
}

#[derive(Debug, Clone)]
struct CompiledRule {
    rule: SuppressionRule,
    regex: Option<Regex>,
}

/// Rules ready for matching.
#[derive(Debug, Clone, Default)]
pub struct SuppressionRules {
    rules: Vec<CompiledRule>,
}

impl SuppressionRules {
    pub fn new(rules: Vec<SuppressionRule>) -> Result<Self, regex::Error> {
        let rules = rules
            .into_iter()
            .map(|rule| {
                let regex = match &rule.path {
                    PathMatch::Regex(pattern) => Some(Regex::new(pattern)?),
                    _ => None,
                };
                Ok(CompiledRule { rule, regex })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self { rules })
    }

    pub fn defaults() -> Self {
        // The built-in patterns are known to compile.
        Self::new(SuppressionRule::defaults()).unwrap_or_default()
    }

    /// Name of the first rule matching a completed non-success response.
    ///
    /// Transport failures never match a rule; only an explicit opt-out
    /// suppresses them.
    pub fn matching(&self, shape: FailureShape<'_>) -> Option<&str> {
        let status = shape.status?;
        let path = request_path(shape.url);

        self.rules
            .iter()
            .find(|compiled| {
                let rule = &compiled.rule;
                rule.method.map_or(true, |m| m == shape.method)
                    && rule.status.map_or(true, |s| s == status)
                    && match (&rule.path, &compiled.regex) {
                        (PathMatch::Contains(needle), _) => path.contains(needle.as_str()),
                        (PathMatch::Suffix(suffix), _) => path.ends_with(suffix.as_str()),
                        (PathMatch::Regex(_), Some(re)) => re.is_match(&path),
                        (PathMatch::Regex(_), None) => false,
                    }
            })
            .map(|compiled| compiled.rule.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// True when the caller asked for its failures not to be captured.
pub fn opted_out(request: &HttpRequest) -> bool {
    if request
        .header_value(SUPPRESS_HEADER)
        .is_some_and(|v| v.trim() == "1")
    {
        return true;
    }
    parse_url(&request.url).is_some_and(|url| {
        url.query_pairs()
            .any(|(k, v)| k.eq_ignore_ascii_case(SUPPRESS_HEADER) && v.trim() == "1")
    })
}

/// Resolve absolute and host-relative URLs alike.
fn parse_url(raw: &str) -> Option<url::Url> {
    url::Url::parse(raw).ok().or_else(|| {
        url::Url::parse("http://localhost")
            .ok()
            .and_then(|base| base.join(raw).ok())
    })
}

fn request_path(raw: &str) -> String {
    match parse_url(raw) {
        Some(url) => url.path().to_string(),
        None => raw.split(['?', '#']).next().unwrap_or_default().to_string(),
    }
}
