//! Human-readable export and delivery.

use serde_json::Value;
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::PathBuf;
use thiserror::Error;

use crate::report::builder::Report;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("output channel unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Where an exported report goes (clipboard, file, terminal).
pub trait ReportSink: Send + Sync {
    fn deliver(&self, text: &str) -> Result<(), SinkError>;
}

/// Writes the report to a file, replacing its contents.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ReportSink for FileSink {
    fn deliver(&self, text: &str) -> Result<(), SinkError> {
        std::fs::write(&self.path, text)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

impl ReportSink for StdoutSink {
    fn deliver(&self, text: &str) -> Result<(), SinkError> {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(text.as_bytes())?;
        stdout.flush()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutcome {
    pub text: String,
    /// False when there was no sink or delivery failed; the caller should
    /// hand `text` to the user some other way.
    pub delivered: bool,
}

pub fn export(report: &Report, sink: Option<&dyn ReportSink>) -> ExportOutcome {
    let text = render_text(report);
    let delivered = match sink {
        Some(sink) => match sink.deliver(&text) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Report delivery failed, returning text for manual copy");
                false
            }
        },
        None => false,
    };
    ExportOutcome { text, delivered }
}

pub fn render_text(report: &Report) -> String {
    let summary = report.summary();
    let mut out = String::new();

    let _ = writeln!(out, "=== DIAGNOSTICS REPORT ===");
    let _ = writeln!(out, "Generated: {}", report.generated_at.to_rfc3339());
    let _ = writeln!(
        out,
        "SUMMARY: {} ok | {} warning | {} error | {} unknown",
        summary.success, summary.warning, summary.error, summary.unknown
    );

    let _ = writeln!(out, "\n--- SERVICES ---");
    for (name, result) in &report.services {
        let _ = writeln!(
            out,
            "[{}] {} (updated {})",
            name,
            result.status.as_str().to_uppercase(),
            result.updated_at.to_rfc3339()
        );
        if !result.details.is_null() {
            push_indented(&mut out, &result.details);
        }
    }

    let _ = writeln!(
        out,
        "\n--- RECENT ERRORS ({} shown, {} stored, {} in window) ---",
        report.recent_errors.len(),
        report.stats.total,
        report.stats.recent_count
    );
    if report.recent_errors.is_empty() {
        let _ = writeln!(out, "(none)");
    }
    for (i, entry) in report.recent_errors.iter().enumerate() {
        let _ = writeln!(
            out,
            "{}. {} {} {}",
            i + 1,
            entry.timestamp.to_rfc3339(),
            entry.category,
            entry.id
        );
        push_indented(&mut out, &entry.payload);
    }
    out
}

fn push_indented(out: &mut String, value: &Value) {
    let rendered = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    for line in rendered.lines() {
        let _ = writeln!(out, "    {}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::buffer::ErrorStats;
    use crate::health::state::{CheckName, CheckStatus, DiagnosticResult, DiagnosticsMap};
    use chrono::Utc;
    use serde_json::json;

    fn empty_report() -> Report {
        Report {
            generated_at: Utc::now(),
            services: DiagnosticsMap::new(Utc::now()).snapshot(),
            recent_errors: Vec::new(),
            stats: ErrorStats::default(),
        }
    }

    struct RefusingSink;

    impl ReportSink for RefusingSink {
        fn deliver(&self, _text: &str) -> Result<(), SinkError> {
            Err(SinkError::Unavailable("clipboard denied".into()))
        }
    }

    #[test]
    fn test_empty_report_renders() {
        let text = render_text(&empty_report());
        assert!(text.contains("SUMMARY: 0 ok | 0 warning | 0 error | 5 unknown"));
        assert!(text.contains("[environment] UNKNOWN"));
        assert!(text.contains("[mail-provider] UNKNOWN"));
        assert!(text.contains("(none)"));
    }

    #[test]
    fn test_services_precede_errors() {
        let mut report = empty_report();
        report.services.insert(
            CheckName::BackendService,
            DiagnosticResult::new(CheckStatus::Error, json!({ "status": 502 }), Utc::now()),
        );
        let text = render_text(&report);
        let services = text.find("--- SERVICES ---").unwrap();
        let errors = text.find("--- RECENT ERRORS").unwrap();
        assert!(services < errors);
        assert!(text.contains("[backend-service] ERROR"));
        assert!(text.contains("\"status\": 502"));
    }

    #[test]
    fn test_failed_delivery_still_returns_text() {
        let report = empty_report();
        let outcome = export(&report, Some(&RefusingSink as &dyn ReportSink));
        assert!(!outcome.delivered);
        assert_eq!(outcome.text, render_text(&report));

        assert!(!export(&report, None).delivered);
    }

    #[test]
    fn test_file_sink_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");
        let report = empty_report();

        let sink = FileSink::new(&path);
        let outcome = export(&report, Some(&sink as &dyn ReportSink));
        assert!(outcome.delivered);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), outcome.text);
    }
}
