//! Report generation.
//!
//! # Data Flow
//! ```text
//! DiagnosticsMap snapshot + ErrorBuffer snapshot + stats
//!     → builder.rs (Report, pure)
//!     → export.rs (text or JSON rendering)
//!     → ReportSink (clipboard, file, stdout) when the host has one
//! ```
//!
//! # Design Decisions
//! - Building a report never touches the network or mutates state
//! - Export never fails; when delivery fails the caller still gets the text

pub mod builder;
pub mod export;

pub use builder::{build_report, Report, ReportSummary};
pub use export::{export, render_text, ExportOutcome, FileSink, ReportSink, SinkError, StdoutSink};
