//! Diagnostics collector host binary.
//!
//! Runs the collector against the dependencies named in the process
//! environment and prints what it found.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use diagnostics_collector::capabilities::{
    AnonymousIdentity, EnvSettings, FileSessionStore, MemorySessionStore, ReqwestNetwork, SessionStore,
};
use diagnostics_collector::config::{load_config, CollectorConfig};
use diagnostics_collector::report::{render_text, FileSink, ReportSummary};
use diagnostics_collector::runner::{PeriodicRunner, Shutdown};
use diagnostics_collector::Collector;

#[derive(Parser)]
#[command(name = "diagnostics-collector")]
#[command(about = "Health checks and failure capture for the wedding planner's dependencies", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Prefix prepended to every settings key looked up in the environment.
    #[arg(long, default_value = "")]
    env_prefix: String,

    /// File backing the session store (breaker flag). In-memory when omitted.
    #[arg(long)]
    session_file: Option<PathBuf>,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 15)]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every check once and print the report
    Run {
        /// Print the report as JSON instead of text
        #[arg(long)]
        json: bool,
        /// Also write the report to this file
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Re-run diagnostics periodically until Ctrl+C
    Watch {
        /// Seconds between runs; overrides the configured interval
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Fetch the remote summary through the session breaker
    Summary,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => CollectorConfig::default(),
    };

    let store: Arc<dyn SessionStore> = match &cli.session_file {
        Some(path) => Arc::new(FileSessionStore::new(path)),
        None => Arc::new(MemorySessionStore::new()),
    };

    let collector = Arc::new(
        Collector::builder(config)
            .settings(Arc::new(EnvSettings::with_prefix(cli.env_prefix.clone())))
            .network(Arc::new(ReqwestNetwork::with_timeout(Duration::from_secs(cli.timeout))?))
            .identity(Arc::new(AnonymousIdentity))
            .session_store(store)
            .build()?,
    );
    if let Err(e) = collector.install() {
        eprintln!("logging already initialized: {}", e);
    }

    tracing::info!("diagnostics-collector v{} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Run { json, out } => {
            collector.run_diagnostics().await;
            let report = collector.build_report();
            let text = if json {
                report.to_json_pretty()?
            } else {
                render_text(&report)
            };
            println!("{}", text);

            if let Some(path) = out {
                let outcome = collector.export_report_to(&FileSink::new(&path));
                if !outcome.delivered {
                    eprintln!("Could not write report to {}", path.display());
                }
            }
        }
        Commands::Watch { interval } => {
            let secs = interval.unwrap_or(collector.config().schedule.interval_secs).max(1);
            let shutdown = Shutdown::new();
            let runner = PeriodicRunner::new(collector.clone(), Duration::from_secs(secs));
            let handle = tokio::spawn(runner.run(shutdown.subscribe(), |services| {
                let summary = ReportSummary::of(services);
                println!(
                    "SUMMARY: {} ok | {} warning | {} error | {} unknown",
                    summary.success, summary.warning, summary.error, summary.unknown
                );
            }));

            tokio::signal::ctrl_c().await?;
            tracing::info!("Shutdown signal received");
            shutdown.trigger();
            handle.await?;
            println!("{}", collector.export_report().text);
        }
        Commands::Summary => {
            let outcome = collector.summary().fetch().await;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
    }

    Ok(())
}
