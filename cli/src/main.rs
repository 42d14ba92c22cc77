//! VibeAudit command-line client.
//!
//! Drives one live design audit against the remote worker, or turns a saved
//! final payload into a PDF report.
//!
//! Usage:
//!   vibeaudit run --url https://example.com --max-pages 3 --intent "SaaS landing page"
//!   vibeaudit report --payload example.com.json --out-dir reports

mod live;
mod output;

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use vibeaudit_config::ClientConfig;
use vibeaudit_contracts::{
    error::{AuditError, AuditResult},
    payload::FinalPayload,
    wire::{parse_frame, WorkerMessage},
};
use vibeaudit_export::Exporter;
use vibeaudit_report::aggregate;

// ── CLI definition ────────────────────────────────────────────────────────────

/// VibeAudit: AI-driven website design audits.
#[derive(Parser)]
#[command(
    name = "vibeaudit",
    about = "Run website design audits and export PDF reports",
    long_about = "Connects to a VibeAudit worker, streams the audit as it runs,\n\
                  and exports the aggregated scores and findings as a PDF report."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a live audit session and export the report when it completes.
    Run(RunArgs),
    /// Aggregate a saved final payload and export the report.
    Report(ReportArgs),
}

#[derive(Args)]
pub struct RunArgs {
    /// Site to audit (http or https).
    #[arg(long)]
    pub url: Option<String>,
    /// Pages to crawl, 1 to 5. Defaults to the configured budget.
    #[arg(long)]
    pub max_pages: Option<u32>,
    /// What the site is for and who it serves.
    #[arg(long)]
    pub intent: Option<String>,
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Worker WebSocket endpoint. Overrides the configured one.
    #[arg(long)]
    pub endpoint: Option<String>,
    /// Fail the session after this many seconds without a worker message.
    #[arg(long)]
    pub idle_timeout: Option<u64>,
    #[arg(long)]
    pub out_dir: Option<PathBuf>,
    /// Record every worker message as JSON Lines.
    #[arg(long)]
    pub transcript: Option<PathBuf>,
    /// Save the worker's final payload as JSON.
    #[arg(long)]
    pub payload_out: Option<PathBuf>,
}

#[derive(Args)]
pub struct ReportArgs {
    /// A saved final payload, or a saved `complete` frame.
    #[arg(long)]
    pub payload: PathBuf,
    #[arg(long)]
    pub out_dir: Option<PathBuf>,
    #[arg(long)]
    pub config: Option<PathBuf>,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Set RUST_LOG=debug for per-message detail.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Run(args) => match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime.block_on(live::run(args)),
            Err(e) => Err(AuditError::ConnectionError {
                reason: format!("failed to start async runtime: {e}"),
            }),
        },
        Command::Report(args) => report(args),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(exit_code(&e));
    }
}

/// 2 for missing parameters, 1 for everything else.
fn exit_code(error: &AuditError) -> i32 {
    match error {
        AuditError::MissingSessionParameters { .. } => {
            eprintln!("usage: vibeaudit run --url <URL> [--max-pages N] [--intent TEXT]");
            2
        }
        _ => 1,
    }
}

// ── Shared helpers ────────────────────────────────────────────────────────────

pub fn load_config(path: Option<&Path>) -> AuditResult<ClientConfig> {
    ClientConfig::load(path)
}

/// Aggregate, print, and export one payload.
pub fn export_payload(
    payload: &FinalPayload,
    config: &ClientConfig,
    out_dir: Option<&Path>,
) -> AuditResult<PathBuf> {
    let report = aggregate(payload);
    output::print_summary(&report);

    let document = Exporter::new(config.export.margin_mm).export(&report)?;
    let dir = out_dir.unwrap_or(config.export.output_dir.as_path());
    let path = document.write_to(dir)?;
    println!("Report: {} ({} pages)", path.display(), document.pages);
    Ok(path)
}

fn report(args: ReportArgs) -> AuditResult<()> {
    let config = load_config(args.config.as_deref())?;
    let payload = read_payload(&args.payload)?;
    export_payload(&payload, &config, args.out_dir.as_deref())?;
    Ok(())
}

/// Read a final payload, accepting a whole `complete` frame as well.
fn read_payload(path: &Path) -> AuditResult<FinalPayload> {
    let text = std::fs::read_to_string(path).map_err(|e| AuditError::PayloadDecode {
        reason: format!("failed to read '{}': {e}", path.display()),
    })?;
    let decode_err = |e: serde_json::Error| AuditError::PayloadDecode {
        reason: format!("'{}' is not a final payload: {e}", path.display()),
    };

    let value: serde_json::Value = serde_json::from_str(&text).map_err(decode_err)?;
    if value.get("event").and_then(|e| e.as_str()) == Some("complete") {
        return match parse_frame(&text)? {
            WorkerMessage::Complete(completion) => Ok(completion.data),
            _ => Err(AuditError::PayloadDecode {
                reason: format!("'{}' is not a complete frame", path.display()),
            }),
        };
    }
    serde_json::from_value(value).map_err(decode_err)
}
