//! partsdesk-rc - Order Reconciliation Service
//!
//! Collaborator glue around the reconciliation core: loads config,
//! reads a JSON intake file of `{code, classification}` jobs (as handed
//! over by the form/chat collaborators), runs the batch, persists a
//! snapshot for each success, and prints the partial-failure summary.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use partsdesk_common::Config;
use partsdesk_rc::services::snapshot::write_snapshot;
use partsdesk_rc::{HttpTransport, Reconciler, ReconcileJob, RecordStoreClient, ThrottleGate};

#[derive(Parser, Debug)]
#[command(name = "partsdesk-rc", about = "Reconcile order classifications")]
struct Args {
    /// TOML config file; PARTSDESK_* environment variables override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON intake file: an array of {"code", "classification"} jobs
    #[arg(long)]
    intake: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting partsdesk-rc (Order Reconciliation)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?;

    let intake = std::fs::read_to_string(&args.intake)
        .with_context(|| format!("Read intake {} failed", args.intake.display()))?;
    let jobs: Vec<ReconcileJob> =
        serde_json::from_str(&intake).context("Parse intake file failed")?;
    info!("Intake loaded: {} record(s)", jobs.len());

    // One gate per process: the rate budget belongs to the credential,
    // not to any individual caller.
    let gate = ThrottleGate::new(Duration::from_millis(config.min_gap_ms));
    let transport = HttpTransport::new(
        &config.api_base_url,
        &config.access_token,
        gate,
        config.max_attempts,
    )?;
    let store = RecordStoreClient::new(std::sync::Arc::new(transport));
    let reconciler = Reconciler::new(store, config.concurrency);

    let results = reconciler.run(jobs.clone()).await;

    let mut failed = 0usize;
    for (result, job) in results.iter().zip(jobs.iter()) {
        if result.ok {
            if let Some(record_id) = result.record_id {
                if let Err(e) = write_snapshot(
                    &config.snapshot_dir,
                    record_id,
                    &result.code,
                    &job.classification,
                ) {
                    warn!(code = %result.code, error = %e, "Snapshot write failed");
                }
            }
            info!(code = %result.code, "OK");
        } else {
            failed += 1;
            error!(
                code = %result.code,
                reason = result.reason.as_deref().unwrap_or("unknown"),
                "FAILED"
            );
        }
    }

    info!(
        "Batch finished: {} ok, {} failed",
        results.len() - failed,
        failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}
