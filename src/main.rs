//! scangate - check-in scanning simulator
//!
//! Drives the scan orchestrator against a roster-backed gateway, with
//! stdin lines standing in for decoded QR codes. Useful for exercising a
//! gate setup without a backend deployment.
//!
//! Module structure:
//! - `domain/` - Core business types (states, outcomes, sessions)
//! - `io/` - External seams (gateway, capture, roster, egress)
//! - `services/` - Business logic (orchestrator, presenter, suppression)
//! - `infra/` - Infrastructure (config, metrics)
//!
//! Input commands:
//! - `<code>` - inject a decoded scan
//! - `/start` / `/stop` - control the capture session
//! - `/quit` - exit

use clap::Parser;
use scangate::domain::types::{CheckInRecord, ScanState};
use scangate::infra::{Config, Metrics};
use scangate::io::{ChannelCaptureSource, RosterGateway};
use scangate::services::{create_orchestrator, FeedbackHook, ResultPresenter};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// scangate - event ticketing check-in scanner
#[derive(Parser, Debug)]
#[command(name = "scangate", version, about)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "config/dev.toml")]
    config: String,
}

/// Logs where a real gate would buzz
struct LogFeedback;

impl FeedbackHook for LogFeedback {
    fn on_check_in(&self, record: Option<&CheckInRecord>) {
        info!(
            attendee = %record.map(|r| r.attendee.as_str()).unwrap_or("-"),
            "haptic_feedback"
        );
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured logging with configurable level via RUST_LOG env var
    // Default: INFO, use RUST_LOG=debug for full event visibility
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!("scangate starting");

    let args = Args::parse();
    let config = Config::load_from_path(&args.config);

    info!(
        config_file = %config.config_file(),
        gate_id = %config.gate_id().unwrap_or("-"),
        roster_file = %config.roster_file(),
        egress_file = %config.egress_file(),
        success_suppress_ms = %config.success_suppress_ms(),
        failure_suppress_ms = %config.failure_suppress_ms(),
        "config_loaded"
    );

    let gateway = Arc::new(RosterGateway::from_file(config.roster_file())?);
    let capture = Arc::new(ChannelCaptureSource::new(true));
    let presenter = Arc::new(ResultPresenter::from_millis(
        config.display_success_ms(),
        config.display_failure_ms(),
    ));
    let metrics = Arc::new(Metrics::new());

    let (handle, orchestrator) = create_orchestrator(
        &config,
        capture.clone(),
        gateway.clone(),
        presenter.clone(),
        Some(Arc::new(LogFeedback)),
        metrics.clone(),
    );
    tokio::spawn(orchestrator.run());

    // Log state transitions
    let mut state_rx = handle.watch_state();
    tokio::spawn(async move {
        while state_rx.changed().await.is_ok() {
            let state = state_rx.borrow_and_update().clone();
            info!(state = %state, "state_changed");
        }
    });

    // Log presented results as a stand-in for the result banner
    let mut result_rx = presenter.subscribe();
    tokio::spawn(async move {
        while result_rx.changed().await.is_ok() {
            let current = result_rx.borrow_and_update().clone();
            match current {
                Some(result) => info!(
                    success = %result.success,
                    message = %result.message,
                    attendee = %result
                        .record
                        .as_ref()
                        .map(|r| r.attendee.as_str())
                        .unwrap_or("-"),
                    "result_displayed"
                ),
                None => info!("result_cleared"),
            }
        }
    });

    // Periodic metrics reporting
    let metrics_clone = metrics.clone();
    let metrics_interval = config.metrics_interval_secs();
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(metrics_interval));
        loop {
            interval.tick().await;
            metrics_clone.report().log();
        }
    });

    handle.start().await;

    // Feed stdin lines into the capture source until EOF or /quit
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        match input {
            "" => {}
            "/quit" => break,
            "/start" => handle.start().await,
            "/stop" => handle.stop().await,
            code => {
                if capture.inject(code) == 0 {
                    info!(code = %code, "scan_ignored_not_capturing");
                }
            }
        }
    }

    handle.stop().await;
    // Let the orchestrator close and egress the session before exiting
    let mut state_rx = handle.watch_state();
    let _ = state_rx.wait_for(|s| *s == ScanState::Idle).await;

    info!(remaining = %gateway.remaining(), "scangate shutdown complete");
    Ok(())
}
