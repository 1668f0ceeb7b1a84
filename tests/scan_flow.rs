//! End-to-end scan flow tests
//!
//! Wires the public pieces together the way the binary does: channel
//! capture source, roster gateway, presenter, and the orchestrator.

use scangate::domain::types::{PresentedResult, ScanState};
use scangate::infra::{Config, Metrics};
use scangate::io::{ChannelCaptureSource, RosterGateway, RosterTicket};
use scangate::services::{
    create_orchestrator, ManualEntryChannel, ManualEntryOutcome, ResultPresenter, ScanHandle,
    SubmitOutcome,
};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::timeout;

struct Rig {
    handle: ScanHandle,
    capture: Arc<ChannelCaptureSource>,
    presenter: Arc<ResultPresenter>,
    metrics: Arc<Metrics>,
    gateway: Arc<RosterGateway>,
    egress_path: PathBuf,
    _tmp: TempDir,
}

async fn rig() -> Rig {
    let tmp = TempDir::new().unwrap();
    let egress_path = tmp.path().join("sessions.jsonl");

    let config_path = tmp.path().join("gate.toml");
    let mut file = fs::File::create(&config_path).unwrap();
    write!(
        file,
        "[gate]\ngate_id = \"GATE_E2E\"\n\n[egress]\nfile = \"{}\"\n",
        egress_path.display()
    )
    .unwrap();
    let config = Config::from_file(&config_path).unwrap();

    let gateway = Arc::new(RosterGateway::new(vec![
        RosterTicket {
            code: "TICKET-1".to_string(),
            attendee: "Ada Lovelace".to_string(),
            tier: Some("VIP".to_string()),
        },
        RosterTicket {
            code: "TICKET-2".to_string(),
            attendee: "Alan Turing".to_string(),
            tier: None,
        },
    ]));
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
        None,
        metrics.clone(),
    );
    tokio::spawn(orchestrator.run());

    Rig { handle, capture, presenter, metrics, gateway, egress_path, _tmp: tmp }
}

async fn wait_state(rig: &Rig, want: ScanState) {
    let mut rx = rig.handle.watch_state();
    let _ = timeout(Duration::from_secs(2), rx.wait_for(|s| *s == want))
        .await
        .expect("timed out waiting for state")
        .expect("orchestrator gone");
}

async fn wait_presented(rig: &Rig) -> PresentedResult {
    let mut rx = rig.presenter.subscribe();
    let result = timeout(Duration::from_secs(2), rx.wait_for(|r| r.is_some()))
        .await
        .expect("timed out waiting for presented result")
        .expect("presenter gone")
        .clone()
        .unwrap();
    result
}

#[tokio::test]
async fn test_camera_scan_checks_in_attendee() {
    let rig = rig().await;

    rig.handle.start().await;
    wait_state(&rig, ScanState::Scanning).await;

    assert_eq!(rig.capture.inject("TICKET-1"), 1);

    let result = wait_presented(&rig).await;
    assert!(result.success);
    assert_eq!(result.message, "Check-in recorded");
    assert_eq!(result.record.as_ref().unwrap().attendee, "Ada Lovelace");
    assert_eq!(rig.gateway.remaining(), 1);
    assert_eq!(rig.metrics.committed_total(), 1);
}

#[tokio::test]
async fn test_duplicate_frame_is_suppressed() {
    let rig = rig().await;

    rig.handle.start().await;
    wait_state(&rig, ScanState::Scanning).await;

    rig.capture.inject("TICKET-1");
    let result = wait_presented(&rig).await;
    assert!(result.success);

    // The camera loop re-decodes the same frame moments later
    rig.capture.inject("TICKET-1");
    let found = timeout(Duration::from_secs(2), async {
        while rig.metrics.suppressed_total() == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(found.is_ok(), "second scan was not suppressed");

    // Exactly one check-in happened
    assert_eq!(rig.gateway.remaining(), 1);
    assert_eq!(rig.metrics.committed_total(), 1);
}

#[tokio::test]
async fn test_used_ticket_rejected_in_next_session() {
    let rig = rig().await;

    rig.handle.start().await;
    wait_state(&rig, ScanState::Scanning).await;
    let outcome = rig.handle.submit("TICKET-1").await;
    assert!(matches!(outcome, SubmitOutcome::Resolved { success: true, .. }));

    // Suppression does not survive the session, but the backend remembers
    rig.handle.stop().await;
    wait_state(&rig, ScanState::Idle).await;
    rig.handle.start().await;
    wait_state(&rig, ScanState::Scanning).await;

    let outcome = rig.handle.submit("TICKET-1").await;
    assert_eq!(
        outcome,
        SubmitOutcome::Resolved {
            success: false,
            message: "Ticket already used".to_string()
        }
    );
}

#[tokio::test]
async fn test_unknown_code_presents_reason() {
    let rig = rig().await;

    rig.handle.start().await;
    wait_state(&rig, ScanState::Scanning).await;

    let outcome = rig.handle.submit("NOT-A-TICKET").await;
    assert_eq!(
        outcome,
        SubmitOutcome::Resolved {
            success: false,
            message: "Unknown ticket code".to_string()
        }
    );

    let result = rig.presenter.current().unwrap();
    assert!(!result.success);
    assert_eq!(rig.gateway.remaining(), 2);
}

#[tokio::test]
async fn test_manual_entry_empty_input_is_inert() {
    let rig = rig().await;
    let channel = ManualEntryChannel::new(rig.handle.clone());

    assert_eq!(channel.submit("   ").await, ManualEntryOutcome::EmptyInput);

    assert!(!channel.is_pending());
    assert_eq!(rig.metrics.submitted_total(), 0);
}

#[tokio::test]
async fn test_manual_entry_checks_in_while_scanning() {
    let rig = rig().await;

    rig.handle.start().await;
    wait_state(&rig, ScanState::Scanning).await;

    let channel = ManualEntryChannel::new(rig.handle.clone());
    let outcome = channel.submit(" TICKET-2 ").await;

    assert_eq!(
        outcome,
        ManualEntryOutcome::Resolved { success: true, message: "Check-in recorded".to_string() }
    );
    assert_eq!(rig.gateway.remaining(), 1);
}

#[tokio::test]
async fn test_session_audit_written_on_stop() {
    let rig = rig().await;

    rig.handle.start().await;
    wait_state(&rig, ScanState::Scanning).await;
    rig.handle.submit("TICKET-1").await;
    rig.handle.submit("NOT-A-TICKET").await;
    rig.handle.stop().await;
    wait_state(&rig, ScanState::Idle).await;

    let content = fs::read_to_string(&rig.egress_path).unwrap();
    let session: serde_json::Value = serde_json::from_str(content.trim()).unwrap();

    assert_eq!(session["gate"], "GATE_E2E");
    assert_eq!(session["sub"], 2);
    assert_eq!(session["ok"], 1);
    assert_eq!(session["fail"], 1);
    assert_eq!(session["codes"], serde_json::json!(["TICKET-1"]));
    assert!(session["t1"].is_u64());
}
