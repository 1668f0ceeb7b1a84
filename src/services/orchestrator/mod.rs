//! Scan orchestration - serializing codes into validate/commit attempts
//!
//! The orchestrator is the central processor that coordinates:
//! - Capture lifecycle (permission request, code stream, session audit)
//! - The at-most-one-in-flight invariant for gateway attempts
//! - Duplicate-scan suppression with per-outcome windows
//! - Result presentation and the best-effort feedback hook
//!
//! It runs as a single task consuming a command channel; camera codes,
//! manual submissions, attempt progress, and the presenter tick interleave
//! through one `tokio::select!` loop. Gateway calls run on a spawned task
//! tagged with the session epoch, so `stop()` stays responsive mid-flight
//! and a late-resolving attempt from a closed session is discarded before
//! it can touch the presenter or the suppression list.
//!
//! Manual entry is also accepted while idle (no capture session); such
//! attempts return the orchestrator to `Idle` instead of `Scanning`.

mod handlers;

use crate::domain::session::ScanSession;
use crate::domain::types::{CheckInRecord, GateContext, ScanState};
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::io::capture::ScanCaptureSource;
use crate::io::egress::SessionEgress;
use crate::io::gateway::CheckInGateway;
use crate::services::presenter::ResultPresenter;
use crate::services::suppression::SuppressionList;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info};

/// Presenter expiry granularity
const PRESENTER_TICK: Duration = Duration::from_millis(100);

/// Best-effort side effect fired on a successful commit (e.g. haptics)
///
/// Implementations must not block; the orchestrator calls this inline on
/// its event loop.
pub trait FeedbackHook: Send + Sync {
    fn on_check_in(&self, record: Option<&CheckInRecord>);
}

/// Why a submission was turned away without a gateway call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Not accepting codes (stopped, awaiting permission, or errored)
    NotScanning,
    /// Another code is already being validated or committed
    InFlight,
    /// The code is inside its suppression window
    Suppressed,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::NotScanning => "not_scanning",
            RejectReason::InFlight => "in_flight",
            RejectReason::Suppressed => "suppressed",
        }
    }
}

/// Resolution of a submission, delivered to callers that asked for one
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Turned away before any gateway call
    Rejected(RejectReason),
    /// The attempt ran to completion (successfully or not)
    Resolved { success: bool, message: String },
}

/// Commands accepted by the orchestrator
#[derive(Debug)]
pub enum ScanCommand {
    Start,
    Stop,
    Submit {
        code: String,
        reply: Option<oneshot::Sender<SubmitOutcome>>,
    },
}

/// Progress of the in-flight attempt task, tagged with the session epoch
#[derive(Debug)]
pub(crate) enum AttemptEvent {
    Validated { epoch: u64, code: String },
    Finished { epoch: u64, code: String, result: AttemptResult },
}

#[derive(Debug)]
pub(crate) enum AttemptResult {
    Committed { message: String, record: Option<CheckInRecord> },
    Invalid { message: String },
    CommitRejected { message: String },
    GatewayFailed { message: String },
}

/// A code currently being validated or committed
pub(crate) struct InFlight {
    pub(crate) code: String,
    pub(crate) started: Instant,
    pub(crate) task: JoinHandle<()>,
    pub(crate) reply: Option<oneshot::Sender<SubmitOutcome>>,
}

/// Cloneable front door to a running orchestrator
#[derive(Clone)]
pub struct ScanHandle {
    cmd_tx: mpsc::Sender<ScanCommand>,
    state_rx: watch::Receiver<ScanState>,
}

impl ScanHandle {
    /// Begin a scan session (idempotent while scanning)
    pub async fn start(&self) {
        let _ = self.cmd_tx.send(ScanCommand::Start).await;
    }

    /// End the scan session, cancelling any in-flight attempt
    pub async fn stop(&self) {
        let _ = self.cmd_tx.send(ScanCommand::Stop).await;
    }

    /// Submit a code and wait for its resolution
    pub async fn submit(&self, code: &str) -> SubmitOutcome {
        let (tx, rx) = oneshot::channel();
        let cmd = ScanCommand::Submit { code: code.to_string(), reply: Some(tx) };
        if self.cmd_tx.send(cmd).await.is_err() {
            return SubmitOutcome::Rejected(RejectReason::NotScanning);
        }
        // A dropped reply means the attempt was cancelled by stop()
        rx.await.unwrap_or(SubmitOutcome::Rejected(RejectReason::NotScanning))
    }

    /// Current orchestrator state
    pub fn state(&self) -> ScanState {
        self.state_rx.borrow().clone()
    }

    /// Observe every state transition
    pub fn watch_state(&self) -> watch::Receiver<ScanState> {
        self.state_rx.clone()
    }
}

/// Central processor for scan sessions and check-in attempts
pub struct ScanOrchestrator {
    pub(crate) capture: Arc<dyn ScanCaptureSource>,
    pub(crate) gateway: Arc<dyn CheckInGateway>,
    pub(crate) presenter: Arc<ResultPresenter>,
    pub(crate) feedback: Option<Arc<dyn FeedbackHook>>,
    pub(crate) metrics: Arc<Metrics>,
    pub(crate) egress: SessionEgress,
    pub(crate) gate: GateContext,
    pub(crate) success_suppress: Duration,
    pub(crate) failure_suppress: Duration,
    /// Bumped on every start/stop; attempts from an older epoch are stale
    pub(crate) epoch: u64,
    pub(crate) suppressed: SuppressionList,
    pub(crate) active: Option<InFlight>,
    pub(crate) session: Option<ScanSession>,
    pub(crate) feed_task: Option<JoinHandle<()>>,
    pub(crate) state_tx: watch::Sender<ScanState>,
    /// Weak sender for the feed task, so the command channel still closes
    /// when the host drops its handles
    pub(crate) cmd_tx: mpsc::WeakSender<ScanCommand>,
    pub(crate) cmd_rx: mpsc::Receiver<ScanCommand>,
    pub(crate) attempt_tx: mpsc::Sender<AttemptEvent>,
    pub(crate) attempt_rx: mpsc::Receiver<AttemptEvent>,
}

/// Create an orchestrator and its handle
///
/// The orchestrator must be driven by spawning [`ScanOrchestrator::run`].
pub fn create_orchestrator(
    config: &Config,
    capture: Arc<dyn ScanCaptureSource>,
    gateway: Arc<dyn CheckInGateway>,
    presenter: Arc<ResultPresenter>,
    feedback: Option<Arc<dyn FeedbackHook>>,
    metrics: Arc<Metrics>,
) -> (ScanHandle, ScanOrchestrator) {
    let (cmd_tx, cmd_rx) = mpsc::channel(config.command_buffer());
    let (attempt_tx, attempt_rx) = mpsc::channel(config.command_buffer());
    let (state_tx, state_rx) = watch::channel(ScanState::Idle);

    let weak_cmd_tx = cmd_tx.downgrade();
    let handle = ScanHandle { cmd_tx, state_rx };
    let orchestrator = ScanOrchestrator {
        capture,
        gateway,
        presenter,
        feedback,
        metrics,
        egress: SessionEgress::new(config.egress_file()),
        gate: config.gate_context(),
        success_suppress: Duration::from_millis(config.success_suppress_ms()),
        failure_suppress: Duration::from_millis(config.failure_suppress_ms()),
        epoch: 0,
        suppressed: SuppressionList::new(),
        active: None,
        session: None,
        feed_task: None,
        state_tx,
        cmd_tx: weak_cmd_tx,
        cmd_rx,
        attempt_tx,
        attempt_rx,
    };
    (handle, orchestrator)
}

impl ScanOrchestrator {
    /// Run the orchestrator, consuming commands until the channel closes
    pub async fn run(mut self) {
        info!("scan_orchestrator_started");

        let mut tick = interval(PRESENTER_TICK);

        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(ScanCommand::Start) => self.handle_start().await,
                        Some(ScanCommand::Stop) => self.handle_stop(),
                        Some(ScanCommand::Submit { code, reply }) => {
                            self.handle_submit(code, reply);
                        }
                        None => break, // All handles dropped
                    }
                }
                Some(event) = self.attempt_rx.recv() => {
                    self.handle_attempt_event(event);
                }
                _ = tick.tick() => {
                    self.presenter.tick();
                }
            }
        }

        self.handle_stop();
        info!("scan_orchestrator_stopped");
    }

    pub(crate) fn set_state(&self, next: ScanState) {
        let prev = self.state_tx.send_replace(next.clone());
        if prev != next {
            debug!(from = %prev, to = %next, "scan_state_changed");
        }
    }

    pub(crate) fn state(&self) -> ScanState {
        self.state_tx.borrow().clone()
    }

    /// State to return to after an attempt resolves
    pub(crate) fn resume_state(&self) -> ScanState {
        if self.session.is_some() {
            ScanState::Scanning
        } else {
            ScanState::Idle
        }
    }
}
