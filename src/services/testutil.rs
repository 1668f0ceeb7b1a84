//! Shared fixtures for service tests
//!
//! Provides a scriptable gateway (optionally gated on semaphores so tests
//! can hold an attempt in flight) and a spawned-orchestrator harness.

use crate::domain::error::GatewayError;
use crate::domain::types::{
    CheckInRecord, CommitOutcome, GateContext, ScanState, ValidationOutcome,
};
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::io::capture::ChannelCaptureSource;
use crate::io::gateway::CheckInGateway;
use crate::services::orchestrator::{create_orchestrator, FeedbackHook, ScanHandle};
use crate::services::presenter::ResultPresenter;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::timeout;

/// Gateway behavior for one test
pub(crate) enum Script {
    /// Validate passes, commit succeeds with a record
    Accept,
    /// Validation rejects with the given reason
    Invalid(Option<String>),
    /// Validation fails at the transport level
    TransportErr,
    /// Commit fails with a backend error
    BackendErr(String),
    /// Commit is refused by the backend
    CommitRejected(String),
}

/// Scriptable gateway that counts calls and can block inside them
pub(crate) struct TestGateway {
    script: Script,
    validate_calls: AtomicUsize,
    commit_calls: AtomicUsize,
    last_code: Mutex<Option<String>>,
    validate_gate: Option<Arc<Semaphore>>,
    commit_gate: Option<Arc<Semaphore>>,
}

impl TestGateway {
    pub(crate) fn new(script: Script) -> Self {
        Self {
            script,
            validate_calls: AtomicUsize::new(0),
            commit_calls: AtomicUsize::new(0),
            last_code: Mutex::new(None),
            validate_gate: None,
            commit_gate: None,
        }
    }

    /// A gateway whose calls block until the returned semaphores get permits
    pub(crate) fn gated(script: Script) -> (Self, Arc<Semaphore>, Arc<Semaphore>) {
        let validate_gate = Arc::new(Semaphore::new(0));
        let commit_gate = Arc::new(Semaphore::new(0));
        let mut gateway = Self::new(script);
        gateway.validate_gate = Some(validate_gate.clone());
        gateway.commit_gate = Some(commit_gate.clone());
        (gateway, validate_gate, commit_gate)
    }

    pub(crate) fn validate_calls(&self) -> usize {
        self.validate_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn commit_calls(&self) -> usize {
        self.commit_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_validated_code(&self) -> Option<String> {
        self.last_code.lock().clone()
    }
}

#[async_trait]
impl CheckInGateway for TestGateway {
    async fn validate(&self, code: &str) -> Result<ValidationOutcome, GatewayError> {
        self.validate_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_code.lock() = Some(code.to_string());
        if let Some(gate) = &self.validate_gate {
            gate.acquire().await.unwrap().forget();
        }
        match &self.script {
            Script::Invalid(reason) => Ok(ValidationOutcome::Invalid { reason: reason.clone() }),
            Script::TransportErr => {
                Err(GatewayError::Transport("connection refused".to_string()))
            }
            _ => Ok(ValidationOutcome::Valid),
        }
    }

    async fn commit(
        &self,
        _code: &str,
        _context: &GateContext,
    ) -> Result<CommitOutcome, GatewayError> {
        self.commit_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.commit_gate {
            gate.acquire().await.unwrap().forget();
        }
        match &self.script {
            Script::CommitRejected(message) => {
                Ok(CommitOutcome::Rejected { message: message.clone() })
            }
            Script::BackendErr(message) => Err(GatewayError::Backend(message.clone())),
            _ => Ok(CommitOutcome::Completed {
                message: "Check-in recorded".to_string(),
                record: Some(CheckInRecord {
                    attendee: "Ada Lovelace".to_string(),
                    ticket_tier: Some("GA".to_string()),
                    checked_in_at: Utc::now(),
                }),
            }),
        }
    }
}

/// Feedback hook that counts firings
pub(crate) struct CountingFeedback {
    pub(crate) fired: AtomicUsize,
}

impl CountingFeedback {
    pub(crate) fn new() -> Self {
        Self { fired: AtomicUsize::new(0) }
    }
}

impl FeedbackHook for CountingFeedback {
    fn on_check_in(&self, _record: Option<&CheckInRecord>) {
        self.fired.fetch_add(1, Ordering::SeqCst);
    }
}

/// A running orchestrator plus the collaborators tests assert against
pub(crate) struct Harness {
    pub(crate) handle: ScanHandle,
    pub(crate) capture: Arc<ChannelCaptureSource>,
    pub(crate) presenter: Arc<ResultPresenter>,
    pub(crate) metrics: Arc<Metrics>,
    pub(crate) egress_path: PathBuf,
    _tmp: tempfile::TempDir,
    _task: JoinHandle<()>,
}

impl Harness {
    pub(crate) async fn start_scanning(&self) {
        self.handle.start().await;
        self.wait_state(ScanState::Scanning).await;
    }

    pub(crate) async fn wait_state(&self, want: ScanState) {
        let mut rx = self.handle.watch_state();
        let _ = timeout(Duration::from_secs(2), rx.wait_for(|s| *s == want))
            .await
            .expect("timed out waiting for state")
            .expect("orchestrator gone");
    }
}

pub(crate) async fn spawn_harness(gateway: Arc<TestGateway>) -> Harness {
    spawn_harness_opts(gateway, true, None).await
}

pub(crate) async fn spawn_harness_opts(
    gateway: Arc<TestGateway>,
    granted: bool,
    feedback: Option<Arc<dyn FeedbackHook>>,
) -> Harness {
    let tmp = tempfile::tempdir().unwrap();
    let egress_path = tmp.path().join("sessions.jsonl");
    let config = Config::default()
        .with_egress_file(egress_path.to_str().unwrap())
        .with_gate("GATE_TEST");

    let capture = Arc::new(ChannelCaptureSource::new(granted));
    let presenter = Arc::new(ResultPresenter::from_millis(
        config.display_success_ms(),
        config.display_failure_ms(),
    ));
    let metrics = Arc::new(Metrics::new());

    let (handle, orchestrator) = create_orchestrator(
        &config,
        capture.clone(),
        gateway,
        presenter.clone(),
        feedback,
        metrics.clone(),
    );
    let task = tokio::spawn(orchestrator.run());

    Harness { handle, capture, presenter, metrics, egress_path, _tmp: tmp, _task: task }
}
