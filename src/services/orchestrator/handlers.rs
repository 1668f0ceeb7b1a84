//! Command and attempt-event handlers for the orchestrator
//!
//! Each handler mutates session state and triggers side effects
//! (gateway attempts, presentation, suppression, egress).

use super::{
    AttemptEvent, AttemptResult, InFlight, RejectReason, ScanCommand, ScanOrchestrator,
    SubmitOutcome,
};
use crate::domain::error::GatewayError;
use crate::domain::session::{epoch_ms, ScanSession, SessionEvent, SessionEventKind};
use crate::domain::types::{CommitOutcome, GateContext, ScanState, ValidationOutcome};
use crate::io::gateway::CheckInGateway;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// Fallback when validation rejects without a reason
const FALLBACK_INVALID_MSG: &str = "Invalid code";
/// Fallback when the gateway cannot be reached
const FALLBACK_TRANSPORT_MSG: &str = "Check-in service unreachable";

impl ScanOrchestrator {
    /// Handle a start command: acquire permission and open the code stream
    pub(crate) async fn handle_start(&mut self) {
        match self.state() {
            // Already holding the capture device: a second acquisition
            // would violate its exclusivity, so this is a no-op.
            ScanState::Scanning | ScanState::Validating | ScanState::Committing => {
                debug!("start_ignored_already_scanning");
                return;
            }
            _ => {}
        }

        self.set_state(ScanState::AwaitingPermission);

        if !self.capture.request_permission().await {
            warn!("capture_permission_denied");
            self.set_state(ScanState::Error("permission denied".to_string()));
            return;
        }

        self.epoch += 1;
        self.suppressed.clear();

        let session = ScanSession::new(self.gate.clone());
        info!(
            sid = %session.sid,
            gate_id = %self.gate.gate_id.as_deref().unwrap_or("-"),
            "scan_session_started"
        );
        self.session = Some(session);

        // Pipe decoded codes into the command loop for this session
        let mut code_rx = self.capture.open();
        let cmd_tx = self.cmd_tx.clone();
        self.feed_task = Some(tokio::spawn(async move {
            loop {
                match code_rx.recv().await {
                    Ok(code) => {
                        let Some(tx) = cmd_tx.upgrade() else { break };
                        let cmd = ScanCommand::Submit { code, reply: None };
                        if tx.send(cmd).await.is_err() {
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(dropped)) => {
                        warn!(dropped = %dropped, "capture_feed_lagged");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        }));

        self.set_state(ScanState::Scanning);
    }

    /// Handle a stop command: cancel in-flight work and close the session
    pub(crate) fn handle_stop(&mut self) {
        // Invalidate anything still in flight; a late resolution from this
        // epoch must not reach the presenter or the suppression list.
        self.epoch += 1;

        if let Some(feed) = self.feed_task.take() {
            feed.abort();
        }
        if let Some(inflight) = self.active.take() {
            debug!(code = %inflight.code, "inflight_attempt_cancelled");
            inflight.task.abort();
        }
        self.suppressed.clear();

        if let Some(mut session) = self.session.take() {
            session.complete();
            info!(
                sid = %session.sid,
                submitted = %session.submitted,
                committed = %session.committed,
                failed = %session.failed,
                "scan_session_closed"
            );
            self.egress.write_session(&session);
        }

        self.set_state(ScanState::Idle);
    }

    /// Handle a submitted code from the camera feed or manual entry
    pub(crate) fn handle_submit(
        &mut self,
        code: String,
        reply: Option<oneshot::Sender<SubmitOutcome>>,
    ) {
        self.suppressed.evict_expired();

        if self.active.is_some() {
            self.reject(code, RejectReason::InFlight, reply);
            return;
        }

        // Accepted while scanning, or while idle for manual entry
        let accepting = match self.state() {
            ScanState::Scanning => true,
            ScanState::Idle => reply.is_some(),
            _ => false,
        };
        if !accepting {
            self.reject(code, RejectReason::NotScanning, reply);
            return;
        }

        if self.suppressed.contains(&code) {
            self.reject(code, RejectReason::Suppressed, reply);
            return;
        }

        self.metrics.record_submitted();
        if let Some(session) = self.session.as_mut() {
            session.submitted += 1;
            session.add_event(
                SessionEvent::new(SessionEventKind::Submitted, epoch_ms()).with_code(&code),
            );
        }

        info!(code = %code, "attempt_started");
        self.presenter.clear();
        self.set_state(ScanState::Validating);

        let gateway = self.gateway.clone();
        let attempt_tx = self.attempt_tx.clone();
        let context = self.gate.clone();
        let epoch = self.epoch;
        let attempt_code = code.clone();
        let task = tokio::spawn(async move {
            let result = run_attempt(gateway, &attempt_code, &context, epoch, &attempt_tx).await;
            let event = AttemptEvent::Finished { epoch, code: attempt_code, result };
            let _ = attempt_tx.send(event).await;
        });

        self.active = Some(InFlight { code, started: Instant::now(), task, reply });
    }

    fn reject(
        &mut self,
        code: String,
        reason: RejectReason,
        reply: Option<oneshot::Sender<SubmitOutcome>>,
    ) {
        debug!(code = %code, reason = %reason.as_str(), "submit_rejected");

        match reason {
            RejectReason::Suppressed => {
                self.metrics.record_suppressed();
                if let Some(session) = self.session.as_mut() {
                    session.suppressed += 1;
                    session.add_event(
                        SessionEvent::new(SessionEventKind::Suppressed, epoch_ms())
                            .with_code(&code),
                    );
                }
            }
            RejectReason::InFlight => {
                self.metrics.record_rejected_busy();
                if let Some(session) = self.session.as_mut() {
                    session.rejected += 1;
                    session.add_event(
                        SessionEvent::new(SessionEventKind::RejectedBusy, epoch_ms())
                            .with_code(&code),
                    );
                }
            }
            RejectReason::NotScanning => {}
        }

        if let Some(tx) = reply {
            let _ = tx.send(SubmitOutcome::Rejected(reason));
        }
    }

    /// Handle progress reported by the in-flight attempt task
    pub(crate) fn handle_attempt_event(&mut self, event: AttemptEvent) {
        match event {
            AttemptEvent::Validated { epoch, code } => {
                if epoch != self.epoch {
                    debug!(code = %code, "stale_attempt_discarded");
                    return;
                }
                debug!(code = %code, "code_validated");
                self.set_state(ScanState::Committing);
            }
            AttemptEvent::Finished { epoch, code, result } => {
                if epoch != self.epoch {
                    debug!(code = %code, "stale_attempt_discarded");
                    return;
                }
                self.finish_attempt(code, result);
            }
        }
    }

    fn finish_attempt(&mut self, code: String, result: AttemptResult) {
        let Some(inflight) = self.active.take() else {
            debug!(code = %code, "attempt_finished_without_inflight");
            return;
        };
        let latency_us = inflight.started.elapsed().as_micros() as u64;
        let ts = epoch_ms();

        let (success, message) = match result {
            AttemptResult::Committed { message, record } => {
                self.suppressed.note(&code, self.success_suppress);
                self.metrics.record_committed(latency_us);
                if let Some(session) = self.session.as_mut() {
                    session.note_committed(&code);
                    session.add_event(
                        SessionEvent::new(SessionEventKind::Committed, ts).with_code(&code),
                    );
                }
                info!(code = %code, latency_us = %latency_us, "check_in_committed");

                self.presenter.present(true, message.clone(), record.clone());
                if let Some(hook) = &self.feedback {
                    hook.on_check_in(record.as_ref());
                }
                (true, message)
            }
            AttemptResult::Invalid { message } => {
                self.suppressed.note(&code, self.failure_suppress);
                self.metrics.record_invalid(latency_us);
                if let Some(session) = self.session.as_mut() {
                    session.failed += 1;
                    session.add_event(
                        SessionEvent::new(SessionEventKind::Invalid, ts)
                            .with_code(&code)
                            .with_extra(&message),
                    );
                }
                info!(code = %code, reason = %message, "check_in_invalid");

                self.presenter.present(false, message.clone(), None);
                (false, message)
            }
            AttemptResult::CommitRejected { message } => {
                self.suppressed.note(&code, self.failure_suppress);
                self.metrics.record_commit_failed(latency_us);
                if let Some(session) = self.session.as_mut() {
                    session.failed += 1;
                    session.add_event(
                        SessionEvent::new(SessionEventKind::CommitFailed, ts)
                            .with_code(&code)
                            .with_extra(&message),
                    );
                }
                warn!(code = %code, reason = %message, "check_in_commit_failed");

                self.presenter.present(false, message.clone(), None);
                (false, message)
            }
            AttemptResult::GatewayFailed { message } => {
                // No suppression entry: the operator should be able to
                // rescan as soon as connectivity returns.
                self.metrics.record_gateway_error(latency_us);
                if let Some(session) = self.session.as_mut() {
                    session.failed += 1;
                    session.add_event(
                        SessionEvent::new(SessionEventKind::GatewayFailed, ts)
                            .with_code(&code)
                            .with_extra(&message),
                    );
                }

                self.presenter.present(false, message.clone(), None);
                (false, message)
            }
        };

        if let Some(tx) = inflight.reply {
            let _ = tx.send(SubmitOutcome::Resolved { success, message });
        }

        self.set_state(self.resume_state());
    }
}

/// Run one validate-then-commit attempt against the gateway
async fn run_attempt(
    gateway: Arc<dyn CheckInGateway>,
    code: &str,
    context: &GateContext,
    epoch: u64,
    attempt_tx: &mpsc::Sender<AttemptEvent>,
) -> AttemptResult {
    match gateway.validate(code).await {
        Ok(ValidationOutcome::Valid) => {
            let validated = AttemptEvent::Validated { epoch, code: code.to_string() };
            let _ = attempt_tx.send(validated).await;

            match gateway.commit(code, context).await {
                Ok(CommitOutcome::Completed { message, record }) => {
                    AttemptResult::Committed { message, record }
                }
                Ok(CommitOutcome::Rejected { message }) => {
                    AttemptResult::CommitRejected { message }
                }
                Err(e) => {
                    error!(code = %code, error = %e, "gateway_commit_failed");
                    AttemptResult::GatewayFailed { message: gateway_failure_message(e) }
                }
            }
        }
        Ok(ValidationOutcome::Invalid { reason }) => AttemptResult::Invalid {
            message: reason.unwrap_or_else(|| FALLBACK_INVALID_MSG.to_string()),
        },
        Err(e) => {
            error!(code = %code, error = %e, "gateway_validate_failed");
            AttemptResult::GatewayFailed { message: gateway_failure_message(e) }
        }
    }
}

/// User-facing message for a gateway failure
fn gateway_failure_message(error: GatewayError) -> String {
    match error {
        GatewayError::Transport(_) => FALLBACK_TRANSPORT_MSG.to_string(),
        GatewayError::Backend(message) => message,
    }
}
