//! Manual code entry
//!
//! Adapts a free-typed code into the orchestrator's submit pipeline with
//! its own guard, so pressing Enter and the submit button at the same time
//! produces one attempt, not two. `submit` returns only once the attempt
//! has resolved; hosts should clear their input field on return, never
//! optimistically, so a mistyped code stays editable after a failure.

use crate::services::orchestrator::{RejectReason, ScanHandle, SubmitOutcome};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Result of a manual submission
#[derive(Debug, Clone, PartialEq)]
pub enum ManualEntryOutcome {
    /// Empty or whitespace-only input; the orchestrator was not called
    EmptyInput,
    /// A submission from this channel is still pending
    Busy,
    /// The orchestrator turned the code away without a gateway call
    Rejected(RejectReason),
    /// The attempt ran to completion
    Resolved { success: bool, message: String },
}

/// Submit guard and adapter for typed-in codes
pub struct ManualEntryChannel {
    handle: ScanHandle,
    pending: AtomicBool,
}

impl ManualEntryChannel {
    pub fn new(handle: ScanHandle) -> Self {
        Self { handle, pending: AtomicBool::new(false) }
    }

    /// Trim and forward a typed code, waiting for the attempt to resolve
    pub async fn submit(&self, raw: &str) -> ManualEntryOutcome {
        let code = raw.trim();
        if code.is_empty() {
            debug!("manual_entry_empty_input");
            return ManualEntryOutcome::EmptyInput;
        }

        if self.pending.swap(true, Ordering::SeqCst) {
            debug!(code = %code, "manual_entry_busy");
            return ManualEntryOutcome::Busy;
        }

        let outcome = self.handle.submit(code).await;
        self.pending.store(false, Ordering::SeqCst);

        match outcome {
            SubmitOutcome::Rejected(reason) => ManualEntryOutcome::Rejected(reason),
            SubmitOutcome::Resolved { success, message } => {
                ManualEntryOutcome::Resolved { success, message }
            }
        }
    }

    /// True while a submission from this channel is unresolved
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testutil::{spawn_harness, Script, TestGateway};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_empty_input_never_reaches_orchestrator() {
        let gateway = Arc::new(TestGateway::new(Script::Accept));
        let harness = spawn_harness(gateway.clone()).await;
        let channel = ManualEntryChannel::new(harness.handle.clone());

        assert_eq!(channel.submit("   ").await, ManualEntryOutcome::EmptyInput);
        assert_eq!(channel.submit("").await, ManualEntryOutcome::EmptyInput);
        assert_eq!(channel.submit("\t\n").await, ManualEntryOutcome::EmptyInput);

        assert!(!channel.is_pending());
        assert_eq!(gateway.validate_calls(), 0);
    }

    #[tokio::test]
    async fn test_input_is_trimmed() {
        let gateway = Arc::new(TestGateway::new(Script::Accept));
        let harness = spawn_harness(gateway.clone()).await;
        harness.start_scanning().await;
        let channel = ManualEntryChannel::new(harness.handle.clone());

        let outcome = channel.submit("  TICKET-1  \n").await;

        assert!(matches!(outcome, ManualEntryOutcome::Resolved { success: true, .. }));
        assert_eq!(gateway.last_validated_code(), Some("TICKET-1".to_string()));
    }

    #[tokio::test]
    async fn test_double_submit_is_guarded() {
        let (gateway, validate_gate, commit_gate) = TestGateway::gated(Script::Accept);
        let gateway = Arc::new(gateway);
        let harness = spawn_harness(gateway.clone()).await;
        harness.start_scanning().await;

        let channel = Arc::new(ManualEntryChannel::new(harness.handle.clone()));

        // First submission blocks inside validate
        let first = {
            let channel = channel.clone();
            tokio::spawn(async move { channel.submit("TICKET-1").await })
        };
        while !channel.is_pending() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        // Second press lands while the first is unresolved
        assert_eq!(channel.submit("TICKET-2").await, ManualEntryOutcome::Busy);

        validate_gate.add_permits(1);
        commit_gate.add_permits(1);
        let outcome = first.await.unwrap();
        assert!(matches!(outcome, ManualEntryOutcome::Resolved { success: true, .. }));
        assert!(!channel.is_pending());
        assert_eq!(gateway.validate_calls(), 1);
    }

    #[tokio::test]
    async fn test_resolution_reports_failure_message() {
        let gateway = Arc::new(TestGateway::new(Script::Invalid(Some(
            "QR code tidak valid".to_string(),
        ))));
        let harness = spawn_harness(gateway.clone()).await;
        harness.start_scanning().await;
        let channel = ManualEntryChannel::new(harness.handle.clone());

        let outcome = channel.submit("BAD-CODE").await;

        assert_eq!(
            outcome,
            ManualEntryOutcome::Resolved {
                success: false,
                message: "QR code tidak valid".to_string()
            }
        );
        // Guard released after resolution
        assert!(!channel.is_pending());
    }

    #[tokio::test]
    async fn test_manual_entry_works_while_idle() {
        let gateway = Arc::new(TestGateway::new(Script::Accept));
        let harness = spawn_harness(gateway.clone()).await;
        let channel = ManualEntryChannel::new(harness.handle.clone());

        // No start(): typed codes are still accepted
        let outcome = channel.submit("TICKET-1").await;

        assert!(matches!(outcome, ManualEntryOutcome::Resolved { success: true, .. }));
        assert_eq!(gateway.commit_calls(), 1);
    }
}
