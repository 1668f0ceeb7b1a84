//! CheckInGateway - the backend collaborator seam
//!
//! The orchestrator talks to the check-in backend exclusively through this
//! trait: a read-only eligibility check followed by a durable commit. The
//! gateway is idempotency-unaware; at-most-once submission is the
//! orchestrator's job.

use crate::domain::error::GatewayError;
use crate::domain::types::{CommitOutcome, GateContext, ValidationOutcome};
use async_trait::async_trait;

/// Asynchronous validate/commit interface to the check-in backend
#[async_trait]
pub trait CheckInGateway: Send + Sync {
    /// Check whether a code is eligible for check-in (read-only)
    async fn validate(&self, code: &str) -> Result<ValidationOutcome, GatewayError>;

    /// Durably record a check-in for a previously validated code
    async fn commit(
        &self,
        code: &str,
        context: &GateContext,
    ) -> Result<CommitOutcome, GatewayError>;
}
