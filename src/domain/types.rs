//! Shared types for the check-in scanning core

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Orchestrator state machine states
///
/// `Idle` and `Scanning` are the only states from which capture may stop;
/// `Validating` and `Committing` indicate a code is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    AwaitingPermission,
    Scanning,
    Validating,
    Committing,
    Error(String),
}

impl ScanState {
    #[inline]
    pub fn as_str(&self) -> &str {
        match self {
            ScanState::Idle => "idle",
            ScanState::AwaitingPermission => "awaiting_permission",
            ScanState::Scanning => "scanning",
            ScanState::Validating => "validating",
            ScanState::Committing => "committing",
            ScanState::Error(_) => "error",
        }
    }

    /// True while a code is in flight against the gateway
    #[inline]
    pub fn is_in_flight(&self) -> bool {
        matches!(self, ScanState::Validating | ScanState::Committing)
    }
}

impl std::fmt::Display for ScanState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Physical gate a scan session is attributed to
///
/// Immutable per session, attached to every commit call. A gate-agnostic
/// session simply leaves both fields empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateContext {
    #[serde(default)]
    pub gate_id: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl GateContext {
    pub fn new(gate_id: Option<String>, location: Option<String>) -> Self {
        Self { gate_id, location }
    }
}

/// Result of a gateway eligibility check
///
/// Transport failure is the `Err` arm of the gateway call, so matching on
/// this enum is exhaustive over the business outcomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid,
    Invalid { reason: Option<String> },
}

/// Result of a gateway commit call
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    Completed {
        message: String,
        record: Option<CheckInRecord>,
    },
    Rejected {
        message: String,
    },
}

/// Persisted check-in payload, owned by the backend
///
/// The core only passes it through to the presenter and the feedback hook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckInRecord {
    pub attendee: String,
    #[serde(default)]
    pub ticket_tier: Option<String>,
    pub checked_in_at: DateTime<Utc>,
}

/// An outcome held by the presenter until its deadline passes
#[derive(Debug, Clone, PartialEq)]
pub struct PresentedResult {
    pub success: bool,
    pub message: String,
    pub record: Option<CheckInRecord>,
    pub expires_at: Instant,
}
