//! Roster-backed development gateway
//!
//! A `CheckInGateway` over a local JSON ticket list, for exercising gates
//! without a backend deployment. Validation checks that a code is known and
//! unused; commit marks it used exactly once, so a re-presented ticket gets
//! the same "already used" answer a real backend would give.

use crate::domain::error::GatewayError;
use crate::domain::types::{CheckInRecord, CommitOutcome, GateContext, ValidationOutcome};
use crate::io::gateway::CheckInGateway;
use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

const UNKNOWN_CODE_MSG: &str = "Unknown ticket code";
const ALREADY_USED_MSG: &str = "Ticket already used";
const COMMITTED_MSG: &str = "Check-in recorded";

/// One ticket in the roster file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterTicket {
    pub code: String,
    pub attendee: String,
    #[serde(default)]
    pub tier: Option<String>,
}

struct TicketEntry {
    attendee: String,
    tier: Option<String>,
    used: bool,
}

/// In-memory check-in backend over a ticket roster
pub struct RosterGateway {
    tickets: Mutex<FxHashMap<String, TicketEntry>>,
}

impl RosterGateway {
    pub fn new(tickets: Vec<RosterTicket>) -> Self {
        let map: FxHashMap<String, TicketEntry> = tickets
            .into_iter()
            .map(|t| {
                (t.code, TicketEntry { attendee: t.attendee, tier: t.tier, used: false })
            })
            .collect();

        info!(tickets = %map.len(), "roster_loaded");
        Self { tickets: Mutex::new(map) }
    }

    /// Load a roster from a JSON file (array of tickets)
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read roster file {}", path.display()))?;
        let tickets: Vec<RosterTicket> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse roster file {}", path.display()))?;
        Ok(Self::new(tickets))
    }

    /// Number of tickets not yet checked in
    pub fn remaining(&self) -> usize {
        self.tickets.lock().values().filter(|t| !t.used).count()
    }
}

#[async_trait]
impl CheckInGateway for RosterGateway {
    async fn validate(&self, code: &str) -> Result<ValidationOutcome, GatewayError> {
        let tickets = self.tickets.lock();
        match tickets.get(code) {
            None => Ok(ValidationOutcome::Invalid {
                reason: Some(UNKNOWN_CODE_MSG.to_string()),
            }),
            Some(entry) if entry.used => Ok(ValidationOutcome::Invalid {
                reason: Some(ALREADY_USED_MSG.to_string()),
            }),
            Some(_) => Ok(ValidationOutcome::Valid),
        }
    }

    async fn commit(
        &self,
        code: &str,
        context: &GateContext,
    ) -> Result<CommitOutcome, GatewayError> {
        let mut tickets = self.tickets.lock();
        match tickets.get_mut(code) {
            None => Ok(CommitOutcome::Rejected { message: UNKNOWN_CODE_MSG.to_string() }),
            Some(entry) if entry.used => {
                // Lost the race with another gate
                Ok(CommitOutcome::Rejected { message: ALREADY_USED_MSG.to_string() })
            }
            Some(entry) => {
                entry.used = true;
                info!(
                    code = %code,
                    attendee = %entry.attendee,
                    gate_id = %context.gate_id.as_deref().unwrap_or("-"),
                    "roster_check_in"
                );
                Ok(CommitOutcome::Completed {
                    message: COMMITTED_MSG.to_string(),
                    record: Some(CheckInRecord {
                        attendee: entry.attendee.clone(),
                        ticket_tier: entry.tier.clone(),
                        checked_in_at: Utc::now(),
                    }),
                })
            }
        }
    }
}
