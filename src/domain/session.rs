//! Scan session audit model
//!
//! One `ScanSession` spans a continuous period during which the capture
//! device is active and codes may be submitted. Closed sessions are
//! serialized to short-key JSON and appended to the egress file.

use crate::domain::types::GateContext;
use serde_json::Value;
use smallvec::SmallVec;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Generate a new UUIDv7 (time-sortable)
pub fn new_session_id() -> String {
    Uuid::now_v7().to_string()
}

/// Get current epoch milliseconds
#[inline]
pub fn epoch_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

/// Event kinds that can occur in a scan session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEventKind {
    Started,
    Submitted,
    Suppressed,
    RejectedBusy,
    Invalid,
    Committed,
    CommitFailed,
    GatewayFailed,
    Stopped,
}

impl SessionEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionEventKind::Started => "started",
            SessionEventKind::Submitted => "submitted",
            SessionEventKind::Suppressed => "suppressed",
            SessionEventKind::RejectedBusy => "rejected_busy",
            SessionEventKind::Invalid => "invalid",
            SessionEventKind::Committed => "committed",
            SessionEventKind::CommitFailed => "commit_failed",
            SessionEventKind::GatewayFailed => "gateway_failed",
            SessionEventKind::Stopped => "stopped",
        }
    }
}

/// A single event in a scan session
#[derive(Debug, Clone)]
pub struct SessionEvent {
    pub kind: SessionEventKind,
    pub code: Option<String>, // code involved, if any
    pub ts: u64,              // epoch ms
    pub extra: Option<String>,
}

impl SessionEvent {
    pub fn new(kind: SessionEventKind, ts: u64) -> Self {
        Self { kind, code: None, ts, extra: None }
    }

    pub fn with_code(mut self, code: &str) -> Self {
        self.code = Some(code.to_string());
        self
    }

    pub fn with_extra(mut self, extra: &str) -> Self {
        self.extra = Some(extra.to_string());
        self
    }

    /// Convert to JSON value for short-key format
    fn to_json_value(&self) -> Value {
        let mut obj = serde_json::Map::new();
        obj.insert("t".to_string(), Value::String(self.kind.as_str().to_string()));
        if let Some(code) = &self.code {
            obj.insert("c".to_string(), Value::String(code.clone()));
        }
        obj.insert("ts".to_string(), Value::Number(self.ts.into()));
        if let Some(x) = &self.extra {
            obj.insert("x".to_string(), Value::String(x.clone()));
        }
        Value::Object(obj)
    }
}

/// Audit record of one scanning session
#[derive(Debug, Clone)]
pub struct ScanSession {
    pub sid: String, // UUIDv7 session ID
    pub gate: GateContext,
    pub started_at: u64,       // epoch ms
    pub ended_at: Option<u64>, // epoch ms
    pub submitted: u64,
    pub suppressed: u64,
    pub rejected: u64,
    pub committed: u64,
    pub failed: u64,
    pub codes: SmallVec<[String; 4]>, // successfully committed codes
    pub events: Vec<SessionEvent>,
}

impl ScanSession {
    pub fn new(gate: GateContext) -> Self {
        let now = epoch_ms();
        let mut session = Self {
            sid: new_session_id(),
            gate,
            started_at: now,
            ended_at: None,
            submitted: 0,
            suppressed: 0,
            rejected: 0,
            committed: 0,
            failed: 0,
            codes: SmallVec::new(),
            events: Vec::with_capacity(16),
        };
        session.add_event(SessionEvent::new(SessionEventKind::Started, now));
        session
    }

    pub fn add_event(&mut self, event: SessionEvent) {
        self.events.push(event);
    }

    /// Record a successfully committed code
    pub fn note_committed(&mut self, code: &str) {
        self.committed += 1;
        self.codes.push(code.to_string());
    }

    /// Mark the session as ended
    pub fn complete(&mut self) {
        let now = epoch_ms();
        self.ended_at = Some(now);
        self.add_event(SessionEvent::new(SessionEventKind::Stopped, now));
    }

    /// Convert to short-key JSON string
    pub fn to_json(&self) -> String {
        let mut obj = serde_json::Map::new();

        obj.insert("sid".to_string(), Value::String(self.sid.clone()));
        if let Some(gate_id) = &self.gate.gate_id {
            obj.insert("gate".to_string(), Value::String(gate_id.clone()));
        }
        if let Some(location) = &self.gate.location {
            obj.insert("loc".to_string(), Value::String(location.clone()));
        }

        obj.insert("t0".to_string(), Value::Number(self.started_at.into()));
        if let Some(ended) = self.ended_at {
            obj.insert("t1".to_string(), Value::Number(ended.into()));
        }

        obj.insert("sub".to_string(), Value::Number(self.submitted.into()));
        obj.insert("sup".to_string(), Value::Number(self.suppressed.into()));
        obj.insert("rej".to_string(), Value::Number(self.rejected.into()));
        obj.insert("ok".to_string(), Value::Number(self.committed.into()));
        obj.insert("fail".to_string(), Value::Number(self.failed.into()));

        let codes: Vec<Value> =
            self.codes.iter().map(|c| Value::String(c.clone())).collect();
        obj.insert("codes".to_string(), Value::Array(codes));

        let events: Vec<Value> = self.events.iter().map(|e| e.to_json_value()).collect();
        obj.insert("ev".to_string(), Value::Array(events));

        Value::Object(obj).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session() {
        let session = ScanSession::new(GateContext::default());

        assert!(!session.sid.is_empty());
        assert_eq!(session.sid.len(), 36); // UUIDv7 with hyphens
        assert!(session.ended_at.is_none());
        assert_eq!(session.submitted, 0);
        assert_eq!(session.committed, 0);
        assert_eq!(session.events.len(), 1);
        assert_eq!(session.events[0].kind, SessionEventKind::Started);
    }

    #[test]
    fn test_note_committed() {
        let mut session = ScanSession::new(GateContext::default());

        session.note_committed("TICKET-1");
        session.note_committed("TICKET-2");

        assert_eq!(session.committed, 2);
        assert_eq!(session.codes.as_slice(), &["TICKET-1", "TICKET-2"]);
    }

    #[test]
    fn test_complete_sets_ended_at() {
        let mut session = ScanSession::new(GateContext::default());

        session.complete();

        assert!(session.ended_at.is_some());
        assert_eq!(session.events.last().unwrap().kind, SessionEventKind::Stopped);
    }

    #[test]
    fn test_session_event_builders() {
        let event = SessionEvent::new(SessionEventKind::Committed, 1736012345678)
            .with_code("TICKET-1")
            .with_extra("attendee=Jo");

        assert_eq!(event.kind, SessionEventKind::Committed);
        assert_eq!(event.code, Some("TICKET-1".to_string()));
        assert_eq!(event.ts, 1736012345678);
        assert_eq!(event.extra, Some("attendee=Jo".to_string()));
    }

    #[test]
    fn test_session_to_json() {
        let gate = GateContext::new(Some("GATE_1".to_string()), Some("North hall".to_string()));
        let mut session = ScanSession::new(gate);
        session.submitted = 3;
        session.suppressed = 1;
        session.note_committed("TICKET-1");
        session.failed = 1;
        session.add_event(
            SessionEvent::new(SessionEventKind::Committed, 1736012345678).with_code("TICKET-1"),
        );
        session.complete();

        let json = session.to_json();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed["sid"], session.sid);
        assert_eq!(parsed["gate"], "GATE_1");
        assert_eq!(parsed["loc"], "North hall");
        assert_eq!(parsed["sub"], 3);
        assert_eq!(parsed["sup"], 1);
        assert_eq!(parsed["ok"], 1);
        assert_eq!(parsed["fail"], 1);
        assert_eq!(parsed["codes"], serde_json::json!(["TICKET-1"]));
        assert!(parsed["t1"].is_u64());

        let events = parsed["ev"].as_array().unwrap();
        assert_eq!(events[0]["t"], "started");
        assert_eq!(events[1]["t"], "committed");
        assert_eq!(events[1]["c"], "TICKET-1");
        assert_eq!(events.last().unwrap()["t"], "stopped");
    }

    #[test]
    fn test_gate_agnostic_session_json_omits_gate() {
        let session = ScanSession::new(GateContext::default());
        let parsed: serde_json::Value = serde_json::from_str(&session.to_json()).unwrap();
        assert!(parsed.get("gate").is_none());
        assert!(parsed.get("loc").is_none());
    }

    #[test]
    fn test_session_id_generation() {
        let a = new_session_id();
        let b = new_session_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 36);
    }
}
