//! IO modules - external system interfaces
//!
//! This module contains all external collaborator seams:
//! - `gateway` - CheckInGateway trait (validate/commit against the backend)
//! - `capture` - ScanCaptureSource trait and channel-backed implementation
//! - `roster` - Roster-backed development gateway (local JSON ticket list)
//! - `egress` - Session output to file (JSONL format)

pub mod capture;
pub mod egress;
pub mod gateway;
pub mod roster;

// Re-export commonly used types
pub use capture::{ChannelCaptureSource, ScanCaptureSource};
pub use egress::SessionEgress;
pub use gateway::CheckInGateway;
pub use roster::{RosterGateway, RosterTicket};
