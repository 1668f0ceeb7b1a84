//! Domain models - core business types for check-in scanning
//!
//! This module contains the canonical data types used throughout the system:
//! - `ScanState` - orchestrator state machine states
//! - `ValidationOutcome` / `CommitOutcome` - gateway call results
//! - `CheckInRecord` - persisted check-in payload from the backend
//! - `PresentedResult` - a displayed outcome with its expiry deadline
//! - `GateContext` - the physical gate a session is bound to
//! - `ScanSession` - audit record of one scanning session
//! - `GatewayError` - failure taxonomy for gateway calls

pub mod error;
pub mod session;
pub mod types;

// Re-export commonly used types at module level
pub use error::GatewayError;
pub use session::{ScanSession, SessionEvent, SessionEventKind};
pub use types::{
    CheckInRecord, CommitOutcome, GateContext, PresentedResult, ScanState, ValidationOutcome,
};
