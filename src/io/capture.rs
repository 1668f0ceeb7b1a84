//! ScanCaptureSource - injected capture capability
//!
//! The camera (or any other decoder) is represented as an injected trait
//! rather than a module-level device handle, so the orchestrator can be
//! tested without real hardware. The source produces already-decoded code
//! strings; decode-failure noise is simply the absence of events.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;

/// Capacity of the decoded-code stream
const CODE_STREAM_CAPACITY: usize = 64;

/// Source of decoded scan codes plus permission state
#[async_trait]
pub trait ScanCaptureSource: Send + Sync {
    /// Ask the host platform for capture permission
    async fn request_permission(&self) -> bool;

    /// Open the decoded-code stream for one session
    fn open(&self) -> broadcast::Receiver<String>;
}

/// Channel-backed capture source for simulators and tests
///
/// Codes are injected by the host (e.g., stdin lines in the simulator) and
/// fan out to whichever session currently has the stream open.
pub struct ChannelCaptureSource {
    granted: AtomicBool,
    tx: broadcast::Sender<String>,
}

impl ChannelCaptureSource {
    pub fn new(granted: bool) -> Self {
        let (tx, _) = broadcast::channel(CODE_STREAM_CAPACITY);
        Self { granted: AtomicBool::new(granted), tx }
    }

    /// Change the simulated permission state
    pub fn set_granted(&self, granted: bool) {
        self.granted.store(granted, Ordering::SeqCst);
    }

    /// Inject a decoded code; returns the number of live receivers
    pub fn inject(&self, code: &str) -> usize {
        self.tx.send(code.to_string()).unwrap_or(0)
    }
}

#[async_trait]
impl ScanCaptureSource for ChannelCaptureSource {
    async fn request_permission(&self) -> bool {
        self.granted.load(Ordering::SeqCst)
    }

    fn open(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }
}
