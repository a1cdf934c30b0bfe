use serde::Serialize;
use std::fmt;
use std::sync::mpsc::{Receiver, SyncSender, TrySendError};
use std::sync::Arc;

/// Phases of a scan, in pipeline order. `Cancelled` replaces `Complete`
/// when the caller aborts mid-scan.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScanPhase {
    Starting,
    Discovery,
    Grouping,
    Analyzing,
    TrailingHash,
    Hashing,
    Duplicates,
    Preparing,
    Rendering,
    Complete,
    Cancelled,
}

impl fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScanPhase::Starting => "starting",
            ScanPhase::Discovery => "discovery",
            ScanPhase::Grouping => "grouping",
            ScanPhase::Analyzing => "analyzing",
            ScanPhase::TrailingHash => "trailing_hash",
            ScanPhase::Hashing => "hashing",
            ScanPhase::Duplicates => "duplicates",
            ScanPhase::Preparing => "preparing",
            ScanPhase::Rendering => "rendering",
            ScanPhase::Complete => "complete",
            ScanPhase::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Wire payload of a `scan-progress` event. `total == 0` means
/// indeterminate.
#[derive(Debug, Serialize, Clone)]
pub struct ScanProgress {
    pub phase: ScanPhase,
    pub current: usize,
    pub total: usize,
    pub message: String,
    /// Marks the first/last event of a phase. Boundary events must reach
    /// every subscriber; intermediate ones may be coalesced.
    #[serde(skip)]
    pub boundary: bool,
}

impl ScanProgress {
    pub fn boundary(phase: ScanPhase, current: usize, total: usize, message: &str) -> Self {
        Self {
            phase,
            current,
            total,
            message: message.to_string(),
            boundary: true,
        }
    }

    pub fn tick(phase: ScanPhase, current: usize, total: usize, message: &str) -> Self {
        Self {
            phase,
            current,
            total,
            message: message.to_string(),
            boundary: false,
        }
    }
}

/// Wire payload of a `delete-progress` event.
#[derive(Debug, Serialize, Clone)]
pub struct DeleteProgress {
    pub phase: String,
    pub current: usize,
    pub total: usize,
    pub current_file: String,
    pub deleted_bytes: u64,
}

/// Terminal `delete-result` event.
#[derive(Debug, Serialize, Clone)]
pub struct DeleteResult {
    pub deleted_count: usize,
    pub failed_count: usize,
    pub total_bytes: u64,
    /// Epoch milliseconds until which the presentation layer should keep
    /// the result visible.
    pub show_until: i64,
}

/// Trait for receiving engine progress.
///
/// The CLI implements it with indicatif bars; a GUI shell forwards events
/// over its IPC channel. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_scan_progress(&self, _progress: &ScanProgress) {}
    fn on_delete_progress(&self, _progress: &DeleteProgress) {}
    fn on_delete_result(&self, _result: &DeleteResult) {}
}

/// No-op reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}

/// Delivers every event to every registered subscriber.
pub struct FanoutReporter {
    subscribers: Vec<Arc<dyn ProgressReporter>>,
}

impl FanoutReporter {
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, reporter: Arc<dyn ProgressReporter>) {
        self.subscribers.push(reporter);
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

impl Default for FanoutReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for FanoutReporter {
    fn on_scan_progress(&self, progress: &ScanProgress) {
        for sub in &self.subscribers {
            sub.on_scan_progress(progress);
        }
    }

    fn on_delete_progress(&self, progress: &DeleteProgress) {
        for sub in &self.subscribers {
            sub.on_delete_progress(progress);
        }
    }

    fn on_delete_result(&self, result: &DeleteResult) {
        for sub in &self.subscribers {
            sub.on_delete_result(result);
        }
    }
}

/// Bridges scan events onto a bounded channel for a consumer on another
/// thread. When the consumer lags, intermediate within-phase updates are
/// dropped; phase-boundary events block until delivered.
pub struct ChannelReporter {
    sender: SyncSender<ScanProgress>,
}

impl ChannelReporter {
    pub fn new(capacity: usize) -> (Self, Receiver<ScanProgress>) {
        let (sender, receiver) = std::sync::mpsc::sync_channel(capacity);
        (Self { sender }, receiver)
    }
}

impl ProgressReporter for ChannelReporter {
    fn on_scan_progress(&self, progress: &ScanProgress) {
        if progress.boundary {
            let _ = self.sender.send(progress.clone());
        } else if let Err(TrySendError::Disconnected(_)) = self.sender.try_send(progress.clone()) {
            // receiver is gone; nothing to do
        }
    }
}
