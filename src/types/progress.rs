// ABOUTME: Progress events emitted while files move between trees.
// ABOUTME: Byte-level events per file and index/total events per tree.

use serde::Serialize;

/// Byte progress of a single file transfer.
///
/// Within one file, `bytes_transferred` never decreases and the last event
/// has `bytes_transferred == total_bytes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub bytes_transferred: u64,
    pub total_bytes: u64,
}

impl ProgressEvent {
    pub fn is_complete(&self) -> bool {
        self.bytes_transferred == self.total_bytes
    }

    /// Completion ratio in `0.0..=1.0`; an empty file is complete.
    pub fn fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            1.0
        } else {
            self.bytes_transferred as f64 / self.total_bytes as f64
        }
    }
}

/// Everything a transfer reports to its observer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TransferEvent {
    /// A file of a tree operation is about to move. `index` is 1-based.
    FileStarted {
        index: usize,
        total: usize,
        source: String,
        destination: String,
    },
    /// Bytes moved for the current file.
    Bytes(ProgressEvent),
    /// The current file is fully placed (and chmodded, for uploads).
    FileFinished {
        index: usize,
        total: usize,
        destination: String,
    },
}
