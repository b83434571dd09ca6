//! Error types for the VM manager
//!
//! Only run-terminating conditions live here. Segmentation faults and
//! unmapped references are ordinary translation results.

use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;

use crate::memory::FrameRef;

/// Result type alias for VM manager operations
pub type Result<T> = std::result::Result<T, VmError>;

#[derive(Error, Debug)]
pub enum VmError {
    /// Free frame list exhausted while resolving a fault
    #[error("out of free frames: no frame left to resolve a fault")]
    OutOfFrames,

    /// A frame was claimed twice during initialization
    #[error("frame {frame} is already in use or reserved")]
    DoubleReservation { frame: u32 },

    #[error("{source_name}:{line}: malformed init record: {reason}")]
    MalformedInitRecord {
        source_name: String,
        line: usize,
        reason: String,
    },

    /// Hit an on-disk location while running without demand paging
    #[error(
        "segment {segment}, page {page}: location {location} is not resident and demand paging is disabled"
    )]
    NonResidentReference {
        segment: u32,
        page: u32,
        location: FrameRef,
    },

    #[error("{source_name}: invalid virtual address: {token}")]
    MalformedAddress { source_name: String, token: String },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl VmError {
    pub(crate) fn malformed(source_name: &str, line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedInitRecord {
            source_name: source_name.to_string(),
            line,
            reason: reason.into(),
        }
    }

    /// Process exit status for this error. Never 0, and never 2, which
    /// clap uses for usage errors.
    pub fn exit_status(&self) -> u8 {
        match self {
            Self::OutOfFrames => 6,
            Self::DoubleReservation { .. }
            | Self::MalformedInitRecord { .. }
            | Self::NonResidentReference { .. } => 3,
            Self::MalformedAddress { .. } => 4,
            Self::Read { .. } | Self::Write { .. } => 5,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.exit_status())
    }
}
