// error.rs — Error types for the verdict log.
//
// Uses `thiserror` to derive the standard Rust `Error` trait automatically.
// Each variant maps to a specific failure mode of the log.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while writing or checking the verdict log.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Failed to open or create the log file.
    #[error("failed to open verdict log at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to take or release the exclusive lock on the log file.
    #[error("failed to lock verdict log at {path}: {source}")]
    LockFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write an entry.
    #[error("failed to append entry: {0}")]
    WriteFailed(#[from] std::io::Error),

    /// An entry could not be serialized or parsed.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// The hash chain is broken: an entry was inserted, removed, or edited.
    #[error("integrity check failed at line {line}: expected hash {expected}, got {actual}")]
    IntegrityViolation {
        line: usize,
        expected: String,
        actual: String,
    },

    /// Sequence numbers are not contiguous.
    #[error("sequence gap at line {line}: expected {expected}, got {actual}")]
    SequenceGap {
        line: usize,
        expected: u64,
        actual: u64,
    },
}
