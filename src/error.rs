//! Error types for the history merge core.

use thiserror::Error;

/// Errors surfaced while reading or merging history files.
///
/// A single malformed or truncated record invalidates the whole file's
/// read; there is no skip-and-continue within one file. Whether a failing
/// file pair aborts a directory-level run is the caller's policy.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Record header line does not match the fixed mcabber layout.
    #[error("malformed record header: {0}")]
    MalformedHeader(String),
    /// Declared continuation count exceeds the lines left in the file.
    #[error("truncated record: expected {expected} continuation lines, found {found}")]
    TruncatedRecord { expected: usize, found: usize },
    /// Underlying read/write failure on a store member.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
