//! Ledger Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A ledger error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for ledger operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("database error")]
    Database,
    #[display("database migration error")]
    Migration,
    /// The storage path can't be represented as UTF-8 text.
    #[display("unsupported storage path: {}", _0.display())]
    InvalidPath(#[error(not(source))] PathBuf),
    /// A stored row couldn't be converted back into a record.
    #[display("invalid ledger data: {_0}")]
    InvalidData(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    ///
    /// SQLite reports `SQLITE_BUSY` as a plain database error when another
    /// process holds the write lock for longer than the busy timeout.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database)
    }
}
