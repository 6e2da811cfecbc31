//! Discovery Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A discovery error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for discovery operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The registry file couldn't be written; discoveries since the last
    /// successful save only exist in memory.
    #[display("could not save registry to {}", _0.display())]
    Persist(#[error(not(source))] PathBuf),
    /// A throwaway directory or ledger for a test download couldn't be set up.
    #[display("could not prepare scratch space for a verification download")]
    Scratch,
    /// The verification download itself failed.
    #[display("verification download of {_0} failed")]
    Verification(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Verification(_))
    }
}
