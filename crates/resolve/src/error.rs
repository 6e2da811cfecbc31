//! Resolution Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};

/// A resolution error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for resolution operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// None of the candidate hosts for a dynamic entry answered.
    #[display("no live mirror found for '{_0}'")]
    MirrorUnresolved(#[error(not(source))] String),
    /// A registry entry lacks the fields its kind requires, or they don't
    /// form a usable URL. Fix the registry.
    #[display("registry entry '{_0}' is incomplete or malformed")]
    InvalidEntry(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Mirrors come and go, a later sweep may find one.
        matches!(self, Self::MirrorUnresolved(_))
    }
}
