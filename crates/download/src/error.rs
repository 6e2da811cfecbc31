//! Download Error Types
//!
//! Only series-level failures are errors. A chapter that can't be downloaded
//! is reported through [`ChapterStatus::Failed`](crate::ChapterStatus::Failed)
//! and the series carries on.

use derive_more::{Display, Error};

/// A download error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for download operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The series page couldn't be fetched or read.
    #[display("could not read series at {_0}")]
    Series(#[error(not(source))] String),
    /// The chapter list couldn't be fetched.
    #[display("could not list chapters of {_0}")]
    ChapterList(#[error(not(source))] String),
    /// The stream ended without a final summary.
    #[display("download ended unexpectedly")]
    Interrupted,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Series(_) | Self::ChapterList(_))
    }
}
