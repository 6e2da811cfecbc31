//! Fetch Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};

/// A fetch error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for fetch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The request configuration can't be turned into a client (bad header
    /// value, unusable proxy URL, TLS backend failure).
    #[display("invalid request configuration: {_0}")]
    InvalidConfig(#[error(not(source))] &'static str),
    #[display("invalid URL: {_0}")]
    InvalidUrl(#[error(not(source))] String),
    /// Connection failure, timeout, or body read failure.
    #[display("network error: {_0}")]
    Network(#[error(not(source))] String),
    #[display("unexpected status {status} from {url}")]
    Status { status: u16, url: String },
    /// Success status, but nothing in the body.
    #[display("empty response body from {_0}")]
    EmptyBody(#[error(not(source))] String),
    /// Every referer strategy failed for the asset.
    #[display("all retrieval strategies exhausted for {_0}")]
    Exhausted(#[error(not(source))] String),
    /// Liveness probe got no success status from either HEAD or GET.
    #[display("host unreachable: {_0}")]
    Unreachable(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::EmptyBody(_) | Self::Exhausted(_) | Self::Unreachable(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::InvalidConfig(_) | Self::InvalidUrl(_) => false,
        }
    }
}
