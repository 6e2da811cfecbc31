//! Shared HTTP transport and asset retrieval.
//!
//! One [`Transport`] is built per process from an explicit [`RequestConfig`]
//! and cloned into every component that talks to the network. It caps the
//! number of outstanding requests across all of them.

mod config;
pub mod error;
mod strategy;
mod transport;

pub use crate::config::RequestConfig;
pub use crate::strategy::{Attempt, RefererStrategy};
pub use crate::transport::{Transport, sanitize_url};
