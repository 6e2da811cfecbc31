//! Bulk discovery of reader sites.
//!
//! For each series slug the [`DiscoveryPool`] tries a few spellings against
//! the mirror hunter's domain templates, verifies every live host with a real
//! single-chapter download and records the first one that passes.

pub mod error;
mod pool;
mod variants;
mod verify;

pub use crate::pool::{DEFAULT_WORKERS, DiscoveryOutcome, DiscoveryPool, DiscoveryReport, FailureReason};
pub use crate::variants::{registry_domain, slug_variants, title_case};
pub use crate::verify::{DownloadVerifier, Verdict, Verifier, is_good_enough};
