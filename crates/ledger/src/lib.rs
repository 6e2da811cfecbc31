//! Persistent completion ledger.
//!
//! Tracks which (series, chapter) pairs have been downloaded and packaged, so
//! that repeated runs never re-download finished work. Backed by SQLite in
//! WAL mode: an interactive download and a bulk discovery run can share one
//! ledger file.
//!
//! Titles are normalized into keys before storage (see [`normalize`]).

mod db;
pub mod error;
mod key;
mod models;
mod repo;

pub use crate::db::Database;
pub use crate::key::normalize;
pub use crate::models::{CompletionRecord, LibraryEntry};
pub use crate::repo::Ledger;
