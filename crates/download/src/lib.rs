//! Downloading a series: range filtering, per-chapter page fan-out,
//! packaging and completion tracking.
//!
//! [`Downloader::download`] is a stream of [`DownloadEvent`]s so that any
//! front end can render progress; [`Downloader::download_series`] drains it
//! for callers that only want the outcome.

mod downloader;
pub mod error;
mod event;
mod range;

pub use crate::downloader::{DEFAULT_WORKERS, Downloader};
pub use crate::event::{ChapterStatus, DownloadEvent, DownloadSummary};
pub use crate::range::{ChapterRange, chapter_number, filter};
