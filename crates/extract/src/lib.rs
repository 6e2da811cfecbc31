//! Turning reader-site HTML into series metadata, chapter lists and page
//! image URLs.
//!
//! The [`Extractor`] trait is the seam the download orchestrator works
//! against. [`GenericExtractor`] is the markup-heuristic implementation that
//! works for most WordPress-style reader themes.

mod consts;
pub mod error;
mod generic;
mod models;

use async_trait::async_trait;

use crate::error::Result;
pub use crate::generic::{
    GenericExtractor, is_chapter_url, parse_chapters, parse_pages, parse_parent_url, parse_title,
};
pub use crate::models::{ChapterRef, SeriesInfo};

#[async_trait]
pub trait Extractor: Send + Sync {
    async fn series_info(&self, url: &str) -> Result<SeriesInfo>;

    /// Chapters in reading order, oldest first.
    async fn chapters(&self, url: &str) -> Result<Vec<ChapterRef>>;

    /// Page image URLs of one chapter, in reading order.
    async fn pages(&self, chapter_url: &str) -> Result<Vec<String>>;

    /// Download one page image. The referer hint is usually the chapter URL.
    async fn fetch_image(&self, url: &str, referer: Option<&str>) -> Result<Vec<u8>>;
}
