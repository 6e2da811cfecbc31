//! Chapter packaging.
//!
//! Once a chapter's pages are on disk, a [`Packager`] turns the page
//! directory into the final artifact: the directory itself
//! ([`Format::Folder`]) or a comic book archive ([`Format::Cbz`]).

mod cbz;
pub mod error;
mod folder;
mod format;
mod inspect;
mod names;

pub use crate::cbz::CbzPackager;
pub use crate::folder::FolderPackager;
pub use crate::format::Format;
pub use crate::inspect::{ArchiveSummary, inspect_archive};
pub use crate::names::{chapter_dir_name, infer_extension, is_image, page_file_name, safe_name};

use crate::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub type PackagerHandle = Arc<dyn Packager>;

/// Descriptive metadata written into archives that support it.
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterMetadata {
    pub series: String,
    pub title: String,
    /// Chapter number parsed from the title, when there is one.
    pub number: Option<f64>,
}

/// Turns a directory of page files into a delivery artifact.
#[async_trait]
pub trait Packager: Send + Sync {
    fn format(&self) -> Format;

    /// Package the pages found directly inside `source`.
    ///
    /// `dest` is the artifact path without any extension. Returns where the
    /// artifact ended up. Fails when there is no non-empty page to package;
    /// on failure the source directory is left as it was.
    async fn materialize(&self, source: &Path, dest: &Path, metadata: Option<&ChapterMetadata>) -> Result<PathBuf>;
}
