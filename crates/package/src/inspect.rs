use crate::cbz::DESCRIPTOR;
use crate::error::{ErrorKind, Result};
use crate::names::is_image;
use exn::ResultExt;
use std::fs::File;
use std::path::Path;
use zip::ZipArchive;

/// What's inside a packaged archive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveSummary {
    /// The archive carries a `ComicInfo.xml` descriptor.
    pub has_descriptor: bool,
    /// Number of page images.
    pub images: usize,
}

/// Lists an archive's entries without extracting anything.
///
/// Blocking; call from `spawn_blocking` when on an async runtime with many
/// archives to look at.
pub fn inspect_archive(path: impl AsRef<Path>) -> Result<ArchiveSummary> {
    let path = path.as_ref();
    let file = File::open(path).or_raise(|| ErrorKind::Io(path.to_path_buf()))?;
    let archive = ZipArchive::new(file).or_raise(|| ErrorKind::Archive(path.to_path_buf()))?;
    let mut summary = ArchiveSummary::default();
    for name in archive.file_names() {
        if name == DESCRIPTOR {
            summary.has_descriptor = true;
        } else if is_image(name) {
            summary.images += 1;
        }
    }
    Ok(summary)
}
