use crate::error::{ErrorKind, Result};
use crate::{ChapterMetadata, Format, Packager};
use async_trait::async_trait;
use exn::ResultExt;
use std::path::{Path, PathBuf};

/// Non-empty regular files directly inside `source`, sorted by name.
pub(crate) async fn collect_pages(source: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(source).await.or_raise(|| ErrorKind::Io(source.to_path_buf()))?;
    let mut pages = Vec::new();
    while let Some(entry) = entries.next_entry().await.or_raise(|| ErrorKind::Io(source.to_path_buf()))? {
        let metadata = entry.metadata().await.or_raise(|| ErrorKind::Io(entry.path()))?;
        if !metadata.is_file() {
            continue;
        }
        // Zero-byte pages are failed downloads that slipped through.
        if metadata.len() == 0 {
            tracing::debug!(path = %entry.path().display(), "skipping empty page file");
            continue;
        }
        pages.push(entry.path());
    }
    pages.sort();
    Ok(pages)
}

/// Leaves the pages where they are.
///
/// The "artifact" is the source directory itself, provided it holds at least
/// one non-empty page.
#[derive(Debug, Default, Clone, Copy)]
pub struct FolderPackager;

#[async_trait]
impl Packager for FolderPackager {
    fn format(&self) -> Format {
        Format::Folder
    }

    async fn materialize(&self, source: &Path, _dest: &Path, _metadata: Option<&ChapterMetadata>) -> Result<PathBuf> {
        if collect_pages(source).await?.is_empty() {
            exn::bail!(ErrorKind::NoPages(source.to_path_buf()));
        }
        Ok(source.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn test_collect_pages_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("002.jpg"), b"b").unwrap();
        fs::write(dir.path().join("001.jpg"), b"a").unwrap();
        fs::write(dir.path().join("003.jpg"), b"").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        let pages = collect_pages(dir.path()).await.unwrap();
        let names: Vec<_> = pages.iter().map(|p| p.file_name().unwrap().to_str().unwrap()).collect();
        assert_eq!(names, ["001.jpg", "002.jpg"]);
    }

    #[tokio::test]
    async fn test_folder_requires_a_page() {
        let dir = tempfile::tempdir().unwrap();
        let err = FolderPackager.materialize(dir.path(), dir.path(), None).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NoPages(_)));

        fs::write(dir.path().join("001.jpg"), b"a").unwrap();
        let path = FolderPackager.materialize(dir.path(), dir.path(), None).await.unwrap();
        assert_eq!(path, dir.path());
        assert!(dir.path().join("001.jpg").exists());
    }
}
