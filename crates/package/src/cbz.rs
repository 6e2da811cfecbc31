use crate::error::{ErrorKind, Result};
use crate::folder::collect_pages;
use crate::{ChapterMetadata, Format, Packager};
use async_trait::async_trait;
use exn::ResultExt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::instrument;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

pub(crate) const DESCRIPTOR: &str = "ComicInfo.xml";

/// Zips the pages into `<dest>.cbz`.
#[derive(Debug, Clone, Copy)]
pub struct CbzPackager {
    /// Delete the page directory once the archive is in place.
    pub remove_source: bool,
}
impl Default for CbzPackager {
    fn default() -> Self {
        Self { remove_source: true }
    }
}

/// Appends to the file name instead of replacing anything after a dot.
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn escape_xml(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Minimal ComicInfo descriptor, as understood by most comic readers.
fn comic_info(metadata: &ChapterMetadata, page_count: usize) -> String {
    let number = metadata.number.map(|n| format!("  <Number>{n}</Number>\n")).unwrap_or_default();
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
         <ComicInfo xmlns:xsd=\"http://www.w3.org/2001/XMLSchema\" xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\">\n\
         \x20 <Series>{}</Series>\n\
         \x20 <Title>{}</Title>\n\
         {number}\
         \x20 <PageCount>{page_count}</PageCount>\n\
         </ComicInfo>\n",
        escape_xml(&metadata.series),
        escape_xml(&metadata.title),
    )
}

fn write_archive(target: &Path, pages: &[PathBuf], descriptor: Option<String>) -> Result<()> {
    let archive_error = || ErrorKind::Archive(target.to_path_buf());
    let file = File::create(target).or_raise(|| ErrorKind::Io(target.to_path_buf()))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default();
    if let Some(xml) = descriptor {
        zip.start_file(DESCRIPTOR, options).or_raise(archive_error)?;
        zip.write_all(xml.as_bytes()).or_raise(archive_error)?;
    }
    // Images are already compressed, deflating them again just burns CPU.
    let stored = options.compression_method(zip::CompressionMethod::Stored);
    for page in pages {
        let name = page.file_name().and_then(|n| n.to_str()).ok_or_else(|| exn::Exn::from(archive_error()))?;
        zip.start_file(name, stored).or_raise(archive_error)?;
        let mut reader = File::open(page).or_raise(|| ErrorKind::Io(page.clone()))?;
        std::io::copy(&mut reader, &mut zip).or_raise(|| ErrorKind::Io(page.clone()))?;
    }
    let mut writer = zip.finish().or_raise(archive_error)?;
    writer.flush().or_raise(|| ErrorKind::Io(target.to_path_buf()))?;
    Ok(())
}

#[async_trait]
impl Packager for CbzPackager {
    fn format(&self) -> Format {
        Format::Cbz
    }

    #[instrument(skip_all, fields(source = %source.display()))]
    async fn materialize(&self, source: &Path, dest: &Path, metadata: Option<&ChapterMetadata>) -> Result<PathBuf> {
        let pages = collect_pages(source).await?;
        if pages.is_empty() {
            exn::bail!(ErrorKind::NoPages(source.to_path_buf()));
        }
        let target = with_suffix(dest, ".cbz");
        let partial = with_suffix(dest, ".cbz.part");
        let descriptor = metadata.map(|m| comic_info(m, pages.len()));

        let blocking_target = partial.clone();
        tokio::task::spawn_blocking(move || write_archive(&blocking_target, &pages, descriptor))
            .await
            .or_raise(|| ErrorKind::Archive(target.clone()))??;
        // Only a complete archive ever carries the final name.
        tokio::fs::rename(&partial, &target).await.or_raise(|| ErrorKind::Io(target.clone()))?;

        if self.remove_source {
            tokio::fs::remove_dir_all(source).await.or_raise(|| ErrorKind::Io(source.to_path_buf()))?;
        }
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspect_archive;
    use std::fs;

    fn chapter_dir(root: &Path) -> PathBuf {
        let dir = root.join("Chapter 1");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("001.jpg"), b"one").unwrap();
        fs::write(dir.join("002.png"), b"two").unwrap();
        fs::write(dir.join("003.jpg"), b"").unwrap();
        dir
    }

    fn metadata() -> ChapterMetadata {
        ChapterMetadata { series: "Tom & Jerry".to_string(), title: "Chapter 1".to_string(), number: Some(1.0) }
    }

    #[test]
    fn test_comic_info_is_escaped() {
        let xml = comic_info(&metadata(), 2);
        assert!(xml.contains("<Series>Tom &amp; Jerry</Series>"));
        assert!(xml.contains("<Number>1</Number>"));
        assert!(xml.contains("<PageCount>2</PageCount>"));
    }

    #[tokio::test]
    async fn test_materialize_cbz() {
        let root = tempfile::tempdir().unwrap();
        let source = chapter_dir(root.path());
        let path = CbzPackager::default().materialize(&source, &source, Some(&metadata())).await.unwrap();
        assert_eq!(path, root.path().join("Chapter 1.cbz"));
        assert!(!source.exists(), "source directory should be removed");
        assert!(!root.path().join("Chapter 1.cbz.part").exists());

        let summary = inspect_archive(&path).unwrap();
        assert!(summary.has_descriptor);
        // The empty page is skipped.
        assert_eq!(summary.images, 2);
    }

    #[tokio::test]
    async fn test_materialize_keeps_source_when_asked() {
        let root = tempfile::tempdir().unwrap();
        let source = chapter_dir(root.path());
        let packager = CbzPackager { remove_source: false };
        let path = packager.materialize(&source, &source, None).await.unwrap();
        assert!(source.exists());
        let summary = inspect_archive(&path).unwrap();
        assert!(!summary.has_descriptor);
        assert_eq!(summary.images, 2);
    }

    #[tokio::test]
    async fn test_materialize_without_pages() {
        let root = tempfile::tempdir().unwrap();
        let source = root.path().join("Chapter 2");
        fs::create_dir(&source).unwrap();
        fs::write(source.join("001.jpg"), b"").unwrap();
        let err = CbzPackager::default().materialize(&source, &source, None).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NoPages(_)));
        assert!(!root.path().join("Chapter 2.cbz").exists());
        assert!(source.exists(), "failed packaging must not remove pages");
    }
}
