use std::path::{Path, PathBuf};
use std::pin::pin;
use std::sync::Arc;

use async_stream::stream;
use exn::{OptionExt, ResultExt};
use futures::stream::FuturesUnordered;
use futures::{Stream, StreamExt};
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tome_extract::{ChapterRef, Extractor, SeriesInfo};
use tome_ledger::Ledger;
use tome_package::{ChapterMetadata, PackagerHandle, chapter_dir_name, page_file_name, safe_name};
use tracing::instrument;

use crate::error::{ErrorKind, Result};
use crate::event::{ChapterStatus, DownloadEvent, DownloadSummary};
use crate::range::{ChapterRange, chapter_number, filter};

pub const DEFAULT_WORKERS: usize = 8;
const UNKNOWN_SERIES: &str = "Unknown Series";

/// Downloads the chapters of one series at a time.
///
/// Pages of a chapter are fetched concurrently, up to `workers` at a time.
/// Chapters are processed one after the other, in reading order.
#[derive(Clone)]
pub struct Downloader {
    extractor: Arc<dyn Extractor>,
    ledger: Ledger,
    packager: PackagerHandle,
    output_dir: PathBuf,
    workers: usize,
}

impl Downloader {
    pub fn new(
        extractor: Arc<dyn Extractor>,
        ledger: Ledger,
        packager: PackagerHandle,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self { extractor, ledger, packager, output_dir: output_dir.into(), workers: DEFAULT_WORKERS }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Streams [`DownloadEvent`]s while downloading the series at `url`.
    ///
    /// Only a failure to read the series or its chapter list is yielded as an
    /// `Err` (and ends the stream). Everything that goes wrong with a single
    /// chapter is reported as [`ChapterStatus::Failed`].
    ///
    /// Once `cancel` fires no further chapter or page is started. Chapters
    /// already recorded as complete stay recorded.
    pub fn download<'a>(
        &'a self,
        url: &'a str,
        range: Option<ChapterRange>,
        cancel: CancellationToken,
    ) -> impl Stream<Item = Result<DownloadEvent>> + 'a {
        // `rustfmt` does not format macros that use braces. Wrap in parentheses!
        stream!({
            let series = match self.extractor.series_info(url).await.or_raise(|| ErrorKind::Series(url.to_string())) {
                Ok(series) => series,
                Err(e) => {
                    yield Err(e);
                    return;
                },
            };
            tracing::info!(series = %series.title, "starting download");
            yield Ok(DownloadEvent::Started(series.clone()));

            let listed = self.extractor.chapters(url).await.or_raise(|| ErrorKind::ChapterList(url.to_string()));
            let chapters = match listed {
                Ok(chapters) => filter(chapters, range.as_ref()),
                Err(e) => {
                    yield Err(e);
                    return;
                },
            };
            // Infallible: a usize (either 32- or 64-bit) will always fit in a u64.
            yield Ok(DownloadEvent::ChaptersQueued(u64::try_from(chapters.len()).unwrap_or(0)));
            for (index, chapter) in chapters.iter().enumerate() {
                yield Ok(DownloadEvent::Chapter { index, title: chapter.title.clone(), status: ChapterStatus::Queued });
            }

            let series_dir = self.output_dir.join(match safe_name(&series.title) {
                name if name.is_empty() => UNKNOWN_SERIES.to_string(),
                name => name,
            });
            let mut summary = DownloadSummary::new(&series.title, chapters.len());
            for (index, chapter) in chapters.into_iter().enumerate() {
                if cancel.is_cancelled() {
                    tracing::info!(index, "cancelled, not starting any more chapters");
                    yield Ok(DownloadEvent::Cancelled(summary));
                    return;
                }
                let status = if self.is_complete(&series, &chapter).await {
                    ChapterStatus::Skipped
                } else {
                    let title = chapter.title.clone();
                    yield Ok(DownloadEvent::Chapter { index, title, status: ChapterStatus::Fetching });
                    self.download_chapter(index, &series, &chapter, &series_dir, &cancel).await
                };
                summary.record(&status);
                yield Ok(DownloadEvent::Chapter { index, title: chapter.title, status });
            }

            if cancel.is_cancelled() {
                yield Ok(DownloadEvent::Cancelled(summary));
            } else {
                yield Ok(DownloadEvent::Complete(summary));
            }
        })
    }

    /// Drains [`download`](Self::download), handing every event to
    /// `observer`, and returns the final tally.
    pub async fn download_series(
        &self,
        url: &str,
        range: Option<ChapterRange>,
        cancel: CancellationToken,
        mut observer: impl FnMut(&DownloadEvent),
    ) -> Result<DownloadSummary> {
        let mut events = pin!(self.download(url, range, cancel));
        let mut summary = None;
        while let Some(event) = events.next().await {
            let event = event?;
            observer(&event);
            if let DownloadEvent::Complete(tally) | DownloadEvent::Cancelled(tally) = event {
                summary = Some(tally);
            }
        }
        summary.ok_or_raise(|| ErrorKind::Interrupted)
    }

    /// A ledger that can't be read doesn't stop a download; the chapter is
    /// fetched again.
    async fn is_complete(&self, series: &SeriesInfo, chapter: &ChapterRef) -> bool {
        match self.ledger.is_complete(&series.title, &chapter.title).await {
            Ok(complete) => complete,
            Err(err) => {
                tracing::warn!(chapter = %chapter.title, error = %err, "could not read completion ledger");
                false
            },
        }
    }

    #[instrument(skip_all, fields(chapter = %chapter.title))]
    async fn download_chapter(
        &self,
        index: usize,
        series: &SeriesInfo,
        chapter: &ChapterRef,
        series_dir: &Path,
        cancel: &CancellationToken,
    ) -> ChapterStatus {
        let pages = match self.extractor.pages(&chapter.url).await {
            Ok(pages) if pages.is_empty() => return ChapterStatus::Failed("no pages found".to_string()),
            Ok(pages) => pages,
            Err(err) => {
                tracing::warn!(error = %err, "could not list pages");
                return ChapterStatus::Failed(format!("could not list pages: {err}"));
            },
        };

        let chapter_dir = series_dir.join(match chapter_dir_name(&chapter.title) {
            name if name.is_empty() => format!("Chapter {}", index + 1),
            name => name,
        });
        if let Err(err) = fs::create_dir_all(&chapter_dir).await {
            return ChapterStatus::Failed(format!("could not create {}: {err}", chapter_dir.display()));
        }

        let saved = self.fetch_pages(&pages, &chapter.url, &chapter_dir, cancel).await;
        if saved < pages.len() && cancel.is_cancelled() {
            return ChapterStatus::Failed("cancelled".to_string());
        }
        if saved == 0 {
            return ChapterStatus::Failed("no page could be downloaded".to_string());
        }
        if saved < pages.len() {
            tracing::warn!(missing = pages.len() - saved, total = pages.len(), "chapter is missing pages");
        }

        let metadata = ChapterMetadata {
            series: series.title.clone(),
            title: chapter.title.clone(),
            number: chapter_number(&chapter.title),
        };
        match self.packager.materialize(&chapter_dir, &chapter_dir, Some(&metadata)).await {
            Ok(path) => {
                if let Err(err) = self.ledger.mark_complete(&series.title, &chapter.title, &path).await {
                    tracing::warn!(error = %err, "chapter packaged but not recorded as complete");
                }
                tracing::info!(path = %path.display(), pages = saved, "chapter packaged");
                ChapterStatus::Packaged(path)
            },
            Err(err) => {
                tracing::warn!(error = %err, "packaging failed");
                ChapterStatus::Failed(format!("packaging failed: {err}"))
            },
        }
    }

    /// Fetch and write every page, returning how many made it to disk.
    async fn fetch_pages(&self, pages: &[String], referer: &str, dir: &Path, cancel: &CancellationToken) -> usize {
        let mut futures: Vec<_> =
            pages.iter().enumerate().map(|(index, url)| self.fetch_page(index, url, referer, dir)).collect();
        let mut processing = FuturesUnordered::new();
        processing.extend(futures.drain(..self.workers.min(futures.len())));
        let mut saved = 0;
        while let Some(ok) = processing.next().await {
            saved += usize::from(ok);
            // Pop-n-push, but FIFO instead of LIFO.
            if !futures.is_empty() && !cancel.is_cancelled() {
                processing.push(futures.remove(0));
            }
        }
        saved
    }

    async fn fetch_page(&self, index: usize, url: &str, referer: &str, dir: &Path) -> bool {
        let bytes = match self.extractor.fetch_image(url, Some(referer)).await {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(page = index + 1, url, error = %err, "missing page");
                return false;
            },
        };
        let path = dir.join(page_file_name(index, url));
        match fs::write(&path, bytes).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "could not write page");
                false
            },
        }
    }
}

impl std::fmt::Debug for Downloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Downloader")
            .field("format", &self.packager.format())
            .field("output_dir", &self.output_dir)
            .field("workers", &self.workers)
            .finish_non_exhaustive()
    }
}
