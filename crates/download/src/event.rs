use std::path::PathBuf;

use tome_extract::SeriesInfo;

/// Progress events emitted by [`Downloader::download`](crate::Downloader::download).
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started): exactly once.
/// 2. [`ChaptersQueued`](Self::ChaptersQueued): exactly once, with the
///    number of chapters left after range filtering, followed by one
///    [`ChapterStatus::Queued`] per chapter.
/// 3. [`Chapter`](Self::Chapter): per chapter in reading order,
///    [`Fetching`](ChapterStatus::Fetching) and then exactly one of
///    [`Packaged`](ChapterStatus::Packaged), [`Skipped`](ChapterStatus::Skipped)
///    or [`Failed`](ChapterStatus::Failed). Skipped chapters are never
///    fetched.
/// 4. [`Complete`](Self::Complete) or [`Cancelled`](Self::Cancelled):
///    exactly once, last.
///
/// A series-level error terminates the stream early, in which case neither
/// final event is emitted.
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadEvent {
    Started(SeriesInfo),
    ChaptersQueued(u64),
    Chapter { index: usize, title: String, status: ChapterStatus },
    /// Cancellation was requested; chapters after `index` were not started.
    Cancelled(DownloadSummary),
    Complete(DownloadSummary),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChapterStatus {
    Queued,
    Fetching,
    /// Packaged and recorded as complete.
    Packaged(PathBuf),
    /// Already recorded as complete.
    Skipped,
    Failed(String),
}
impl ChapterStatus {
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Packaged(_) | Self::Skipped | Self::Failed(_))
    }
}

/// Per-series tally.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DownloadSummary {
    pub series: String,
    pub queued: usize,
    pub packaged: Vec<PathBuf>,
    pub skipped: usize,
    pub failed: usize,
}
impl DownloadSummary {
    pub(crate) fn new(series: impl Into<String>, queued: usize) -> Self {
        Self { series: series.into(), queued, ..Self::default() }
    }

    pub(crate) fn record(&mut self, status: &ChapterStatus) {
        match status {
            ChapterStatus::Packaged(path) => self.packaged.push(path.clone()),
            ChapterStatus::Skipped => self.skipped += 1,
            ChapterStatus::Failed(_) => self.failed += 1,
            ChapterStatus::Queued | ChapterStatus::Fetching => {},
        }
    }
}
