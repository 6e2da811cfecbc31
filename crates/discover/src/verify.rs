//! Checking that a live host actually serves readable chapters.

use std::sync::Arc;

use async_trait::async_trait;
use exn::ResultExt;
use tokio_util::sync::CancellationToken;
use tome_download::{ChapterRange, Downloader};
use tome_extract::Extractor;
use tome_ledger::{Database, Ledger};
use tome_package::{ArchiveSummary, CbzPackager, inspect_archive};
use tracing::instrument;

use crate::error::{ErrorKind, Result};

const VERIFY_RANGE: ChapterRange = ChapterRange { start: 1.0, end: 1.0 };
const VERIFY_WORKERS: usize = 4;

/// Outcome of a quality check on one candidate series URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted(ArchiveSummary),
    Rejected(String),
}
impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }
}

/// An archive is good enough with a descriptor and at least one image, or
/// without one but with more than three images.
pub fn is_good_enough(contents: &ArchiveSummary) -> bool {
    (contents.has_descriptor && contents.images >= 1) || contents.images > 3
}

#[async_trait]
pub trait Verifier: Send + Sync {
    async fn verify(&self, series_url: &str) -> Verdict;
}

/// Downloads chapter 1 as a CBZ into a throwaway directory, against a
/// throwaway ledger, and looks inside the archive.
#[derive(Clone)]
pub struct DownloadVerifier {
    extractor: Arc<dyn Extractor>,
    cancel: CancellationToken,
}
impl DownloadVerifier {
    pub fn new(extractor: Arc<dyn Extractor>) -> Self {
        Self { extractor, cancel: CancellationToken::new() }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    async fn check(&self, series_url: &str) -> Result<Verdict> {
        let scratch = tempfile::tempdir().or_raise(|| ErrorKind::Scratch)?;
        let db = Database::connect_in_memory().await.or_raise(|| ErrorKind::Scratch)?;
        let downloader =
            Downloader::new(self.extractor.clone(), Ledger::from(&db), Arc::new(CbzPackager::default()), scratch.path())
                .with_workers(VERIFY_WORKERS);
        let summary = downloader
            .download_series(series_url, Some(VERIFY_RANGE), self.cancel.child_token(), |_| {})
            .await
            .or_raise(|| ErrorKind::Verification(series_url.to_string()));
        db.close().await;
        let summary = summary?;

        let packaged = summary.packaged.len();
        for archive in summary.packaged {
            let contents = tokio::task::spawn_blocking(move || inspect_archive(archive))
                .await
                .or_raise(|| ErrorKind::Verification(series_url.to_string()))?
                .or_raise(|| ErrorKind::Verification(series_url.to_string()))?;
            if is_good_enough(&contents) {
                return Ok(Verdict::Accepted(contents));
            }
        }
        Ok(Verdict::Rejected(format!(
            "{packaged} of {} chapter(s) packaged, none with enough pages",
            summary.queued
        )))
    }
}

#[async_trait]
impl Verifier for DownloadVerifier {
    #[instrument(skip(self))]
    async fn verify(&self, series_url: &str) -> Verdict {
        match self.check(series_url).await {
            Ok(verdict) => verdict,
            Err(err) => Verdict::Rejected(err.to_string()),
        }
    }
}

impl std::fmt::Debug for DownloadVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadVerifier").finish_non_exhaustive()
    }
}
