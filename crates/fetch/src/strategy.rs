//! Asset retrieval with alternative referer strategies.
//!
//! Image hosts disagree on what a "good" request looks like: some insist on a
//! referer from their own site (hot-link protection), some CDNs refuse any
//! foreign referer at all, and some only accept their own origin. Each
//! strategy is tried in turn until one returns a non-empty body.

use crate::Transport;
use crate::error::{ErrorKind, Result};
use tracing::instrument;
use url::Url;

/// Which `Referer` header an attempt sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefererStrategy {
    /// The chapter page that linked to the asset.
    ChapterPage,
    /// No `Referer` header at all.
    Omitted,
    /// The asset's own origin root, `scheme://host/`.
    OriginRoot,
}
impl RefererStrategy {
    /// Order in which strategies are attempted.
    pub const ORDER: [Self; 3] = [Self::ChapterPage, Self::Omitted, Self::OriginRoot];

    /// The referer to send, or `None` if the strategy doesn't apply to this
    /// request (no chapter page known).
    fn referer(self, asset: &Url, hint: Option<&str>) -> Option<Option<String>> {
        match self {
            Self::ChapterPage => hint.map(|h| Some(h.to_string())),
            Self::Omitted => Some(None),
            Self::OriginRoot => Some(Some(format!("{}/", asset.origin().ascii_serialization()))),
        }
    }
}

/// What happened to a single attempt.
#[derive(Debug)]
pub enum Attempt {
    Fetched(Vec<u8>),
    Skipped,
    Failed(crate::error::Error),
}

impl Transport {
    /// Runs one strategy against the asset.
    pub async fn attempt(&self, url: &Url, strategy: RefererStrategy, referer_hint: Option<&str>) -> Attempt {
        let Some(referer) = strategy.referer(url, referer_hint) else {
            return Attempt::Skipped;
        };
        match self.get_bytes(url, referer.as_deref()).await {
            Ok(body) => Attempt::Fetched(body),
            Err(err) => Attempt::Failed(err),
        }
    }

    /// Fetch an asset, trying each [`RefererStrategy`] in order.
    ///
    /// Zero-length bodies count as failures even with a success status. When
    /// every strategy fails the last failure is kept as the source of
    /// [`ErrorKind::Exhausted`]; callers should treat that as a missing page
    /// rather than anything fatal.
    #[instrument(level = "debug", skip_all, fields(url = url.as_ref()))]
    pub async fn fetch_bytes(&self, url: impl AsRef<str>, referer_hint: Option<&str>) -> Result<Vec<u8>> {
        let asset = crate::sanitize_url(url.as_ref())?;
        let mut last_failure = None;
        for strategy in RefererStrategy::ORDER {
            match self.attempt(&asset, strategy, referer_hint).await {
                Attempt::Fetched(body) => {
                    tracing::debug!(?strategy, bytes = body.len(), "asset fetched");
                    return Ok(body);
                },
                Attempt::Skipped => continue,
                Attempt::Failed(err) => {
                    tracing::debug!(?strategy, error = %*err, "strategy failed");
                    last_failure = Some(err);
                },
            }
        }
        let exhausted = ErrorKind::Exhausted(asset.to_string());
        match last_failure {
            Some(err) => Err(err.raise(exhausted)),
            // Unreachable in practice: `Omitted` always applies.
            None => exn::bail!(exhausted),
        }
    }
}
