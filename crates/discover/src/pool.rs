use std::collections::HashSet;
use std::path::PathBuf;
use std::pin::pin;
use std::sync::Arc;

use async_stream::stream;
use exn::ResultExt;
use futures::stream::FuturesUnordered;
use futures::{Stream, StreamExt};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tome_config::{Registry, SiteEntry};
use tome_resolve::{HostCatalog, MirrorHunter, origin_of};
use tracing::instrument;
use url::Url;

use crate::error::{ErrorKind, Result};
use crate::variants::{registry_domain, slug_variants, title_case};
use crate::verify::{Verdict, Verifier};

pub const DEFAULT_WORKERS: usize = 20;

/// Why no site was recorded for a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// No candidate host answered for any variant.
    NoLiveHost,
    /// Hosts answered, but none passed the quality check.
    Rejected(usize),
    /// Cancellation was requested while the name was being worked on.
    Cancelled,
}

/// What happened to one name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryOutcome {
    /// A verified site was recorded in the registry.
    Added { name: String, variant: String, origin: String },
    /// The registry already had an entry; nothing was probed.
    Skipped(String),
    Failed { name: String, reason: FailureReason },
}
impl DiscoveryOutcome {
    pub fn name(&self) -> &str {
        match self {
            Self::Added { name, .. } | Self::Skipped(name) | Self::Failed { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    pub added: Vec<String>,
    pub failed: Vec<String>,
    pub skipped: Vec<String>,
    /// Names never started because of cancellation.
    pub not_started: usize,
}
impl DiscoveryReport {
    fn record(&mut self, outcome: &DiscoveryOutcome) {
        let name = outcome.name().to_string();
        match outcome {
            DiscoveryOutcome::Added { .. } => self.added.push(name),
            DiscoveryOutcome::Skipped(_) => self.skipped.push(name),
            DiscoveryOutcome::Failed { .. } => self.failed.push(name),
        }
    }
}

/// Finds and verifies a site for each of many series names.
///
/// Every verified site goes straight into the registry file, so an
/// interrupted run loses at most the names that were in flight and a rerun
/// picks up where the last one stopped.
pub struct DiscoveryPool {
    hunter: MirrorHunter,
    verifier: Arc<dyn Verifier>,
    registry: Mutex<Registry>,
    registry_path: PathBuf,
    workers: usize,
    cancel: CancellationToken,
}

impl DiscoveryPool {
    /// Names already in `registry` are skipped. The registry, including
    /// everything discovered, is written to `registry_path`.
    pub fn new(
        hunter: MirrorHunter,
        verifier: Arc<dyn Verifier>,
        registry: Registry,
        registry_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            hunter: hunter.with_catalog(HostCatalog::discovery()),
            verifier,
            registry: Mutex::new(registry),
            registry_path: registry_path.into(),
            workers: DEFAULT_WORKERS,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Once `cancel` fires, no further name is admitted and names in flight
    /// stop probing.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.hunter = self.hunter.with_cancellation(cancel.clone());
        self.cancel = cancel;
        self
    }

    /// A copy of the registry as it stands.
    pub async fn registry(&self) -> Registry {
        self.registry.lock().await.clone()
    }

    /// Streams one [`DiscoveryOutcome`] per name, in completion order.
    ///
    /// Up to `workers` names are worked on at once and further names are
    /// admitted in the order given. Repeated names are only worked on once.
    /// Once cancelled, no further name is admitted.
    pub fn discover<'a>(&'a self, names: Vec<String>) -> impl Stream<Item = DiscoveryOutcome> + 'a {
        // `rustfmt` does not format macros that use braces. Wrap in parentheses!
        stream!({
            let mut futures: Vec<_> = unique(names).into_iter().map(|name| self.discover_one(name)).collect();
            let mut processing = FuturesUnordered::new();
            processing.extend(futures.drain(..self.workers.min(futures.len())));
            while let Some(outcome) = processing.next().await {
                yield outcome;
                // Pop-n-push, but FIFO instead of LIFO.
                if !futures.is_empty() && !self.cancel.is_cancelled() {
                    processing.push(futures.remove(0));
                }
            }
            if !futures.is_empty() {
                tracing::info!(remaining = futures.len(), "cancelled, not starting any more names");
            }
        })
    }

    /// Drains [`discover`](Self::discover), handing every outcome to
    /// `observer`, and saves the registry one last time.
    pub async fn discover_all(
        &self,
        names: Vec<String>,
        mut observer: impl FnMut(&DiscoveryOutcome),
    ) -> Result<DiscoveryReport> {
        let names = unique(names);
        let total = names.len();
        let mut report = DiscoveryReport::default();
        let mut outcomes = pin!(self.discover(names));
        while let Some(outcome) = outcomes.next().await {
            observer(&outcome);
            report.record(&outcome);
        }
        report.not_started = total - report.added.len() - report.failed.len() - report.skipped.len();
        if !report.added.is_empty() {
            let registry = self.registry.lock().await;
            registry.save(&self.registry_path).await.or_raise(|| ErrorKind::Persist(self.registry_path.clone()))?;
        }
        tracing::info!(
            added = report.added.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            "discovery finished"
        );
        Ok(report)
    }

    #[instrument(skip(self))]
    async fn discover_one(&self, name: String) -> DiscoveryOutcome {
        if self.registry.lock().await.contains(&name) {
            tracing::debug!("already known");
            return DiscoveryOutcome::Skipped(name);
        }
        let cancelled = |name| DiscoveryOutcome::Failed { name, reason: FailureReason::Cancelled };

        let mut rejected = 0;
        for variant in slug_variants(&name) {
            if self.cancel.is_cancelled() {
                return cancelled(name);
            }
            // The hunter shares the token, so a cancelled sweep just runs dry.
            let mut live = pin!(self.hunter.sweep(&variant, ""));
            while let Some(origin) = live.next().await {
                if self.cancel.is_cancelled() {
                    return cancelled(name);
                }
                let series_url = format!("{}/manga/{variant}", origin_of(&origin));
                let verdict = tokio::select! {
                    verdict = self.verifier.verify(&series_url) => verdict,
                    () = self.cancel.cancelled() => return cancelled(name),
                };
                match verdict {
                    Verdict::Accepted(contents) => {
                        tracing::info!(%origin, %variant, images = contents.images, "verified");
                        self.record(&name, &variant, &origin).await;
                        return DiscoveryOutcome::Added { name, variant: variant.clone(), origin: origin_of(&origin) };
                    },
                    Verdict::Rejected(why) => {
                        tracing::debug!(%origin, %variant, reason = %why, "rejected");
                        rejected += 1;
                    },
                }
            }
        }
        if self.cancel.is_cancelled() {
            return cancelled(name);
        }

        let reason = match rejected {
            0 => FailureReason::NoLiveHost,
            n => FailureReason::Rejected(n),
        };
        tracing::debug!(?reason, "nothing found");
        DiscoveryOutcome::Failed { name, reason }
    }

    /// Add the entry and rewrite the registry file while holding the lock, so
    /// saves never interleave. A failed save is retried with the next one.
    async fn record(&self, name: &str, variant: &str, origin: &Url) {
        let entry = SiteEntry::mirrored(
            title_case(name),
            registry_domain(origin.host_str().unwrap_or_default()),
            format!("/manga/{variant}"),
            format!("{}/manga/{variant}", SiteEntry::MIRROR_TOKEN),
        );
        let mut registry = self.registry.lock().await;
        registry.insert(name, entry);
        if let Err(err) = registry.save(&self.registry_path).await {
            tracing::warn!(path = %self.registry_path.display(), error = %err, "could not save registry");
        }
    }
}

/// Drops repeated names, keeping the first occurrence in place.
fn unique(names: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    names.into_iter().filter(|name| seen.insert(name.clone())).collect()
}

impl std::fmt::Debug for DiscoveryPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryPool")
            .field("registry_path", &self.registry_path)
            .field("workers", &self.workers)
            .finish_non_exhaustive()
    }
}
