//! Finding the live host of a site whose domain keeps rotating.
//!
//! Candidate hosts come from a [`HostCatalog`]: domain templates crossed with
//! subdomain prefixes. Templates are tried one at a time in priority order,
//! the subdomain variants of one template are probed together.

use std::collections::HashSet;
use std::sync::Arc;

use async_stream::stream;
use async_trait::async_trait;
use futures::future::join_all;
use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tome_fetch::Transport;
use tracing::instrument;
use url::Url;

const NAME_TOKEN: &str = "{name}";

const DISCOVERY_TEMPLATES: [&str; 26] = [
    "read{name}.com",
    "read-{name}.com",
    "{name}-manga.com",
    "read-{name}-manga.com",
    "{name}.com",
    "{name}-online.com",
    "{name}online.com",
    "read{name}free.com",
    "read-{name}-free.com",
    "{name}-free.com",
    "{name}.net",
    "read{name}.net",
    "{name}-manga.net",
    "{name}.to",
    "read{name}.to",
    "{name}.gg",
    "{name}.org",
    "{name}.cc",
    "{name}.io",
    "{name}.xyz",
    "{name}scans.com",
    "manga-{name}.com",
    "read-{name}-online.com",
    "manga{name}online.com",
    "my{name}.com",
    "the{name}.com",
];

/// Something that can tell whether a candidate URL is alive.
#[async_trait]
pub trait Prober: Send + Sync {
    /// The final URL (after redirects) when the candidate answers with a
    /// success status, `None` otherwise.
    async fn probe_origin(&self, candidate: &Url) -> Option<Url>;
}

#[async_trait]
impl Prober for Transport {
    async fn probe_origin(&self, candidate: &Url) -> Option<Url> {
        match self.probe(candidate).await {
            Ok(url) => Some(url),
            Err(err) => {
                tracing::trace!(%candidate, error = %err, "candidate is not live");
                None
            },
        }
    }
}

/// Ordered domain templates crossed with subdomain prefixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostCatalog {
    templates: Vec<String>,
    subdomains: Vec<String>,
}
impl HostCatalog {
    pub fn new(
        templates: impl IntoIterator<Item = impl Into<String>>,
        subdomains: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            templates: templates.into_iter().map(Into::into).collect(),
            subdomains: subdomains.into_iter().map(Into::into).collect(),
        }
    }

    /// Guess a site's domain from a bare series slug.
    pub fn discovery() -> Self {
        Self::new(DISCOVERY_TEMPLATES, ["", "www"])
    }

    /// Rotate the numbered subdomains of a known domain.
    pub fn rotation() -> Self {
        let numbered = (1..=9).map(|n| format!("w{n}"));
        Self::new([NAME_TOKEN], ["", "www"].into_iter().map(String::from).chain(numbered))
    }

    /// [`rotation`](Self::rotation) for a domain, [`discovery`](Self::discovery)
    /// for a slug.
    pub fn for_name(name: &str) -> Self {
        if name.contains('.') { Self::rotation() } else { Self::discovery() }
    }

    pub fn templates(&self) -> &[String] {
        &self.templates
    }

    pub fn subdomains(&self) -> &[String] {
        &self.subdomains
    }

    /// Candidate URLs grouped per template, in priority order.
    pub fn candidates(&self, name: &str, test_path: &str) -> Vec<Vec<Url>> {
        let path = match test_path.trim() {
            "" => "/".to_string(),
            path if path.starts_with('/') => path.to_string(),
            path => format!("/{path}"),
        };
        self.templates
            .iter()
            .map(|template| {
                let host = template.replace(NAME_TOKEN, name);
                self.subdomains
                    .iter()
                    .filter_map(|subdomain| {
                        let raw = match subdomain.as_str() {
                            "" => format!("https://{host}{path}"),
                            subdomain => format!("https://{subdomain}.{host}{path}"),
                        };
                        Url::parse(&raw).ok()
                    })
                    .collect()
            })
            .collect()
    }
}

/// Reduce a URL to its origin (scheme, host and port).
pub fn origin_of(url: &Url) -> String {
    url.origin().ascii_serialization()
}

#[derive(Clone)]
pub struct MirrorHunter {
    prober: Arc<dyn Prober>,
    catalog: Option<HostCatalog>,
    cancel: CancellationToken,
}
impl MirrorHunter {
    pub fn new(prober: Arc<dyn Prober>) -> Self {
        Self { prober, catalog: None, cancel: CancellationToken::new() }
    }

    /// Once `cancel` fires, sweeps stop probing and end early.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Always use this catalog instead of picking one per name.
    pub fn with_catalog(mut self, catalog: HostCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    fn catalog_for(&self, name: &str) -> HostCatalog {
        self.catalog.clone().unwrap_or_else(|| HostCatalog::for_name(name))
    }

    /// Every live origin for `name`, lazily and in priority order.
    ///
    /// Nothing is probed until the stream is polled, and templates after the
    /// last one polled are never probed. The same origin is only yielded once
    /// even when several candidates redirect to it. A cancelled sweep ends
    /// without probing anything further; probes already in flight are
    /// abandoned.
    pub fn sweep<'a>(&'a self, name: &'a str, test_path: &'a str) -> impl Stream<Item = Url> + Send + 'a {
        let groups = self.catalog_for(name).candidates(name, test_path);
        stream! {
            let mut seen = HashSet::new();
            for group in groups {
                if self.cancel.is_cancelled() {
                    tracing::debug!(%name, "sweep cancelled");
                    break;
                }
                let probes = join_all(group.iter().map(|candidate| self.prober.probe_origin(candidate)));
                let results = tokio::select! {
                    results = probes => results,
                    () = self.cancel.cancelled() => break,
                };
                for live in results.into_iter().flatten() {
                    let origin = origin_of(&live);
                    if let Ok(origin) = Url::parse(&origin)
                        && seen.insert(origin.clone())
                    {
                        yield origin;
                    }
                }
            }
        }
    }

    /// The first live origin in priority order.
    #[instrument(skip(self))]
    pub async fn find_active_mirror(&self, name: &str, test_path: &str) -> Option<Url> {
        let found = self.sweep(name, test_path).boxed().next().await;
        match &found {
            Some(origin) => tracing::info!(%origin, "found live mirror"),
            None => tracing::warn!("no live mirror"),
        }
        found
    }
}

impl std::fmt::Debug for MirrorHunter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MirrorHunter").field("catalog", &self.catalog).finish_non_exhaustive()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FakeProber;
    use super::*;

    #[test]
    fn test_catalog_is_chosen_by_the_shape_of_the_name() {
        let discovery = HostCatalog::for_name("solo-leveling");
        assert_eq!(discovery.templates().len(), 26);
        assert_eq!(discovery.templates()[0], "read{name}.com");
        assert_eq!(discovery.subdomains(), ["", "www"]);

        let rotation = HostCatalog::for_name("asuracomic.net");
        assert_eq!(rotation.templates(), ["{name}"]);
        assert_eq!(rotation.subdomains().len(), 11);
        assert_eq!(rotation.subdomains()[2], "w1");
    }

    #[test]
    fn test_candidates_follow_template_then_subdomain_order() {
        let groups = HostCatalog::discovery().candidates("foo", "manga/foo");
        assert_eq!(groups.len(), 26);
        let first: Vec<_> = groups[0].iter().map(Url::as_str).collect();
        assert_eq!(first, ["https://readfoo.com/manga/foo", "https://www.readfoo.com/manga/foo"]);
        assert_eq!(groups[4][0].as_str(), "https://foo.com/manga/foo");
    }

    #[tokio::test]
    async fn test_first_template_with_a_live_host_wins() {
        let prober = Arc::new(
            FakeProber::default()
                .alive("https://www.read-foo.com/", "https://www.read-foo.com/home/")
                .alive("https://foo.com/", "https://foo.com/"),
        );
        let hunter = MirrorHunter::new(prober.clone());
        let found = hunter.find_active_mirror("foo", "").await;
        assert_eq!(found.map(String::from).as_deref(), Some("https://www.read-foo.com/"));
        // Only the first two templates were ever probed.
        assert_eq!(prober.calls().len(), 4);
    }

    #[tokio::test]
    async fn test_nothing_live_means_none() {
        let prober = Arc::new(FakeProber::default());
        let hunter = MirrorHunter::new(prober.clone()).with_catalog(HostCatalog::rotation());
        assert!(hunter.find_active_mirror("asuracomic.net", "/").await.is_none());
        assert_eq!(prober.calls().len(), 11);
    }

    #[tokio::test]
    async fn test_sweep_yields_each_origin_once_in_priority_order() {
        let prober = Arc::new(
            FakeProber::default()
                .alive("https://readfoo.com/x", "https://readfoo.com/x")
                .alive("https://www.readfoo.com/x", "https://readfoo.com/x")
                .alive("https://foo.net/x", "https://mirror.foo.net/x"),
        );
        let hunter = MirrorHunter::new(prober);
        let origins: Vec<String> = hunter.sweep("foo", "/x").map(String::from).collect().await;
        assert_eq!(origins, ["https://readfoo.com/", "https://mirror.foo.net/"]);
    }

    #[tokio::test]
    async fn test_cancelled_sweep_probes_nothing() {
        let prober = Arc::new(FakeProber::default().alive("https://readfoo.com/", "https://readfoo.com/"));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let hunter = MirrorHunter::new(prober.clone()).with_cancellation(cancel);
        assert!(hunter.find_active_mirror("foo", "").await.is_none());
        assert!(prober.calls().is_empty());
    }

    #[tokio::test]
    async fn test_cancelling_mid_sweep_stops_after_the_current_template() {
        let cancel = CancellationToken::new();
        let prober = Arc::new(FakeProber::default().cancelling(cancel.clone()));
        let hunter = MirrorHunter::new(prober.clone()).with_cancellation(cancel);
        let origins: Vec<Url> = hunter.sweep("attack-on-titan", "").collect().await;
        assert!(origins.is_empty());
        // Both subdomains of the first template are probed together, nothing after.
        assert_eq!(prober.calls(), ["https://readattack-on-titan.com/", "https://www.readattack-on-titan.com/"]);
    }
}
