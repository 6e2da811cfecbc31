use async_trait::async_trait;
use exn::{OptionExt, ResultExt};
use tome_config::{Registry, SiteEntry, SiteKind};
use tome_fetch::sanitize_url;
use tracing::instrument;
use url::Url;

use crate::error::{ErrorKind, Result};
use crate::mirror::{MirrorHunter, origin_of};
use crate::score::{Candidate, ScoreConfig, normalize_input, rank};

/// What the user picked out of a list of candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Cancel,
    /// One-based position in the list shown.
    Pick(usize),
}

/// Parse a typed answer to a candidate prompt. `0` cancels, `1..=count`
/// picks; anything else is `None` so the caller can ask again.
pub fn parse_choice(line: &str, count: usize) -> Option<Choice> {
    match line.trim().parse::<usize>().ok()? {
        0 => Some(Choice::Cancel),
        n if n <= count => Some(Choice::Pick(n)),
        _ => None,
    }
}

/// Asks someone to pick between close matches.
#[async_trait]
pub trait Disambiguator: Send + Sync {
    async fn choose(&self, query: &str, candidates: &[Candidate]) -> Choice;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTarget {
    pub url: Url,
    /// Registry key and entry the URL came from; `None` when the input was
    /// already a URL.
    pub site: Option<(String, SiteEntry)>,
    /// Match score on the 0–100 scale.
    pub confidence: f64,
}
impl ResolvedTarget {
    pub fn key(&self) -> Option<&str> {
        self.site.as_ref().map(|(key, _)| key.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(ResolvedTarget),
    /// Nothing in the registry came close to the input.
    Unmatched(String),
    /// The disambiguator declined every candidate.
    Cancelled,
}

/// Turns free-text input into a series URL using a registry snapshot.
#[derive(Debug, Clone)]
pub struct Resolver {
    registry: Registry,
    hunter: MirrorHunter,
    scoring: ScoreConfig,
}
impl Resolver {
    pub fn new(registry: Registry, hunter: MirrorHunter) -> Self {
        Self { registry, hunter, scoring: ScoreConfig::default() }
    }

    pub fn with_scoring(mut self, scoring: ScoreConfig) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The `limit` best fuzzy matches for a query, for listing.
    pub fn search(&self, query: &str, limit: usize) -> Vec<Candidate> {
        let mut candidates = rank(&self.registry, query, &self.scoring);
        candidates.truncate(limit);
        candidates
    }

    #[instrument(skip(self, disambiguator))]
    pub async fn resolve(&self, input: &str, disambiguator: &dyn Disambiguator) -> Result<Resolution> {
        let trimmed = input.trim();
        if let Ok(url) = Url::parse(trimmed)
            && matches!(url.scheme(), "http" | "https")
            && url.has_host()
        {
            return Ok(Resolution::Resolved(ResolvedTarget { url, site: None, confidence: 100.0 }));
        }

        let normalized = normalize_input(trimmed);
        if let Some(entry) = self.registry.get(&normalized) {
            tracing::debug!(key = %normalized, "exact registry match");
            return self.resolved(&normalized, entry, 100.0).await;
        }

        let mut candidates = rank(&self.registry, &normalized, &self.scoring);
        let Some(best) = candidates.first() else {
            tracing::warn!("no match in registry");
            return Ok(Resolution::Unmatched(input.to_string()));
        };
        if best.score >= self.scoring.auto_select_at {
            tracing::info!(key = %best.key, score = best.score, "high confidence match");
            return self.resolved(&best.key, &best.entry, best.score).await;
        }

        candidates.truncate(self.scoring.max_candidates);
        match disambiguator.choose(input, &candidates).await {
            Choice::Pick(n) if (1..=candidates.len()).contains(&n) => {
                let picked = &candidates[n - 1];
                self.resolved(&picked.key, &picked.entry, picked.score).await
            },
            Choice::Pick(n) => {
                tracing::warn!(choice = n, "choice out of range, treating as cancelled");
                Ok(Resolution::Cancelled)
            },
            Choice::Cancel => Ok(Resolution::Cancelled),
        }
    }

    async fn resolved(&self, key: &str, entry: &SiteEntry, confidence: f64) -> Result<Resolution> {
        let url = self.resolve_entry(key, entry).await?;
        Ok(Resolution::Resolved(ResolvedTarget { url, site: Some((key.to_string(), entry.clone())), confidence }))
    }

    /// The series URL for one registry entry, hunting down its live mirror
    /// when the entry is dynamic.
    #[instrument(skip(self, entry))]
    pub async fn resolve_entry(&self, key: &str, entry: &SiteEntry) -> Result<Url> {
        let invalid = || ErrorKind::InvalidEntry(key.to_string());
        let raw = match entry.kind {
            SiteKind::Static => entry.url.clone().ok_or_raise(invalid)?,
            SiteKind::Dynamic => {
                let base_domain = entry.base_domain.as_deref().ok_or_raise(invalid)?;
                let test_path = entry.test_path.as_deref().unwrap_or("/");
                let mirror = self
                    .hunter
                    .find_active_mirror(base_domain, test_path)
                    .await
                    .ok_or_raise(|| ErrorKind::MirrorUnresolved(key.to_string()))?;
                let origin = origin_of(&mirror);
                match &entry.url_pattern {
                    Some(pattern) => pattern.replace(SiteEntry::MIRROR_TOKEN, &origin),
                    None => origin,
                }
            },
        };
        sanitize_url(&raw).or_raise(invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::testing::FakeProber;
    use rstest::rstest;
    use std::sync::{Arc, Mutex};

    /// Replies with a fixed choice and remembers what it was shown.
    struct Scripted {
        choice: Choice,
        shown: Mutex<Vec<String>>,
    }
    impl Scripted {
        fn new(choice: Choice) -> Self {
            Self { choice, shown: Mutex::new(Vec::new()) }
        }
    }
    #[async_trait]
    impl Disambiguator for Scripted {
        async fn choose(&self, _query: &str, candidates: &[Candidate]) -> Choice {
            *self.shown.lock().unwrap() = candidates.iter().map(|c| c.key.clone()).collect();
            self.choice
        }
    }

    fn resolver(prober: FakeProber) -> Resolver {
        let registry: Registry = [
            ("solo-leveling", SiteEntry::fixed("", "https://example.org/manga/solo-leveling")),
            ("tower-b", SiteEntry::fixed("Tower B", "https://example.org/manga/tower-b")),
            ("tower-bb", SiteEntry::fixed("Tower BB", "https://example.org/manga/tower-bb")),
            ("foo", SiteEntry::mirrored("Foo", "foo", "/manga/foo", "{mirror}/manga/foo")),
            ("rotating", SiteEntry::mirrored("Rotating", "rotating.net", "/", "{mirror}/series/rotating")),
            ("broken", SiteEntry { url: None, ..SiteEntry::fixed("Broken", "") }),
        ]
        .into_iter()
        .map(|(key, entry)| (key.to_string(), entry))
        .collect();
        Resolver::new(registry, MirrorHunter::new(Arc::new(prober)))
    }

    fn resolved_url(resolution: Resolution) -> String {
        match resolution {
            Resolution::Resolved(target) => target.url.to_string(),
            other => panic!("expected a resolved target, got {other:?}"),
        }
    }

    #[rstest]
    #[case::https("https://elsewhere.net/manga/x", "https://elsewhere.net/manga/x")]
    #[case::padded("  http://elsewhere.net/x  ", "http://elsewhere.net/x")]
    #[tokio::test]
    async fn test_urls_pass_through(#[case] input: &str, #[case] expected: &str) {
        let resolver = resolver(FakeProber::default());
        let resolution = resolver.resolve(input, &Scripted::new(Choice::Cancel)).await.unwrap();
        assert_eq!(resolved_url(resolution), expected);
    }

    #[tokio::test]
    async fn test_case_and_space_variant_auto_matches() {
        let resolver = resolver(FakeProber::default());
        let disambiguator = Scripted::new(Choice::Cancel);
        let resolution = resolver.resolve("Solo Leveling", &disambiguator).await.unwrap();
        let Resolution::Resolved(target) = resolution else {
            panic!("expected a match");
        };
        assert_eq!(target.url.as_str(), "https://example.org/manga/solo-leveling");
        assert_eq!(target.key(), Some("solo-leveling"));
        assert!(target.confidence >= 80.0);
        assert!(disambiguator.shown.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_exact_key_has_full_confidence() {
        let resolver = resolver(FakeProber::default());
        let resolution = resolver.resolve("TOWER-B", &Scripted::new(Choice::Cancel)).await.unwrap();
        let Resolution::Resolved(target) = resolution else {
            panic!("expected a match");
        };
        assert_eq!(target.confidence, 100.0);
    }

    #[tokio::test]
    async fn test_resolution_is_deterministic() {
        let resolver = resolver(FakeProber::default());
        let first = resolver.resolve("solo levelin", &Scripted::new(Choice::Cancel)).await.unwrap();
        let second = resolver.resolve("solo levelin", &Scripted::new(Choice::Cancel)).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_nothing_close_is_unmatched() {
        let resolver = resolver(FakeProber::default());
        let resolution = resolver.resolve("zzzzzzzzzzzzzzzzzz", &Scripted::new(Choice::Pick(1))).await.unwrap();
        assert_eq!(resolution, Resolution::Unmatched("zzzzzzzzzzzzzzzzzz".to_string()));
    }

    #[rstest]
    #[case::first(Choice::Pick(1), Some("https://example.org/manga/tower-b"))]
    #[case::second(Choice::Pick(2), Some("https://example.org/manga/tower-bb"))]
    #[case::cancel(Choice::Cancel, None)]
    #[case::out_of_range(Choice::Pick(9), None)]
    #[tokio::test]
    async fn test_middling_matches_are_offered(#[case] choice: Choice, #[case] expected: Option<&str>) {
        let resolver = resolver(FakeProber::default());
        let disambiguator = Scripted::new(choice);
        let resolution = resolver.resolve("tower", &disambiguator).await.unwrap();
        assert_eq!(*disambiguator.shown.lock().unwrap(), ["tower-b", "tower-bb"]);
        match expected {
            Some(url) => assert_eq!(resolved_url(resolution), url),
            None => assert_eq!(resolution, Resolution::Cancelled),
        }
    }

    #[tokio::test]
    async fn test_dynamic_entries_substitute_the_live_origin() {
        let prober =
            FakeProber::default().alive("https://www.read-foo.com/manga/foo", "https://www.read-foo.com/manga/foo/");
        let resolver = resolver(prober);
        let resolution = resolver.resolve("foo", &Scripted::new(Choice::Cancel)).await.unwrap();
        assert_eq!(resolved_url(resolution), "https://www.read-foo.com/manga/foo");
    }

    #[tokio::test]
    async fn test_domains_rotate_through_numbered_subdomains() {
        let prober = FakeProber::default().alive("https://w3.rotating.net/", "https://w3.rotating.net/");
        let resolver = resolver(prober);
        let resolution = resolver.resolve("rotating", &Scripted::new(Choice::Cancel)).await.unwrap();
        assert_eq!(resolved_url(resolution), "https://w3.rotating.net/series/rotating");
    }

    #[tokio::test]
    async fn test_dead_mirrors_are_an_error() {
        let resolver = resolver(FakeProber::default());
        let err = resolver.resolve("foo", &Scripted::new(Choice::Cancel)).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::MirrorUnresolved(key) if key == "foo"));
    }

    #[tokio::test]
    async fn test_incomplete_entries_are_an_error() {
        let resolver = resolver(FakeProber::default());
        let err = resolver.resolve("broken", &Scripted::new(Choice::Cancel)).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidEntry(_)));
    }

    #[rstest]
    #[case::cancel("0", 3, Some(Choice::Cancel))]
    #[case::pick(" 2\n", 3, Some(Choice::Pick(2)))]
    #[case::last("3", 3, Some(Choice::Pick(3)))]
    #[case::too_big("4", 3, None)]
    #[case::garbage("two", 3, None)]
    fn test_choices(#[case] line: &str, #[case] count: usize, #[case] expected: Option<Choice>) {
        assert_eq!(parse_choice(line, count), expected);
    }

    #[test]
    fn test_search_is_capped() {
        let resolver = resolver(FakeProber::default());
        assert_eq!(resolver.search("tower", 1).len(), 1);
        assert_eq!(resolver.search("tower", 20).len(), 2);
    }
}
