//! Pure fuzzy scoring of free-text input against registry entries.

use percent_encoding::percent_decode_str;
use tome_config::{Registry, SiteEntry};

/// Thresholds (on the 0–100 scale) for fuzzy matching.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreConfig {
    /// Candidates scoring at or below this are never offered.
    pub discard_at_or_below: f64,
    /// A best candidate scoring at least this is picked without asking.
    pub auto_select_at: f64,
    /// How many candidates the disambiguator gets to choose from.
    pub max_candidates: usize,
}
impl Default for ScoreConfig {
    fn default() -> Self {
        Self { discard_at_or_below: 40.0, auto_select_at: 80.0, max_candidates: 5 }
    }
}

/// A registry entry that fuzzily matched the input.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub key: String,
    pub entry: SiteEntry,
    pub score: f64,
}
impl Candidate {
    pub fn name(&self) -> &str {
        self.entry.display_name(&self.key)
    }
}

/// Trim, percent-decode and case-fold user input.
pub fn normalize_input(raw: &str) -> String {
    percent_decode_str(raw.trim()).decode_utf8_lossy().trim().to_lowercase()
}

/// Normalized Levenshtein similarity in `[0, 1]`.
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b)
}

/// Best similarity of already-normalized input against an entry's key or
/// display name, scaled to 0–100.
pub fn score(input: &str, key: &str, name: &str) -> f64 {
    similarity(input, &key.to_lowercase()).max(similarity(input, &name.to_lowercase())) * 100.0
}

/// Every entry scoring above the discard threshold, best first.
///
/// Ties are broken by key so the result only depends on the registry
/// contents. The list is not truncated.
pub fn rank(registry: &Registry, input: &str, config: &ScoreConfig) -> Vec<Candidate> {
    let input = normalize_input(input);
    let mut candidates: Vec<Candidate> = registry
        .iter()
        .map(|(key, entry)| Candidate {
            key: key.to_string(),
            entry: entry.clone(),
            score: score(&input, key, entry.display_name(key)),
        })
        .filter(|candidate| candidate.score > config.discard_at_or_below)
        .collect();
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.key.cmp(&b.key)));
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn registry(keys: &[&str]) -> Registry {
        keys.iter().map(|key| (key.to_string(), SiteEntry::fixed("", format!("https://example.org/{key}")))).collect()
    }

    #[rstest]
    #[case::trimmed("  Solo Leveling ", "solo leveling")]
    #[case::percent("Solo%20Leveling", "solo leveling")]
    #[case::already("one-piece", "one-piece")]
    fn test_normalizes_input(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize_input(raw), expected);
    }

    #[test]
    fn test_score_takes_the_better_of_key_and_name() {
        assert_eq!(score("solo leveling", "solo-leveling", "Solo Leveling"), 100.0);
        let by_key = score("solo leveling", "solo-leveling", "Something Else");
        assert!(by_key > 90.0 && by_key < 100.0, "{by_key}");
    }

    #[test]
    fn test_ranking_discards_weak_matches_and_orders_best_first() {
        let registry = registry(&["tower-b", "tower-bb", "solo-leveling"]);
        let ranked = rank(&registry, "tower", &ScoreConfig::default());
        let keys: Vec<_> = ranked.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, ["tower-b", "tower-bb"]);
        assert!(ranked[0].score > ranked[1].score);
    }

    #[test]
    fn test_ties_are_broken_by_key() {
        let registry = registry(&["abc-2", "abc-1"]);
        let ranked = rank(&registry, "abc", &ScoreConfig::default());
        let keys: Vec<_> = ranked.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, ["abc-1", "abc-2"]);
        assert_eq!(ranked[0].score, ranked[1].score);
    }

    #[test]
    fn test_discard_threshold_is_configurable() {
        let registry = registry(&["tower-b", "tower-bb"]);
        let strict = ScoreConfig { discard_at_or_below: 65.0, ..ScoreConfig::default() };
        let ranked = rank(&registry, "tower", &strict);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].key, "tower-b");
    }
}
