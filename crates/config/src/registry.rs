//! Site registry: slug → [`SiteEntry`].
//!
//! The registry is assembled from an explicit, ordered list of
//! [`RegistrySource`]s. Sources are folded left to right and a later source
//! replaces an earlier source's entry **as a whole**; fields are never merged
//! across layers, so a curated `static` entry can't inherit a stale
//! `base_domain` from a discovered one.

use crate::error::{ErrorKind, Result};
use crate::file_figment;
use exn::ResultExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// How a site's URL is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteKind {
    /// A fixed URL that is used as-is.
    Static,
    /// The host rotates; it has to be rediscovered with the mirror hunter
    /// every time the entry is resolved.
    Dynamic,
}

/// A known site for one series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteEntry {
    /// Display name. Falls back to the registry key when empty.
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: SiteKind,
    /// Domain (or bare slug) the mirror hunter starts from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_domain: Option<String>,
    /// Path probed to check a candidate mirror is alive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_path: Option<String>,
    /// Series URL with a `{mirror}` token standing in for the live origin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_pattern: Option<String>,
    /// Direct URL for static entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}
impl SiteEntry {
    /// Token in [`url_pattern`](Self::url_pattern) replaced by the live mirror origin.
    pub const MIRROR_TOKEN: &'static str = "{mirror}";

    /// A static entry pointing at a fixed URL.
    pub fn fixed(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: SiteKind::Static,
            base_domain: None,
            test_path: None,
            url_pattern: None,
            url: Some(url.into()),
        }
    }

    /// A dynamic entry whose host has to be hunted down on every resolution.
    pub fn mirrored(
        name: impl Into<String>,
        base_domain: impl Into<String>,
        test_path: impl Into<String>,
        url_pattern: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: SiteKind::Dynamic,
            base_domain: Some(base_domain.into()),
            test_path: Some(test_path.into()),
            url_pattern: Some(url_pattern.into()),
            url: None,
        }
    }

    pub fn display_name<'a>(&'a self, key: &'a str) -> &'a str {
        match self.name.trim() {
            "" => key,
            name => name,
        }
    }
}

/// One layer of the registry.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistrySource {
    /// A JSON, TOML or YAML file. Missing files are an empty layer.
    File(PathBuf),
    /// Entries supplied in code.
    Inline(BTreeMap<String, SiteEntry>),
}
impl From<PathBuf> for RegistrySource {
    fn from(path: PathBuf) -> Self {
        Self::File(path)
    }
}
impl From<&Path> for RegistrySource {
    fn from(path: &Path) -> Self {
        Self::File(path.to_path_buf())
    }
}
impl RegistrySource {
    fn load(&self) -> Result<BTreeMap<String, SiteEntry>> {
        match self {
            Self::Inline(sites) => Ok(sites.clone()),
            Self::File(path) if !path.exists() => {
                tracing::debug!(path = %path.display(), "registry layer not found, skipping");
                Ok(BTreeMap::new())
            },
            Self::File(path) => file_figment(path)?.extract().or_raise(|| ErrorKind::InvalidRegistry(path.clone())),
        }
    }
}

/// Mapping of canonical slug to [`SiteEntry`], iterated in key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    sites: BTreeMap<String, SiteEntry>,
}
impl FromIterator<(String, SiteEntry)> for Registry {
    fn from_iter<T: IntoIterator<Item = (String, SiteEntry)>>(iter: T) -> Self {
        Self { sites: iter.into_iter().collect() }
    }
}
impl Registry {
    /// Fold the sources left to right, lowest priority first.
    #[instrument(skip_all, fields(layers = sources.len()))]
    pub fn load(sources: &[RegistrySource]) -> Result<Self> {
        let sites = sources.iter().try_fold(BTreeMap::new(), |mut sites, source| {
            // `extend` replaces whole values by key.
            sites.extend(source.load()?);
            Ok::<_, crate::error::Error>(sites)
        })?;
        tracing::debug!(sites = sites.len(), "site registry loaded");
        Ok(Self { sites })
    }

    pub fn get(&self, key: &str) -> Option<&SiteEntry> {
        self.sites.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.sites.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SiteEntry)> {
        self.sites.iter().map(|(key, entry)| (key.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Insert or overwrite an entry, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, entry: SiteEntry) -> Option<SiteEntry> {
        self.sites.insert(key.into(), entry)
    }

    /// Persist the whole registry as JSON.
    ///
    /// Written to a sibling temporary file first and renamed over the target,
    /// so a crash mid-write leaves the previous file intact.
    #[instrument(skip_all, fields(path = %path.as_ref().display(), sites = self.sites.len()))]
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_vec_pretty(&self.sites).or_raise(|| ErrorKind::Persist(path.to_path_buf()))?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.or_raise(|| ErrorKind::Persist(path.to_path_buf()))?;
        }
        let mut temporary = path.as_os_str().to_owned();
        temporary.push(".tmp");
        let temporary = PathBuf::from(temporary);
        tokio::fs::write(&temporary, json).await.or_raise(|| ErrorKind::Persist(path.to_path_buf()))?;
        tokio::fs::rename(&temporary, path).await.or_raise(|| ErrorKind::Persist(path.to_path_buf()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_json_layer() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "sites.json",
            r#"{
                "solo-leveling": {"name": "Solo Leveling", "type": "static", "url": "https://example.org/manga/solo-leveling"},
                "one-piece": {"name": "One Piece", "type": "dynamic", "base_domain": "readonepiece.com",
                              "test_path": "/manga/one-piece", "url_pattern": "{mirror}/manga/one-piece"}
            }"#,
        );
        let registry = Registry::load(&[path.into()]).unwrap();
        assert_eq!(registry.len(), 2);
        let solo = registry.get("solo-leveling").unwrap();
        assert_eq!(solo.kind, SiteKind::Static);
        assert_eq!(solo.url.as_deref(), Some("https://example.org/manga/solo-leveling"));
        let piece = registry.get("one-piece").unwrap();
        assert_eq!(piece.kind, SiteKind::Dynamic);
        assert_eq!(piece.base_domain.as_deref(), Some("readonepiece.com"));
    }

    #[test]
    fn test_later_layers_replace_whole_entries() {
        let dir = tempfile::tempdir().unwrap();
        let low = write(
            dir.path(),
            "low.json",
            r#"{
                "a": {"name": "A", "type": "dynamic", "base_domain": "a.com", "test_path": "/", "url_pattern": "{mirror}/a"},
                "b": {"name": "B", "type": "static", "url": "https://b.example/"}
            }"#,
        );
        let high = write(
            dir.path(),
            "high.toml",
            r#"
                [a]
                name = "A (curated)"
                type = "static"
                url = "https://a.example/"
            "#,
        );
        let registry = Registry::load(&[low.into(), high.into()]).unwrap();
        let a = registry.get("a").unwrap();
        assert_eq!(a, &SiteEntry::fixed("A (curated)", "https://a.example/"));
        // Nothing leaks through from the lower layer.
        assert_eq!(a.base_domain, None);
        assert_eq!(registry.get("b").unwrap().url.as_deref(), Some("https://b.example/"));
    }

    #[test]
    fn test_missing_layer_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::load(&[dir.path().join("nope.json").into()]).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_inline_layer() {
        let inline = BTreeMap::from([("x".to_string(), SiteEntry::fixed("X", "https://x.example/"))]);
        let registry = Registry::load(&[RegistrySource::Inline(inline)]).unwrap();
        assert!(registry.contains("x"));
    }

    #[test]
    fn test_invalid_layer() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "broken.json", r#"{"a": {"type": "sometimes"}}"#);
        let err = Registry::load(&[path.into()]).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidRegistry(_)));
    }

    #[test]
    fn test_unsupported_layer_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "sites.ini", "a=b");
        let err = Registry::load(&[path.into()]).unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnsupportedFormat(_)));
    }

    #[test]
    fn test_display_name_falls_back_to_key() {
        let mut entry = SiteEntry::fixed("", "https://x.example/");
        assert_eq!(entry.display_name("x-key"), "x-key");
        entry.name = "X".to_string();
        assert_eq!(entry.display_name("x-key"), "X");
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/discovered.json");
        let mut registry = Registry::default();
        registry.insert("solo-leveling", SiteEntry::fixed("Solo Leveling", "https://example.org/manga/solo-leveling"));
        registry.insert(
            "one-piece",
            SiteEntry::mirrored("One Piece", "readonepiece.com", "/manga/one-piece", "{mirror}/manga/one-piece"),
        );
        registry.save(&path).await.unwrap();
        assert!(!dir.path().join("nested/discovered.json.tmp").exists());

        let loaded = Registry::load(&[path.clone().into()]).unwrap();
        assert_eq!(loaded, registry);
        // Optional fields are left out rather than written as `null`.
        let raw = fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("null"));
    }
}
