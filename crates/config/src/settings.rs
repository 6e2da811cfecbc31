//! Application settings.
//!
//! Layered with [`figment`], lowest priority first:
//!
//! 1. Built-in defaults.
//! 2. `config.toml` in the platform configuration directory.
//! 3. An explicitly requested file (`--config`), TOML, YAML or JSON.
//! 4. `TOME_*` environment variables, `__` separating nested keys
//!    (`TOME_REQUEST__PROXY=http://...`).
//!
//! Command-line flags are applied on top by the binary.

use crate::error::{ErrorKind, Result};
use crate::registry::RegistrySource;
use crate::{file_figment, project_dirs};
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Serialized};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tome_fetch::RequestConfig;
use tome_package::Format;

const ENV_PREFIX: &str = "TOME_";
const LEDGER_FILE: &str = "ledger.db";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Root directory that series folders are written into.
    pub output_dir: PathBuf,
    /// Ledger database. Defaults to `ledger.db` inside the output directory.
    pub ledger_path: Option<PathBuf>,
    /// Curated registry layers, lowest priority first.
    pub registry: Vec<PathBuf>,
    /// File the discovery pool writes the merged registry to. It is also
    /// the lowest-priority registry layer, so curated layers always win.
    pub registry_output: PathBuf,
    /// Page downloads in flight per chapter.
    pub workers: usize,
    pub format: Format,
    pub discovery: DiscoverySettings,
    pub request: RequestConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoverySettings {
    /// Names being discovered at the same time.
    pub workers: usize,
}
impl Default for DiscoverySettings {
    fn default() -> Self {
        Self { workers: 20 }
    }
}

impl Default for Settings {
    fn default() -> Self {
        let dirs = project_dirs();
        let mut registry = Vec::new();
        if let Some(dirs) = &dirs {
            registry.push(dirs.config_dir().join("sites.json"));
        }
        registry.push(PathBuf::from("sites.json"));
        let registry_output = dirs
            .as_ref()
            .map(|dirs| dirs.data_local_dir().join("discovered.json"))
            .unwrap_or_else(|| PathBuf::from("discovered.json"));
        Self {
            output_dir: PathBuf::from("downloads"),
            ledger_path: None,
            registry,
            registry_output,
            workers: 8,
            format: Format::default(),
            discovery: DiscoverySettings::default(),
            request: RequestConfig::default(),
        }
    }
}

impl Settings {
    /// Load settings from every layer, see the module documentation.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let default_file = project_dirs().map(|dirs| dirs.config_dir().join("config.toml"));
        Self::figment(default_file.as_deref(), explicit)?.extract().or_raise(|| ErrorKind::InvalidSettings)
    }

    /// The layered figment, exposed separately so that the layering can be
    /// tested without touching the real configuration directory.
    pub fn figment(default_file: Option<&Path>, explicit: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));
        if let Some(path) = default_file
            && path.exists()
        {
            figment = figment.merge(file_figment(path)?);
        }
        if let Some(path) = explicit {
            if !path.exists() {
                exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
            }
            figment = figment.merge(file_figment(path)?);
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.ledger_path.clone().unwrap_or_else(|| self.output_dir.join(LEDGER_FILE))
    }

    /// Registry layers in fold order: discovered entries first, then the
    /// curated files in the order they were configured.
    pub fn registry_sources(&self) -> Vec<RegistrySource> {
        std::iter::once(&self.registry_output).chain(&self.registry).map(|p| RegistrySource::File(p.clone())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.workers, 8);
        assert_eq!(settings.discovery.workers, 20);
        assert_eq!(settings.format, Format::Folder);
        assert_eq!(settings.request.max_connections, 300);
        assert_eq!(settings.ledger_path(), PathBuf::from("downloads/ledger.db"));
    }

    #[test]
    fn test_registry_output_is_lowest_priority() {
        let settings = Settings {
            registry: vec![PathBuf::from("a.json"), PathBuf::from("b.json")],
            registry_output: PathBuf::from("found.json"),
            ..Settings::default()
        };
        assert_eq!(
            settings.registry_sources(),
            vec![
                RegistrySource::File(PathBuf::from("found.json")),
                RegistrySource::File(PathBuf::from("a.json")),
                RegistrySource::File(PathBuf::from("b.json")),
            ]
        );
    }

    #[test]
    fn test_layering() {
        Jail::expect_with(|jail| {
            jail.create_file("default.toml", "workers = 2\noutput_dir = \"from-default\"")?;
            jail.create_file("explicit.yaml", "workers: 3\nformat: cbz\nrequest:\n  max_connections: 50")?;
            jail.set_env("TOME_WORKERS", "4");
            jail.set_env("TOME_REQUEST__PROXY", "http://127.0.0.1:8080");

            let figment = Settings::figment(Some(Path::new("default.toml")), Some(Path::new("explicit.yaml"))).unwrap();
            let settings: Settings = figment.extract()?;
            assert_eq!(settings.workers, 4);
            assert_eq!(settings.output_dir, PathBuf::from("from-default"));
            assert_eq!(settings.format, Format::Cbz);
            assert_eq!(settings.request.max_connections, 50);
            assert_eq!(settings.request.proxy.as_deref(), Some("http://127.0.0.1:8080"));
            // Untouched nested fields keep their defaults.
            assert_eq!(settings.request.probe_timeout_secs, 3);
            Ok(())
        });
    }

    #[test]
    fn test_missing_explicit_file() {
        Jail::expect_with(|_jail| {
            let err = Settings::figment(None, Some(Path::new("nope.toml"))).unwrap_err();
            assert!(matches!(&*err, ErrorKind::NotFound(_)));
            Ok(())
        });
    }
}
