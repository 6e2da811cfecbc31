//! Configuration for tome: the layered site registry and the application
//! settings.

pub mod error;
mod registry;
mod settings;

pub use crate::registry::{Registry, RegistrySource, SiteEntry, SiteKind};
pub use crate::settings::{DiscoverySettings, Settings};

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use figment::Figment;
use figment::providers::{Format as _, Json, Toml, Yaml};
use std::path::Path;

pub(crate) fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "tome")
}

/// A figment holding a single file, parsed according to its extension.
pub(crate) fn file_figment(path: &Path) -> Result<Figment> {
    let extension = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
    let figment = match extension.as_deref() {
        Some("json") => Figment::from(Json::file(path)),
        Some("toml") => Figment::from(Toml::file(path)),
        Some("yaml" | "yml") => Figment::from(Yaml::file(path)),
        _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
    };
    Ok(figment)
}
