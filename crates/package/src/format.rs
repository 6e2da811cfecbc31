use crate::error::{Error, ErrorKind};
use crate::{CbzPackager, FolderPackager, PackagerHandle};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Final shape of a downloaded chapter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Loose page files in a directory.
    #[default]
    Folder,
    /// Comic book archive (.cbz), a zip of the page files.
    Cbz,
}

impl FromStr for Format {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "folder" | "dir" | "directory" => Ok(Format::Folder),
            "cbz" | "zip" => Ok(Format::Cbz),
            _ => exn::bail!(ErrorKind::UnsupportedFormat(s.to_string())),
        }
    }
}
impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Format::Folder => "folder",
            Format::Cbz => "cbz",
        })
    }
}
impl Format {
    /// File extension of the artifact, if it's a single file.
    #[must_use]
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            Format::Folder => None,
            Format::Cbz => Some("cbz"),
        }
    }

    /// The packager producing this format, with its default behaviour.
    pub fn packager(self) -> PackagerHandle {
        match self {
            Format::Folder => Arc::new(FolderPackager),
            Format::Cbz => Arc::new(CbzPackager::default()),
        }
    }
}
