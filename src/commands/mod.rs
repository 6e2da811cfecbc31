mod discover;
mod download;
mod listing;

pub use self::discover::discover;
pub use self::download::download;
pub use self::listing::{available, library, search};

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use tome_config::{Registry, Settings};
use tome_fetch::Transport;

fn transport(settings: &Settings) -> Result<Transport> {
    Transport::new(settings.request.clone()).or_raise(|| ErrorKind::Transport)
}

fn registry(settings: &Settings) -> Result<Registry> {
    Registry::load(&settings.registry_sources()).or_raise(|| ErrorKind::Registry)
}
