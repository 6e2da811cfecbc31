use derive_more::{Display, Error};
use std::path::PathBuf;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("could not load settings")]
    Settings,
    #[display("could not load the site registry")]
    Registry,
    #[display("could not open the completion ledger")]
    Ledger,
    #[display("could not set up the HTTP client")]
    Transport,
    #[display("could not resolve '{_0}'")]
    Resolve(#[error(not(source))] String),
    #[display("nothing in the registry matches '{_0}'")]
    Unmatched(#[error(not(source))] String),
    #[display("no series selected")]
    Cancelled,
    #[display("download failed")]
    Download,
    #[display("discovery failed")]
    Discover,
    #[display("could not read names from {}", _0.display())]
    NamesFile(#[error(not(source))] PathBuf),
}
