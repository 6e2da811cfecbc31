use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tome_package::Format;

#[derive(Debug, Parser)]
#[command(name = "tome", version, about)]
pub struct Cli {
    /// Extra settings file (TOML, YAML or JSON), applied over config.toml.
    #[arg(long, global = true, env = "TOME_CONFIG")]
    pub config: Option<PathBuf>,
    /// Log at debug level. `RUST_LOG` takes precedence when set.
    #[arg(long, global = true)]
    pub debug: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve a series name or URL and download its chapters.
    Download(DownloadArgs),
    /// Find, verify and record sites for a list of series names.
    Discover(DiscoverArgs),
    /// Show the registry entries that best match a query.
    Search {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// List every site in the registry.
    Available,
    /// List downloaded series.
    Library,
}

#[derive(Debug, Args)]
pub struct DownloadArgs {
    /// Series name, registry key or URL.
    pub target: String,
    /// Directory series are downloaded into.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Pages downloaded at the same time.
    #[arg(short, long)]
    pub workers: Option<usize>,
    /// `folder` or `cbz`.
    #[arg(short, long, value_parser = parse_format)]
    pub format: Option<Format>,
    /// Chapters to download, e.g. `1-10` or `5`.
    #[arg(short, long)]
    pub range: Option<String>,
    /// Proxy for every request.
    #[arg(short, long)]
    pub proxy: Option<String>,
}

#[derive(Debug, Args)]
pub struct DiscoverArgs {
    /// JSON array of names, or one name per line.
    pub names: PathBuf,
    /// Names worked on at the same time.
    #[arg(long)]
    pub workers: Option<usize>,
}

fn parse_format(raw: &str) -> Result<Format, String> {
    raw.parse().map_err(|err: tome_package::error::Error| err.to_string())
}
