mod cli;
mod commands;
mod error;
mod names;
mod prompt;

use clap::Parser;
use exn::ResultExt;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tome_config::Settings;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::{Cli, Command};
use crate::error::{ErrorKind, Result};

#[tokio::main]
async fn main() -> miette::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, finishing what is in flight");
            on_interrupt.cancel();
        }
    });

    match run(cli, cancel).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        // The error tree, with locations, is what ends up in front of the user.
        Err(err) => Err(miette::miette!("{err:?}")),
    }
}

fn init_logging(debug: bool) {
    let fallback = if debug { "info,tome=debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback.into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli, cancel: CancellationToken) -> Result<()> {
    let settings = Settings::load(cli.config.as_deref()).or_raise(|| ErrorKind::Settings)?;
    tracing::debug!(?settings, "settings loaded");
    match cli.command {
        Command::Download(args) => commands::download(settings, args, cancel).await,
        Command::Discover(args) => commands::discover(settings, args, cancel).await,
        Command::Search { query } => commands::search(settings, &query.join(" ")).await,
        Command::Available => commands::available(settings).await,
        Command::Library => commands::library(settings).await,
    }
}
