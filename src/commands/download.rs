use std::sync::Arc;

use exn::ResultExt;
use tokio_util::sync::CancellationToken;
use tome_config::Settings;
use tome_download::{ChapterRange, ChapterStatus, DownloadEvent, Downloader};
use tome_extract::GenericExtractor;
use tome_ledger::{Database, Ledger};
use tome_resolve::{MirrorHunter, Resolution, Resolver};

use crate::cli::DownloadArgs;
use crate::error::{ErrorKind, Result};
use crate::prompt::TerminalPrompt;

pub async fn download(mut settings: Settings, args: DownloadArgs, cancel: CancellationToken) -> Result<()> {
    if let Some(output) = args.output {
        settings.output_dir = output;
    }
    if let Some(workers) = args.workers {
        settings.workers = workers;
    }
    if let Some(format) = args.format {
        settings.format = format;
    }
    if args.proxy.is_some() {
        settings.request = settings.request.with_proxy(args.proxy);
    }

    let transport = super::transport(&settings)?;
    let hunter = MirrorHunter::new(Arc::new(transport.clone())).with_cancellation(cancel.clone());
    let resolver = Resolver::new(super::registry(&settings)?, hunter);
    let resolution =
        resolver.resolve(&args.target, &TerminalPrompt).await.or_raise(|| ErrorKind::Resolve(args.target.clone()))?;
    let target = match resolution {
        Resolution::Resolved(target) => target,
        Resolution::Unmatched(input) => exn::bail!(ErrorKind::Unmatched(input)),
        Resolution::Cancelled => exn::bail!(ErrorKind::Cancelled),
    };
    println!("Series: {} ({:.0}% match)", target.url, target.confidence);

    let range = args.range.as_deref().map(str::trim).filter(|raw| !raw.is_empty()).and_then(|raw| {
        let range = ChapterRange::parse(raw);
        if range.is_none() {
            tracing::warn!(range = raw, "ignoring malformed chapter range");
        }
        range
    });

    let db = Database::connect(settings.ledger_path()).await.or_raise(|| ErrorKind::Ledger)?;
    let downloader = Downloader::new(
        Arc::new(GenericExtractor::new(transport)),
        Ledger::from(&db),
        settings.format.packager(),
        &settings.output_dir,
    )
    .with_workers(settings.workers);
    let summary = downloader.download_series(target.url.as_str(), range, cancel, print_progress).await;
    db.close().await;
    let summary = summary.or_raise(|| ErrorKind::Download)?;

    println!(
        "{}: {} downloaded, {} already had, {} failed",
        summary.series,
        summary.packaged.len(),
        summary.skipped,
        summary.failed
    );
    Ok(())
}

fn print_progress(event: &DownloadEvent) {
    match event {
        DownloadEvent::Started(series) => println!("Downloading {}", series.title),
        DownloadEvent::ChaptersQueued(0) => println!("No chapters to download"),
        DownloadEvent::ChaptersQueued(count) => println!("{count} chapter(s) queued"),
        DownloadEvent::Chapter { title, status, .. } => match status {
            ChapterStatus::Queued | ChapterStatus::Fetching => {},
            ChapterStatus::Packaged(path) => println!("  saved    {title} -> {}", path.display()),
            ChapterStatus::Skipped => println!("  skipped  {title} (already downloaded)"),
            ChapterStatus::Failed(why) => println!("  failed   {title}: {why}"),
        },
        DownloadEvent::Cancelled(_) => println!("Cancelled"),
        DownloadEvent::Complete(_) => {},
    }
}
