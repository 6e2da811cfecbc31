use std::sync::Arc;

use exn::ResultExt;
use tokio_util::sync::CancellationToken;
use tome_config::Settings;
use tome_discover::{DiscoveryOutcome, DiscoveryPool, DownloadVerifier, FailureReason};
use tome_extract::GenericExtractor;
use tome_resolve::MirrorHunter;

use crate::cli::DiscoverArgs;
use crate::error::{ErrorKind, Result};
use crate::names::parse_names;

pub async fn discover(settings: Settings, args: DiscoverArgs, cancel: CancellationToken) -> Result<()> {
    let contents = tokio::fs::read_to_string(&args.names).await.or_raise(|| ErrorKind::NamesFile(args.names.clone()))?;
    let names = parse_names(&contents).or_raise(|| ErrorKind::NamesFile(args.names.clone()))?;
    println!("{} name(s) to look for", names.len());

    let transport = super::transport(&settings)?;
    let verifier =
        DownloadVerifier::new(Arc::new(GenericExtractor::new(transport.clone()))).with_cancellation(cancel.clone());
    let pool = DiscoveryPool::new(
        MirrorHunter::new(Arc::new(transport)),
        Arc::new(verifier),
        super::registry(&settings)?,
        &settings.registry_output,
    )
    .with_workers(args.workers.unwrap_or(settings.discovery.workers))
    .with_cancellation(cancel);

    let report = pool.discover_all(names, print_outcome).await.or_raise(|| ErrorKind::Discover)?;
    println!(
        "{} added, {} still missing, {} already known",
        report.added.len(),
        report.failed.len(),
        report.skipped.len()
    );
    if report.not_started > 0 {
        println!("{} not started; run again to continue", report.not_started);
    }
    Ok(())
}

fn print_outcome(outcome: &DiscoveryOutcome) {
    match outcome {
        DiscoveryOutcome::Added { name, variant, origin } => println!("  added    {name} at {origin} (as {variant})"),
        DiscoveryOutcome::Skipped(_) => {},
        DiscoveryOutcome::Failed { name, reason } => match reason {
            FailureReason::NoLiveHost => println!("  missing  {name}: no live host"),
            FailureReason::Rejected(count) => println!("  missing  {name}: {count} host(s) failed the quality check"),
            FailureReason::Cancelled => println!("  stopped  {name}"),
        },
    }
}
