use exn::ResultExt;
use time::macros::format_description;
use tome_config::{Settings, SiteKind};
use tome_ledger::{Database, Ledger};
use tome_resolve::{MirrorHunter, Resolver};

use crate::error::{ErrorKind, Result};

const SEARCH_LIMIT: usize = 20;

pub async fn search(settings: Settings, query: &str) -> Result<()> {
    let hunter = MirrorHunter::new(std::sync::Arc::new(super::transport(&settings)?));
    let resolver = Resolver::new(super::registry(&settings)?, hunter);
    let candidates = resolver.search(query, SEARCH_LIMIT);
    if candidates.is_empty() {
        println!("No match for '{query}'");
    }
    for candidate in candidates {
        println!("{:>4.0}%  {:<32} {}", candidate.score, candidate.key, candidate.name());
    }
    Ok(())
}

pub async fn available(settings: Settings) -> Result<()> {
    let registry = super::registry(&settings)?;
    for (key, entry) in registry.iter() {
        let location = entry.url.as_deref().or(entry.base_domain.as_deref()).unwrap_or("?");
        let kind = match entry.kind {
            SiteKind::Static => "static",
            SiteKind::Dynamic => "dynamic",
        };
        println!("{key:<32} {kind:<8} {location}");
    }
    println!("{} site(s)", registry.len());
    Ok(())
}

pub async fn library(settings: Settings) -> Result<()> {
    let db = Database::connect(settings.ledger_path()).await.or_raise(|| ErrorKind::Ledger)?;
    let entries = Ledger::from(&db).list_library().await;
    db.close().await;
    let entries = entries.or_raise(|| ErrorKind::Ledger)?;
    if entries.is_empty() {
        println!("Nothing downloaded yet");
    }
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]");
    for entry in entries {
        let when = entry.last_updated.format(&format).unwrap_or_default();
        println!("{:<40} {:>5} chapter(s)  {when}", entry.series_title, entry.chapter_count);
    }
    Ok(())
}
