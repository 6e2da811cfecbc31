use std::collections::HashSet;

use async_trait::async_trait;
use exn::ResultExt;
use scraper::Html;
use tome_fetch::{Transport, sanitize_url};
use tracing::instrument;
use url::Url;

use crate::consts;
use crate::error::{ErrorKind, Result};
use crate::models::{ChapterRef, SeriesInfo};
use crate::Extractor;

/// Extractor driven purely by common reader-theme markup.
#[derive(Debug, Clone)]
pub struct GenericExtractor {
    transport: Transport,
}

impl GenericExtractor {
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }

    async fn document(&self, url: &str) -> Result<(Url, String)> {
        let url = sanitize_url(url).or_raise(|| ErrorKind::InvalidUrl(url.to_string()))?;
        let html = self.transport.get_text(&url).await.or_raise(|| ErrorKind::Fetch(url.to_string()))?;
        Ok((url, html))
    }

    /// Like [`document`](Self::document), but a chapter page is swapped for
    /// the series page it belongs to when that can be found.
    async fn series_document(&self, url: &str) -> Result<(Url, String)> {
        let (base, html) = self.document(url).await?;
        if !is_chapter_url(&base) {
            return Ok((base, html));
        }
        match parse_parent_url(&html, &base) {
            Some(parent) => {
                tracing::info!(%parent, "chapter page given, using its series page");
                self.document(parent.as_str()).await
            },
            None => Ok((base, html)),
        }
    }
}

#[async_trait]
impl Extractor for GenericExtractor {
    #[instrument(skip(self))]
    async fn series_info(&self, url: &str) -> Result<SeriesInfo> {
        let (base, html) = self.series_document(url).await?;
        Ok(SeriesInfo { title: parse_title(&html), url: base.to_string() })
    }

    #[instrument(skip(self))]
    async fn chapters(&self, url: &str) -> Result<Vec<ChapterRef>> {
        let (base, html) = self.series_document(url).await?;
        let chapters = parse_chapters(&html, &base);
        tracing::debug!(count = chapters.len(), "found chapters");
        Ok(chapters)
    }

    #[instrument(skip(self))]
    async fn pages(&self, chapter_url: &str) -> Result<Vec<String>> {
        let (base, html) = self.document(chapter_url).await?;
        let pages = parse_pages(&html, &base);
        tracing::debug!(count = pages.len(), "found pages");
        Ok(pages)
    }

    async fn fetch_image(&self, url: &str, referer: Option<&str>) -> Result<Vec<u8>> {
        self.transport.fetch_bytes(url, referer).await.or_raise(|| ErrorKind::Fetch(url.to_string()))
    }
}

// ===== Markup heuristics =====

/// The series title, or "Unknown Series" when no heading has any text.
pub fn parse_title(html: &str) -> String {
    let document = Html::parse_document(html);
    [
        &*consts::TITLE_ENTRY_SELECTOR,
        &*consts::TITLE_H1_SELECTOR,
        &*consts::TITLE_POST_SELECTOR,
        &*consts::TITLE_BIG_SELECTOR,
    ]
    .into_iter()
    .filter_map(|selector| document.select(selector).next())
    .map(|element| collapse_whitespace(&element.text().collect::<String>()))
    .find(|title| !title.is_empty())
    .unwrap_or_else(|| consts::UNKNOWN_TITLE.to_string())
}

/// Chapter links, oldest first.
///
/// Reader themes list the newest chapter at the top, so the document order
/// is reversed after deduplication.
pub fn parse_chapters(html: &str, base: &Url) -> Vec<ChapterRef> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut chapters = Vec::new();
    for anchor in document.select(&consts::ANCHOR_SELECTOR) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let text = collapse_whitespace(&anchor.text().collect::<String>());
        let lowered = text.to_lowercase();
        let looks_like_chapter = (lowered.contains("chapter") && lowered.chars().any(|c| c.is_ascii_digit()))
            || href.to_lowercase().contains("chapter-");
        if !looks_like_chapter || consts::NAVIGATION_REGEX.is_match(&text) || consts::SOCIAL_REGEX.is_match(href) {
            continue;
        }
        let Ok(url) = base.join(href.trim()) else {
            continue;
        };
        if seen.insert(url.clone()) {
            let title = if text.is_empty() { url.path().trim_matches('/').to_string() } else { text };
            chapters.push(ChapterRef::new(title, url));
        }
    }
    chapters.reverse();
    chapters
}

/// Page image URLs in document order.
pub fn parse_pages(html: &str, base: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    document
        .select(&consts::IMAGE_SELECTOR)
        .filter_map(|image| {
            let element = image.value();
            ["data-src", "data-lazy-src", "src"]
                .into_iter()
                .filter_map(|attr| element.attr(attr))
                .map(str::trim)
                .find(|value| !value.is_empty() && !value.starts_with("data:"))
        })
        .filter(|source| !consts::NOT_A_PAGE_REGEX.is_match(source))
        .filter_map(|source| {
            // Protocol-relative sources are common on CDN-backed themes.
            match source.strip_prefix("//") {
                Some(rest) => Url::parse(&format!("https://{rest}")).ok(),
                None => base.join(source).ok(),
            }
        })
        .filter(|url| seen.insert(url.clone()))
        .map(String::from)
        .collect()
}

/// Whether `url` looks like a single chapter rather than a series page.
pub fn is_chapter_url(url: &Url) -> bool {
    url.path().to_lowercase().contains("chapter-")
}

/// The series page a chapter page belongs to.
///
/// Breadcrumbs are tried deepest first, then an "all chapters" link, then the
/// URL itself with its last path segment cut off. Never returns `base`.
pub fn parse_parent_url(html: &str, base: &Url) -> Option<Url> {
    let document = Html::parse_document(html);
    let crumbs: Vec<_> = document.select(&consts::BREADCRUMB_SELECTOR).collect();
    let from_breadcrumbs = crumbs
        .into_iter()
        .rev()
        .filter(|link| !link.text().collect::<String>().to_lowercase().contains("home"))
        .filter_map(|link| link.value().attr("href"))
        .filter_map(|href| base.join(href.trim()).ok())
        .find(|url| url != base);
    if from_breadcrumbs.is_some() {
        return from_breadcrumbs;
    }

    let from_listing = document
        .select(&consts::ANCHOR_SELECTOR)
        .filter(|link| link.text().collect::<String>().to_lowercase().contains("all chapters"))
        .filter_map(|link| link.value().attr("href"))
        .filter_map(|href| base.join(href.trim()).ok())
        .find(|url| url != base);
    if from_listing.is_some() {
        return from_listing;
    }

    let mut segments: Vec<&str> = base.path_segments()?.filter(|segment| !segment.is_empty()).collect();
    if !segments.pop()?.to_lowercase().contains("chapter") {
        return None;
    }
    let mut parent = base.clone();
    parent.set_query(None);
    parent.set_fragment(None);
    parent.set_path(&format!("/{}", segments.join("/")));
    Some(parent).filter(|parent| parent != base)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
