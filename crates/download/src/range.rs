//! Chapter range filters such as `"1-10"` or `"5"`.

use std::sync::LazyLock;

use regex::Regex;
use tome_extract::ChapterRef;

static CHAPTER_NUMBER_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)").unwrap());

/// Inclusive range of chapter numbers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChapterRange {
    pub start: f64,
    pub end: f64,
}
impl ChapterRange {
    /// Parse `"start-end"` or a single `"n"`.
    ///
    /// Anything malformed (empty, non-numeric, more than two parts) is `None`,
    /// which callers treat as "no filter". A reversed range is flipped.
    pub fn parse(raw: &str) -> Option<Self> {
        let parts: Vec<&str> = raw.trim().split('-').map(str::trim).collect();
        let (start, end) = match parts.as_slice() {
            [single] => (single.parse::<f64>().ok()?, single.parse::<f64>().ok()?),
            [start, end] => (start.parse::<f64>().ok()?, end.parse::<f64>().ok()?),
            _ => return None,
        };
        if !start.is_finite() || !end.is_finite() {
            return None;
        }
        Some(Self { start: start.min(end), end: start.max(end) })
    }

    pub fn contains(&self, number: f64) -> bool {
        (self.start..=self.end).contains(&number)
    }
}

/// The first number in a chapter title: `"Chapter 10.5: Return"` is `10.5`.
pub fn chapter_number(title: &str) -> Option<f64> {
    CHAPTER_NUMBER_REGEX.find(title)?.as_str().parse().ok()
}

/// Keep the chapters a range selects. Without a range every chapter is kept;
/// with one, chapters without a number in their title are dropped.
pub fn filter(chapters: Vec<ChapterRef>, range: Option<&ChapterRange>) -> Vec<ChapterRef> {
    let Some(range) = range else {
        return chapters;
    };
    chapters
        .into_iter()
        .filter(|chapter| chapter_number(&chapter.title).is_some_and(|number| range.contains(number)))
        .collect()
}
