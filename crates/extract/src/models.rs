/// Series-level metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesInfo {
    pub title: String,
    pub url: String,
}

/// A chapter link. The order of a chapter list is reading order, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterRef {
    pub title: String,
    pub url: String,
}
impl ChapterRef {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self { title: title.into(), url: url.into() }
    }
}
