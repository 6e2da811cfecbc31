use crate::error::{Error, ErrorKind};
use exn::ResultExt;
use std::path::PathBuf;
use time::UtcDateTime;

/// A chapter that has been durably packaged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRecord {
    pub series_key: String,
    pub chapter_key: String,
    /// Series title as given when the record was written.
    pub series_title: String,
    /// Chapter title as given when the record was written.
    pub chapter_title: String,
    /// Where the packaged chapter landed (archive file or page directory).
    pub storage_path: PathBuf,
    pub completed_at: UtcDateTime,
}

/// One line of the library listing: a series and how much of it is done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryEntry {
    pub series_key: String,
    /// Display title from the most recent completion.
    pub series_title: String,
    pub chapter_count: u64,
    pub last_updated: UtcDateTime,
}

#[derive(sqlx::FromRow)]
pub(crate) struct CompletionRow {
    pub series_key: String,
    pub chapter_key: String,
    pub series_title: String,
    pub chapter_title: String,
    pub storage_path: String,
    pub completed_at: i64,
}

#[derive(sqlx::FromRow)]
pub(crate) struct LibraryRow {
    pub series_key: String,
    pub series_title: String,
    pub chapter_count: i64,
    pub last_updated: i64,
}

fn timestamp(value: i64) -> Result<UtcDateTime, Error> {
    UtcDateTime::from_unix_timestamp(value).or_raise(|| ErrorKind::InvalidData("timestamp"))
}

impl TryFrom<CompletionRow> for CompletionRecord {
    type Error = Error;

    fn try_from(row: CompletionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            series_key: row.series_key,
            chapter_key: row.chapter_key,
            series_title: row.series_title,
            chapter_title: row.chapter_title,
            storage_path: PathBuf::from(row.storage_path),
            completed_at: timestamp(row.completed_at)?,
        })
    }
}

impl TryFrom<LibraryRow> for LibraryEntry {
    type Error = Error;

    fn try_from(row: LibraryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            series_key: row.series_key,
            series_title: row.series_title,
            chapter_count: u64::try_from(row.chapter_count).or_raise(|| ErrorKind::InvalidData("chapter count"))?,
            last_updated: timestamp(row.last_updated)?,
        })
    }
}
