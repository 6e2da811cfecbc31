//! Completion ledger repository.
//!
//! Every read and write goes through [`normalize`](crate::normalize) first,
//! callers pass titles exactly as the extractor reported them.

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::key::normalize;
use crate::models::{CompletionRecord, CompletionRow, LibraryEntry, LibraryRow};
use exn::{OptionExt, ResultExt};
use sqlx::SqlitePool;
use std::path::Path;
use time::UtcDateTime;
use tracing::instrument;

/// Records which (series, chapter) pairs are finished.
///
/// Cheap to clone; clones share the same connection pool. Writes are keyed
/// and independent, so any number of clones (or processes pointed at the
/// same file) can record completions at the same time.
#[derive(Debug, Clone)]
pub struct Ledger {
    pool: SqlitePool,
}
impl From<&Database> for Ledger {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }
}
impl Ledger {
    /// Create a new ledger with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn sqlx_hates_paths(path: &Path) -> Result<String> {
        Ok(path.to_str().ok_or_raise(|| ErrorKind::InvalidPath(path.to_path_buf()))?.to_string())
    }

    // =========================================================================
    // Read
    // =========================================================================

    /// Whether the chapter of the series has already been completed.
    pub async fn is_complete(&self, series: impl AsRef<str>, chapter: impl AsRef<str>) -> Result<bool> {
        sqlx::query_scalar(include_str!("../queries/is_complete.sql"))
            .bind(normalize(series))
            .bind(normalize(chapter))
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)
    }

    /// Every completed series, most recently updated first.
    pub async fn list_library(&self) -> Result<Vec<LibraryEntry>> {
        let rows: Vec<LibraryRow> = sqlx::query_as(include_str!("../queries/list_library.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(LibraryEntry::try_from).collect()
    }

    /// Completed chapters of one series, in the order they were completed.
    pub async fn list_chapters(&self, series: impl AsRef<str>) -> Result<Vec<CompletionRecord>> {
        let rows: Vec<CompletionRow> = sqlx::query_as(include_str!("../queries/list_chapters.sql"))
            .bind(normalize(series))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(CompletionRecord::try_from).collect()
    }

    // =========================================================================
    // Write
    // =========================================================================

    /// Record the chapter as complete.
    ///
    /// Idempotent: returns `true` if a new record was written, `false` if the
    /// pair was already complete (the existing record is left untouched).
    #[instrument(skip_all, fields(series = series.as_ref(), chapter = chapter.as_ref()))]
    pub async fn mark_complete(
        &self,
        series: impl AsRef<str>,
        chapter: impl AsRef<str>,
        path: impl AsRef<Path>,
    ) -> Result<bool> {
        let result = sqlx::query(include_str!("../queries/mark_complete.sql"))
            .bind(normalize(&series))
            .bind(normalize(&chapter))
            .bind(series.as_ref())
            .bind(chapter.as_ref())
            .bind(Self::sqlx_hates_paths(path.as_ref())?)
            .bind(UtcDateTime::now().unix_timestamp())
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let inserted = result.rows_affected() > 0;
        if !inserted {
            tracing::debug!("chapter already recorded as complete");
        }
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    async fn ledger() -> Ledger {
        let db = Database::connect_in_memory().await.unwrap();
        Ledger::from(&db)
    }

    #[tokio::test]
    async fn test_mark_complete_is_idempotent() {
        let ledger = ledger().await;
        assert!(!ledger.is_complete("Solo Leveling", "Chapter 1").await.unwrap());
        assert!(ledger.mark_complete("Solo Leveling", "Chapter 1", "out/1.cbz").await.unwrap());
        assert!(ledger.is_complete("Solo Leveling", "Chapter 1").await.unwrap());
        assert!(!ledger.mark_complete("Solo Leveling", "Chapter 1", "out/other.cbz").await.unwrap());
        assert!(ledger.is_complete("Solo Leveling", "Chapter 1").await.unwrap());

        let chapters = ledger.list_chapters("Solo Leveling").await.unwrap();
        assert_eq!(chapters.len(), 1);
        // First write wins, the second call didn't touch anything.
        assert_eq!(chapters[0].storage_path, PathBuf::from("out/1.cbz"));
    }

    #[tokio::test]
    async fn test_keys_are_normalized() {
        let ledger = ledger().await;
        ledger.mark_complete("Solo Leveling", "Chapter 1", "out/1").await.unwrap();
        assert!(ledger.is_complete("solo-leveling", "chapter-1").await.unwrap());
        assert!(ledger.is_complete("SOLO LEVELING!", " Chapter 1 ").await.unwrap());
        assert!(!ledger.is_complete("Solo Leveling", "Chapter 2").await.unwrap());
        assert!(!ledger.is_complete("Solo Levelling", "Chapter 1").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_library_groups_by_series() {
        let ledger = ledger().await;
        ledger.mark_complete("Solo Leveling", "Chapter 1", "a/1").await.unwrap();
        ledger.mark_complete("Solo Leveling", "Chapter 2", "a/2").await.unwrap();
        ledger.mark_complete("solo-leveling", "Chapter 3", "a/3").await.unwrap();
        ledger.mark_complete("One Piece", "Chapter 1", "b/1").await.unwrap();

        let library = ledger.list_library().await.unwrap();
        assert_eq!(library.len(), 2);
        let solo = library.iter().find(|e| e.series_key == "sololeveling").unwrap();
        assert_eq!(solo.chapter_count, 3);
        let piece = library.iter().find(|e| e.series_key == "onepiece").unwrap();
        assert_eq!(piece.chapter_count, 1);
        assert_eq!(piece.series_title, "One Piece");
    }

    #[tokio::test]
    async fn test_list_library_empty() {
        let ledger = ledger().await;
        assert!(ledger.list_library().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_share_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        // Two independent pools, like two processes pointed at the same file.
        let first = Database::connect(&path).await.unwrap();
        let second = Database::connect(&path).await.unwrap();
        let ledgers = [Ledger::from(&first), Ledger::from(&second)];

        let mut handles = Vec::new();
        for i in 0..20 {
            let ledger = ledgers[i % 2].clone();
            handles.push(tokio::spawn(async move {
                // Half of the writes target the same pair.
                let chapter = if i % 2 == 0 { "Chapter 1".to_string() } else { format!("Chapter {}", i + 100) };
                ledger.mark_complete("Series", chapter, "x").await.unwrap()
            }));
        }
        let mut inserted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                inserted += 1;
            }
        }
        // "Chapter 1" once, plus the ten odd chapters.
        assert_eq!(inserted, 11);
        assert_eq!(ledgers[0].list_chapters("Series").await.unwrap().len(), 11);
        first.close().await;
        second.close().await;
    }
}
