use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use crate::app::{Result, TrendwatchError};
use crate::domain::{ScrapeResult, TrendRecord};
use crate::store::Store;

/// SQLite-backed document store. Each row is one immutable scrape capture
/// with its trend list serialized as JSON.
///
/// A connection is opened and closed per operation, so the store can be
/// shared across request handlers without any mutable connection state.
#[derive(Debug)]
pub struct SqliteStore {
    path: PathBuf,
    table: String,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path` with captures kept
    /// in `table`. The table name cannot be bound as a SQL parameter, so it
    /// is validated as a plain identifier up front.
    pub fn new<P: AsRef<Path>>(path: P, table: &str) -> Result<Self> {
        if !is_valid_table_name(table) {
            return Err(TrendwatchError::Config(format!(
                "invalid table name: {table:?} (letters, digits and underscores only)"
            )));
        }

        let store = Self {
            path: path.as_ref().to_path_buf(),
            table: table.to_string(),
        };
        let conn = store.open()?;
        conn.execute_batch(&store.schema())?;
        Ok(store)
    }

    fn open(&self) -> Result<Connection> {
        Ok(Connection::open(&self.path)?)
    }

    fn schema(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id TEXT PRIMARY KEY,
                trends TEXT NOT NULL,
                captured_at TEXT NOT NULL,
                source TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_{table}_captured_at
                ON {table} (captured_at DESC);",
            table = self.table
        )
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| s.parse::<DateTime<Utc>>().ok())
    }
}

impl Store for SqliteStore {
    fn insert_scrape(&self, trends: &[TrendRecord], source: &str) -> Result<ScrapeResult> {
        let result = ScrapeResult::new(trends.to_vec(), source);
        let trends_json = serde_json::to_string(&result.trends)?;

        let conn = self.open()?;
        conn.execute(
            &format!(
                "INSERT INTO {} (id, trends, captured_at, source) VALUES (?1, ?2, ?3, ?4)",
                self.table
            ),
            params![
                result.id,
                trends_json,
                result.captured_at.to_rfc3339(),
                result.source
            ],
        )?;

        Ok(result)
    }

    fn recent_scrapes(&self, limit: usize) -> Result<Vec<ScrapeResult>> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT id, trends, captured_at, source FROM {}
             ORDER BY captured_at DESC, rowid DESC LIMIT ?1",
            self.table
        ))?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut results = Vec::new();
        for row in rows {
            let (id, trends_json, captured_at, source) = row?;
            results.push(ScrapeResult {
                id,
                trends: serde_json::from_str(&trends_json)?,
                captured_at: Self::parse_datetime(&captured_at).unwrap_or_else(Utc::now),
                source,
            });
        }
        Ok(results)
    }
}

fn is_valid_table_name(table: &str) -> bool {
    let mut chars = table.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn temp_store() -> (TempDir, SqliteStore) {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::new(dir.path().join("trends.db"), "scrapes").unwrap();
        (dir, store)
    }

    fn record(headline: &str) -> TrendRecord {
        TrendRecord {
            headline: Some(headline.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_insert_and_read_back() {
        let (_dir, store) = temp_store();
        let trends = vec![record("Topic A"), record("Topic B")];
        let written = store.insert_scrape(&trends, "proxy.example.com").unwrap();

        let results = store.recent_scrapes(10).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, written.id);
        assert_eq!(results[0].trends, trends);
        assert_eq!(results[0].source, "proxy.example.com");
        assert_eq!(
            results[0].captured_at.timestamp(),
            written.captured_at.timestamp()
        );
    }

    #[test]
    fn test_empty_trend_list_is_a_valid_document() {
        let (_dir, store) = temp_store();
        store.insert_scrape(&[], "local").unwrap();
        let results = store.recent_scrapes(10).unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].trends.is_empty());
    }

    #[test]
    fn test_recent_returns_ten_newest_first() {
        let (_dir, store) = temp_store();
        for i in 0..15 {
            store.insert_scrape(&[record(&format!("t{i}"))], &format!("s{i}")).unwrap();
        }

        let results = store.recent_scrapes(10).unwrap();
        assert_eq!(results.len(), 10);
        assert_eq!(results[0].source, "s14");
        assert_eq!(results[9].source, "s5");
        for pair in results.windows(2) {
            assert!(pair[0].captured_at >= pair[1].captured_at);
        }
    }

    #[test]
    fn test_reopen_preserves_documents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trends.db");
        {
            let store = SqliteStore::new(&path, "scrapes").unwrap();
            store.insert_scrape(&[record("persisted")], "local").unwrap();
        }
        let store = SqliteStore::new(&path, "scrapes").unwrap();
        let results = store.recent_scrapes(10).unwrap();
        assert_eq!(results[0].trends[0].headline.as_deref(), Some("persisted"));
    }

    #[test]
    fn test_invalid_table_name_rejected() {
        let dir = TempDir::new().unwrap();
        let err =
            SqliteStore::new(dir.path().join("trends.db"), "scrapes; DROP TABLE x").unwrap_err();
        assert!(matches!(err, TrendwatchError::Config(_)));
        assert!(SqliteStore::new(dir.path().join("trends2.db"), "1table").is_err());
    }
}
