pub mod sqlite;

use crate::app::Result;
use crate::domain::{ScrapeResult, TrendRecord};

pub use sqlite::SqliteStore;

/// Persistence for scrape captures. Documents are written once at capture
/// time and read newest-first; there is no update or delete path.
pub trait Store: Send + Sync {
    /// Persist a completed scrape. The id and capture timestamp are
    /// assigned here, at write time.
    fn insert_scrape(&self, trends: &[TrendRecord], source: &str) -> Result<ScrapeResult>;

    /// The `limit` most recent captures, newest first.
    fn recent_scrapes(&self, limit: usize) -> Result<Vec<ScrapeResult>>;
}
