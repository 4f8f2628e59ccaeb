use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One entry of the trending panel. Every field is optional because the
/// panel markup is unreliable; a record with nothing populated is dropped
/// before it reaches a result. Order within a scrape mirrors display order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tweet_count: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TrendRecord {
    pub fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.headline.is_none()
            && self.tweet_count.is_none()
            && self.description.is_none()
    }
}

/// One completed scrape capture. Immutable after creation; the id and
/// capture timestamp are assigned when the store writes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeResult {
    pub id: String,
    pub trends: Vec<TrendRecord>,
    pub captured_at: DateTime<Utc>,
    /// Proxy host the session went out through, or `local`.
    pub source: String,
}

impl ScrapeResult {
    pub fn new(trends: Vec<TrendRecord>, source: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            trends,
            captured_at: Utc::now(),
            source: source.into(),
        }
    }
}
