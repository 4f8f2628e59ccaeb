use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::TrendRecord;
use crate::scraper::Locator;

/// Unit-suffix pattern for post counts, e.g. `10K`, `1.2M`, `5,431K`.
/// Matched case-insensitively against whole span texts.
const COUNT_PATTERN: &str = r"(?i)^\d[\d,.]*\s*[km]$";

/// Separator the panel renders between a category and its trend metadata.
const SEPARATOR: &str = "\u{b7}";

/// Parses a loaded trending panel into ordered [`TrendRecord`]s.
///
/// The browser side only collects raw span texts per item (see
/// [`collection_script`](Self::collection_script)); all field
/// classification happens here with content-based matching, so it survives
/// markup churn and is testable without a browser. A broken item is logged
/// and skipped, never aborting the items after it.
pub struct TrendExtractor {
    panel_selector: String,
    count_pattern: Regex,
}

impl TrendExtractor {
    pub fn new(panel_label: &str) -> Self {
        Self {
            panel_selector: Locator::aria_label(panel_label).css().unwrap_or_default(),
            count_pattern: Locator::text_pattern(COUNT_PATTERN)
                .matcher()
                .expect("count pattern is a valid regex"),
        }
    }

    /// JavaScript that locates the panel by accessibility label and returns
    /// one `{texts: [...]}` object per trend item, in display order.
    pub fn collection_script(&self) -> String {
        format!(
            r#"
            (() => {{
                const panel = document.querySelector('{selector}');
                if (!panel) {{
                    return [];
                }}
                const items = panel.querySelectorAll(':scope > div > div');
                return Array.from(items).map((item) => ({{
                    texts: Array.from(item.querySelectorAll('span'))
                        .map((span) => span.innerText.trim())
                        .filter((text) => text.length > 0),
                }}));
            }})()
            "#,
            selector = self.panel_selector.replace('\'', "\\'"),
        )
    }

    /// Turn the collection script's payload into trend records, preserving
    /// item order. Items yielding no fields are omitted; an empty final
    /// sequence is a valid outcome.
    pub fn extract(&self, raw: &Value) -> Vec<TrendRecord> {
        let Some(items) = raw.as_array() else {
            warn!("collection script returned a non-array payload");
            return Vec::new();
        };

        let mut records = Vec::new();
        for (index, item) in items.iter().enumerate() {
            if let Some(record) = self.parse_item(index, item) {
                records.push(record);
            }
        }

        if records.is_empty() {
            warn!("no trending topics found");
        }
        records
    }

    fn parse_item(&self, index: usize, item: &Value) -> Option<TrendRecord> {
        let Some(raw_texts) = item.get("texts").and_then(Value::as_array) else {
            warn!(index, "skipping trend item with unexpected shape");
            return None;
        };
        let texts: Vec<&str> = raw_texts
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .collect();

        let mut record = TrendRecord::default();

        // The category span sits immediately before the first separator dot.
        if let Some(pos) = texts.iter().position(|text| *text == SEPARATOR) {
            if pos > 0 {
                record.category = Some(texts[pos - 1].to_string());
            }
        }

        for text in &texts {
            if *text == SEPARATOR || Some(*text) == record.category.as_deref() {
                continue;
            }
            if record.tweet_count.is_none() && self.is_count(text) {
                record.tweet_count = Some(text.to_string());
                continue;
            }
            if is_noise(text) {
                continue;
            }
            if record.headline.is_none() {
                record.headline = Some(text.to_string());
            } else if record.description.is_none() && Some(*text) != record.headline.as_deref() {
                record.description = Some(text.to_string());
            }
        }

        if record.is_empty() {
            debug!(index, "dropping trend item with no extractable fields");
            None
        } else {
            Some(record)
        }
    }

    fn is_count(&self, text: &str) -> bool {
        if !text.starts_with(|c: char| c.is_ascii_digit()) {
            return false;
        }
        let lower = text.to_ascii_lowercase();
        lower.contains("posts") || lower.contains("tweets") || self.count_pattern.is_match(text)
    }
}

/// Panel chrome that is never a trend field: rank numbers and the
/// "Trending" kicker line.
fn is_noise(text: &str) -> bool {
    if text.len() <= 2 && text.chars().all(|c| c.is_ascii_digit()) {
        return true;
    }
    matches!(
        text.to_ascii_lowercase().as_str(),
        "trending" | "trending now"
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn extractor() -> TrendExtractor {
        TrendExtractor::new("Timeline: Trending now")
    }

    #[test]
    fn test_collection_script_targets_aria_label() {
        let script = extractor().collection_script();
        assert!(script.contains("[aria-label=\"Timeline: Trending now\"]"));
        assert!(script.contains("querySelectorAll"));
        assert!(!script.contains("css-"));
    }

    #[test]
    fn test_three_item_panel_drops_the_empty_one() {
        let raw = json!([
            {"texts": ["Topic A", "10K posts"]},
            {"texts": ["Topic B"]},
            {"texts": []},
        ]);
        let records = extractor().extract(&raw);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].headline.as_deref(), Some("Topic A"));
        assert_eq!(records[0].tweet_count.as_deref(), Some("10K posts"));
        assert_eq!(records[1].headline.as_deref(), Some("Topic B"));
    }

    #[test]
    fn test_survivors_keep_relative_order() {
        let raw = json!([
            {"texts": ["First"]},
            {"texts": []},
            {"texts": ["Second"]},
            {"nope": true},
            {"texts": ["Third"]},
        ]);
        let records = extractor().extract(&raw);
        let headlines: Vec<_> = records
            .iter()
            .filter_map(|r| r.headline.as_deref())
            .collect();
        assert_eq!(headlines, vec!["First", "Second", "Third"]);
    }

    #[test]
    fn test_empty_panel_is_not_an_error() {
        assert!(extractor().extract(&json!([])).is_empty());
    }

    #[test]
    fn test_non_array_payload_yields_nothing() {
        assert!(extractor().extract(&json!({"html": ""})).is_empty());
        assert!(extractor().extract(&json!(null)).is_empty());
    }

    #[test]
    fn test_category_precedes_separator() {
        let raw = json!([
            {"texts": ["Politics", "\u{b7}", "Trending", "Election Night", "523K posts"]},
        ]);
        let records = extractor().extract(&raw);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].category.as_deref(), Some("Politics"));
        assert_eq!(records[0].headline.as_deref(), Some("Election Night"));
        assert_eq!(records[0].tweet_count.as_deref(), Some("523K posts"));
    }

    #[test]
    fn test_description_is_second_surviving_text() {
        let raw = json!([
            {"texts": ["2", "Entertainment", "\u{b7}", "Topic C", "1.2M", "A longer description line"]},
        ]);
        let records = extractor().extract(&raw);
        assert_eq!(records[0].category.as_deref(), Some("Entertainment"));
        assert_eq!(records[0].headline.as_deref(), Some("Topic C"));
        assert_eq!(records[0].tweet_count.as_deref(), Some("1.2M"));
        assert_eq!(
            records[0].description.as_deref(),
            Some("A longer description line")
        );
    }

    #[test]
    fn test_count_matching() {
        let ex = extractor();
        assert!(ex.is_count("10K posts"));
        assert!(ex.is_count("5,431 posts"));
        assert!(ex.is_count("1.2M"));
        assert!(ex.is_count("12k"));
        assert!(!ex.is_count("Topic A"));
        assert!(!ex.is_count("K-pop"));
        assert!(!ex.is_count("posts about things"));
    }

    #[test]
    fn test_count_pattern_is_a_text_pattern_locator() {
        let locator = Locator::text_pattern(COUNT_PATTERN);
        assert_eq!(locator.css(), None);
        let matcher = locator.matcher().unwrap();
        assert!(matcher.is_match("1.2M"));
        assert!(!matcher.is_match("Election Night"));
    }

    #[test]
    fn test_rank_and_kicker_are_noise() {
        assert!(is_noise("1"));
        assert!(is_noise("30"));
        assert!(is_noise("Trending"));
        assert!(is_noise("Trending now"));
        assert!(!is_noise("Topic 1"));
        assert!(!is_noise("100"));
    }
}
