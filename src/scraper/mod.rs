//! Browser-driven scraping of the trending panel.
//!
//! One [`SessionDriver`] owns one Chrome process end to end:
//!
//! ```text
//! launch → login → wait for panel → extract → teardown
//! ```
//!
//! Teardown runs on every exit path. The optional authenticated proxy is
//! wired in through a generated extension bundle ([`ProxyAuthExtension`])
//! so credentials never show up in process arguments.

use regex::Regex;

mod extractor;
mod proxy;
mod session;

pub use extractor::TrendExtractor;
pub use proxy::{ProxyAuthExtension, ProxyConfig};
pub use session::{SessionConfig, SessionDriver, SessionState};

/// Element locator strategies, ranked by stability: stable attributes
/// first, accessibility labels second, text patterns last. Generated class
/// names are not a contract and never appear here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    ByAttribute { attribute: String, value: String },
    ByAriaLabel(String),
    ByTextPattern(String),
}

impl Locator {
    pub fn attribute(attribute: &str, value: &str) -> Self {
        Self::ByAttribute {
            attribute: attribute.to_string(),
            value: value.to_string(),
        }
    }

    pub fn aria_label(label: &str) -> Self {
        Self::ByAriaLabel(label.to_string())
    }

    pub fn text_pattern(pattern: &str) -> Self {
        Self::ByTextPattern(pattern.to_string())
    }

    /// CSS selector for the DOM-addressable variants. Text patterns are
    /// matched against content, not the DOM, so they have no selector.
    pub fn css(&self) -> Option<String> {
        match self {
            Self::ByAttribute { attribute, value } => {
                Some(format!("[{attribute}=\"{}\"]", escape_quotes(value)))
            }
            Self::ByAriaLabel(label) => {
                Some(format!("[aria-label=\"{}\"]", escape_quotes(label)))
            }
            Self::ByTextPattern(_) => None,
        }
    }

    /// Compiled matcher for the text-pattern variant; `None` for the
    /// DOM-addressable variants and for patterns that fail to compile.
    pub fn matcher(&self) -> Option<Regex> {
        match self {
            Self::ByTextPattern(pattern) => Regex::new(pattern).ok(),
            _ => None,
        }
    }
}

fn escape_quotes(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
