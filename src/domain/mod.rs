mod trend;

pub use trend::{ScrapeResult, TrendRecord};
