pub mod error;

pub use error::{Phase, Result, TrendwatchError};
