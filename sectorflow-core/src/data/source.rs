//! Data source trait and structured fetch errors.
//!
//! The MarketDataSource trait abstracts over the network layer so the
//! pipeline can be driven by a mock in tests.

use crate::domain::TimeSeries;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bar granularity requested from the data source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BarInterval {
    #[default]
    Daily,
    Weekly,
}

impl BarInterval {
    /// Value of the `interval` query parameter on the chart endpoint.
    pub fn as_query(&self) -> &'static str {
        match self {
            BarInterval::Daily => "1d",
            BarInterval::Weekly => "1wk",
        }
    }
}

/// Structured error types for fetch operations.
///
/// Every variant is recoverable at the symbol level: the orchestrator logs
/// the error and skips the symbol, it never aborts the run.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {status} for {symbol}")]
    HttpStatus { symbol: String, status: u16 },

    #[error("unusable response for {symbol}: {detail}")]
    BadPayload { symbol: String, detail: String },

    #[error("no data returned for {symbol}")]
    NoData { symbol: String },

    #[error("giving up on {symbol} after {attempts} attempts")]
    RetriesExhausted { symbol: String, attempts: u32 },
}

/// Trait for bar-history sources (the chart API, mocks in tests).
///
/// The cache layer sits above this trait — sources don't know about the cache.
pub trait MarketDataSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Fetch bars for a symbol over an inclusive date range.
    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        interval: BarInterval,
    ) -> Result<TimeSeries, FetchError>;
}
