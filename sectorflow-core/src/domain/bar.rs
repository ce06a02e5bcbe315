//! Bar — the fundamental market data unit.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// OHLCV bar for a single symbol on a single day (or week).
///
/// `close` is the split/dividend-adjusted close whenever the data source
/// supplied a usable adjusted series; all derived indicators read `close`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    /// Returns true if the bar has a usable close price.
    pub fn has_close(&self) -> bool {
        !self.close.is_nan()
    }

    /// Returns true if every price field is NaN (non-trading day).
    pub fn is_void(&self) -> bool {
        self.open.is_nan() && self.high.is_nan() && self.low.is_nan() && self.close.is_nan()
    }
}
