//! TimeSeries — ordered bar history for one symbol.
//!
//! Invariant: dates are unique and strictly increasing. Gaps are allowed in
//! storage but must be forward-filled before indicator computation so every
//! retained bar carries a usable close price.

use super::bar::Bar;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A symbol's ordered bar history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub symbol: String,
    pub bars: Vec<Bar>,
}

impl TimeSeries {
    /// Build a series from bars that may be unsorted or carry duplicate dates.
    ///
    /// Bars are sorted ascending; for duplicate dates the last one wins
    /// (providers occasionally repeat the live bar at the tail).
    pub fn from_unordered(symbol: impl Into<String>, mut bars: Vec<Bar>) -> Self {
        bars.sort_by_key(|b| b.date);
        bars.dedup_by(|next, prev| {
            if next.date == prev.date {
                *prev = next.clone();
                true
            } else {
                false
            }
        });
        Self {
            symbol: symbol.into(),
            bars,
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }

    /// Close prices in bar order.
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// Dates in bar order.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.date).collect()
    }

    /// The last `n` closes (fewer if the series is shorter).
    pub fn tail_closes(&self, n: usize) -> Vec<f64> {
        let start = self.bars.len().saturating_sub(n);
        self.bars[start..].iter().map(|b| b.close).collect()
    }

    /// Carry the last known prices forward into bars with missing fields and
    /// drop leading bars that have no close at all.
    ///
    /// After this returns, every remaining bar has a finite close.
    pub fn forward_fill(&mut self) {
        let first_valid = match self.bars.iter().position(Bar::has_close) {
            Some(i) => i,
            None => {
                self.bars.clear();
                return;
            }
        };
        self.bars.drain(..first_valid);

        let mut last = self.bars[0].clone();
        for bar in &mut self.bars {
            if bar.close.is_nan() {
                bar.close = last.close;
            }
            if bar.open.is_nan() {
                bar.open = last.close;
            }
            if bar.high.is_nan() {
                bar.high = bar.close.max(bar.open);
            }
            if bar.low.is_nan() {
                bar.low = bar.close.min(bar.open);
            }
            last = bar.clone();
        }
    }
}
