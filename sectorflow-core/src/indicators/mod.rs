//! Indicator engine — derived columns over one series.
//!
//! All functions are column-oriented: they take a slice of closes and return
//! a vector of the same length, NaN only where a value is genuinely
//! undefined (strict warm-up). Columns downstream consumers must never see
//! as NaN (returns, the oscillator, the benchmark-relative block) resolve
//! undefined cells to a neutral sentinel at the point of computation.

pub mod relative;
pub mod returns;
pub mod rsi;
pub mod sma;

pub use relative::{align_ffill, relative_metrics, RelativeMetrics};
pub use returns::pct_change;
pub use rsi::oscillator;
pub use sma::sma;

use crate::config::IndicatorConfig;
use crate::domain::TimeSeries;
use std::collections::BTreeMap;

/// Parallel derived columns for one series. Recomputed per run, never cached.
#[derive(Debug, Clone)]
pub struct IndicatorFrame {
    /// Moving averages keyed by period, minimum-period policy (no warm-up gap).
    pub smas: BTreeMap<usize, Vec<f64>>,
    /// Period-over-period close change, percent. First row 0.
    pub returns_pct: Vec<f64>,
    /// Bounded 0–100 momentum oscillator, neutral 50 where undefined.
    pub oscillator: Vec<f64>,
    /// Close ÷ aligned benchmark close; NaN without a usable benchmark.
    pub ratio_line: Vec<f64>,
    /// Return minus benchmark return, percent; 0 where degraded.
    pub alpha_pct: Vec<f64>,
    /// Percent change of the ratio line over the lookback; 0 where degraded.
    pub rel_perf_pct: Vec<f64>,
}

impl IndicatorFrame {
    pub fn len(&self) -> usize {
        self.returns_pct.len()
    }

    pub fn is_empty(&self) -> bool {
        self.returns_pct.is_empty()
    }

    /// The SMA column for `period`, if it was configured.
    pub fn sma(&self, period: usize) -> Option<&[f64]> {
        self.smas.get(&period).map(|v| v.as_slice())
    }
}

/// Compute the full indicator frame for `series`, with benchmark-relative
/// metrics when a usable benchmark is supplied.
pub fn compute(
    series: &TimeSeries,
    benchmark: Option<&TimeSeries>,
    config: &IndicatorConfig,
) -> IndicatorFrame {
    let closes = series.closes();
    let dates = series.dates();

    let mut smas = BTreeMap::new();
    for &period in &config.sma_periods {
        smas.insert(period, sma(&closes, period, 1));
    }

    let returns_pct = pct_change(&closes);
    let oscillator = oscillator(&closes, config.oscillator_period);
    let relative = relative_metrics(
        &dates,
        &closes,
        &returns_pct,
        benchmark,
        config.rel_perf_lookback,
    );

    IndicatorFrame {
        smas,
        returns_pct,
        oscillator,
        ratio_line: relative.ratio_line,
        alpha_pct: relative.alpha_pct,
        rel_perf_pct: relative.rel_perf_pct,
    }
}

/// Create a synthetic series from close prices for testing.
///
/// Generates plausible OHLV: open = prev close (or close for the first bar),
/// high = max(open, close) + 1.0, low = min(open, close) - 1.0, volume 1000.
#[cfg(test)]
pub fn make_series(closes: &[f64]) -> TimeSeries {
    use crate::domain::Bar;
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let bars = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000,
            }
        })
        .collect();
    TimeSeries {
        symbol: "TEST".to_string(),
        bars,
    }
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
