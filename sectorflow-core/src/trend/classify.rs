//! Trend-state classification.
//!
//! A pure, memoryless decision table over two binary signals: is the close
//! above its medium-term moving average, and is relative performance against
//! the benchmark positive. Each call is independent of prior calls.

use crate::domain::TimeSeries;
use crate::indicators::IndicatorFrame;
use serde::{Deserialize, Serialize};

/// Quadrant label for the latest bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendState {
    Leading,
    Weakening,
    Improving,
    Lagging,
    #[default]
    Neutral,
}

impl TrendState {
    /// Display label as the dashboard shows it.
    pub fn label(&self) -> &'static str {
        match self {
            TrendState::Leading => "LEADING",
            TrendState::Weakening => "WEAKENING",
            TrendState::Improving => "IMPROVING",
            TrendState::Lagging => "LAGGING",
            TrendState::Neutral => "Neutral",
        }
    }

    /// Display color for the state badge.
    pub fn color(&self) -> &'static str {
        match self {
            TrendState::Leading => "#26a69a",
            TrendState::Weakening => "#F7DC6F",
            TrendState::Improving => "#45B7D1",
            TrendState::Lagging => "#ef5350",
            TrendState::Neutral => "#8a94a6",
        }
    }
}

/// Classify one snapshot row.
///
/// NaN inputs and exact ties fall through to Neutral.
pub fn classify(close: f64, trend_sma: f64, rel_perf_pct: f64) -> TrendState {
    if close > trend_sma && rel_perf_pct > 0.0 {
        TrendState::Leading
    } else if close > trend_sma && rel_perf_pct < 0.0 {
        TrendState::Weakening
    } else if close < trend_sma && rel_perf_pct > 0.0 {
        TrendState::Improving
    } else if close < trend_sma && rel_perf_pct < 0.0 {
        TrendState::Lagging
    } else {
        TrendState::Neutral
    }
}

/// Classify the latest row of a series; an empty series is Neutral.
pub fn classify_latest(
    series: &TimeSeries,
    frame: &IndicatorFrame,
    trend_sma_period: usize,
) -> TrendState {
    let last = series.len().checked_sub(1);
    let (Some(i), Some(smas)) = (last, frame.sma(trend_sma_period)) else {
        return TrendState::Neutral;
    };
    let close = series.bars[i].close;
    classify(close, smas[i], frame.rel_perf_pct[i])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndicatorConfig;
    use crate::indicators::{compute, make_series};

    #[test]
    fn quadrants() {
        assert_eq!(classify(105.0, 100.0, 2.0), TrendState::Leading);
        assert_eq!(classify(105.0, 100.0, -2.0), TrendState::Weakening);
        assert_eq!(classify(95.0, 100.0, 2.0), TrendState::Improving);
        assert_eq!(classify(95.0, 100.0, -2.0), TrendState::Lagging);
    }

    #[test]
    fn ties_and_nan_are_neutral() {
        assert_eq!(classify(100.0, 100.0, 2.0), TrendState::Neutral);
        assert_eq!(classify(105.0, 100.0, 0.0), TrendState::Neutral);
        assert_eq!(classify(f64::NAN, 100.0, 2.0), TrendState::Neutral);
        assert_eq!(classify(105.0, f64::NAN, 2.0), TrendState::Neutral);
        assert_eq!(classify(105.0, 100.0, f64::NAN), TrendState::Neutral);
    }

    #[test]
    fn colors_match_labels() {
        assert_eq!(TrendState::Leading.color(), "#26a69a");
        assert_eq!(TrendState::Lagging.color(), "#ef5350");
        assert_eq!(TrendState::Neutral.label(), "Neutral");
    }

    #[test]
    fn latest_row_without_benchmark_is_never_leading() {
        // No benchmark → relative performance is 0 everywhere → Neutral or
        // Weakening is impossible too; the tie on rel_perf forces Neutral.
        let series = make_series(&[100.0, 101.0, 102.0, 103.0]);
        let config = IndicatorConfig {
            sma_periods: vec![3],
            oscillator_period: 3,
            rel_perf_lookback: 2,
        };
        let frame = compute(&series, None, &config);
        assert_eq!(classify_latest(&series, &frame, 3), TrendState::Neutral);
    }

    #[test]
    fn empty_series_is_neutral() {
        let series = make_series(&[]);
        let config = IndicatorConfig {
            sma_periods: vec![3],
            oscillator_period: 3,
            rel_perf_lookback: 2,
        };
        let frame = compute(&series, None, &config);
        assert_eq!(classify_latest(&series, &frame, 3), TrendState::Neutral);
    }

    #[test]
    fn missing_sma_period_is_neutral() {
        let series = make_series(&[100.0, 101.0]);
        let config = IndicatorConfig {
            sma_periods: vec![3],
            oscillator_period: 3,
            rel_perf_lookback: 2,
        };
        let frame = compute(&series, None, &config);
        assert_eq!(classify_latest(&series, &frame, 50), TrendState::Neutral);
    }
}
