//! Benchmark-relative metrics: ratio line, alpha, relative performance.
//!
//! The benchmark is re-aligned onto the series' own calendar by carrying its
//! last known close forward at each series date. If the benchmark is missing,
//! empty, or produces no overlapping values, alpha and relative performance
//! degrade to zero for the whole series. The pipeline keeps functioning with
//! reduced signal quality instead of failing.

use super::returns::{pct_change, pct_change_over};
use crate::domain::TimeSeries;
use chrono::NaiveDate;

/// The benchmark-relative column block.
#[derive(Debug, Clone)]
pub struct RelativeMetrics {
    pub ratio_line: Vec<f64>,
    pub alpha_pct: Vec<f64>,
    pub rel_perf_pct: Vec<f64>,
}

impl RelativeMetrics {
    /// The degraded block: no usable benchmark, everything neutral.
    fn degraded(len: usize) -> Self {
        Self {
            ratio_line: vec![f64::NAN; len],
            alpha_pct: vec![0.0; len],
            rel_perf_pct: vec![0.0; len],
        }
    }
}

/// Forward-fill-align benchmark closes onto a target calendar.
///
/// For each target date, the value is the benchmark's last close on or
/// before that date; NaN before the benchmark's first bar.
pub fn align_ffill(target_dates: &[NaiveDate], benchmark: &TimeSeries) -> Vec<f64> {
    let mut out = vec![f64::NAN; target_dates.len()];
    let bars = &benchmark.bars;
    let mut cursor = 0usize;
    let mut last = f64::NAN;

    for (i, &date) in target_dates.iter().enumerate() {
        while cursor < bars.len() && bars[cursor].date <= date {
            if bars[cursor].has_close() {
                last = bars[cursor].close;
            }
            cursor += 1;
        }
        out[i] = last;
    }

    out
}

/// Compute the relative block for a series against an optional benchmark.
pub fn relative_metrics(
    dates: &[NaiveDate],
    closes: &[f64],
    returns_pct: &[f64],
    benchmark: Option<&TimeSeries>,
    rel_perf_lookback: usize,
) -> RelativeMetrics {
    let n = closes.len();
    let benchmark = match benchmark {
        Some(b) if !b.is_empty() => b,
        _ => return RelativeMetrics::degraded(n),
    };

    let aligned = align_ffill(dates, benchmark);
    if !aligned.iter().any(|v| v.is_finite()) {
        return RelativeMetrics::degraded(n);
    }

    let ratio_line: Vec<f64> = closes
        .iter()
        .zip(&aligned)
        .map(|(&c, &b)| {
            if c.is_finite() && b.is_finite() && b != 0.0 {
                c / b
            } else {
                f64::NAN
            }
        })
        .collect();

    let bench_returns = pct_change(&aligned);
    let alpha_pct: Vec<f64> = returns_pct
        .iter()
        .zip(&bench_returns)
        .map(|(&r, &b)| {
            let a = r - b;
            if a.is_finite() {
                a
            } else {
                0.0
            }
        })
        .collect();

    let rel_perf_pct: Vec<f64> = pct_change_over(&ratio_line, rel_perf_lookback)
        .into_iter()
        .map(|v| if v.is_finite() { v } else { 0.0 })
        .collect();

    RelativeMetrics {
        ratio_line,
        alpha_pct,
        rel_perf_pct,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_series};
    use chrono::Duration;

    fn dates(n: usize) -> Vec<NaiveDate> {
        let base = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        (0..n).map(|i| base + Duration::days(i as i64)).collect()
    }

    #[test]
    fn align_carries_last_known_forward() {
        let mut bench = make_series(&[200.0, 202.0, 204.0]);
        // Remove the middle bar to create a gap on 2024-01-03.
        bench.bars.remove(1);

        let aligned = align_ffill(&dates(4), &bench);
        assert_eq!(aligned[0], 200.0);
        assert_eq!(aligned[1], 200.0); // gap forward-filled
        assert_eq!(aligned[2], 204.0);
        assert_eq!(aligned[3], 204.0); // beyond last bar
    }

    #[test]
    fn align_is_nan_before_first_benchmark_bar() {
        let mut bench = make_series(&[200.0, 202.0]);
        for bar in &mut bench.bars {
            bar.date += Duration::days(2);
        }
        let aligned = align_ffill(&dates(3), &bench);
        assert!(aligned[0].is_nan());
        assert!(aligned[1].is_nan());
        assert_eq!(aligned[2], 200.0);
    }

    #[test]
    fn missing_benchmark_degrades_to_zeros() {
        let closes = [100.0, 101.0, 102.0];
        let returns = pct_change(&closes);
        let metrics = relative_metrics(&dates(3), &closes, &returns, None, 2);

        assert!(metrics.ratio_line.iter().all(|v| v.is_nan()));
        assert_eq!(metrics.alpha_pct, vec![0.0; 3]);
        assert_eq!(metrics.rel_perf_pct, vec![0.0; 3]);
    }

    #[test]
    fn empty_benchmark_degrades_to_zeros() {
        let closes = [100.0, 101.0];
        let returns = pct_change(&closes);
        let empty = TimeSeries {
            symbol: "SPY".into(),
            bars: vec![],
        };
        let metrics = relative_metrics(&dates(2), &closes, &returns, Some(&empty), 2);
        assert_eq!(metrics.alpha_pct, vec![0.0; 2]);
        assert_eq!(metrics.rel_perf_pct, vec![0.0; 2]);
    }

    #[test]
    fn non_overlapping_benchmark_degrades_to_zeros() {
        let mut bench = make_series(&[200.0, 202.0]);
        for bar in &mut bench.bars {
            bar.date += Duration::days(1000);
        }
        let closes = [100.0, 101.0];
        let returns = pct_change(&closes);
        let metrics = relative_metrics(&dates(2), &closes, &returns, Some(&bench), 2);
        assert_eq!(metrics.alpha_pct, vec![0.0; 2]);
        assert_eq!(metrics.rel_perf_pct, vec![0.0; 2]);
    }

    #[test]
    fn alpha_is_excess_return() {
        // Series +2% then +1%; benchmark +1% each step.
        let closes = [100.0, 102.0, 103.02];
        let bench = make_series(&[200.0, 202.0, 204.02]);
        let returns = pct_change(&closes);
        let metrics = relative_metrics(&dates(3), &closes, &returns, Some(&bench), 1);

        assert_eq!(metrics.alpha_pct[0], 0.0);
        assert_approx(metrics.alpha_pct[1], 1.0, 1e-9);
        assert_approx(metrics.alpha_pct[2], 0.0, 1e-9);
    }

    #[test]
    fn rel_perf_tracks_ratio_change() {
        // Series doubles while the benchmark is flat: the ratio doubles too.
        let closes = [100.0, 150.0, 200.0];
        let bench = make_series(&[200.0, 200.0, 200.0]);
        let returns = pct_change(&closes);
        let metrics = relative_metrics(&dates(3), &closes, &returns, Some(&bench), 2);

        assert_eq!(metrics.rel_perf_pct[0], 0.0); // warm-up neutral
        assert_eq!(metrics.rel_perf_pct[1], 0.0);
        assert_approx(metrics.rel_perf_pct[2], 100.0, 1e-9);
    }
}
