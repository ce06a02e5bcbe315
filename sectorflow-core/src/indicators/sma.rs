//! Simple moving average with a minimum-period policy.
//!
//! `min_periods = 1` averages however many points exist at the start of the
//! series, so visible history has no indicator warm-up gap.
//! `min_periods = period` is the strict variant: NaN until the window fills,
//! which is what the reversal detector's smoothing signal uses.

/// Rolling mean of the trailing `period` values.
///
/// A window cell produces a value when it holds at least `min_periods`
/// finite inputs; otherwise NaN. NaN inputs are excluded from the mean
/// rather than poisoning the whole window.
pub fn sma(values: &[f64], period: usize, min_periods: usize) -> Vec<f64> {
    assert!(period >= 1, "SMA period must be >= 1");
    let min_periods = min_periods.clamp(1, period);

    let n = values.len();
    let mut out = vec![f64::NAN; n];

    // Prefix sums over finite values plus a finite-count prefix, so each
    // window is O(1) regardless of NaN placement.
    let mut sums = vec![0.0; n + 1];
    let mut counts = vec![0usize; n + 1];
    for (i, &v) in values.iter().enumerate() {
        let finite = v.is_finite();
        sums[i + 1] = sums[i] + if finite { v } else { 0.0 };
        counts[i + 1] = counts[i] + usize::from(finite);
    }

    for i in 0..n {
        let start = (i + 1).saturating_sub(period);
        let valid = counts[i + 1] - counts[start];
        if valid >= min_periods {
            out[i] = (sums[i + 1] - sums[start]) / valid as f64;
        }
    }

    out
}
