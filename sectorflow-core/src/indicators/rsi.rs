//! Bounded 0–100 momentum oscillator.
//!
//! Ratio of the rolling mean of gains to the rolling mean of losses over a
//! trailing window. Wherever that ratio is undefined (warm-up, a NaN in the
//! window, a zero average loss) the output is the neutral midpoint 50 rather
//! than NaN, so classification and detection never have to guard.

/// Compute the oscillator over close prices.
///
/// Output length equals input length and every cell is within [0, 100].
pub fn oscillator(closes: &[f64], period: usize) -> Vec<f64> {
    assert!(period >= 1, "oscillator period must be >= 1");

    const NEUTRAL: f64 = 50.0;
    let n = closes.len();
    let mut out = vec![NEUTRAL; n];
    if n < 2 {
        return out;
    }

    // Change at i is close[i] - close[i-1]; index 0 has no change.
    let mut gains = vec![f64::NAN; n];
    let mut losses = vec![f64::NAN; n];
    for i in 1..n {
        let delta = closes[i] - closes[i - 1];
        if delta.is_finite() {
            gains[i] = delta.max(0.0);
            losses[i] = (-delta).max(0.0);
        }
    }

    // A cell is defined once `period` consecutive finite changes exist.
    for i in period..n {
        let window = i + 1 - period..i + 1;
        let mut avg_gain = 0.0;
        let mut avg_loss = 0.0;
        let mut defined = true;
        for j in window {
            if gains[j].is_nan() {
                defined = false;
                break;
            }
            avg_gain += gains[j];
            avg_loss += losses[j];
        }
        if !defined {
            continue;
        }
        avg_gain /= period as f64;
        avg_loss /= period as f64;

        if avg_loss > 0.0 {
            let rs = avg_gain / avg_loss;
            out[i] = 100.0 - 100.0 / (1.0 + rs);
        }
        // avg_loss == 0 keeps the neutral midpoint.
    }

    out
}
