//! Reversal detection — confirmed turning points of a smoothed signal.
//!
//! The smoothing decides *when* a turn is confirmed (single-bar wiggles of
//! the raw price never register), but every event is reported at the *raw*
//! close of the extreme's date, because the smoothed value there is a
//! lagging, damped approximation of what actually traded.
//!
//! The detector is a three-state machine over (smoothed value, raw close)
//! pairs in strictly increasing date order:
//!
//! - `Flat`: anchored at the first valid smoothed value; a move beyond the
//!   anchor by more than the relative threshold establishes the first leg.
//! - `Rising`: new highs extend the leg; a drop below the tracked extreme by
//!   more than the threshold confirms that extreme was a peak.
//! - `Falling`: symmetric, confirming troughs.
//!
//! An optional magnitude gate additionally requires the raw close to have
//! moved a minimum percent from its rolling lookback extreme before a
//! confirmed turn is promoted to an event, filtering technically-valid but
//! economically-insignificant turns.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// What kind of turning point an event marks.
///
/// Gated detection emits `Bull`/`Bear`; ungated detection emits the plain
/// confirmation kinds. Bull and TroughConfirmed are bullish, the other two
/// bearish, and a symbol's event sequence strictly alternates in direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReversalKind {
    Bull,
    TroughConfirmed,
    Bear,
    PeakConfirmed,
}

impl ReversalKind {
    pub fn is_bullish(&self) -> bool {
        matches!(self, ReversalKind::Bull | ReversalKind::TroughConfirmed)
    }
}

/// A confirmed turning point. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReversalEvent {
    /// Date of the extreme (not of the bar that confirmed it).
    pub date: NaiveDate,
    /// Raw close on the extreme's date.
    pub price: f64,
    pub kind: ReversalKind,
    /// Percent move that carried the event: the gate move when a gate is
    /// configured, otherwise the smoothed confirming move. Signed, bullish
    /// positive.
    pub move_pct: f64,
}

/// Minimum raw-price move required to promote a confirmed turn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MagnitudeGate {
    /// Rolling window (bars, ending at the confirming bar) scanned for the
    /// prior raw extreme.
    pub lookback: usize,
    /// Required move percent from that extreme, as a positive number.
    pub min_move_pct: f64,
}

impl Default for MagnitudeGate {
    fn default() -> Self {
        Self {
            lookback: 30,
            min_move_pct: 10.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Leg {
    Flat,
    Rising,
    Falling,
}

/// Scans a smoothed signal for confirmed turning points.
#[derive(Debug, Clone)]
pub struct ReversalDetector {
    threshold: f64,
    gate: Option<MagnitudeGate>,
}

impl ReversalDetector {
    /// `threshold` is the relative confirmation threshold (0.01 = 1%).
    pub fn new(threshold: f64, gate: Option<MagnitudeGate>) -> Self {
        assert!(
            threshold > 0.0 && threshold < 1.0,
            "confirmation threshold must be in (0, 1)"
        );
        Self { threshold, gate }
    }

    /// Scan one symbol's history.
    ///
    /// `smoothed` is typically a strict-window moving average of `raw`, but
    /// any signal works (the ratio-line variant runs the same machine).
    /// Rows where either input is NaN are skipped, so the machine only
    /// starts once the smoothing warm-up ends; a series shorter than the
    /// smoothing window therefore yields no events.
    pub fn detect(
        &self,
        dates: &[NaiveDate],
        raw: &[f64],
        smoothed: &[f64],
    ) -> Vec<ReversalEvent> {
        assert_eq!(dates.len(), raw.len(), "dates/raw length mismatch");
        assert_eq!(dates.len(), smoothed.len(), "dates/smoothed length mismatch");

        let valid: Vec<usize> = (0..dates.len())
            .filter(|&i| smoothed[i].is_finite() && raw[i].is_finite())
            .collect();
        let Some((&first, rest)) = valid.split_first() else {
            return Vec::new();
        };

        let mut events = Vec::new();
        let mut leg = Leg::Flat;
        let mut extreme_idx = first;
        let mut extreme_val = smoothed[first];
        let mut last_emitted_bullish: Option<bool> = None;

        for &i in rest {
            let curr = smoothed[i];
            match leg {
                Leg::Flat => {
                    if curr >= extreme_val * (1.0 + self.threshold) {
                        leg = Leg::Rising;
                        extreme_idx = i;
                        extreme_val = curr;
                    } else if curr <= extreme_val * (1.0 - self.threshold) {
                        leg = Leg::Falling;
                        extreme_idx = i;
                        extreme_val = curr;
                    }
                }
                Leg::Rising => {
                    if curr > extreme_val {
                        extreme_idx = i;
                        extreme_val = curr;
                    } else if curr < extreme_val * (1.0 - self.threshold) {
                        // The tracked extreme is confirmed as a peak.
                        self.emit(
                            &mut events,
                            &mut last_emitted_bullish,
                            dates,
                            raw,
                            smoothed,
                            extreme_idx,
                            i,
                            false,
                        );
                        leg = Leg::Falling;
                        extreme_idx = i;
                        extreme_val = curr;
                    }
                }
                Leg::Falling => {
                    if curr < extreme_val {
                        extreme_idx = i;
                        extreme_val = curr;
                    } else if curr > extreme_val * (1.0 + self.threshold) {
                        // The tracked extreme is confirmed as a trough.
                        self.emit(
                            &mut events,
                            &mut last_emitted_bullish,
                            dates,
                            raw,
                            smoothed,
                            extreme_idx,
                            i,
                            true,
                        );
                        leg = Leg::Rising;
                        extreme_idx = i;
                        extreme_val = curr;
                    }
                }
            }
        }

        events
    }

    /// Apply the alternation rule and the magnitude gate, then record the
    /// event at the stored extreme's date and raw price.
    #[allow(clippy::too_many_arguments)]
    fn emit(
        &self,
        events: &mut Vec<ReversalEvent>,
        last_emitted_bullish: &mut Option<bool>,
        dates: &[NaiveDate],
        raw: &[f64],
        smoothed: &[f64],
        extreme_idx: usize,
        confirm_idx: usize,
        bullish: bool,
    ) {
        // A gate-suppressed turn can leave the next candidate pointing the
        // same way as the last emitted event; dropping it keeps legs
        // strictly alternating.
        if *last_emitted_bullish == Some(bullish) {
            return;
        }

        let (kind, move_pct) = match self.gate {
            Some(gate) => {
                let start = (confirm_idx + 1).saturating_sub(gate.lookback);
                let window = raw[start..=confirm_idx].iter().copied().filter(|v| v.is_finite());
                let reference = if bullish {
                    window.fold(f64::INFINITY, f64::min)
                } else {
                    window.fold(f64::NEG_INFINITY, f64::max)
                };
                if !reference.is_finite() || reference == 0.0 {
                    return;
                }
                let move_pct = (raw[confirm_idx] / reference - 1.0) * 100.0;
                let passes = if bullish {
                    move_pct >= gate.min_move_pct
                } else {
                    move_pct <= -gate.min_move_pct
                };
                if !passes {
                    return;
                }
                let kind = if bullish {
                    ReversalKind::Bull
                } else {
                    ReversalKind::Bear
                };
                (kind, move_pct)
            }
            None => {
                let move_pct =
                    (smoothed[confirm_idx] / smoothed[extreme_idx] - 1.0) * 100.0;
                let kind = if bullish {
                    ReversalKind::TroughConfirmed
                } else {
                    ReversalKind::PeakConfirmed
                };
                (kind, move_pct)
            }
        };

        *last_emitted_bullish = Some(bullish);
        events.push(ReversalEvent {
            date: dates[extreme_idx],
            price: raw[extreme_idx],
            kind,
            move_pct,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn dates(n: usize) -> Vec<NaiveDate> {
        let base = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        (0..n).map(|i| base + Duration::days(i as i64)).collect()
    }

    fn detector(threshold: f64) -> ReversalDetector {
        ReversalDetector::new(threshold, None)
    }

    #[test]
    fn monotonic_rise_emits_nothing() {
        let smoothed: Vec<f64> = (0..100).map(|i| 100.0 + i as f64).collect();
        let raw = smoothed.clone();
        let events = detector(0.01).detect(&dates(100), &raw, &smoothed);
        assert!(events.is_empty());
    }

    #[test]
    fn monotonic_fall_emits_nothing() {
        let smoothed: Vec<f64> = (0..100).map(|i| 200.0 - i as f64).collect();
        let raw = smoothed.clone();
        let events = detector(0.01).detect(&dates(100), &raw, &smoothed);
        assert!(events.is_empty());
    }

    #[test]
    fn v_shape_emits_single_trough_at_minimum() {
        // 100 bars: linear 100 → 50 over the first half, back to 100 over
        // the second. Raw closes offset by +3 so the price lookup is
        // distinguishable from the smoothed value.
        let mut smoothed = Vec::with_capacity(100);
        for i in 0..50 {
            smoothed.push(100.0 - 50.0 * i as f64 / 49.0);
        }
        for i in 50..100 {
            smoothed.push(50.0 + 50.0 * (i - 49) as f64 / 50.0);
        }
        let raw: Vec<f64> = smoothed.iter().map(|v| v + 3.0).collect();
        let dates = dates(100);

        let events = detector(0.01).detect(&dates, &raw, &smoothed);
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.kind, ReversalKind::TroughConfirmed);
        assert_eq!(event.date, dates[49]);
        assert_eq!(event.price, raw[49]);
        assert!(event.move_pct > 0.0);
    }

    #[test]
    fn peak_is_dated_at_extreme_and_priced_raw() {
        // Rise to a peak at index 10, then fall away.
        let mut smoothed: Vec<f64> = (0..=10).map(|i| 100.0 + 2.0 * i as f64).collect();
        smoothed.extend((1..=10).map(|i| 120.0 - 2.0 * i as f64));
        let raw: Vec<f64> = smoothed.iter().map(|v| v * 1.1).collect();
        let dates = dates(smoothed.len());

        let events = detector(0.01).detect(&dates, &raw, &smoothed);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, ReversalKind::PeakConfirmed);
        assert_eq!(events[0].date, dates[10]);
        assert_eq!(events[0].price, raw[10]);
        assert!(events[0].move_pct < 0.0);
    }

    #[test]
    fn zigzag_alternates_and_dates_extremes() {
        // Down to 80 (idx 20), up to 120 (idx 60), down to 90 (idx 90).
        let mut smoothed = Vec::new();
        for i in 0..=20 {
            smoothed.push(100.0 - i as f64);
        }
        for i in 1..=40 {
            smoothed.push(80.0 + i as f64);
        }
        for i in 1..=30 {
            smoothed.push(120.0 - i as f64);
        }
        let raw = smoothed.clone();
        let dates = dates(smoothed.len());

        let events = detector(0.01).detect(&dates, &raw, &smoothed);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, ReversalKind::TroughConfirmed);
        assert_eq!(events[0].date, dates[20]);
        assert_eq!(events[1].kind, ReversalKind::PeakConfirmed);
        assert_eq!(events[1].date, dates[60]);
    }

    #[test]
    fn wiggle_below_threshold_is_ignored_but_big_turn_confirms() {
        // A 0.5% dip inside an uptrend must not confirm a peak at 1%.
        let smoothed = vec![
            100.0, 101.0, 102.0, 103.0, 102.6, 103.5, 104.5, 105.5, 106.5,
        ];
        let raw = smoothed.clone();
        let events = detector(0.01).detect(&dates(smoothed.len()), &raw, &smoothed);
        assert!(events.is_empty());
    }

    #[test]
    fn warmup_nans_are_skipped() {
        let mut smoothed = vec![f64::NAN; 5];
        for i in 0..=20 {
            smoothed.push(100.0 - i as f64);
        }
        for i in 1..=20 {
            smoothed.push(80.0 + i as f64);
        }
        let raw: Vec<f64> = smoothed.iter().map(|v| if v.is_nan() { 1.0 } else { *v }).collect();
        let dates = dates(smoothed.len());

        let events = detector(0.01).detect(&dates, &raw, &smoothed);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, ReversalKind::TroughConfirmed);
        assert_eq!(events[0].date, dates[25]);
    }

    #[test]
    fn all_nan_or_short_input_emits_nothing() {
        let d = dates(3);
        let nan = vec![f64::NAN; 3];
        let raw = vec![1.0, 2.0, 3.0];
        assert!(detector(0.01).detect(&d, &raw, &nan).is_empty());
        assert!(detector(0.01)
            .detect(&[], &[], &[])
            .is_empty());
    }

    #[test]
    fn gate_filters_small_turns() {
        // Swings of ~4% confirm at a 1% threshold but fail a 10% gate.
        let mut smoothed = Vec::new();
        for _ in 0..3 {
            for i in 0..10 {
                smoothed.push(100.0 + i as f64 * 0.4);
            }
            for i in 0..10 {
                smoothed.push(104.0 - i as f64 * 0.4);
            }
        }
        let raw = smoothed.clone();
        let d = dates(smoothed.len());

        let ungated = detector(0.01).detect(&d, &raw, &smoothed);
        assert!(!ungated.is_empty());

        let gated = ReversalDetector::new(0.01, Some(MagnitudeGate::default()));
        assert!(gated.detect(&d, &raw, &smoothed).is_empty());
    }

    #[test]
    fn gate_promotes_large_turns_to_bull_and_bear() {
        // 100 → 60 → 130 → 80 in the smoothed signal; raw leads it by 25
        // bars (price bottoms well before its moving average does), so the
        // raw close has moved far off the rolling extreme by confirmation.
        let mut smoothed = Vec::new();
        for i in 0..=40 {
            smoothed.push(100.0 - i as f64);
        }
        for i in 1..=70 {
            smoothed.push(60.0 + i as f64);
        }
        for i in 1..=50 {
            smoothed.push(130.0 - i as f64);
        }
        let n = smoothed.len();
        let raw: Vec<f64> = (0..n).map(|i| smoothed[(i + 25).min(n - 1)]).collect();
        let d = dates(n);

        let gated = ReversalDetector::new(0.01, Some(MagnitudeGate::default()));
        let events = gated.detect(&d, &raw, &smoothed);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, ReversalKind::Bull);
        assert!(events[0].move_pct >= 10.0);
        assert_eq!(events[1].kind, ReversalKind::Bear);
        assert!(events[1].move_pct <= -10.0);
    }

    #[test]
    fn gate_suppression_preserves_alternation() {
        // Candidate turns: trough @40, peak @80, trough @120. The raw path
        // is shaped so both troughs clear the 10% gate while the peak's raw
        // window is flat (gate fails). Without the alternation rule the
        // result would be two consecutive bullish events.
        let mut smoothed = Vec::new();
        for i in 0..=40 {
            smoothed.push(100.0 - i as f64); // down to 60 @40
        }
        for i in 1..=40 {
            smoothed.push(60.0 + i as f64); // up to 100 @80
        }
        for i in 1..=40 {
            smoothed.push(100.0 - i as f64); // down to 60 @120
        }
        for i in 1..=40 {
            smoothed.push(60.0 + i as f64); // up again
        }
        let n = smoothed.len();
        let mut raw = vec![80.0; n];
        for slot in raw.iter_mut().take(36).skip(12) {
            *slot = 60.0; // rolling low ahead of the first confirmation
        }
        for k in 0..=5 {
            raw[36 + k] = 60.0 + 2.0 * k as f64; // rebounds to 70 by idx 41
        }
        for slot in raw.iter_mut().take(83).skip(53) {
            *slot = 100.0; // flat across the peak's gate window
        }
        for slot in raw.iter_mut().take(116).skip(92) {
            *slot = 60.0;
        }
        for k in 0..=5 {
            raw[116 + k] = 60.0 + 2.0 * k as f64; // second trough also gates in
        }
        let d = dates(n);

        let gated =
            ReversalDetector::new(0.01, Some(MagnitudeGate { lookback: 30, min_move_pct: 10.0 }));
        let events = gated.detect(&d, &raw, &smoothed);

        // Only the first trough survives: the peak fails its gate, and the
        // second trough is dropped to keep directions alternating.
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, ReversalKind::Bull);
        assert_eq!(events[0].date, d[40]);
        assert_eq!(events[0].price, raw[40]);
    }

    #[test]
    #[should_panic(expected = "confirmation threshold must be in (0, 1)")]
    fn rejects_out_of_range_threshold() {
        ReversalDetector::new(0.0, None);
    }
}
