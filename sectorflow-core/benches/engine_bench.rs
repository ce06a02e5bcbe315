//! Benchmarks for the hot per-symbol path: indicator columns and the
//! reversal scan over a multi-year daily series.

use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sectorflow_core::indicators::{oscillator, sma};
use sectorflow_core::trend::reversal::{MagnitudeGate, ReversalDetector};

fn synthetic_closes(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 100.0 + i as f64 * 0.02 + 15.0 * (i as f64 / 60.0).sin())
        .collect()
}

fn synthetic_dates(n: usize) -> Vec<NaiveDate> {
    let base = NaiveDate::from_ymd_opt(2010, 1, 4).unwrap();
    (0..n).map(|i| base + Duration::days(i as i64)).collect()
}

fn bench_indicators(c: &mut Criterion) {
    let closes = synthetic_closes(5000);

    c.bench_function("sma_50_min_periods_5000", |b| {
        b.iter(|| sma(black_box(&closes), 50, 1))
    });
    c.bench_function("oscillator_14_5000", |b| {
        b.iter(|| oscillator(black_box(&closes), 14))
    });
}

fn bench_detector(c: &mut Criterion) {
    let closes = synthetic_closes(5000);
    let dates = synthetic_dates(5000);
    let smoothed = sma(&closes, 50, 50);

    let ungated = ReversalDetector::new(0.01, None);
    c.bench_function("reversal_detect_5000", |b| {
        b.iter(|| ungated.detect(black_box(&dates), black_box(&closes), black_box(&smoothed)))
    });

    let gated = ReversalDetector::new(0.01, Some(MagnitudeGate::default()));
    c.bench_function("reversal_detect_gated_5000", |b| {
        b.iter(|| gated.detect(black_box(&dates), black_box(&closes), black_box(&smoothed)))
    });
}

criterion_group!(benches, bench_indicators, bench_detector);
criterion_main!(benches);
