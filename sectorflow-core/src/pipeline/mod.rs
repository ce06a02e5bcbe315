//! Pipeline orchestration.
//!
//! One run: resolve the benchmark series first (every relative metric
//! depends on it), then fan the universe across a private worker pool. Each
//! symbol is cache-or-fetched, indicator-augmented, classified, and scanned
//! for reversals independently. A failed symbol is logged and skipped and
//! never affects its siblings.

pub mod report;

pub use report::{ChartColumns, PipelineOutcome, SymbolError, SymbolFailure, SymbolRecord};

use crate::config::{ConfigError, PipelineConfig, SymbolSpec};
use crate::data::cache::{CacheLookup, SeriesCache};
use crate::data::source::{FetchError, MarketDataSource};
use crate::data::yahoo::YahooChartSource;
use crate::domain::TimeSeries;
use crate::indicators::{self, sma};
use crate::trend::classify::classify_latest;
use crate::trend::reversal::ReversalDetector;
use chrono::Utc;
use rand::Rng;
use rayon::prelude::*;
use std::time::{Duration, Instant};

/// The pipeline orchestrator. Construction validates the configuration;
/// everything after that degrades per symbol instead of failing the run.
pub struct Pipeline {
    config: PipelineConfig,
    source: Box<dyn MarketDataSource>,
    cache: SeriesCache,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        source: Box<dyn MarketDataSource>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let cache = SeriesCache::new(&config.cache_dir, config.cache.clone());
        Ok(Self {
            config,
            source,
            cache,
        })
    }

    /// Convenience constructor wired to the chart-endpoint source.
    pub fn with_yahoo(config: PipelineConfig) -> Result<Self, ConfigError> {
        let source = Box::new(YahooChartSource::new(config.fetch.clone()));
        Self::new(config, source)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Execute one full pass over the configured universe.
    pub fn run(&self) -> PipelineOutcome {
        let started = Instant::now();

        let benchmark = match self.resolve_series(&self.config.benchmark) {
            Ok(series) => {
                tracing::info!(
                    benchmark = %self.config.benchmark,
                    bars = series.len(),
                    "benchmark resolved"
                );
                Some(series)
            }
            Err(error) => {
                tracing::warn!(
                    benchmark = %self.config.benchmark,
                    %error,
                    "benchmark unavailable; relative metrics degrade to zero"
                );
                None
            }
        };

        // Private pool: per-symbol work is embarrassingly parallel once the
        // benchmark exists, and workers=1 reproduces sequential behavior.
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.run.workers)
            .build()
            .expect("failed to build worker pool");

        let results: Vec<Result<SymbolRecord, SymbolFailure>> = pool.install(|| {
            self.config
                .universe
                .par_iter()
                .map(|spec| {
                    self.process_symbol(spec, benchmark.as_ref(), started)
                        .map_err(|error| {
                            tracing::warn!(symbol = %spec.ticker, %error, "skipping symbol");
                            SymbolFailure {
                                ticker: spec.ticker.clone(),
                                error,
                            }
                        })
                })
                .collect()
        });

        let mut records = Vec::with_capacity(results.len());
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(record) => records.push(record),
                Err(failure) => failures.push(failure),
            }
        }

        tracing::info!(
            processed = records.len(),
            skipped = failures.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "pipeline run complete"
        );

        PipelineOutcome {
            records,
            failures,
            benchmark_available: benchmark.is_some(),
        }
    }

    /// Cache-or-fetch one symbol's history.
    ///
    /// Fetched series are forward-filled before caching so entries always
    /// hold a usable close on every bar.
    fn resolve_series(&self, ticker: &str) -> Result<TimeSeries, FetchError> {
        if !self.config.run.force_refresh {
            match self.cache.load(ticker) {
                CacheLookup::Hit(series) => {
                    tracing::debug!(symbol = ticker, bars = series.len(), "cache hit");
                    return Ok(series);
                }
                CacheLookup::Miss(reason) => {
                    tracing::debug!(symbol = ticker, %reason, "cache miss");
                }
            }
        }

        self.politeness_pause();

        let end = Utc::now().date_naive();
        let start = end - chrono::Duration::days(self.config.history_days);
        let mut series = self.source.fetch(ticker, start, end, self.config.interval)?;
        series.forward_fill();

        if let Err(error) = self.cache.store(&series, self.config.interval, self.source.name()) {
            tracing::warn!(symbol = ticker, %error, "failed to cache fetched series");
        }

        Ok(series)
    }

    fn process_symbol(
        &self,
        spec: &SymbolSpec,
        benchmark: Option<&TimeSeries>,
        started: Instant,
    ) -> Result<SymbolRecord, SymbolError> {
        if self.past_deadline(started) {
            return Err(SymbolError::DeadlineExceeded);
        }

        let mut series = self.resolve_series(&spec.ticker)?;
        series.forward_fill();

        let required = self.config.run.min_process_bars.max(1);
        if series.len() < required {
            return Err(SymbolError::InsufficientHistory {
                bars: series.len(),
                required,
            });
        }

        let frame = indicators::compute(&series, benchmark, &self.config.indicators);
        let trend = classify_latest(&series, &frame, self.config.trend.sma_period);

        let closes = series.closes();
        let dates = series.dates();
        let smoothing = self.config.reversal.smoothing_period;
        let smoothed = sma(&closes, smoothing, smoothing);
        let detector = ReversalDetector::new(
            self.config.reversal.confirm_threshold,
            self.config.reversal.gate(),
        );
        let reversals = detector.detect(&dates, &closes, &smoothed);

        let last = series.len() - 1;
        let trend_sma = frame
            .sma(self.config.trend.sma_period)
            .map(|col| col.to_vec())
            .unwrap_or_else(|| vec![f64::NAN; series.len()]);
        let volume_millions = series
            .bars
            .iter()
            .map(|b| b.volume as f64 / 1e6)
            .collect();

        Ok(SymbolRecord {
            ticker: spec.ticker.clone(),
            name: spec.name.clone(),
            color: spec.color.clone(),
            latest_close: closes[last],
            latest_return_pct: frame.returns_pct[last],
            latest_alpha_pct: frame.alpha_pct[last],
            latest_rel_perf_pct: frame.rel_perf_pct[last],
            trend,
            trend_label: trend.label().to_string(),
            trend_color: trend.color().to_string(),
            reversals,
            spark_closes: series.tail_closes(60),
            chart: ChartColumns {
                dates,
                close: closes,
                sma: trend_sma,
                alpha_pct: frame.alpha_pct.clone(),
                volume_millions,
            },
        })
    }

    /// Randomized pause before a network fetch, purely to stay under
    /// provider rate limits. Not a correctness requirement.
    fn politeness_pause(&self) {
        let run = &self.config.run;
        if run.politeness_max_secs <= 0.0 {
            return;
        }
        let secs = if run.politeness_max_secs > run.politeness_min_secs {
            rand::thread_rng().gen_range(run.politeness_min_secs..run.politeness_max_secs)
        } else {
            run.politeness_min_secs
        };
        std::thread::sleep(Duration::from_secs_f64(secs));
    }

    fn past_deadline(&self, started: Instant) -> bool {
        match self.config.run.deadline_secs {
            Some(secs) => started.elapsed() >= Duration::from_secs(secs),
            None => false,
        }
    }
}
