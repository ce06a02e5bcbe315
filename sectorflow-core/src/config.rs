//! Immutable pipeline configuration.
//!
//! Everything the orchestrator needs is collected here and validated once at
//! construction. A malformed configuration is the one class of problem that
//! aborts a run; every data-quality issue downstream is recoverable per
//! symbol.

use crate::data::cache::CachePolicy;
use crate::data::source::BarInterval;
use crate::data::yahoo::FetchConfig;
use crate::trend::reversal::MagnitudeGate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(String),

    #[error("failed to parse config TOML: {0}")]
    Parse(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// One symbol in the tracked universe, with its display attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolSpec {
    pub ticker: String,
    pub name: String,
    pub color: String,
}

/// Indicator column settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    /// Moving-average periods computed as display/classification columns.
    pub sma_periods: Vec<usize>,
    /// Trailing window of the bounded oscillator.
    pub oscillator_period: usize,
    /// Lookback (bars) for relative performance. 63 trading days is about
    /// one quarter; 20 and 150 give the short and long variants.
    pub rel_perf_lookback: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            sma_periods: vec![20, 50, 200],
            oscillator_period: 14,
            rel_perf_lookback: 63,
        }
    }
}

/// Trend-classification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Medium-term SMA the classifier compares the close against. Must be
    /// one of `IndicatorConfig::sma_periods`.
    pub sma_period: usize,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self { sma_period: 50 }
    }
}

/// Reversal-detection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReversalConfig {
    /// Strict SMA period producing the smoothed signal the detector scans.
    pub smoothing_period: usize,
    /// Relative confirmation threshold (0.01 = 1%). At 1% single-bar noise
    /// never confirms a turn on daily bars; useful values sit in 0.001–0.02.
    pub confirm_threshold: f64,
    /// Whether confirmed turns must also pass the raw-price magnitude gate.
    pub gate_enabled: bool,
    pub gate_lookback: usize,
    pub gate_min_move_pct: f64,
}

impl Default for ReversalConfig {
    fn default() -> Self {
        let gate = MagnitudeGate::default();
        Self {
            smoothing_period: 50,
            confirm_threshold: 0.01,
            gate_enabled: true,
            gate_lookback: gate.lookback,
            gate_min_move_pct: gate.min_move_pct,
        }
    }
}

impl ReversalConfig {
    pub fn gate(&self) -> Option<MagnitudeGate> {
        self.gate_enabled.then_some(MagnitudeGate {
            lookback: self.gate_lookback,
            min_move_pct: self.gate_min_move_pct,
        })
    }
}

/// Execution settings for one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Worker threads for the per-symbol fan-out. 1 reproduces strictly
    /// sequential processing.
    pub workers: usize,
    /// Symbols with fewer bars than this are skipped, not errors.
    pub min_process_bars: usize,
    /// Randomized delay bounds (seconds) before each network fetch.
    pub politeness_min_secs: f64,
    pub politeness_max_secs: f64,
    /// Overall wall-clock budget; symbols starting past it are skipped.
    pub deadline_secs: Option<u64>,
    /// Skip cache reads and re-fetch every symbol.
    pub force_refresh: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            min_process_bars: 100,
            politeness_min_secs: 1.0,
            politeness_max_secs: 2.5,
            deadline_secs: None,
            force_refresh: false,
        }
    }
}

/// The complete, immutable pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Benchmark resolved before any per-symbol work; all relative metrics
    /// depend on it.
    pub benchmark: String,
    /// How far back fetches reach, in days.
    pub history_days: i64,
    pub interval: BarInterval,
    pub cache_dir: PathBuf,
    pub universe: Vec<SymbolSpec>,
    pub cache: CachePolicy,
    pub fetch: FetchConfig,
    pub indicators: IndicatorConfig,
    pub trend: TrendConfig,
    pub reversal: ReversalConfig,
    pub run: RunConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            benchmark: "SPY".to_string(),
            history_days: 2000,
            interval: BarInterval::Daily,
            cache_dir: PathBuf::from("./cache"),
            universe: default_universe(),
            cache: CachePolicy::default(),
            fetch: FetchConfig::default(),
            indicators: IndicatorConfig::default(),
            trend: TrendConfig::default(),
            reversal: ReversalConfig::default(),
            run: RunConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load and validate a configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parse and validate a configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field consistency. Run once at construction.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.universe.is_empty() {
            return invalid("universe must contain at least one symbol".into());
        }
        if self.benchmark.trim().is_empty() {
            return invalid("benchmark symbol must not be empty".into());
        }
        if self.history_days <= 0 {
            return invalid(format!("history_days must be positive, got {}", self.history_days));
        }
        if !self.indicators.sma_periods.contains(&self.trend.sma_period) {
            return invalid(format!(
                "trend sma_period {} is not among indicator sma_periods {:?}",
                self.trend.sma_period, self.indicators.sma_periods
            ));
        }
        if self.indicators.sma_periods.iter().any(|&p| p == 0) {
            return invalid("sma_periods must all be >= 1".into());
        }
        if self.indicators.oscillator_period == 0 || self.indicators.rel_perf_lookback == 0 {
            return invalid("indicator periods must be >= 1".into());
        }
        let threshold = self.reversal.confirm_threshold;
        if !(threshold > 0.0 && threshold < 1.0) {
            return invalid(format!(
                "reversal confirm_threshold must be in (0, 1), got {threshold}"
            ));
        }
        if self.reversal.smoothing_period == 0 {
            return invalid("reversal smoothing_period must be >= 1".into());
        }
        if self.run.workers == 0 {
            return invalid("workers must be >= 1".into());
        }
        if self.run.politeness_min_secs < 0.0
            || self.run.politeness_max_secs < self.run.politeness_min_secs
        {
            return invalid("politeness delay bounds are inverted".into());
        }
        if self.fetch.max_attempts == 0 {
            return invalid("fetch max_attempts must be >= 1".into());
        }

        Ok(())
    }
}

/// The sector ETF universe the dashboards track.
fn default_universe() -> Vec<SymbolSpec> {
    let spec = |ticker: &str, name: &str, color: &str| SymbolSpec {
        ticker: ticker.to_string(),
        name: name.to_string(),
        color: color.to_string(),
    };
    vec![
        spec("SOXX", "Tech", "#FF6B6B"),
        spec("XLF", "Finance", "#45B7D1"),
        spec("XLV", "Health", "#DDA0DD"),
        spec("XLE", "Energy", "#F7DC6F"),
        spec("VNQ", "REITs", "#FFEAA7"),
        spec("XLI", "Industrials", "#85C1E9"),
        spec("XLB", "Materials", "#BB8FCE"),
        spec("XLU", "Utilities", "#73C6B6"),
        spec("XLY", "Consumption", "#82E0AA"),
        spec("XLP", "Staples", "#F8C471"),
        spec("IYT", "Transport", "#EB984E"),
        spec("KIE", "Insurance", "#96CEB4"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.universe.len(), 12);
        assert_eq!(config.benchmark, "SPY");
    }

    #[test]
    fn toml_roundtrip() {
        let config = PipelineConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = PipelineConfig::from_toml(&toml_str).unwrap();
        assert_eq!(parsed.universe.len(), config.universe.len());
        assert_eq!(parsed.trend.sma_period, config.trend.sma_period);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config = PipelineConfig::from_toml(
            r##"
            benchmark = "QQQ"

            [[universe]]
            ticker = "XLK"
            name = "Tech"
            color = "#FF6B6B"
            "##,
        )
        .unwrap();
        assert_eq!(config.benchmark, "QQQ");
        assert_eq!(config.universe.len(), 1);
        assert_eq!(config.reversal.smoothing_period, 50);
    }

    #[test]
    fn rejects_empty_universe() {
        let mut config = PipelineConfig::default();
        config.universe.clear();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_trend_period_outside_sma_set() {
        let mut config = PipelineConfig::default();
        config.trend.sma_period = 37;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let mut config = PipelineConfig::default();
        config.reversal.confirm_threshold = 1.5;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn gate_disabled_yields_none() {
        let mut config = PipelineConfig::default();
        assert!(config.reversal.gate().is_some());
        config.reversal.gate_enabled = false;
        assert!(config.reversal.gate().is_none());
    }
}
