//! Outbound records — the contract with the external presentation layer.
//!
//! The renderer sorts, charts, and styles these without knowing how they
//! were derived. Non-finite floats serialize as JSON null, which is what the
//! charting layer expects for gaps.

use crate::data::source::FetchError;
use crate::trend::classify::TrendState;
use crate::trend::reversal::ReversalEvent;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Per-bar columns the renderer charts directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartColumns {
    pub dates: Vec<NaiveDate>,
    pub close: Vec<f64>,
    /// The classifier's medium-term SMA, min-period policy (no warm-up gap).
    pub sma: Vec<f64>,
    pub alpha_pct: Vec<f64>,
    pub volume_millions: Vec<f64>,
}

/// Everything the presentation layer needs for one processed symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolRecord {
    pub ticker: String,
    pub name: String,
    pub color: String,
    pub latest_close: f64,
    pub latest_return_pct: f64,
    pub latest_alpha_pct: f64,
    pub latest_rel_perf_pct: f64,
    pub trend: TrendState,
    pub trend_label: String,
    pub trend_color: String,
    /// Ordered, direction-alternating turning points.
    pub reversals: Vec<ReversalEvent>,
    /// Tail of closes for the card sparkline.
    pub spark_closes: Vec<f64>,
    pub chart: ChartColumns,
}

/// Why a symbol is absent from the result set.
#[derive(Debug, Error)]
pub enum SymbolError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("insufficient history: {bars} bars (need {required})")]
    InsufficientHistory { bars: usize, required: usize },

    #[error("pipeline deadline exceeded before processing")]
    DeadlineExceeded,
}

/// A skipped symbol and its typed reason. Logged, never fatal.
#[derive(Debug)]
pub struct SymbolFailure {
    pub ticker: String,
    pub error: SymbolError,
}

/// The full result of one pipeline run.
///
/// Failed symbols are simply absent from `records`; no partial or
/// placeholder entries are emitted for them.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub records: Vec<SymbolRecord>,
    pub failures: Vec<SymbolFailure>,
    /// False when the benchmark could not be resolved and every record's
    /// relative metrics degraded to zero.
    pub benchmark_available: bool,
}
