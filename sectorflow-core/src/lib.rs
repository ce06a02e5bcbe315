//! SectorFlow core — bar retrieval and caching, indicator computation, trend
//! classification, and reversal detection.
//!
//! One pipeline pass per run: resolve the benchmark series, then for each
//! symbol in the universe cache-or-fetch its history, derive indicator
//! columns, classify the latest trend state, scan a smoothed price signal
//! for confirmed turning points, and collect a result record for the
//! external presentation layer.
//!
//! Failure policy: every connectivity and data-quality problem is recoverable
//! at the symbol level (retried, degraded to neutral, or skipped); only a
//! malformed configuration aborts a run.

pub mod config;
pub mod data;
pub mod domain;
pub mod indicators;
pub mod pipeline;
pub mod trend;
