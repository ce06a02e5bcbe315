//! Trend classification and reversal detection.

pub mod classify;
pub mod reversal;

pub use classify::{classify, classify_latest, TrendState};
pub use reversal::{MagnitudeGate, ReversalDetector, ReversalEvent, ReversalKind};
