//! Durable per-symbol series cache.
//!
//! Layout: `{cache_dir}/{SYMBOL}/bars.parquet` plus a `meta.json` sidecar
//! (format version, fetch time, date range, blake3 content hash).
//!
//! Writes are atomic whole-entry replacements (write to .tmp, rename into
//! place); entries are never merged incrementally. Reads apply a
//! multi-condition validity check: plain TTL is not enough here, because an
//! entry can be fresh by clock time yet structurally inadequate for the
//! long-window indicators downstream. Any read or deserialize problem
//! downgrades to a miss, never an error.

use super::source::BarInterval;
use crate::domain::{Bar, TimeSeries};
use chrono::{DateTime, NaiveDate, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Bump when the on-disk entry layout changes; older entries become misses.
pub const CACHE_FORMAT_VERSION: u32 = 1;

/// Metadata sidecar for a cached symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMeta {
    pub format_version: u32,
    pub symbol: String,
    pub interval: BarInterval,
    pub fetched_at: DateTime<Utc>,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub bar_count: usize,
    pub data_hash: String,
    pub source: String,
}

/// Validity thresholds applied on every load.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CachePolicy {
    /// Maximum entry age since fetch, in hours.
    pub max_age_hours: i64,
    /// Minimum bar count for the entry to be usable at all.
    pub min_bars: usize,
    /// The earliest bar must be at least this many days old, so the long
    /// indicator window is actually representable.
    pub min_coverage_days: i64,
    /// Bar count expected when the coverage span is met.
    pub min_long_bars: usize,
    /// Maximum allowed lag between the newest bar and "now", in days.
    pub max_quiet_days: i64,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            max_age_hours: 24 * 7,
            min_bars: 200,
            min_coverage_days: 1716, // ~4.7 years
            min_long_bars: 1100,
            max_quiet_days: 7,
        }
    }
}

/// Why a load came back empty. Logged, never raised.
#[derive(Debug)]
pub enum MissReason {
    NotFound,
    VersionMismatch { found: u32 },
    Expired { age_hours: i64 },
    TooFewBars { bars: usize, required: usize },
    ShortCoverage { days: i64, bars: usize },
    StaleContent { quiet_days: i64 },
    Corrupt(String),
}

impl fmt::Display for MissReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissReason::NotFound => write!(f, "no cached entry"),
            MissReason::VersionMismatch { found } => {
                write!(f, "format version {found} != {CACHE_FORMAT_VERSION}")
            }
            MissReason::Expired { age_hours } => write!(f, "entry is {age_hours}h old"),
            MissReason::TooFewBars { bars, required } => {
                write!(f, "only {bars} bars (need {required})")
            }
            MissReason::ShortCoverage { days, bars } => {
                write!(f, "covers only {days} days / {bars} bars")
            }
            MissReason::StaleContent { quiet_days } => {
                write!(f, "newest bar is {quiet_days} days old")
            }
            MissReason::Corrupt(detail) => write!(f, "unreadable entry: {detail}"),
        }
    }
}

/// Result of a cache read.
#[derive(Debug)]
pub enum CacheLookup {
    Hit(TimeSeries),
    Miss(MissReason),
}

/// Errors on the store path. Load never errors, it misses.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("refusing to cache an empty series for {0}")]
    EmptySeries(String),

    #[error("cache I/O error: {0}")]
    Io(String),

    #[error("parquet error: {0}")]
    Parquet(String),

    #[error("metadata error: {0}")]
    Meta(String),
}

/// The per-symbol series cache.
pub struct SeriesCache {
    cache_dir: PathBuf,
    policy: CachePolicy,
}

impl SeriesCache {
    pub fn new(cache_dir: impl Into<PathBuf>, policy: CachePolicy) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            policy,
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn symbol_dir(&self, symbol: &str) -> PathBuf {
        self.cache_dir.join(symbol)
    }

    fn bars_path(&self, symbol: &str) -> PathBuf {
        self.symbol_dir(symbol).join("bars.parquet")
    }

    fn meta_path(&self, symbol: &str) -> PathBuf {
        self.symbol_dir(symbol).join("meta.json")
    }

    /// Replace the whole entry for a symbol with `series`, stamped now.
    pub fn store(
        &self,
        series: &TimeSeries,
        interval: BarInterval,
        source: &str,
    ) -> Result<(), StoreError> {
        self.store_at(series, interval, source, Utc::now())
    }

    /// Replace the whole entry with an explicit fetch timestamp.
    pub fn store_at(
        &self,
        series: &TimeSeries,
        interval: BarInterval,
        source: &str,
        fetched_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let symbol = &series.symbol;
        let (first, last) = match (series.first_date(), series.last_date()) {
            (Some(f), Some(l)) => (f, l),
            _ => return Err(StoreError::EmptySeries(symbol.clone())),
        };

        let sym_dir = self.symbol_dir(symbol);
        fs::create_dir_all(&sym_dir)
            .map_err(|e| StoreError::Io(format!("create {}: {e}", sym_dir.display())))?;

        // Bars first, then the sidecar: a crash in between leaves the old
        // sidecar pointing at mismatched data, which the hash check turns
        // into a miss on the next load.
        let df = series_to_dataframe(&series.bars)?;
        let path = self.bars_path(symbol);
        let tmp = path.with_extension("parquet.tmp");
        write_parquet(&df, &tmp)?;
        fs::rename(&tmp, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            StoreError::Io(format!("atomic rename failed: {e}"))
        })?;

        let meta = CacheMeta {
            format_version: CACHE_FORMAT_VERSION,
            symbol: symbol.clone(),
            interval,
            fetched_at,
            first_date: first,
            last_date: last,
            bar_count: series.len(),
            data_hash: hash_bars(&series.bars)?,
            source: source.to_string(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| StoreError::Meta(format!("serialize: {e}")))?;
        let meta_path = self.meta_path(symbol);
        let meta_tmp = meta_path.with_extension("json.tmp");
        fs::write(&meta_tmp, meta_json).map_err(|e| StoreError::Io(format!("meta write: {e}")))?;
        fs::rename(&meta_tmp, &meta_path).map_err(|e| {
            let _ = fs::remove_file(&meta_tmp);
            StoreError::Io(format!("meta rename failed: {e}"))
        })?;

        Ok(())
    }

    /// Load a symbol's entry, validated against the policy as of now.
    pub fn load(&self, symbol: &str) -> CacheLookup {
        self.load_at(symbol, Utc::now())
    }

    /// Load with an explicit "now" (the clock all validity checks use).
    pub fn load_at(&self, symbol: &str, now: DateTime<Utc>) -> CacheLookup {
        let meta = match self.read_meta(symbol) {
            Ok(Some(meta)) => meta,
            Ok(None) => return CacheLookup::Miss(MissReason::NotFound),
            Err(detail) => return CacheLookup::Miss(MissReason::Corrupt(detail)),
        };

        if meta.format_version != CACHE_FORMAT_VERSION {
            return CacheLookup::Miss(MissReason::VersionMismatch {
                found: meta.format_version,
            });
        }

        let age_hours = (now - meta.fetched_at).num_hours();
        if age_hours > self.policy.max_age_hours {
            return CacheLookup::Miss(MissReason::Expired { age_hours });
        }

        let bars = match self.read_bars(symbol) {
            Ok(bars) => bars,
            Err(detail) => return CacheLookup::Miss(MissReason::Corrupt(detail)),
        };

        match hash_bars(&bars) {
            Ok(hash) if hash == meta.data_hash => {}
            Ok(_) => {
                return CacheLookup::Miss(MissReason::Corrupt("content hash mismatch".into()))
            }
            Err(e) => return CacheLookup::Miss(MissReason::Corrupt(e.to_string())),
        }

        if bars.len() < self.policy.min_bars {
            return CacheLookup::Miss(MissReason::TooFewBars {
                bars: bars.len(),
                required: self.policy.min_bars,
            });
        }

        let today = now.date_naive();
        let coverage_days = (today - bars[0].date).num_days();
        if coverage_days < self.policy.min_coverage_days || bars.len() < self.policy.min_long_bars {
            return CacheLookup::Miss(MissReason::ShortCoverage {
                days: coverage_days,
                bars: bars.len(),
            });
        }

        let quiet_days = (today - bars[bars.len() - 1].date).num_days();
        if quiet_days > self.policy.max_quiet_days {
            return CacheLookup::Miss(MissReason::StaleContent { quiet_days });
        }

        CacheLookup::Hit(TimeSeries {
            symbol: symbol.to_string(),
            bars,
        })
    }

    fn read_meta(&self, symbol: &str) -> Result<Option<CacheMeta>, String> {
        let path = self.meta_path(symbol);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).map_err(|e| format!("meta read: {e}"))?;
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| format!("meta parse: {e}"))
    }

    fn read_bars(&self, symbol: &str) -> Result<Vec<Bar>, String> {
        let path = self.bars_path(symbol);
        let file = fs::File::open(&path).map_err(|e| format!("open: {e}"))?;
        let df = ParquetReader::new(file)
            .finish()
            .map_err(|e| format!("parquet read: {e}"))?;

        if df.height() == 0 {
            return Err("empty parquet file".into());
        }
        for col_name in ["date", "open", "high", "low", "close", "volume"] {
            if df.column(col_name).is_err() {
                return Err(format!("missing column '{col_name}'"));
            }
        }

        dataframe_to_bars(&df)
    }
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

fn hash_bars(bars: &[Bar]) -> Result<String, StoreError> {
    let bytes = serde_json::to_vec(bars)
        .map_err(|e| StoreError::Meta(format!("hash serialization: {e}")))?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

/// Convert bars to a Polars DataFrame.
fn series_to_dataframe(bars: &[Bar]) -> Result<DataFrame, StoreError> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
    let dates: Vec<i32> = bars.iter().map(|b| (b.date - epoch).num_days() as i32).collect();
    let opens: Vec<f64> = bars.iter().map(|b| b.open).collect();
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let volumes: Vec<u64> = bars.iter().map(|b| b.volume).collect();

    DataFrame::new(vec![
        Column::new("date".into(), dates)
            .cast(&DataType::Date)
            .map_err(|e| StoreError::Parquet(format!("date cast: {e}")))?,
        Column::new("open".into(), opens),
        Column::new("high".into(), highs),
        Column::new("low".into(), lows),
        Column::new("close".into(), closes),
        Column::new("volume".into(), volumes),
    ])
    .map_err(|e| StoreError::Parquet(format!("dataframe creation: {e}")))
}

/// Write a DataFrame to a Parquet file.
fn write_parquet(df: &DataFrame, path: &Path) -> Result<(), StoreError> {
    let file =
        fs::File::create(path).map_err(|e| StoreError::Io(format!("create file: {e}")))?;
    ParquetWriter::new(file)
        .finish(&mut df.clone())
        .map_err(|e| StoreError::Parquet(format!("write parquet: {e}")))?;
    Ok(())
}

/// Convert a DataFrame back to bars.
fn dataframe_to_bars(df: &DataFrame) -> Result<Vec<Bar>, String> {
    let date_ca = df
        .column("date")
        .and_then(|c| c.date().cloned())
        .map_err(|e| format!("date column: {e}"))?;
    let open_ca = df
        .column("open")
        .and_then(|c| c.f64().cloned())
        .map_err(|e| format!("open column: {e}"))?;
    let high_ca = df
        .column("high")
        .and_then(|c| c.f64().cloned())
        .map_err(|e| format!("high column: {e}"))?;
    let low_ca = df
        .column("low")
        .and_then(|c| c.f64().cloned())
        .map_err(|e| format!("low column: {e}"))?;
    let close_ca = df
        .column("close")
        .and_then(|c| c.f64().cloned())
        .map_err(|e| format!("close column: {e}"))?;
    let vol_ca = df
        .column("volume")
        .and_then(|c| c.u64().cloned())
        .map_err(|e| format!("volume column: {e}"))?;

    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
    let mut bars = Vec::with_capacity(df.height());

    for i in 0..df.height() {
        let date_days = date_ca
            .get(i)
            .ok_or_else(|| format!("null date at row {i}"))?;
        bars.push(Bar {
            date: epoch + chrono::Duration::days(date_days as i64),
            open: open_ca.get(i).unwrap_or(f64::NAN),
            high: high_ca.get(i).unwrap_or(f64::NAN),
            low: low_ca.get(i).unwrap_or(f64::NAN),
            close: close_ca.get(i).unwrap_or(f64::NAN),
            volume: vol_ca.get(i).unwrap_or(0),
        });
    }

    Ok(bars)
}
