//! Yahoo Finance chart-endpoint source.
//!
//! Fetches OHLCV bars from the v8 chart API. Handles retries with scaled,
//! jittered delays, client-identity rotation, and response parsing. The
//! endpoint has no official contract and is subject to unannounced format
//! changes, so every parse problem is a retryable attempt failure rather
//! than a hard error.

use super::source::{BarInterval, FetchError, MarketDataSource};
use crate::domain::{Bar, TimeSeries};
use chrono::NaiveDate;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Browser identities rotated across attempts to reduce throttling.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/129.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Linux; Android 10; K) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/129.0.0.0 Mobile Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0",
];

/// Retry and timeout settings for the chart source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Total attempts before giving up on a symbol.
    pub max_attempts: u32,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Delay before the second attempt, in seconds.
    pub base_delay_secs: f64,
    /// Additional delay per subsequent attempt, in seconds.
    pub delay_increment_secs: f64,
    /// Add up to one extra second of random delay per retry.
    pub jitter: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            timeout_secs: 25,
            base_delay_secs: 4.0,
            delay_increment_secs: 3.0,
            jitter: true,
        }
    }
}

// ── Chart API response shape ────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

/// Yahoo Finance chart-endpoint source.
pub struct YahooChartSource {
    client: reqwest::blocking::Client,
    config: FetchConfig,
}

impl YahooChartSource {
    pub fn new(config: FetchConfig) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("failed to build HTTP client");

        Self { client, config }
    }

    /// Build the chart API URL for a symbol, date range, and interval.
    fn chart_url(symbol: &str, start: NaiveDate, end: NaiveDate, interval: BarInterval) -> String {
        let start_ts = start.and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp();
        let end_ts = end.and_hms_opt(23, 59, 59).unwrap().and_utc().timestamp();
        let interval = interval.as_query();
        format!(
            "https://query2.finance.yahoo.com/v8/finance/chart/{symbol}\
             ?period1={start_ts}&period2={end_ts}&interval={interval}\
             &includePrePost=false&events=history&includeAdjustedClose=true"
        )
    }

    /// Parse the chart API response into bars.
    ///
    /// A response is usable only if it has a non-empty timestamp array and a
    /// close array of the same length. The adjusted-close array is preferred
    /// over raw close when its length matches (it reflects splits/dividends).
    fn parse_response(symbol: &str, resp: ChartResponse) -> Result<Vec<Bar>, FetchError> {
        let bad = |detail: String| FetchError::BadPayload {
            symbol: symbol.to_string(),
            detail,
        };

        let result = match resp.chart.result {
            Some(r) => r,
            None => {
                let detail = resp
                    .chart
                    .error
                    .map(|e| format!("{}: {}", e.code, e.description))
                    .unwrap_or_else(|| "empty result with no error".into());
                return Err(bad(detail));
            }
        };

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| bad("result array is empty".into()))?;

        let timestamps = match data.timestamp {
            Some(ts) if !ts.is_empty() => ts,
            _ => {
                return Err(FetchError::NoData {
                    symbol: symbol.to_string(),
                })
            }
        };

        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| bad("no quote data".into()))?;

        if quote.close.len() != timestamps.len() {
            return Err(bad(format!(
                "close array length {} does not match {} timestamps",
                quote.close.len(),
                timestamps.len()
            )));
        }

        // Prefer the adjusted close when it aligns with the timestamps.
        let adj_closes = data
            .indicators
            .adjclose
            .and_then(|v| v.into_iter().next())
            .map(|a| a.adjclose)
            .filter(|adj| adj.len() == timestamps.len());

        let mut bars = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            let date = chrono::DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.naive_utc().date())
                .ok_or_else(|| bad(format!("invalid timestamp: {ts}")))?;

            let open = quote.open.get(i).copied().flatten();
            let high = quote.high.get(i).copied().flatten();
            let low = quote.low.get(i).copied().flatten();
            let raw_close = quote.close.get(i).copied().flatten();
            let volume = quote.volume.get(i).copied().flatten();
            let close = adj_closes
                .as_ref()
                .and_then(|v| v.get(i).copied().flatten())
                .or(raw_close);

            // Drop all-null rows (holidays, half-days reported as voids).
            if open.is_none() && high.is_none() && low.is_none() && raw_close.is_none() {
                continue;
            }

            bars.push(Bar {
                date,
                open: open.unwrap_or(f64::NAN),
                high: high.unwrap_or(f64::NAN),
                low: low.unwrap_or(f64::NAN),
                close: close.unwrap_or(f64::NAN),
                volume: volume.unwrap_or(0),
            });
        }

        if bars.is_empty() {
            return Err(FetchError::NoData {
                symbol: symbol.to_string(),
            });
        }

        Ok(bars)
    }

    /// Run one attempt end to end: request, status check, parse.
    fn attempt(&self, url: &str, symbol: &str) -> Result<Vec<Bar>, FetchError> {
        let ua = {
            let mut rng = rand::thread_rng();
            *USER_AGENTS.choose(&mut rng).expect("UA pool is non-empty")
        };

        let resp = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, ua)
            .send()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                symbol: symbol.to_string(),
                status: status.as_u16(),
            });
        }

        let chart: ChartResponse = resp.json().map_err(|e| FetchError::BadPayload {
            symbol: symbol.to_string(),
            detail: format!("JSON decode: {e}"),
        })?;

        Self::parse_response(symbol, chart)
    }

    /// Delay before retry `attempt` (1-based; no delay before the first try).
    fn retry_delay(&self, attempt: u32) -> Duration {
        let mut secs =
            self.config.base_delay_secs + self.config.delay_increment_secs * (attempt - 1) as f64;
        if self.config.jitter {
            secs += rand::thread_rng().gen_range(0.0..1.0);
        }
        Duration::from_secs_f64(secs.max(0.0))
    }
}

impl MarketDataSource for YahooChartSource {
    fn name(&self) -> &str {
        "yahoo_chart"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        interval: BarInterval,
    ) -> Result<TimeSeries, FetchError> {
        let url = Self::chart_url(symbol, start, end, interval);

        for attempt in 1..=self.config.max_attempts {
            if attempt > 1 {
                std::thread::sleep(self.retry_delay(attempt - 1));
            }

            match self.attempt(&url, symbol) {
                Ok(bars) => {
                    tracing::debug!(symbol, bars = bars.len(), attempt, "fetch succeeded");
                    return Ok(TimeSeries::from_unordered(symbol, bars));
                }
                Err(e) => {
                    tracing::debug!(symbol, attempt, error = %e, "fetch attempt failed");
                }
            }
        }

        Err(FetchError::RetriesExhausted {
            symbol: symbol.to_string(),
            attempts: self.config.max_attempts,
        })
    }
}
