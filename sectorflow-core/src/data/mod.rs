//! Data retrieval and caching.

pub mod cache;
pub mod source;
pub mod yahoo;

pub use cache::{CacheLookup, CacheMeta, CachePolicy, MissReason, SeriesCache, StoreError};
pub use source::{BarInterval, FetchError, MarketDataSource};
pub use yahoo::YahooChartSource;
