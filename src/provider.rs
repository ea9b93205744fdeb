//! Market-data retrieval collaborators
//!
//! The pipeline never performs network or file I/O itself; it asks a
//! [`HistoryProvider`] for the series. A caching layer can be injected in
//! front of any provider with [`CachedHistoryProvider`]; the time-to-live
//! policy lives in the cache, not in the pipeline.

use crate::data::PriceSeries;
use crate::error::{ForecastError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use log::debug;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Identifies one history lookup: ticker symbol plus period and interval
/// selectors in the provider's own vocabulary (e.g. "2y", "1d").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Ticker symbol, e.g. "RELIANCE.NS"
    pub ticker: String,
    /// History period selector
    pub period: String,
    /// Sampling interval selector
    pub interval: String,
}

impl FetchRequest {
    /// Create a new fetch request
    pub fn new(
        ticker: impl Into<String>,
        period: impl Into<String>,
        interval: impl Into<String>,
    ) -> Self {
        Self {
            ticker: ticker.into(),
            period: period.into(),
            interval: interval.into(),
        }
    }

    /// Cache key identifying this request
    pub fn cache_key(&self) -> String {
        format!("{}:{}:{}", self.ticker, self.period, self.interval)
    }
}

/// External collaborator that retrieves historical prices for a ticker
pub trait HistoryProvider {
    /// Fetch the closing-price history for a request.
    ///
    /// An unavailable ticker may be reported either as an error or as an
    /// empty series; the pipeline treats both as "no data".
    fn fetch_history(&self, request: &FetchRequest) -> Result<PriceSeries>;
}

/// History provider backed by per-ticker CSV files in a directory.
///
/// Expects `<dir>/<ticker>.csv` with a header row naming a date/time column
/// and a close/price column.
#[derive(Debug, Clone)]
pub struct CsvHistoryProvider {
    dir: PathBuf,
}

impl CsvHistoryProvider {
    /// Create a provider reading from the given directory
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Load a price series from a single CSV file
    pub fn load_csv(path: impl AsRef<Path>) -> Result<PriceSeries> {
        let mut reader = csv::Reader::from_path(path.as_ref())?;

        let headers = reader.headers()?.clone();
        let date_idx = Self::find_column(&headers, &["date", "time", "timestamp"])?;
        let close_idx = Self::find_column(&headers, &["close", "price"])?;

        let mut timestamps = Vec::new();
        let mut closes = Vec::new();

        for record in reader.records() {
            let record = record?;
            let date_field = record.get(date_idx).ok_or_else(|| {
                ForecastError::DataError("row is missing the date column".to_string())
            })?;
            let close_field = record.get(close_idx).ok_or_else(|| {
                ForecastError::DataError("row is missing the close column".to_string())
            })?;

            timestamps.push(Self::parse_timestamp(date_field)?);
            closes.push(close_field.trim().parse::<f64>().map_err(|_| {
                ForecastError::DataError(format!("invalid close price '{}'", close_field))
            })?);
        }

        PriceSeries::new(timestamps, closes)
    }

    fn find_column(headers: &csv::StringRecord, candidates: &[&str]) -> Result<usize> {
        for candidate in candidates {
            let found = headers
                .iter()
                .position(|h| h.to_lowercase().contains(candidate));
            if let Some(idx) = found {
                return Ok(idx);
            }
        }

        Err(ForecastError::DataError(format!(
            "no column matching any of {:?} in header {:?}",
            candidates, headers
        )))
    }

    fn parse_timestamp(field: &str) -> Result<DateTime<Utc>> {
        let field = field.trim();

        if let Ok(ts) = field.parse::<DateTime<Utc>>() {
            return Ok(ts);
        }

        let date = NaiveDate::parse_from_str(field, "%Y-%m-%d").map_err(|_| {
            ForecastError::DataError(format!("unparseable date '{}'", field))
        })?;
        let naive = date.and_hms_opt(0, 0, 0).ok_or_else(|| {
            ForecastError::DataError(format!("unrepresentable date '{}'", field))
        })?;

        Ok(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
    }
}

impl HistoryProvider for CsvHistoryProvider {
    fn fetch_history(&self, request: &FetchRequest) -> Result<PriceSeries> {
        let path = self.dir.join(format!("{}.csv", request.ticker));
        if !path.exists() {
            return Err(ForecastError::NoData);
        }

        debug!("loading history for {} from {:?}", request.ticker, path);
        Self::load_csv(path)
    }
}

/// Injected caching collaborator for fetched series.
///
/// Modeled as `get_or_compute` so the pipeline stays free of hidden shared
/// mutability; implementations own whatever interior state they need.
pub trait SeriesCache {
    /// Return the cached series for `key`, computing and storing it on a miss
    fn get_or_compute(
        &self,
        key: &str,
        compute: &mut dyn FnMut() -> Result<PriceSeries>,
    ) -> Result<PriceSeries>;
}

/// Pass-through cache that always recomputes
#[derive(Debug, Clone, Default)]
pub struct NoCache;

impl SeriesCache for NoCache {
    fn get_or_compute(
        &self,
        _key: &str,
        compute: &mut dyn FnMut() -> Result<PriceSeries>,
    ) -> Result<PriceSeries> {
        compute()
    }
}

/// In-memory cache with a fixed time-to-live per entry
#[derive(Debug)]
pub struct MemoryCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, PriceSeries)>>,
}

impl MemoryCache {
    /// Create a cache whose entries expire after `ttl`
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl SeriesCache for MemoryCache {
    fn get_or_compute(
        &self,
        key: &str,
        compute: &mut dyn FnMut() -> Result<PriceSeries>,
    ) -> Result<PriceSeries> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| ForecastError::DataError("cache lock poisoned".to_string()))?;

        if let Some((stored_at, series)) = entries.get(key) {
            if stored_at.elapsed() < self.ttl {
                debug!("cache hit for {}", key);
                return Ok(series.clone());
            }
        }

        let series = compute()?;
        entries.insert(key.to_string(), (Instant::now(), series.clone()));
        Ok(series)
    }
}

/// History provider that consults a cache before its inner provider
#[derive(Debug)]
pub struct CachedHistoryProvider<P, C> {
    inner: P,
    cache: C,
}

impl<P: HistoryProvider, C: SeriesCache> CachedHistoryProvider<P, C> {
    /// Wrap a provider with a cache
    pub fn new(inner: P, cache: C) -> Self {
        Self { inner, cache }
    }
}

impl<P: HistoryProvider, C: SeriesCache> HistoryProvider for CachedHistoryProvider<P, C> {
    fn fetch_history(&self, request: &FetchRequest) -> Result<PriceSeries> {
        let mut compute = || self.inner.fetch_history(request);
        self.cache.get_or_compute(&request.cache_key(), &mut compute)
    }
}
