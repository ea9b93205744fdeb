//! Price series handling and chronological partitioning

use crate::error::{ForecastError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Minimum number of observations required for a meaningful fit
pub const MIN_OBSERVATIONS: usize = 30;

/// Chronologically ordered sequence of (timestamp, closing price) pairs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    timestamps: Vec<DateTime<Utc>>,
    closes: Vec<f64>,
}

impl PriceSeries {
    /// Create a new price series from parallel timestamp and close vectors.
    ///
    /// Timestamps must be strictly increasing and prices must be
    /// non-negative finite numbers.
    pub fn new(timestamps: Vec<DateTime<Utc>>, closes: Vec<f64>) -> Result<Self> {
        if timestamps.len() != closes.len() {
            return Err(ForecastError::DataError(format!(
                "timestamp count ({}) does not match price count ({})",
                timestamps.len(),
                closes.len()
            )));
        }

        for pair in timestamps.windows(2) {
            if pair[1] <= pair[0] {
                return Err(ForecastError::DataError(format!(
                    "timestamps must be strictly increasing, found {} after {}",
                    pair[1], pair[0]
                )));
            }
        }

        for &price in &closes {
            if !price.is_finite() || price < 0.0 {
                return Err(ForecastError::DataError(format!(
                    "prices must be non-negative finite numbers, found {}",
                    price
                )));
            }
        }

        Ok(Self { timestamps, closes })
    }

    /// Get the timestamps
    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    /// Get the closing prices
    pub fn closes(&self) -> &[f64] {
        &self.closes
    }

    /// Get the last observed timestamp, if any
    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamps.last().copied()
    }

    /// Check if the series is empty
    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }

    /// Get the length of the series
    pub fn len(&self) -> usize {
        self.closes.len()
    }

    /// Get a sub-series covering `[start, end)`
    pub fn slice(&self, start: usize, end: usize) -> Result<Self> {
        if start > end || end > self.len() {
            return Err(ForecastError::DataError(format!(
                "invalid slice bounds {}..{} for series of length {}",
                start,
                end,
                self.len()
            )));
        }

        Ok(Self {
            timestamps: self.timestamps[start..end].to_vec(),
            closes: self.closes[start..end].to_vec(),
        })
    }

    /// Calculate the mean of the closing prices
    pub fn mean(&self) -> Result<f64> {
        if self.is_empty() {
            return Err(ForecastError::DataError(
                "no closing prices available".to_string(),
            ));
        }

        Ok(self.closes.as_slice().mean())
    }

    /// Calculate the standard deviation of the closing prices
    pub fn std_dev(&self) -> Result<f64> {
        if self.is_empty() {
            return Err(ForecastError::DataError(
                "no closing prices available".to_string(),
            ));
        }

        Ok(self.closes.as_slice().population_std_dev())
    }

    /// Split the series into a training prefix and a holdout suffix.
    ///
    /// The split index is `floor(len * train_fraction)`, computed by
    /// position rather than calendar arithmetic so irregular trading
    /// calendars split the same way as regular ones. The same input always
    /// produces the same split.
    pub fn partition(&self, train_fraction: f64) -> Result<SplitDataset> {
        if !(train_fraction > 0.0 && train_fraction < 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "train_fraction must be in (0, 1), got {}",
                train_fraction
            )));
        }

        if self.len() < MIN_OBSERVATIONS {
            return Err(ForecastError::InsufficientData {
                needed: MIN_OBSERVATIONS,
                got: self.len(),
            });
        }

        let split = (self.len() as f64 * train_fraction).floor() as usize;
        if split == 0 || split == self.len() {
            return Err(ForecastError::InsufficientData {
                needed: MIN_OBSERVATIONS,
                got: self.len(),
            });
        }

        Ok(SplitDataset {
            train: self.slice(0, split)?,
            test: self.slice(split, self.len())?,
        })
    }
}

/// A price series split into a training prefix and a holdout suffix.
///
/// Invariant: `train.len() + test.len() == source.len()` and every test
/// timestamp is strictly greater than every train timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitDataset {
    train: PriceSeries,
    test: PriceSeries,
}

impl SplitDataset {
    /// Get the training segment
    pub fn train(&self) -> &PriceSeries {
        &self.train
    }

    /// Get the holdout segment
    pub fn test(&self) -> &PriceSeries {
        &self.test
    }
}
