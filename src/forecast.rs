//! Out-of-sample forecasting beyond the end of a series

use crate::data::PriceSeries;
use crate::error::{ForecastError, Result};
use crate::models::TrainedForecastModel;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Forecast points strictly beyond the last observed timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    timestamps: Vec<DateTime<Utc>>,
    values: Vec<f64>,
}

impl Forecast {
    /// Get the forecast timestamps
    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    /// Get the forecast values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of forecast points
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the forecast is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over (timestamp, value) pairs
    pub fn points(&self) -> impl Iterator<Item = (DateTime<Utc>, f64)> + '_ {
        self.timestamps
            .iter()
            .copied()
            .zip(self.values.iter().copied())
    }
}

/// Infer the dominant spacing between observations.
///
/// The median gap is used so daily data with weekend holes still continues
/// at one day rather than at a weekend-sized jump.
pub fn infer_step(series: &PriceSeries) -> Result<Duration> {
    let timestamps = series.timestamps();
    if timestamps.len() < 2 {
        return Err(ForecastError::DataError(
            "cannot infer observation spacing from fewer than two points".to_string(),
        ));
    }

    let mut gaps: Vec<Duration> = timestamps.windows(2).map(|w| w[1] - w[0]).collect();
    gaps.sort();
    Ok(gaps[gaps.len() / 2])
}

/// Produce a fixed-length forecast beyond the end of the series.
///
/// Reuses the model fitted for the backtest rather than refitting on the
/// full series, so the displayed accuracy and the displayed forecast come
/// from one parameter set. Timestamps continue the series' observed
/// spacing with no gap and no overlap with history.
pub fn horizon_forecast<M: TrainedForecastModel>(
    model: &M,
    series: &PriceSeries,
    horizon: usize,
) -> Result<Forecast> {
    if horizon == 0 {
        return Err(ForecastError::InvalidParameter(
            "horizon must be a positive step count".to_string(),
        ));
    }

    let last = series.last_timestamp().ok_or(ForecastError::NoData)?;
    let step = infer_step(series)?;

    let values = model.forecast_values(horizon)?;
    if values.len() != horizon {
        return Err(ForecastError::InvalidForecast(format!(
            "model produced {} values for a horizon of {}",
            values.len(),
            horizon
        )));
    }

    let timestamps = (1..=horizon as i32).map(|k| last + step * k).collect();

    Ok(Forecast { timestamps, values })
}
