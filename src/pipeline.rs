//! End-to-end forecasting pipeline
//!
//! Stages run strictly in order: fetch → partition → fit → backtest →
//! forecast → validate. The first failing stage short-circuits the run and
//! its reason is reported; the pipeline always returns a value and never a
//! half-built report. Each run owns its split and fitted model exclusively,
//! so concurrent runs for different tickers share nothing.

use crate::backtest::{self, BacktestResult};
use crate::data::SplitDataset;
use crate::error::{ForecastError, Result};
use crate::forecast::{self, Forecast};
use crate::models::arima::{search_order, ArimaModel, TrainedArimaModel};
use crate::models::{ArimaOrder, ForecastModel, TrainedForecastModel};
use crate::provider::{FetchRequest, HistoryProvider};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Configuration accepted by the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastConfig {
    train_fraction: f64,
    horizon: usize,
    order: Option<ArimaOrder>,
}

impl ForecastConfig {
    /// Create a validated configuration.
    ///
    /// `train_fraction` must lie in (0, 1), `horizon` must be positive, and
    /// `order` of `None` triggers the deterministic order search.
    pub fn new(train_fraction: f64, horizon: usize, order: Option<ArimaOrder>) -> Result<Self> {
        if !(train_fraction > 0.0 && train_fraction < 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "train_fraction must be in (0, 1), got {}",
                train_fraction
            )));
        }
        if horizon == 0 {
            return Err(ForecastError::InvalidParameter(
                "horizon must be a positive step count".to_string(),
            ));
        }

        Ok(Self {
            train_fraction,
            horizon,
            order,
        })
    }

    /// Fraction of the series assigned to the training window
    pub fn train_fraction(&self) -> f64 {
        self.train_fraction
    }

    /// Number of steps to forecast beyond the end of the series
    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// Fixed model order, or `None` for the order search
    pub fn order(&self) -> Option<ArimaOrder> {
        self.order
    }
}

impl Default for ForecastConfig {
    /// The dashboard's defaults: 80/20 split, 30-step forecast, order search
    fn default() -> Self {
        Self {
            train_fraction: 0.8,
            horizon: 30,
            order: None,
        }
    }
}

/// Why a pipeline run failed.
///
/// UI layers render the same "no forecast available" message for every
/// reason; the distinction is preserved for logging and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    /// Retrieval returned nothing
    NoData,
    /// Series too short to form a usable split
    InsufficientData,
    /// The model fit did not converge or the segment was degenerate
    FitFailed,
    /// Validation rejected negative or non-finite output values
    InvalidForecast,
}

impl FailureReason {
    fn from_error(err: &ForecastError) -> Self {
        match err {
            ForecastError::InsufficientData { .. } => Self::InsufficientData,
            ForecastError::FitFailed(_) => Self::FitFailed,
            ForecastError::InvalidForecast(_) => Self::InvalidForecast,
            // Retrieval transport errors surface to the UI as "no data".
            _ => Self::NoData,
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NoData => "no data",
            Self::InsufficientData => "insufficient data",
            Self::FitFailed => "model fit failed",
            Self::InvalidForecast => "invalid forecast",
        };
        write!(f, "{}", text)
    }
}

/// Everything a successful run produces for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastReport {
    split: SplitDataset,
    backtest: BacktestResult,
    forecast: Forecast,
}

impl ForecastReport {
    /// The train/test split the model was fitted and scored on
    pub fn split(&self) -> &SplitDataset {
        &self.split
    }

    /// Holdout predictions and accuracy scores
    pub fn backtest(&self) -> &BacktestResult {
        &self.backtest
    }

    /// Forecast beyond the end of the series
    pub fn forecast(&self) -> &Forecast {
        &self.forecast
    }

    /// Serialize the report to JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| ForecastError::DataError(format!("JSON serialization failed: {}", e)))
    }

    /// Deserialize a report from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| ForecastError::DataError(format!("JSON deserialization failed: {}", e)))
    }
}

/// Outcome of one pipeline run; exactly one variant is populated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PipelineResult {
    /// The run completed and validation accepted every output value
    Succeeded(ForecastReport),
    /// Some stage failed; the originating reason is preserved
    Failed(FailureReason),
}

impl PipelineResult {
    /// Check whether the run succeeded
    pub fn is_succeeded(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    /// Get the report if the run succeeded
    pub fn report(&self) -> Option<&ForecastReport> {
        match self {
            Self::Succeeded(report) => Some(report),
            Self::Failed(_) => None,
        }
    }

    /// Get the failure reason if the run failed
    pub fn failure(&self) -> Option<FailureReason> {
        match self {
            Self::Succeeded(_) => None,
            Self::Failed(reason) => Some(*reason),
        }
    }
}

/// Orchestrates retrieval, partitioning, fitting, backtesting, forecasting
/// and validation for one ticker at a time
#[derive(Debug)]
pub struct ForecastPipeline<P> {
    provider: P,
    config: ForecastConfig,
}

impl<P: HistoryProvider> ForecastPipeline<P> {
    /// Create a pipeline over a history provider
    pub fn new(provider: P, config: ForecastConfig) -> Self {
        Self { provider, config }
    }

    /// Get the pipeline configuration
    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Run the pipeline for one request.
    ///
    /// Always returns a result value; every failure is folded into
    /// [`PipelineResult::Failed`] with its reason.
    pub fn run(&self, request: &FetchRequest) -> PipelineResult {
        match self.try_run(request) {
            Ok(report) => PipelineResult::Succeeded(report),
            Err(err) => {
                let reason = FailureReason::from_error(&err);
                warn!("pipeline run for {} failed: {}", request.ticker, err);
                PipelineResult::Failed(reason)
            }
        }
    }

    fn try_run(&self, request: &FetchRequest) -> Result<ForecastReport> {
        debug!("fetching history for {}", request.ticker);
        let series = self.provider.fetch_history(request)?;
        if series.is_empty() {
            return Err(ForecastError::NoData);
        }

        debug!(
            "partitioning {} observations at fraction {}",
            series.len(),
            self.config.train_fraction
        );
        let split = series.partition(self.config.train_fraction)?;

        let model = self.fit(&split)?;
        debug!(
            "fitted {} on {} training observations",
            model.name(),
            split.train().len()
        );

        let backtest = backtest::evaluate(&model, split.test())?;
        debug!(
            "backtest over {} holdout points: r2={:.4}, mape={:.4}",
            split.test().len(),
            backtest.r2(),
            backtest.mape()
        );

        let forecast = forecast::horizon_forecast(&model, &series, self.config.horizon)?;

        validate(&backtest, &forecast)?;

        Ok(ForecastReport {
            split,
            backtest,
            forecast,
        })
    }

    fn fit(&self, split: &SplitDataset) -> Result<TrainedArimaModel> {
        match self.config.order {
            Some(order) => ArimaModel::from_order(order)?.train(split.train()),
            None => search_order(split.train()),
        }
    }
}

/// Reject any backtest prediction or forecast value that is negative or
/// non-finite. Negative prices are physically meaningless for this asset
/// class; reporting "no usable forecast" beats clamping to plausible-looking
/// numbers.
fn validate(backtest: &BacktestResult, forecast: &Forecast) -> Result<()> {
    let offending = backtest
        .predictions()
        .iter()
        .chain(forecast.values().iter())
        .find(|v| !v.is_finite() || **v < 0.0);

    if let Some(value) = offending {
        return Err(ForecastError::InvalidForecast(format!(
            "output contains the unusable price value {}",
            value
        )));
    }
    Ok(())
}
