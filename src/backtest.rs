//! Holdout evaluation of fitted models

use crate::data::PriceSeries;
use crate::error::Result;
use crate::metrics;
use crate::models::TrainedForecastModel;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Predictions aligned with the holdout segment plus accuracy scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    predictions: Vec<f64>,
    r2: f64,
    mape: f64,
    mape_excluded: usize,
}

impl BacktestResult {
    /// Predictions, one per holdout timestamp in order
    pub fn predictions(&self) -> &[f64] {
        &self.predictions
    }

    /// Coefficient of determination over the holdout segment
    pub fn r2(&self) -> f64 {
        self.r2
    }

    /// Mean absolute percentage error over the holdout segment, as a fraction
    pub fn mape(&self) -> f64 {
        self.mape
    }

    /// Holdout points excluded from MAPE because the actual was zero
    pub fn mape_excluded_points(&self) -> usize {
        self.mape_excluded
    }
}

impl fmt::Display for BacktestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Backtest Accuracy:")?;
        writeln!(f, "  R²:   {:.4}", self.r2)?;
        writeln!(f, "  MAPE: {:.4}", self.mape)?;
        Ok(())
    }
}

/// Score a fitted model against the holdout segment.
///
/// The model is rolled forward exactly `test.len()` steps from the end of
/// its training data; holdout actuals are only consulted for scoring, never
/// for prediction.
pub fn evaluate<M: TrainedForecastModel>(model: &M, test: &PriceSeries) -> Result<BacktestResult> {
    let predictions = model.forecast_values(test.len())?;
    let actual = test.closes();

    let r2 = metrics::r_squared(actual, &predictions)?;
    let mape = metrics::mape(actual, &predictions)?;

    Ok(BacktestResult {
        predictions,
        r2,
        mape: mape.value,
        mape_excluded: mape.excluded,
    })
}
