//! ARIMA models fitted by conditional least squares
//!
//! The model operates on the raw price scale: the series is differenced
//! `d` times, AR/MA coefficients are estimated by minimizing the
//! conditional sum of squares around the differenced-series mean, and
//! forecasts are integrated back through the differencing. Estimation is
//! fully deterministic for identical input.

use crate::data::PriceSeries;
use crate::error::{ForecastError, Result};
use crate::models::optim::{nelder_mead, NelderMeadConfig};
use crate::models::{ArimaOrder, ForecastModel, TrainedForecastModel};
use log::{debug, warn};
use statrs::statistics::Statistics;

// Coefficient bound keeping the fitted process stationary/invertible.
const COEFFICIENT_BOUND: f64 = 0.99;

// Variance below this is treated as a degenerate (constant) segment.
const DEGENERATE_VARIANCE: f64 = 1e-12;

/// ARIMA model specification, ready to be fitted
#[derive(Debug, Clone)]
pub struct ArimaModel {
    name: String,
    order: ArimaOrder,
}

/// Fitted ARIMA model, valid for the duration of one pipeline run
#[derive(Debug, Clone)]
pub struct TrainedArimaModel {
    name: String,
    order: ArimaOrder,
    ar_coefficients: Vec<f64>,
    ma_coefficients: Vec<f64>,
    intercept: f64,
    original: Vec<f64>,
    differenced: Vec<f64>,
    residuals: Vec<f64>,
    residual_variance: f64,
    aic: f64,
}

impl ArimaModel {
    /// Create a new ARIMA model with a fixed order
    pub fn new(p: usize, d: usize, q: usize) -> Result<Self> {
        if p > 5 || q > 5 || d > 2 {
            return Err(ForecastError::InvalidParameter(format!(
                "ARIMA order ({},{},{}) outside the supported range (p,q <= 5, d <= 2)",
                p, d, q
            )));
        }

        let order = ArimaOrder::new(p, d, q);
        Ok(Self {
            name: order.to_string(),
            order,
        })
    }

    /// Create a model from an existing order specification
    pub fn from_order(order: ArimaOrder) -> Result<Self> {
        Self::new(order.p, order.d, order.q)
    }

    /// Get the order specification
    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    /// Conditional sum of squares for the given parameters.
    ///
    /// Residuals before `max(p, q)` are conditioned to zero, which is the
    /// usual CSS treatment of the warm-up region.
    fn conditional_sum_of_squares(
        diff_series: &[f64],
        p: usize,
        q: usize,
        ar: &[f64],
        ma: &[f64],
        intercept: f64,
    ) -> f64 {
        let n = diff_series.len();
        let start = p.max(q);
        if n <= start {
            return f64::MAX;
        }

        let mut residuals = vec![0.0; n];
        let mut css = 0.0;

        for t in start..n {
            let mut pred = intercept;
            for i in 0..p {
                pred += ar[i] * (diff_series[t - 1 - i] - intercept);
            }
            for i in 0..q {
                pred += ma[i] * residuals[t - 1 - i];
            }

            let error = diff_series[t] - pred;
            residuals[t] = error;
            css += error * error;
        }

        if css.is_finite() {
            css
        } else {
            f64::MAX
        }
    }

    /// Estimate AR/MA coefficients with the intercept fixed to the mean of
    /// the differenced series.
    ///
    /// With near-cancelling AR and MA roots the CSS surface is almost flat
    /// in the intercept, which leaves it unidentified if it is optimized
    /// jointly; pinning it to the sample mean keeps the long-run forecast
    /// anchored to the observed drift.
    fn estimate(&self, diff_series: &[f64]) -> Result<(Vec<f64>, Vec<f64>, f64)> {
        let p = self.order.p;
        let q = self.order.q;
        let mean = diff_series.mean();

        if p == 0 && q == 0 {
            return Ok((Vec::new(), Vec::new(), mean));
        }

        let mut initial = vec![0.0; p + q];
        for i in 0..p {
            initial[i] = 0.1 / (i + 1) as f64;
        }
        for i in 0..q {
            initial[p + i] = 0.1 / (i + 1) as f64;
        }

        let bounds = vec![(-COEFFICIENT_BOUND, COEFFICIENT_BOUND); p + q];

        let config = NelderMeadConfig::default();
        let fit = nelder_mead(
            |params| {
                let ar = &params[..p];
                let ma = &params[p..];
                Self::conditional_sum_of_squares(diff_series, p, q, ar, ma, mean)
            },
            &initial,
            Some(&bounds),
            &config,
        );

        if !fit.optimal_value.is_finite()
            || fit.optimal_value == f64::MAX
            || fit.optimal_point.iter().any(|v| !v.is_finite())
        {
            return Err(ForecastError::FitFailed(format!(
                "{}: conditional least squares did not produce finite parameters",
                self.name
            )));
        }

        if !fit.converged {
            warn!(
                "{}: optimizer hit the iteration cap ({} iterations)",
                self.name, fit.iterations
            );
        }

        let ar = fit.optimal_point[..p].to_vec();
        let ma = fit.optimal_point[p..].to_vec();
        Ok((ar, ma, mean))
    }
}

impl ForecastModel for ArimaModel {
    type Trained = TrainedArimaModel;

    fn train(&self, data: &PriceSeries) -> Result<TrainedArimaModel> {
        let values = data.closes();
        let order = self.order;
        let needed = order.d + order.p.max(order.q) + 2;

        if values.len() < needed {
            return Err(ForecastError::InsufficientData {
                needed,
                got: values.len(),
            });
        }

        let diff_series = difference(values, order.d);
        if diff_series.as_slice().population_variance() < DEGENERATE_VARIANCE {
            return Err(ForecastError::FitFailed(format!(
                "{}: training segment has zero variance after differencing",
                self.name
            )));
        }

        let (ar_coefficients, ma_coefficients, intercept) = self.estimate(&diff_series)?;

        // One-step-ahead residuals on the differenced scale.
        let n = diff_series.len();
        let start = order.p.max(order.q);
        let mut residuals = vec![0.0; n];
        for t in start..n {
            let mut pred = intercept;
            for i in 0..order.p {
                pred += ar_coefficients[i] * (diff_series[t - 1 - i] - intercept);
            }
            for i in 0..order.q {
                pred += ma_coefficients[i] * residuals[t - 1 - i];
            }
            residuals[t] = diff_series[t] - pred;
        }

        let effective = &residuals[start..];
        let residual_variance =
            effective.iter().map(|r| r * r).sum::<f64>() / effective.len() as f64;
        if !residual_variance.is_finite() {
            return Err(ForecastError::FitFailed(format!(
                "{}: residual variance is not finite",
                self.name
            )));
        }

        let n_eff = effective.len() as f64;
        let k = order.num_params() as f64;
        let log_likelihood = -0.5
            * n_eff
            * (1.0 + residual_variance.ln() + (2.0 * std::f64::consts::PI).ln());
        let aic = -2.0 * log_likelihood + 2.0 * k;

        debug!(
            "{}: fitted on {} observations, residual variance {:.6e}, AIC {:.3}",
            self.name,
            values.len(),
            residual_variance,
            aic
        );

        Ok(TrainedArimaModel {
            name: self.name.clone(),
            order,
            ar_coefficients,
            ma_coefficients,
            intercept,
            original: values.to_vec(),
            differenced: diff_series,
            residuals,
            residual_variance,
            aic,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedArimaModel {
    /// Get the order specification
    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    /// Get the fitted AR coefficients
    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar_coefficients
    }

    /// Get the fitted MA coefficients
    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma_coefficients
    }

    /// Get the fitted intercept
    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Get the residual variance on the differenced scale
    pub fn residual_variance(&self) -> f64 {
        self.residual_variance
    }

    /// Get the Akaike information criterion of the fit
    pub fn aic(&self) -> f64 {
        self.aic
    }

    /// Number of observations the model was trained on
    pub fn training_len(&self) -> usize {
        self.original.len()
    }
}

impl TrainedForecastModel for TrainedArimaModel {
    fn forecast_values(&self, horizon: usize) -> Result<Vec<f64>> {
        if horizon == 0 {
            return Ok(Vec::new());
        }

        let p = self.order.p;
        let q = self.order.q;

        // Roll forward on the differenced scale; future residuals are zero.
        let mut extended = self.differenced.clone();
        let mut residuals = self.residuals.clone();

        for _ in 0..horizon {
            let t = extended.len();
            let mut pred = self.intercept;
            for i in 0..p {
                if t > i {
                    pred += self.ar_coefficients[i] * (extended[t - 1 - i] - self.intercept);
                }
            }
            for i in 0..q {
                if t > i {
                    pred += self.ma_coefficients[i] * residuals[t - 1 - i];
                }
            }
            extended.push(pred);
            residuals.push(0.0);
        }

        let forecast_diff = &extended[self.differenced.len()..];
        let values = if self.order.d > 0 {
            integrate(forecast_diff, &self.original, self.order.d)?
        } else {
            forecast_diff.to_vec()
        };

        Ok(values)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Deterministic order search over a small candidate grid.
///
/// Fits every order with p <= 2, d <= 1, q <= 2 and keeps the candidate
/// with the lowest AIC; ties keep the earliest candidate in grid order.
/// Candidates whose fit fails are skipped; if none succeed the search
/// itself fails.
pub fn search_order(data: &PriceSeries) -> Result<TrainedArimaModel> {
    let mut best: Option<TrainedArimaModel> = None;

    for p in 0..=2 {
        for d in 0..=1 {
            for q in 0..=2 {
                let model = ArimaModel::new(p, d, q)?;
                match model.train(data) {
                    Ok(trained) => {
                        let better = match &best {
                            Some(current) => trained.aic() < current.aic(),
                            None => true,
                        };
                        if better {
                            best = Some(trained);
                        }
                    }
                    Err(err) => {
                        debug!("order search skipping ARIMA({},{},{}): {}", p, d, q, err);
                    }
                }
            }
        }
    }

    best.ok_or_else(|| {
        ForecastError::FitFailed("no candidate order produced a stable fit".to_string())
    })
}

/// Difference a series `d` times
fn difference(values: &[f64], d: usize) -> Vec<f64> {
    let mut out = values.to_vec();
    for _ in 0..d {
        out = out.windows(2).map(|w| w[1] - w[0]).collect();
    }
    out
}

/// Integrate forecasts on the differenced scale back to the original scale.
///
/// Rebuilds each intermediate differencing level of the original series to
/// recover the last value to accumulate from.
fn integrate(forecast_diff: &[f64], original: &[f64], d: usize) -> Result<Vec<f64>> {
    let mut levels: Vec<Vec<f64>> = vec![original.to_vec()];
    for i in 0..d {
        let next = levels[i].windows(2).map(|w| w[1] - w[0]).collect();
        levels.push(next);
    }

    let mut result = forecast_diff.to_vec();
    for level in (0..d).rev() {
        let mut last = *levels[level].last().ok_or_else(|| {
            ForecastError::FitFailed(format!(
                "cannot integrate order-{} differences of a {}-point series",
                d,
                original.len()
            ))
        })?;
        for value in result.iter_mut() {
            last += *value;
            *value = last;
        }
    }
    Ok(result)
}
