//! Accuracy metrics for holdout evaluation

use crate::error::{ForecastError, Result};
use log::warn;
use statrs::statistics::Statistics;

/// MAPE value together with the number of points excluded because the
/// actual value was zero. The excluded count is carried for callers that
/// ask; the headline metric is just the value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapeScore {
    /// Mean absolute percentage error, as a fraction
    pub value: f64,
    /// Test points excluded because the actual value was zero
    pub excluded: usize,
}

fn check_paired(actual: &[f64], predicted: &[f64]) -> Result<()> {
    if actual.len() != predicted.len() || actual.is_empty() {
        return Err(ForecastError::DataError(format!(
            "actual ({}) and predicted ({}) must have the same non-zero length",
            actual.len(),
            predicted.len()
        )));
    }
    Ok(())
}

/// Coefficient of determination over (actual, predicted) pairs.
///
/// Computed as `1 - SS_res / SS_tot`. A constant actual series has
/// `SS_tot == 0`; the sentinel 0.0 is reported for that case instead of
/// dividing by zero. The result is never greater than 1 and can be
/// arbitrarily negative for worse-than-mean predictors.
pub fn r_squared(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_paired(actual, predicted)?;

    let mean = actual.mean();
    let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
    let ss_res: f64 = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).powi(2))
        .sum();

    if ss_tot == 0.0 {
        return Ok(0.0);
    }

    Ok(1.0 - ss_res / ss_tot)
}

/// Mean absolute percentage error over (actual, predicted) pairs.
///
/// Points with a zero actual are excluded from the average rather than
/// causing a division fault. If every actual is zero, the 0.0 sentinel is
/// reported with all points counted as excluded.
pub fn mape(actual: &[f64], predicted: &[f64]) -> Result<MapeScore> {
    check_paired(actual, predicted)?;

    let mut sum = 0.0;
    let mut included = 0usize;
    for (a, p) in actual.iter().zip(predicted.iter()) {
        if *a != 0.0 {
            sum += (a - p).abs() / a.abs();
            included += 1;
        }
    }

    let excluded = actual.len() - included;
    if excluded > 0 {
        warn!(
            "MAPE excluded {} of {} points with zero actual value",
            excluded,
            actual.len()
        );
    }

    let value = if included > 0 {
        sum / included as f64
    } else {
        0.0
    };

    Ok(MapeScore { value, excluded })
}
