use assert_approx_eq::assert_approx_eq;
use chrono::{DateTime, Duration, TimeZone, Utc};
use pretty_assertions::assert_eq;
use stock_forecast::backtest;
use stock_forecast::{ArimaModel, ForecastModel, PriceSeries, Result, TrainedForecastModel};

fn day(offset: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 1, 2, 0, 0, 0).unwrap() + Duration::days(offset)
}

fn daily_series(n: usize, value: impl Fn(usize) -> f64) -> PriceSeries {
    let timestamps = (0..n).map(|i| day(i as i64)).collect();
    let values = (0..n).map(value).collect();
    PriceSeries::new(timestamps, values).unwrap()
}

/// Stub model that replays a fixed sequence regardless of the holdout.
#[derive(Debug)]
struct ScriptedModel {
    script: Vec<f64>,
}

impl TrainedForecastModel for ScriptedModel {
    fn forecast_values(&self, horizon: usize) -> Result<Vec<f64>> {
        Ok(self.script.iter().copied().take(horizon).collect())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[test]
fn predictions_align_one_to_one_with_holdout() {
    let test = daily_series(5, |i| 100.0 + i as f64);
    let model = ScriptedModel {
        script: vec![101.0, 102.0, 103.0, 104.0, 105.0, 999.0],
    };

    let result = backtest::evaluate(&model, &test).unwrap();
    assert_eq!(result.predictions().len(), test.len());
}

#[test]
fn perfect_predictions_score_r2_of_one() {
    let test = daily_series(4, |i| 100.0 + 2.0 * i as f64);
    let model = ScriptedModel {
        script: test.closes().to_vec(),
    };

    let result = backtest::evaluate(&model, &test).unwrap();
    assert_approx_eq!(result.r2(), 1.0);
    assert_approx_eq!(result.mape(), 0.0);
    assert_eq!(result.mape_excluded_points(), 0);
}

#[test]
fn constant_holdout_reports_r2_sentinel() {
    let test = daily_series(4, |_| 100.0);
    let model = ScriptedModel {
        script: vec![90.0, 95.0, 105.0, 110.0],
    };

    let result = backtest::evaluate(&model, &test).unwrap();
    assert_approx_eq!(result.r2(), 0.0);
    assert!(result.mape() >= 0.0);
}

#[test]
fn zero_actuals_are_excluded_from_mape() {
    let test = daily_series(3, |i| if i == 0 { 0.0 } else { 100.0 });
    let model = ScriptedModel {
        script: vec![50.0, 110.0, 90.0],
    };

    let result = backtest::evaluate(&model, &test).unwrap();
    assert_eq!(result.mape_excluded_points(), 1);
    assert_approx_eq!(result.mape(), 0.1);
}

#[test]
fn predictions_never_peek_at_holdout_values() {
    let train = daily_series(100, |i| 100.0 + 0.5 * i as f64 + (i as f64 * 0.7).sin());
    let trained = ArimaModel::new(1, 1, 0).unwrap().train(&train).unwrap();

    // Two holdouts of the same length but wildly different values must
    // receive identical predictions: prediction depends only on the
    // trained parameters and the step index.
    let holdout_a = daily_series(20, |i| 150.0 + i as f64);
    let holdout_b = daily_series(20, |i| 5.0 + (i as f64 * 1.3).cos());

    let result_a = backtest::evaluate(&trained, &holdout_a).unwrap();
    let result_b = backtest::evaluate(&trained, &holdout_b).unwrap();

    assert_eq!(result_a.predictions(), result_b.predictions());
}

#[test]
fn display_formats_scores() {
    let test = daily_series(3, |i| 100.0 + i as f64);
    let model = ScriptedModel {
        script: test.closes().to_vec(),
    };

    let result = backtest::evaluate(&model, &test).unwrap();
    let rendered = format!("{}", result);
    assert!(rendered.contains("R²"));
    assert!(rendered.contains("MAPE"));
}
