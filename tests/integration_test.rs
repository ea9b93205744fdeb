use chrono::{DateTime, Duration, TimeZone, Utc};
use pretty_assertions::assert_eq;
use rstest::rstest;
use stock_forecast::{
    ArimaOrder, FailureReason, FetchRequest, ForecastConfig, ForecastPipeline, ForecastReport,
    HistoryProvider, PipelineResult, PriceSeries, Result,
};

fn day(offset: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 1, 2, 0, 0, 0).unwrap() + Duration::days(offset)
}

fn daily_series(n: usize, value: impl Fn(usize) -> f64) -> PriceSeries {
    let timestamps = (0..n).map(|i| day(i as i64)).collect();
    let values = (0..n).map(value).collect();
    PriceSeries::new(timestamps, values).unwrap()
}

/// Provider serving one fixed in-memory series for every request.
#[derive(Debug)]
struct FixedProvider {
    series: PriceSeries,
}

impl HistoryProvider for FixedProvider {
    fn fetch_history(&self, _request: &FetchRequest) -> Result<PriceSeries> {
        Ok(self.series.clone())
    }
}

/// Provider whose retrieval always errors out.
#[derive(Debug)]
struct FailingProvider;

impl HistoryProvider for FailingProvider {
    fn fetch_history(&self, _request: &FetchRequest) -> Result<PriceSeries> {
        Err(std::io::Error::new(std::io::ErrorKind::TimedOut, "gateway timeout").into())
    }
}

fn request() -> FetchRequest {
    FetchRequest::new("TEST.NS", "2y", "1d")
}

fn run_pipeline(series: PriceSeries, config: ForecastConfig) -> PipelineResult {
    ForecastPipeline::new(FixedProvider { series }, config).run(&request())
}

fn trend_with_noise(n: usize) -> PriceSeries {
    daily_series(n, |i| 100.0 + 0.1 * i as f64 + (i as f64 * 0.7).sin() * 2.0)
}

#[test]
fn upward_trend_scenario_succeeds() {
    let config = ForecastConfig::new(0.8, 30, None).unwrap();
    let result = run_pipeline(trend_with_noise(400), config);

    let report = result.report().expect("pipeline should succeed");

    // 400 points at 0.8 -> 320 train / 80 test, forecast of 30.
    assert_eq!(report.split().train().len(), 320);
    assert_eq!(report.split().test().len(), 80);
    assert_eq!(report.backtest().predictions().len(), 80);
    assert_eq!(report.forecast().len(), 30);

    assert!(report.backtest().r2() <= 1.0);
    assert!(report.backtest().mape() >= 0.0);
}

#[test]
fn forecast_timestamps_continue_past_the_series() {
    let series = trend_with_noise(400);
    let last = series.last_timestamp().unwrap();
    let config = ForecastConfig::new(0.8, 30, Some(ArimaOrder::new(1, 1, 0))).unwrap();

    let result = run_pipeline(series, config);
    let report = result.report().expect("pipeline should succeed");

    let timestamps = report.forecast().timestamps();
    assert!(timestamps[0] > last);
    assert_eq!(timestamps[0], last + Duration::days(1));
    for pair in timestamps.windows(2) {
        assert!(pair[1] > pair[0]);
    }
}

#[rstest]
#[case(None)]
#[case(Some(ArimaOrder::new(1, 1, 1)))]
fn short_series_fails_with_insufficient_data(#[case] order: Option<ArimaOrder>) {
    let config = ForecastConfig::new(0.8, 30, order).unwrap();
    let result = run_pipeline(daily_series(10, |i| 100.0 + i as f64), config);

    assert_eq!(result.failure(), Some(FailureReason::InsufficientData));
}

#[test]
fn constant_series_fails_with_fit_failed() {
    let config = ForecastConfig::new(0.8, 30, None).unwrap();
    let result = run_pipeline(daily_series(100, |_| 50.0), config);

    assert_eq!(result.failure(), Some(FailureReason::FitFailed));
}

#[test]
fn sharp_downtrend_fails_validation() {
    // Steep fall with a small wiggle so the fit itself stays well-posed;
    // a drift model extrapolates below zero well inside the horizon.
    let series = daily_series(100, |i| {
        let wiggle = if i % 2 == 0 { 0.2 } else { -0.2 };
        300.0 - 3.0 * i as f64 + wiggle
    });
    let config = ForecastConfig::new(0.8, 30, Some(ArimaOrder::new(0, 1, 0))).unwrap();

    let result = run_pipeline(series, config);
    assert_eq!(result.failure(), Some(FailureReason::InvalidForecast));
    assert!(result.report().is_none());
}

#[test]
fn empty_retrieval_fails_with_no_data() {
    let series = PriceSeries::new(vec![], vec![]).unwrap();
    let config = ForecastConfig::default();

    let result = run_pipeline(series, config);
    assert_eq!(result.failure(), Some(FailureReason::NoData));
}

#[test]
fn retrieval_errors_surface_as_no_data() {
    let pipeline = ForecastPipeline::new(FailingProvider, ForecastConfig::default());
    let result = pipeline.run(&request());

    assert_eq!(result.failure(), Some(FailureReason::NoData));
}

#[test]
fn identical_runs_produce_identical_reports() {
    let series = trend_with_noise(300);
    let config = ForecastConfig::new(0.8, 14, Some(ArimaOrder::new(1, 1, 1))).unwrap();

    let pipeline = ForecastPipeline::new(FixedProvider { series }, config);
    let first = pipeline.run(&request());
    let second = pipeline.run(&request());

    assert_eq!(first, second);
    assert!(first.is_succeeded());
}

#[test]
fn successful_report_round_trips_through_json() {
    let config = ForecastConfig::new(0.8, 10, Some(ArimaOrder::new(0, 1, 0))).unwrap();
    let result = run_pipeline(trend_with_noise(200), config);
    let report = result.report().expect("pipeline should succeed");

    let json = report.to_json().unwrap();
    let restored = ForecastReport::from_json(&json).unwrap();
    assert_eq!(&restored, report);
}

#[rstest]
#[case(0.0, 30)]
#[case(1.0, 30)]
#[case(0.8, 0)]
fn config_rejects_invalid_values(#[case] train_fraction: f64, #[case] horizon: usize) {
    assert!(ForecastConfig::new(train_fraction, horizon, None).is_err());
}

#[test]
fn default_config_matches_the_dashboard() {
    let config = ForecastConfig::default();
    assert_eq!(config.train_fraction(), 0.8);
    assert_eq!(config.horizon(), 30);
    assert_eq!(config.order(), None);
}
