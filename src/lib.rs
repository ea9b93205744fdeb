//! # Stock Forecast
//!
//! Forecasting and backtesting engine for stock dashboards.
//!
//! Given a historical closing-price series, the pipeline splits it
//! chronologically into a training window and a holdout window, fits an
//! ARIMA model on the training window, scores holdout-aligned predictions
//! (R² and MAPE), and extends a fixed-length forecast beyond the end of the
//! series. Retrieval is an injected collaborator; the crate performs no
//! network I/O and renders no UI.
//!
//! ## Quick Start
//!
//! ```
//! use stock_forecast::provider::CsvHistoryProvider;
//! use stock_forecast::{FetchRequest, ForecastConfig, ForecastPipeline, PipelineResult};
//!
//! let provider = CsvHistoryProvider::new("data");
//! let pipeline = ForecastPipeline::new(provider, ForecastConfig::default());
//!
//! match pipeline.run(&FetchRequest::new("RELIANCE.NS", "2y", "1d")) {
//!     PipelineResult::Succeeded(report) => {
//!         println!("R²: {:.2}", report.backtest().r2());
//!         println!("forecast: {:?}", report.forecast().values());
//!     }
//!     PipelineResult::Failed(reason) => {
//!         println!("no forecast available ({})", reason);
//!     }
//! }
//! ```
//!
//! Every run is independent and deterministic for identical input: the
//! split is positional, the fit has no randomized search, and nothing is
//! shared across runs.

pub mod backtest;
pub mod data;
pub mod error;
pub mod forecast;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod provider;

// Re-export commonly used types
pub use crate::backtest::BacktestResult;
pub use crate::data::{PriceSeries, SplitDataset, MIN_OBSERVATIONS};
pub use crate::error::{ForecastError, Result};
pub use crate::forecast::Forecast;
pub use crate::models::arima::{ArimaModel, TrainedArimaModel};
pub use crate::models::{ArimaOrder, ForecastModel, TrainedForecastModel};
pub use crate::pipeline::{
    FailureReason, ForecastConfig, ForecastPipeline, ForecastReport, PipelineResult,
};
pub use crate::provider::{FetchRequest, HistoryProvider};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
