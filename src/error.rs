//! Error types for the stock_forecast crate

use thiserror::Error;

/// Custom error types for the stock_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Retrieval returned nothing for the requested ticker
    #[error("no data available for the requested ticker")]
    NoData,

    /// Series too short to form a usable train/test split
    #[error("insufficient data: need at least {needed} observations, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// The numerical fit did not converge or the segment is degenerate
    #[error("model fit failed: {0}")]
    FitFailed(String),

    /// Post-hoc validation rejected the fitted output
    #[error("invalid forecast: {0}")]
    InvalidForecast(String),

    /// Error from invalid parameters
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error related to data validation or processing
    #[error("data error: {0}")]
    DataError(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from CSV parsing
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;
