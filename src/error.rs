//! Error types for the tsunami risk pipeline

use thiserror::Error;

/// Errors raised by data loading, preprocessing, model fitting and reporting
#[derive(Error, Debug)]
pub enum RiskError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Column not found: {0}")]
    MissingColumn(String),

    #[error("Invalid outcome value {value:?} at row {row}")]
    InvalidOutcome { row: usize, value: String },

    #[error("No usable rows: {0}")]
    EmptyData(String),

    #[error("Outcome has a single class ({0}); both classes are required")]
    SingleClass(f64),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Model has not been fitted yet")]
    NotFitted,

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Matrix is singular: {0}")]
    SingularMatrix(String),
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, RiskError>;
