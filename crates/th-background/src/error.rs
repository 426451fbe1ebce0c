//! Background errors.

use th_core::CoreError;
use thiserror::Error;

/// Result type for background operations.
pub type BackgroundResult<T> = Result<T, BackgroundError>;

/// Errors raised while building or querying a background model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackgroundError {
    /// Unusable cosmological parameter.
    #[error("Invalid background parameter: {what}")]
    InvalidParam { what: String },

    /// Query outside the tabulated range.
    #[error("{what} = {value} outside tabulated range [{min}, {max}]")]
    OutOfRange {
        what: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Numeric error: {0}")]
    Core(#[from] CoreError),
}
