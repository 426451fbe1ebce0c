//! Rate provider errors.

use th_core::CoreError;
use thiserror::Error;

/// Result type for rate evaluations.
pub type RateResult<T> = Result<T, RateError>;

/// Errors raised while evaluating or building rates.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RateError {
    /// A coefficient evaluated to NaN or infinity.
    #[error("Non-finite {what} at z = {z}")]
    NonFinite { what: &'static str, z: f64 },

    /// Query outside the tabulated range.
    #[error("{what} = {value} outside table range [{min}, {max}]")]
    OutOfRange {
        what: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Malformed construction input.
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error(transparent)]
    Core(#[from] CoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = RateError::NonFinite {
            what: "alpha_h",
            z: 1100.0,
        };
        assert!(err.to_string().contains("alpha_h"));
        assert!(err.to_string().contains("1100"));
    }
}
