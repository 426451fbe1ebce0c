//! Error types for ODE integration.

use thiserror::Error;

/// Errors raised by the stepper itself.
///
/// Right-hand-side failures use the system's own error type; these are
/// converted into it through `From<EvolveError>`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvolveError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Step size {h:e} fell below the minimum at t = {t}")]
    StepTooSmall { t: f64, h: f64 },

    #[error("Step budget of {steps} exhausted at t = {t}")]
    MaxSteps { t: f64, steps: usize },

    #[error("Retry budget of {retries} exhausted at t = {t}")]
    RetriesExhausted { t: f64, retries: usize },
}

pub type EvolveResult<T> = Result<T, EvolveError>;
