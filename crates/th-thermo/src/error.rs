//! Error types for the thermal history.

use th_background::BackgroundError;
use th_core::CoreError;
use th_evolve::EvolveError;
use th_rates::RateError;
use thiserror::Error;

pub type ThermoResult<T> = Result<T, ThermoError>;

/// Errors raised while building or querying a thermal history.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ThermoError {
    /// Inputs rejected before any integration.
    #[error("Invalid parameter: {what}")]
    InvalidParameter { what: String },

    /// Non-finite derivatives, or the stepper could not meet tolerance.
    #[error("Numerical divergence at z = {z}: {what}")]
    NumericalDivergence { what: String, z: f64 },

    /// Target optical depth unreachable, or bisection did not converge.
    #[error("Shooting failed: {what}")]
    ShootingDivergence { what: String },

    /// A post-processed field is not finite.
    #[error("Table build failed: non-finite {field} at z = {z}")]
    TableBuildFailure { field: &'static str, z: f64 },

    /// Query outside the tabulated redshift range.
    #[error("z = {z} outside table range [{min}, {max}]")]
    OutOfRange { z: f64, min: f64, max: f64 },

    #[error("Background query failed ({context}): {source}")]
    Background {
        context: &'static str,
        #[source]
        source: BackgroundError,
    },

    #[error("Rate provider failed at z = {z}: {source}")]
    Rate {
        z: f64,
        #[source]
        source: RateError,
    },

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ThermoError {
    pub(crate) fn invalid(what: impl Into<String>) -> Self {
        ThermoError::InvalidParameter { what: what.into() }
    }

    pub(crate) fn background(context: &'static str) -> impl FnOnce(BackgroundError) -> Self {
        move |source| ThermoError::Background { context, source }
    }

    /// Non-finite coefficients are a divergence, anything else is wrapped.
    pub(crate) fn from_rate(z: f64, source: RateError) -> Self {
        match source {
            RateError::NonFinite { what, .. } => ThermoError::NumericalDivergence {
                what: format!("rate provider returned non-finite {what}"),
                z,
            },
            source => ThermoError::Rate { z, source },
        }
    }

    /// Failures the stepper may cure by cutting the step.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ThermoError::NumericalDivergence { .. })
    }
}

impl From<EvolveError> for ThermoError {
    fn from(e: EvolveError) -> Self {
        match e {
            EvolveError::InvalidArg { what } => ThermoError::invalid(what),
            EvolveError::StepTooSmall { t, h } => ThermoError::NumericalDivergence {
                what: format!("step size {h:e} below minimum"),
                z: -t,
            },
            EvolveError::MaxSteps { t, steps } => ThermoError::NumericalDivergence {
                what: format!("step budget of {steps} exhausted"),
                z: -t,
            },
            EvolveError::RetriesExhausted { t, retries } => ThermoError::NumericalDivergence {
                what: format!("{retries} cutbacks did not recover"),
                z: -t,
            },
        }
    }
}
