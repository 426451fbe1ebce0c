//! Integration options and the stepper-selection driver.

use crate::error::{EvolveError, EvolveResult};
use crate::integrator::{Rosenbrock23, Stepper};
use crate::model::OdeSystem;

/// Stepper selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StepperType {
    /// Rosenbrock 2(3), L-stable, for stiff systems.
    #[default]
    Rosenbrock23,
}

/// Options for one integration call.
#[derive(Clone, Debug)]
pub struct EvolveOptions {
    /// Relative tolerance shared by all unknowns
    pub rtol: f64,
    /// Absolute tolerance per unknown (length 1 broadcasts)
    pub atol: Vec<f64>,
    /// First trial step; estimated from f(t0, y0) when `None`
    pub h_init: Option<f64>,
    /// Smallest step before giving up
    pub h_min: f64,
    /// Largest step
    pub h_max: f64,
    /// Accepted plus rejected steps allowed per call
    pub max_steps: usize,
    /// Consecutive cutbacks allowed after retryable failures
    pub max_retries: usize,
    /// Step reduction after a retryable failure
    pub cutback_factor: f64,
    /// Stepper
    pub stepper: StepperType,
}

impl Default for EvolveOptions {
    fn default() -> Self {
        Self {
            rtol: 1e-6,
            atol: vec![1e-10],
            h_init: None,
            h_min: 1e-12,
            h_max: f64::INFINITY,
            max_steps: 200_000,
            max_retries: 8,
            cutback_factor: 0.5,
            stepper: StepperType::default(),
        }
    }
}

impl EvolveOptions {
    pub(crate) fn validate(&self, dim: usize) -> EvolveResult<()> {
        if !(self.rtol > 0.0 && self.rtol < 1.0) {
            return Err(EvolveError::InvalidArg {
                what: "rtol must lie in (0, 1)",
            });
        }
        if self.atol.len() != 1 && self.atol.len() != dim {
            return Err(EvolveError::InvalidArg {
                what: "atol must have one entry or one per unknown",
            });
        }
        if self.atol.iter().any(|a| !(*a > 0.0)) {
            return Err(EvolveError::InvalidArg {
                what: "atol entries must be positive",
            });
        }
        if !(self.h_min > 0.0) || !(self.h_max > self.h_min) {
            return Err(EvolveError::InvalidArg {
                what: "step bounds must satisfy 0 < h_min < h_max",
            });
        }
        if self.max_steps == 0 {
            return Err(EvolveError::InvalidArg {
                what: "max_steps must be positive",
            });
        }
        if !(self.cutback_factor > 0.0 && self.cutback_factor < 1.0) {
            return Err(EvolveError::InvalidArg {
                what: "cutback_factor must lie in (0, 1)",
            });
        }
        Ok(())
    }

    /// Absolute tolerance of unknown `i`.
    pub fn atol_of(&self, i: usize) -> f64 {
        if self.atol.len() == 1 {
            self.atol[0]
        } else {
            self.atol[i]
        }
    }
}

/// Work counters of one integration call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EvolveStats {
    pub accepted: usize,
    pub rejected: usize,
    pub retries: usize,
    pub rhs_evals: usize,
}

/// Integrate `system` from `t0` through every abscissa in `outputs`.
///
/// `y` holds the initial state on entry and the state at the last output on
/// return. `observer` is called at each output, in order.
pub fn evolve<S, O>(
    system: &mut S,
    y: &mut [f64],
    t0: f64,
    outputs: &[f64],
    opts: &EvolveOptions,
    observer: O,
) -> Result<EvolveStats, S::Error>
where
    S: OdeSystem,
    O: FnMut(f64, &[f64]) -> Result<(), S::Error>,
{
    match opts.stepper {
        StepperType::Rosenbrock23 => Rosenbrock23.integrate(system, y, t0, outputs, opts, observer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_defaults() {
        let opts = EvolveOptions::default();
        assert_eq!(opts.rtol, 1e-6);
        assert_eq!(opts.atol_of(3), 1e-10);
        assert_eq!(opts.stepper, StepperType::Rosenbrock23);
        assert!(opts.validate(3).is_ok());
    }

    #[test]
    fn options_invalid() {
        let opts = EvolveOptions {
            atol: vec![1e-8, 1e-8],
            ..EvolveOptions::default()
        };
        assert!(matches!(opts.validate(3), Err(EvolveError::InvalidArg { .. })));

        let opts = EvolveOptions {
            cutback_factor: 1.0,
            ..EvolveOptions::default()
        };
        assert!(opts.validate(1).is_err());
    }
}
