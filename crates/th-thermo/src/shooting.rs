//! Bisection for the reionization parameter that reproduces a target
//! optical depth.
//!
//! The solver only sees `parameter -> τ`; the run supplies that map by
//! re-integrating the late segment for each trial.

use crate::error::{ThermoError, ThermoResult};
use crate::params::{Precision, ReionizationModel};
use tracing::{debug, info};

/// Bracket width below which bisection stops.
const MIN_BRACKET: f64 = 1e-10;

/// Converged free parameter and the optical depth it gives.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Shot {
    pub parameter: f64,
    pub tau: f64,
    pub iterations: usize,
}

/// Search interval of the free parameter: the central redshift for camb and
/// half_tanh, a common redshift offset for many_tanh.
pub(crate) fn bracket(model: &ReionizationModel, precision: &Precision) -> ThermoResult<(f64, f64)> {
    let z_max = precision.reionization_z_start_max;
    let factor = precision.reionization_start_factor;
    let (lo, hi) = match model {
        ReionizationModel::Camb {
            width,
            helium_redshift,
            helium_width,
            ..
        } => {
            if helium_redshift + factor * helium_width > z_max {
                return Err(ThermoError::invalid(format!(
                    "helium reionization starts above z = {z_max}"
                )));
            }
            (0.0, z_max - factor * width)
        }
        ReionizationModel::HalfTanh { .. } => (0.0, z_max),
        ReionizationModel::ManyTanh { z, width, .. } => {
            let lowest = z.iter().copied().fold(f64::INFINITY, f64::min);
            let highest = z.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            (-lowest, z_max - factor * width - highest)
        }
        other => {
            return Err(ThermoError::invalid(format!(
                "reionization model '{}' has no free redshift",
                other.name()
            )));
        }
    };
    if !(lo.is_finite() && hi.is_finite() && lo < hi) {
        return Err(ThermoError::invalid(format!(
            "empty search interval [{lo}, {hi}] for the reionization parameter"
        )));
    }
    Ok((lo, hi))
}

/// `model` with its free parameter set to `parameter`.
pub(crate) fn with_parameter(model: &ReionizationModel, parameter: f64) -> ReionizationModel {
    let mut model = model.clone();
    match &mut model {
        ReionizationModel::Camb { z_reio, .. } | ReionizationModel::HalfTanh { z_reio, .. } => {
            *z_reio = parameter;
        }
        ReionizationModel::ManyTanh { z, .. } => {
            for zi in z.iter_mut() {
                *zi += parameter;
            }
        }
        _ => {}
    }
    model
}

/// Bisect `tau_of` on `(lo, hi)` until it matches `target` within
/// `tolerance · target`. `tau_of` must increase with the parameter.
pub fn bisect<F>(target: f64, (lo, hi): (f64, f64), tolerance: f64, max_iterations: usize, mut tau_of: F) -> ThermoResult<Shot>
where
    F: FnMut(f64) -> ThermoResult<f64>,
{
    let (mut lo, mut hi) = (lo, hi);
    let tau_lo = tau_of(lo)?;
    let tau_hi = tau_of(hi)?;
    if !(tau_lo <= target && target <= tau_hi) {
        return Err(ThermoError::ShootingDivergence {
            what: format!("target optical depth {target} outside the reachable range [{tau_lo}, {tau_hi}]"),
        });
    }

    for iteration in 1..=max_iterations {
        let mid = 0.5 * (lo + hi);
        let tau = tau_of(mid)?;
        debug!(iteration, parameter = mid, tau, "shooting step");
        if (tau - target).abs() < tolerance * target {
            info!(parameter = mid, tau, iterations = iteration, "optical depth matched");
            return Ok(Shot {
                parameter: mid,
                tau,
                iterations: iteration,
            });
        }
        if hi - lo < MIN_BRACKET {
            return Err(ThermoError::ShootingDivergence {
                what: format!(
                    "bracket [{lo}, {hi}] collapsed with optical depth {tau}, target {target}"
                ),
            });
        }
        if tau < target {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Err(ThermoError::ShootingDivergence {
        what: format!("no convergence after {max_iterations} iterations, bracket [{lo}, {hi}]"),
    })
}
