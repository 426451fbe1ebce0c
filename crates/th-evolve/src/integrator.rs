//! Adaptive Rosenbrock stepper.

use crate::error::EvolveError;
use crate::evolve::{EvolveOptions, EvolveStats};
use crate::model::OdeSystem;
use nalgebra::{DMatrix, DVector};
use std::f64::consts::SQRT_2;
use tracing::{debug, trace};

/// Trait for adaptive integrators.
pub trait Stepper {
    /// Advance `y` from `t0` through each abscissa of `outputs`.
    ///
    /// Outputs must be non-decreasing and not below `t0`. The stepper lands
    /// exactly on every output and calls `observer(t, y)` there.
    fn integrate<S, O>(
        &self,
        system: &mut S,
        y: &mut [f64],
        t0: f64,
        outputs: &[f64],
        opts: &EvolveOptions,
        observer: O,
    ) -> Result<EvolveStats, S::Error>
    where
        S: OdeSystem,
        O: FnMut(f64, &[f64]) -> Result<(), S::Error>;
}

/// Shampine's modified Rosenbrock 2(3) pair.
///
/// L-stable second-order solution with a third-order error estimate. The
/// Jacobian and ∂f/∂t come from forward differences and are reused across
/// rejected attempts at the same point.
#[derive(Clone, Copy, Debug, Default)]
pub struct Rosenbrock23;

const D: f64 = 1.0 / (2.0 + SQRT_2);
const E32: f64 = 6.0 + SQRT_2;
const MAX_GROWTH: f64 = 5.0;
const MIN_SHRINK: f64 = 0.1;
const SAFETY: f64 = 0.8;

struct Linearization {
    dfdy: DMatrix<f64>,
    dfdt: DVector<f64>,
}

enum Attempt {
    Step { y_new: Vec<f64>, f_new: Vec<f64>, err: f64 },
    Singular,
}

impl Rosenbrock23 {
    #[allow(clippy::too_many_arguments)]
    fn linearize<S: OdeSystem>(
        &self,
        system: &mut S,
        t: f64,
        y: &[f64],
        f0: &[f64],
        h: f64,
        opts: &EvolveOptions,
        stats: &mut EvolveStats,
    ) -> Result<Linearization, S::Error> {
        let n = y.len();
        let sqrt_eps = f64::EPSILON.sqrt();
        let mut yp = y.to_vec();
        let mut fp = vec![0.0; n];
        let mut dfdy = DMatrix::zeros(n, n);

        for j in 0..n {
            let thresh = opts.atol_of(j) / opts.rtol;
            yp[j] = y[j] + sqrt_eps * y[j].abs().max(thresh);
            let del = yp[j] - y[j];
            system.rhs(t, &yp, &mut fp)?;
            stats.rhs_evals += 1;
            for i in 0..n {
                dfdy[(i, j)] = (fp[i] - f0[i]) / del;
            }
            yp[j] = y[j];
        }

        let dt = sqrt_eps * t.abs().max(h.abs()).max(1.0);
        system.rhs(t + dt, y, &mut fp)?;
        stats.rhs_evals += 1;
        let dfdt = DVector::from_iterator(n, fp.iter().zip(f0).map(|(a, b)| (a - b) / dt));

        Ok(Linearization { dfdy, dfdt })
    }

    #[allow(clippy::too_many_arguments)]
    fn attempt<S: OdeSystem>(
        &self,
        system: &mut S,
        t: f64,
        y: &[f64],
        f0: &[f64],
        h: f64,
        lin: &Linearization,
        opts: &EvolveOptions,
        stats: &mut EvolveStats,
    ) -> Result<Attempt, S::Error> {
        let n = y.len();
        let w = DMatrix::<f64>::identity(n, n) - &lin.dfdy * (h * D);
        let lu = w.lu();
        let f0v = DVector::from_column_slice(f0);
        let hdt = &lin.dfdt * (h * D);

        let Some(k1) = lu.solve(&(&f0v + &hdt)) else {
            return Ok(Attempt::Singular);
        };

        let y_mid: Vec<f64> = (0..n).map(|i| y[i] + 0.5 * h * k1[i]).collect();
        let mut f1 = vec![0.0; n];
        system.rhs(t + 0.5 * h, &y_mid, &mut f1)?;
        stats.rhs_evals += 1;
        let f1v = DVector::from_column_slice(&f1);

        let Some(k2) = lu.solve(&(&f1v - &k1)) else {
            return Ok(Attempt::Singular);
        };
        let k2 = k2 + &k1;

        let y_new: Vec<f64> = (0..n).map(|i| y[i] + h * k2[i]).collect();
        if y_new.iter().any(|v| !v.is_finite()) {
            return Ok(Attempt::Step {
                y_new,
                f_new: vec![0.0; n],
                err: f64::INFINITY,
            });
        }

        let mut f2 = vec![0.0; n];
        system.rhs(t + h, &y_new, &mut f2)?;
        stats.rhs_evals += 1;
        let f2v = DVector::from_column_slice(&f2);

        let rhs3 = &f2v - (&k2 - &f1v) * E32 - (&k1 - &f0v) * 2.0 + &hdt;
        let Some(k3) = lu.solve(&rhs3) else {
            return Ok(Attempt::Singular);
        };

        let mut err: f64 = 0.0;
        for i in 0..n {
            let e = h / 6.0 * (k1[i] - 2.0 * k2[i] + k3[i]);
            let scale = opts.atol_of(i) + opts.rtol * y[i].abs().max(y_new[i].abs());
            err = err.max((e / scale).abs());
        }
        if err.is_nan() {
            err = f64::INFINITY;
        }

        Ok(Attempt::Step {
            y_new,
            f_new: f2,
            err,
        })
    }
}

fn initial_step(y: &[f64], f0: &[f64], span: f64, opts: &EvolveOptions) -> f64 {
    if let Some(h) = opts.h_init {
        return h.min(opts.h_max).max(opts.h_min);
    }
    let mut rh: f64 = 0.0;
    for i in 0..y.len() {
        let wt = y[i].abs().max(opts.atol_of(i) / opts.rtol);
        rh = rh.max(f0[i].abs() / wt);
    }
    rh /= SAFETY * opts.rtol.cbrt();
    let mut h = span.min(opts.h_max);
    if h * rh > 1.0 {
        h = 1.0 / rh;
    }
    h.max(opts.h_min)
}

impl Stepper for Rosenbrock23 {
    fn integrate<S, O>(
        &self,
        system: &mut S,
        y: &mut [f64],
        t0: f64,
        outputs: &[f64],
        opts: &EvolveOptions,
        mut observer: O,
    ) -> Result<EvolveStats, S::Error>
    where
        S: OdeSystem,
        O: FnMut(f64, &[f64]) -> Result<(), S::Error>,
    {
        let n = system.dim();
        if y.len() != n {
            return Err(EvolveError::InvalidArg {
                what: "state length does not match system dimension",
            }
            .into());
        }
        opts.validate(n)?;
        if outputs.windows(2).any(|w| w[1] < w[0]) || outputs.iter().any(|t| !(*t >= t0)) {
            return Err(EvolveError::InvalidArg {
                what: "outputs must be sorted and not precede t0",
            }
            .into());
        }

        let mut stats = EvolveStats::default();
        let mut k = 0;
        while k < outputs.len() && outputs[k] <= t0 {
            observer(t0, y)?;
            k += 1;
        }
        if k == outputs.len() {
            return Ok(stats);
        }

        let mut t = t0;
        let mut f0 = vec![0.0; n];
        system.rhs(t, y, &mut f0)?;
        stats.rhs_evals += 1;

        let span = outputs[outputs.len() - 1] - t0;
        let mut h = initial_step(y, &f0, span, opts);
        let mut lin: Option<Linearization> = None;
        let mut retries = 0;

        while k < outputs.len() {
            if stats.accepted + stats.rejected >= opts.max_steps {
                return Err(EvolveError::MaxSteps {
                    t,
                    steps: opts.max_steps,
                }
                .into());
            }

            let target = outputs[k];
            let hits = h >= target - t;
            let h_step = if hits { target - t } else { h };

            // linearization failures take the same cutback path as stage failures
            let linearized = match lin.take() {
                Some(l) => Ok(l),
                None => self.linearize(system, t, y, &f0, h_step, opts, &mut stats),
            };
            let outcome = match linearized {
                Ok(current) => {
                    let outcome = self.attempt(system, t, y, &f0, h_step, &current, opts, &mut stats);
                    lin = Some(current);
                    outcome
                }
                Err(e) => Err(e),
            };
            match outcome {
                Ok(Attempt::Step { y_new, f_new, err }) if err <= 1.0 => {
                    t = if hits { target } else { t + h_step };
                    y.copy_from_slice(&y_new);
                    f0 = f_new;
                    lin = None;
                    retries = 0;
                    stats.accepted += 1;

                    let grow = if err == 0.0 {
                        MAX_GROWTH
                    } else {
                        (SAFETY * err.powf(-1.0 / 3.0)).clamp(MIN_SHRINK, MAX_GROWTH)
                    };
                    let h_next = h_step * grow;
                    h = if hits { h_next.max(h) } else { h_next };
                    h = h.min(opts.h_max);

                    while k < outputs.len() && outputs[k] <= t {
                        observer(t, y)?;
                        k += 1;
                    }
                    continue;
                }
                Ok(Attempt::Step { err, .. }) => {
                    stats.rejected += 1;
                    let shrink = if err.is_finite() {
                        (SAFETY * err.powf(-1.0 / 3.0)).max(MIN_SHRINK)
                    } else {
                        MIN_SHRINK
                    };
                    trace!(t, h = h_step, err, "step rejected");
                    h = h_step * shrink;
                }
                Ok(Attempt::Singular) => {
                    stats.rejected += 1;
                    trace!(t, h = h_step, "singular iteration matrix");
                    h = h_step * opts.cutback_factor;
                }
                Err(e) if system.is_retryable(&e) => {
                    retries += 1;
                    stats.retries += 1;
                    if retries > opts.max_retries {
                        return Err(e);
                    }
                    debug!(t, h = h_step, retries, "retryable failure, cutting step back");
                    h = h_step * opts.cutback_factor;
                }
                Err(e) => return Err(e),
            }

            if h < opts.h_min && h < target - t {
                return Err(EvolveError::StepTooSmall { t, h }.into());
            }
        }

        trace!(
            accepted = stats.accepted,
            rejected = stats.rejected,
            rhs_evals = stats.rhs_evals,
            "integration finished"
        );
        Ok(stats)
    }
}
