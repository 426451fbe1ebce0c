//! Right-hand side of the ionization and temperature equations.
//!
//! The stepper integrates in `mz = −z`; [`Evaluator`] works in z and
//! [`ThermoOde`] flips the sign.

use crate::error::{ThermoError, ThermoResult};
use crate::reionization::ReionizationProfile;
use crate::run::ThermoRun;
use crate::schedule::{ApproximationSchedule, Interval, Regime};
use crate::state::{Ionization, Shape, StateVector};
use th_core::constants::{A_RAD, C, H_P, K_B, L_H_ALPHA, L_H_ION, L_HE_2P, L_HE1_ION, M_E, SIGMA_T};
use th_core::{step_centered, step_unit};
use th_evolve::OdeSystem;
use th_rates::{RateInput, Rates};

/// Compton coupling constant: rate = CT · T_rad⁴ [1/s].
const CT: f64 = 8.0 / 3.0 * SIGMA_T * A_RAD / (M_E * C);
/// Relative redshift nudge for the single retry inside a transition window.
const RETRY_NUDGE: f64 = 1e-8;

/// Derivatives of one schedule interval.
#[derive(Clone, Copy)]
pub(crate) struct Evaluator<'a> {
    run: &'a ThermoRun<'a>,
    interval: Interval,
    previous: Option<Regime>,
    /// Fractions at the interval start, used for unknowns that are neither
    /// closed-form nor integrated here.
    carried: Ionization,
    profile: Option<&'a ReionizationProfile>,
}

impl<'a> Evaluator<'a> {
    pub(crate) fn new(
        run: &'a ThermoRun<'a>,
        schedule: &ApproximationSchedule,
        index: usize,
        carried: Ionization,
        profile: Option<&'a ReionizationProfile>,
    ) -> Self {
        let interval = schedule.intervals()[index];
        Self {
            run,
            interval,
            previous: schedule.previous(index),
            carried,
            profile: profile.filter(|_| interval.regime.is_reionization()),
        }
    }

    pub(crate) fn shape(&self) -> Shape {
        self.interval.regime.shape()
    }

    /// Closed form or integrated value, blended across the entry transition.
    ///
    /// Two closed forms hand over with the centered step over two widths;
    /// a closed form hands over to an integrated unknown with the unit step
    /// over one width.
    fn blend(&self, z: f64, current: Option<f64>, previous: Option<f64>, integrated: Option<f64>, frozen: f64) -> f64 {
        let own = current.or(integrated).unwrap_or(frozen);
        let (Some(width), Some(prev)) = (self.interval.width, previous) else {
            return own;
        };
        let z_s = self.interval.z_start;
        match current {
            Some(c) if z > z_s - 2.0 * width => {
                let w = step_centered((z - (z_s - width)) / width);
                w * prev + (1.0 - w) * c
            }
            None if integrated.is_some() && z > z_s - width => {
                let w = step_unit((z_s - z) / width);
                w * own + (1.0 - w) * prev
            }
            _ => own,
        }
    }

    /// Ionized fractions at `z` before any reionization profile.
    pub(crate) fn ionization(&self, z: f64, state: &StateVector) -> Ionization {
        let plasma = &self.run.plasma;
        let regime = self.interval.regime;
        let prev = self.previous;

        let x_he = self.blend(
            z,
            regime.closed_x_he(plasma, z),
            prev.and_then(|r| r.closed_x_he(plasma, z)),
            state.x_he(),
            self.carried.x_he,
        );
        let he_iii_factor = self.blend(
            z,
            Some(regime.he_iii_factor(plasma, z)),
            prev.map(|r| r.he_iii_factor(plasma, z)),
            None,
            0.0,
        );
        let he_iii = x_he * he_iii_factor;
        let helium_electrons = plasma.f_he * (x_he + he_iii);
        let x_h = self.blend(
            z,
            regime.closed_x_h(plasma, z, helium_electrons),
            prev.and_then(|r| r.closed_x_h(plasma, z, helium_electrons)),
            state.x_h(),
            self.carried.x_h,
        );
        Ionization { x_h, x_he, he_iii }
    }

    /// Fractions and free electrons per hydrogen nucleus, the latter raised
    /// to the reionization profile where one applies.
    pub(crate) fn electrons(&self, z: f64, state: &StateVector) -> (Ionization, f64) {
        let ion = self.ionization(z, state);
        let x = ion.electrons(self.run.plasma.f_he);
        match self.profile {
            Some(profile) => (ion, x.max(profile.evaluate(z).0)),
            None => (ion, x),
        }
    }

    /// Table values (xe, Tb) at an output redshift.
    pub(crate) fn observe(&self, z: f64, y: &[f64]) -> ThermoResult<(f64, f64)> {
        let state = StateVector::from_slice(self.shape(), y)?;
        let (_, x) = self.electrons(z, &state);
        Ok((x, state.t_mat()))
    }

    fn rate_input(&self, z: f64, t_mat: f64, ion: &Ionization, x: f64) -> RateInput {
        let plasma = &self.run.plasma;
        RateInput {
            z,
            t_mat,
            t_rad: plasma.t_rad(z),
            x_h: ion.x_h,
            x_he: ion.x_he,
            x,
            n_h: plasma.n_h(z),
            f_he: plasma.f_he,
            hubble: self.run.background.hubble_si(z),
        }
    }

    fn rates(&self, z: f64, t_mat: f64, ion: &Ionization, x: f64) -> ThermoResult<Rates> {
        let provider = self.run.rates;
        match provider.rates(&self.rate_input(z, t_mat, ion, x)) {
            Ok(rates) => Ok(rates),
            Err(th_rates::RateError::NonFinite { .. }) if self.interval.in_transition(z) => {
                let nudged = z * (1.0 + RETRY_NUDGE);
                provider
                    .rates(&self.rate_input(nudged, t_mat, ion, x))
                    .map_err(|e| ThermoError::from_rate(z, e))
            }
            Err(e) => Err(ThermoError::from_rate(z, e)),
        }
    }

    /// d/dz of the integrated unknowns, in stepper order.
    pub(crate) fn derivatives(&self, z: f64, y: &[f64], dy_dz: &mut [f64]) -> ThermoResult<()> {
        let shape = self.shape();
        let state = StateVector::from_slice(shape, y)?;
        let plasma = &self.run.plasma;
        let (ion, x) = self.electrons(z, &state);

        let t_mat = state.t_mat();
        let t_rad = plasma.t_rad(z);
        let n_h = plasma.n_h(z);
        let hubble = self.run.background.hubble_si(z);
        let expansion = hubble * (1.0 + z);
        let energy = self.run.injection.rate(z)?;
        let (chi_heat, chi_ion) = deposition_fractions(x);

        let mut slot = 0;
        if shape.integrates_helium() {
            let rates = self.rates(z, t_mat, &ion, x)?;
            if shape.integrates_hydrogen() {
                let mut dx_h = rates.dx_h_dz;
                if energy > 0.0 {
                    let per_atom = 1.0 / (H_P * C * L_H_ION) + (1.0 - rates.peebles_h) / (H_P * C * L_H_ALPHA);
                    dx_h -= energy * chi_ion / (n_h * expansion) * per_atom;
                }
                dy_dz[slot] = dx_h;
                slot += 1;
            }
            let mut dx_he = rates.dx_he_dz;
            if energy > 0.0 {
                let n_he = plasma.f_he * n_h;
                let per_atom = 1.0 / (H_P * C * L_HE1_ION) + (1.0 - rates.peebles_he) / (H_P * C * L_HE_2P);
                dx_he -= energy * chi_ion / (n_he * expansion) * per_atom;
            }
            dy_dz[slot] = dx_he;
            slot += 1;
        }

        let mut dt = CT * t_rad.powi(4) * x / (1.0 + x + plasma.f_he) * (t_mat - t_rad) / expansion
            + 2.0 * t_mat / (1.0 + z);
        if energy > 0.0 {
            dt -= 2.0 / (3.0 * K_B) * energy * chi_heat / (n_h * (1.0 + plasma.f_he + x)) / expansion;
        }
        dy_dz[slot] = dt;

        if let Some(i) = dy_dz.iter().position(|d| !d.is_finite()) {
            return Err(ThermoError::NumericalDivergence {
                what: format!("derivative {i} of {:?} state is {}", shape, dy_dz[i]),
                z,
            });
        }
        Ok(())
    }
}

/// Heating and ionization shares of deposited energy.
pub fn deposition_fractions(x: f64) -> (f64, f64) {
    if x < 1.0 {
        ((1.0 + 2.0 * x) / 3.0, (1.0 - x) / 3.0)
    } else {
        (1.0, 0.0)
    }
}

/// ODE system over one schedule interval in `mz = −z`.
pub struct ThermoOde<'a> {
    eval: Evaluator<'a>,
}

impl<'a> ThermoOde<'a> {
    pub(crate) fn new(eval: Evaluator<'a>) -> Self {
        Self { eval }
    }
}

impl OdeSystem for ThermoOde<'_> {
    type Error = ThermoError;

    fn dim(&self) -> usize {
        self.eval.shape().dim()
    }

    fn rhs(&mut self, t: f64, y: &[f64], dydt: &mut [f64]) -> ThermoResult<()> {
        self.eval.derivatives(-t, y, dydt)?;
        for d in dydt.iter_mut() {
            *d = -*d;
        }
        Ok(())
    }

    fn is_retryable(&self, err: &ThermoError) -> bool {
        err.is_retryable()
    }
}
