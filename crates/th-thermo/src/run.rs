//! One thermal history run, from the early fully ionized plasma to today.
//!
//! The run integrates the recombination history once down to the latest
//! allowed reionization start, keeps that state, and integrates the late
//! segment once per reionization trial before building the table.

use crate::derivs::{Evaluator, ThermoOde};
use crate::error::{ThermoError, ThermoResult};
use crate::history::ThermoHistory;
use crate::injection::EnergyInjection;
use crate::params::{Precision, ReionizationInput, ReionizationModel, ThermoParams};
use crate::reionization::ReionizationProfile;
use crate::saha::Plasma;
use crate::schedule::ApproximationSchedule;
use crate::shooting;
use crate::state::{Ionization, Shape, StateVector};
use crate::table::{self, TableInputs};
use th_background::Background;
use th_core::CubicSpline;
use th_evolve::{EvolveOptions, evolve};
use th_rates::RateProvider;
use tracing::{debug, info};

/// Build the thermal history of `background` with `rates`.
pub fn solve(
    background: &dyn Background,
    rates: &dyn RateProvider,
    params: &ThermoParams,
) -> ThermoResult<ThermoHistory> {
    ThermoRun::new(background, rates, params)?.solve()
}

/// Collaborators and precomputed constants shared by every integration of
/// one run.
pub struct ThermoRun<'a> {
    pub(crate) background: &'a dyn Background,
    pub(crate) rates: &'a dyn RateProvider,
    params: &'a ThermoParams,
    pub(crate) plasma: Plasma,
    pub(crate) injection: EnergyInjection,
    /// Increasing table redshifts
    grid: Vec<f64>,
    /// Grid index of `reionization_z_start_max`
    split: usize,
    recombination: ApproximationSchedule,
}

/// Integrated state at a segment boundary plus the blended fractions there.
#[derive(Clone, Copy, Debug)]
struct SegmentState {
    state: StateVector,
    carried: Ionization,
}

/// xe and Tb rows indexed like the grid.
#[derive(Clone, Debug)]
struct Rows {
    xe: Vec<f64>,
    tb: Vec<f64>,
}

impl Rows {
    fn new(n: usize) -> Self {
        Self {
            xe: vec![0.0; n],
            tb: vec![0.0; n],
        }
    }
}

/// Late rows of one reionization trial.
struct Reionized {
    rows: Rows,
    tau_reio: f64,
}

impl<'a> ThermoRun<'a> {
    /// Validate everything that can fail before integration.
    pub fn new(
        background: &'a dyn Background,
        rates: &'a dyn RateProvider,
        params: &'a ThermoParams,
    ) -> ThermoResult<Self> {
        params.validate()?;
        let precision = &params.precision;
        let cosmo = background.cosmology();
        let plasma = Plasma::new(cosmo, params.yhe);

        ReionizationProfile::z_start_of(&params.reionization, precision, plasma.f_he)?;
        if let ReionizationInput::OpticalDepth { .. } = params.reionization_input {
            shooting::bracket(&params.reionization, precision)?;
        }
        let recombination =
            ApproximationSchedule::build(precision, rates.requires_helium_tracking(), None, precision.z_initial)?;
        let injection = EnergyInjection::new(&params.heating, cosmo, plasma.n_h0, precision.z_initial)?;
        let grid = redshift_grid(precision);

        info!(
            background = background.name(),
            rates = rates.name(),
            yhe = params.yhe,
            f_he = plasma.f_he,
            rows = grid.len(),
            injection = injection.is_active(),
            "thermal history run prepared"
        );
        Ok(Self {
            background,
            rates,
            params,
            plasma,
            injection,
            grid,
            split: precision.nz_reio - 1,
            recombination,
        })
    }

    pub fn solve(&self) -> ThermoResult<ThermoHistory> {
        let precision = &self.params.precision;
        let n = self.grid.len();
        let z_split = self.grid[self.split];
        let mut rows = Rows::new(n);

        info!(z_initial = precision.z_initial, z_split, "integrating recombination");
        let upper: Vec<usize> = (self.split..n).rev().collect();
        let at_split = self.integrate(
            &self.recombination,
            None,
            self.initial_state(),
            (precision.z_initial, z_split),
            &upper,
            &mut rows,
        )?;

        // reionization-free reference for the ionization before reionization
        let lower: Vec<usize> = (0..self.split).rev().collect();
        self.integrate(&self.recombination, None, at_split, (z_split, 0.0), &lower, &mut rows)?;
        let x_rec = CubicSpline::new(self.grid[..=self.split].to_vec(), rows.xe[..=self.split].to_vec())?;

        let model = match self.params.reionization_input {
            ReionizationInput::Redshift => self.params.reionization.clone(),
            ReionizationInput::OpticalDepth { tau } => self.shoot(tau, at_split, &x_rec, &rows)?,
        };
        let reionized = self.reionize(&model, at_split, &x_rec, &rows)?;

        let (z_reio, tau_reio) = match reionized {
            Some(late) => {
                rows.xe[..self.split].copy_from_slice(&late.rows.xe[..self.split]);
                rows.tb[..self.split].copy_from_slice(&late.rows.tb[..self.split]);
                (central_redshift(&model), late.tau_reio)
            }
            None => (None, 0.0),
        };
        info!(model = model.name(), ?z_reio, tau_reio, "reionization applied");

        table::build(TableInputs {
            background: self.background,
            plasma: self.plasma,
            precision,
            z: self.grid.clone(),
            xe: rows.xe,
            tb: rows.tb,
            z_reio,
            tau_reio,
        })
    }

    fn initial_state(&self) -> SegmentState {
        let t_mat = self.plasma.t_rad(self.params.precision.z_initial);
        SegmentState {
            state: StateVector::TemperatureOnly { t_mat },
            carried: Ionization::FULL,
        }
    }

    fn evolve_options(&self, shape: Shape) -> EvolveOptions {
        let p = &self.params.precision;
        let mut atol = vec![p.atol_x; shape.dim() - 1];
        atol.push(p.atol_t);
        EvolveOptions {
            rtol: p.rtol,
            atol,
            max_steps: p.max_steps,
            ..EvolveOptions::default()
        }
    }

    /// Integrate from `z_hi` down to `z_lo` through the intervals of
    /// `schedule`, restarting the stepper at every boundary and filling the
    /// rows listed in `indices` (by decreasing redshift).
    fn integrate(
        &self,
        schedule: &ApproximationSchedule,
        profile: Option<&ReionizationProfile>,
        from: SegmentState,
        (z_hi, z_lo): (f64, f64),
        indices: &[usize],
        rows: &mut Rows,
    ) -> ThermoResult<SegmentState> {
        let first = schedule.locate(z_hi).ok_or(ThermoError::OutOfRange {
            z: z_hi,
            min: 0.0,
            max: schedule.z_initial(),
        })?;

        let mut current = from;
        let mut z_top = z_hi;
        for (index, interval) in schedule.intervals().iter().enumerate().skip(first) {
            if z_top <= z_lo {
                break;
            }
            let z_end = interval.z_end.max(z_lo);
            if z_end >= z_top {
                continue;
            }

            let shape = interval.regime.shape();
            let state = current.state.reshape(shape, &current.carried);
            let eval = Evaluator::new(self, schedule, index, current.carried, profile);

            let mut targets: Vec<(f64, Option<usize>)> = indices
                .iter()
                .map(|&i| (self.grid[i], Some(i)))
                .filter(|(z, _)| *z <= z_top && *z >= z_end)
                .collect();
            if targets.last().is_none_or(|(z, _)| *z > z_end) {
                targets.push((z_end, None));
            }
            let outputs: Vec<f64> = targets.iter().map(|(z, _)| -z).collect();

            let mut y = state.to_vec();
            let mut ode = ThermoOde::new(eval);
            let mut next = 0;
            let stats = evolve(&mut ode, &mut y, -z_top, &outputs, &self.evolve_options(shape), |_, y| {
                if let (z, Some(row)) = targets[next] {
                    let (xe, tb) = eval.observe(z, y)?;
                    rows.xe[row] = xe;
                    rows.tb[row] = tb;
                }
                next += 1;
                Ok(())
            })?;
            debug!(
                regime = ?interval.regime,
                z_top,
                z_end,
                accepted = stats.accepted,
                rejected = stats.rejected,
                retries = stats.retries,
                "interval integrated"
            );

            let state = StateVector::from_slice(shape, &y)?;
            current = SegmentState {
                state,
                carried: eval.ionization(z_end, &state),
            };
            z_top = z_end;
        }
        Ok(current)
    }

    /// Late segment under `model`, or `None` when it never reionizes.
    fn reionize(
        &self,
        model: &ReionizationModel,
        at_split: SegmentState,
        x_rec: &CubicSpline,
        reference: &Rows,
    ) -> ThermoResult<Option<Reionized>> {
        let precision = &self.params.precision;
        let f_he = self.plasma.f_he;
        let Some(z_start) = ReionizationProfile::z_start_of(model, precision, f_he)?.filter(|z| *z > 0.0) else {
            return Ok(None);
        };
        let xe_before = x_rec.eval(z_start)?;
        let Some(profile) = ReionizationProfile::new(model, precision, f_he, xe_before)? else {
            return Ok(None);
        };
        let schedule = ApproximationSchedule::build(
            precision,
            self.rates.requires_helium_tracking(),
            Some(z_start),
            precision.z_initial,
        )?;

        let z_split = self.grid[self.split];
        let mut rows = Rows::new(self.split + 1);
        rows.xe[self.split] = reference.xe[self.split];
        rows.tb[self.split] = reference.tb[self.split];
        let lower: Vec<usize> = (0..self.split).rev().collect();
        self.integrate(&schedule, Some(&profile), at_split, (z_split, 0.0), &lower, &mut rows)?;

        let z = &self.grid[..=self.split];
        let kappa = table::optical_depth(self.background, &self.plasma, z, &rows.xe)?;
        let tau_reio = CubicSpline::new(z.to_vec(), kappa)?.eval(z_start)?;
        debug!(model = model.name(), z_start, xe_before, tau_reio, "reionization trial");
        Ok(Some(Reionized { rows, tau_reio }))
    }

    /// Model whose free parameter reproduces the optical depth `target`.
    fn shoot(
        &self,
        target: f64,
        at_split: SegmentState,
        x_rec: &CubicSpline,
        reference: &Rows,
    ) -> ThermoResult<ReionizationModel> {
        let precision = &self.params.precision;
        let model = &self.params.reionization;
        let bracket = shooting::bracket(model, precision)?;
        info!(model = model.name(), target, ?bracket, "solving for the reionization optical depth");
        let shot = shooting::bisect(
            target,
            bracket,
            precision.shooting_tolerance,
            precision.shooting_max_iterations,
            |parameter| {
                let trial = shooting::with_parameter(model, parameter);
                Ok(self
                    .reionize(&trial, at_split, x_rec, reference)?
                    .map_or(0.0, |late| late.tau_reio))
            },
        )?;
        Ok(shooting::with_parameter(model, shot.parameter))
    }
}

/// Table redshifts, increasing: linear below the latest reionization start,
/// linear up to `z_linear`, logarithmic above.
pub(crate) fn redshift_grid(precision: &Precision) -> Vec<f64> {
    let split = precision.reionization_z_start_max;
    let mut z = th_core::linspace(0.0, split, precision.nz_reio);
    z.pop();
    let mut linear = th_core::linspace(split, precision.z_linear, precision.nz_linear);
    linear.pop();
    z.extend(linear);
    z.extend(th_core::logspace(precision.z_linear, precision.z_initial, precision.nz_log));
    z
}

/// Redshift reported as the reionization redshift.
fn central_redshift(model: &ReionizationModel) -> Option<f64> {
    match model {
        ReionizationModel::Camb { z_reio, .. } | ReionizationModel::HalfTanh { z_reio, .. } => Some(*z_reio),
        ReionizationModel::ManyTanh { z, .. } => z.last().copied(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_is_strictly_increasing_with_split_node() {
        let precision = Precision::default();
        let grid = redshift_grid(&precision);
        assert_eq!(grid.len(), 499 + 3999 + 400);
        assert_eq!(grid[0], 0.0);
        assert_eq!(grid[precision.nz_reio - 1], precision.reionization_z_start_max);
        assert_eq!(grid[grid.len() - 1], precision.z_initial);
        assert!(grid.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn central_redshift_by_model() {
        assert_eq!(central_redshift(&ReionizationModel::camb(7.7)), Some(7.7));
        assert_eq!(central_redshift(&ReionizationModel::None), None);
    }
}
