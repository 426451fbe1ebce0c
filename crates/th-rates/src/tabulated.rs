//! Provider interpolating recombination coefficients from a temperature table.

use crate::analytic::check_input;
use crate::atomic::{alpha_h_case_b, alpha_he_verner_ferland, helium, hydrogen};
use crate::error::{RateError, RateResult};
use crate::model::{RateInput, RateProvider, Rates};
use th_core::numeric::{ensure_strictly_increasing, logspace};
use th_core::spline::CubicSpline;
use tracing::debug;

/// Two-Gaussian correction to the Lyman-alpha escape factor in ln(1+z).
#[derive(Clone, Debug, PartialEq)]
pub struct EscapeCorrection {
    pub amplitude_1: f64,
    pub amplitude_2: f64,
    pub center_1: f64,
    pub center_2: f64,
    pub width_1: f64,
    pub width_2: f64,
}

impl Default for EscapeCorrection {
    fn default() -> Self {
        Self {
            amplitude_1: -0.14,
            amplitude_2: 0.079,
            center_1: 7.28,
            center_2: 6.73,
            width_1: 0.18,
            width_2: 0.33,
        }
    }
}

impl EscapeCorrection {
    /// Multiplicative factor on the redshifting rate at z.
    pub fn factor(&self, z: f64) -> f64 {
        let l = (1.0 + z).ln();
        let g1 = ((l - self.center_1) / self.width_1).powi(2);
        let g2 = ((l - self.center_2) / self.width_2).powi(2);
        1.0 + self.amplitude_1 * (-g1).exp() + self.amplitude_2 * (-g2).exp()
    }
}

/// Coefficients from cubic splines of ln α against ln T.
///
/// Hydrogen and helium are integrated together from the start, so no early
/// helium stages are needed.
#[derive(Clone, Debug)]
pub struct TabulatedRates {
    ln_alpha_h: CubicSpline,
    ln_alpha_he: CubicSpline,
    fudge_h: f64,
    correction: Option<EscapeCorrection>,
}

const TABLE_T_MIN: f64 = 1.0e-3;
const TABLE_T_MAX: f64 = 1.0e9;
const TABLE_POINTS: usize = 361;

impl TabulatedRates {
    /// Table sampled from the case-B and Verner-Ferland fits.
    pub fn new() -> RateResult<Self> {
        let temps = logspace(TABLE_T_MIN, TABLE_T_MAX, TABLE_POINTS);
        let alpha_h: Vec<f64> = temps.iter().map(|&t| alpha_h_case_b(t)).collect();
        let alpha_he: Vec<f64> = temps.iter().map(|&t| alpha_he_verner_ferland(t)).collect();
        Self::from_table(&temps, &alpha_h, &alpha_he)
    }

    /// Build from user-supplied coefficients [m^3/s] on an increasing temperature grid [K].
    pub fn from_table(temperatures: &[f64], alpha_h: &[f64], alpha_he: &[f64]) -> RateResult<Self> {
        if temperatures.len() < 3 {
            return Err(RateError::InvalidArg {
                what: "rate table needs at least three temperatures",
            });
        }
        if alpha_h.len() != temperatures.len() || alpha_he.len() != temperatures.len() {
            return Err(RateError::InvalidArg {
                what: "rate table columns differ in length",
            });
        }
        ensure_strictly_increasing(temperatures, "rate table temperature")?;
        if temperatures[0] <= 0.0 || alpha_h.iter().chain(alpha_he).any(|a| !(*a > 0.0)) {
            return Err(RateError::InvalidArg {
                what: "rate table entries must be positive",
            });
        }

        let ln_t: Vec<f64> = temperatures.iter().map(|t| t.ln()).collect();
        debug!(
            points = temperatures.len(),
            t_min = temperatures[0],
            t_max = temperatures[temperatures.len() - 1],
            "rate table built"
        );
        Ok(Self {
            ln_alpha_h: CubicSpline::new(ln_t.clone(), alpha_h.iter().map(|a| a.ln()).collect())?,
            ln_alpha_he: CubicSpline::new(ln_t, alpha_he.iter().map(|a| a.ln()).collect())?,
            fudge_h: 1.125,
            correction: Some(EscapeCorrection::default()),
        })
    }

    pub fn with_fudge(mut self, fudge_h: f64) -> Self {
        self.fudge_h = fudge_h;
        self
    }

    pub fn with_correction(mut self, correction: Option<EscapeCorrection>) -> Self {
        self.correction = correction;
        self
    }

    fn lookup(&self, spline: &CubicSpline, t: f64) -> RateResult<f64> {
        let lt = t.ln();
        if !(lt >= spline.x_min() && lt <= spline.x_max()) {
            return Err(RateError::OutOfRange {
                what: "temperature",
                value: t,
                min: spline.x_min().exp(),
                max: spline.x_max().exp(),
            });
        }
        Ok(spline.eval(lt)?.exp())
    }
}

impl RateProvider for TabulatedRates {
    fn name(&self) -> &str {
        "tabulated"
    }

    fn requires_helium_tracking(&self) -> bool {
        false
    }

    fn rates(&self, input: &RateInput) -> RateResult<Rates> {
        check_input(input)?;
        let k_correction = self.correction.as_ref().map_or(1.0, |c| c.factor(input.z));

        let alpha_h = self.lookup(&self.ln_alpha_h, input.t_mat)?;
        let alpha_h_rad = self.lookup(&self.ln_alpha_h, input.t_rad)?;
        let h = hydrogen(input, alpha_h, alpha_h_rad, self.fudge_h, k_correction);

        let alpha_he = self.lookup(&self.ln_alpha_he, input.t_mat)?;
        let alpha_he_rad = self.lookup(&self.ln_alpha_he, input.t_rad)?;
        let he = helium(input, alpha_he, alpha_he_rad);

        Rates {
            alpha_h,
            beta_h: h.beta,
            peebles_h: h.peebles,
            dx_h_dz: h.dx_dz,
            alpha_he,
            beta_he: he.beta,
            peebles_he: he.peebles,
            dx_he_dz: he.dx_dz,
        }
        .ensure_finite(input.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atomic::tests::sample_input;

    #[test]
    fn table_reproduces_fit_between_nodes() {
        let p = TabulatedRates::new().unwrap();
        for t in [0.37, 12.5, 3.3e3, 7.77e4, 2.0e7] {
            let a = p.lookup(&p.ln_alpha_h, t).unwrap();
            let exact = alpha_h_case_b(t);
            assert!((a - exact).abs() / exact < 1e-5, "T = {t}");
        }
    }

    #[test]
    fn correction_vanishes_far_from_recombination() {
        let c = EscapeCorrection::default();
        assert!((c.factor(0.0) - 1.0).abs() < 1e-12);
        assert!((c.factor(1.0e5) - 1.0).abs() < 1e-6);
        // the negative Gaussian dominates near z ~ 1450
        assert!(c.factor(1450.0) < 1.0);
    }

    #[test]
    fn temperature_outside_table_is_reported() {
        let p = TabulatedRates::new().unwrap();
        let mut input = sample_input(1.0);
        input.t_mat = 1.0e-5;
        assert!(matches!(p.rates(&input), Err(RateError::OutOfRange { .. })));
    }

    #[test]
    fn rejects_malformed_tables() {
        let t = [1.0, 2.0, 2.0, 3.0];
        let a = [1.0, 1.0, 1.0, 1.0];
        assert!(TabulatedRates::from_table(&t, &a, &a).is_err());
        assert!(TabulatedRates::from_table(&[1.0, 2.0], &a[..2], &a[..2]).is_err());
        assert!(TabulatedRates::from_table(&[1.0, 2.0, 3.0], &[1.0, -1.0, 1.0], &a[..3]).is_err());
    }

    #[test]
    fn does_not_track_helium_separately() {
        assert!(!TabulatedRates::new().unwrap().requires_helium_tracking());
    }
}
