//! Fast provider built on fitted recombination coefficients.

use crate::atomic::{alpha_h_case_b, alpha_he_verner_ferland, helium, hydrogen};
use crate::error::{RateError, RateResult};
use crate::model::{RateInput, RateProvider, Rates};

/// Fitted case-B coefficients with a fudged Peebles atom.
///
/// Helium is handled by its own equation, so the early helium stages are
/// tracked separately.
#[derive(Clone, Debug, PartialEq)]
pub struct AnalyticRates {
    /// Multiplier of the effective hydrogen recombination rate
    pub fudge_h: f64,
}

impl Default for AnalyticRates {
    fn default() -> Self {
        Self { fudge_h: 1.14 }
    }
}

impl AnalyticRates {
    pub fn new(fudge_h: f64) -> RateResult<Self> {
        if !(fudge_h.is_finite() && fudge_h > 0.0) {
            return Err(RateError::InvalidArg {
                what: "fudge_h must be positive",
            });
        }
        Ok(Self { fudge_h })
    }
}

pub(crate) fn check_input(input: &RateInput) -> RateResult<()> {
    if !(input.t_mat > 0.0 && input.t_rad > 0.0) {
        return Err(RateError::InvalidArg {
            what: "temperatures must be positive",
        });
    }
    if !(input.n_h > 0.0 && input.hubble > 0.0) {
        return Err(RateError::InvalidArg {
            what: "density and Hubble rate must be positive",
        });
    }
    Ok(())
}

impl RateProvider for AnalyticRates {
    fn name(&self) -> &str {
        "analytic"
    }

    fn requires_helium_tracking(&self) -> bool {
        true
    }

    fn rates(&self, input: &RateInput) -> RateResult<Rates> {
        check_input(input)?;
        let alpha_h = alpha_h_case_b(input.t_mat);
        let h = hydrogen(input, alpha_h, alpha_h_case_b(input.t_rad), self.fudge_h, 1.0);
        let alpha_he = alpha_he_verner_ferland(input.t_mat);
        let he = helium(input, alpha_he, alpha_he_verner_ferland(input.t_rad));

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
    fn tracks_helium() {
        let p = AnalyticRates::default();
        assert!(p.requires_helium_tracking());
        assert_eq!(p.name(), "analytic");
    }

    #[test]
    fn rejects_bad_inputs() {
        let p = AnalyticRates::default();
        let mut input = sample_input(1.0);
        input.hubble = 0.0;
        assert!(matches!(p.rates(&input), Err(RateError::InvalidArg { .. })));
        assert!(AnalyticRates::new(-1.0).is_err());
    }

    #[test]
    fn pure_for_equal_inputs() {
        let p = AnalyticRates::default();
        let input = sample_input(0.3);
        assert_eq!(p.rates(&input).unwrap(), p.rates(&input).unwrap());
    }

    #[test]
    fn larger_fudge_speeds_recombination() {
        let input = sample_input(0.5);
        let slow = AnalyticRates::new(1.0).unwrap().rates(&input).unwrap();
        let fast = AnalyticRates::new(1.14).unwrap().rates(&input).unwrap();
        assert!(fast.peebles_h > slow.peebles_h);
    }
}
