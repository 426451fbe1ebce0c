//! Exotic energy injection from dark matter annihilation and decay.

use crate::error::{ThermoError, ThermoResult};
use crate::params::HeatingParameters;
use th_background::Cosmology;
use th_core::constants::{C, G, SIGMA_T};
use th_core::{CubicSpline, erfc};
use tracing::debug;

/// Nodes of the deposition table in ln(1+z).
const N_DEPOSITION: usize = 200;
/// Kernel tail below which the deposition integral is truncated.
const KERNEL_CUTOFF: f64 = -50.0;

/// Energy injection rate per unit volume [J/m^3/s].
#[derive(Clone, Debug)]
pub struct EnergyInjection {
    heating: HeatingParameters,
    /// Cold dark matter energy density today [J/m^3]
    rho_cdm0: f64,
    /// Delayed deposition, ln(injected rate) against ln(1+z)
    deposition: Option<CubicSpline>,
}

impl EnergyInjection {
    /// `n_h0` is the hydrogen density today [1/m^3]; the deposition table for
    /// non-local injection covers `[0, z_max]`.
    pub fn new(heating: &HeatingParameters, cosmo: &Cosmology, n_h0: f64, z_max: f64) -> ThermoResult<Self> {
        heating.validate()?;
        let h0 = cosmo.h0_si();
        let rho_cdm0 = 3.0 * h0 * h0 / (8.0 * std::f64::consts::PI * G) * cosmo.omega0_cdm * C * C;
        let mut injection = Self {
            heating: heating.clone(),
            rho_cdm0,
            deposition: None,
        };
        if heating.is_active() && !heating.on_the_spot {
            let omega0_m = cosmo.omega0_b + cosmo.omega0_cdm;
            let factor = SIGMA_T * n_h0 * C / h0 / omega0_m.sqrt();
            injection.deposition = Some(injection.deposition_table(factor, z_max)?);
            debug!(factor, z_max, "tabulated delayed energy deposition");
        }
        Ok(injection)
    }

    pub fn is_active(&self) -> bool {
        self.heating.is_active()
    }

    /// Annihilation efficiency at `z`, a parabola in ln(1+z) capped at
    /// `annihilation_zmax` and frozen below `annihilation_zmin`.
    pub fn annihilation_at(&self, z: f64) -> f64 {
        let h = &self.heating;
        if h.annihilation_variation == 0.0 {
            return h.annihilation;
        }
        let log_ratio = |zz: f64| ((1.0 + zz) / (1.0 + h.annihilation_zmax)).ln();
        let reference = -log_ratio(h.annihilation_z).powi(2);
        let shape = if z > h.annihilation_zmax {
            0.0
        } else if z > h.annihilation_zmin {
            log_ratio(z).powi(2)
        } else {
            log_ratio(h.annihilation_zmin).powi(2)
        };
        h.annihilation * (h.annihilation_variation * (reference + shape)).exp()
    }

    /// Rate injected locally at `z`.
    pub fn on_the_spot_rate(&self, z: f64) -> f64 {
        let h = &self.heating;
        let a3 = (1.0 + z).powi(3);
        let halo = h.annihilation * h.annihilation_f_halo * erfc((1.0 + z) / (1.0 + h.annihilation_z_halo));
        let annihilation = self.rho_cdm0 * self.rho_cdm0 / (C * C) * a3 * (a3 * self.annihilation_at(z) + halo);
        annihilation + self.rho_cdm0 * a3 * h.decay
    }

    /// Rate deposited in the gas at `z`.
    pub fn rate(&self, z: f64) -> ThermoResult<f64> {
        if !self.is_active() {
            return Ok(0.0);
        }
        match &self.deposition {
            None => Ok(self.on_the_spot_rate(z)),
            Some(table) => {
                let ln_rate = table.eval((1.0 + z).ln()).map_err(ThermoError::from)?;
                Ok(ln_rate.exp())
            }
        }
    }

    /// Deposition delayed by the photon mean free path:
    /// `∫_z dz' f (1+z)^8 / (1+z')^7.5 exp(2/3 f ((1+z)^1.5 − (1+z')^1.5)) E(z')`.
    fn deposition_table(&self, factor: f64, z_max: f64) -> ThermoResult<CubicSpline> {
        let v_max = (1.0 + z_max).ln();
        let nodes = th_core::linspace(0.0, v_max, N_DEPOSITION);
        let mut ln_rates = Vec::with_capacity(nodes.len());
        for &v in &nodes {
            let rate = self.deposited(factor, v, v_max);
            if !(rate.is_finite() && rate > 0.0) {
                return Err(ThermoError::NumericalDivergence {
                    what: "delayed energy deposition".into(),
                    z: v.exp() - 1.0,
                });
            }
            ln_rates.push(rate.ln());
        }
        Ok(CubicSpline::new(nodes, ln_rates)?)
    }

    /// Trapezoid quadrature in v' = ln(1+z'), step set by the kernel decay.
    fn deposited(&self, factor: f64, v: f64, v_max: f64) -> f64 {
        let opz = v.exp();
        let kernel = |vp: f64| {
            let opzp = vp.exp();
            let exponent = 2.0 / 3.0 * factor * (opz.powf(1.5) - opzp.powf(1.5));
            let weight = factor * opz.powi(8) / opzp.powf(7.5) * exponent.exp();
            // dz' = (1+z') dv'
            (weight * self.on_the_spot_rate(opzp - 1.0) * opzp, exponent)
        };

        let (mut f_prev, _) = kernel(v);
        let mut vp = v;
        let mut total = 0.0;
        while vp < v_max {
            let dv = (0.1 / (factor * vp.exp().powf(1.5))).min(0.01).min(v_max - vp);
            vp += dv;
            let (f, exponent) = kernel(vp);
            total += 0.5 * dv * (f + f_prev);
            f_prev = f;
            if exponent < KERNEL_CUTOFF {
                break;
            }
        }
        // the top node has no room left to integrate
        if total > 0.0 { total } else { self.on_the_spot_rate(opz - 1.0) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosmo() -> Cosmology {
        let h = 0.6732;
        Cosmology {
            h,
            h0: h / 2997.92458,
            omega0_b: 0.02238 / h / h,
            omega0_cdm: 0.1201 / h / h,
            omega0_g: 5.4e-5,
            omega0_r: 9.2e-5,
            omega0_lambda: 0.685,
            t_cmb: 2.7255,
        }
    }

    #[test]
    fn disabled_injects_nothing() {
        let inj = EnergyInjection::new(&HeatingParameters::default(), &cosmo(), 0.19, 5e6).unwrap();
        assert!(!inj.is_active());
        assert_eq!(inj.rate(1000.0).unwrap(), 0.0);
    }

    #[test]
    fn annihilation_scales_as_density_squared() {
        let heating = HeatingParameters {
            annihilation: 1e-6,
            ..HeatingParameters::default()
        };
        let inj = EnergyInjection::new(&heating, &cosmo(), 0.19, 5e6).unwrap();
        let ratio = inj.rate(1999.0).unwrap() / inj.rate(999.0).unwrap();
        assert!((ratio - 64.0).abs() < 1e-9, "ratio = {ratio}");
    }

    #[test]
    fn decay_scales_as_density() {
        let heating = HeatingParameters {
            decay: 1e-24,
            ..HeatingParameters::default()
        };
        let inj = EnergyInjection::new(&heating, &cosmo(), 0.19, 5e6).unwrap();
        let ratio = inj.rate(1999.0).unwrap() / inj.rate(999.0).unwrap();
        assert!((ratio - 8.0).abs() < 1e-9);
    }

    #[test]
    fn variation_peaks_at_zmax() {
        let heating = HeatingParameters {
            annihilation: 1e-6,
            annihilation_variation: -0.5,
            ..HeatingParameters::default()
        };
        let inj = EnergyInjection::new(&heating, &cosmo(), 0.19, 5e6).unwrap();
        assert!((inj.annihilation_at(1000.0) - 1e-6).abs() < 1e-18);
        assert!(inj.annihilation_at(2500.0) > 1e-6);
        assert_eq!(inj.annihilation_at(2500.0), inj.annihilation_at(4000.0));
        assert_eq!(inj.annihilation_at(10.0), inj.annihilation_at(30.0));
    }

    #[test]
    fn delayed_deposition_approaches_local_at_high_z() {
        let heating = HeatingParameters {
            annihilation: 1e-6,
            on_the_spot: false,
            ..HeatingParameters::default()
        };
        let inj = EnergyInjection::new(&heating, &cosmo(), 0.19, 5e6).unwrap();
        let z = 1500.0;
        let delayed = inj.rate(z).unwrap();
        let local = inj.on_the_spot_rate(z);
        assert!((delayed / local - 1.0).abs() < 0.1, "{delayed} vs {local}");
        assert!(inj.rate(0.0).unwrap() > 0.0);
    }
}
