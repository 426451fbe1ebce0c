//! Flat ΛCDM background with tabulated conformal time and sound horizon.

use crate::error::{BackgroundError, BackgroundResult};
use crate::model::{Background, Cosmology};
use serde::{Deserialize, Serialize};
use th_core::constants::{C, G, MPC_OVER_M, SIGMA_B};
use th_core::spline::CubicSpline;
use th_core::units::{Temperature, k, kelvin};

/// Smallest tabulated scale factor; below it radiation + matter is exact.
const A_MIN: f64 = 1e-9;
/// Number of ln(a) nodes in the tables.
const N_TABLE: usize = 3000;

/// User-facing ΛCDM parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LcdmParams {
    /// Reduced Hubble constant h = H0 / (100 km/s/Mpc)
    #[serde(default = "default_h")]
    pub h: f64,
    /// Physical baryon density ω_b = Ω_b h²
    #[serde(default = "default_omega_b")]
    pub omega_b: f64,
    /// Physical cold dark matter density ω_cdm = Ω_cdm h²
    #[serde(default = "default_omega_cdm")]
    pub omega_cdm: f64,
    /// CMB temperature today
    #[serde(default = "default_t_cmb")]
    pub t_cmb: Temperature,
    /// Effective number of massless neutrino species
    #[serde(default = "default_n_eff")]
    pub n_eff: f64,
}

fn default_h() -> f64 {
    0.6732
}

fn default_omega_b() -> f64 {
    0.02238
}

fn default_omega_cdm() -> f64 {
    0.1201
}

fn default_t_cmb() -> Temperature {
    k(2.7255)
}

fn default_n_eff() -> f64 {
    3.046
}

impl Default for LcdmParams {
    fn default() -> Self {
        Self {
            h: default_h(),
            omega_b: default_omega_b(),
            omega_cdm: default_omega_cdm(),
            t_cmb: default_t_cmb(),
            n_eff: default_n_eff(),
        }
    }
}

/// Flat ΛCDM model.
#[derive(Clone, Debug)]
pub struct Lcdm {
    cosmo: Cosmology,
    omega0_m: f64,
    /// R = r0 * a
    r0: f64,
    /// τ(ln a)
    tau: CubicSpline,
    /// r_s(ln a)
    rs: CubicSpline,
    /// ln a(τ)
    ln_a: CubicSpline,
    age: f64,
}

impl Lcdm {
    pub fn new(params: &LcdmParams) -> BackgroundResult<Self> {
        let t_cmb = kelvin(params.t_cmb);
        check(params.h.is_finite() && params.h > 0.0 && params.h < 2.0, "h must lie in (0, 2)")?;
        check(params.omega_b.is_finite() && params.omega_b > 0.0, "omega_b must be positive")?;
        check(params.omega_cdm.is_finite() && params.omega_cdm >= 0.0, "omega_cdm must be non-negative")?;
        check(t_cmb.is_finite() && t_cmb > 0.0, "T_cmb must be positive")?;
        check(params.n_eff.is_finite() && params.n_eff >= 0.0, "N_eff must be non-negative")?;

        let h0_si = params.h * 1e5 / MPC_OVER_M;
        let rho_crit = 3.0 * h0_si * h0_si / (8.0 * std::f64::consts::PI * G);
        let rho_g = 4.0 * SIGMA_B * t_cmb.powi(4) / C.powi(3);
        let omega0_g = rho_g / rho_crit;
        let omega0_r = omega0_g * (1.0 + params.n_eff * 7.0 / 8.0 * (4.0_f64 / 11.0).powf(4.0 / 3.0));
        let h2 = params.h * params.h;
        let omega0_b = params.omega_b / h2;
        let omega0_cdm = params.omega_cdm / h2;
        let omega0_m = omega0_b + omega0_cdm;
        let omega0_lambda = 1.0 - omega0_m - omega0_r;
        check(omega0_lambda >= 0.0, "matter and radiation exceed the critical density")?;

        let cosmo = Cosmology {
            h: params.h,
            h0: params.h * 1e5 / C,
            omega0_b,
            omega0_cdm,
            omega0_g,
            omega0_r,
            omega0_lambda,
            t_cmb,
        };
        let r0 = 3.0 * omega0_b / (4.0 * omega0_g);

        let dtau_du = |u: f64| {
            let a = u.exp();
            1.0 / (cosmo.h0 * (omega0_r / (a * a) + omega0_m / a + omega0_lambda * a * a).sqrt())
        };
        let drs_du = |u: f64| dtau_du(u) / (3.0 * (1.0 + r0 * u.exp())).sqrt();

        let u_min = A_MIN.ln();
        let step = -u_min / (N_TABLE - 1) as f64;
        let u: Vec<f64> = (0..N_TABLE)
            .map(|i| if i == N_TABLE - 1 { 0.0 } else { u_min + step * i as f64 })
            .collect();

        let tau_min = 2.0 / (cosmo.h0 * omega0_m) * ((omega0_r + omega0_m * A_MIN).sqrt() - omega0_r.sqrt());
        let mut tau = Vec::with_capacity(N_TABLE);
        let mut rs = Vec::with_capacity(N_TABLE);
        tau.push(tau_min);
        rs.push(tau_min / 3.0_f64.sqrt());
        for i in 0..N_TABLE - 1 {
            tau.push(tau[i] + simpson(&dtau_du, u[i], u[i + 1]));
            rs.push(rs[i] + simpson(&drs_du, u[i], u[i + 1]));
        }
        let age = tau[N_TABLE - 1];

        Ok(Self {
            cosmo,
            omega0_m,
            r0,
            ln_a: CubicSpline::new(tau.clone(), u.clone())?,
            tau: CubicSpline::new(u.clone(), tau)?,
            rs: CubicSpline::new(u, rs)?,
            age,
        })
    }

    /// Total matter fraction Ω_m.
    pub fn omega0_m(&self) -> f64 {
        self.omega0_m
    }

    fn ln_a_of_z(&self, z: f64) -> BackgroundResult<f64> {
        let z_max = 1.0 / A_MIN - 1.0;
        if !(0.0..=z_max).contains(&z) {
            return Err(BackgroundError::OutOfRange {
                what: "redshift",
                value: z,
                min: 0.0,
                max: z_max,
            });
        }
        Ok(-(1.0 + z).ln())
    }
}

fn check(ok: bool, what: &str) -> BackgroundResult<()> {
    if ok {
        Ok(())
    } else {
        Err(BackgroundError::InvalidParam {
            what: what.to_string(),
        })
    }
}

fn simpson(f: &impl Fn(f64) -> f64, a: f64, b: f64) -> f64 {
    (b - a) / 6.0 * (f(a) + 4.0 * f(0.5 * (a + b)) + f(b))
}

impl Background for Lcdm {
    fn name(&self) -> &str {
        "flat-lcdm"
    }

    fn cosmology(&self) -> &Cosmology {
        &self.cosmo
    }

    fn hubble(&self, z: f64) -> f64 {
        let zp1 = 1.0 + z;
        let c = &self.cosmo;
        c.h0 * (c.omega0_r * zp1.powi(4) + self.omega0_m * zp1.powi(3) + c.omega0_lambda).sqrt()
    }

    fn conformal_time(&self, z: f64) -> BackgroundResult<f64> {
        let u = self.ln_a_of_z(z)?;
        Ok(self.tau.eval(u)?)
    }

    fn z_of_conformal_time(&self, tau: f64) -> BackgroundResult<f64> {
        let u = self.ln_a.eval(tau).map_err(|_| BackgroundError::OutOfRange {
            what: "conformal time",
            value: tau,
            min: self.ln_a.x_min(),
            max: self.ln_a.x_max(),
        })?;
        Ok((-u).exp() - 1.0)
    }

    fn sound_horizon(&self, z: f64) -> BackgroundResult<f64> {
        let u = self.ln_a_of_z(z)?;
        Ok(self.rs.eval(u)?)
    }

    fn conformal_age(&self) -> f64 {
        self.age
    }

    fn baryon_photon_ratio(&self, z: f64) -> f64 {
        self.r0 / (1.0 + z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planck() -> Lcdm {
        Lcdm::new(&LcdmParams::default()).unwrap()
    }

    #[test]
    fn photon_density_matches_reference() {
        let bg = planck();
        let c = bg.cosmology();
        let omega_g_h2 = c.omega0_g * c.h * c.h;
        assert!((omega_g_h2 - 2.473e-5).abs() / 2.473e-5 < 2e-3);
        let total = c.omega0_r + bg.omega0_m() + c.omega0_lambda;
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn hubble_today_is_h0() {
        let bg = planck();
        assert!((bg.hubble(0.0) - bg.cosmology().h0).abs() < 1e-15);
        assert!((bg.hubble_si(0.0) - bg.cosmology().h0_si()).abs() / bg.cosmology().h0_si() < 1e-12);
    }

    #[test]
    fn conformal_age_is_about_fourteen_gpc() {
        let age = planck().conformal_age();
        assert!(age > 13_500.0 && age < 14_800.0, "age = {age}");
    }

    #[test]
    fn sound_horizon_near_drag_epoch() {
        let rs = planck().sound_horizon(1060.0).unwrap();
        assert!(rs > 135.0 && rs < 160.0, "rs = {rs}");
    }

    #[test]
    fn conformal_time_inverts() {
        let bg = planck();
        for z in [0.5, 10.0, 1089.0, 3.0e4, 4.0e6] {
            let tau = bg.conformal_time(z).unwrap();
            let back = bg.z_of_conformal_time(tau).unwrap();
            assert!((back - z).abs() / (1.0 + z) < 1e-6, "z = {z}, back = {back}");
        }
    }

    #[test]
    fn radiation_era_is_linear_in_scale_factor() {
        let bg = planck();
        let c = bg.cosmology();
        let z = 1.0e7;
        let expected = 1.0 / ((1.0 + z) * c.h0 * c.omega0_r.sqrt());
        let tau = bg.conformal_time(z).unwrap();
        assert!((tau - expected).abs() / expected < 1e-2);
    }

    #[test]
    fn rejects_negative_redshift_and_bad_params() {
        let bg = planck();
        assert!(matches!(
            bg.conformal_time(-0.5),
            Err(BackgroundError::OutOfRange { .. })
        ));
        let bad = LcdmParams {
            h: -1.0,
            ..LcdmParams::default()
        };
        assert!(Lcdm::new(&bad).is_err());
    }
}
