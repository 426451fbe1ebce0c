//! Background model trait.

use crate::error::BackgroundResult;
use th_core::constants::{C, MPC_OVER_M};

/// Density parameters and temperatures today, shared by every background.
#[derive(Clone, Debug, PartialEq)]
pub struct Cosmology {
    /// Reduced Hubble constant
    pub h: f64,
    /// Hubble rate today [1/Mpc]
    pub h0: f64,
    /// Baryon density fraction Ω_b
    pub omega0_b: f64,
    /// Cold dark matter density fraction Ω_cdm
    pub omega0_cdm: f64,
    /// Photon density fraction Ω_γ
    pub omega0_g: f64,
    /// Total relativistic density fraction Ω_r (photons + massless neutrinos)
    pub omega0_r: f64,
    /// Cosmological constant fraction Ω_Λ
    pub omega0_lambda: f64,
    /// CMB temperature today [K]
    pub t_cmb: f64,
}

impl Cosmology {
    /// Hubble rate today [1/s]
    pub fn h0_si(&self) -> f64 {
        self.h0 * C / MPC_OVER_M
    }
}

/// Trait for expansion histories consumed by the thermal history.
///
/// Implementations must be thread-safe (Send + Sync) and side-effect free.
pub trait Background: Send + Sync {
    /// Model name (for logging).
    fn name(&self) -> &str;

    /// Density parameters today.
    fn cosmology(&self) -> &Cosmology;

    /// Hubble rate H(z) [1/Mpc].
    fn hubble(&self, z: f64) -> f64;

    /// Hubble rate H(z) [1/s].
    fn hubble_si(&self, z: f64) -> f64 {
        self.hubble(z) * C / MPC_OVER_M
    }

    /// Conformal time τ(z) [Mpc].
    fn conformal_time(&self, z: f64) -> BackgroundResult<f64>;

    /// Inverse of [`Background::conformal_time`].
    fn z_of_conformal_time(&self, tau: f64) -> BackgroundResult<f64>;

    /// Comoving sound horizon of the photon-baryon fluid at z [Mpc].
    fn sound_horizon(&self, z: f64) -> BackgroundResult<f64>;

    /// Conformal time today [Mpc].
    fn conformal_age(&self) -> f64;

    /// Comoving angular diameter distance to z [Mpc].
    fn comoving_angular_distance(&self, z: f64) -> BackgroundResult<f64> {
        Ok(self.conformal_age() - self.conformal_time(z)?)
    }

    /// R = 3ρ_b / 4ρ_γ at z.
    fn baryon_photon_ratio(&self, z: f64) -> f64 {
        let cosmo = self.cosmology();
        3.0 * cosmo.omega0_b / (4.0 * cosmo.omega0_g) / (1.0 + z)
    }
}
