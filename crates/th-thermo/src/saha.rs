//! Saha equilibrium fractions and the plasma constants they need.

use th_background::Cosmology;
use th_core::constants::{G, M_H, helium_to_hydrogen};
use th_rates::atomic::{CB1_H, CB1_HE1, CB1_HE2, CR};

/// Composition and radiation temperature of the baryon-photon plasma.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plasma {
    /// Helium mass fraction
    pub yhe: f64,
    /// Helium to hydrogen number ratio
    pub f_he: f64,
    /// Hydrogen number density today [1/m^3]
    pub n_h0: f64,
    /// Radiation temperature today [K]
    pub t_cmb: f64,
}

impl Plasma {
    pub fn new(cosmo: &Cosmology, yhe: f64) -> Self {
        let h0 = cosmo.h0_si();
        let rho_crit = 3.0 * h0 * h0 / (8.0 * std::f64::consts::PI * G);
        Self {
            yhe,
            f_he: helium_to_hydrogen(yhe),
            n_h0: rho_crit * cosmo.omega0_b * (1.0 - yhe) / M_H,
            t_cmb: cosmo.t_cmb,
        }
    }

    pub fn n_h(&self, z: f64) -> f64 {
        self.n_h0 * (1.0 + z).powi(3)
    }

    pub fn t_rad(&self, z: f64) -> f64 {
        self.t_cmb * (1.0 + z)
    }

    /// Doubly ionized fraction of helium, hydrogen and HeII fully ionized.
    pub fn he_iii(&self, z: f64) -> f64 {
        let rhs = self.boltzmann(z, CB1_HE2, 1.0);
        quadratic_fraction(1.0 + self.f_he, self.f_he, rhs)
    }

    /// Singly ionized fraction of helium, hydrogen fully ionized.
    pub fn he_ii(&self, z: f64) -> f64 {
        let rhs = self.boltzmann(z, CB1_HE1, 4.0);
        quadratic_fraction(1.0, self.f_he, rhs)
    }

    /// Ionized hydrogen fraction given the electrons per hydrogen nucleus
    /// already supplied by helium.
    pub fn hydrogen(&self, z: f64, helium_electrons: f64) -> f64 {
        let rhs = self.boltzmann(z, CB1_H, 1.0);
        quadratic_fraction(helium_electrons, 1.0, rhs)
    }

    /// Saha right-hand side per hydrogen nucleus at the radiation temperature.
    fn boltzmann(&self, z: f64, threshold: f64, weight: f64) -> f64 {
        let t = self.t_rad(z);
        weight * (1.5 * (CR * t).ln() - threshold / t).exp() / self.n_h(z)
    }
}

/// Root in [0, 1] of `b y² + (a + rhs) y − rhs = 0`.
///
/// Written without cancellation so it stays accurate for both tiny and
/// huge `rhs`.
fn quadratic_fraction(a: f64, b: f64, rhs: f64) -> f64 {
    if !rhs.is_finite() {
        return 1.0;
    }
    if rhs <= 0.0 {
        return 0.0;
    }
    let p = a + rhs;
    (2.0 * rhs / (p + (p * p + 4.0 * b * rhs).sqrt())).clamp(0.0, 1.0)
}
