//! Rate provider trait and its input/output records.

use crate::error::{RateError, RateResult};

/// Local plasma state handed to a provider.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RateInput {
    /// Redshift
    pub z: f64,
    /// Matter temperature [K]
    pub t_mat: f64,
    /// Radiation temperature [K]
    pub t_rad: f64,
    /// Ionized hydrogen fraction
    pub x_h: f64,
    /// Singly ionized helium fraction (per helium nucleus)
    pub x_he: f64,
    /// Free electrons per hydrogen nucleus
    pub x: f64,
    /// Hydrogen number density [1/m^3]
    pub n_h: f64,
    /// Helium to hydrogen number ratio
    pub f_he: f64,
    /// Hubble rate [1/s]
    pub hubble: f64,
}

/// Coefficients and ionization derivatives at one point.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rates {
    /// Effective hydrogen recombination coefficient [m^3/s]
    pub alpha_h: f64,
    /// Hydrogen photo-ionization rate from n = 2 [1/s]
    pub beta_h: f64,
    /// Probability that an n = 2 hydrogen atom reaches the ground state
    pub peebles_h: f64,
    /// dx_H/dz
    pub dx_h_dz: f64,
    /// Effective HeI recombination coefficient [m^3/s]
    pub alpha_he: f64,
    /// HeI photo-ionization rate [1/s]
    pub beta_he: f64,
    /// Escape factor of excited HeI
    pub peebles_he: f64,
    /// dx_He/dz
    pub dx_he_dz: f64,
}

impl Rates {
    /// Reject NaN or infinite entries.
    pub fn ensure_finite(self, z: f64) -> RateResult<Self> {
        let fields = [
            ("alpha_h", self.alpha_h),
            ("beta_h", self.beta_h),
            ("peebles_h", self.peebles_h),
            ("dx_h_dz", self.dx_h_dz),
            ("alpha_he", self.alpha_he),
            ("beta_he", self.beta_he),
            ("peebles_he", self.peebles_he),
            ("dx_he_dz", self.dx_he_dz),
        ];
        for (what, v) in fields {
            if !v.is_finite() {
                return Err(RateError::NonFinite { what, z });
            }
        }
        Ok(self)
    }
}

/// Trait for recombination rate providers.
///
/// Implementations must be thread-safe (Send + Sync) and pure: equal inputs
/// give equal outputs.
pub trait RateProvider: Send + Sync {
    /// Provider name (for logging).
    fn name(&self) -> &str;

    /// Whether the early helium recombination stages must be integrated
    /// separately from hydrogen.
    fn requires_helium_tracking(&self) -> bool;

    /// Evaluate rates at one point.
    fn rates(&self, input: &RateInput) -> RateResult<Rates>;
}
