//! Physical constants (SI) shared by the background, the rate providers and
//! the thermal history.

/// Speed of light [m/s]
pub const C: f64 = 2.99792458e8;
/// Newton constant [m^3/kg/s^2]
pub const G: f64 = 6.67428e-11;
/// Planck constant [J s]
pub const H_P: f64 = 6.62606896e-34;
/// Boltzmann constant [J/K]
pub const K_B: f64 = 1.3806504e-23;
/// Megaparsec [m]
pub const MPC_OVER_M: f64 = 3.085677581282e22;
/// Stefan-Boltzmann constant [W/m^2/K^4]
pub const SIGMA_B: f64 = 5.670400e-8;

/// Electron mass [kg]
pub const M_E: f64 = 9.10938215e-31;
/// Proton mass [kg]
pub const M_P: f64 = 1.672621637e-27;
/// Hydrogen atom mass [kg]
pub const M_H: f64 = 1.673575e-27;
/// Helium to hydrogen mass ratio
pub const NOT4: f64 = 3.9715;
/// Thomson cross-section [m^2]
pub const SIGMA_T: f64 = 6.6524616e-29;
/// Radiation constant a = 4 sigma_B / c [J/m^3/K^4]
pub const A_RAD: f64 = 4.0 * SIGMA_B / C;

/// Hydrogen ionization wavenumber [1/m]
pub const L_H_ION: f64 = 1.096787737e7;
/// Hydrogen Lyman-alpha wavenumber [1/m]
pub const L_H_ALPHA: f64 = 8.225916453e6;
/// Hydrogen 2s-1s two-photon rate [1/s]
pub const LAMBDA_H_2S1S: f64 = 8.2245809;

/// Neutral helium ionization wavenumber [1/m]
pub const L_HE1_ION: f64 = 1.98310772e7;
/// Singly ionized helium ionization wavenumber [1/m]
pub const L_HE2_ION: f64 = 4.389088863e7;
/// Helium 2s wavenumber [1/m]
pub const L_HE_2S: f64 = 1.66277434e7;
/// Helium 2p wavenumber [1/m]
pub const L_HE_2P: f64 = 1.71134891e7;
/// Helium 2s-1s two-photon rate [1/s]
pub const LAMBDA_HE_2S1S: f64 = 51.3;

/// Allowed primordial helium fraction range
pub const YHE_SMALL: f64 = 0.01;
pub const YHE_BIG: f64 = 0.5;

/// Bounds for the located recombination redshift
pub const Z_REC_MIN: f64 = 500.0;
pub const Z_REC_MAX: f64 = 2000.0;

/// Number density of helium relative to hydrogen for a helium mass fraction.
pub fn helium_to_hydrogen(yhe: f64) -> f64 {
    yhe / (NOT4 * (1.0 - yhe))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helium_ratio_for_standard_yhe() {
        let f_he = helium_to_hydrogen(0.245);
        assert!((f_he - 0.0817).abs() < 1e-3);
    }

    #[test]
    fn radiation_constant_matches_reference() {
        assert!((A_RAD - 7.5657e-16).abs() / 7.5657e-16 < 1e-3);
    }
}
