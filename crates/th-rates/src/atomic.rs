//! Atomic constants and the three-level-atom kernels shared by providers.

use crate::model::RateInput;
use std::f64::consts::PI;
use th_core::constants::{
    C, H_P, K_B, L_H_ALPHA, L_H_ION, L_HE_2P, L_HE_2S, L_HE1_ION, L_HE2_ION, LAMBDA_H_2S1S,
    LAMBDA_HE_2S1S, M_E,
};

/// h c / k_B [m K]
pub const HC_OVER_K: f64 = H_P * C / K_B;
/// 2π m_e k_B / h² [1/(m² K)]
pub const CR: f64 = 2.0 * PI * M_E * K_B / (H_P * H_P);
/// Lyman-alpha wavelength cubed over 8π [m^3]
pub const CK: f64 = 1.0 / (L_H_ALPHA * L_H_ALPHA * L_H_ALPHA * 8.0 * PI);
/// HeI 2¹P wavelength cubed over 8π [m^3]
pub const CK_HE: f64 = 1.0 / (L_HE_2P * L_HE_2P * L_HE_2P * 8.0 * PI);
/// Hydrogen ionization temperature [K]
pub const CB1_H: f64 = HC_OVER_K * L_H_ION;
/// Hydrogen n = 2 ionization temperature [K]
pub const CDB_H: f64 = HC_OVER_K * (L_H_ION - L_H_ALPHA);
/// Lyman-alpha temperature [K]
pub const CL_H: f64 = HC_OVER_K * L_H_ALPHA;
/// HeI ionization temperature [K]
pub const CB1_HE1: f64 = HC_OVER_K * L_HE1_ION;
/// HeII ionization temperature [K]
pub const CB1_HE2: f64 = HC_OVER_K * L_HE2_ION;
/// HeI 2s ionization temperature [K]
pub const CDB_HE: f64 = HC_OVER_K * (L_HE1_ION - L_HE_2S);
/// HeI 2s excitation temperature [K]
pub const CL_HE: f64 = HC_OVER_K * L_HE_2S;
/// HeI 2p-2s splitting temperature [K]
pub const CL_PST: f64 = HC_OVER_K * (L_HE_2P - L_HE_2S);

const A_PPB: f64 = 4.309;
const B_PPB: f64 = -0.6166;
const C_PPB: f64 = 0.6703;
const D_PPB: f64 = 0.53;

/// Case-B hydrogen recombination coefficient (Pequignot, Petitjean & Boisson fit) [m^3/s].
pub fn alpha_h_case_b(t: f64) -> f64 {
    let t4 = t / 1.0e4;
    1.0e-19 * A_PPB * t4.powf(B_PPB) / (1.0 + C_PPB * t4.powf(D_PPB))
}

/// HeI recombination coefficient (Verner & Ferland fit) [m^3/s].
pub fn alpha_he_verner_ferland(t: f64) -> f64 {
    let a_vf = 10f64.powf(-16.744);
    let b_vf = 0.711;
    let t0 = 10f64.powf(0.477121);
    let t1 = 10f64.powf(5.114);
    let sq0 = (t / t0).sqrt();
    let sq1 = (t / t1).sqrt();
    a_vf / (sq0 * (1.0 + sq0).powf(1.0 - b_vf) * (1.0 + sq1).powf(1.0 + b_vf))
}

/// Output of a three-level-atom evaluation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AtomTerms {
    pub beta: f64,
    pub peebles: f64,
    pub dx_dz: f64,
}

/// Hydrogen three-level atom.
///
/// `alpha_mat` is the recombination coefficient at the matter temperature,
/// `alpha_rad` at the radiation temperature (detailed balance for the
/// photo-ionization rate). `k_correction` multiplies the Lyman-alpha
/// redshifting factor.
pub fn hydrogen(input: &RateInput, alpha_mat: f64, alpha_rad: f64, fudge: f64, k_correction: f64) -> AtomTerms {
    let t_rad = input.t_rad;
    let beta = alpha_rad * (CR * t_rad).powf(1.5) * (-CDB_H / t_rad).exp();
    let k = CK / input.hubble * k_correction;
    let n = input.n_h;
    let neutral = 1.0 - input.x_h;
    // the escape factor has a pole just below zero neutral fraction
    let escape_neutral = neutral.clamp(0.0, 1.0);

    let two_photon = k * LAMBDA_H_2S1S * n * escape_neutral;
    let peebles = (1.0 + two_photon) / (1.0 / fudge + two_photon / fudge + k * beta * n * escape_neutral);
    let dx_dz = (input.x * input.x_h * n * alpha_mat - beta * neutral * (-CL_H / t_rad).exp())
        * peebles
        / (input.hubble * (1.0 + input.z));

    AtomTerms { beta, peebles, dx_dz }
}

/// Neutral-helium three-level atom (singlet channel).
pub fn helium(input: &RateInput, alpha_mat: f64, alpha_rad: f64) -> AtomTerms {
    let t_rad = input.t_rad;
    // statistical weight of the HeII ground state
    let beta = 4.0 * alpha_rad * (CR * t_rad).powf(1.5) * (-CDB_HE / t_rad).exp();
    if input.x_he < 1e-15 {
        return AtomTerms {
            beta,
            peebles: 1.0,
            dx_dz: 0.0,
        };
    }

    let n_he = input.f_he * input.n_h;
    let neutral = 1.0 - input.x_he;
    let boltz = (CL_PST / t_rad).exp();
    let b = CK_HE / input.hubble * n_he * neutral.clamp(0.0, 1.0) * boltz;
    let peebles = if b.is_finite() {
        (1.0 + b * LAMBDA_HE_2S1S) / (1.0 + b * (LAMBDA_HE_2S1S + beta))
    } else {
        LAMBDA_HE_2S1S / (LAMBDA_HE_2S1S + beta)
    };
    let dx_dz = (input.x_he * input.x * input.n_h * alpha_mat - beta * neutral * (-CL_HE / t_rad).exp())
        * peebles
        / (input.hubble * (1.0 + input.z));

    AtomTerms { beta, peebles, dx_dz }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Plasma state near z = 1300 for a Planck-like cosmology.
    pub(crate) fn sample_input(x_h: f64) -> RateInput {
        let z = 1300.0;
        let f_he = 0.0817;
        RateInput {
            z,
            t_mat: 2.7255 * (1.0 + z),
            t_rad: 2.7255 * (1.0 + z),
            x_h,
            x_he: 0.0,
            x: x_h,
            n_h: 0.19 * (1.0 + z).powi(3),
            f_he,
            hubble: 6.6e-14,
        }
    }

    #[test]
    fn characteristic_temperatures() {
        assert!((CB1_H - 157_807.0).abs() / 157_807.0 < 1e-3);
        assert!((CL_H - 118_356.0).abs() / 118_356.0 < 1e-3);
        assert!(CR > 1.79e14 && CR < 1.81e14);
    }

    #[test]
    fn case_b_coefficient_magnitude() {
        // ~2.6e-19 m^3/s at 10^4 K
        let a = alpha_h_case_b(1.0e4);
        assert!(a > 2.4e-19 && a < 2.8e-19, "alpha = {a}");
        assert!(alpha_h_case_b(3.0e3) > a);
        assert!(alpha_he_verner_ferland(1.0e4) > 0.0);
    }

    #[test]
    fn hydrogen_recombines_when_fully_ionized() {
        let input = sample_input(1.0);
        let a = alpha_h_case_b(input.t_mat);
        let terms = hydrogen(&input, a, a, 1.14, 1.0);
        assert!(terms.dx_dz > 0.0);
        assert!(terms.peebles > 0.0 && terms.peebles <= 1.14);
    }

    #[test]
    fn hydrogen_ionizes_when_nearly_neutral() {
        let input = sample_input(0.01);
        let a = alpha_h_case_b(input.t_mat);
        let terms = hydrogen(&input, a, a, 1.14, 1.0);
        assert!(terms.dx_dz < 0.0);
    }

    #[test]
    fn overshoot_past_full_ionization_relaxes_back() {
        // a fraction slightly above one is pulled back with a bounded escape factor
        let mut input = sample_input(1.0 + 1e-9);
        input.x = input.x_h;
        let a = alpha_h_case_b(input.t_mat);
        let terms = hydrogen(&input, a, a, 1.14, 1.0);
        assert!((terms.peebles - 1.14).abs() < 1e-12);
        assert!(terms.dx_dz > 0.0);

        input.x_he = 1.0 + 1e-9;
        let a = alpha_he_verner_ferland(input.t_mat);
        let terms = helium(&input, a, a);
        assert!(terms.peebles > 0.0 && terms.peebles <= 1.0);
        assert!(terms.dx_dz > 0.0);
    }

    #[test]
    fn helium_guard_for_vanishing_fraction() {
        let input = sample_input(0.5);
        let a = alpha_he_verner_ferland(input.t_mat);
        assert_eq!(helium(&input, a, a).dx_dz, 0.0);
    }

    #[test]
    fn helium_escape_factor_finite_when_cold() {
        let mut input = sample_input(1e-4);
        input.x_he = 1e-6;
        input.t_rad = 3.0;
        input.t_mat = 0.5;
        let a = alpha_he_verner_ferland(input.t_mat);
        let ar = alpha_he_verner_ferland(input.t_rad);
        let terms = helium(&input, a, ar);
        assert!(terms.peebles.is_finite());
        assert!(terms.dx_dz.is_finite());
    }
}
