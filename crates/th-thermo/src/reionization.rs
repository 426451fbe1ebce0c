//! Imposed reionization profiles.
//!
//! A profile is built in two steps: [`ReionizationProfile::z_start_of`] gives
//! the redshift where it switches on, then [`ReionizationProfile::new`] pins
//! its upper value to the recombination solution found there.

use crate::error::{ThermoError, ThermoResult};
use crate::params::{Precision, ReionizationModel, XeLevel};

#[derive(Clone, Debug, PartialEq)]
enum Kind {
    Camb {
        z_reio: f64,
        width: f64,
        exponent: f64,
        helium_redshift: f64,
        helium_width: f64,
    },
    BinsTanh {
        /// Nodes including the anchors at z = 0 and above the last bin
        z: Vec<f64>,
        xe: Vec<f64>,
        sharpness: f64,
    },
    HalfTanh {
        z_reio: f64,
        width: f64,
        exponent: f64,
    },
    ManyTanh {
        z: Vec<f64>,
        xe: Vec<f64>,
        width: f64,
    },
    Inter {
        z: Vec<f64>,
        xe: Vec<f64>,
    },
}

/// Runtime form of a reionization model.
#[derive(Clone, Debug, PartialEq)]
pub struct ReionizationProfile {
    kind: Kind,
    /// Recombination value at `z_start`
    xe_before: f64,
    /// Hydrogen plus singly ionized helium
    xe_after: f64,
    helium_fraction: f64,
    z_start: f64,
}

impl ReionizationProfile {
    /// Redshift where `model` switches on; `None` for no reionization.
    pub fn z_start_of(model: &ReionizationModel, precision: &Precision, f_he: f64) -> ThermoResult<Option<f64>> {
        let factor = precision.reionization_start_factor;
        let start = match model {
            ReionizationModel::None => return Ok(None),
            ReionizationModel::Camb {
                z_reio,
                width,
                exponent,
                helium_redshift,
                helium_width,
            } => {
                check_positive("width", *width)?;
                check_positive("exponent", *exponent)?;
                check_positive("helium_width", *helium_width)?;
                check_non_negative("z_reio", *z_reio)?;
                check_non_negative("helium_redshift", *helium_redshift)?;
                (z_reio + factor * width).max(helium_redshift + factor * helium_width)
            }
            ReionizationModel::HalfTanh { z_reio, width, exponent } => {
                check_positive("width", *width)?;
                check_positive("exponent", *exponent)?;
                check_non_negative("z_reio", *z_reio)?;
                *z_reio
            }
            ReionizationModel::BinsTanh { z, xe, sharpness } => {
                check_positive("sharpness", *sharpness)?;
                levels(z, xe, f_he)?;
                if z[0] <= 0.0 {
                    return Err(ThermoError::invalid("bins_tanh redshifts must be positive"));
                }
                let n = z.len();
                let step = if n > 1 { z[n - 1] - z[n - 2] } else { z[0] };
                z[n - 1] + step
            }
            ReionizationModel::ManyTanh { z, xe, width } => {
                check_positive("width", *width)?;
                levels(z, xe, f_he)?;
                z[z.len() - 1] + factor * width
            }
            ReionizationModel::Inter { z, xe } => {
                levels(z, xe, f_he)?;
                if z.len() < 2 {
                    return Err(ThermoError::invalid("inter needs at least two points"));
                }
                z[z.len() - 1]
            }
        };
        if !(start <= precision.reionization_z_start_max) {
            return Err(ThermoError::invalid(format!(
                "reionization of model '{}' starts at z = {start}, above the maximum {}",
                model.name(),
                precision.reionization_z_start_max
            )));
        }
        Ok(Some(start))
    }

    /// Profile of `model` continuing from `xe_before` at its start.
    pub fn new(
        model: &ReionizationModel,
        precision: &Precision,
        f_he: f64,
        xe_before: f64,
    ) -> ThermoResult<Option<Self>> {
        let Some(z_start) = Self::z_start_of(model, precision, f_he)? else {
            return Ok(None);
        };
        if !(xe_before.is_finite() && xe_before >= 0.0) {
            return Err(ThermoError::invalid(format!(
                "ionization before reionization must be non-negative, got {xe_before}"
            )));
        }
        let kind = match model {
            ReionizationModel::None => return Ok(None),
            ReionizationModel::Camb {
                z_reio,
                width,
                exponent,
                helium_redshift,
                helium_width,
            } => Kind::Camb {
                z_reio: *z_reio,
                width: *width,
                exponent: *exponent,
                helium_redshift: *helium_redshift,
                helium_width: *helium_width,
            },
            ReionizationModel::HalfTanh { z_reio, width, exponent } => Kind::HalfTanh {
                z_reio: *z_reio,
                width: *width,
                exponent: *exponent,
            },
            ReionizationModel::BinsTanh { z, xe, sharpness } => {
                let xe = levels(z, xe, f_he)?;
                let mut nodes_z = Vec::with_capacity(z.len() + 2);
                let mut nodes_xe = Vec::with_capacity(z.len() + 2);
                nodes_z.push(0.0);
                nodes_xe.push(xe[0]);
                nodes_z.extend_from_slice(z);
                nodes_xe.extend_from_slice(&xe);
                nodes_z.push(z_start);
                nodes_xe.push(xe_before);
                Kind::BinsTanh {
                    z: nodes_z,
                    xe: nodes_xe,
                    sharpness: *sharpness,
                }
            }
            ReionizationModel::ManyTanh { z, xe, width } => Kind::ManyTanh {
                z: z.clone(),
                xe: levels(z, xe, f_he)?,
                width: *width,
            },
            ReionizationModel::Inter { z, xe } => {
                let mut xe = levels(z, xe, f_he)?;
                if let Some(last) = xe.last_mut() {
                    *last = xe_before;
                }
                Kind::Inter { z: z.clone(), xe }
            }
        };
        Ok(Some(Self {
            kind,
            xe_before,
            xe_after: 1.0 + f_he,
            helium_fraction: f_he,
            z_start,
        }))
    }

    pub fn z_start(&self) -> f64 {
        self.z_start
    }

    /// Ionization fraction and its z-derivative.
    pub fn evaluate(&self, z: f64) -> (f64, f64) {
        if z > self.z_start {
            return (self.xe_before, 0.0);
        }
        let (xa, xb) = (self.xe_after, self.xe_before);
        match &self.kind {
            Kind::Camb {
                z_reio,
                width,
                exponent,
                helium_redshift,
                helium_width,
            } => {
                let (arg, darg) = tanh_argument(z, *z_reio, *width, *exponent);
                let hydrogen = (xa - xb) * (arg.tanh() + 1.0) / 2.0 + xb;
                let d_hydrogen = (xa - xb) / 2.0 * sech2(arg) * darg;
                let arg_he = (helium_redshift - z) / helium_width;
                let helium = self.helium_fraction * (arg_he.tanh() + 1.0) / 2.0;
                let d_helium = -self.helium_fraction / 2.0 * sech2(arg_he) / helium_width;
                (hydrogen + helium, d_hydrogen + d_helium)
            }
            Kind::HalfTanh { z_reio, width, exponent } => {
                let (arg, darg) = tanh_argument(z, *z_reio, *width, *exponent);
                if arg > 0.0 {
                    (xb + (xa - xb) * arg.tanh(), (xa - xb) * sech2(arg) * darg)
                } else {
                    (xb, 0.0)
                }
            }
            Kind::BinsTanh { z: zs, xe, sharpness } => {
                let i = segment(zs, z);
                let dz = zs[i + 1] - zs[i];
                let s = *sharpness;
                let norm = (1.0 / s).tanh();
                let arg = (2.0 * (z - zs[i]) / dz - 1.0) / s;
                let jump = xe[i + 1] - xe[i];
                let x = xe[i] + 0.5 * (arg.tanh() / norm + 1.0) * jump;
                let dx = 0.5 * sech2(arg) / norm * 2.0 / (dz * s) * jump;
                (x, dx)
            }
            Kind::ManyTanh { z: zs, xe, width } => {
                let mut x = xb;
                let mut dx = 0.0;
                let mut previous = xb;
                for (zi, xi) in zs.iter().zip(xe).rev() {
                    let arg = (zi - z) / width;
                    let jump = xi - previous;
                    x += jump * (arg.tanh() + 1.0) / 2.0;
                    dx -= jump / 2.0 * sech2(arg) / width;
                    previous = *xi;
                }
                (x, dx)
            }
            Kind::Inter { z: zs, xe } => {
                if z <= zs[0] {
                    return (xe[0], 0.0);
                }
                let i = segment(zs, z);
                let slope = (xe[i + 1] - xe[i]) / (zs[i + 1] - zs[i]);
                (xe[i] + slope * (z - zs[i]), slope)
            }
        }
    }
}

/// Argument of the tanh in `(1+z)^p` and its z-derivative.
fn tanh_argument(z: f64, z_reio: f64, width: f64, exponent: f64) -> (f64, f64) {
    let scale = exponent * (1.0 + z_reio).powf(exponent - 1.0) * width;
    let arg = ((1.0 + z_reio).powf(exponent) - (1.0 + z).powf(exponent)) / scale;
    let darg = -exponent * (1.0 + z).powf(exponent - 1.0) / scale;
    (arg, darg)
}

fn sech2(x: f64) -> f64 {
    let c = x.cosh();
    if c.is_finite() { 1.0 / (c * c) } else { 0.0 }
}

/// Index `i` with `zs[i] <= z <= zs[i + 1]`, clamped to the ends.
fn segment(zs: &[f64], z: f64) -> usize {
    th_core::spline::find_interval(zs, z).unwrap_or(if z < zs[0] { 0 } else { zs.len() - 2 })
}

fn check_positive(what: &str, v: f64) -> ThermoResult<()> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(ThermoError::invalid(format!("reionization {what} must be positive, got {v}")))
    }
}

fn check_non_negative(what: &str, v: f64) -> ThermoResult<()> {
    if v.is_finite() && v >= 0.0 {
        Ok(())
    } else {
        Err(ThermoError::invalid(format!("reionization {what} must be non-negative, got {v}")))
    }
}

/// Resolve and validate per-bin levels: redshifts strictly increasing and
/// non-negative, levels within [0, 1 + 2 fHe] and non-increasing with z.
fn levels(z: &[f64], xe: &[XeLevel], f_he: f64) -> ThermoResult<Vec<f64>> {
    if z.is_empty() || z.len() != xe.len() {
        return Err(ThermoError::invalid(format!(
            "reionization bins need matching non-empty z and xe lists, got {} and {}",
            z.len(),
            xe.len()
        )));
    }
    if !(z[0].is_finite() && z[0] >= 0.0) || z.windows(2).any(|w| !(w[1] > w[0] && w[1].is_finite())) {
        return Err(ThermoError::invalid("reionization bin redshifts must be strictly increasing and non-negative"));
    }
    let values: Vec<f64> = xe.iter().map(|l| l.resolve(f_he)).collect();
    let ceiling = 1.0 + 2.0 * f_he;
    if values.iter().any(|v| !(v.is_finite() && *v >= 0.0 && *v <= ceiling)) {
        return Err(ThermoError::invalid(format!("reionization levels must lie in [0, {ceiling}]")));
    }
    if values.windows(2).any(|w| w[1] > w[0]) {
        return Err(ThermoError::invalid("reionization levels must not increase with redshift"));
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::NamedLevel;

    const F_HE: f64 = 0.0817;
    const XB: f64 = 2e-4;

    fn profile(model: &ReionizationModel) -> ReionizationProfile {
        ReionizationProfile::new(model, &Precision::default(), F_HE, XB)
            .unwrap()
            .unwrap()
    }

    fn numeric_slope(p: &ReionizationProfile, z: f64) -> f64 {
        let h = 1e-6;
        (p.evaluate(z + h).0 - p.evaluate(z - h).0) / (2.0 * h)
    }

    #[test]
    fn camb_limits_and_start() {
        let p = profile(&ReionizationModel::camb(7.7));
        assert!((p.z_start() - 11.7).abs() < 1e-12);
        assert!((p.evaluate(0.0).0 - (1.0 + 2.0 * F_HE)).abs() < 1e-6);
        assert!((p.evaluate(5.5).0 - (1.0 + F_HE)).abs() < 1e-3);
        assert!((p.evaluate(p.z_start()).0 - XB).abs() < 1e-6);
        assert_eq!(p.evaluate(20.0), (XB, 0.0));
        for z in [2.0, 3.5, 7.7, 9.0] {
            assert!((p.evaluate(z).1 - numeric_slope(&p, z)).abs() < 1e-5, "z = {z}");
        }
    }

    #[test]
    fn half_tanh_has_no_helium_step() {
        let p = profile(&ReionizationModel::half_tanh(7.0));
        assert_eq!(p.z_start(), 7.0);
        assert!((p.evaluate(0.0).0 - (1.0 + F_HE)).abs() < 1e-6);
        assert_eq!(p.evaluate(7.0).0, XB);
        assert!((p.evaluate(5.0).1 - numeric_slope(&p, 5.0)).abs() < 1e-5);
    }

    #[test]
    fn bins_hit_their_nodes() {
        let model = ReionizationModel::BinsTanh {
            z: vec![4.0, 8.0, 12.0],
            xe: vec![XeLevel::Value(1.0), XeLevel::Value(0.6), XeLevel::Value(0.1)],
            sharpness: 0.3,
        };
        let p = profile(&model);
        assert_eq!(p.z_start(), 16.0);
        for (z, x) in [(0.0, 1.0), (4.0, 1.0), (8.0, 0.6), (12.0, 0.1), (16.0, XB)] {
            assert!((p.evaluate(z).0 - x).abs() < 1e-12, "z = {z}");
        }
        assert!((p.evaluate(10.0).1 - numeric_slope(&p, 10.0)).abs() < 1e-5);
    }

    #[test]
    fn many_tanh_stacks_jumps() {
        let model = ReionizationModel::ManyTanh {
            z: vec![3.5, 10.0],
            xe: vec![XeLevel::Named(NamedLevel::Full), XeLevel::Named(NamedLevel::HydrogenSingleHelium)],
            width: 0.5,
        };
        let p = profile(&model);
        assert_eq!(p.z_start(), 14.0);
        assert!((p.evaluate(0.0).0 - (1.0 + 2.0 * F_HE)).abs() < 1e-6);
        assert!((p.evaluate(6.5).0 - (1.0 + F_HE)).abs() < 1e-4);
        assert!((p.evaluate(14.0).0 - XB).abs() < 1e-6);
        assert!((p.evaluate(9.8).1 - numeric_slope(&p, 9.8)).abs() < 1e-5);
    }

    #[test]
    fn inter_ends_on_recombination_value() {
        let model = ReionizationModel::Inter {
            z: vec![0.0, 6.0, 10.0, 20.0],
            xe: vec![XeLevel::Value(1.0), XeLevel::Value(1.0), XeLevel::Value(0.2), XeLevel::Value(0.0)],
        };
        let p = profile(&model);
        assert_eq!(p.z_start(), 20.0);
        assert!((p.evaluate(20.0).0 - XB).abs() < 1e-15);
        assert!((p.evaluate(8.0).0 - 0.6).abs() < 1e-12);
        assert!((p.evaluate(8.0).1 + 0.2).abs() < 1e-12);
    }

    #[test]
    fn invalid_bins_rejected() {
        let precision = Precision::default();
        let unsorted = ReionizationModel::Inter {
            z: vec![0.0, 10.0, 5.0],
            xe: vec![XeLevel::Value(1.0), XeLevel::Value(0.5), XeLevel::Value(0.0)],
        };
        assert!(ReionizationProfile::new(&unsorted, &precision, F_HE, XB).is_err());

        let rising = ReionizationModel::ManyTanh {
            z: vec![5.0, 10.0],
            xe: vec![XeLevel::Value(0.5), XeLevel::Value(1.0)],
            width: 0.5,
        };
        assert!(ReionizationProfile::new(&rising, &precision, F_HE, XB).is_err());

        let too_late = ReionizationModel::camb(47.0);
        assert!(ReionizationProfile::z_start_of(&too_late, &precision, F_HE).is_err());

        let flat = ReionizationModel::HalfTanh {
            z_reio: 7.0,
            width: 0.0,
            exponent: 1.5,
        };
        assert!(ReionizationProfile::new(&flat, &precision, F_HE, XB).is_err());
        assert_eq!(ReionizationProfile::new(&ReionizationModel::None, &precision, F_HE, XB).unwrap(), None);
    }
}
