//! Derived columns, characteristic epochs and interpolation splines of the
//! thermal history.

use crate::error::{ThermoError, ThermoResult};
use crate::history::{CharacteristicEpochs, Column, ThermoHistory};
use crate::params::Precision;
use crate::saha::Plasma;
use th_background::Background;
use th_core::constants::{C, K_B, M_H, MPC_OVER_M, NOT4, SIGMA_T, Z_REC_MAX, Z_REC_MIN};
use th_core::spline::{CubicSpline, cumulative_integral, natural_second_derivatives, node_derivatives};
use tracing::{debug, info};

/// Inputs of one table build.
pub(crate) struct TableInputs<'a> {
    pub background: &'a dyn Background,
    pub plasma: Plasma,
    pub precision: &'a Precision,
    /// Increasing redshift grid
    pub z: Vec<f64>,
    pub xe: Vec<f64>,
    pub tb: Vec<f64>,
    pub z_reio: Option<f64>,
    pub tau_reio: f64,
}

/// Thomson scattering rate dκ/dτ [1/Mpc].
pub(crate) fn thomson_rate(plasma: &Plasma, z: f64, xe: f64) -> f64 {
    xe * plasma.n_h0 * (1.0 + z).powi(2) * SIGMA_T * MPC_OVER_M
}

/// Optical depth κ(z) = ∫₀ᶻ dκ/dτ / H dz' at every node.
pub(crate) fn optical_depth(
    background: &dyn Background,
    plasma: &Plasma,
    z: &[f64],
    xe: &[f64],
) -> ThermoResult<Vec<f64>> {
    let integrand: Vec<f64> = z
        .iter()
        .zip(xe)
        .map(|(&z, &xe)| thomson_rate(plasma, z, xe) / background.hubble(z))
        .collect();
    integrate(z, &integrand)
}

fn integrate(x: &[f64], y: &[f64]) -> ThermoResult<Vec<f64>> {
    let y2 = natural_second_derivatives(x, y)?;
    Ok(cumulative_integral(x, y, &y2))
}

/// d/dτ of a column sampled in z: −H d/dz.
fn conformal_derivative(z: &[f64], hubble: &[f64], y: &[f64]) -> ThermoResult<Vec<f64>> {
    let y2 = natural_second_derivatives(z, y)?;
    Ok(node_derivatives(z, y, &y2)
        .into_iter()
        .zip(hubble)
        .map(|(d, h)| -h * d)
        .collect())
}

pub(crate) fn build(inputs: TableInputs<'_>) -> ThermoResult<ThermoHistory> {
    let TableInputs {
        background,
        plasma,
        precision,
        z,
        xe,
        tb,
        z_reio,
        tau_reio,
    } = inputs;
    let n = z.len();

    let tau = z
        .iter()
        .map(|&z| background.conformal_time(z))
        .collect::<Result<Vec<_>, _>>()
        .map_err(ThermoError::background("conformal time of the table grid"))?;
    let hubble: Vec<f64> = z.iter().map(|&z| background.hubble(z)).collect();

    // opacity and its conformal-time derivatives
    let dkappa: Vec<f64> = z.iter().zip(&xe).map(|(&z, &x)| thomson_rate(&plasma, z, x)).collect();
    let kappa = optical_depth(background, &plasma, &z, &xe)?;
    let ddkappa = conformal_derivative(&z, &hubble, &dkappa)?;
    let dddkappa = conformal_derivative(&z, &hubble, &ddkappa)?;

    // visibility
    let exp_m_kappa: Vec<f64> = kappa.iter().map(|k| (-k).exp()).collect();
    let mut g = vec![0.0; n];
    let mut dg = vec![0.0; n];
    let mut ddg = vec![0.0; n];
    for i in 0..n {
        let (k1, k2, k3, e) = (dkappa[i], ddkappa[i], dddkappa[i], exp_m_kappa[i]);
        g[i] = k1 * e;
        dg[i] = (k2 + k1 * k1) * e;
        ddg[i] = (k3 + 3.0 * k1 * k2 + k1 * k1 * k1) * e;
    }

    // baryon sound speed
    let yhe = plasma.yhe;
    let tb_y2 = natural_second_derivatives(&z, &tb)?;
    let dtb_dz = node_derivatives(&z, &tb, &tb_y2);
    let cb2: Vec<f64> = (0..n)
        .map(|i| {
            let mu_inv = 1.0 + (1.0 / NOT4 - 1.0) * yhe + xe[i] * (1.0 - yhe);
            K_B / (M_H * C * C) * mu_inv * tb[i] * (1.0 + (1.0 + z[i]) / 3.0 * dtb_dz[i] / tb[i])
        })
        .collect();
    let (dcb2, ddcb2) = if precision.compute_cb2_derivatives {
        let d1 = conformal_derivative(&z, &hubble, &cb2)?;
        let d2 = conformal_derivative(&z, &hubble, &d1)?;
        (d1, d2)
    } else {
        (vec![0.0; n], vec![0.0; n])
    };

    // photon damping scale
    let ratio: Vec<f64> = z.iter().map(|&z| background.baryon_photon_ratio(z)).collect();
    let rd = if precision.compute_damping_scale {
        let damping: Vec<f64> = (0..n)
            .map(|i| {
                let r = ratio[i];
                (r * r / (1.0 + r) + 16.0 / 15.0) / (6.0 * dkappa[i] * (1.0 + r))
            })
            .collect();
        let per_z: Vec<f64> = damping.iter().zip(&hubble).map(|(d, h)| d / h).collect();
        let running = integrate(&z, &per_z)?;
        let total = running[n - 1] + tau[n - 1] * damping[n - 1];
        running
            .iter()
            .map(|r| 2.0 * std::f64::consts::PI * (total - r).max(0.0).sqrt())
            .collect()
    } else {
        vec![0.0; n]
    };

    // baryon drag optical depth
    let drag: Vec<f64> = (0..n).map(|i| dkappa[i] / (ratio[i] * hubble[i])).collect();
    let tau_drag = integrate(&z, &drag)?;

    // fastest thermal time scale, smoothed over neighbours
    let raw_rate: Vec<f64> = (0..n)
        .map(|i| {
            let k1 = dkappa[i];
            (k1 * k1 + (ddkappa[i] / k1).powi(2) + (dddkappa[i] / k1).abs()).sqrt()
        })
        .collect();
    let rate: Vec<f64> = (0..n)
        .map(|i| {
            if i == 0 || i + 1 == n {
                raw_rate[i]
            } else {
                (raw_rate[i - 1] + raw_rate[i] + raw_rate[i + 1]) / 3.0
            }
        })
        .collect();

    let mut columns = vec![Vec::new(); Column::ALL.len()];
    for (column, values) in [
        (Column::Xe, xe),
        (Column::Dkappa, dkappa),
        (Column::Ddkappa, ddkappa),
        (Column::Dddkappa, dddkappa),
        (Column::ExpMKappa, exp_m_kappa),
        (Column::G, g),
        (Column::Dg, dg),
        (Column::Ddg, ddg),
        (Column::Tb, tb),
        (Column::Cb2, cb2),
        (Column::Dcb2, dcb2),
        (Column::Ddcb2, ddcb2),
        (Column::Rate, rate),
        (Column::Rd, rd),
        (Column::TauD, tau_drag),
    ] {
        columns[column.index()] = values;
    }

    for column in Column::ALL {
        if let Some(i) = columns[column.index()].iter().position(|v| !v.is_finite()) {
            return Err(ThermoError::TableBuildFailure {
                field: column.name(),
                z: z[i],
            });
        }
    }

    let epochs = epochs(background, &plasma, precision, &z, &tau, &columns, z_reio, tau_reio)?;
    info!(
        z_rec = epochs.z_rec,
        z_d = epochs.z_d,
        rs_rec = epochs.rs_rec,
        tau_reio = epochs.tau_reio,
        "thermal history table built"
    );

    let second = columns
        .iter()
        .map(|c| natural_second_derivatives(&z, c))
        .collect::<Result<Vec<_>, _>>()?;
    let tau_dd = natural_second_derivatives(&z, &tau)?;
    Ok(ThermoHistory::new(z, tau, tau_dd, columns, second, epochs))
}

#[allow(clippy::too_many_arguments)]
fn epochs(
    background: &dyn Background,
    plasma: &Plasma,
    precision: &Precision,
    z: &[f64],
    tau: &[f64],
    columns: &[Vec<f64>],
    z_reio: Option<f64>,
    tau_reio: f64,
) -> ThermoResult<CharacteristicEpochs> {
    let n = z.len();
    let g = &columns[Column::G.index()];
    let dkappa = &columns[Column::Dkappa.index()];
    let tau_drag = &columns[Column::TauD.index()];

    // recombination: vertex of the parabola through the visibility maximum
    let i_max = g
        .iter()
        .enumerate()
        .fold(0, |best, (i, v)| if *v > g[best] { i } else { best });
    if i_max == 0 || i_max + 1 == n {
        return Err(ThermoError::TableBuildFailure {
            field: "g",
            z: z[i_max],
        });
    }
    let tau_peak = parabola_vertex(
        [tau[i_max - 1], tau[i_max], tau[i_max + 1]],
        [g[i_max - 1], g[i_max], g[i_max + 1]],
    )
    .ok_or(ThermoError::TableBuildFailure {
        field: "g",
        z: z[i_max],
    })?;
    let z_rec = background
        .z_of_conformal_time(tau_peak)
        .map_err(ThermoError::background("redshift of the visibility peak"))?;
    if !(Z_REC_MIN..=Z_REC_MAX).contains(&z_rec) {
        return Err(ThermoError::TableBuildFailure { field: "z_rec", z: z_rec });
    }
    debug!(z_rec, tau_peak, node = z[i_max], "visibility peak");

    let tau_rec = background
        .conformal_time(z_rec)
        .map_err(ThermoError::background("conformal time at recombination"))?;
    let rs_rec = background
        .sound_horizon(z_rec)
        .map_err(ThermoError::background("sound horizon at recombination"))?;
    let ra_rec = background
        .comoving_angular_distance(z_rec)
        .map_err(ThermoError::background("angular distance to recombination"))?;
    let rd_rec = CubicSpline::new(z.to_vec(), columns[Column::Rd.index()].clone())?.eval(z_rec)?;

    // drag epoch: drag optical depth crosses one
    let j = tau_drag
        .iter()
        .position(|t| *t >= 1.0)
        .filter(|&j| j > 0)
        .ok_or(ThermoError::TableBuildFailure {
            field: "tau_d",
            z: z[n - 1],
        })?;
    let w = (1.0 - tau_drag[j - 1]) / (tau_drag[j] - tau_drag[j - 1]);
    let z_d = z[j - 1] + w * (z[j] - z[j - 1]);
    let tau_d = background
        .conformal_time(z_d)
        .map_err(ThermoError::background("conformal time at baryon drag"))?;
    let rs_d = background
        .sound_horizon(z_d)
        .map_err(ThermoError::background("sound horizon at baryon drag"))?;

    // earliest time with non-negligible visibility
    let threshold = precision.visibility_cut_fraction * g[i_max];
    let i_cut = (0..n).rev().find(|&i| g[i] >= threshold).unwrap_or(i_max);
    let tau_cut = tau[i_cut];

    // free streaming once the photon mean free path exceeds a fraction of the horizon
    let tau_free_streaming = (0..i_max)
        .rev()
        .find(|&i| dkappa[i] * tau[i] < 1.0 / precision.free_streaming_trigger)
        .map_or(background.conformal_age(), |i| tau[i]);

    Ok(CharacteristicEpochs {
        z_rec,
        tau_rec,
        rs_rec,
        ds_rec: rs_rec / (1.0 + z_rec),
        ra_rec,
        da_rec: ra_rec / (1.0 + z_rec),
        rd_rec,
        z_d,
        tau_d,
        rs_d,
        ds_d: rs_d / (1.0 + z_d),
        angular_rescaling: ra_rec / (background.conformal_age() - tau_rec),
        tau_free_streaming,
        tau_cut,
        tau_ini: tau[n - 1],
        n_e: plasma.n_h0 * (1.0 + 2.0 * plasma.f_he),
        z_reio,
        tau_reio,
    })
}

/// Abscissa of the maximum of the parabola through three points, if it
/// opens downwards.
fn parabola_vertex(x: [f64; 3], y: [f64; 3]) -> Option<f64> {
    let s01 = (y[1] - y[0]) / (x[1] - x[0]);
    let s12 = (y[2] - y[1]) / (x[2] - x[1]);
    let a = (s12 - s01) / (x[2] - x[0]);
    let b = s01 - a * (x[0] + x[1]);
    (a < 0.0 && a.is_finite()).then(|| -b / (2.0 * a))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_of_known_parabola() {
        let f = |x: f64| -2.0 * (x - 3.3).powi(2) + 7.0;
        let v = parabola_vertex([2.0, 3.0, 4.5], [f(2.0), f(3.0), f(4.5)]).unwrap();
        assert!((v - 3.3).abs() < 1e-12);
        assert!(parabola_vertex([0.0, 1.0, 2.0], [0.0, 1.0, 4.0]).is_none());
    }

    #[test]
    fn cumulative_integral_of_linear_function() {
        let x = th_core::linspace(0.0, 2.0, 21);
        let y: Vec<f64> = x.iter().map(|x| 3.0 * x).collect();
        let out = integrate(&x, &y).unwrap();
        assert!((out[20] - 6.0).abs() < 1e-12);
        assert_eq!(out[0], 0.0);
    }

    #[test]
    fn thomson_rate_scales_with_density() {
        let plasma = crate::saha::tests::planck_plasma();
        let r0 = thomson_rate(&plasma, 0.0, 1.0);
        let r1 = thomson_rate(&plasma, 1.0, 1.0);
        assert!((r1 / r0 - 4.0).abs() < 1e-12);
        // a few 1e-7 per Mpc today for a fully ionized Planck-like universe
        assert!(r0 > 1e-7 && r0 < 1e-6, "r0 = {r0}");
    }
}
