//! Finished thermal history table and interpolated queries.

use crate::error::{ThermoError, ThermoResult};
use serde::Serialize;
use std::ops::Index;
use th_core::spline::{eval_in, find_interval, find_interval_from};

/// Table columns. Rows are stored by increasing redshift.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Column {
    /// Free electrons per hydrogen nucleus
    Xe,
    /// Thomson scattering rate dκ/dτ [1/Mpc]
    Dkappa,
    /// d²κ/dτ² [1/Mpc²]
    Ddkappa,
    /// d³κ/dτ³ [1/Mpc³]
    Dddkappa,
    /// exp(−κ)
    ExpMKappa,
    /// Visibility function g = κ' e^{−κ} [1/Mpc]
    G,
    /// dg/dτ
    Dg,
    /// d²g/dτ²
    Ddg,
    /// Baryon temperature [K]
    Tb,
    /// Squared baryon sound speed (units of c²)
    Cb2,
    /// dcb²/dτ
    Dcb2,
    /// d²cb²/dτ²
    Ddcb2,
    /// Largest variation rate of the thermal quantities [1/Mpc]
    Rate,
    /// Comoving photon damping scale [Mpc]
    Rd,
    /// Baryon drag optical depth
    TauD,
}

impl Column {
    pub const ALL: [Column; 15] = [
        Column::Xe,
        Column::Dkappa,
        Column::Ddkappa,
        Column::Dddkappa,
        Column::ExpMKappa,
        Column::G,
        Column::Dg,
        Column::Ddg,
        Column::Tb,
        Column::Cb2,
        Column::Dcb2,
        Column::Ddcb2,
        Column::Rate,
        Column::Rd,
        Column::TauD,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Column::Xe => "x_e",
            Column::Dkappa => "kappa'",
            Column::Ddkappa => "kappa''",
            Column::Dddkappa => "kappa'''",
            Column::ExpMKappa => "exp(-kappa)",
            Column::G => "g",
            Column::Dg => "g'",
            Column::Ddg => "g''",
            Column::Tb => "Tb",
            Column::Cb2 => "c_b^2",
            Column::Dcb2 => "(c_b^2)'",
            Column::Ddcb2 => "(c_b^2)''",
            Column::Rate => "rate",
            Column::Rd => "r_d",
            Column::TauD => "tau_d",
        }
    }

    /// Header label with units.
    pub fn title(self) -> &'static str {
        match self {
            Column::Xe => "x_e",
            Column::Dkappa => "kappa' [Mpc^-1]",
            Column::Ddkappa => "kappa'' [Mpc^-2]",
            Column::Dddkappa => "kappa''' [Mpc^-3]",
            Column::ExpMKappa => "exp(-kappa)",
            Column::G => "g [Mpc^-1]",
            Column::Dg => "g' [Mpc^-2]",
            Column::Ddg => "g'' [Mpc^-3]",
            Column::Tb => "Tb [K]",
            Column::Cb2 => "c_b^2",
            Column::Dcb2 => "(c_b^2)' [Mpc^-1]",
            Column::Ddcb2 => "(c_b^2)'' [Mpc^-2]",
            Column::Rate => "rate [Mpc^-1]",
            Column::Rd => "r_d [Mpc]",
            Column::TauD => "tau_d",
        }
    }
}

/// Derived redshifts and scales, reported once per run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CharacteristicEpochs {
    /// Redshift of the visibility maximum
    pub z_rec: f64,
    /// Conformal time at `z_rec` [Mpc]
    pub tau_rec: f64,
    /// Comoving sound horizon at `z_rec` [Mpc]
    pub rs_rec: f64,
    /// Physical sound horizon at `z_rec` [Mpc]
    pub ds_rec: f64,
    /// Comoving angular diameter distance to `z_rec` [Mpc]
    pub ra_rec: f64,
    /// Physical angular diameter distance to `z_rec` [Mpc]
    pub da_rec: f64,
    /// Damping scale at `z_rec` [Mpc]
    pub rd_rec: f64,
    /// Baryon drag redshift, where the drag optical depth reaches one
    pub z_d: f64,
    pub tau_d: f64,
    pub rs_d: f64,
    pub ds_d: f64,
    /// Angular scale ratio relative to the reference model
    pub angular_rescaling: f64,
    /// Conformal time when photons start free streaming [Mpc]
    pub tau_free_streaming: f64,
    /// Conformal time above which the visibility function is negligible [Mpc]
    pub tau_cut: f64,
    /// Conformal time at the top of the table [Mpc]
    pub tau_ini: f64,
    /// Electrons per m³ today, free or bound
    pub n_e: f64,
    /// Reionization redshift, for models that have a central one
    pub z_reio: Option<f64>,
    /// Reionization optical depth
    pub tau_reio: f64,
}

/// Interpolation flavor for [`ThermoHistory::at_z`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InterpMode {
    /// Bisection from scratch
    #[default]
    Normal,
    /// Walk from the cursor; cheap for monotonic query sequences
    Nearby,
}

/// Last row index used by a caller, for [`InterpMode::Nearby`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TableCursor {
    index: usize,
}

/// Every column at one redshift.
#[derive(Clone, Debug, PartialEq)]
pub struct ThermoRow {
    pub z: f64,
    /// Conformal time [Mpc]
    pub tau: f64,
    values: [f64; Column::ALL.len()],
}

impl ThermoRow {
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

impl Index<Column> for ThermoRow {
    type Output = f64;

    fn index(&self, column: Column) -> &f64 {
        &self.values[column.index()]
    }
}

/// Thermal history sampled in redshift, with spline second derivatives for
/// interpolation. Immutable once built.
#[derive(Clone, Debug)]
pub struct ThermoHistory {
    z: Vec<f64>,
    tau: Vec<f64>,
    tau_dd: Vec<f64>,
    columns: Vec<Vec<f64>>,
    second: Vec<Vec<f64>>,
    epochs: CharacteristicEpochs,
}

impl ThermoHistory {
    pub(crate) fn new(
        z: Vec<f64>,
        tau: Vec<f64>,
        tau_dd: Vec<f64>,
        columns: Vec<Vec<f64>>,
        second: Vec<Vec<f64>>,
        epochs: CharacteristicEpochs,
    ) -> Self {
        Self {
            z,
            tau,
            tau_dd,
            columns,
            second,
            epochs,
        }
    }

    pub fn len(&self) -> usize {
        self.z.len()
    }

    pub fn is_empty(&self) -> bool {
        self.z.is_empty()
    }

    pub fn z(&self) -> &[f64] {
        &self.z
    }

    pub fn tau(&self) -> &[f64] {
        &self.tau
    }

    pub fn z_min(&self) -> f64 {
        self.z[0]
    }

    pub fn z_max(&self) -> f64 {
        self.z[self.z.len() - 1]
    }

    pub fn column(&self, column: Column) -> &[f64] {
        &self.columns[column.index()]
    }

    pub fn epochs(&self) -> &CharacteristicEpochs {
        &self.epochs
    }

    /// Interpolate every column at `z`.
    pub fn at_z(&self, z: f64, mode: InterpMode, cursor: &mut TableCursor) -> ThermoResult<ThermoRow> {
        let interval = match mode {
            InterpMode::Normal => find_interval(&self.z, z),
            InterpMode::Nearby => find_interval_from(&self.z, z, cursor.index),
        };
        let Some(i) = interval else {
            return Err(ThermoError::OutOfRange {
                z,
                min: self.z_min(),
                max: self.z_max(),
            });
        };
        cursor.index = i;

        let mut values = [0.0; Column::ALL.len()];
        for (value, (y, y2)) in values.iter_mut().zip(self.columns.iter().zip(&self.second)) {
            *value = node_or_spline(&self.z, y, y2, i, z);
        }
        Ok(ThermoRow {
            z,
            tau: node_or_spline(&self.z, &self.tau, &self.tau_dd, i, z),
            values,
        })
    }

    pub fn at_z_normal(&self, z: f64) -> ThermoResult<ThermoRow> {
        self.at_z(z, InterpMode::Normal, &mut TableCursor::default())
    }

    /// Header for [`ThermoHistory::output_rows`].
    pub fn titles(&self) -> Vec<&'static str> {
        let mut titles = vec!["z", "conf. time [Mpc]"];
        titles.extend(Column::ALL.iter().map(|c| c.title()));
        titles
    }

    /// Every `every`-th row from the present backwards, plus the last row.
    pub fn output_rows(&self, every: usize) -> Vec<Vec<f64>> {
        let every = every.max(1);
        let n = self.len();
        let mut picks: Vec<usize> = (0..n).step_by(every).collect();
        if picks.last() != Some(&(n - 1)) {
            picks.push(n - 1);
        }
        picks
            .into_iter()
            .map(|i| {
                let mut row = vec![self.z[i], self.tau[i]];
                row.extend(self.columns.iter().map(|c| c[i]));
                row
            })
            .collect()
    }
}

/// Node values are returned untouched so queries on the grid are exact.
fn node_or_spline(x: &[f64], y: &[f64], y2: &[f64], i: usize, xq: f64) -> f64 {
    if xq == x[i] {
        y[i]
    } else if xq == x[i + 1] {
        y[i + 1]
    } else {
        eval_in(x, y, y2, i, xq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use th_core::spline::natural_second_derivatives;

    fn epochs() -> CharacteristicEpochs {
        CharacteristicEpochs {
            z_rec: 1089.0,
            tau_rec: 280.0,
            rs_rec: 144.0,
            ds_rec: 0.13,
            ra_rec: 13900.0,
            da_rec: 12.7,
            rd_rec: 8.0,
            z_d: 1060.0,
            tau_d: 286.0,
            rs_d: 147.0,
            ds_d: 0.14,
            angular_rescaling: 1.0,
            tau_free_streaming: 1200.0,
            tau_cut: 240.0,
            tau_ini: 0.5,
            n_e: 0.22,
            z_reio: Some(7.7),
            tau_reio: 0.054,
        }
    }

    fn quadratic_table() -> ThermoHistory {
        let z: Vec<f64> = (0..20).map(|i| i as f64 * 0.5).collect();
        let tau: Vec<f64> = z.iter().map(|z| 100.0 - z).collect();
        let columns: Vec<Vec<f64>> = Column::ALL
            .iter()
            .map(|c| z.iter().map(|z| z * z + c.index() as f64).collect())
            .collect();
        let second = columns
            .iter()
            .map(|y| natural_second_derivatives(&z, y).unwrap())
            .collect();
        let tau_dd = natural_second_derivatives(&z, &tau).unwrap();
        ThermoHistory::new(z, tau, tau_dd, columns, second, epochs())
    }

    #[test]
    fn nodes_are_exact() {
        let table = quadratic_table();
        let row = table.at_z_normal(3.5).unwrap();
        assert_eq!(row[Column::Xe], 12.25);
        assert_eq!(row[Column::TauD], 12.25 + 14.0);
        assert_eq!(row.tau, 96.5);
    }

    #[test]
    fn nearby_matches_normal() {
        let table = quadratic_table();
        let mut cursor = TableCursor::default();
        for q in [0.1, 1.3, 4.77, 9.2, 2.0] {
            let near = table.at_z(q, InterpMode::Nearby, &mut cursor).unwrap();
            let normal = table.at_z_normal(q).unwrap();
            assert_eq!(near, normal);
        }
    }

    #[test]
    fn outside_range_is_rejected() {
        let table = quadratic_table();
        let err = table.at_z_normal(9.6).unwrap_err();
        assert!(matches!(err, ThermoError::OutOfRange { max, .. } if max == 9.5));
        assert!(table.at_z_normal(-1e-9).is_err());
        assert!(table.at_z_normal(f64::NAN).is_err());
    }

    #[test]
    fn output_rows_keep_last_row() {
        let table = quadratic_table();
        let rows = table.output_rows(7);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[3][0], 9.5);
        assert_eq!(rows[0].len(), table.titles().len());
    }

    #[test]
    fn history_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ThermoHistory>();
    }
}
