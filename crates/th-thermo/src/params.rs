//! Input parameters of a thermal history run.
//!
//! Everything here is plain data with serde derives; checks that need the
//! helium fraction or the grid live next to the code that uses them.

use crate::error::{ThermoError, ThermoResult};
use serde::{Deserialize, Serialize};
use th_core::constants::{YHE_BIG, YHE_SMALL};

/// Physics inputs of one run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThermoParams {
    /// Primordial helium mass fraction
    pub yhe: f64,
    pub reionization: ReionizationModel,
    pub reionization_input: ReionizationInput,
    pub heating: HeatingParameters,
    pub precision: Precision,
}

impl Default for ThermoParams {
    fn default() -> Self {
        Self {
            yhe: 0.245,
            reionization: ReionizationModel::default(),
            reionization_input: ReionizationInput::default(),
            heating: HeatingParameters::default(),
            precision: Precision::default(),
        }
    }
}

impl ThermoParams {
    /// Checks that need no background or provider.
    pub fn validate(&self) -> ThermoResult<()> {
        if !(self.yhe.is_finite() && (YHE_SMALL..=YHE_BIG).contains(&self.yhe)) {
            return Err(ThermoError::invalid(format!(
                "yhe = {} outside [{YHE_SMALL}, {YHE_BIG}]",
                self.yhe
            )));
        }
        self.precision.validate()?;
        self.heating.validate()?;

        if let ReionizationInput::OpticalDepth { tau } = self.reionization_input {
            if !(tau.is_finite() && tau > 0.0) {
                return Err(ThermoError::invalid(format!(
                    "target optical depth must be positive, got {tau}"
                )));
            }
            if !self.reionization.supports_shooting() {
                return Err(ThermoError::invalid(format!(
                    "reionization model '{}' cannot be solved for an optical depth",
                    self.reionization.name()
                )));
            }
        }
        Ok(())
    }
}

/// How the reionization epoch is specified.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ReionizationInput {
    /// Model redshifts are taken as given.
    #[default]
    Redshift,
    /// The model's free redshift is solved for this optical depth.
    OpticalDepth { tau: f64 },
}

/// Named ionization levels accepted wherever an `xe` value is expected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamedLevel {
    /// Hydrogen and singly ionized helium: 1 + fHe
    HydrogenSingleHelium,
    /// Hydrogen and doubly ionized helium: 1 + 2 fHe
    Full,
}

/// An ionization level, either numeric or named.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum XeLevel {
    Value(f64),
    Named(NamedLevel),
}

impl XeLevel {
    pub fn resolve(self, f_he: f64) -> f64 {
        match self {
            XeLevel::Value(v) => v,
            XeLevel::Named(NamedLevel::HydrogenSingleHelium) => 1.0 + f_he,
            XeLevel::Named(NamedLevel::Full) => 1.0 + 2.0 * f_he,
        }
    }
}

impl From<f64> for XeLevel {
    fn from(v: f64) -> Self {
        XeLevel::Value(v)
    }
}

/// Reionization parametrization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum ReionizationModel {
    None,
    /// Tanh in `(1+z)^exponent` for hydrogen plus a tanh in z for the second
    /// helium ionization.
    Camb {
        #[serde(default = "default_z_reio")]
        z_reio: f64,
        #[serde(default = "default_width")]
        width: f64,
        #[serde(default = "default_exponent")]
        exponent: f64,
        #[serde(default = "default_helium_redshift")]
        helium_redshift: f64,
        #[serde(default = "default_width")]
        helium_width: f64,
    },
    /// Tanh-smoothed steps between bin centers.
    BinsTanh {
        z: Vec<f64>,
        xe: Vec<XeLevel>,
        #[serde(default = "default_sharpness")]
        sharpness: f64,
    },
    /// One-sided tanh rising from the recombination value.
    HalfTanh {
        #[serde(default = "default_z_reio")]
        z_reio: f64,
        #[serde(default = "default_width")]
        width: f64,
        #[serde(default = "default_exponent")]
        exponent: f64,
    },
    /// Sum of independent tanh jumps sharing one width.
    ManyTanh {
        z: Vec<f64>,
        xe: Vec<XeLevel>,
        #[serde(default = "default_width")]
        width: f64,
    },
    /// Piecewise linear through control points.
    Inter { z: Vec<f64>, xe: Vec<XeLevel> },
}

fn default_z_reio() -> f64 {
    7.6711
}

fn default_width() -> f64 {
    0.5
}

fn default_exponent() -> f64 {
    1.5
}

fn default_helium_redshift() -> f64 {
    3.5
}

fn default_sharpness() -> f64 {
    0.3
}

impl Default for ReionizationModel {
    fn default() -> Self {
        Self::camb(default_z_reio())
    }
}

impl ReionizationModel {
    /// CAMB-like model with default widths centered on `z_reio`.
    pub fn camb(z_reio: f64) -> Self {
        ReionizationModel::Camb {
            z_reio,
            width: default_width(),
            exponent: default_exponent(),
            helium_redshift: default_helium_redshift(),
            helium_width: default_width(),
        }
    }

    pub fn half_tanh(z_reio: f64) -> Self {
        ReionizationModel::HalfTanh {
            z_reio,
            width: default_width(),
            exponent: default_exponent(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ReionizationModel::None => "none",
            ReionizationModel::Camb { .. } => "camb",
            ReionizationModel::BinsTanh { .. } => "bins_tanh",
            ReionizationModel::HalfTanh { .. } => "half_tanh",
            ReionizationModel::ManyTanh { .. } => "many_tanh",
            ReionizationModel::Inter { .. } => "inter",
        }
    }

    /// Whether the model has a free redshift to solve for.
    pub fn supports_shooting(&self) -> bool {
        matches!(
            self,
            ReionizationModel::Camb { .. } | ReionizationModel::HalfTanh { .. } | ReionizationModel::ManyTanh { .. }
        )
    }
}

/// Exotic energy injection by dark matter annihilation or decay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatingParameters {
    /// Annihilation efficiency f <σv> / m [m^3/s/kg]
    pub annihilation: f64,
    /// Curvature of the annihilation parabola in ln(1+z); zero or negative
    pub annihilation_variation: f64,
    /// Redshift at which `annihilation` is quoted when it varies
    pub annihilation_z: f64,
    /// Above this redshift the varying rate stays at its maximum
    pub annihilation_zmax: f64,
    /// Below this redshift the varying rate is constant
    pub annihilation_zmin: f64,
    /// Halo boost amplitude
    pub annihilation_f_halo: f64,
    /// Halo formation redshift
    pub annihilation_z_halo: f64,
    /// Deposit energy where it is injected
    pub on_the_spot: bool,
    /// Decay efficiency f / τ [1/s]
    pub decay: f64,
}

impl Default for HeatingParameters {
    fn default() -> Self {
        Self {
            annihilation: 0.0,
            annihilation_variation: 0.0,
            annihilation_z: 1000.0,
            annihilation_zmax: 2500.0,
            annihilation_zmin: 30.0,
            annihilation_f_halo: 0.0,
            annihilation_z_halo: 30.0,
            on_the_spot: true,
            decay: 0.0,
        }
    }
}

impl HeatingParameters {
    pub fn validate(&self) -> ThermoResult<()> {
        let non_negative = [
            ("annihilation", self.annihilation),
            ("annihilation_f_halo", self.annihilation_f_halo),
            ("decay", self.decay),
        ];
        for (what, v) in non_negative {
            if !(v.is_finite() && v >= 0.0) {
                return Err(ThermoError::invalid(format!("{what} must be non-negative, got {v}")));
            }
        }
        if !(self.annihilation_variation.is_finite() && self.annihilation_variation <= 0.0) {
            return Err(ThermoError::invalid(
                "annihilation_variation must be zero or negative",
            ));
        }
        if !(self.annihilation_zmin >= 0.0 && self.annihilation_zmin < self.annihilation_zmax) {
            return Err(ThermoError::invalid(
                "annihilation redshifts must satisfy 0 <= zmin < zmax",
            ));
        }
        if !(self.annihilation_z > 0.0 && self.annihilation_z_halo > 0.0) {
            return Err(ThermoError::invalid(
                "annihilation_z and annihilation_z_halo must be positive",
            ));
        }
        Ok(())
    }

    /// Whether any injection channel is switched on.
    pub fn is_active(&self) -> bool {
        self.annihilation > 0.0 || self.decay > 0.0
    }
}

/// Grid sizes, transition placements and tolerances.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Precision {
    /// Earliest redshift of the table
    pub z_initial: f64,
    /// Boundary between the linear and logarithmic grid parts
    pub z_linear: f64,
    /// Points on the linear part above the reionization window
    pub nz_linear: usize,
    /// Points on the logarithmic part
    pub nz_log: usize,
    /// Points in the reionization window `[0, reionization_z_start_max)`
    pub nz_reio: usize,

    /// Center and half-width of HeIII -> HeII recombination
    pub z_he_1: f64,
    pub delta_z_he_1: f64,
    /// End of HeIII -> HeII recombination
    pub z_he_2: f64,
    pub delta_z_he_2: f64,
    /// Onset of HeII -> HeI recombination
    pub z_he_3: f64,
    pub delta_z_he_3: f64,
    /// Hydrogen leaves its ionized value for Saha equilibrium
    pub z_early_h: f64,
    pub delta_z_early_h: f64,
    /// Hydrogen becomes an integrated unknown
    pub z_full_h: f64,
    pub delta_z_full_h: f64,
    /// Width of the transition into reionization
    pub delta_z_reio: f64,

    /// Highest allowed reionization start, also the recombination/reionization split
    pub reionization_z_start_max: f64,
    /// Start of a tanh profile in units of its width above its center
    pub reionization_start_factor: f64,

    pub rtol: f64,
    /// Absolute tolerance on ionized fractions
    pub atol_x: f64,
    /// Absolute tolerance on the matter temperature [K]
    pub atol_t: f64,
    /// Step budget per integration interval
    pub max_steps: usize,

    /// Relative optical-depth tolerance of the shooting
    pub shooting_tolerance: f64,
    pub shooting_max_iterations: usize,

    /// Visibility cut as a fraction of the visibility peak
    pub visibility_cut_fraction: f64,
    /// Free streaming starts once dκ/dτ · τ drops below 1 / trigger
    pub free_streaming_trigger: f64,

    pub compute_cb2_derivatives: bool,
    pub compute_damping_scale: bool,
}

impl Default for Precision {
    fn default() -> Self {
        Self {
            z_initial: 5.0e6,
            z_linear: 1.0e4,
            nz_linear: 4000,
            nz_log: 400,
            nz_reio: 500,
            z_he_1: 8000.0,
            delta_z_he_1: 50.0,
            z_he_2: 5000.0,
            delta_z_he_2: 100.0,
            z_he_3: 3500.0,
            delta_z_he_3: 50.0,
            z_early_h: 2870.0,
            delta_z_early_h: 50.0,
            z_full_h: 1600.0,
            delta_z_full_h: 50.0,
            delta_z_reio: 2.0,
            reionization_z_start_max: 50.0,
            reionization_start_factor: 8.0,
            rtol: 1e-6,
            atol_x: 1e-10,
            atol_t: 1e-6,
            max_steps: 200_000,
            shooting_tolerance: 1e-7,
            shooting_max_iterations: 100,
            visibility_cut_fraction: 1e-3,
            free_streaming_trigger: 5.0,
            compute_cb2_derivatives: false,
            compute_damping_scale: true,
        }
    }
}

impl Precision {
    /// Grid and tolerance sanity. Transition widths are checked when the
    /// schedule is built.
    pub fn validate(&self) -> ThermoResult<()> {
        if !(self.reionization_z_start_max > 0.0
            && self.z_linear > self.reionization_z_start_max
            && self.z_initial > self.z_linear
            && self.z_initial.is_finite())
        {
            return Err(ThermoError::invalid(
                "grid redshifts must satisfy 0 < reionization_z_start_max < z_linear < z_initial",
            ));
        }
        if self.nz_linear < 2 || self.nz_log < 2 || self.nz_reio < 2 {
            return Err(ThermoError::invalid("each grid part needs at least two points"));
        }
        if !(self.rtol > 0.0 && self.rtol < 1.0 && self.atol_x > 0.0 && self.atol_t > 0.0) {
            return Err(ThermoError::invalid("integration tolerances must be positive"));
        }
        if self.max_steps == 0 || self.shooting_max_iterations == 0 {
            return Err(ThermoError::invalid("step and iteration budgets must be positive"));
        }
        if !(self.shooting_tolerance > 0.0 && self.shooting_tolerance < 1.0) {
            return Err(ThermoError::invalid("shooting_tolerance must lie in (0, 1)"));
        }
        if !(self.reionization_start_factor > 0.0) {
            return Err(ThermoError::invalid("reionization_start_factor must be positive"));
        }
        if !(self.visibility_cut_fraction > 0.0 && self.visibility_cut_fraction < 1.0) {
            return Err(ThermoError::invalid("visibility_cut_fraction must lie in (0, 1)"));
        }
        if !(self.free_streaming_trigger > 0.0) {
            return Err(ThermoError::invalid("free_streaming_trigger must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(ThermoParams::default().validate().is_ok());
    }

    #[test]
    fn helium_fraction_bounds() {
        let mut params = ThermoParams::default();
        params.yhe = 0.7;
        assert!(matches!(params.validate(), Err(ThermoError::InvalidParameter { .. })));
        params.yhe = f64::NAN;
        assert!(params.validate().is_err());
    }

    #[test]
    fn optical_depth_needs_free_redshift() {
        let mut params = ThermoParams {
            reionization_input: ReionizationInput::OpticalDepth { tau: 0.054 },
            ..ThermoParams::default()
        };
        assert!(params.validate().is_ok());

        params.reionization = ReionizationModel::Inter {
            z: vec![0.0, 10.0],
            xe: vec![XeLevel::Value(1.0), XeLevel::Value(0.0)],
        };
        let err = params.validate().unwrap_err();
        assert!(err.to_string().contains("inter"));

        params.reionization = ReionizationModel::None;
        assert!(params.validate().is_err());
    }

    #[test]
    fn heating_rejects_negative_rates() {
        let heating = HeatingParameters {
            decay: -1.0,
            ..HeatingParameters::default()
        };
        assert!(heating.validate().is_err());
        assert!(!HeatingParameters::default().is_active());
    }

    #[test]
    fn named_levels_resolve() {
        let f_he = 0.08;
        assert!((XeLevel::Named(NamedLevel::Full).resolve(f_he) - 1.16).abs() < 1e-15);
        assert!((XeLevel::Named(NamedLevel::HydrogenSingleHelium).resolve(f_he) - 1.08).abs() < 1e-15);
        assert_eq!(XeLevel::Value(0.3).resolve(f_he), 0.3);
    }

    #[test]
    fn models_deserialize_from_tagged_json() {
        let model: ReionizationModel =
            serde_json::from_str(r#"{"model": "camb", "z_reio": 8.0}"#).unwrap();
        assert_eq!(model, ReionizationModel::camb(8.0));

        let model: ReionizationModel = serde_json::from_str(
            r#"{"model": "many_tanh", "z": [3.5, 11.0], "xe": ["full", 0.5], "width": 0.3}"#,
        )
        .unwrap();
        match model {
            ReionizationModel::ManyTanh { xe, width, .. } => {
                assert_eq!(xe[0], XeLevel::Named(NamedLevel::Full));
                assert_eq!(xe[1], XeLevel::Value(0.5));
                assert_eq!(width, 0.3);
            }
            other => panic!("unexpected model {other:?}"),
        }

        let input: ReionizationInput =
            serde_json::from_str(r#"{"mode": "optical_depth", "tau": 0.06}"#).unwrap();
        assert_eq!(input, ReionizationInput::OpticalDepth { tau: 0.06 });
    }

    #[test]
    fn partial_precision_fills_defaults() {
        let precision: Precision = serde_json::from_str(r#"{"nz_reio": 200}"#).unwrap();
        assert_eq!(precision.nz_reio, 200);
        assert_eq!(precision.z_initial, 5.0e6);
    }
}
