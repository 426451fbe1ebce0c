//! Integrated unknowns and their regime-dependent shapes.

use crate::error::{ThermoError, ThermoResult};

/// Which unknowns a regime integrates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    TemperatureOnly,
    HeliumTemperature,
    Full,
}

impl Shape {
    pub fn dim(self) -> usize {
        match self {
            Shape::TemperatureOnly => 1,
            Shape::HeliumTemperature => 2,
            Shape::Full => 3,
        }
    }

    pub fn integrates_hydrogen(self) -> bool {
        matches!(self, Shape::Full)
    }

    pub fn integrates_helium(self) -> bool {
        !matches!(self, Shape::TemperatureOnly)
    }
}

/// Ionized fractions at one redshift.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ionization {
    /// Ionized hydrogen fraction
    pub x_h: f64,
    /// Singly ionized helium fraction
    pub x_he: f64,
    /// Doubly ionized helium fraction
    pub he_iii: f64,
}

impl Ionization {
    pub const FULL: Ionization = Ionization {
        x_h: 1.0,
        x_he: 1.0,
        he_iii: 1.0,
    };

    /// Free electrons per hydrogen nucleus, counting each fraction within
    /// [0, 1] so the total never exceeds 1 + 2 fHe.
    pub fn electrons(&self, f_he: f64) -> f64 {
        let unit = |v: f64| v.clamp(0.0, 1.0);
        let x_he = unit(self.x_he);
        unit(self.x_h) + f_he * (x_he + unit(self.he_iii).min(x_he))
    }
}

/// State handed to the stepper. A new shape is always built fresh from the
/// previous regime's final values.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StateVector {
    TemperatureOnly { t_mat: f64 },
    HeliumTemperature { x_he: f64, t_mat: f64 },
    Full { x_h: f64, x_he: f64, t_mat: f64 },
}

impl StateVector {
    pub fn shape(&self) -> Shape {
        match self {
            StateVector::TemperatureOnly { .. } => Shape::TemperatureOnly,
            StateVector::HeliumTemperature { .. } => Shape::HeliumTemperature,
            StateVector::Full { .. } => Shape::Full,
        }
    }

    /// Build `shape` from a flat slice in stepper order.
    pub fn from_slice(shape: Shape, y: &[f64]) -> ThermoResult<Self> {
        if y.len() != shape.dim() {
            return Err(ThermoError::invalid(format!(
                "state of shape {shape:?} needs {} entries, got {}",
                shape.dim(),
                y.len()
            )));
        }
        Ok(match shape {
            Shape::TemperatureOnly => StateVector::TemperatureOnly { t_mat: y[0] },
            Shape::HeliumTemperature => StateVector::HeliumTemperature {
                x_he: y[0],
                t_mat: y[1],
            },
            Shape::Full => StateVector::Full {
                x_h: y[0],
                x_he: y[1],
                t_mat: y[2],
            },
        })
    }

    pub fn to_vec(&self) -> Vec<f64> {
        match *self {
            StateVector::TemperatureOnly { t_mat } => vec![t_mat],
            StateVector::HeliumTemperature { x_he, t_mat } => vec![x_he, t_mat],
            StateVector::Full { x_h, x_he, t_mat } => vec![x_h, x_he, t_mat],
        }
    }

    pub fn t_mat(&self) -> f64 {
        match *self {
            StateVector::TemperatureOnly { t_mat }
            | StateVector::HeliumTemperature { t_mat, .. }
            | StateVector::Full { t_mat, .. } => t_mat,
        }
    }

    pub fn x_h(&self) -> Option<f64> {
        match *self {
            StateVector::Full { x_h, .. } => Some(x_h),
            _ => None,
        }
    }

    pub fn x_he(&self) -> Option<f64> {
        match *self {
            StateVector::HeliumTemperature { x_he, .. } | StateVector::Full { x_he, .. } => Some(x_he),
            StateVector::TemperatureOnly { .. } => None,
        }
    }

    /// Re-express in `shape`. Unknowns the new shape adds are seeded from
    /// `seed`, normally the blended fractions at the boundary.
    pub fn reshape(&self, shape: Shape, seed: &Ionization) -> Self {
        let t_mat = self.t_mat();
        let x_h = self.x_h().unwrap_or(seed.x_h);
        let x_he = self.x_he().unwrap_or(seed.x_he);
        match shape {
            Shape::TemperatureOnly => StateVector::TemperatureOnly { t_mat },
            Shape::HeliumTemperature => StateVector::HeliumTemperature { x_he, t_mat },
            Shape::Full => StateVector::Full { x_h, x_he, t_mat },
        }
    }
}
