//! Recombination rate providers.
//!
//! A provider turns the local plasma state (redshift, temperatures, number
//! density, ionized fractions) into recombination and photo-ionization
//! coefficients and the resulting dx/dz of hydrogen and helium. Two
//! providers ship:
//! - `AnalyticRates`: fitted case-B coefficients with a fudged three-level atom
//! - `TabulatedRates`: coefficients spline-interpolated from a temperature
//!   table, with redshift-dependent escape-rate corrections

pub mod analytic;
pub mod atomic;
pub mod error;
pub mod model;
pub mod tabulated;

pub use analytic::AnalyticRates;
pub use error::{RateError, RateResult};
pub use model::{RateInput, RateProvider, Rates};
pub use tabulated::TabulatedRates;
