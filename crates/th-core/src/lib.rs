//! th-core: stable foundation for the thermal history workspace.
//!
//! Contains:
//! - numeric (Real, finiteness checks, grids, erfc)
//! - constants (physical constants in SI units)
//! - smoothing (cubic step weights used across regime transitions)
//! - spline (natural cubic spline with node derivative and integral helpers)
//! - units (uom temperature type + kelvin conversions)
//! - error (shared error types)

pub mod constants;
pub mod error;
pub mod numeric;
pub mod smoothing;
pub mod spline;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{CoreError, CoreResult};
pub use numeric::*;
pub use smoothing::{step_centered, step_unit};
pub use spline::CubicSpline;
