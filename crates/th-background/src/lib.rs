//! th-background: homogeneous expansion history.
//!
//! Provides:
//! - `Background` trait isolating the thermal history from the expansion model
//! - `Lcdm`: flat ΛCDM with photons and massless neutrinos, tabulated conformal
//!   time and sound horizon
//!
//! Distances are in Mpc, rates in 1/Mpc unless the method name says `_si`.

pub mod error;
pub mod lcdm;
pub mod model;

pub use error::{BackgroundError, BackgroundResult};
pub use lcdm::{Lcdm, LcdmParams};
pub use model::{Background, Cosmology};
