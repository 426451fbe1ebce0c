//! Adaptive stiff ODE integration.
//!
//! Provides:
//! - `OdeSystem` trait for right-hand sides over flat state slices
//! - `Stepper` trait and the `Rosenbrock23` L-stable stepper
//! - Cutback retry on recoverable right-hand-side failures
//! - Output-point driver that stops exactly on requested abscissae

pub mod error;
pub mod evolve;
pub mod integrator;
pub mod model;

pub use error::{EvolveError, EvolveResult};
pub use evolve::{EvolveOptions, EvolveStats, StepperType, evolve};
pub use integrator::{Rosenbrock23, Stepper};
pub use model::OdeSystem;
