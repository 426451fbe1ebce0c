//! OdeSystem trait for pluggable right-hand sides.

use crate::error::EvolveError;

/// A first-order system dy/dt = f(t, y) over a flat state slice.
///
/// `rhs` takes `&mut self` so systems can keep caches (e.g. a search hint
/// into a table) between calls.
pub trait OdeSystem {
    /// Error produced by the right-hand side.
    type Error: From<EvolveError>;

    /// Number of unknowns.
    fn dim(&self) -> usize;

    /// Write f(t, y) into `dydt`.
    fn rhs(&mut self, t: f64, y: &[f64], dydt: &mut [f64]) -> Result<(), Self::Error>;

    /// Whether a failure may go away with a smaller step.
    ///
    /// Retryable failures make the stepper cut the step back instead of
    /// aborting.
    fn is_retryable(&self, _err: &Self::Error) -> bool {
        false
    }
}
