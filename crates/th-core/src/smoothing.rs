//! Cubic step weights for blending across approximation boundaries.
//!
//! Both map their interval onto [0, 1] with zero slope at the endpoints, so a
//! blend `w * a + (1 - w) * b` is continuous in value and first derivative.
//! Arguments outside the interval are clamped.

/// Rises from 0 at `s = -1` to 1 at `s = 1`.
pub fn step_centered(s: f64) -> f64 {
    let s = s.clamp(-1.0, 1.0);
    -0.75 * s * (s * s / 3.0 - 1.0) + 0.5
}

/// Rises from 0 at `s = 0` to 1 at `s = 1`.
pub fn step_unit(s: f64) -> f64 {
    let s = s.clamp(0.0, 1.0);
    s * s * (0.5 - s / 3.0) * 6.0
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn centered_step_is_monotone(a in -1.0_f64..1.0, b in -1.0_f64..1.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(step_centered(lo) <= step_centered(hi) + 1e-15);
            prop_assert!((0.0..=1.0).contains(&step_centered(a)));
        }

        #[test]
        fn unit_step_is_monotone(a in 0.0_f64..1.0, b in 0.0_f64..1.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(step_unit(lo) <= step_unit(hi) + 1e-15);
            prop_assert!((0.0..=1.0).contains(&step_unit(a)));
        }
    }
}
