use crate::CoreError;

/// Floating point type used throughout system
pub type Real = f64;

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CoreError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoreError::NonFinite { what, value: v })
    }
}

/// Check that a slice is strictly increasing and finite.
pub fn ensure_strictly_increasing(xs: &[Real], what: &'static str) -> Result<(), CoreError> {
    for (i, &x) in xs.iter().enumerate() {
        ensure_finite(x, what)?;
        if i > 0 && x <= xs[i - 1] {
            return Err(CoreError::InvalidArg { what });
        }
    }
    Ok(())
}

/// Evenly spaced points from `start` to `end`, both included.
pub fn linspace(start: Real, end: Real, n: usize) -> Vec<Real> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as Real;
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + step * i as Real })
                .collect()
        }
    }
}

/// Points evenly spaced in `ln(x)` from `start` to `end`, both included.
pub fn logspace(start: Real, end: Real, n: usize) -> Vec<Real> {
    linspace(start.ln(), end.ln(), n)
        .into_iter()
        .enumerate()
        .map(|(i, v)| {
            if i == 0 {
                start
            } else if i == n - 1 {
                end
            } else {
                v.exp()
            }
        })
        .collect()
}

/// Complementary error function (Abramowitz & Stegun 7.1.26).
///
/// Absolute error below 1.5e-7.
pub fn erfc(x: Real) -> Real {
    let ax = x.abs();
    let t = 1.0 / (1.0 + 0.327_591_1 * ax);
    let poly = t
        * (0.254_829_592
            + t * (-0.284_496_736 + t * (1.421_413_741 + t * (-1.453_152_027 + t * 1.061_405_429))));
    let tail = poly * (-ax * ax).exp();
    if x >= 0.0 { tail } else { 2.0 - tail }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(Real::NAN, "test").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("Non-finite"));
    }

    #[test]
    fn strictly_increasing_rejects_repeats() {
        assert!(ensure_strictly_increasing(&[0.0, 1.0, 2.0], "xs").is_ok());
        assert!(ensure_strictly_increasing(&[0.0, 1.0, 1.0], "xs").is_err());
        assert!(ensure_strictly_increasing(&[0.0, Real::NAN], "xs").is_err());
    }

    #[test]
    fn erfc_reference_values() {
        assert!((erfc(0.0) - 1.0).abs() < 2e-7);
        assert!((erfc(0.5) - 0.479_500_122).abs() < 2e-7);
        assert!((erfc(1.5) - 0.033_894_854).abs() < 2e-7);
        assert!((erfc(-1.0) - 1.842_700_793).abs() < 2e-7);
        assert!(erfc(30.0) == 0.0);
    }

    #[test]
    fn grids_hit_endpoints() {
        let lin = linspace(0.0, 50.0, 11);
        assert_eq!(lin.len(), 11);
        assert_eq!(lin[0], 0.0);
        assert_eq!(lin[10], 50.0);
        assert!((lin[1] - 5.0).abs() < 1e-12);

        let log = logspace(1e4, 5e6, 7);
        assert_eq!(log[0], 1e4);
        assert_eq!(log[6], 5e6);
        assert!(log.windows(2).all(|w| w[1] > w[0]));
    }
}
