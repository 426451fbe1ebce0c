//! Natural cubic spline on a strictly increasing abscissa.
//!
//! The free functions work on borrowed slices so structure-of-arrays tables can
//! share one abscissa across many columns; [`CubicSpline`] owns its data for
//! single-column use.

use crate::error::{CoreError, CoreResult};
use crate::numeric::ensure_strictly_increasing;

/// Second derivatives of the natural cubic spline through `(x, y)`.
pub fn natural_second_derivatives(x: &[f64], y: &[f64]) -> CoreResult<Vec<f64>> {
    let n = x.len();
    if n < 2 {
        return Err(CoreError::InvalidArg {
            what: "spline needs at least two nodes",
        });
    }
    if y.len() != n {
        return Err(CoreError::IndexOob {
            what: "spline ordinate length",
            index: y.len(),
            len: n,
        });
    }
    ensure_strictly_increasing(x, "spline abscissa")?;

    let mut y2 = vec![0.0; n];
    let mut u = vec![0.0; n];
    for i in 1..n - 1 {
        let sig = (x[i] - x[i - 1]) / (x[i + 1] - x[i - 1]);
        let p = sig * y2[i - 1] + 2.0;
        y2[i] = (sig - 1.0) / p;
        let slope_diff = (y[i + 1] - y[i]) / (x[i + 1] - x[i]) - (y[i] - y[i - 1]) / (x[i] - x[i - 1]);
        u[i] = (6.0 * slope_diff / (x[i + 1] - x[i - 1]) - sig * u[i - 1]) / p;
    }
    y2[n - 1] = 0.0;
    for k in (0..n - 1).rev() {
        y2[k] = y2[k] * y2[k + 1] + u[k];
    }
    Ok(y2)
}

/// Index `i` such that `x[i] <= xq <= x[i + 1]`, or `None` outside the range.
pub fn find_interval(x: &[f64], xq: f64) -> Option<usize> {
    let n = x.len();
    if n < 2 || !(xq >= x[0] && xq <= x[n - 1]) {
        return None;
    }
    let mut lo = 0;
    let mut hi = n - 1;
    while hi - lo > 1 {
        let mid = (lo + hi) / 2;
        if x[mid] > xq {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    Some(lo)
}

/// Like [`find_interval`], but walks from `hint` first.
///
/// Cheap when successive queries move monotonically through the table.
pub fn find_interval_from(x: &[f64], xq: f64, hint: usize) -> Option<usize> {
    let n = x.len();
    if n < 2 || !(xq >= x[0] && xq <= x[n - 1]) {
        return None;
    }
    let mut i = hint.min(n - 2);
    while xq < x[i] {
        i -= 1;
    }
    while xq > x[i + 1] {
        i += 1;
    }
    Some(i)
}

fn weights(x: &[f64], i: usize, xq: f64) -> (f64, f64, f64) {
    let h = x[i + 1] - x[i];
    let a = (x[i + 1] - xq) / h;
    (a, 1.0 - a, h)
}

/// Spline value inside segment `i`.
pub fn eval_in(x: &[f64], y: &[f64], y2: &[f64], i: usize, xq: f64) -> f64 {
    let (a, b, h) = weights(x, i, xq);
    a * y[i] + b * y[i + 1] + ((a * a * a - a) * y2[i] + (b * b * b - b) * y2[i + 1]) * h * h / 6.0
}

/// Spline first derivative inside segment `i`.
pub fn derivative_in(x: &[f64], y: &[f64], y2: &[f64], i: usize, xq: f64) -> f64 {
    let (a, b, h) = weights(x, i, xq);
    (y[i + 1] - y[i]) / h - (3.0 * a * a - 1.0) / 6.0 * h * y2[i]
        + (3.0 * b * b - 1.0) / 6.0 * h * y2[i + 1]
}

/// Spline first derivative at every node.
pub fn node_derivatives(x: &[f64], y: &[f64], y2: &[f64]) -> Vec<f64> {
    let n = x.len();
    (0..n)
        .map(|j| {
            if j + 1 < n {
                derivative_in(x, y, y2, j, x[j])
            } else {
                derivative_in(x, y, y2, n - 2, x[n - 1])
            }
        })
        .collect()
}

/// Running integral `∫_{x[0]}^{x[j]} y dx` of the spline at every node.
pub fn cumulative_integral(x: &[f64], y: &[f64], y2: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(x.len());
    let mut acc = 0.0;
    out.push(acc);
    for i in 0..x.len().saturating_sub(1) {
        let h = x[i + 1] - x[i];
        acc += 0.5 * h * (y[i] + y[i + 1]) - h * h * h / 24.0 * (y2[i] + y2[i + 1]);
        out.push(acc);
    }
    out
}

/// Owned single-column natural cubic spline.
#[derive(Clone, Debug)]
pub struct CubicSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    y2: Vec<f64>,
}

impl CubicSpline {
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> CoreResult<Self> {
        let y2 = natural_second_derivatives(&x, &y)?;
        Ok(Self { x, y, y2 })
    }

    pub fn x_min(&self) -> f64 {
        self.x[0]
    }

    pub fn x_max(&self) -> f64 {
        self.x[self.x.len() - 1]
    }

    fn interval(&self, xq: f64) -> CoreResult<usize> {
        find_interval(&self.x, xq).ok_or(CoreError::OutOfRange {
            what: "spline abscissa",
            value: xq,
            min: self.x_min(),
            max: self.x_max(),
        })
    }

    pub fn eval(&self, xq: f64) -> CoreResult<f64> {
        let i = self.interval(xq)?;
        Ok(eval_in(&self.x, &self.y, &self.y2, i, xq))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::linspace;

    #[test]
    fn reproduces_nodes_exactly() {
        let x = vec![0.0, 0.5, 1.7, 2.0, 3.5];
        let y = vec![1.0, -2.0, 0.3, 4.0, 4.1];
        let spline = CubicSpline::new(x.clone(), y.clone()).unwrap();
        for (xi, yi) in x.iter().zip(&y) {
            assert!((spline.eval(*xi).unwrap() - yi).abs() < 1e-12);
        }
    }

    #[test]
    fn natural_spline_is_exact_for_lines() {
        let x = linspace(0.0, 10.0, 7);
        let y: Vec<f64> = x.iter().map(|v| 3.0 * v - 1.0).collect();
        let y2 = natural_second_derivatives(&x, &y).unwrap();
        assert!(node_derivatives(&x, &y, &y2).iter().all(|d| (d - 3.0).abs() < 1e-12));
        let spline = CubicSpline::new(x, y).unwrap();
        assert!((spline.eval(4.321).unwrap() - (3.0 * 4.321 - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn tracks_smooth_function_and_its_integral() {
        let x = linspace(0.0, std::f64::consts::PI, 200);
        let y: Vec<f64> = x.iter().map(|v| v.sin()).collect();
        let y2 = natural_second_derivatives(&x, &y).unwrap();
        let slopes = node_derivatives(&x, &y, &y2);
        assert!((slopes[0] - 1.0).abs() < 1e-4);
        assert!((slopes[199] + 1.0).abs() < 1e-4);
        let integral = cumulative_integral(&x, &y, &y2);
        let spline = CubicSpline::new(x, y).unwrap();
        assert!((spline.eval(1.0).unwrap() - 1.0_f64.sin()).abs() < 1e-6);
        assert!((integral.last().unwrap() - 2.0).abs() < 1e-5);
    }

    #[test]
    fn rejects_out_of_range_and_bad_abscissa() {
        let spline = CubicSpline::new(vec![0.0, 1.0], vec![0.0, 1.0]).unwrap();
        assert!(matches!(spline.eval(1.5), Err(CoreError::OutOfRange { .. })));
        assert!(CubicSpline::new(vec![0.0, 0.0], vec![1.0, 2.0]).is_err());
        assert!(CubicSpline::new(vec![0.0], vec![1.0]).is_err());
    }

    #[test]
    fn hinted_search_agrees_with_bisection() {
        let x = linspace(0.0, 100.0, 101);
        for (hint, xq) in [(0, 57.3), (99, 0.2), (40, 40.0), (3, 100.0)] {
            assert_eq!(find_interval_from(&x, xq, hint), find_interval(&x, xq));
        }
        assert_eq!(find_interval(&x, -0.1), None);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn exact_at_random_nodes(ys in prop::collection::vec(-1e3_f64..1e3, 3..40)) {
            let x: Vec<f64> = (0..ys.len()).map(|i| (i as f64).powf(1.3)).collect();
            let y2 = natural_second_derivatives(&x, &ys).unwrap();
            for i in 0..x.len() - 1 {
                prop_assert!((eval_in(&x, &ys, &y2, i, x[i]) - ys[i]).abs() < 1e-9);
                prop_assert!((eval_in(&x, &ys, &y2, i, x[i + 1]) - ys[i + 1]).abs() < 1e-9);
            }
        }
    }
}
