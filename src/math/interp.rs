//! Interpolation kernels used by the response functions.
//!
//! Numerical notes:
//! - Segments are located with a binary search over sorted knots; the last
//!   segment is reused for inputs at or beyond the upper knot.
//! - The monotone kernel limits Hermite slopes with the Fritsch–Carlson rule so
//!   that monotone knot data never over/undershoots between knots.

/// Index `i` of the segment `[xs[i], xs[i+1]]` containing `x`, clamped to the
/// first/last segment. Requires `xs.len() >= 2`.
pub fn segment_index(xs: &[f64], x: f64) -> usize {
    let last = xs.len() - 2;
    match xs.binary_search_by(|k| k.total_cmp(&x)) {
        Ok(i) => i.min(last),
        Err(0) => 0,
        Err(i) => (i - 1).min(last),
    }
}

/// Straight line through `(x0, y0)` and `(x1, y1)` evaluated at `x`.
pub fn linear(x0: f64, y0: f64, x1: f64, y1: f64, x: f64) -> f64 {
    let dx = x1 - x0;
    if dx == 0.0 {
        return y0;
    }
    y0 + (y1 - y0) * (x - x0) / dx
}

/// Cubic Hermite segment with end values `y0`, `y1` and end slopes `m0`, `m1`.
pub fn hermite(x0: f64, y0: f64, m0: f64, x1: f64, y1: f64, m1: f64, x: f64) -> f64 {
    let h = x1 - x0;
    if h == 0.0 {
        return y0;
    }
    let t = (x - x0) / h;
    let t2 = t * t;
    let t3 = t2 * t;
    let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
    let h10 = t3 - 2.0 * t2 + t;
    let h01 = -2.0 * t3 + 3.0 * t2;
    let h11 = t3 - t2;
    h00 * y0 + h10 * h * m0 + h01 * y1 + h11 * h * m1
}

/// Finite-difference slope estimate at knot `i` (one-sided at the ends).
pub fn finite_difference_slope(xs: &[f64], ys: &[f64], i: usize) -> f64 {
    let n = xs.len();
    if n < 2 {
        return 0.0;
    }
    let (a, b) = if i == 0 {
        (0, 1)
    } else if i == n - 1 {
        (n - 2, n - 1)
    } else {
        (i - 1, i + 1)
    };
    let dx = xs[b] - xs[a];
    if dx == 0.0 { 0.0 } else { (ys[b] - ys[a]) / dx }
}

/// Fritsch–Carlson limited slope at knot `i` of uniformly spaced values.
///
/// The slope is zero at local extrema and clipped to three times the adjacent
/// secants elsewhere, which preserves monotonicity of the interpolant.
pub fn monotone_slope(values: &[f64], step: f64, i: usize) -> f64 {
    let n = values.len();
    if n < 2 || step == 0.0 {
        return 0.0;
    }
    let secant = |k: usize| (values[k + 1] - values[k]) / step;
    if i == 0 {
        return secant(0);
    }
    if i == n - 1 {
        return secant(n - 2);
    }
    let left = secant(i - 1);
    let right = secant(i);
    if left * right <= 0.0 {
        return 0.0;
    }
    let slope = 0.5 * (left + right);
    let bound = 3.0 * left.abs().min(right.abs());
    slope.signum() * slope.abs().min(bound)
}
