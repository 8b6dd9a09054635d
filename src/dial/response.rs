//! Response functions: pure scalar maps from an effective parameter value to a weight.
//!
//! The built-in variants are a closed enum so evaluation is a single `match`. Anything
//! else goes through `Custom`, a shared closure registered under a type name.

use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::math::{finite_difference_slope, hermite, linear, monotone_slope, segment_index};

/// Tabulated `(x, y)` points with linear interpolation.
#[derive(Debug, Clone, PartialEq)]
pub struct Graph {
    xs: Vec<f64>,
    ys: Vec<f64>,
    allow_extrapolation: bool,
}

impl Graph {
    pub fn new(xs: Vec<f64>, ys: Vec<f64>, allow_extrapolation: bool) -> Result<Self> {
        check_knots("graph", &xs, &ys, 1)?;
        Ok(Self {
            xs,
            ys,
            allow_extrapolation,
        })
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        if self.xs.len() == 1 {
            return self.ys[0];
        }
        let x = clamp_to_knots(&self.xs, x, self.allow_extrapolation);
        let i = segment_index(&self.xs, x);
        linear(self.xs[i], self.ys[i], self.xs[i + 1], self.ys[i + 1], x)
    }
}

/// Cubic Hermite spline through `(x, y)` knots.
///
/// Slopes default to finite differences. Extrapolation continues linearly with
/// the end slopes.
#[derive(Debug, Clone, PartialEq)]
pub struct Spline {
    xs: Vec<f64>,
    ys: Vec<f64>,
    slopes: Vec<f64>,
    allow_extrapolation: bool,
}

impl Spline {
    pub fn new(xs: Vec<f64>, ys: Vec<f64>, slopes: Option<Vec<f64>>, allow_extrapolation: bool) -> Result<Self> {
        check_knots("spline", &xs, &ys, 2)?;
        let slopes = match slopes {
            Some(s) => {
                if s.len() != xs.len() {
                    return Err(Error::size_mismatch("spline slopes", xs.len(), s.len()));
                }
                if s.iter().any(|v| !v.is_finite()) {
                    return Err(Error::config("spline slopes must be finite"));
                }
                s
            }
            None => (0..xs.len()).map(|i| finite_difference_slope(&xs, &ys, i)).collect(),
        };
        Ok(Self {
            xs,
            ys,
            slopes,
            allow_extrapolation,
        })
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        let last = self.xs.len() - 1;
        if self.allow_extrapolation {
            if x < self.xs[0] {
                return self.ys[0] + self.slopes[0] * (x - self.xs[0]);
            }
            if x > self.xs[last] {
                return self.ys[last] + self.slopes[last] * (x - self.xs[last]);
            }
        }
        let x = x.clamp(self.xs[0], self.xs[last]);
        let i = segment_index(&self.xs, x);
        hermite(
            self.xs[i],
            self.ys[i],
            self.slopes[i],
            self.xs[i + 1],
            self.ys[i + 1],
            self.slopes[i + 1],
            x,
        )
    }
}

/// Uniformly spaced knots with Fritsch–Carlson limited slopes.
#[derive(Debug, Clone, PartialEq)]
pub struct MonotonicSpline {
    lower: f64,
    step: f64,
    values: Vec<f64>,
    slopes: Vec<f64>,
    allow_extrapolation: bool,
}

impl MonotonicSpline {
    pub fn new(lower: f64, step: f64, values: Vec<f64>, allow_extrapolation: bool) -> Result<Self> {
        if !(lower.is_finite() && step.is_finite() && step > 0.0) {
            return Err(Error::config(format!(
                "monotonic spline needs a finite lower bound and a positive step (got {lower}, {step})"
            )));
        }
        if values.len() < 2 {
            return Err(Error::config("monotonic spline needs at least two values"));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(Error::config("monotonic spline values must be finite"));
        }
        let slopes = (0..values.len()).map(|i| monotone_slope(&values, step, i)).collect();
        Ok(Self {
            lower,
            step,
            values,
            slopes,
            allow_extrapolation,
        })
    }

    fn upper(&self) -> f64 {
        self.lower + self.step * (self.values.len() - 1) as f64
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        let last = self.values.len() - 1;
        let upper = self.upper();
        if self.allow_extrapolation {
            if x < self.lower {
                return self.values[0] + self.slopes[0] * (x - self.lower);
            }
            if x > upper {
                return self.values[last] + self.slopes[last] * (x - upper);
            }
        }
        let x = x.clamp(self.lower, upper);
        let i = (((x - self.lower) / self.step).floor() as usize).min(last - 1);
        let x0 = self.lower + self.step * i as f64;
        hermite(
            x0,
            self.values[i],
            self.slopes[i],
            x0 + self.step,
            self.values[i + 1],
            self.slopes[i + 1],
            x,
        )
    }
}

/// A response registered at runtime.
#[derive(Clone)]
pub struct CustomResponse {
    name: Arc<str>,
    func: Arc<dyn Fn(f64) -> f64 + Send + Sync>,
}

impl CustomResponse {
    pub fn new<F>(name: &str, func: F) -> Self
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for CustomResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomResponse").field("name", &self.name).finish()
    }
}

#[derive(Debug, Clone)]
pub enum ResponseFunction {
    /// The effective value itself (normalisation dial).
    Norm,
    Graph(Graph),
    Spline(Spline),
    MonotonicSpline(MonotonicSpline),
    /// `c0 + c1·x + c2·x² + ...`
    Polynomial(Vec<f64>),
    Custom(CustomResponse),
}

impl ResponseFunction {
    pub fn evaluate(&self, x: f64) -> f64 {
        match self {
            ResponseFunction::Norm => x,
            ResponseFunction::Graph(g) => g.evaluate(x),
            ResponseFunction::Spline(s) => s.evaluate(x),
            ResponseFunction::MonotonicSpline(s) => s.evaluate(x),
            ResponseFunction::Polynomial(coefficients) => coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c),
            ResponseFunction::Custom(c) => (c.func)(x),
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            ResponseFunction::Norm => "Norm",
            ResponseFunction::Graph(_) => "Graph",
            ResponseFunction::Spline(_) => "Spline",
            ResponseFunction::MonotonicSpline(_) => "MonotonicSpline",
            ResponseFunction::Polynomial(_) => "Polynomial",
            ResponseFunction::Custom(c) => c.name(),
        }
    }
}

fn check_knots(what: &str, xs: &[f64], ys: &[f64], min_len: usize) -> Result<()> {
    if xs.len() != ys.len() {
        return Err(Error::size_mismatch(format!("{what} y values"), xs.len(), ys.len()));
    }
    if xs.len() < min_len {
        return Err(Error::config(format!("{what} needs at least {min_len} knots, got {}", xs.len())));
    }
    if xs.iter().chain(ys).any(|v| !v.is_finite()) {
        return Err(Error::config(format!("{what} knots must be finite")));
    }
    if xs.windows(2).any(|w| w[1] <= w[0]) {
        return Err(Error::config(format!("{what} knots must be strictly increasing")));
    }
    Ok(())
}

fn clamp_to_knots(xs: &[f64], x: f64, allow_extrapolation: bool) -> f64 {
    if allow_extrapolation {
        x
    } else {
        x.clamp(xs[0], xs[xs.len() - 1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_interpolates_and_clamps() {
        let g = Graph::new(vec![-1.0, 0.0, 2.0], vec![0.5, 1.0, 2.0], false).unwrap();
        assert_eq!(g.evaluate(0.0), 1.0);
        assert!((g.evaluate(1.0) - 1.5).abs() < 1e-15);
        assert_eq!(g.evaluate(5.0), 2.0);
        assert_eq!(g.evaluate(-3.0), 0.5);

        let g = Graph::new(vec![-1.0, 0.0, 2.0], vec![0.5, 1.0, 2.0], true).unwrap();
        assert!((g.evaluate(4.0) - 3.0).abs() < 1e-15);
    }

    #[test]
    fn knots_are_validated() {
        assert!(matches!(Graph::new(vec![0.0, 0.0], vec![1.0, 1.0], false), Err(Error::Config(_))));
        assert!(matches!(
            Graph::new(vec![0.0, 1.0], vec![1.0], false),
            Err(Error::SizeMismatch { .. })
        ));
        assert!(matches!(Spline::new(vec![0.0], vec![1.0], None, false), Err(Error::Config(_))));
        assert!(matches!(MonotonicSpline::new(0.0, 0.0, vec![1.0, 2.0], false), Err(Error::Config(_))));
    }

    #[test]
    fn spline_passes_through_knots() {
        let xs = vec![-2.0, -1.0, 0.0, 1.0, 2.0];
        let ys = vec![0.6, 0.8, 1.0, 1.3, 1.5];
        let s = Spline::new(xs.clone(), ys.clone(), None, false).unwrap();
        for (x, y) in xs.iter().zip(&ys) {
            assert!((s.evaluate(*x) - y).abs() < 1e-14);
        }
        assert!((s.evaluate(10.0) - 1.5).abs() < 1e-14);
    }

    #[test]
    fn monotonic_spline_stays_monotone() {
        let s = MonotonicSpline::new(-3.0, 1.0, vec![0.0, 0.0, 0.1, 1.0, 1.0, 1.05, 3.0], false).unwrap();
        let mut prev = f64::NEG_INFINITY;
        for k in 0..=600 {
            let x = -3.0 + k as f64 * 0.01;
            let y = s.evaluate(x);
            assert!(y >= prev - 1e-12, "not monotone at x={x}: {y} < {prev}");
            prev = y;
        }
        assert!((s.evaluate(3.0) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn polynomial_uses_ascending_coefficients() {
        let p = ResponseFunction::Polynomial(vec![1.0, 0.5, 0.25]);
        assert!((p.evaluate(2.0) - 3.0).abs() < 1e-15);
        assert_eq!(p.type_name(), "Polynomial");
    }

    #[test]
    fn custom_response_keeps_its_name() {
        let c = ResponseFunction::Custom(CustomResponse::new("Exp", f64::exp));
        assert_eq!(c.type_name(), "Exp");
        assert!((c.evaluate(0.0) - 1.0).abs() < 1e-15);
    }
}
