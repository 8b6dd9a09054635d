//! A response function bound to one parameter, with mirror folding, clamping and a cache.

use std::sync::Arc;

use crate::dial::{CachedResponse, ResponseCache, ResponseFunction};
use crate::error::{Error, Result};
use crate::params::Parameter;

/// Fold-and-reflect of the input into `[low_edge, low_edge + range]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mirror {
    low_edge: f64,
    range: f64,
}

impl Mirror {
    pub fn new(low_edge: f64, range: f64) -> Result<Self> {
        if !(low_edge.is_finite() && range.is_finite() && range > 0.0) {
            return Err(Error::config(format!(
                "mirror needs a finite low edge and a positive range (got {low_edge}, {range})"
            )));
        }
        Ok(Self { low_edge, range })
    }

    pub fn low_edge(&self) -> f64 {
        self.low_edge
    }

    pub fn range(&self) -> f64 {
        self.range
    }

    /// Triangular periodic map with period `2·range`.
    pub fn fold(&self, v: f64) -> f64 {
        let period = 2.0 * self.range;
        let mut d = ((v - self.low_edge) % period).abs();
        if d > self.range {
            d = period - d;
        }
        self.low_edge + d
    }
}

/// Optional `[min, max]` clamp on a raw response.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResponseClamp {
    min: Option<f64>,
    max: Option<f64>,
}

impl ResponseClamp {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Result<Self> {
        if let (Some(lo), Some(hi)) = (min, max) {
            if lo > hi {
                return Err(Error::config(format!("response clamp is inverted: [{lo}, {hi}]")));
            }
        }
        if min.into_iter().chain(max).any(|v| !v.is_finite()) {
            return Err(Error::config("response clamp bounds must be finite"));
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> Option<f64> {
        self.min
    }

    pub fn max(&self) -> Option<f64> {
        self.max
    }

    /// Minimum checked first, then maximum.
    pub fn apply(&self, raw: f64) -> f64 {
        match (self.min, self.max) {
            (Some(lo), _) if raw < lo => lo,
            (_, Some(hi)) if raw > hi => hi,
            _ => raw,
        }
    }
}

#[derive(Debug)]
pub struct Dial {
    function: ResponseFunction,
    parameter: Option<Arc<Parameter>>,
    mirror: Option<Mirror>,
    clamp: ResponseClamp,
    cache: ResponseCache,
}

impl Dial {
    /// Unbound dial: `evaluate` fails until a parameter is bound.
    pub fn new(function: ResponseFunction) -> Self {
        Self {
            function,
            parameter: None,
            mirror: None,
            clamp: ResponseClamp::default(),
            cache: ResponseCache::new(),
        }
    }

    pub fn with_parameter(mut self, parameter: Arc<Parameter>) -> Self {
        self.bind(parameter);
        self
    }

    pub fn with_mirror(mut self, mirror: Mirror) -> Self {
        self.mirror = Some(mirror);
        self
    }

    pub fn with_clamp(mut self, clamp: ResponseClamp) -> Self {
        self.clamp = clamp;
        self
    }

    /// Bind (or rebind) the governing parameter. Clears the cache.
    pub fn bind(&mut self, parameter: Arc<Parameter>) {
        self.parameter = Some(parameter);
        self.cache.clear();
    }

    pub fn is_bound(&self) -> bool {
        self.parameter.is_some()
    }

    pub fn parameter(&self) -> Option<&Arc<Parameter>> {
        self.parameter.as_ref()
    }

    pub fn function(&self) -> &ResponseFunction {
        &self.function
    }

    pub fn mirror(&self) -> Option<Mirror> {
        self.mirror
    }

    pub fn clamp(&self) -> ResponseClamp {
        self.clamp
    }

    /// Response for the governing parameter's current value.
    pub fn evaluate(&self) -> Result<f64> {
        let parameter = self.parameter.as_ref().ok_or(Error::Unbound)?;
        Ok(self.evaluate_at(parameter.value()))
    }

    /// Response for an explicit input, through the same cache.
    pub fn evaluate_at(&self, v: f64) -> f64 {
        self.cache.get_or_compute(v, |v| {
            let effective = self.effective_value(v);
            (effective, self.clamp.apply(self.function.evaluate(effective)))
        })
    }

    pub fn effective_value(&self, v: f64) -> f64 {
        match &self.mirror {
            Some(mirror) => mirror.fold(v),
            None => v,
        }
    }

    /// Last cached evaluation, if any.
    pub fn cached(&self) -> Option<CachedResponse> {
        self.cache.snapshot()
    }

    /// Forget the cached evaluation; the bindings stay.
    pub fn reset(&self) {
        self.cache.clear();
    }

    /// `<set>/<parameter>(<value>)/<response type>`.
    pub fn summary(&self) -> String {
        match &self.parameter {
            Some(p) => format!("{}({})/{}", p.full_title(), p.value(), self.function.type_name()),
            None => format!("unbound/{}", self.function.type_name()),
        }
    }
}
