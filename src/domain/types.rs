//! Limits, validity flags and prior kinds.
//!
//! An unset limit is `None`. Limits are never encoded as NaN, so comparisons
//! against an unset side cannot silently evaluate to `false`.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Optional `[min, max]` limits. A missing side is unconstrained.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Bounds {
    pub const UNBOUNDED: Bounds = Bounds { min: None, max: None };

    /// Build limits, rejecting non-finite edges and inverted pairs.
    pub fn new(min: Option<f64>, max: Option<f64>) -> Result<Self> {
        for edge in [min, max].into_iter().flatten() {
            if !edge.is_finite() {
                return Err(Error::config(format!("limit {edge} is not finite")));
            }
        }
        if let (Some(lo), Some(hi)) = (min, max) {
            if lo > hi {
                return Err(Error::config(format!("inverted limits [{lo}, {hi}]")));
            }
        }
        Ok(Self { min, max })
    }

    pub fn is_below(&self, value: f64) -> bool {
        self.min.is_some_and(|lo| value < lo)
    }

    pub fn is_above(&self, value: f64) -> bool {
        self.max.is_some_and(|hi| value > hi)
    }

    /// `true` when `value` is a number lying inside both set edges.
    pub fn contains(&self, value: f64) -> bool {
        !value.is_nan() && !self.is_below(value) && !self.is_above(value)
    }

    /// Width of the range when both sides are set.
    pub fn span(&self) -> Option<f64> {
        match (self.min, self.max) {
            (Some(lo), Some(hi)) => Some(hi - lo),
            _ => None,
        }
    }

    /// Merge `other` on top of `self`: sides set in `other` win.
    pub fn overridden_by(self, other: Bounds) -> Result<Bounds> {
        Bounds::new(other.min.or(self.min), other.max.or(self.max))
    }

    pub fn describe(&self) -> String {
        let lo = self.min.map_or_else(|| "-inf".to_string(), |v| v.to_string());
        let hi = self.max.map_or_else(|| "+inf".to_string(), |v| v.to_string());
        format!("[ {lo}, {hi} ]")
    }
}

/// Bit-mask selecting which range checks make a value valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Validity(u8);

impl Validity {
    pub const DOMAIN: Validity = Validity(0b0001);
    pub const MIRROR: Validity = Validity(0b0010);
    pub const PHYSICAL: Validity = Validity(0b0100);
    pub const NONE: Validity = Validity(0);

    pub fn contains(self, flag: Validity) -> bool {
        self.0 & flag.0 != 0
    }

    pub fn with(self, flag: Validity) -> Self {
        Validity(self.0 | flag.0)
    }

    pub fn without(self, flag: Validity) -> Self {
        Validity(self.0 & !flag.0)
    }

    /// Apply a validity string on top of `self`.
    ///
    /// Tokens: `ran`/`noran` (domain), `mir`/`nomir` (mirror), `phy`/`nophy`
    /// (physical). They may appear in any order and with any separator, e.g.
    /// `"range,mirror"` or `"noran,phys"`.
    pub fn parse_onto(self, spec: &str) -> Self {
        let mut out = self;
        for (neg, pos, flag) in [
            ("noran", "ran", Validity::DOMAIN),
            ("nomir", "mir", Validity::MIRROR),
            ("nophy", "phy", Validity::PHYSICAL),
        ] {
            if spec.contains(neg) {
                out = out.without(flag);
            } else if spec.contains(pos) {
                out = out.with(flag);
            }
        }
        out
    }
}

impl Default for Validity {
    fn default() -> Self {
        Validity::DOMAIN
    }
}

/// How a parameter's prior enters the penalty term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PriorType {
    #[default]
    Gaussian,
    /// No penalty: the parameter is free and skipped by the chi-square.
    Flat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_sides_never_constrain() {
        let b = Bounds::new(Some(0.0), None).unwrap();
        assert!(b.contains(1e300));
        assert!(!b.contains(-1e-9));
        assert!(!b.contains(f64::NAN));
        assert!(Bounds::UNBOUNDED.contains(-5.0));
    }

    #[test]
    fn describe_marks_unset_sides_as_infinite() {
        let b = Bounds::new(None, Some(2.0)).unwrap();
        assert_eq!(b.describe(), "[ -inf, 2 ]");
    }

    #[test]
    fn inverted_limits_are_rejected() {
        assert!(matches!(Bounds::new(Some(2.0), Some(1.0)), Err(Error::Config(_))));
    }

    #[test]
    fn validity_tokens_toggle_bits() {
        let v = Validity::default().parse_onto("noran,mirror,physical");
        assert!(!v.contains(Validity::DOMAIN));
        assert!(v.contains(Validity::MIRROR));
        assert!(v.contains(Validity::PHYSICAL));
        let v = v.parse_onto("range,nomir");
        assert!(v.contains(Validity::DOMAIN));
        assert!(!v.contains(Validity::MIRROR));
    }
}
