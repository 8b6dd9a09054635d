//! A single fit parameter.
//!
//! Static attributes (index, prior, std-dev, limits, flags) are fixed once the owning
//! set finishes initialization. The current value lives in a lock-free cell so that a
//! parameter can be shared (`Arc<Parameter>`) between the writer phase (optimizer/toy
//! updates) and the reader phase (dial evaluation on worker threads).
//!
//! Limits are enforced when a value is written. Reads never correct a value; an
//! out-of-domain read is reported as a warning.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::atomic::AtomicF64;
use crate::domain::{Bounds, PriorType, Validity};
use crate::error::{Error, Result};

/// Mirror bounds changing by more than this is reported.
const MIRROR_CHANGE_TOL: f64 = 1e-6;

#[derive(Debug)]
pub struct Parameter {
    owner: String,
    index: usize,
    name: String,

    value: AtomicF64,
    updated: AtomicBool,

    prior: f64,
    std_dev: f64,
    prior_type: PriorType,
    step_size: Option<f64>,

    domain: Bounds,
    mirror: Bounds,
    physical: Bounds,
    validity: Validity,

    enabled: bool,
    fixed: bool,
}

impl Parameter {
    /// New enabled parameter sitting at its prior.
    pub fn new(owner: impl Into<String>, index: usize, name: impl Into<String>, prior: f64, std_dev: f64) -> Self {
        Self {
            owner: owner.into(),
            index,
            name: name.into(),
            value: AtomicF64::new(prior),
            updated: AtomicBool::new(false),
            prior,
            std_dev,
            prior_type: PriorType::Gaussian,
            step_size: None,
            domain: Bounds::UNBOUNDED,
            mirror: Bounds::UNBOUNDED,
            physical: Bounds::UNBOUNDED,
            validity: Validity::default(),
            enabled: true,
            fixed: false,
        }
    }

    pub fn with_domain(mut self, domain: Bounds) -> Self {
        self.domain = domain;
        self
    }

    pub fn with_physical(mut self, physical: Bounds) -> Self {
        self.physical = physical;
        self
    }

    pub fn with_mirror(mut self, mirror: Bounds) -> Self {
        self.set_mirror(mirror);
        self
    }

    pub fn with_validity(mut self, validity: Validity) -> Self {
        self.validity = validity;
        self
    }

    pub fn with_prior_type(mut self, prior_type: PriorType) -> Self {
        self.prior_type = prior_type;
        self
    }

    pub fn with_step_size(mut self, step_size: f64) -> Self {
        self.step_size = Some(step_size);
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_fixed(mut self, fixed: bool) -> Self {
        self.fixed = fixed;
        self
    }

    /// Override the prior; the current value follows it.
    pub fn with_prior(mut self, prior: f64) -> Self {
        self.prior = prior;
        self.value = AtomicF64::new(prior);
        self
    }

    /// Replace the mirror bounds, reporting any change to an already-set edge.
    pub fn set_mirror(&mut self, mirror: Bounds) {
        let sides = [
            ("Minimum", self.mirror.min, mirror.min),
            ("Maximum", self.mirror.max, mirror.max),
        ];
        for (side, old, new) in sides {
            if let (Some(old), Some(new)) = (old, new) {
                if (old - new).abs() > MIRROR_CHANGE_TOL {
                    tracing::warn!(
                        parameter = %self.full_title(),
                        old,
                        new,
                        "{side} mirror bound changed"
                    );
                }
            }
        }
        self.mirror = mirror;
    }

    /// Check the enabled-parameter invariants.
    pub fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        let checks = [
            ("prior", self.prior),
            ("std-dev", self.std_dev),
            ("value", self.value.load(Ordering::Acquire)),
        ];
        for (what, v) in checks {
            if !v.is_finite() {
                return Err(Error::config(format!("{}: {what} is not set ({v})", self.full_title())));
            }
        }
        Ok(())
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `#<index>` followed by `_<name>` when the parameter is named.
    pub fn title(&self) -> String {
        if self.name.is_empty() {
            format!("#{}", self.index)
        } else {
            format!("#{}_{}", self.index, self.name)
        }
    }

    pub fn full_title(&self) -> String {
        format!("{}/{}", self.owner, self.title())
    }

    pub fn prior(&self) -> f64 {
        self.prior
    }

    pub fn std_dev(&self) -> f64 {
        self.std_dev
    }

    pub fn prior_type(&self) -> PriorType {
        self.prior_type
    }

    /// A flat prior leaves the parameter unconstrained by the penalty term.
    pub fn is_free(&self) -> bool {
        self.prior_type == PriorType::Flat
    }

    pub fn step_size(&self) -> Option<f64> {
        self.step_size
    }

    pub fn domain(&self) -> Bounds {
        self.domain
    }

    pub fn mirror(&self) -> Bounds {
        self.mirror
    }

    pub fn physical(&self) -> Bounds {
        self.physical
    }

    pub fn validity(&self) -> Validity {
        self.validity
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    /// Current value. An out-of-domain value is reported, not corrected.
    pub fn value(&self) -> f64 {
        let v = self.value.load(Ordering::Acquire);
        if !self.domain.contains(v) {
            tracing::warn!(parameter = %self.summary_of(v), "reading out of bounds parameter");
        }
        v
    }

    /// Write `v` after checking it against the active validity flags.
    pub fn set_value(&self, v: f64) -> Result<()> {
        self.check_value(v)?;
        self.store(v);
        Ok(())
    }

    /// Write `v` regardless of validity; the violation (if any) is logged and returned.
    ///
    /// Non-finite values are never stored, forced or not.
    pub fn force_value(&self, v: f64) -> Result<Option<Error>> {
        if !v.is_finite() {
            return Err(Error::Domain {
                parameter: self.full_title(),
                value: v,
                reason: "not finite".to_string(),
            });
        }
        let violation = self.check_value(v).err();
        if let Some(err) = &violation {
            tracing::warn!(error = %err, "forced continuation with invalid parameter");
        }
        self.store(v);
        Ok(violation)
    }

    /// `set_value` or `force_value` depending on `force`.
    pub fn set_value_with(&self, v: f64, force: bool) -> Result<()> {
        if force {
            self.force_value(v)?;
            Ok(())
        } else {
            self.set_value(v)
        }
    }

    pub fn set_value_at_prior(&self) {
        self.store(self.prior);
    }

    /// Whether the last write changed the value.
    pub fn got_updated(&self) -> bool {
        self.updated.load(Ordering::Acquire)
    }

    fn store(&self, v: f64) {
        let prev = self.value.swap(v, Ordering::AcqRel);
        self.updated.store(prev.to_bits() != v.to_bits(), Ordering::Release);
    }

    /// `Ok` when `v` passes every check selected by the validity mask.
    pub fn check_value(&self, v: f64) -> Result<()> {
        let reason = if v.is_nan() {
            Some("not a number".to_string())
        } else if self.validity.contains(Validity::DOMAIN) && !self.is_in_domain(v) {
            Some(format!("outside domain {}", self.domain.describe()))
        } else if self.validity.contains(Validity::MIRROR) && self.is_mirrored(v) {
            Some(format!("outside mirror range {}", self.mirror.describe()))
        } else if self.validity.contains(Validity::PHYSICAL) && !self.is_physical(v) {
            Some(format!("outside physical range {}", self.physical.describe()))
        } else {
            None
        };
        match reason {
            None => Ok(()),
            Some(reason) => Err(Error::Domain {
                parameter: self.full_title(),
                value: v,
                reason,
            }),
        }
    }

    pub fn is_valid_value(&self, v: f64) -> bool {
        self.check_value(v).is_ok()
    }

    pub fn is_in_domain(&self, v: f64) -> bool {
        self.domain.contains(v)
    }

    /// `true` when `v` lies outside the mirror bounds.
    pub fn is_mirrored(&self, v: f64) -> bool {
        self.mirror.is_below(v) || self.mirror.is_above(v)
    }

    pub fn is_physical(&self, v: f64) -> bool {
        self.is_in_domain(v) && self.physical.contains(v)
    }

    pub fn is_value_within_bounds(&self) -> bool {
        self.domain.contains(self.value.load(Ordering::Acquire))
    }

    /// `(value - prior) / std_dev`.
    pub fn distance_from_prior(&self) -> f64 {
        (self.value() - self.prior) / self.std_dev
    }

    pub fn summary(&self) -> String {
        self.summary_of(self.value.load(Ordering::Acquire))
    }

    fn summary_of(&self, v: f64) -> String {
        let mut out = format!(
            "{}, isEnabled={}: value={}, prior={}, stdDev={}, bounds={}",
            self.full_title(),
            self.enabled,
            v,
            self.prior,
            self.std_dev,
            self.domain.describe()
        );
        if !self.domain.contains(v) {
            out.push_str(" out of bounds");
        }
        out
    }
}
