//! Dials of one parameter set, built from its dial definitions.

use std::sync::Arc;

use rayon::prelude::*;

use crate::dial::{Dial, DialInterface, Mirror, ResponseClamp, ResponseRegistry, ResponseSupervisor};
use crate::domain::{DataBin, DialDefinition};
use crate::error::{Error, Result};
use crate::params::{Parameter, ParameterSet};

#[derive(Debug, Default)]
pub struct DialCollection {
    name: String,
    interfaces: Vec<DialInterface>,
}

impl DialCollection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            interfaces: Vec::new(),
        }
    }

    /// One interface per definition of `set`'s `dialSetDefinitions`.
    pub fn from_definitions(set: &ParameterSet, registry: &ResponseRegistry) -> Result<Self> {
        let mut collection = Self::new(set.name());
        if !set.is_enabled() {
            return Ok(collection);
        }
        for (i, def) in set.config().dial_set_definitions.iter().enumerate() {
            let iface = build_interface(set, def, registry)
                .map_err(|e| e.context(format!("{} dial definition #{i}", set.name())))?;
            collection.push(iface);
        }
        tracing::info!(set = %set.name(), dials = collection.len(), "dial collection built");
        Ok(collection)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn push(&mut self, iface: DialInterface) {
        self.interfaces.push(iface);
    }

    pub fn len(&self) -> usize {
        self.interfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
    }

    pub fn interfaces(&self) -> &[DialInterface] {
        &self.interfaces
    }

    /// Interfaces whose dial is bound to `parameter`.
    pub fn for_parameter<'a>(&'a self, parameter: &'a Arc<Parameter>) -> impl Iterator<Item = &'a DialInterface> + 'a {
        self.interfaces
            .iter()
            .filter(move |iface| iface.dial().parameter().is_some_and(|p| Arc::ptr_eq(p, parameter)))
    }

    /// Evaluate every interface on the rayon pool; order follows `interfaces()`.
    pub fn evaluate_all(&self) -> Result<Vec<f64>> {
        self.interfaces.par_iter().map(DialInterface::eval_response).collect()
    }

    pub fn reset_all(&self) {
        self.interfaces.par_iter().for_each(|iface| iface.dial().reset());
    }

    pub fn summary(&self) -> String {
        let mut out = format!("{}: {} dials", self.name, self.interfaces.len());
        for iface in &self.interfaces {
            out.push_str("\n  ");
            out.push_str(&iface.summary());
        }
        out
    }
}

fn build_interface(set: &ParameterSet, def: &DialDefinition, registry: &ResponseRegistry) -> Result<DialInterface> {
    let parameter = match (&def.parameter_name, def.parameter_index) {
        (Some(name), _) => set.find_parameter(name),
        (None, Some(index)) => set.parameter(index),
        (None, None) => return Err(Error::config("needs 'parameterName' or 'parameterIndex'")),
    }
    .ok_or_else(|| Error::config("refers to an unknown parameter"))?
    .clone();

    let mut dial = Dial::new(registry.build(&def.response)?)
        .with_clamp(ResponseClamp::new(def.min_dial_response, def.max_dial_response)?);

    if def.use_mirror_dial {
        let mirror = parameter.mirror();
        let low_edge = def.mirror_low_edge.or(mirror.min);
        let range = def.mirror_range.or(mirror.span());
        match (low_edge, range) {
            (Some(low_edge), Some(range)) => dial = dial.with_mirror(Mirror::new(low_edge, range)?),
            _ => {
                return Err(Error::config(format!(
                    "mirror dial on {} needs mirrorLowEdge/mirrorRange or mirror limits",
                    parameter.full_title()
                )));
            }
        }
    }

    let mut iface = DialInterface::new(Arc::new(dial.with_parameter(parameter)));
    if let Some(bin) = &def.apply_condition {
        iface = iface.with_bin(DataBin::new(bin.edges().to_vec())?);
    }
    if let Some(sup) = def.supervisor {
        let clamp = ResponseClamp::new(sup.min_response, sup.max_response)?;
        iface = iface.with_supervisor(Arc::new(ResponseSupervisor::new(clamp)));
    }
    Ok(iface)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::{CovarianceEntry, ParameterDefinition, ParameterSetConfig, SupervisorConfig};
    use crate::io::CovarianceStore;

    fn set(dials: Vec<DialDefinition>) -> ParameterSet {
        let source = CovarianceStore::new().with_entry(
            "xsec",
            CovarianceEntry {
                matrix: vec![vec![0.04, 0.0], vec![0.0, 0.09]],
                names: Some(vec!["MaQE".into(), "norm".into()]),
                ..CovarianceEntry::default()
            },
        );
        let config = ParameterSetConfig {
            parameter_definitions: vec![ParameterDefinition {
                parameter_name: Some("MaQE".into()),
                mirror_limits: Some([Some(0.0), Some(2.0)]),
                ..ParameterDefinition::default()
            }],
            dial_set_definitions: dials,
            ..ParameterSetConfig::new("xsec")
        };
        let mut set = ParameterSet::new(config);
        set.initialize(&source).unwrap();
        set
    }

    fn graph_def(name: &str) -> DialDefinition {
        DialDefinition {
            parameter_name: Some(name.into()),
            response: json!({ "type": "Graph", "x": [0.0, 1.0, 2.0], "y": [0.5, 1.0, 2.0] }),
            ..DialDefinition::default()
        }
    }

    #[test]
    fn builds_and_evaluates_in_parallel() {
        let norm = DialDefinition {
            parameter_index: Some(1),
            response: json!({ "type": "Norm" }),
            supervisor: Some(SupervisorConfig {
                min_response: Some(0.0),
                max_response: Some(1.1),
            }),
            ..DialDefinition::default()
        };
        let set = set(vec![graph_def("MaQE"), norm]);
        let dials = DialCollection::from_definitions(&set, &ResponseRegistry::with_builtins()).unwrap();
        assert_eq!(dials.len(), 2);
        assert_eq!(dials.evaluate_all().unwrap(), vec![1.0, 1.0]);

        set.parameter(1).unwrap().set_value(1.3).unwrap();
        set.parameter(0).unwrap().set_value(1.5).unwrap();
        assert_eq!(dials.evaluate_all().unwrap(), vec![1.5, 1.1]);

        dials.reset_all();
        assert!(dials.interfaces().iter().all(|i| i.dial().cached().is_none()));
        assert_eq!(dials.for_parameter(set.parameter(0).unwrap()).count(), 1);
    }

    #[test]
    fn mirror_falls_back_to_parameter_mirror_limits() {
        let def = DialDefinition {
            use_mirror_dial: true,
            ..graph_def("MaQE")
        };
        let set = set(vec![def]);
        let dials = DialCollection::from_definitions(&set, &ResponseRegistry::with_builtins()).unwrap();
        let mirror = dials.interfaces()[0].dial().mirror().unwrap();
        assert_eq!((mirror.low_edge(), mirror.range()), (0.0, 2.0));
        // 2.5 folds back onto 1.5.
        assert_eq!(dials.interfaces()[0].dial().evaluate_at(2.5), 1.5);
    }

    #[test]
    fn mirror_without_limits_is_rejected() {
        let def = DialDefinition {
            use_mirror_dial: true,
            ..graph_def("norm")
        };
        let set = set(vec![def]);
        let err = DialCollection::from_definitions(&set, &ResponseRegistry::with_builtins()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn build_errors_keep_their_kind() {
        let def = DialDefinition {
            parameter_name: Some("MaQE".into()),
            response: json!({ "type": "Graph", "x": [0.0, 1.0, 2.0], "y": [0.5, 1.0] }),
            ..DialDefinition::default()
        };
        let set = set(vec![graph_def("MaQE"), def]);
        let err = DialCollection::from_definitions(&set, &ResponseRegistry::with_builtins()).unwrap_err();
        assert!(matches!(&err, Error::SizeMismatch { expected: 3, actual: 2, .. }));
        assert!(err.to_string().contains("xsec dial definition #1"));
    }

    #[test]
    fn unknown_parameter_is_rejected() {
        let set = set(vec![graph_def("MaRES")]);
        assert!(matches!(
            DialCollection::from_definitions(&set, &ResponseRegistry::with_builtins()),
            Err(Error::Config(_))
        ));
    }
}
