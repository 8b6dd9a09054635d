//! Named builders turning JSON response definitions into response functions.
//!
//! A definition is an object with a `type` key; the remaining keys belong to the builder:
//!
//! - `Norm`: no fields
//! - `Graph`: `x`, `y`, `allowExtrapolation?`
//! - `Spline`: `x`, `y`, `slope?`, `allowExtrapolation?`
//! - `MonotonicSpline`: `lowerBound`, `stepSize`, `values`, `allowExtrapolation?`
//! - `Polynomial`: `coefficients` (ascending powers)

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::dial::{CustomResponse, Graph, MonotonicSpline, ResponseFunction, Spline};
use crate::error::{Error, Result};

pub type ResponseBuilder = Box<dyn Fn(&Value) -> Result<ResponseFunction> + Send + Sync>;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphDef {
    x: Vec<f64>,
    y: Vec<f64>,
    #[serde(default)]
    allow_extrapolation: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SplineDef {
    x: Vec<f64>,
    y: Vec<f64>,
    #[serde(default)]
    slope: Option<Vec<f64>>,
    #[serde(default)]
    allow_extrapolation: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MonotonicSplineDef {
    lower_bound: f64,
    step_size: f64,
    values: Vec<f64>,
    #[serde(default)]
    allow_extrapolation: bool,
}

#[derive(Deserialize)]
struct PolynomialDef {
    coefficients: Vec<f64>,
}

fn fields<T: DeserializeOwned>(kind: &str, def: &Value) -> Result<T> {
    T::deserialize(def).map_err(|e| Error::config(format!("invalid {kind} response: {e}")))
}

pub struct ResponseRegistry {
    builders: BTreeMap<String, ResponseBuilder>,
}

impl ResponseRegistry {
    /// Registry without any builder.
    pub fn empty() -> Self {
        Self {
            builders: BTreeMap::new(),
        }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register("Norm", |_| Ok(ResponseFunction::Norm));
        registry.register("Graph", |def| {
            let d: GraphDef = fields("Graph", def)?;
            Ok(ResponseFunction::Graph(Graph::new(d.x, d.y, d.allow_extrapolation)?))
        });
        registry.register("Spline", |def| {
            let d: SplineDef = fields("Spline", def)?;
            Ok(ResponseFunction::Spline(Spline::new(d.x, d.y, d.slope, d.allow_extrapolation)?))
        });
        registry.register("MonotonicSpline", |def| {
            let d: MonotonicSplineDef = fields("MonotonicSpline", def)?;
            Ok(ResponseFunction::MonotonicSpline(MonotonicSpline::new(
                d.lower_bound,
                d.step_size,
                d.values,
                d.allow_extrapolation,
            )?))
        });
        registry.register("Polynomial", |def| {
            let d: PolynomialDef = fields("Polynomial", def)?;
            if d.coefficients.is_empty() || d.coefficients.iter().any(|c| !c.is_finite()) {
                return Err(Error::config("polynomial needs finite coefficients"));
            }
            Ok(ResponseFunction::Polynomial(d.coefficients))
        });
        registry
    }

    /// Add (or replace) the builder for `kind`.
    pub fn register<F>(&mut self, kind: &str, builder: F)
    where
        F: Fn(&Value) -> Result<ResponseFunction> + Send + Sync + 'static,
    {
        if self.builders.insert(kind.to_string(), Box::new(builder)).is_some() {
            tracing::debug!(kind, "response builder replaced");
        }
    }

    /// Register a closure that needs no configuration fields.
    pub fn register_custom<F>(&mut self, kind: &str, func: F)
    where
        F: Fn(f64) -> f64 + Send + Sync + Clone + 'static,
    {
        let name = kind.to_string();
        self.register(kind, move |_| Ok(ResponseFunction::Custom(CustomResponse::new(&name, func.clone()))));
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.builders.keys().map(String::as_str)
    }

    pub fn build(&self, def: &Value) -> Result<ResponseFunction> {
        let kind = def
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::config("response definition needs a string 'type'"))?;
        let builder = self.builders.get(kind).ok_or_else(|| {
            let known: Vec<&str> = self.kinds().collect();
            Error::config(format!("unknown response type '{kind}' (known: {})", known.join(", ")))
        })?;
        builder(def)
    }
}

impl Default for ResponseRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for ResponseRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseRegistry")
            .field("kinds", &self.builders.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn builds_builtin_variants() {
        let registry = ResponseRegistry::with_builtins();
        let graph = registry
            .build(&json!({ "type": "Graph", "x": [0.0, 1.0], "y": [1.0, 2.0] }))
            .unwrap();
        assert_eq!(graph.type_name(), "Graph");
        assert!((graph.evaluate(0.5) - 1.5).abs() < 1e-15);

        let mono = registry
            .build(&json!({ "type": "MonotonicSpline", "lowerBound": -1.0, "stepSize": 1.0, "values": [0.5, 1.0, 1.5] }))
            .unwrap();
        assert!((mono.evaluate(0.0) - 1.0).abs() < 1e-15);

        let norm = registry.build(&json!({ "type": "Norm" })).unwrap();
        assert_eq!(norm.evaluate(1.3), 1.3);
    }

    #[test]
    fn unknown_or_malformed_definitions_are_config_errors() {
        let registry = ResponseRegistry::with_builtins();
        assert!(matches!(registry.build(&json!({ "type": "Formula" })), Err(Error::Config(_))));
        assert!(matches!(registry.build(&json!({ "x": [0.0] })), Err(Error::Config(_))));
        assert!(matches!(
            registry.build(&json!({ "type": "Spline", "x": [0.0, 1.0] })),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            registry.build(&json!({ "type": "Graph", "x": [1.0, 0.0], "y": [1.0, 2.0] })),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn custom_variants_can_be_registered() {
        let mut registry = ResponseRegistry::with_builtins();
        registry.register_custom("Exp", f64::exp);
        let f = registry.build(&json!({ "type": "Exp" })).unwrap();
        assert_eq!(f.type_name(), "Exp");
        assert!((f.evaluate(1.0) - std::f64::consts::E).abs() < 1e-15);
        assert!(registry.kinds().any(|k| k == "Exp"));
    }
}
