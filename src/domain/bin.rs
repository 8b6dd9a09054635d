//! Applicability regions.
//!
//! A `DataBin` is an axis-aligned box over named event variables. The dial layer
//! only carries it around (for the consumer that decides whether a dial applies to
//! an event) and prints it in summaries; it never evaluates it itself.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One axis of a bin: `min <= x < max`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinEdge {
    pub variable: String,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataBin {
    edges: Vec<BinEdge>,
}

impl DataBin {
    pub fn new(edges: Vec<BinEdge>) -> Result<Self> {
        for edge in &edges {
            if !(edge.min.is_finite() && edge.max.is_finite()) || edge.min > edge.max {
                return Err(Error::config(format!(
                    "invalid bin edge for '{}': [{}, {}]",
                    edge.variable, edge.min, edge.max
                )));
            }
        }
        Ok(Self { edges })
    }

    pub fn edges(&self) -> &[BinEdge] {
        &self.edges
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// `values` are aligned with `edges()`.
    pub fn is_in(&self, values: &[f64]) -> bool {
        values.len() == self.edges.len()
            && self
                .edges
                .iter()
                .zip(values)
                .all(|(e, &x)| e.min <= x && x < e.max)
    }

    /// Look variables up by name. A missing variable means "not in the bin".
    pub fn is_in_by<F>(&self, mut lookup: F) -> bool
    where
        F: FnMut(&str) -> Option<f64>,
    {
        self.edges.iter().all(|e| {
            lookup(&e.variable).is_some_and(|x| e.min <= x && x < e.max)
        })
    }

    pub fn summary(&self) -> String {
        let parts: Vec<String> = self
            .edges
            .iter()
            .map(|e| format!("{}: [{}, {}[", e.variable, e.min, e.max))
            .collect();
        parts.join(", ")
    }
}
