//! Input helpers.
//!
//! - model configuration JSON (`config`)
//! - covariance sources keyed by parameter-set name (`covariance`)

pub mod config;
pub mod covariance;

pub use config::*;
pub use covariance::*;
