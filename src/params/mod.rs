//! Fit parameters and their correlated groups.
//!
//! - single parameters with limits and validity rules (`parameter`)
//! - eigen-basis regularization of a covariance (`eigen`)
//! - correlated parameter sets: inversion, chi-square, basis transforms (`set`)
//! - correlated Gaussian throws (`throw`)
//! - the collection of every set in a model (`manager`)

pub mod eigen;
pub mod manager;
pub mod parameter;
pub mod set;
pub mod throw;

pub use eigen::*;
pub use manager::*;
pub use parameter::*;
pub use set::*;
pub use throw::*;
