//! `fit-dials` library crate.
//!
//! Fit parameters with Gaussian priors, the covariance geometry relating them
//! (optionally through a pruned eigen decomposition), and dials mapping parameter
//! values to event-weight responses.
//!
//! The binary (`fitdials`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - parameter sets and dials can be driven from other fitting code

pub mod app;
pub mod atomic;
pub mod cli;
pub mod dial;
pub mod domain;
pub mod error;
pub mod io;
pub mod math;
pub mod params;
pub mod plot;
pub mod report;
