//! Plotting utilities.
//!
//! The crate ships a small ASCII renderer for scans so the CLI stays dependency-light
//! and output is deterministic for tests.

pub mod ascii;

pub use ascii::*;
