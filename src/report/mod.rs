//! Reporting utilities: formatted terminal output for sets, chi-square, scans and throws.

pub mod format;

pub use format::*;
