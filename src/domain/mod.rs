//! Domain types shared by parameters and dials.
//!
//! This module defines:
//!
//! - optional `[min, max]` limits (`Bounds`) used for domain, mirror and physical ranges
//! - the validity mask selecting which of those ranges are enforced (`Validity`)
//! - prior kinds (`PriorType`)
//! - axis-aligned applicability regions (`DataBin`)
//! - the serde configuration model (`ModelConfig`, `ParameterSetConfig`, ...)

pub mod bin;
pub mod config;
pub mod types;

pub use bin::*;
pub use config::*;
pub use types::*;
