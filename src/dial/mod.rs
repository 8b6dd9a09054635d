//! Dials: cached response functions bound to parameters.
//!
//! This module defines:
//!
//! - response functions and their registry of named builders (`response`, `registry`)
//! - the per-dial memoization cache (`cache`)
//! - the dial itself, with mirror folding and response clamping (`dial`)
//! - supervisors and interfaces consumed by reweighting (`supervisor`, `interface`)
//! - per-set collections evaluated on the rayon pool (`collection`)

pub mod cache;
pub mod collection;
#[allow(clippy::module_inception)]
pub mod dial;
pub mod interface;
pub mod registry;
pub mod response;
pub mod supervisor;

pub use cache::*;
pub use collection::*;
pub use dial::*;
pub use interface::*;
pub use registry::*;
pub use response::*;
pub use supervisor::*;
