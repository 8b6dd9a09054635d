//! Mathematical utilities: symmetric linear algebra and interpolation kernels.

pub mod interp;
pub mod linalg;

pub use interp::*;
pub use linalg::*;
