pub mod curve;
pub mod registry;

pub use curve::*;
pub use registry::*;
