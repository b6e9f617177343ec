/// Length below which a vector counts as degenerate.
pub const EPSILON: f64 = 1e-6;

pub mod utils_2d;
pub use utils_2d::*;
