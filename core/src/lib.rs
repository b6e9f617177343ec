pub mod error;
pub mod gcs;
pub mod geometry;
pub mod schema;
pub mod sketch;
pub mod wrapper;

pub use error::{SketchError, SketchResult};
pub use gcs::{Algorithm, DebugMode, ReferenceSolver, SolveStatus, Solver, SolverConfig};
pub use wrapper::{GcsWrapper, SessionState};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
