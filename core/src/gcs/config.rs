use serde::{Deserialize, Serialize};

use super::{Algorithm, DebugMode};

/// Configuration of a solver session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Algorithm used when `solve` is called without one
    pub algorithm: Algorithm,
    /// Iteration cap per solve phase
    pub max_iterations: usize,
    /// Squared-error threshold below which a solve counts as a success
    pub convergence: f64,
    /// Verbosity of solver logging
    pub debug_mode: DebugMode,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::DogLeg,
            max_iterations: 100,
            convergence: 1e-10,
            debug_mode: DebugMode::NoDebug,
        }
    }
}
