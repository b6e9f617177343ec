//! Solver boundary.
//!
//! The binding layer talks to the numerical solver only through the
//! [`Solver`] trait: a flat parameter array, geometry handles built from
//! address records, and one typed constraint entry point per
//! [`ConstraintKind`]. [`ReferenceSolver`] is the in-crate implementation.

pub mod config;
pub mod geometry;
pub mod reference;

#[cfg(test)]
pub(crate) mod recording;

pub use config::SolverConfig;
pub use geometry::{ArcBounds, Geometry, GeometryClass, PointAddr};
pub use reference::ReferenceSolver;

use crate::schema::{ConstraintKind, InternalAlignment};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by a solver implementation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SolverError {
    #[error("parameter address {0} is out of range")]
    AddressOutOfRange(usize),

    #[error("unknown geometry handle {0}")]
    UnknownHandle(u32),

    #[error("constraint <{kind}> expects {expected} arguments, got {found}")]
    ArityMismatch {
        kind: ConstraintKind,
        expected: usize,
        found: usize,
    },

    #[error("argument {index} of constraint <{kind}> must be {expected}")]
    ArgumentType {
        kind: ConstraintKind,
        index: usize,
        expected: String,
    },

    #[error("constraint <{kind}> does not support {geometry} geometry")]
    UnsupportedGeometry {
        kind: ConstraintKind,
        geometry: GeometryClass,
    },
}

/// Opaque handle of a solver-side geometry object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeomHandle(pub u32);

/// One positional argument of a constraint call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SolverArg {
    /// Address of a parameter owned by geometry or a named sketch parameter.
    Param(usize),
    /// Address of a scalar allocated privately for this constraint's value.
    Datum(usize),
    Geometry(GeomHandle),
    Bool(bool),
    Number(f64),
    Tag(i32),
    Alignment(InternalAlignment),
    Scale(f64),
}

/// A resolved constraint, ready for the solver.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintCall {
    pub kind: ConstraintKind,
    pub args: Vec<SolverArg>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Algorithm {
    Bfgs,
    LevenbergMarquardt,
    #[default]
    DogLeg,
}

/// Outcome of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStatus {
    /// All driving constraints are satisfied within the convergence threshold.
    Success,
    /// The iteration settled, but only within a relaxed threshold.
    Converged,
    Failed,
    /// The constraints are met by a geometrically invalid configuration
    /// (e.g. a negative radius).
    SuccessfulSolutionInvalid,
}

impl SolveStatus {
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success | Self::Converged)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DebugMode {
    #[default]
    NoDebug,
    Minimal,
    IterationLevel,
}

/// The numerical constraint solver as seen by the binding layer.
pub trait Solver {
    /// Append a parameter and return its address.
    fn push_param(&mut self, value: f64, fixed: bool) -> usize;

    fn get_param(&self, addr: usize) -> Result<f64, SolverError>;

    fn set_param(&mut self, addr: usize, value: f64, fixed: bool) -> Result<(), SolverError>;

    /// Length of the parameter array, which is also the next free address.
    fn params_size(&self) -> usize;

    fn get_params(&self) -> Vec<f64>;

    /// Build a geometry object over already-pushed parameters.
    fn make_geometry(&mut self, geometry: Geometry) -> Result<GeomHandle, SolverError>;

    /// Release a handle returned by [`Solver::make_geometry`].
    fn release_geometry(&mut self, handle: GeomHandle);

    fn add_constraint(&mut self, call: ConstraintCall) -> Result<(), SolverError>;

    /// Whether constraint calls take a trailing [`SolverArg::Scale`].
    fn supports_scale(&self) -> bool {
        false
    }

    /// Remove every constraint carrying `tag`.
    fn clear_by_tag(&mut self, tag: i32);

    fn solve_system(&mut self, algorithm: Algorithm) -> SolveStatus;

    /// Commit the last solution into the parameter array.
    fn apply_solution(&mut self);

    /// Drop all parameters, geometry and constraints.
    fn clear_data(&mut self);

    fn get_conflicting(&self) -> Vec<i32>;

    fn get_redundant(&self) -> Vec<i32>;

    fn get_partially_redundant(&self) -> Vec<i32>;

    fn has_conflicting(&self) -> bool {
        !self.get_conflicting().is_empty()
    }

    fn has_redundant(&self) -> bool {
        !self.get_redundant().is_empty()
    }

    fn has_partially_redundant(&self) -> bool {
        !self.get_partially_redundant().is_empty()
    }

    /// Remaining degrees of freedom after the last solve.
    fn dof(&self) -> i32;

    fn debug_mode(&self) -> DebugMode;

    fn set_debug_mode(&mut self, mode: DebugMode);

    fn max_iterations(&self) -> usize;

    fn set_max_iterations(&mut self, iterations: usize);

    fn convergence(&self) -> f64;

    fn set_convergence(&mut self, threshold: f64);
}
