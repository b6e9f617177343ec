//! Error types for the sketch binding layer.

use crate::gcs::SolverError;
use crate::sketch::Oid;
use thiserror::Error;

/// Structural errors raised while building or reading back a sketch.
///
/// Numerical outcomes (non-convergence, conflicts) are not errors; they are
/// reported through [`crate::gcs::SolveStatus`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SketchError {
    #[error("sketch primitive {0} not found")]
    NotFound(Oid),

    #[error("sketch primitive {0} has no allocated parameters")]
    AddressNotFound(Oid),

    #[error("sketch primitive with id {0} already exists")]
    DuplicateId(Oid),

    #[error("sketch primitive {id} is a {found}, expected {expected}")]
    TypeMismatch {
        id: Oid,
        expected: String,
        found: String,
    },

    #[error("unknown primitive kind: {0}")]
    UnknownKind(String),

    #[error("unknown property {property} for primitive <{kind}>")]
    UnknownProperty { kind: String, property: String },

    #[error("unknown sketch parameter: {0}")]
    UnknownNamedParameter(String),

    #[error("sketch primitive {0} is a constraint and cannot be referenced as geometry")]
    UnsupportedReference(Oid),

    #[error("sketch index counter overflow")]
    CounterOverflow,

    #[error("constraint <{kind}> is missing parameter {name}")]
    MissingParameter { kind: String, name: String },

    #[error("malformed parameter {name} in constraint <{kind}>: {reason}")]
    MalformedParameter {
        kind: String,
        name: String,
        reason: String,
    },

    #[error("extra constraint <{0}> must be driving")]
    NonDrivingExtra(String),

    #[error("constraint id {0} does not fit into a solver tag")]
    TagOutOfRange(Oid),

    #[error("{operation} is not valid in the {state} state")]
    InvalidState { operation: String, state: String },

    #[error(transparent)]
    Solver(#[from] SolverError),
}

/// Result type for sketch operations.
pub type SketchResult<T> = Result<T, SketchError>;
