//! Schema-driven translation of a [`Constraint`] into one solver call.

use tracing::{trace, warn};

use super::allocator::ParamAllocator;
use super::push_pull;
use crate::error::{SketchError, SketchResult};
use crate::gcs::{ConstraintCall, GeomHandle, Geometry, GeometryClass, Solver, SolverArg, SolverError};
use crate::schema::{FixedParam, ParamKind, ParamSpec};
use crate::sketch::{Constraint, Oid, ParamValue, SketchGeometry, SketchIndex, SketchPrimitive};

/// Tag of constraints pushed through `push_extra_constraint`.
pub const EXTRA_TAG: i32 = -1;

/// Solver tag of the constraint with id `id`.
pub fn tag_for(id: Oid) -> SketchResult<i32> {
    i32::try_from(id.0).map_err(|_| SketchError::TagOutOfRange(id))
}

/// Mutable borrow of the solver that releases every geometry handle made
/// through it when dropped.
pub(crate) struct HandleScope<'s, S: Solver + ?Sized> {
    solver: &'s mut S,
    handles: Vec<GeomHandle>,
}

impl<'s, S: Solver + ?Sized> HandleScope<'s, S> {
    pub fn new(solver: &'s mut S) -> Self {
        Self { solver, handles: Vec::new() }
    }

    pub fn make(&mut self, geometry: Geometry) -> Result<GeomHandle, SolverError> {
        let handle = self.solver.make_geometry(geometry)?;
        self.handles.push(handle);
        Ok(handle)
    }

    pub fn solver(&mut self) -> &mut S {
        &mut *self.solver
    }
}

impl<S: Solver + ?Sized> Drop for HandleScope<'_, S> {
    fn drop(&mut self) {
        for handle in self.handles.drain(..) {
            self.solver.release_geometry(handle);
        }
    }
}

/// Non-driving outputs of a pushed constraint: schema name and the address
/// of the datum the solver measures into.
pub(crate) type Outputs = Vec<(String, usize)>;

/// Resolve every schema parameter of `constraint` and hand the result to the
/// solver. `tag` is [`EXTRA_TAG`] for temporary constraints.
///
/// When the push fails, measurement datums already allocated for it are
/// fixed so they never become unknowns of a later solve.
pub(crate) fn push_constraint<S: Solver + ?Sized>(
    solver: &mut S,
    index: &SketchIndex,
    allocator: &mut ParamAllocator,
    constraint: &Constraint,
    tag: i32,
) -> SketchResult<Outputs> {
    let mut scope = HandleScope::new(solver);
    let mut outputs = Outputs::new();
    match resolve_and_add(&mut scope, index, allocator, constraint, tag, &mut outputs) {
        Ok(()) => Ok(outputs),
        Err(err) => {
            for (_, addr) in &outputs {
                pin_datum(scope.solver(), *addr);
            }
            Err(err)
        }
    }
}

fn pin_datum<S: Solver + ?Sized>(solver: &mut S, addr: usize) {
    let pinned = solver
        .get_param(addr)
        .and_then(|value| solver.set_param(addr, value, true));
    if let Err(err) = pinned {
        warn!(addr, %err, "could not pin orphaned datum");
    }
}

fn resolve_and_add<S: Solver + ?Sized>(
    scope: &mut HandleScope<'_, S>,
    index: &SketchIndex,
    allocator: &mut ParamAllocator,
    constraint: &Constraint,
    tag: i32,
    outputs: &mut Outputs,
) -> SketchResult<()> {
    let kind = constraint.kind;
    let driving = constraint.is_driving();
    let mut args = Vec::with_capacity(kind.arity(true));

    for spec in kind.schema() {
        let arg = match spec.kind {
            ParamKind::Fixed(FixedParam::Tag) => SolverArg::Tag(tag),
            ParamKind::Fixed(FixedParam::Driving) => SolverArg::Bool(driving),
            ParamKind::Fixed(FixedParam::InternalAlignment) => {
                SolverArg::Alignment(constraint.internalalignment.unwrap_or_default())
            }
            ParamKind::ObjectParamOrNumber => match required(constraint, spec)? {
                ParamValue::Number(value) => {
                    let addr = allocator.push_private(scope.solver(), &[*value], driving);
                    if !driving {
                        outputs.push((spec.name.to_string(), addr));
                    }
                    SolverArg::Datum(addr)
                }
                ParamValue::Name(name) => SolverArg::Param(allocator.sketch_param_address(name)?),
                ParamValue::Bool(value) => SolverArg::Bool(*value),
                ParamValue::Ref(r) => {
                    let geometry = referenced_geometry(index, r.o_id)?;
                    SolverArg::Param(push_pull::property_address(allocator, geometry, r.param)?)
                }
            },
            ParamKind::ObjectId(class) => {
                let value = required(constraint, spec)?;
                let id = value.as_oid().ok_or_else(|| malformed(constraint, spec, value))?;
                let geometry = referenced_geometry(index, id)?;
                check_class(geometry, class)?;
                let record = push_pull::geometry_record(allocator, geometry)?;
                SolverArg::Geometry(scope.make(record)?)
            }
            ParamKind::Primitive => match required(constraint, spec)? {
                ParamValue::Number(value) => SolverArg::Number(*value),
                ParamValue::Bool(value) => SolverArg::Bool(*value),
                other => return Err(malformed(constraint, spec, other)),
            },
        };
        trace!(constraint = %constraint.id, param = spec.name, ?arg, "resolved argument");
        args.push(arg);
    }

    if scope.solver().supports_scale() {
        args.push(SolverArg::Scale(constraint.scale_or_default()));
    }
    scope.solver().add_constraint(ConstraintCall { kind, args })?;
    Ok(())
}

fn required<'c>(constraint: &'c Constraint, spec: &ParamSpec) -> SketchResult<&'c ParamValue> {
    constraint.param(spec.name).ok_or_else(|| SketchError::MissingParameter {
        kind: constraint.kind.to_string(),
        name: spec.name.to_string(),
    })
}

fn malformed(constraint: &Constraint, spec: &ParamSpec, value: &ParamValue) -> SketchError {
    let expected = match spec.kind {
        ParamKind::ObjectId(_) => "a primitive id",
        _ => "a number or boolean",
    };
    SketchError::MalformedParameter {
        kind: constraint.kind.to_string(),
        name: spec.name.to_string(),
        reason: format!("expected {}, got {}", expected, value.type_name()),
    }
}

fn referenced_geometry(index: &SketchIndex, id: Oid) -> SketchResult<&SketchGeometry> {
    match index.get_or_fail(id)? {
        SketchPrimitive::Geometry(g) => Ok(g),
        SketchPrimitive::Constraint(_) => Err(SketchError::UnsupportedReference(id)),
    }
}

fn check_class(geometry: &SketchGeometry, expected: GeometryClass) -> SketchResult<()> {
    if expected.accepts(geometry.class()) {
        Ok(())
    } else {
        Err(SketchError::TypeMismatch {
            id: geometry.id(),
            expected: expected.to_string(),
            found: geometry.class().to_string(),
        })
    }
}
