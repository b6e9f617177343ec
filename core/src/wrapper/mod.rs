//! Binding between a declarative sketch and a [`Solver`].
//!
//! [`GcsWrapper`] owns one solver session: it allocates solver parameters
//! for pushed geometry, turns constraints into solver calls, runs the solve
//! and writes the solved values back into the sketch index.

pub mod allocator;
pub mod dispatch;
pub mod push_pull;

pub use allocator::ParamAllocator;
pub use dispatch::{tag_for, EXTRA_TAG};
pub use push_pull::{normalize_angle, ANGLE_EPSILON};

#[cfg(test)]
mod tests_dispatch;



use std::collections::HashMap;
use std::fmt;

use tracing::{debug, warn};

use crate::error::{SketchError, SketchResult};
use crate::gcs::{Algorithm, DebugMode, SolveStatus, Solver, SolverConfig};
use crate::sketch::{
    Constraint, Oid, ParamValue, SketchDocument, SketchIndex, SketchObject, SketchPrimitive,
};

/// Where a session is in its push / solve / apply cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Empty,
    Building,
    Solved,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Empty => "empty",
            Self::Building => "building",
            Self::Solved => "solved",
        })
    }
}

pub struct GcsWrapper<S: Solver> {
    gcs: S,
    sketch_index: SketchIndex,
    allocator: ParamAllocator,
    /// Datum addresses of non-driving constraints, read back on apply
    non_driving: HashMap<Oid, Vec<(String, usize)>>,
    state: SessionState,
    algorithm: Algorithm,
}

impl<S: Solver> GcsWrapper<S> {
    pub fn new(gcs: S) -> Self {
        Self {
            gcs,
            sketch_index: SketchIndex::new(),
            allocator: ParamAllocator::new(),
            non_driving: HashMap::new(),
            state: SessionState::Empty,
            algorithm: Algorithm::default(),
        }
    }

    /// Wrap `gcs` and apply `config` to it.
    pub fn with_config(gcs: S, config: &SolverConfig) -> Self {
        let mut wrapper = Self::new(gcs);
        wrapper.gcs.set_debug_mode(config.debug_mode);
        wrapper.gcs.set_max_iterations(config.max_iterations);
        wrapper.gcs.set_convergence(config.convergence);
        wrapper.algorithm = config.algorithm;
        wrapper
    }

    pub fn gcs(&self) -> &S {
        &self.gcs
    }

    pub fn gcs_mut(&mut self) -> &mut S {
        &mut self.gcs
    }

    pub fn sketch_index(&self) -> &SketchIndex {
        &self.sketch_index
    }

    pub fn allocator(&self) -> &ParamAllocator {
        &self.allocator
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    // ------------------------------------------------------------------
    // Building
    // ------------------------------------------------------------------

    /// Push one primitive into the solver and record it in the index.
    ///
    /// On error the index is left unchanged.
    pub fn push_primitive(&mut self, primitive: &SketchPrimitive) -> SketchResult<()> {
        let id = primitive.id();
        if self.sketch_index.has(id) {
            return Err(SketchError::DuplicateId(id));
        }
        if self.sketch_index.counter() == u32::MAX {
            return Err(SketchError::CounterOverflow);
        }

        match primitive {
            SketchPrimitive::Geometry(geometry) => {
                push_pull::push_geometry(&mut self.gcs, &self.sketch_index, &mut self.allocator, geometry)?;
            }
            SketchPrimitive::Constraint(constraint) => {
                let tag = tag_for(id)?;
                let outputs = dispatch::push_constraint(
                    &mut self.gcs,
                    &self.sketch_index,
                    &mut self.allocator,
                    constraint,
                    tag,
                )?;
                if !outputs.is_empty() {
                    self.non_driving.insert(id, outputs);
                }
            }
        }

        self.sketch_index.set(primitive.clone())?;
        self.state = SessionState::Building;
        debug!(%id, kind = primitive.type_name(), params = self.gcs.params_size(), "pushed primitive");
        Ok(())
    }

    /// Push primitives in order, stopping at the first failure.
    pub fn push_primitives<'a, I>(&mut self, primitives: I) -> SketchResult<()>
    where
        I: IntoIterator<Item = &'a SketchPrimitive>,
    {
        for primitive in primitives {
            self.push_primitive(primitive)?;
        }
        Ok(())
    }

    /// Push a named parameter or a primitive.
    pub fn push_object(&mut self, object: &SketchObject) -> SketchResult<()> {
        match object {
            SketchObject::Param(param) => {
                let param = param.as_param();
                self.push_sketch_param(&param.name, param.value);
                Ok(())
            }
            SketchObject::Primitive(primitive) => self.push_primitive(primitive),
        }
    }

    /// Push objects in order, stopping at the first failure.
    pub fn push_objects<'a, I>(&mut self, objects: I) -> SketchResult<()>
    where
        I: IntoIterator<Item = &'a SketchObject>,
    {
        for object in objects {
            self.push_object(object)?;
        }
        Ok(())
    }

    /// Push a document's sketch parameters, then its primitives.
    pub fn push_document(&mut self, document: &SketchDocument) -> SketchResult<()> {
        for param in &document.params {
            self.push_sketch_param(&param.name, param.value);
        }
        self.push_primitives(&document.primitives)
    }

    /// Push a temporary constraint. It is not stored in the index and is
    /// reported with [`EXTRA_TAG`].
    ///
    /// Extra constraints have no index entry to write measurements into, so
    /// a non-driving one is rejected before anything is pushed.
    pub fn push_extra_constraint(&mut self, constraint: &Constraint) -> SketchResult<()> {
        if !constraint.is_driving() {
            return Err(SketchError::NonDrivingExtra(constraint.kind.to_string()));
        }
        dispatch::push_constraint(
            &mut self.gcs,
            &self.sketch_index,
            &mut self.allocator,
            constraint,
            EXTRA_TAG,
        )?;
        self.state = SessionState::Building;
        debug!(kind = %constraint.kind, "pushed extra constraint");
        Ok(())
    }

    /// Remove every constraint pushed with [`push_extra_constraint`](Self::push_extra_constraint).
    pub fn clear_extra_constraints(&mut self) {
        self.gcs.clear_by_tag(EXTRA_TAG);
        self.state = SessionState::Building;
    }

    /// Remove a constraint from the solver and the index. Returns whether
    /// the index held it.
    pub fn delete_constraint_by_id(&mut self, id: Oid) -> SketchResult<bool> {
        if let Some(SketchPrimitive::Geometry(g)) = self.sketch_index.get(id) {
            return Err(SketchError::TypeMismatch {
                id,
                expected: "constraint".to_string(),
                found: g.class().to_string(),
            });
        }
        let tag = tag_for(id)?;
        self.gcs.clear_by_tag(tag);
        self.non_driving.remove(&id);
        self.state = SessionState::Building;
        Ok(self.sketch_index.delete(id))
    }

    pub fn push_sketch_param(&mut self, name: &str, value: f64) -> usize {
        let addr = self.allocator.push_sketch_param(&mut self.gcs, name, value);
        self.state = SessionState::Building;
        debug!(name, value, addr, "pushed sketch parameter");
        addr
    }

    pub fn set_sketch_param(&mut self, name: &str, value: f64) -> SketchResult<()> {
        let addr = self.allocator.sketch_param_address(name)?;
        self.gcs.set_param(addr, value, true)?;
        // the last solve no longer matches the parameter
        self.state = SessionState::Building;
        Ok(())
    }

    pub fn get_sketch_param_value(&self, name: &str) -> SketchResult<f64> {
        let addr = self.allocator.sketch_param_address(name)?;
        Ok(self.gcs.get_param(addr)?)
    }

    // ------------------------------------------------------------------
    // Solving
    // ------------------------------------------------------------------

    /// Solve with the session's default algorithm.
    pub fn solve(&mut self) -> SolveStatus {
        self.solve_with(self.algorithm)
    }

    pub fn solve_with(&mut self, algorithm: Algorithm) -> SolveStatus {
        let status = self.gcs.solve_system(algorithm);
        self.state = SessionState::Solved;
        if status == SolveStatus::Failed {
            warn!(
                conflicting = ?self.gcs.get_conflicting(),
                "sketch solve failed"
            );
        } else {
            debug!(?status, dof = self.gcs.dof(), "sketch solved");
        }
        status
    }

    /// Commit the last solve and copy the solved values back into the
    /// index: geometry scalars, and the measured values of non-driving
    /// constraints.
    pub fn apply_solution(&mut self) -> SketchResult<()> {
        if self.state != SessionState::Solved {
            return Err(SketchError::InvalidState {
                operation: "apply_solution".to_string(),
                state: self.state.to_string(),
            });
        }
        self.gcs.apply_solution();

        let ids = self.sketch_index.ids().to_vec();
        for id in ids {
            match self.sketch_index.get_mut(id) {
                Some(SketchPrimitive::Geometry(geometry)) => {
                    push_pull::pull_geometry(&self.gcs, &self.allocator, geometry)?;
                }
                Some(SketchPrimitive::Constraint(constraint)) => {
                    let Some(outputs) = self.non_driving.get(&id) else {
                        continue;
                    };
                    for (name, addr) in outputs {
                        let value = self.gcs.get_param(*addr)?;
                        constraint.params.insert(name.clone(), ParamValue::Number(value));
                    }
                }
                None => warn!(%id, "indexed id has no primitive"),
            }
        }
        Ok(())
    }

    /// Drop everything pushed so far. Solver settings are kept.
    pub fn clear_data(&mut self) {
        self.gcs.clear_data();
        self.sketch_index.clear();
        self.allocator.clear();
        self.non_driving.clear();
        self.state = SessionState::Empty;
    }

    // ------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------

    pub fn get_gcs_params(&self) -> Vec<f64> {
        self.gcs.get_params()
    }

    pub fn get_gcs_conflicts(&self) -> Vec<i32> {
        self.gcs.get_conflicting()
    }

    pub fn get_gcs_redundant(&self) -> Vec<i32> {
        self.gcs.get_redundant()
    }

    pub fn get_gcs_partially_redundant(&self) -> Vec<i32> {
        self.gcs.get_partially_redundant()
    }

    pub fn has_gcs_conflicts(&self) -> bool {
        self.gcs.has_conflicting()
    }

    pub fn has_gcs_redundant(&self) -> bool {
        self.gcs.has_redundant()
    }

    pub fn has_gcs_partially_redundant(&self) -> bool {
        self.gcs.has_partially_redundant()
    }

    /// Conflicting constraints that are still in the index.
    pub fn get_conflicting_constraints(&self) -> Vec<Oid> {
        self.constraints_for_tags(self.gcs.get_conflicting())
    }

    pub fn get_redundant_constraints(&self) -> Vec<Oid> {
        self.constraints_for_tags(self.gcs.get_redundant())
    }

    pub fn get_partially_redundant_constraints(&self) -> Vec<Oid> {
        self.constraints_for_tags(self.gcs.get_partially_redundant())
    }

    fn constraints_for_tags(&self, tags: Vec<i32>) -> Vec<Oid> {
        tags.into_iter()
            .filter_map(|tag| u32::try_from(tag).ok().map(Oid))
            .filter(|id| self.sketch_index.get_constraint(*id).is_ok())
            .collect()
    }

    pub fn dof(&self) -> i32 {
        self.gcs.dof()
    }

    // ------------------------------------------------------------------
    // Solver settings
    // ------------------------------------------------------------------

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn set_algorithm(&mut self, algorithm: Algorithm) {
        self.algorithm = algorithm;
    }

    pub fn debug_mode(&self) -> DebugMode {
        self.gcs.debug_mode()
    }

    pub fn set_debug_mode(&mut self, mode: DebugMode) {
        self.gcs.set_debug_mode(mode);
    }

    pub fn max_iterations(&self) -> usize {
        self.gcs.max_iterations()
    }

    pub fn set_max_iterations(&mut self, iterations: usize) {
        self.gcs.set_max_iterations(iterations);
    }

    pub fn convergence(&self) -> f64 {
        self.gcs.convergence()
    }

    pub fn set_convergence(&mut self, threshold: f64) {
        self.gcs.set_convergence(threshold);
    }
}
