//! A [`Solver`] that only records what it is asked to do.

use std::collections::HashMap;

use super::{
    Algorithm, ConstraintCall, DebugMode, GeomHandle, Geometry, SolveStatus, Solver, SolverConfig,
    SolverError,
};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PushedParam {
    pub value: f64,
    pub fixed: bool,
}

#[derive(Debug, Default)]
pub(crate) struct RecordingSolver {
    pub params: Vec<PushedParam>,
    pub made: Vec<(GeomHandle, Geometry)>,
    pub released: Vec<GeomHandle>,
    pub calls: Vec<ConstraintCall>,
    pub cleared_tags: Vec<i32>,
    /// Error returned by every `add_constraint` call when set.
    pub fail_with: Option<SolverError>,
    pub with_scale: bool,
    pub conflicting: Vec<i32>,
    pub redundant: Vec<i32>,
    pub partially_redundant: Vec<i32>,
    pub applied: usize,
    live: HashMap<GeomHandle, Geometry>,
    next_handle: u32,
    config: SolverConfig,
}

impl RecordingSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scaled() -> Self {
        Self {
            with_scale: true,
            ..Self::default()
        }
    }

    pub fn failing(error: SolverError) -> Self {
        Self {
            fail_with: Some(error),
            ..Self::default()
        }
    }

    /// Handles made but not yet released.
    pub fn live_handles(&self) -> usize {
        self.live.len()
    }

    pub fn values(&self) -> Vec<f64> {
        self.params.iter().map(|p| p.value).collect()
    }
}

impl Solver for RecordingSolver {
    fn push_param(&mut self, value: f64, fixed: bool) -> usize {
        self.params.push(PushedParam { value, fixed });
        self.params.len() - 1
    }

    fn get_param(&self, addr: usize) -> Result<f64, SolverError> {
        self.params
            .get(addr)
            .map(|p| p.value)
            .ok_or(SolverError::AddressOutOfRange(addr))
    }

    fn set_param(&mut self, addr: usize, value: f64, fixed: bool) -> Result<(), SolverError> {
        let slot = self
            .params
            .get_mut(addr)
            .ok_or(SolverError::AddressOutOfRange(addr))?;
        *slot = PushedParam { value, fixed };
        Ok(())
    }

    fn params_size(&self) -> usize {
        self.params.len()
    }

    fn get_params(&self) -> Vec<f64> {
        self.values()
    }

    fn make_geometry(&mut self, geometry: Geometry) -> Result<GeomHandle, SolverError> {
        let handle = GeomHandle(self.next_handle);
        self.next_handle += 1;
        self.made.push((handle, geometry));
        self.live.insert(handle, geometry);
        Ok(handle)
    }

    fn release_geometry(&mut self, handle: GeomHandle) {
        self.released.push(handle);
        self.live.remove(&handle);
    }

    fn add_constraint(&mut self, call: ConstraintCall) -> Result<(), SolverError> {
        if let Some(err) = &self.fail_with {
            return Err(err.clone());
        }
        self.calls.push(call);
        Ok(())
    }

    fn supports_scale(&self) -> bool {
        self.with_scale
    }

    fn clear_by_tag(&mut self, tag: i32) {
        self.cleared_tags.push(tag);
    }

    fn solve_system(&mut self, _algorithm: Algorithm) -> SolveStatus {
        SolveStatus::Success
    }

    fn apply_solution(&mut self) {
        self.applied += 1;
    }

    fn clear_data(&mut self) {
        self.params.clear();
        self.calls.clear();
        self.live.clear();
    }

    fn get_conflicting(&self) -> Vec<i32> {
        self.conflicting.clone()
    }

    fn get_redundant(&self) -> Vec<i32> {
        self.redundant.clone()
    }

    fn get_partially_redundant(&self) -> Vec<i32> {
        self.partially_redundant.clone()
    }

    fn dof(&self) -> i32 {
        0
    }

    fn debug_mode(&self) -> DebugMode {
        self.config.debug_mode
    }

    fn set_debug_mode(&mut self, mode: DebugMode) {
        self.config.debug_mode = mode;
    }

    fn max_iterations(&self) -> usize {
        self.config.max_iterations
    }

    fn set_max_iterations(&mut self, iterations: usize) {
        self.config.max_iterations = iterations;
    }

    fn convergence(&self) -> f64 {
        self.config.convergence
    }

    fn set_convergence(&mut self, threshold: f64) {
        self.config.convergence = threshold;
    }
}
