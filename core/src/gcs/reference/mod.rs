//! In-crate least-squares implementation of [`Solver`].
//!
//! Parameters are committed only by [`Solver::apply_solution`]; a solve
//! leaves the parameter array untouched, and applying writes back only the
//! scalars the solve moved. Solving runs in two phases:
//! driving constraints move every free parameter, then non-driving
//! constraints move only their own datum scalars so they measure the solved
//! geometry.

mod diagnosis;
mod equations;
mod numeric;


use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::{debug, trace, warn};

use self::diagnosis::{Diagnosis, RowGroup};
use self::equations::Equation;
use self::numeric::{SolveOptions, System};
use super::{
    Algorithm, ConstraintCall, DebugMode, GeomHandle, Geometry, SolveStatus, Solver, SolverConfig,
    SolverError,
};

/// Error factor separating `Converged` from `Failed`.
const CONVERGED_FACTOR: f64 = 1e4;

#[derive(Debug, Clone)]
struct ConstraintEntry {
    tag: i32,
    driving: bool,
    scale: f64,
    equation: Equation,
    datums: Vec<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct ReferenceSolver {
    params: Vec<f64>,
    fixed: Vec<bool>,
    /// Solved values of the last solve's unknowns and measured datums
    solution: Option<Vec<(usize, f64)>>,
    geometries: HashMap<GeomHandle, Geometry>,
    next_handle: u32,
    /// Radius parameters of every circle or arc ever built.
    radii: BTreeSet<usize>,
    constraints: Vec<ConstraintEntry>,
    config: SolverConfig,
    diagnosis: Diagnosis,
}

impl ReferenceSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SolverConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Number of constraint entries currently held.
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Number of geometry handles not yet released.
    pub fn live_geometries(&self) -> usize {
        self.geometries.len()
    }

    fn check(&self, addr: usize) -> Result<usize, SolverError> {
        if addr < self.params.len() {
            Ok(addr)
        } else {
            Err(SolverError::AddressOutOfRange(addr))
        }
    }

    fn options(&self) -> SolveOptions {
        SolveOptions {
            max_iterations: self.config.max_iterations,
            convergence: self.config.convergence,
            trace_iterations: self.config.debug_mode == DebugMode::IterationLevel,
        }
    }

    /// Residual magnitude under which a single constraint counts as met.
    fn row_tolerance(&self) -> f64 {
        (2.0 * self.config.convergence * CONVERGED_FACTOR).sqrt()
    }

    fn classify(&self, error: f64, solution: &[f64], diagnosis: &Diagnosis) -> SolveStatus {
        if !diagnosis.conflicting.is_empty() {
            return SolveStatus::Failed;
        }
        if error <= self.config.convergence {
            if self.radii.iter().any(|&r| solution[r] < 0.0) {
                SolveStatus::SuccessfulSolutionInvalid
            } else {
                SolveStatus::Success
            }
        } else if error <= self.config.convergence * CONVERGED_FACTOR {
            SolveStatus::Converged
        } else {
            SolveStatus::Failed
        }
    }
}

impl Solver for ReferenceSolver {
    fn push_param(&mut self, value: f64, fixed: bool) -> usize {
        self.params.push(value);
        self.fixed.push(fixed);
        self.params.len() - 1
    }

    fn get_param(&self, addr: usize) -> Result<f64, SolverError> {
        self.check(addr).map(|a| self.params[a])
    }

    fn set_param(&mut self, addr: usize, value: f64, fixed: bool) -> Result<(), SolverError> {
        let addr = self.check(addr)?;
        self.params[addr] = value;
        self.fixed[addr] = fixed;
        Ok(())
    }

    fn params_size(&self) -> usize {
        self.params.len()
    }

    fn get_params(&self) -> Vec<f64> {
        self.params.clone()
    }

    fn make_geometry(&mut self, geometry: Geometry) -> Result<GeomHandle, SolverError> {
        for addr in geometry.addresses() {
            self.check(addr)?;
        }
        match geometry {
            Geometry::Circle { radius, .. } | Geometry::Arc { radius, .. } => {
                self.radii.insert(radius);
            }
            _ => {}
        }
        let handle = GeomHandle(self.next_handle);
        self.next_handle = self.next_handle.wrapping_add(1);
        self.geometries.insert(handle, geometry);
        Ok(handle)
    }

    fn release_geometry(&mut self, handle: GeomHandle) {
        self.geometries.remove(&handle);
    }

    fn add_constraint(&mut self, call: ConstraintCall) -> Result<(), SolverError> {
        let built = equations::build(&call, &self.geometries, self.params.len())?;
        if self.config.debug_mode != DebugMode::NoDebug {
            trace!(kind = %call.kind, tag = built.tag, driving = built.driving, "constraint added");
        }
        self.constraints.push(ConstraintEntry {
            tag: built.tag,
            driving: built.driving,
            scale: built.scale,
            equation: built.equation,
            datums: built.datums,
        });
        Ok(())
    }

    fn supports_scale(&self) -> bool {
        true
    }

    fn clear_by_tag(&mut self, tag: i32) {
        // a removed measurement's datum would otherwise turn into a free unknown
        for entry in self.constraints.iter().filter(|c| c.tag == tag) {
            for &datum in &entry.datums {
                self.fixed[datum] = true;
            }
        }
        self.constraints.retain(|c| c.tag != tag);
    }

    fn solve_system(&mut self, algorithm: Algorithm) -> SolveStatus {
        let options = self.options();

        let measured: HashSet<usize> = self
            .constraints
            .iter()
            .filter(|c| !c.driving)
            .flat_map(|c| c.datums.iter().copied())
            .collect();
        let unknowns: Vec<usize> = (0..self.params.len())
            .filter(|a| !self.fixed[*a] && !measured.contains(a))
            .collect();

        let driving: Vec<&ConstraintEntry> = self.constraints.iter().filter(|c| c.driving).collect();
        let system = System::new(
            &self.params,
            &unknowns,
            driving.iter().map(|c| (&c.equation, c.scale)).collect(),
        );
        let outcome = numeric::minimize(&system, algorithm, &options);
        let mut solution = system.expand(&outcome.x);

        let groups: Vec<RowGroup> = system
            .row_ranges()
            .into_iter()
            .zip(&driving)
            .map(|(rows, c)| RowGroup { tag: c.tag, rows })
            .collect();
        let residuals = system.residuals(&outcome.x);
        let jacobian = system.jacobian(&outcome.x);
        let diagnosis = diagnosis::diagnose(&jacobian, &residuals, &groups, self.row_tolerance());

        let mut outputs: Vec<usize> = measured.into_iter().filter(|a| !self.fixed[*a]).collect();
        outputs.sort_unstable();
        if !outputs.is_empty() {
            let reference = self.constraints.iter().filter(|c| !c.driving);
            let system = System::new(
                &solution,
                &outputs,
                reference.map(|c| (&c.equation, c.scale)).collect(),
            );
            let readout = numeric::minimize(&system, Algorithm::LevenbergMarquardt, &options);
            solution = system.expand(&readout.x);
        }

        let status = self.classify(outcome.error, &solution, &diagnosis);
        if self.config.debug_mode != DebugMode::NoDebug {
            debug!(
                ?algorithm,
                ?status,
                error = outcome.error,
                iterations = outcome.iterations,
                unknowns = unknowns.len(),
                dof = diagnosis.dof,
                "solve finished"
            );
        }
        if status == SolveStatus::Failed {
            warn!(
                error = outcome.error,
                conflicting = ?diagnosis.conflicting,
                "solve failed"
            );
        }

        self.diagnosis = diagnosis;
        self.solution = Some(
            unknowns
                .iter()
                .chain(&outputs)
                .map(|&addr| (addr, solution[addr]))
                .collect(),
        );
        status
    }

    fn apply_solution(&mut self) {
        for (addr, value) in self.solution.take().unwrap_or_default() {
            if let Some(slot) = self.params.get_mut(addr) {
                *slot = value;
            }
        }
    }

    fn clear_data(&mut self) {
        *self = Self::with_config(self.config.clone());
    }

    fn get_conflicting(&self) -> Vec<i32> {
        self.diagnosis.conflicting.clone()
    }

    fn get_redundant(&self) -> Vec<i32> {
        self.diagnosis.redundant.clone()
    }

    fn get_partially_redundant(&self) -> Vec<i32> {
        self.diagnosis.partially_redundant.clone()
    }

    fn dof(&self) -> i32 {
        self.diagnosis.dof
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
