//! Addresses of primitive and sketch-parameter blocks in the solver's
//! parameter array.

use std::collections::HashMap;

use tracing::trace;

use crate::error::{SketchError, SketchResult};
use crate::gcs::Solver;
use crate::sketch::Oid;

#[derive(Debug, Clone, Default)]
pub struct ParamAllocator {
    addresses: HashMap<Oid, usize>,
    sketch_params: HashMap<String, usize>,
    /// Sketch parameter names in push order
    sketch_param_order: Vec<String>,
}

impl ParamAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `values` to the solver and return the base address. The base
    /// is recorded for `id` only the first time `id` is pushed.
    pub fn push<S: Solver + ?Sized>(&mut self, solver: &mut S, id: Oid, values: &[f64], fixed: bool) -> usize {
        let base = self.push_private(solver, values, fixed);
        self.addresses.entry(id).or_insert(base);
        trace!(%id, base, count = values.len(), fixed, "allocated block");
        base
    }

    /// Append `values` without recording them under any id.
    pub fn push_private<S: Solver + ?Sized>(&mut self, solver: &mut S, values: &[f64], fixed: bool) -> usize {
        let base = solver.params_size();
        for value in values {
            solver.push_param(*value, fixed);
        }
        base
    }

    pub fn address_of(&self, id: Oid) -> SketchResult<usize> {
        self.addresses
            .get(&id)
            .copied()
            .ok_or(SketchError::AddressNotFound(id))
    }

    pub fn has(&self, id: Oid) -> bool {
        self.addresses.contains_key(&id)
    }

    /// Push a named sketch parameter as a fixed scalar. Pushing an existing
    /// name again allocates a new scalar and rebinds the name to it.
    pub fn push_sketch_param<S: Solver + ?Sized>(&mut self, solver: &mut S, name: &str, value: f64) -> usize {
        let addr = self.push_private(solver, &[value], true);
        if self.sketch_params.insert(name.to_string(), addr).is_none() {
            self.sketch_param_order.push(name.to_string());
        }
        addr
    }

    pub fn sketch_param_address(&self, name: &str) -> SketchResult<usize> {
        self.sketch_params
            .get(name)
            .copied()
            .ok_or_else(|| SketchError::UnknownNamedParameter(name.to_string()))
    }

    pub fn sketch_param_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.sketch_param_order.iter().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.addresses.clear();
        self.sketch_params.clear();
        self.sketch_param_order.clear();
    }
}
