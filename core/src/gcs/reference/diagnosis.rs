//! Conflict and redundancy analysis on the Jacobian at the solution.
//!
//! Constraints are visited in insertion order. Each residual row is
//! orthogonalised against the rows accepted so far; rows that add nothing to
//! the span are dependent. A dependent constraint that is satisfied is
//! redundant (or partially redundant if only some of its rows are
//! dependent); an unsatisfied one is conflicting together with the earlier
//! constraints its rows depend on.

use std::ops::Range;

use nalgebra::{DMatrix, DVector};

/// Remaining row norm, relative to the original, below which a row is
/// treated as linearly dependent.
const RANK_TOLERANCE: f64 = 1e-8;
/// Coefficient magnitude above which an accepted row takes part in a
/// dependency.
const DEPENDENCY_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Diagnosis {
    pub conflicting: Vec<i32>,
    pub redundant: Vec<i32>,
    pub partially_redundant: Vec<i32>,
    pub dof: i32,
}

/// Rows of one constraint and the tag it reports under.
pub(crate) struct RowGroup {
    pub tag: i32,
    pub rows: Range<usize>,
}

pub(crate) fn diagnose(
    jacobian: &DMatrix<f64>,
    residuals: &DVector<f64>,
    groups: &[RowGroup],
    solved_tolerance: f64,
) -> Diagnosis {
    let mut basis: Vec<DVector<f64>> = Vec::new();
    let mut accepted: Vec<(usize, DVector<f64>)> = Vec::new();
    let mut conflicting = Vec::new();
    let mut redundant = Vec::new();
    let mut partially_redundant = Vec::new();

    for (index, group) in groups.iter().enumerate() {
        let mut dependent_rows = Vec::new();
        let mut independent = 0;

        for row in group.rows.clone() {
            let original: DVector<f64> = jacobian.row(row).transpose();
            let mut v = original.clone();
            for b in &basis {
                let d = b.dot(&v);
                v -= b * d;
            }
            if v.norm() > RANK_TOLERANCE * original.norm().max(1.0) {
                basis.push(v.normalize());
                accepted.push((index, original));
                independent += 1;
            } else {
                dependent_rows.push(original);
            }
        }

        if dependent_rows.is_empty() {
            continue;
        }

        let solved = group.rows.clone().all(|row| residuals[row].abs() <= solved_tolerance);
        if !solved {
            conflicting.push(index);
            for row in &dependent_rows {
                conflicting.extend(dependency_group(&accepted, row));
            }
        } else if independent == 0 {
            redundant.push(index);
        } else {
            partially_redundant.push(index);
        }
    }

    let tags = |indices: Vec<usize>| {
        let mut tags: Vec<i32> = indices
            .into_iter()
            .map(|i| groups[i].tag)
            .filter(|tag| *tag >= 0)
            .collect();
        tags.sort_unstable();
        tags.dedup();
        tags
    };

    Diagnosis {
        conflicting: tags(conflicting),
        redundant: tags(redundant),
        partially_redundant: tags(partially_redundant),
        dof: jacobian.ncols() as i32 - basis.len() as i32,
    }
}

/// Owners of the accepted rows that `row` is a combination of.
fn dependency_group(accepted: &[(usize, DVector<f64>)], row: &DVector<f64>) -> Vec<usize> {
    if accepted.is_empty() {
        return Vec::new();
    }
    let columns: Vec<DVector<f64>> = accepted.iter().map(|(_, r)| r.clone()).collect();
    let span = DMatrix::from_columns(&columns);
    match span.svd(true, true).solve(row, 1e-12) {
        Ok(coefficients) => accepted
            .iter()
            .zip(coefficients.iter())
            .filter(|(_, c)| c.abs() > DEPENDENCY_TOLERANCE)
            .map(|((owner, _), _)| *owner)
            .collect(),
        Err(_) => Vec::new(),
    }
}
