//! Least-squares minimisation of `0.5 * |r(x)|^2` over a subset of the
//! parameter array.

use std::ops::Range;

use nalgebra::{DMatrix, DVector};
use tracing::trace;

use super::equations::Equation;
use crate::gcs::Algorithm;

/// Relative step of the central-difference Jacobian.
const FD_STEP: f64 = 1e-7;
/// Gradient magnitude below which an iteration counts as stationary.
const GRADIENT_EPS: f64 = 1e-14;
/// Relative step length below which an iteration counts as stalled.
const STEP_EPS: f64 = 1e-14;

#[derive(Debug, Clone, Copy)]
pub(crate) struct SolveOptions {
    pub max_iterations: usize,
    pub convergence: f64,
    pub trace_iterations: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct Outcome {
    pub x: DVector<f64>,
    pub error: f64,
    pub iterations: usize,
}

/// A set of equations over `params`, of which only `unknowns` may move.
pub(crate) struct System<'a> {
    params: &'a [f64],
    unknowns: &'a [usize],
    equations: Vec<(&'a Equation, f64)>,
}

impl<'a> System<'a> {
    pub fn new(params: &'a [f64], unknowns: &'a [usize], equations: Vec<(&'a Equation, f64)>) -> Self {
        Self { params, unknowns, equations }
    }

    pub fn initial(&self) -> DVector<f64> {
        DVector::from_iterator(self.unknowns.len(), self.unknowns.iter().map(|&a| self.params[a]))
    }

    /// Full parameter vector with `x` written over the unknowns.
    pub fn expand(&self, x: &DVector<f64>) -> Vec<f64> {
        let mut full = self.params.to_vec();
        for (i, &addr) in self.unknowns.iter().enumerate() {
            full[addr] = x[i];
        }
        full
    }

    /// Residual rows owned by each equation, in equation order.
    pub fn row_ranges(&self) -> Vec<Range<usize>> {
        let mut start = 0;
        self.equations
            .iter()
            .map(|(eq, _)| {
                let range = start..start + eq.rows();
                start = range.end;
                range
            })
            .collect()
    }

    pub fn residuals(&self, x: &DVector<f64>) -> DVector<f64> {
        let full = self.expand(x);
        let mut out = Vec::new();
        for (eq, scale) in &self.equations {
            let start = out.len();
            eq.residuals(&full, &mut out);
            for r in &mut out[start..] {
                *r *= scale;
            }
        }
        DVector::from_vec(out)
    }

    pub fn jacobian(&self, x: &DVector<f64>) -> DMatrix<f64> {
        let rows = self.row_ranges().last().map_or(0, |r| r.end);
        let mut jac = DMatrix::zeros(rows, x.len());
        let mut probe = x.clone();
        for j in 0..x.len() {
            let h = FD_STEP * (1.0 + x[j].abs());
            probe[j] = x[j] + h;
            let forward = self.residuals(&probe);
            probe[j] = x[j] - h;
            let backward = self.residuals(&probe);
            probe[j] = x[j];
            jac.set_column(j, &((forward - backward) / (2.0 * h)));
        }
        jac
    }
}

pub(crate) fn error(r: &DVector<f64>) -> f64 {
    0.5 * r.norm_squared()
}

pub(crate) fn minimize(system: &System, algorithm: Algorithm, options: &SolveOptions) -> Outcome {
    let x = system.initial();
    match algorithm {
        Algorithm::LevenbergMarquardt => levenberg_marquardt(system, x, options),
        Algorithm::DogLeg => dog_leg(system, x, options),
        Algorithm::Bfgs => bfgs(system, x, options),
    }
}

fn stalled(step: &DVector<f64>, x: &DVector<f64>) -> bool {
    step.norm() <= STEP_EPS * (x.norm() + STEP_EPS)
}

fn levenberg_marquardt(system: &System, mut x: DVector<f64>, options: &SolveOptions) -> Outcome {
    let n = x.len();
    let mut r = system.residuals(&x);
    let mut err = error(&r);
    let mut mu = 0.0;
    let mut nu = 2.0;
    let mut iterations = 0;

    while iterations < options.max_iterations && err > options.convergence && n > 0 {
        iterations += 1;
        let jac = system.jacobian(&x);
        let jt = jac.transpose();
        let a = &jt * &jac;
        let g = &jt * &r;
        if g.amax() < GRADIENT_EPS {
            break;
        }
        if mu == 0.0 {
            mu = 1e-3 * a.diagonal().max().max(1e-12);
        }

        let mut lhs = a.clone();
        for i in 0..n {
            lhs[(i, i)] += mu;
        }
        let Some(cholesky) = lhs.cholesky() else {
            mu *= nu;
            nu *= 2.0;
            continue;
        };
        let step = cholesky.solve(&(-&g));
        if stalled(&step, &x) {
            break;
        }

        let x_new = &x + &step;
        let r_new = system.residuals(&x_new);
        let err_new = error(&r_new);
        let predicted = 0.5 * step.dot(&(&step * mu - &g));
        let rho = if predicted > 0.0 { (err - err_new) / predicted } else { -1.0 };

        if rho > 0.0 {
            x = x_new;
            r = r_new;
            err = err_new;
            mu *= (1.0 - (2.0 * rho - 1.0).powi(3)).max(1.0 / 3.0);
            nu = 2.0;
        } else {
            mu *= nu;
            nu *= 2.0;
        }

        if options.trace_iterations {
            trace!(iteration = iterations, error = err, mu, "levenberg-marquardt");
        }
    }

    Outcome { x, error: err, iterations }
}

fn dog_leg(system: &System, mut x: DVector<f64>, options: &SolveOptions) -> Outcome {
    let mut r = system.residuals(&x);
    let mut err = error(&r);
    let mut delta = 1.0_f64.max(0.1 * x.norm());
    let mut iterations = 0;

    while iterations < options.max_iterations && err > options.convergence && !x.is_empty() {
        iterations += 1;
        let jac = system.jacobian(&x);
        let g = jac.transpose() * &r;
        if g.amax() < GRADIENT_EPS {
            break;
        }

        let jg = &jac * &g;
        let jg_norm = jg.norm_squared();
        if jg_norm <= 0.0 {
            break;
        }
        let alpha = g.norm_squared() / jg_norm;
        let h_sd = &g * -alpha;
        let h_gn = jac.clone().svd(true, true).solve(&(-&r), 1e-12).unwrap_or_else(|_| h_sd.clone());

        let step = if h_gn.norm() <= delta {
            h_gn
        } else if h_sd.norm() >= delta {
            &g * (-delta / g.norm())
        } else {
            let ba = &h_gn - &h_sd;
            let aa = h_sd.norm_squared();
            let bb = ba.norm_squared();
            let c = h_sd.dot(&ba);
            let disc = (c * c + bb * (delta * delta - aa)).max(0.0).sqrt();
            let beta = if c <= 0.0 { (disc - c) / bb } else { (delta * delta - aa) / (c + disc) };
            &h_sd + &ba * beta
        };
        if stalled(&step, &x) {
            break;
        }

        let x_new = &x + &step;
        let r_new = system.residuals(&x_new);
        let err_new = error(&r_new);
        let predicted = err - error(&(&r + &jac * &step));
        let rho = if predicted > 0.0 { (err - err_new) / predicted } else { -1.0 };

        if rho > 0.0 {
            x = x_new;
            r = r_new;
            err = err_new;
        }
        if rho > 0.75 {
            delta = delta.max(3.0 * step.norm());
        } else if rho < 0.25 {
            delta *= 0.5;
            if delta < STEP_EPS * (x.norm() + STEP_EPS) {
                break;
            }
        }

        if options.trace_iterations {
            trace!(iteration = iterations, error = err, delta, "dogleg");
        }
    }

    Outcome { x, error: err, iterations }
}

fn bfgs(system: &System, mut x: DVector<f64>, options: &SolveOptions) -> Outcome {
    let n = x.len();
    let gradient = |x: &DVector<f64>, r: &DVector<f64>| system.jacobian(x).transpose() * r;

    let r = system.residuals(&x);
    let mut err = error(&r);
    let mut g = gradient(&x, &r);
    let mut h_inv = DMatrix::<f64>::identity(n, n);
    let mut iterations = 0;

    while iterations < options.max_iterations && err > options.convergence && n > 0 {
        iterations += 1;
        if g.amax() < GRADIENT_EPS {
            break;
        }

        let mut direction = -(&h_inv * &g);
        let mut slope = g.dot(&direction);
        if slope >= 0.0 {
            h_inv = DMatrix::identity(n, n);
            direction = -&g;
            slope = -g.norm_squared();
        }

        // Backtracking line search (Armijo).
        let mut t = 1.0;
        let accepted = loop {
            let candidate = &x + &direction * t;
            let r_new = system.residuals(&candidate);
            let err_new = error(&r_new);
            if err_new <= err + 1e-4 * t * slope {
                break Some((candidate, r_new, err_new));
            }
            t *= 0.5;
            if t < 1e-12 {
                break None;
            }
        };
        let Some((x_new, r_new, err_new)) = accepted else {
            break;
        };

        let g_new = gradient(&x_new, &r_new);
        let s = &x_new - &x;
        let y = &g_new - &g;
        let sy = s.dot(&y);
        if sy > 1e-16 {
            let rho = 1.0 / sy;
            let identity = DMatrix::<f64>::identity(n, n);
            let left = &identity - (&s * y.transpose()) * rho;
            let right = &identity - (&y * s.transpose()) * rho;
            h_inv = &left * &h_inv * &right + (&s * s.transpose()) * rho;
        }

        x = x_new;
        err = err_new;
        g = g_new;

        if options.trace_iterations {
            trace!(iteration = iterations, error = err, step = t, "bfgs");
        }
    }

    Outcome { x, error: err, iterations }
}
