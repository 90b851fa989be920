//! Problem views presented to the subproblem solvers.
//!
//! A view exposes the model either as-is ([`OriginalProblem`]) or as its
//! l1-relaxed feasibility counterpart ([`L1RelaxedProblem`]). Views own no
//! point data; evaluations go through the iterate's caches so that each
//! oracle is called at most once per point.

mod l1_relaxed;
mod original;

pub use l1_relaxed::L1RelaxedProblem;
pub use original::OriginalProblem;

use crate::error::EvaluationError;
use crate::iterate::Iterate;
use crate::linalg::sparse::{JacobianRows, SparseSymmetric, SparseVector};
use crate::linalg::Norm;
use crate::model::Model;

/// A (possibly reformulated) optimization problem.
pub trait OptimizationProblem {
    fn model(&self) -> &dyn Model;

    fn number_variables(&self) -> usize;
    fn number_constraints(&self) -> usize;

    /// Variable count of the underlying model (the block that the Hessian
    /// convexification regularizes).
    fn number_original_variables(&self) -> usize {
        self.model().number_variables()
    }

    /// The objective multiplier rho of this view (0 while restoring
    /// feasibility).
    fn objective_multiplier(&self) -> f64;

    fn variable_lower_bound(&self, i: usize) -> f64;
    fn variable_upper_bound(&self, i: usize) -> f64;
    fn constraint_lower_bound(&self, j: usize) -> f64;
    fn constraint_upper_bound(&self, j: usize) -> f64;

    /// Lower bound relaxed outward by `factor * max(1, |bound|)`.
    fn relaxed_variable_lower_bound(&self, i: usize, factor: f64) -> f64 {
        let bound = self.variable_lower_bound(i);
        if bound.is_finite() {
            bound - factor * bound.abs().max(1.0)
        } else {
            bound
        }
    }

    /// Upper bound relaxed outward by `factor * max(1, |bound|)`.
    fn relaxed_variable_upper_bound(&self, i: usize, factor: f64) -> f64 {
        let bound = self.variable_upper_bound(i);
        if bound.is_finite() {
            bound + factor * bound.abs().max(1.0)
        } else {
            bound
        }
    }

    // index lists, fixed at construction
    fn lower_bounded_variables(&self) -> &[usize];
    fn upper_bounded_variables(&self) -> &[usize];
    fn single_lower_bounded_variables(&self) -> &[usize];
    fn single_upper_bounded_variables(&self) -> &[usize];
    fn equality_constraints(&self) -> &[usize];
    fn inequality_constraints(&self) -> &[usize];

    fn is_constrained(&self) -> bool {
        self.number_constraints() > 0
    }

    // function evaluations (through the iterate caches)
    fn evaluate_objective(&self, iterate: &mut Iterate) -> Result<f64, EvaluationError>;
    fn evaluate_objective_gradient(
        &self,
        iterate: &mut Iterate,
        gradient: &mut SparseVector,
    ) -> Result<(), EvaluationError>;
    fn evaluate_constraints(
        &self,
        iterate: &mut Iterate,
        constraints: &mut Vec<f64>,
    ) -> Result<(), EvaluationError>;
    fn evaluate_constraint_jacobian(
        &self,
        iterate: &mut Iterate,
        jacobian: &mut JacobianRows,
    ) -> Result<(), EvaluationError>;
    fn evaluate_lagrangian_hessian(
        &self,
        x: &[f64],
        constraint_multipliers: &[f64],
        hessian: &mut SparseSymmetric,
    ) -> Result<(), EvaluationError>;

    /// Violation of this view's constraint ranges at the given values.
    fn compute_constraint_violation(&self, constraints: &[f64], norm: Norm) -> f64 {
        norm.of_fn(constraints.len(), |j| {
            let value = constraints[j];
            (self.constraint_lower_bound(j) - value)
                .max(0.0)
                .max(value - self.constraint_upper_bound(j))
        })
    }

    /// Worst complementarity product `|multiplier * slack|` over the active
    /// bounds and inequality constraints.
    fn compute_complementarity_error(
        &self,
        number_variables: usize,
        primals: &[f64],
        constraints: &[f64],
        constraint_multipliers: &[f64],
        lower_bound_multipliers: &[f64],
        upper_bound_multipliers: &[f64],
    ) -> f64 {
        let mut error: f64 = 0.0;
        for i in 0..number_variables {
            if lower_bound_multipliers[i] > 0.0 {
                error = error.max(
                    (lower_bound_multipliers[i] * (primals[i] - self.variable_lower_bound(i)))
                        .abs(),
                );
            }
            if upper_bound_multipliers[i] < 0.0 {
                error = error.max(
                    (upper_bound_multipliers[i] * (primals[i] - self.variable_upper_bound(i)))
                        .abs(),
                );
            }
        }
        for &j in self.inequality_constraints() {
            if constraint_multipliers[j] > 0.0 {
                error = error.max(
                    (constraint_multipliers[j] * (constraints[j] - self.constraint_lower_bound(j)))
                        .abs(),
                );
            } else if constraint_multipliers[j] < 0.0 {
                error = error.max(
                    (constraint_multipliers[j] * (constraints[j] - self.constraint_upper_bound(j)))
                        .abs(),
                );
            }
        }
        error
    }

    /// Complementarity error of the feasibility problem: violated constraints
    /// carry the multiplier shifted by the l1 penalty weight.
    fn compute_feasibility_complementarity_error(
        &self,
        number_variables: usize,
        primals: &[f64],
        constraints: &[f64],
        constraint_multipliers: &[f64],
        lower_bound_multipliers: &[f64],
        upper_bound_multipliers: &[f64],
    ) -> f64 {
        let mut error: f64 = 0.0;
        for i in 0..number_variables {
            if lower_bound_multipliers[i] > 0.0 {
                error = error.max(
                    (lower_bound_multipliers[i] * (primals[i] - self.variable_lower_bound(i)))
                        .abs(),
                );
            }
            if upper_bound_multipliers[i] < 0.0 {
                error = error.max(
                    (upper_bound_multipliers[i] * (primals[i] - self.variable_upper_bound(i)))
                        .abs(),
                );
            }
        }
        for j in 0..constraints.len() {
            let value = constraints[j];
            let lower = self.constraint_lower_bound(j);
            let upper = self.constraint_upper_bound(j);
            if value < lower {
                error = error.max(((1.0 - constraint_multipliers[j]) * (value - lower)).abs());
            } else if upper < value {
                error = error.max(((1.0 + constraint_multipliers[j]) * (value - upper)).abs());
            } else if constraint_multipliers[j] > 0.0 {
                error = error.max((constraint_multipliers[j] * (value - lower)).abs());
            } else if constraint_multipliers[j] < 0.0 {
                error = error.max((constraint_multipliers[j] * (value - upper)).abs());
            }
        }
        error
    }
}

/// Classify bounded indices. Returns (lower bounded, upper bounded,
/// single lower bounded, single upper bounded).
pub(crate) fn classify_bounds(
    lower: impl Fn(usize) -> f64,
    upper: impl Fn(usize) -> f64,
    count: usize,
) -> (Vec<usize>, Vec<usize>, Vec<usize>, Vec<usize>) {
    let mut lower_bounded = Vec::new();
    let mut upper_bounded = Vec::new();
    let mut single_lower = Vec::new();
    let mut single_upper = Vec::new();
    for i in 0..count {
        let has_lower = lower(i).is_finite();
        let has_upper = upper(i).is_finite();
        if has_lower {
            lower_bounded.push(i);
            if !has_upper {
                single_lower.push(i);
            }
        }
        if has_upper {
            upper_bounded.push(i);
            if !has_lower {
                single_upper.push(i);
            }
        }
    }
    (lower_bounded, upper_bounded, single_lower, single_upper)
}

pub(crate) fn classify_constraints(model: &dyn Model) -> (Vec<usize>, Vec<usize>) {
    let mut equalities = Vec::new();
    let mut inequalities = Vec::new();
    for j in 0..model.number_constraints() {
        if model.constraint_lower_bound(j) == model.constraint_upper_bound(j) {
            equalities.push(j);
        } else {
            inequalities.push(j);
        }
    }
    (equalities, inequalities)
}
