//! The model oracle interface and its reformulation decorators.
//!
//! A [`Model`] supplies the problem functions and derivatives:
//!
//! ```text
//! minimize    f(x)
//! subject to  c_L <= c(x) <= c_U
//!             x_L <= x <= x_U
//! ```
//!
//! The solver core never evaluates functions directly; everything goes
//! through this trait so that scaling, slack reformulation and evaluation
//! counting can be layered as decorators:
//!
//! - [`ScaledModel`] rescales the functions from the gradient magnitudes at
//!   the initial point (and folds in the objective sign, so the core always
//!   minimizes).
//! - [`SlackModel`] turns range constraints into equality constraints plus
//!   bounded slack variables, the form required by the interior-point
//!   subproblem.
//! - [`CountingModel`] counts oracle calls for the final report.

use std::cell::Cell;

use crate::error::EvaluationError;
use crate::iterate::Iterate;
use crate::linalg::sparse::{JacobianRows, SparseSymmetric, SparseVector};
use crate::residuals::TerminationStatus;

/// Problem oracle consumed by the solver core.
pub trait Model {
    fn name(&self) -> &str {
        "problem"
    }

    fn number_variables(&self) -> usize;
    fn number_constraints(&self) -> usize;

    /// +1 for minimization, -1 for maximization.
    fn objective_sign(&self) -> f64 {
        1.0
    }

    /// May be `f64::NEG_INFINITY`.
    fn variable_lower_bound(&self, variable_index: usize) -> f64;
    /// May be `f64::INFINITY`.
    fn variable_upper_bound(&self, variable_index: usize) -> f64;
    fn constraint_lower_bound(&self, constraint_index: usize) -> f64;
    fn constraint_upper_bound(&self, constraint_index: usize) -> f64;

    fn evaluate_objective(&self, x: &[f64]) -> Result<f64, EvaluationError>;
    fn evaluate_objective_gradient(&self, x: &[f64]) -> Result<SparseVector, EvaluationError>;
    fn evaluate_constraints(&self, x: &[f64]) -> Result<Vec<f64>, EvaluationError>;
    fn evaluate_constraint_jacobian(&self, x: &[f64]) -> Result<JacobianRows, EvaluationError>;

    /// Hessian of `objective_multiplier * f + sum_j multipliers[j] * c_j`,
    /// written as upper-triangle entries into `hessian`.
    ///
    /// Note the sign of the constraint part: the solver's Lagrangian is
    /// `rho f - lambda^T c`, and callers negate the multipliers accordingly.
    fn evaluate_lagrangian_hessian(
        &self,
        x: &[f64],
        objective_multiplier: f64,
        multipliers: &[f64],
        hessian: &mut SparseSymmetric,
    ) -> Result<(), EvaluationError>;

    /// Upper bound on the Hessian nonzero count, used to size workspaces.
    fn number_hessian_nonzeros(&self) -> usize {
        let n = self.number_variables();
        n * (n + 1) / 2
    }

    fn initial_primals(&self, x: &mut [f64]);

    fn initial_duals(&self, constraint_multipliers: &mut [f64]) {
        constraint_multipliers.fill(0.0);
    }

    /// Pairs `(constraint index, slack variable index)` when this model is a
    /// slack reformulation; empty otherwise.
    fn slacks(&self) -> &[(usize, usize)] {
        &[]
    }

    /// Undo any internal rescaling/reformulation on the final iterate.
    fn postprocess_solution(&self, _iterate: &mut Iterate, _status: TerminationStatus) {}
}

/// Violation of the constraint ranges at the given constraint values.
pub fn compute_constraint_violation(
    model: &dyn Model,
    constraints: &[f64],
    norm: crate::linalg::Norm,
) -> f64 {
    norm.of_fn(constraints.len(), |j| {
        let value = constraints[j];
        (model.constraint_lower_bound(j) - value)
            .max(0.0)
            .max(value - model.constraint_upper_bound(j))
    })
}

// ---------------------------------------------------------------------------
// Scaling decorator
// ---------------------------------------------------------------------------

/// Function scaling computed from the derivatives at the initial point.
///
/// Each function is scaled by `min(1, threshold / ||gradient||_inf)` so that
/// badly scaled models enter the solver with gradients of moderate size. The
/// objective factor also carries the objective sign.
pub struct ScaledModel {
    inner: Box<dyn Model>,
    objective_factor: f64,
    constraint_factors: Vec<f64>,
}

impl ScaledModel {
    pub fn new(
        inner: Box<dyn Model>,
        initial_point: &[f64],
        gradient_threshold: f64,
        scale_functions: bool,
    ) -> Result<Self, EvaluationError> {
        let m = inner.number_constraints();
        let mut objective_factor = inner.objective_sign();
        let mut constraint_factors = vec![1.0; m];

        if scale_functions {
            let objective_gradient = inner.evaluate_objective_gradient(initial_point)?;
            let gradient_norm = objective_gradient
                .iter()
                .map(|(_, v)| v.abs())
                .fold(0.0, f64::max);
            objective_factor *= scaling_factor(gradient_norm, gradient_threshold);

            let jacobian = inner.evaluate_constraint_jacobian(initial_point)?;
            for (j, row) in jacobian.iter().enumerate() {
                let row_norm = row.iter().map(|(_, v)| v.abs()).fold(0.0, f64::max);
                constraint_factors[j] = scaling_factor(row_norm, gradient_threshold);
            }
        }
        Ok(Self {
            inner,
            objective_factor,
            constraint_factors,
        })
    }

    pub fn objective_factor(&self) -> f64 {
        self.objective_factor
    }
}

fn scaling_factor(gradient_norm: f64, threshold: f64) -> f64 {
    if gradient_norm > threshold {
        threshold / gradient_norm
    } else {
        1.0
    }
}

impl Model for ScaledModel {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn number_variables(&self) -> usize {
        self.inner.number_variables()
    }

    fn number_constraints(&self) -> usize {
        self.inner.number_constraints()
    }

    fn variable_lower_bound(&self, i: usize) -> f64 {
        self.inner.variable_lower_bound(i)
    }

    fn variable_upper_bound(&self, i: usize) -> f64 {
        self.inner.variable_upper_bound(i)
    }

    fn constraint_lower_bound(&self, j: usize) -> f64 {
        self.constraint_factors[j] * self.inner.constraint_lower_bound(j)
    }

    fn constraint_upper_bound(&self, j: usize) -> f64 {
        self.constraint_factors[j] * self.inner.constraint_upper_bound(j)
    }

    fn evaluate_objective(&self, x: &[f64]) -> Result<f64, EvaluationError> {
        Ok(self.objective_factor * self.inner.evaluate_objective(x)?)
    }

    fn evaluate_objective_gradient(&self, x: &[f64]) -> Result<SparseVector, EvaluationError> {
        let gradient = self.inner.evaluate_objective_gradient(x)?;
        let values: Vec<f64> = gradient.data().iter().map(|v| self.objective_factor * v).collect();
        Ok(SparseVector::new(
            gradient.dim(),
            gradient.indices().to_vec(),
            values,
        ))
    }

    fn evaluate_constraints(&self, x: &[f64]) -> Result<Vec<f64>, EvaluationError> {
        let mut constraints = self.inner.evaluate_constraints(x)?;
        for (j, value) in constraints.iter_mut().enumerate() {
            *value *= self.constraint_factors[j];
        }
        Ok(constraints)
    }

    fn evaluate_constraint_jacobian(&self, x: &[f64]) -> Result<JacobianRows, EvaluationError> {
        let jacobian = self.inner.evaluate_constraint_jacobian(x)?;
        Ok(jacobian
            .iter()
            .enumerate()
            .map(|(j, row)| {
                let values: Vec<f64> = row
                    .data()
                    .iter()
                    .map(|v| self.constraint_factors[j] * v)
                    .collect();
                SparseVector::new(row.dim(), row.indices().to_vec(), values)
            })
            .collect())
    }

    fn evaluate_lagrangian_hessian(
        &self,
        x: &[f64],
        objective_multiplier: f64,
        multipliers: &[f64],
        hessian: &mut SparseSymmetric,
    ) -> Result<(), EvaluationError> {
        let scaled_multipliers: Vec<f64> = multipliers
            .iter()
            .zip(self.constraint_factors.iter())
            .map(|(multiplier, factor)| multiplier * factor)
            .collect();
        self.inner.evaluate_lagrangian_hessian(
            x,
            objective_multiplier * self.objective_factor,
            &scaled_multipliers,
            hessian,
        )
    }

    fn number_hessian_nonzeros(&self) -> usize {
        self.inner.number_hessian_nonzeros()
    }

    fn initial_primals(&self, x: &mut [f64]) {
        self.inner.initial_primals(x);
    }

    fn initial_duals(&self, constraint_multipliers: &mut [f64]) {
        self.inner.initial_duals(constraint_multipliers);
    }

    fn postprocess_solution(&self, iterate: &mut Iterate, status: TerminationStatus) {
        // restore the original objective and multipliers
        if iterate.is_objective_computed {
            iterate.evaluations.objective /= self.objective_factor;
        }
        let m = self.number_constraints();
        for j in 0..m {
            iterate.multipliers.constraints[j] *=
                self.constraint_factors[j] / self.objective_factor;
        }
        for i in 0..self.number_variables() {
            iterate.multipliers.lower_bounds[i] /= self.objective_factor;
            iterate.multipliers.upper_bounds[i] /= self.objective_factor;
        }
        self.inner.postprocess_solution(iterate, status);
    }
}

// ---------------------------------------------------------------------------
// Slack reformulation decorator
// ---------------------------------------------------------------------------

/// Equality-constrained reformulation: every range constraint
/// `c_L <= c_j(x) <= c_U` with `c_L < c_U` becomes `c_j(x) - s = 0` with a
/// slack variable `s` bounded by `[c_L, c_U]`. Equality constraints are kept
/// as they are. Required by the interior-point subproblem, which handles
/// inequalities only through variable bounds.
pub struct SlackModel {
    inner: Box<dyn Model>,
    /// (constraint index, slack variable index)
    slack_of_constraint: Vec<(usize, usize)>,
    /// per constraint: index into the slack list, if slacked
    slack_lookup: Vec<Option<usize>>,
}

impl SlackModel {
    pub fn new(inner: Box<dyn Model>) -> Self {
        let n = inner.number_variables();
        let m = inner.number_constraints();
        let mut slack_of_constraint = Vec::new();
        let mut slack_lookup = vec![None; m];
        for j in 0..m {
            if inner.constraint_lower_bound(j) < inner.constraint_upper_bound(j) {
                slack_lookup[j] = Some(slack_of_constraint.len());
                slack_of_constraint.push((j, n + slack_of_constraint.len()));
            }
        }
        Self {
            inner,
            slack_of_constraint,
            slack_lookup,
        }
    }

    pub fn number_slacks(&self) -> usize {
        self.slack_of_constraint.len()
    }
}

impl Model for SlackModel {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn number_variables(&self) -> usize {
        self.inner.number_variables() + self.slack_of_constraint.len()
    }

    fn number_constraints(&self) -> usize {
        self.inner.number_constraints()
    }

    fn variable_lower_bound(&self, i: usize) -> f64 {
        let n = self.inner.number_variables();
        if i < n {
            self.inner.variable_lower_bound(i)
        } else {
            let (j, _) = self.slack_of_constraint[i - n];
            self.inner.constraint_lower_bound(j)
        }
    }

    fn variable_upper_bound(&self, i: usize) -> f64 {
        let n = self.inner.number_variables();
        if i < n {
            self.inner.variable_upper_bound(i)
        } else {
            let (j, _) = self.slack_of_constraint[i - n];
            self.inner.constraint_upper_bound(j)
        }
    }

    fn constraint_lower_bound(&self, j: usize) -> f64 {
        if self.slack_lookup[j].is_some() {
            0.0
        } else {
            self.inner.constraint_lower_bound(j)
        }
    }

    fn constraint_upper_bound(&self, j: usize) -> f64 {
        if self.slack_lookup[j].is_some() {
            0.0
        } else {
            self.inner.constraint_upper_bound(j)
        }
    }

    fn evaluate_objective(&self, x: &[f64]) -> Result<f64, EvaluationError> {
        self.inner.evaluate_objective(&x[..self.inner.number_variables()])
    }

    fn evaluate_objective_gradient(&self, x: &[f64]) -> Result<SparseVector, EvaluationError> {
        let gradient = self
            .inner
            .evaluate_objective_gradient(&x[..self.inner.number_variables()])?;
        // same entries, wider dimension
        Ok(SparseVector::new(
            self.number_variables(),
            gradient.indices().to_vec(),
            gradient.data().to_vec(),
        ))
    }

    fn evaluate_constraints(&self, x: &[f64]) -> Result<Vec<f64>, EvaluationError> {
        let mut constraints = self
            .inner
            .evaluate_constraints(&x[..self.inner.number_variables()])?;
        for &(j, slack_index) in &self.slack_of_constraint {
            constraints[j] -= x[slack_index];
        }
        Ok(constraints)
    }

    fn evaluate_constraint_jacobian(&self, x: &[f64]) -> Result<JacobianRows, EvaluationError> {
        let inner_jacobian = self
            .inner
            .evaluate_constraint_jacobian(&x[..self.inner.number_variables()])?;
        let number_variables = self.number_variables();
        let mut jacobian: JacobianRows = inner_jacobian
            .iter()
            .map(|row| {
                SparseVector::new(
                    number_variables,
                    row.indices().to_vec(),
                    row.data().to_vec(),
                )
            })
            .collect();
        for &(j, slack_index) in &self.slack_of_constraint {
            jacobian[j].append(slack_index, -1.0);
        }
        Ok(jacobian)
    }

    fn evaluate_lagrangian_hessian(
        &self,
        x: &[f64],
        objective_multiplier: f64,
        multipliers: &[f64],
        hessian: &mut SparseSymmetric,
    ) -> Result<(), EvaluationError> {
        // slacks are linear: the Hessian block is the inner one, zero-padded
        let dimension = hessian.dimension();
        self.inner.evaluate_lagrangian_hessian(
            &x[..self.inner.number_variables()],
            objective_multiplier,
            multipliers,
            hessian,
        )?;
        debug_assert_eq!(hessian.dimension(), dimension);
        Ok(())
    }

    fn number_hessian_nonzeros(&self) -> usize {
        self.inner.number_hessian_nonzeros()
    }

    fn initial_primals(&self, x: &mut [f64]) {
        let n = self.inner.number_variables();
        self.inner.initial_primals(&mut x[..n]);
        // slack values are set from the constraint evaluations by the
        // subproblem's initialization
        for &(_, slack_index) in &self.slack_of_constraint {
            x[slack_index] = 0.0;
        }
    }

    fn initial_duals(&self, constraint_multipliers: &mut [f64]) {
        self.inner.initial_duals(constraint_multipliers);
    }

    fn slacks(&self) -> &[(usize, usize)] {
        &self.slack_of_constraint
    }

    fn postprocess_solution(&self, iterate: &mut Iterate, status: TerminationStatus) {
        self.inner.postprocess_solution(iterate, status);
    }
}

// ---------------------------------------------------------------------------
// Evaluation counting decorator
// ---------------------------------------------------------------------------

/// Oracle call counts for the final report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvaluationCounts {
    pub objective: usize,
    pub constraints: usize,
    pub objective_gradient: usize,
    pub jacobian: usize,
}

/// Counts oracle calls; the outermost decorator.
pub struct CountingModel {
    inner: Box<dyn Model>,
    objective: Cell<usize>,
    constraints: Cell<usize>,
    objective_gradient: Cell<usize>,
    jacobian: Cell<usize>,
}

impl CountingModel {
    pub fn new(inner: Box<dyn Model>) -> Self {
        Self {
            inner,
            objective: Cell::new(0),
            constraints: Cell::new(0),
            objective_gradient: Cell::new(0),
            jacobian: Cell::new(0),
        }
    }

    pub fn counts(&self) -> EvaluationCounts {
        EvaluationCounts {
            objective: self.objective.get(),
            constraints: self.constraints.get(),
            objective_gradient: self.objective_gradient.get(),
            jacobian: self.jacobian.get(),
        }
    }
}

impl Model for CountingModel {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn number_variables(&self) -> usize {
        self.inner.number_variables()
    }

    fn number_constraints(&self) -> usize {
        self.inner.number_constraints()
    }

    fn variable_lower_bound(&self, i: usize) -> f64 {
        self.inner.variable_lower_bound(i)
    }

    fn variable_upper_bound(&self, i: usize) -> f64 {
        self.inner.variable_upper_bound(i)
    }

    fn constraint_lower_bound(&self, j: usize) -> f64 {
        self.inner.constraint_lower_bound(j)
    }

    fn constraint_upper_bound(&self, j: usize) -> f64 {
        self.inner.constraint_upper_bound(j)
    }

    fn evaluate_objective(&self, x: &[f64]) -> Result<f64, EvaluationError> {
        self.objective.set(self.objective.get() + 1);
        self.inner.evaluate_objective(x)
    }

    fn evaluate_objective_gradient(&self, x: &[f64]) -> Result<SparseVector, EvaluationError> {
        self.objective_gradient.set(self.objective_gradient.get() + 1);
        self.inner.evaluate_objective_gradient(x)
    }

    fn evaluate_constraints(&self, x: &[f64]) -> Result<Vec<f64>, EvaluationError> {
        self.constraints.set(self.constraints.get() + 1);
        self.inner.evaluate_constraints(x)
    }

    fn evaluate_constraint_jacobian(&self, x: &[f64]) -> Result<JacobianRows, EvaluationError> {
        self.jacobian.set(self.jacobian.get() + 1);
        self.inner.evaluate_constraint_jacobian(x)
    }

    fn evaluate_lagrangian_hessian(
        &self,
        x: &[f64],
        objective_multiplier: f64,
        multipliers: &[f64],
        hessian: &mut SparseSymmetric,
    ) -> Result<(), EvaluationError> {
        self.inner
            .evaluate_lagrangian_hessian(x, objective_multiplier, multipliers, hessian)
    }

    fn number_hessian_nonzeros(&self) -> usize {
        self.inner.number_hessian_nonzeros()
    }

    fn initial_primals(&self, x: &mut [f64]) {
        self.inner.initial_primals(x);
    }

    fn initial_duals(&self, constraint_multipliers: &mut [f64]) {
        self.inner.initial_duals(constraint_multipliers);
    }

    fn slacks(&self) -> &[(usize, usize)] {
        self.inner.slacks()
    }

    fn postprocess_solution(&self, iterate: &mut Iterate, status: TerminationStatus) {
        self.inner.postprocess_solution(iterate, status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::Norm;

    /// min x0 + x1  s.t.  1 <= x0^2 + x1^2 <= 4,  x0 >= 0
    struct RingModel;

    impl Model for RingModel {
        fn number_variables(&self) -> usize {
            2
        }
        fn number_constraints(&self) -> usize {
            1
        }
        fn variable_lower_bound(&self, i: usize) -> f64 {
            if i == 0 {
                0.0
            } else {
                f64::NEG_INFINITY
            }
        }
        fn variable_upper_bound(&self, _i: usize) -> f64 {
            f64::INFINITY
        }
        fn constraint_lower_bound(&self, _j: usize) -> f64 {
            1.0
        }
        fn constraint_upper_bound(&self, _j: usize) -> f64 {
            4.0
        }
        fn evaluate_objective(&self, x: &[f64]) -> Result<f64, EvaluationError> {
            Ok(x[0] + x[1])
        }
        fn evaluate_objective_gradient(&self, _x: &[f64]) -> Result<SparseVector, EvaluationError> {
            Ok(SparseVector::new(2, vec![0, 1], vec![1.0, 1.0]))
        }
        fn evaluate_constraints(&self, x: &[f64]) -> Result<Vec<f64>, EvaluationError> {
            Ok(vec![x[0] * x[0] + x[1] * x[1]])
        }
        fn evaluate_constraint_jacobian(&self, x: &[f64]) -> Result<JacobianRows, EvaluationError> {
            Ok(vec![SparseVector::new(
                2,
                vec![0, 1],
                vec![2.0 * x[0], 2.0 * x[1]],
            )])
        }
        fn evaluate_lagrangian_hessian(
            &self,
            _x: &[f64],
            _objective_multiplier: f64,
            multipliers: &[f64],
            hessian: &mut SparseSymmetric,
        ) -> Result<(), EvaluationError> {
            hessian.insert(0, 0, 2.0 * multipliers[0]);
            hessian.insert(1, 1, 2.0 * multipliers[0]);
            Ok(())
        }
        fn initial_primals(&self, x: &mut [f64]) {
            x.fill(1.0);
        }
    }

    #[test]
    fn test_constraint_violation() {
        let model = RingModel;
        assert_eq!(compute_constraint_violation(&model, &[2.0], Norm::L1), 0.0);
        assert_eq!(compute_constraint_violation(&model, &[0.5], Norm::L1), 0.5);
        assert_eq!(compute_constraint_violation(&model, &[6.0], Norm::Inf), 2.0);
    }

    #[test]
    fn test_slack_model_reformulation() {
        let model = SlackModel::new(Box::new(RingModel));
        // one range constraint, so one slack variable
        assert_eq!(model.number_variables(), 3);
        assert_eq!(model.number_slacks(), 1);
        assert_eq!(model.constraint_lower_bound(0), 0.0);
        assert_eq!(model.constraint_upper_bound(0), 0.0);
        assert_eq!(model.variable_lower_bound(2), 1.0);
        assert_eq!(model.variable_upper_bound(2), 4.0);

        // c(x) - s at x = (1, 1), s = 0.5
        let constraints = model.evaluate_constraints(&[1.0, 1.0, 0.5]).unwrap();
        assert_eq!(constraints[0], 1.5);

        let jacobian = model.evaluate_constraint_jacobian(&[1.0, 1.0, 0.5]).unwrap();
        let entries: Vec<(usize, f64)> = jacobian[0].iter().map(|(i, &v)| (i, v)).collect();
        assert_eq!(entries, vec![(0, 2.0), (1, 2.0), (2, -1.0)]);
    }

    #[test]
    fn test_scaled_model_factors() {
        // gradient of f is (1, 1): below the threshold, so no objective scaling;
        // constraint gradient at x0 = (10, 0) has norm 20 > 2 -> factor 0.1
        struct Steep;
        impl Model for Steep {
            fn number_variables(&self) -> usize {
                2
            }
            fn number_constraints(&self) -> usize {
                1
            }
            fn variable_lower_bound(&self, _i: usize) -> f64 {
                f64::NEG_INFINITY
            }
            fn variable_upper_bound(&self, _i: usize) -> f64 {
                f64::INFINITY
            }
            fn constraint_lower_bound(&self, _j: usize) -> f64 {
                0.0
            }
            fn constraint_upper_bound(&self, _j: usize) -> f64 {
                10.0
            }
            fn evaluate_objective(&self, x: &[f64]) -> Result<f64, EvaluationError> {
                Ok(x[0])
            }
            fn evaluate_objective_gradient(
                &self,
                _x: &[f64],
            ) -> Result<SparseVector, EvaluationError> {
                Ok(SparseVector::new(2, vec![0], vec![1.0]))
            }
            fn evaluate_constraints(&self, x: &[f64]) -> Result<Vec<f64>, EvaluationError> {
                Ok(vec![10.0 * x[0] * x[0]])
            }
            fn evaluate_constraint_jacobian(
                &self,
                x: &[f64],
            ) -> Result<JacobianRows, EvaluationError> {
                Ok(vec![SparseVector::new(2, vec![0], vec![20.0 * x[0]])])
            }
            fn evaluate_lagrangian_hessian(
                &self,
                _x: &[f64],
                _objective_multiplier: f64,
                _multipliers: &[f64],
                _hessian: &mut SparseSymmetric,
            ) -> Result<(), EvaluationError> {
                Ok(())
            }
            fn initial_primals(&self, x: &mut [f64]) {
                x[0] = 1.0;
                x[1] = 0.0;
            }
        }

        let scaled = ScaledModel::new(Box::new(Steep), &[1.0, 0.0], 2.0, true).unwrap();
        assert_eq!(scaled.objective_factor(), 1.0);
        assert_eq!(scaled.constraint_upper_bound(0), 1.0);
        let c = scaled.evaluate_constraints(&[1.0, 0.0]).unwrap();
        assert!((c[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_counting_model() {
        let model = CountingModel::new(Box::new(RingModel));
        let _ = model.evaluate_objective(&[1.0, 1.0]);
        let _ = model.evaluate_objective(&[2.0, 2.0]);
        let _ = model.evaluate_constraints(&[1.0, 1.0]);
        let counts = model.counts();
        assert_eq!(counts.objective, 2);
        assert_eq!(counts.constraints, 1);
        assert_eq!(counts.jacobian, 0);
    }
}
