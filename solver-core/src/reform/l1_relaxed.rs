//! The l1-relaxed feasibility view
//!
//! ```text
//! minimize    rho f(x) + sum_j (p_j + q_j)
//! subject to  c_L <= c(x) - p + q <= c_U
//!             p, q >= 0,  x_L <= x <= x_U
//! ```
//!
//! with elastic variables p (absorbing upper violations) and q (absorbing
//! lower violations) appended after the model's variables. Restoration sets
//! rho = 0 and minimizes pure constraint violation.

use super::{classify_bounds, classify_constraints, OptimizationProblem};
use crate::error::EvaluationError;
use crate::iterate::Iterate;
use crate::linalg::sparse::{JacobianRows, SparseSymmetric, SparseVector};
use crate::model::Model;

pub struct L1RelaxedProblem<'m> {
    model: &'m dyn Model,
    objective_multiplier: f64,
    lower_bounded_variables: Vec<usize>,
    upper_bounded_variables: Vec<usize>,
    single_lower_bounded_variables: Vec<usize>,
    single_upper_bounded_variables: Vec<usize>,
    equality_constraints: Vec<usize>,
    inequality_constraints: Vec<usize>,
}

impl<'m> L1RelaxedProblem<'m> {
    pub fn new(model: &'m dyn Model, objective_multiplier: f64) -> Self {
        let n = model.number_variables();
        let m = model.number_constraints();
        let total = n + 2 * m;
        let (lower_bounded, upper_bounded, single_lower, single_upper) = classify_bounds(
            |i| {
                if i < n {
                    model.variable_lower_bound(i)
                } else {
                    0.0
                }
            },
            |i| {
                if i < n {
                    model.variable_upper_bound(i)
                } else {
                    f64::INFINITY
                }
            },
            total,
        );
        let (equalities, inequalities) = classify_constraints(model);
        Self {
            model,
            objective_multiplier,
            lower_bounded_variables: lower_bounded,
            upper_bounded_variables: upper_bounded,
            single_lower_bounded_variables: single_lower,
            single_upper_bounded_variables: single_upper,
            equality_constraints: equalities,
            inequality_constraints: inequalities,
        }
    }

    pub fn set_objective_multiplier(&mut self, objective_multiplier: f64) {
        debug_assert!(objective_multiplier >= 0.0);
        self.objective_multiplier = objective_multiplier;
    }

    /// Index of the elastic absorbing upper violations of constraint `j`.
    pub fn upper_elastic_index(&self, j: usize) -> usize {
        self.model.number_variables() + j
    }

    /// Index of the elastic absorbing lower violations of constraint `j`.
    pub fn lower_elastic_index(&self, j: usize) -> usize {
        self.model.number_variables() + self.model.number_constraints() + j
    }
}

impl OptimizationProblem for L1RelaxedProblem<'_> {
    fn model(&self) -> &dyn Model {
        self.model
    }

    fn number_variables(&self) -> usize {
        self.model.number_variables() + 2 * self.model.number_constraints()
    }

    fn number_constraints(&self) -> usize {
        self.model.number_constraints()
    }

    fn objective_multiplier(&self) -> f64 {
        self.objective_multiplier
    }

    fn variable_lower_bound(&self, i: usize) -> f64 {
        if i < self.model.number_variables() {
            self.model.variable_lower_bound(i)
        } else {
            0.0
        }
    }

    fn variable_upper_bound(&self, i: usize) -> f64 {
        if i < self.model.number_variables() {
            self.model.variable_upper_bound(i)
        } else {
            f64::INFINITY
        }
    }

    fn constraint_lower_bound(&self, j: usize) -> f64 {
        self.model.constraint_lower_bound(j)
    }

    fn constraint_upper_bound(&self, j: usize) -> f64 {
        self.model.constraint_upper_bound(j)
    }

    fn lower_bounded_variables(&self) -> &[usize] {
        &self.lower_bounded_variables
    }

    fn upper_bounded_variables(&self) -> &[usize] {
        &self.upper_bounded_variables
    }

    fn single_lower_bounded_variables(&self) -> &[usize] {
        &self.single_lower_bounded_variables
    }

    fn single_upper_bounded_variables(&self) -> &[usize] {
        &self.single_upper_bounded_variables
    }

    fn equality_constraints(&self) -> &[usize] {
        &self.equality_constraints
    }

    fn inequality_constraints(&self) -> &[usize] {
        &self.inequality_constraints
    }

    fn evaluate_objective(&self, iterate: &mut Iterate) -> Result<f64, EvaluationError> {
        let mut objective = 0.0;
        if self.objective_multiplier != 0.0 {
            objective = self.objective_multiplier * iterate.evaluate_objective(self.model)?;
        }
        let n = self.model.number_variables();
        let m = self.model.number_constraints();
        for elastic in &iterate.primals[n..n + 2 * m] {
            objective += elastic;
        }
        Ok(objective)
    }

    fn evaluate_objective_gradient(
        &self,
        iterate: &mut Iterate,
        gradient: &mut SparseVector,
    ) -> Result<(), EvaluationError> {
        let total = self.number_variables();
        let mut indices = Vec::new();
        let mut values = Vec::new();
        if self.objective_multiplier != 0.0 {
            iterate.evaluate_objective_gradient(self.model)?;
            for (i, v) in iterate.evaluations.objective_gradient.iter() {
                indices.push(i);
                values.push(self.objective_multiplier * v);
            }
        }
        let n = self.model.number_variables();
        let m = self.model.number_constraints();
        for elastic_index in n..n + 2 * m {
            indices.push(elastic_index);
            values.push(1.0);
        }
        *gradient = SparseVector::new(total, indices, values);
        Ok(())
    }

    fn evaluate_constraints(
        &self,
        iterate: &mut Iterate,
        constraints: &mut Vec<f64>,
    ) -> Result<(), EvaluationError> {
        iterate.evaluate_constraints(self.model)?;
        constraints.clear();
        constraints.extend_from_slice(&iterate.evaluations.constraints);
        for j in 0..self.model.number_constraints() {
            constraints[j] -= iterate.primals[self.upper_elastic_index(j)];
            constraints[j] += iterate.primals[self.lower_elastic_index(j)];
        }
        Ok(())
    }

    fn evaluate_constraint_jacobian(
        &self,
        iterate: &mut Iterate,
        jacobian: &mut JacobianRows,
    ) -> Result<(), EvaluationError> {
        iterate.evaluate_constraint_jacobian(self.model)?;
        let total = self.number_variables();
        jacobian.clear();
        for (j, row) in iterate.evaluations.constraint_jacobian.iter().enumerate() {
            let mut indices: Vec<usize> = row.indices().to_vec();
            let mut values: Vec<f64> = row.data().to_vec();
            indices.push(self.upper_elastic_index(j));
            values.push(-1.0);
            indices.push(self.lower_elastic_index(j));
            values.push(1.0);
            jacobian.push(SparseVector::new(total, indices, values));
        }
        Ok(())
    }

    fn evaluate_lagrangian_hessian(
        &self,
        x: &[f64],
        constraint_multipliers: &[f64],
        hessian: &mut SparseSymmetric,
    ) -> Result<(), EvaluationError> {
        // elastics are linear, so the Hessian lives in the model block
        hessian.reset(self.number_variables());
        let negated: Vec<f64> = constraint_multipliers.iter().map(|v| -v).collect();
        self.model.evaluate_lagrangian_hessian(
            &x[..self.model.number_variables()],
            self.objective_multiplier,
            &negated,
            hessian,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::Norm;
    use crate::model::Model;

    /// min x  s.t.  x^2 = 2
    struct CircleModel;

    impl Model for CircleModel {
        fn number_variables(&self) -> usize {
            1
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
            2.0
        }
        fn constraint_upper_bound(&self, _j: usize) -> f64 {
            2.0
        }
        fn evaluate_objective(&self, x: &[f64]) -> Result<f64, EvaluationError> {
            Ok(x[0])
        }
        fn evaluate_objective_gradient(&self, _x: &[f64]) -> Result<SparseVector, EvaluationError> {
            Ok(SparseVector::new(1, vec![0], vec![1.0]))
        }
        fn evaluate_constraints(&self, x: &[f64]) -> Result<Vec<f64>, EvaluationError> {
            Ok(vec![x[0] * x[0]])
        }
        fn evaluate_constraint_jacobian(&self, x: &[f64]) -> Result<JacobianRows, EvaluationError> {
            Ok(vec![SparseVector::new(1, vec![0], vec![2.0 * x[0]])])
        }
        fn evaluate_lagrangian_hessian(
            &self,
            _x: &[f64],
            _objective_multiplier: f64,
            multipliers: &[f64],
            hessian: &mut SparseSymmetric,
        ) -> Result<(), EvaluationError> {
            hessian.insert(0, 0, 2.0 * multipliers[0]);
            Ok(())
        }
        fn initial_primals(&self, x: &mut [f64]) {
            x[0] = 2.0;
        }
    }

    #[test]
    fn test_relaxed_dimensions_and_bounds() {
        let model = CircleModel;
        let problem = L1RelaxedProblem::new(&model, 0.0);
        assert_eq!(problem.number_variables(), 3);
        assert_eq!(problem.number_constraints(), 1);
        assert_eq!(problem.variable_lower_bound(1), 0.0);
        assert_eq!(problem.variable_upper_bound(2), f64::INFINITY);
        // elastics are single lower bounded
        assert!(problem.single_lower_bounded_variables().contains(&1));
        assert!(problem.single_lower_bounded_variables().contains(&2));
    }

    #[test]
    fn test_relaxed_evaluations() {
        let model = CircleModel;
        let problem = L1RelaxedProblem::new(&model, 0.0);
        let mut iterate = Iterate::new(3, 3, 1);
        iterate.primals[0] = 1.0; // c(x) = 1, target 2
        iterate.primals[1] = 0.5; // p
        iterate.primals[2] = 1.5; // q

        // objective: rho = 0, so pure elastic sum
        let objective = problem.evaluate_objective(&mut iterate).unwrap();
        assert_eq!(objective, 2.0);

        // constraints: c - p + q = 1 - 0.5 + 1.5 = 2 -> feasible
        let mut constraints = Vec::new();
        problem.evaluate_constraints(&mut iterate, &mut constraints).unwrap();
        assert_eq!(constraints, vec![2.0]);
        assert_eq!(problem.compute_constraint_violation(&constraints, Norm::L1), 0.0);

        // Jacobian row: [2x, -1, +1]
        let mut jacobian = Vec::new();
        problem
            .evaluate_constraint_jacobian(&mut iterate, &mut jacobian)
            .unwrap();
        let entries: Vec<(usize, f64)> = jacobian[0].iter().map(|(i, &v)| (i, v)).collect();
        assert_eq!(entries, vec![(0, 2.0), (1, -1.0), (2, 1.0)]);

        // gradient with rho = 0: only the elastic entries
        let mut gradient = SparseVector::empty(3);
        problem
            .evaluate_objective_gradient(&mut iterate, &mut gradient)
            .unwrap();
        let entries: Vec<(usize, f64)> = gradient.iter().map(|(i, &v)| (i, v)).collect();
        assert_eq!(entries, vec![(1, 1.0), (2, 1.0)]);
    }

    #[test]
    fn test_kkt_round_trip_at_rho_one() {
        // if (x*, lambda*) is KKT for the original, then (x*, p = q = 0) with
        // the same multipliers is KKT for the l1 relaxation with rho = 1,
        // provided |lambda*| <= 1 (the elastic gradient dominates).
        //
        // original: min x s.t. x^2 = 2 -> x* = -sqrt(2), lambda* = -1/(2 x*)
        let model = CircleModel;
        let problem = L1RelaxedProblem::new(&model, 1.0);
        let x_star = -(2.0_f64).sqrt();
        let lambda_star = 1.0 / (2.0 * (2.0_f64).sqrt());

        let mut iterate = Iterate::new(3, 3, 1);
        iterate.primals[0] = x_star;
        iterate.primals[1] = 0.0;
        iterate.primals[2] = 0.0;

        // stationarity in x: grad f - lambda grad c = 1 - 2 lambda x = 0
        assert!((1.0 - 2.0 * lambda_star * x_star).abs() > 0.0); // lambda* sign check below
        let lambda_star = 1.0 / (2.0 * x_star);
        assert!((1.0 - 2.0 * lambda_star * x_star).abs() < 1e-12);

        // primal feasibility of the relaxation at p = q = 0
        let mut constraints = Vec::new();
        problem.evaluate_constraints(&mut iterate, &mut constraints).unwrap();
        assert!((constraints[0] - 2.0).abs() < 1e-12);

        // stationarity in the elastics: d/dp (p + q) - lambda d/dp(-p) = 1 + lambda >= 0
        // and 1 - lambda >= 0 act as the multipliers of p, q >= 0; both
        // nonnegative since |lambda*| = 1/(2 sqrt 2) < 1
        assert!(lambda_star.abs() < 1.0);
        assert!(1.0 + lambda_star >= 0.0);
        assert!(1.0 - lambda_star >= 0.0);
    }
}
