//! The model presented unchanged, with objective multiplier 1.

use super::{classify_bounds, classify_constraints, OptimizationProblem};
use crate::error::EvaluationError;
use crate::iterate::Iterate;
use crate::linalg::sparse::{JacobianRows, SparseSymmetric, SparseVector};
use crate::model::Model;

pub struct OriginalProblem<'m> {
    model: &'m dyn Model,
    lower_bounded_variables: Vec<usize>,
    upper_bounded_variables: Vec<usize>,
    single_lower_bounded_variables: Vec<usize>,
    single_upper_bounded_variables: Vec<usize>,
    equality_constraints: Vec<usize>,
    inequality_constraints: Vec<usize>,
}

impl<'m> OriginalProblem<'m> {
    pub fn new(model: &'m dyn Model) -> Self {
        let n = model.number_variables();
        let (lower_bounded, upper_bounded, single_lower, single_upper) = classify_bounds(
            |i| model.variable_lower_bound(i),
            |i| model.variable_upper_bound(i),
            n,
        );
        let (equalities, inequalities) = classify_constraints(model);
        Self {
            model,
            lower_bounded_variables: lower_bounded,
            upper_bounded_variables: upper_bounded,
            single_lower_bounded_variables: single_lower,
            single_upper_bounded_variables: single_upper,
            equality_constraints: equalities,
            inequality_constraints: inequalities,
        }
    }
}

impl OptimizationProblem for OriginalProblem<'_> {
    fn model(&self) -> &dyn Model {
        self.model
    }

    fn number_variables(&self) -> usize {
        self.model.number_variables()
    }

    fn number_constraints(&self) -> usize {
        self.model.number_constraints()
    }

    fn objective_multiplier(&self) -> f64 {
        1.0
    }

    fn variable_lower_bound(&self, i: usize) -> f64 {
        self.model.variable_lower_bound(i)
    }

    fn variable_upper_bound(&self, i: usize) -> f64 {
        self.model.variable_upper_bound(i)
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
        iterate.evaluate_objective(self.model)
    }

    fn evaluate_objective_gradient(
        &self,
        iterate: &mut Iterate,
        gradient: &mut SparseVector,
    ) -> Result<(), EvaluationError> {
        iterate.evaluate_objective_gradient(self.model)?;
        *gradient = iterate.evaluations.objective_gradient.clone();
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
        Ok(())
    }

    fn evaluate_constraint_jacobian(
        &self,
        iterate: &mut Iterate,
        jacobian: &mut JacobianRows,
    ) -> Result<(), EvaluationError> {
        iterate.evaluate_constraint_jacobian(self.model)?;
        jacobian.clear();
        jacobian.extend(iterate.evaluations.constraint_jacobian.iter().cloned());
        Ok(())
    }

    fn evaluate_lagrangian_hessian(
        &self,
        x: &[f64],
        constraint_multipliers: &[f64],
        hessian: &mut SparseSymmetric,
    ) -> Result<(), EvaluationError> {
        hessian.reset(self.number_variables());
        // the solver's Lagrangian subtracts the constraint part
        let negated: Vec<f64> = constraint_multipliers.iter().map(|v| -v).collect();
        self.model
            .evaluate_lagrangian_hessian(x, 1.0, &negated, hessian)
    }
}
