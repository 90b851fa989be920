//! Hessian models: exact, and exact-with-convexification.
//!
//! The convexified variant adds tau*I to the leading (original-variable)
//! diagonal block and grows tau geometrically until the factorization
//! reports full positive rank and no negative eigenvalues (Nocedal & Wright,
//! section 3.4). The interior-point subproblem does not use it: there the
//! augmented system is regularized instead, and the exact model is enough.

use crate::error::{SolverError, SolverResult};
use crate::linalg::ldl::LdlSolver;
use crate::linalg::sparse::SparseSymmetric;
use crate::reform::OptimizationProblem;

// hard cap on the convexification loop
const MAX_CONVEXIFICATION_ATTEMPTS: usize = 60;

/// A strategy producing the (possibly modified) Lagrangian Hessian.
pub trait HessianModel {
    fn evaluate(
        &mut self,
        problem: &dyn OptimizationProblem,
        x: &[f64],
        constraint_multipliers: &[f64],
    ) -> SolverResult<()>;

    fn hessian(&self) -> &SparseSymmetric;
    fn hessian_mut(&mut self) -> &mut SparseSymmetric;
    fn evaluation_count(&self) -> usize;
}

/// The model's Hessian, unmodified.
pub struct ExactHessian {
    hessian: SparseSymmetric,
    evaluation_count: usize,
}

impl ExactHessian {
    pub fn new(dimension: usize, capacity: usize) -> Self {
        Self {
            hessian: SparseSymmetric::new(dimension, capacity),
            evaluation_count: 0,
        }
    }
}

impl HessianModel for ExactHessian {
    fn evaluate(
        &mut self,
        problem: &dyn OptimizationProblem,
        x: &[f64],
        constraint_multipliers: &[f64],
    ) -> SolverResult<()> {
        problem.evaluate_lagrangian_hessian(x, constraint_multipliers, &mut self.hessian)?;
        self.evaluation_count += 1;
        Ok(())
    }

    fn hessian(&self) -> &SparseSymmetric {
        &self.hessian
    }

    fn hessian_mut(&mut self) -> &mut SparseSymmetric {
        &mut self.hessian
    }

    fn evaluation_count(&self) -> usize {
        self.evaluation_count
    }
}

/// The model's Hessian, shifted until positive definite on the original
/// variables.
pub struct ConvexifiedHessian {
    hessian: SparseSymmetric,
    evaluation_count: usize,
    solver: LdlSolver,
    initial_value: f64,
    increase_factor: f64,
}

impl ConvexifiedHessian {
    pub fn new(dimension: usize, capacity: usize, initial_value: f64, increase_factor: f64) -> Self {
        Self {
            hessian: SparseSymmetric::new(dimension, capacity),
            evaluation_count: 0,
            solver: LdlSolver::new(dimension),
            initial_value,
            increase_factor,
        }
    }

    /// Shift the leading block until the inertia is right. The factorization
    /// only sees the original-variable block: elastic variables are linear
    /// and contribute nothing to the Hessian.
    fn regularize(&mut self, number_original_variables: usize) -> SolverResult<()> {
        let smallest_diagonal_entry = self.hessian.smallest_diagonal_entry();
        let mut regularization = if smallest_diagonal_entry <= 0.0 {
            self.initial_value - smallest_diagonal_entry
        } else {
            0.0
        };

        let checkpoint = self.hessian.checkpoint();
        for _attempt in 0..MAX_CONVEXIFICATION_ATTEMPTS {
            self.hessian.truncate(checkpoint);
            if regularization > 0.0 {
                self.hessian
                    .add_identity_multiple(regularization, number_original_variables);
            }

            let block = self.leading_block(number_original_variables);
            self.solver.resize(number_original_variables);
            self.solver.invalidate_symbolic();
            let factorized = self.solver.numeric_factorization(&block).is_ok();
            if factorized
                && self.solver.rank() == number_original_variables
                && self.solver.inertia().negative == 0
            {
                return Ok(());
            }

            regularization = if regularization == 0.0 {
                self.initial_value
            } else {
                self.increase_factor * regularization
            };
            if !regularization.is_finite() {
                break;
            }
        }
        Err(SolverError::RegularizationDiverged(regularization))
    }

    fn leading_block(&self, size: usize) -> sprs::CsMat<f64> {
        let mut block = SparseSymmetric::new(size, self.hessian.number_nonzeros() + size);
        for (i, j, value) in self.hessian.iter() {
            if i < size && j < size {
                block.insert(i, j, value);
            }
        }
        // explicit diagonal so a zero row still shows up as a zero pivot
        for i in 0..size {
            block.insert(i, i, 0.0);
        }
        block.to_csc()
    }
}

impl HessianModel for ConvexifiedHessian {
    fn evaluate(
        &mut self,
        problem: &dyn OptimizationProblem,
        x: &[f64],
        constraint_multipliers: &[f64],
    ) -> SolverResult<()> {
        problem.evaluate_lagrangian_hessian(x, constraint_multipliers, &mut self.hessian)?;
        self.evaluation_count += 1;
        self.regularize(problem.number_original_variables())?;
        Ok(())
    }

    fn hessian(&self) -> &SparseSymmetric {
        &self.hessian
    }

    fn hessian_mut(&mut self) -> &mut SparseSymmetric {
        &mut self.hessian
    }

    fn evaluation_count(&self) -> usize {
        self.evaluation_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvaluationError;
    use crate::linalg::sparse::{JacobianRows, SparseVector};
    use crate::model::Model;
    use crate::reform::OriginalProblem;

    /// unconstrained model with a configurable diagonal Hessian
    struct DiagonalModel {
        diagonal: Vec<f64>,
    }

    impl Model for DiagonalModel {
        fn number_variables(&self) -> usize {
            self.diagonal.len()
        }
        fn number_constraints(&self) -> usize {
            0
        }
        fn variable_lower_bound(&self, _i: usize) -> f64 {
            f64::NEG_INFINITY
        }
        fn variable_upper_bound(&self, _i: usize) -> f64 {
            f64::INFINITY
        }
        fn constraint_lower_bound(&self, _j: usize) -> f64 {
            unreachable!()
        }
        fn constraint_upper_bound(&self, _j: usize) -> f64 {
            unreachable!()
        }
        fn evaluate_objective(&self, _x: &[f64]) -> Result<f64, EvaluationError> {
            Ok(0.0)
        }
        fn evaluate_objective_gradient(&self, _x: &[f64]) -> Result<SparseVector, EvaluationError> {
            Ok(SparseVector::empty(self.diagonal.len()))
        }
        fn evaluate_constraints(&self, _x: &[f64]) -> Result<Vec<f64>, EvaluationError> {
            Ok(Vec::new())
        }
        fn evaluate_constraint_jacobian(
            &self,
            _x: &[f64],
        ) -> Result<JacobianRows, EvaluationError> {
            Ok(Vec::new())
        }
        fn evaluate_lagrangian_hessian(
            &self,
            _x: &[f64],
            objective_multiplier: f64,
            _multipliers: &[f64],
            hessian: &mut SparseSymmetric,
        ) -> Result<(), EvaluationError> {
            for (i, &d) in self.diagonal.iter().enumerate() {
                hessian.insert(i, i, objective_multiplier * d);
            }
            Ok(())
        }
        fn initial_primals(&self, x: &mut [f64]) {
            x.fill(0.0);
        }
    }

    #[test]
    fn test_positive_definite_left_alone() {
        let model = DiagonalModel {
            diagonal: vec![2.0, 3.0],
        };
        let problem = OriginalProblem::new(&model);
        let mut hessian_model = ConvexifiedHessian::new(2, 8, 1e-4, 8.0);
        hessian_model.evaluate(&problem, &[0.0, 0.0], &[]).unwrap();
        assert_eq!(hessian_model.hessian().smallest_diagonal_entry(), 2.0);
        assert_eq!(hessian_model.evaluation_count(), 1);
    }

    #[test]
    fn test_indefinite_is_shifted() {
        let model = DiagonalModel {
            diagonal: vec![1.0, -3.0],
        };
        let problem = OriginalProblem::new(&model);
        let mut hessian_model = ConvexifiedHessian::new(2, 8, 1e-4, 8.0);
        hessian_model.evaluate(&problem, &[0.0, 0.0], &[]).unwrap();
        // shifted diagonal must now be positive
        assert!(hessian_model.hessian().smallest_diagonal_entry() > 0.0);
    }

    #[test]
    fn test_shift_bounded_by_eigenvalue_and_growth() {
        // minimum eigenvalue -M: the loop terminates with a shift no larger
        // than (initial - min_diag) grown by at most one escalation round
        let m_bound = 50.0;
        let model = DiagonalModel {
            diagonal: vec![-m_bound, 1.0],
        };
        let problem = OriginalProblem::new(&model);
        let mut hessian_model = ConvexifiedHessian::new(2, 8, 1e-4, 8.0);
        hessian_model.evaluate(&problem, &[0.0, 0.0], &[]).unwrap();
        let shifted_minimum = hessian_model.hessian().smallest_diagonal_entry();
        assert!(shifted_minimum > 0.0);
        assert!(shifted_minimum <= 1e-4 * 8.0 + m_bound * 8.0);
    }
}
