//! Small nonlinear programs with known solutions, shared between the
//! regression tests and the benchmark runner.

use solver_core::error::EvaluationError;
use solver_core::linalg::sparse::{JacobianRows, SparseSymmetric, SparseVector};
use solver_core::residuals::TerminationStatus;
use solver_core::Model;

/// Test problem definition.
pub struct TestProblem {
    pub name: &'static str,
    pub builder: fn() -> Box<dyn Model>,
    pub expected_status: TerminationStatus,
    pub expected_objective: Option<f64>,
    pub maximum_iterations: usize,
}

// ============================================================================
// Unconstrained problems
// ============================================================================

/// min (1/2)(x1^2 + x2^2), start (10, 10); minimizer at the origin.
pub struct ConvexQuadratic;

impl Model for ConvexQuadratic {
    fn name(&self) -> &str {
        "convex_quadratic"
    }
    fn number_variables(&self) -> usize {
        2
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
    fn evaluate_objective(&self, x: &[f64]) -> Result<f64, EvaluationError> {
        Ok(0.5 * (x[0] * x[0] + x[1] * x[1]))
    }
    fn evaluate_objective_gradient(&self, x: &[f64]) -> Result<SparseVector, EvaluationError> {
        Ok(SparseVector::new(2, vec![0, 1], vec![x[0], x[1]]))
    }
    fn evaluate_constraints(&self, _x: &[f64]) -> Result<Vec<f64>, EvaluationError> {
        Ok(Vec::new())
    }
    fn evaluate_constraint_jacobian(&self, _x: &[f64]) -> Result<JacobianRows, EvaluationError> {
        Ok(Vec::new())
    }
    fn evaluate_lagrangian_hessian(
        &self,
        _x: &[f64],
        objective_multiplier: f64,
        _multipliers: &[f64],
        hessian: &mut SparseSymmetric,
    ) -> Result<(), EvaluationError> {
        hessian.insert(0, 0, objective_multiplier);
        hessian.insert(1, 1, objective_multiplier);
        Ok(())
    }
    fn number_hessian_nonzeros(&self) -> usize {
        2
    }
    fn initial_primals(&self, x: &mut [f64]) {
        x[0] = 10.0;
        x[1] = 10.0;
    }
}

/// Rosenbrock: min 100 (x2 - x1^2)^2 + (1 - x1)^2, start (-1.2, 1);
/// minimizer (1, 1).
pub struct Rosenbrock;

impl Model for Rosenbrock {
    fn name(&self) -> &str {
        "rosenbrock"
    }
    fn number_variables(&self) -> usize {
        2
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
    fn evaluate_objective(&self, x: &[f64]) -> Result<f64, EvaluationError> {
        let residual = x[1] - x[0] * x[0];
        Ok(100.0 * residual * residual + (1.0 - x[0]) * (1.0 - x[0]))
    }
    fn evaluate_objective_gradient(&self, x: &[f64]) -> Result<SparseVector, EvaluationError> {
        let residual = x[1] - x[0] * x[0];
        Ok(SparseVector::new(
            2,
            vec![0, 1],
            vec![
                -400.0 * x[0] * residual - 2.0 * (1.0 - x[0]),
                200.0 * residual,
            ],
        ))
    }
    fn evaluate_constraints(&self, _x: &[f64]) -> Result<Vec<f64>, EvaluationError> {
        Ok(Vec::new())
    }
    fn evaluate_constraint_jacobian(&self, _x: &[f64]) -> Result<JacobianRows, EvaluationError> {
        Ok(Vec::new())
    }
    fn evaluate_lagrangian_hessian(
        &self,
        x: &[f64],
        objective_multiplier: f64,
        _multipliers: &[f64],
        hessian: &mut SparseSymmetric,
    ) -> Result<(), EvaluationError> {
        hessian.insert(
            0,
            0,
            objective_multiplier * (1200.0 * x[0] * x[0] - 400.0 * x[1] + 2.0),
        );
        hessian.insert(0, 1, objective_multiplier * (-400.0 * x[0]));
        hessian.insert(1, 1, objective_multiplier * 200.0);
        Ok(())
    }
    fn number_hessian_nonzeros(&self) -> usize {
        3
    }
    fn initial_primals(&self, x: &mut [f64]) {
        x[0] = -1.2;
        x[1] = 1.0;
    }
}

/// min -x1, no constraints, no bounds: unbounded below.
pub struct UnboundedLinear;

impl Model for UnboundedLinear {
    fn name(&self) -> &str {
        "unbounded_linear"
    }
    fn number_variables(&self) -> usize {
        1
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
    fn evaluate_objective(&self, x: &[f64]) -> Result<f64, EvaluationError> {
        Ok(-x[0])
    }
    fn evaluate_objective_gradient(&self, _x: &[f64]) -> Result<SparseVector, EvaluationError> {
        Ok(SparseVector::new(1, vec![0], vec![-1.0]))
    }
    fn evaluate_constraints(&self, _x: &[f64]) -> Result<Vec<f64>, EvaluationError> {
        Ok(Vec::new())
    }
    fn evaluate_constraint_jacobian(&self, _x: &[f64]) -> Result<JacobianRows, EvaluationError> {
        Ok(Vec::new())
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
    fn number_hessian_nonzeros(&self) -> usize {
        0
    }
    fn initial_primals(&self, x: &mut [f64]) {
        x[0] = 0.0;
    }
}

// ============================================================================
// Constrained problems
// ============================================================================

/// min x1 + x2  s.t.  x1^2 + x2^2 = 2, start (2, 2); minimizer (-1, -1)
/// with constraint multiplier -1/2.
pub struct CircleEquality;

impl Model for CircleEquality {
    fn name(&self) -> &str {
        "circle_equality"
    }
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
        2.0
    }
    fn constraint_upper_bound(&self, _j: usize) -> f64 {
        2.0
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
    fn number_hessian_nonzeros(&self) -> usize {
        2
    }
    fn initial_primals(&self, x: &mut [f64]) {
        x[0] = 2.0;
        x[1] = 2.0;
    }
}

/// min x^2  with  x >= 1, start 5; minimizer x = 1 with bound dual 2.
pub struct BoundActiveQuadratic;

impl Model for BoundActiveQuadratic {
    fn name(&self) -> &str {
        "bound_active_quadratic"
    }
    fn number_variables(&self) -> usize {
        1
    }
    fn number_constraints(&self) -> usize {
        0
    }
    fn variable_lower_bound(&self, _i: usize) -> f64 {
        1.0
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
    fn evaluate_objective(&self, x: &[f64]) -> Result<f64, EvaluationError> {
        Ok(x[0] * x[0])
    }
    fn evaluate_objective_gradient(&self, x: &[f64]) -> Result<SparseVector, EvaluationError> {
        Ok(SparseVector::new(1, vec![0], vec![2.0 * x[0]]))
    }
    fn evaluate_constraints(&self, _x: &[f64]) -> Result<Vec<f64>, EvaluationError> {
        Ok(Vec::new())
    }
    fn evaluate_constraint_jacobian(&self, _x: &[f64]) -> Result<JacobianRows, EvaluationError> {
        Ok(Vec::new())
    }
    fn evaluate_lagrangian_hessian(
        &self,
        _x: &[f64],
        objective_multiplier: f64,
        _multipliers: &[f64],
        hessian: &mut SparseSymmetric,
    ) -> Result<(), EvaluationError> {
        hessian.insert(0, 0, 2.0 * objective_multiplier);
        Ok(())
    }
    fn number_hessian_nonzeros(&self) -> usize {
        1
    }
    fn initial_primals(&self, x: &mut [f64]) {
        x[0] = 5.0;
    }
}

/// min x^2  s.t.  x >= 2 and x <= 1: the feasible set is empty.
pub struct InfeasibleBox;

impl Model for InfeasibleBox {
    fn name(&self) -> &str {
        "infeasible_box"
    }
    fn number_variables(&self) -> usize {
        1
    }
    fn number_constraints(&self) -> usize {
        2
    }
    fn variable_lower_bound(&self, _i: usize) -> f64 {
        f64::NEG_INFINITY
    }
    fn variable_upper_bound(&self, _i: usize) -> f64 {
        f64::INFINITY
    }
    fn constraint_lower_bound(&self, j: usize) -> f64 {
        if j == 0 {
            2.0
        } else {
            f64::NEG_INFINITY
        }
    }
    fn constraint_upper_bound(&self, j: usize) -> f64 {
        if j == 0 {
            f64::INFINITY
        } else {
            1.0
        }
    }
    fn evaluate_objective(&self, x: &[f64]) -> Result<f64, EvaluationError> {
        Ok(x[0] * x[0])
    }
    fn evaluate_objective_gradient(&self, x: &[f64]) -> Result<SparseVector, EvaluationError> {
        Ok(SparseVector::new(1, vec![0], vec![2.0 * x[0]]))
    }
    fn evaluate_constraints(&self, x: &[f64]) -> Result<Vec<f64>, EvaluationError> {
        Ok(vec![x[0], x[0]])
    }
    fn evaluate_constraint_jacobian(&self, _x: &[f64]) -> Result<JacobianRows, EvaluationError> {
        Ok(vec![
            SparseVector::new(1, vec![0], vec![1.0]),
            SparseVector::new(1, vec![0], vec![1.0]),
        ])
    }
    fn evaluate_lagrangian_hessian(
        &self,
        _x: &[f64],
        objective_multiplier: f64,
        _multipliers: &[f64],
        hessian: &mut SparseSymmetric,
    ) -> Result<(), EvaluationError> {
        hessian.insert(0, 0, 2.0 * objective_multiplier);
        Ok(())
    }
    fn number_hessian_nonzeros(&self) -> usize {
        1
    }
    fn initial_primals(&self, x: &mut [f64]) {
        x[0] = 0.0;
    }
}

// ============================================================================
// Problem registry
// ============================================================================

pub fn scenario_problems() -> Vec<TestProblem> {
    vec![
        TestProblem {
            name: "convex_quadratic",
            builder: || Box::new(ConvexQuadratic),
            expected_status: TerminationStatus::FeasibleKktPoint,
            expected_objective: Some(0.0),
            maximum_iterations: 15,
        },
        TestProblem {
            name: "circle_equality",
            builder: || Box::new(CircleEquality),
            expected_status: TerminationStatus::FeasibleKktPoint,
            // two first-order points, objectives -2 and +2
            expected_objective: None,
            maximum_iterations: 100,
        },
        TestProblem {
            name: "bound_active_quadratic",
            builder: || Box::new(BoundActiveQuadratic),
            expected_status: TerminationStatus::FeasibleKktPoint,
            expected_objective: Some(1.0),
            maximum_iterations: 100,
        },
        TestProblem {
            name: "infeasible_box",
            builder: || Box::new(InfeasibleBox),
            expected_status: TerminationStatus::InfeasibleStationaryPoint,
            expected_objective: None,
            maximum_iterations: 200,
        },
        TestProblem {
            name: "unbounded_linear",
            builder: || Box::new(UnboundedLinear),
            expected_status: TerminationStatus::Unbounded,
            expected_objective: None,
            maximum_iterations: 40,
        },
        TestProblem {
            name: "rosenbrock",
            builder: || Box::new(Rosenbrock),
            expected_status: TerminationStatus::FeasibleKktPoint,
            expected_objective: Some(0.0),
            maximum_iterations: 40,
        },
    ]
}
