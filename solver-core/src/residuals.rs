//! KKT residuals, their scalings and the termination status they imply.
//!
//! The stationarity and complementarity residuals are computed in two
//! flavors: the optimality form (objective multiplier 1) and the feasibility
//! form (objective multiplier 0), so that a stationary point of the
//! constraint violation can be recognized when the problem is infeasible,
//! and a Fritz-John point when a constraint qualification fails.

use std::fmt;

use crate::error::EvaluationError;
use crate::iterate::Iterate;
use crate::linalg::norm::norm_1;
use crate::linalg::sparse::scatter;
use crate::linalg::Norm;
use crate::reform::OptimizationProblem;

/// Residual scaling reference (Ipopt's s_max).
const SCALING_THRESHOLD: f64 = 100.0;

/// The primal-dual residuals of an iterate. All +inf until first computed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrimalDualResiduals {
    pub optimality_stationarity: f64,
    pub feasibility_stationarity: f64,
    pub infeasibility: f64,
    pub optimality_complementarity: f64,
    pub feasibility_complementarity: f64,
    pub stationarity_scaling: f64,
    pub complementarity_scaling: f64,
}

impl Default for PrimalDualResiduals {
    fn default() -> Self {
        Self {
            optimality_stationarity: f64::INFINITY,
            feasibility_stationarity: f64::INFINITY,
            infeasibility: f64::INFINITY,
            optimality_complementarity: f64::INFINITY,
            feasibility_complementarity: f64::INFINITY,
            stationarity_scaling: f64::INFINITY,
            complementarity_scaling: f64::INFINITY,
        }
    }
}

/// How an iterate relates to the optimality conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationStatus {
    NotOptimal,
    FeasibleKktPoint,
    FeasibleFjPoint,
    InfeasibleStationaryPoint,
    Unbounded,
    FeasibleSmallStep,
    InfeasibleSmallStep,
}

impl TerminationStatus {
    /// True for every status that ends the outer loop.
    pub fn is_terminal(self) -> bool {
        self != TerminationStatus::NotOptimal
    }
}

impl fmt::Display for TerminationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TerminationStatus::NotOptimal => "not optimal",
            TerminationStatus::FeasibleKktPoint => "feasible KKT point",
            TerminationStatus::FeasibleFjPoint => "feasible FJ point (CQ failure)",
            TerminationStatus::InfeasibleStationaryPoint => "infeasible stationary point",
            TerminationStatus::Unbounded => "unbounded",
            TerminationStatus::FeasibleSmallStep => "feasible small step",
            TerminationStatus::InfeasibleSmallStep => "infeasible small step",
        };
        write!(f, "{name}")
    }
}

/// Compute the residuals of `iterate` for the given problem view and store
/// them on the iterate.
pub fn compute_primal_dual_residuals(
    problem: &dyn OptimizationProblem,
    iterate: &mut Iterate,
    residual_norm: Norm,
) -> Result<(), EvaluationError> {
    let n = problem.number_variables();
    let model = problem.model();
    iterate.evaluate_objective_gradient(model)?;
    iterate.evaluate_constraints(model)?;
    iterate.evaluate_constraint_jacobian(model)?;

    // constraints contribution of the Lagrangian gradient:
    // -J^T lambda - z_L - z_U
    iterate.lagrangian_constraints_contribution[..n].fill(0.0);
    for (j, row) in iterate.evaluations.constraint_jacobian.iter().enumerate() {
        let multiplier = iterate.multipliers.constraints[j];
        if multiplier != 0.0 {
            for (i, value) in row.iter() {
                iterate.lagrangian_constraints_contribution[i] -= multiplier * value;
            }
        }
    }
    for i in 0..n {
        iterate.lagrangian_constraints_contribution[i] -=
            iterate.multipliers.lower_bounds[i] + iterate.multipliers.upper_bounds[i];
    }

    // full Lagrangian gradient at objective multiplier 1
    let mut lagrangian_gradient = iterate.lagrangian_constraints_contribution[..n].to_vec();
    scatter(&iterate.evaluations.objective_gradient, 1.0, &mut lagrangian_gradient);

    let residuals = &mut iterate.residuals;
    residuals.optimality_stationarity = residual_norm.of(&lagrangian_gradient);
    residuals.feasibility_stationarity =
        residual_norm.of(&iterate.lagrangian_constraints_contribution[..n]);
    residuals.infeasibility =
        problem.compute_constraint_violation(&iterate.evaluations.constraints, residual_norm);
    residuals.optimality_complementarity = problem.compute_complementarity_error(
        n,
        &iterate.primals,
        &iterate.evaluations.constraints,
        &iterate.multipliers.constraints,
        &iterate.multipliers.lower_bounds,
        &iterate.multipliers.upper_bounds,
    );
    residuals.feasibility_complementarity = problem.compute_feasibility_complementarity_error(
        n,
        &iterate.primals,
        &iterate.evaluations.constraints,
        &iterate.multipliers.constraints,
        &iterate.multipliers.lower_bounds,
        &iterate.multipliers.upper_bounds,
    );

    let m = problem.number_constraints();
    let multiplier_norm = iterate.multipliers.norm_1(n);
    residuals.stationarity_scaling =
        SCALING_THRESHOLD.max(multiplier_norm / ((m + n) as f64)) / SCALING_THRESHOLD;
    let bound_multiplier_norm = norm_1(&iterate.multipliers.lower_bounds[..n])
        + norm_1(&iterate.multipliers.upper_bounds[..n]);
    residuals.complementarity_scaling = if n > 0 {
        SCALING_THRESHOLD.max(bound_multiplier_norm / (n as f64)) / SCALING_THRESHOLD
    } else {
        1.0
    };
    Ok(())
}

/// Map the residuals to a termination status at the given tolerance.
pub fn compute_termination_status(
    iterate: &Iterate,
    number_variables: usize,
    tolerance: f64,
    unbounded_objective_threshold: f64,
) -> TerminationStatus {
    let residuals = &iterate.residuals;
    let optimality_stationarity =
        residuals.optimality_stationarity / residuals.stationarity_scaling <= tolerance;
    let feasibility_stationarity =
        residuals.feasibility_stationarity / residuals.stationarity_scaling <= tolerance;
    let optimality_complementarity =
        residuals.optimality_complementarity / residuals.complementarity_scaling <= tolerance;
    let feasibility_complementarity =
        residuals.feasibility_complementarity / residuals.complementarity_scaling <= tolerance;
    let primal_feasibility = residuals.infeasibility <= tolerance;
    let no_trivial_duals = iterate.multipliers.not_all_zero(number_variables, tolerance);

    if iterate.is_objective_computed
        && iterate.evaluations.objective < unbounded_objective_threshold
    {
        return TerminationStatus::Unbounded;
    }
    if optimality_complementarity && primal_feasibility {
        if iterate.multipliers.objective > 0.0 && optimality_stationarity {
            return TerminationStatus::FeasibleKktPoint;
        }
        if feasibility_stationarity && no_trivial_duals {
            return TerminationStatus::FeasibleFjPoint;
        }
    } else if feasibility_complementarity && feasibility_stationarity && !primal_feasibility {
        return TerminationStatus::InfeasibleStationaryPoint;
    }
    TerminationStatus::NotOptimal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::sparse::{JacobianRows, SparseSymmetric, SparseVector};
    use crate::model::Model;
    use crate::reform::OriginalProblem;

    /// min (1/2) x^2  s.t.  x = 1; KKT at x = 1, lambda = 1
    struct PinnedQuadratic;

    impl Model for PinnedQuadratic {
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
            1.0
        }
        fn constraint_upper_bound(&self, _j: usize) -> f64 {
            1.0
        }
        fn evaluate_objective(&self, x: &[f64]) -> Result<f64, EvaluationError> {
            Ok(0.5 * x[0] * x[0])
        }
        fn evaluate_objective_gradient(&self, x: &[f64]) -> Result<SparseVector, EvaluationError> {
            Ok(SparseVector::new(1, vec![0], vec![x[0]]))
        }
        fn evaluate_constraints(&self, x: &[f64]) -> Result<Vec<f64>, EvaluationError> {
            Ok(vec![x[0]])
        }
        fn evaluate_constraint_jacobian(
            &self,
            _x: &[f64],
        ) -> Result<JacobianRows, EvaluationError> {
            Ok(vec![SparseVector::new(1, vec![0], vec![1.0])])
        }
        fn evaluate_lagrangian_hessian(
            &self,
            _x: &[f64],
            objective_multiplier: f64,
            _multipliers: &[f64],
            hessian: &mut SparseSymmetric,
        ) -> Result<(), EvaluationError> {
            hessian.insert(0, 0, objective_multiplier);
            Ok(())
        }
        fn initial_primals(&self, x: &mut [f64]) {
            x[0] = 0.0;
        }
    }

    #[test]
    fn test_residuals_vanish_at_kkt_point() {
        let model = PinnedQuadratic;
        let problem = OriginalProblem::new(&model);
        let mut iterate = Iterate::new(1, 1, 1);
        iterate.primals[0] = 1.0;
        iterate.multipliers.constraints[0] = 1.0;

        compute_primal_dual_residuals(&problem, &mut iterate, Norm::L2).unwrap();
        let residuals = &iterate.residuals;
        assert!(residuals.optimality_stationarity <= 1e-12);
        assert!(residuals.infeasibility <= 1e-12);
        assert!(residuals.optimality_complementarity <= 1e-12);
        assert_eq!(residuals.stationarity_scaling, 1.0);
        assert_eq!(residuals.complementarity_scaling, 1.0);

        iterate.evaluate_objective(&model).unwrap();
        let status = compute_termination_status(&iterate, 1, 1e-8, -1e20);
        assert_eq!(status, TerminationStatus::FeasibleKktPoint);
    }

    #[test]
    fn test_not_optimal_away_from_kkt() {
        let model = PinnedQuadratic;
        let problem = OriginalProblem::new(&model);
        let mut iterate = Iterate::new(1, 1, 1);
        iterate.primals[0] = 3.0;

        compute_primal_dual_residuals(&problem, &mut iterate, Norm::L2).unwrap();
        assert!(iterate.residuals.optimality_stationarity > 1.0);
        assert!(iterate.residuals.infeasibility > 1.0);

        iterate.evaluate_objective(&model).unwrap();
        let status = compute_termination_status(&iterate, 1, 1e-8, -1e20);
        assert_eq!(status, TerminationStatus::NotOptimal);
    }

    #[test]
    fn test_unbounded_detection() {
        let model = PinnedQuadratic;
        let _ = model;
        let mut iterate = Iterate::new(1, 1, 1);
        iterate.evaluations.objective = -1e21;
        iterate.is_objective_computed = true;
        let status = compute_termination_status(&iterate, 1, 1e-8, -1e20);
        assert_eq!(status, TerminationStatus::Unbounded);
    }

    #[test]
    fn test_stationarity_scaling_grows_with_multipliers() {
        let model = PinnedQuadratic;
        let problem = OriginalProblem::new(&model);
        let mut iterate = Iterate::new(1, 1, 1);
        iterate.primals[0] = 1.0;
        iterate.multipliers.constraints[0] = 1e6;
        compute_primal_dual_residuals(&problem, &mut iterate, Norm::L2).unwrap();
        // ||lambda||_1 / (m + n) = 5e5 > s_max, so the scaling kicks in
        assert!(iterate.residuals.stationarity_scaling > 1.0);
    }
}
