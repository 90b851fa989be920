//! Subproblem solvers: the common contract and its two families.
//!
//! A subproblem takes the current iterate and produces a primal-dual
//! direction. Two families implement the contract: the active-set LP/QP
//! subproblems (which delegate to an external LP/QP collaborator) and the
//! primal-dual interior-point subproblem (which factorizes the regularized
//! augmented system itself).

pub mod active_set;
pub mod barrier;
pub mod interior_point;
pub mod qp;

pub use interior_point::InteriorPointSubproblem;

use crate::direction::Direction;
use crate::error::SolverResult;
use crate::iterate::{Iterate, OptimalityMeasure};
use crate::reform::{L1RelaxedProblem, OptimizationProblem};
use crate::statistics::Statistics;

/// What changed since the previous subproblem call; lets the solver skip
/// stale work and pick a warm-start mode.
#[derive(Debug, Clone, Copy)]
pub struct WarmstartInformation {
    pub objective_changed: bool,
    pub constraints_changed: bool,
    pub variable_bounds_changed: bool,
    pub constraint_bounds_changed: bool,
    pub problem_changed: bool,
}

impl WarmstartInformation {
    /// Everything must be re-evaluated (new point or new problem).
    pub fn whole_problem_changed() -> Self {
        Self {
            objective_changed: true,
            constraints_changed: true,
            variable_bounds_changed: true,
            constraint_bounds_changed: true,
            problem_changed: true,
        }
    }

    /// Retry at the same point with a different trust region.
    pub fn only_variable_bounds_changed() -> Self {
        Self {
            objective_changed: false,
            constraints_changed: false,
            variable_bounds_changed: true,
            constraint_bounds_changed: false,
            problem_changed: false,
        }
    }
}

/// The subproblem contract consumed by the constraint-relaxation layer.
pub trait Subproblem {
    /// Register statistics columns and move the first iterate into a valid
    /// starting state (interior point for the barrier method).
    fn initialize(
        &mut self,
        statistics: &mut Statistics,
        problem: &dyn OptimizationProblem,
        first_iterate: &mut Iterate,
    ) -> SolverResult<()>;

    /// Compute a direction at the current iterate.
    fn solve(
        &mut self,
        statistics: &mut Statistics,
        problem: &dyn OptimizationProblem,
        current_iterate: &mut Iterate,
        warmstart: &WarmstartInformation,
    ) -> SolverResult<Direction>;

    /// Called when the relaxation layer enters restoration.
    fn initialize_feasibility_problem(
        &mut self,
        problem: &dyn OptimizationProblem,
        current_iterate: &mut Iterate,
    );

    /// Set the elastic variables (and their duals) of the iterate.
    fn set_elastic_variable_values(&self, problem: &L1RelaxedProblem, iterate: &mut Iterate);

    /// Called when the relaxation layer leaves restoration.
    fn exit_feasibility_problem(
        &mut self,
        problem: &dyn OptimizationProblem,
        trial_iterate: &mut Iterate,
    );

    /// Fill the auxiliary progress term of the iterate (barrier terms for the
    /// interior-point method, 0 for active-set methods).
    fn set_auxiliary_measure(&self, problem: &dyn OptimizationProblem, iterate: &mut Iterate);

    /// Model prediction of the objective decrease along `step_length *
    /// direction`, at objective multiplier 1.
    fn predicted_objective_reduction(
        &self,
        iterate: &Iterate,
        direction: &Direction,
        step_length: f64,
    ) -> OptimalityMeasure;

    /// Model prediction of the auxiliary-term decrease along the direction.
    fn predicted_auxiliary_reduction(
        &self,
        problem: &dyn OptimizationProblem,
        iterate: &Iterate,
        direction: &Direction,
        step_length: f64,
    ) -> f64;

    /// Whether the direction is too small to make progress (relative to the
    /// iterate); the caller treats a small direction as converged.
    fn is_small_direction(
        &self,
        problem: &dyn OptimizationProblem,
        iterate: &Iterate,
        direction: &Direction,
    ) -> bool {
        let _ = (problem, iterate, direction);
        false
    }

    /// Dual safeguards after a trial iterate is accepted.
    fn postprocess_accepted_iterate(
        &mut self,
        problem: &dyn OptimizationProblem,
        iterate: &mut Iterate,
    );

    fn set_trust_region_radius(&mut self, radius: f64);

    /// Suggest a starting point for the next subproblem solve (active-set
    /// warm starts); ignored by the interior-point method.
    fn set_initial_point(&mut self, point: &[f64]);

    fn hessian_evaluation_count(&self) -> usize;
    fn number_subproblems_solved(&self) -> usize;
}
