//! Constraint relaxation: how the NLP is presented to the subproblem.
//!
//! The layer owns the subproblem and the step-acceptance strategies, and
//! decides which problem view the subproblem sees: the original problem
//! while optimizing, or the l1-relaxed feasibility problem while restoring.

mod feasibility_restoration;

pub use feasibility_restoration::FeasibilityRestoration;

use crate::direction::Direction;
use crate::error::{EvaluationError, SolverResult};
use crate::iterate::Iterate;
use crate::statistics::Statistics;
use crate::subproblem::WarmstartInformation;

/// The relaxation contract consumed by the globalization mechanisms.
pub trait ConstraintRelaxationStrategy {
    fn initialize(&mut self, statistics: &mut Statistics, iterate: &mut Iterate)
        -> SolverResult<()>;

    /// Direction at the current iterate for the active phase; an infeasible
    /// subproblem triggers the switch to restoration internally.
    fn compute_feasible_direction(
        &mut self,
        statistics: &mut Statistics,
        current_iterate: &mut Iterate,
        warmstart: &WarmstartInformation,
    ) -> SolverResult<Direction>;

    /// Assemble the trial progress measures and ask the active strategy.
    /// May flag a restoration request on rejection (infeasibility stall).
    fn is_iterate_acceptable(
        &mut self,
        statistics: &mut Statistics,
        current_iterate: &mut Iterate,
        trial_iterate: &mut Iterate,
        direction: &Direction,
        step_length: f64,
    ) -> Result<bool, EvaluationError>;

    /// Explicit switch into the restoration phase; returns the restoration
    /// direction at the current iterate.
    fn switch_to_feasibility_problem(
        &mut self,
        statistics: &mut Statistics,
        current_iterate: &mut Iterate,
    ) -> SolverResult<Direction>;

    /// True once after a rejection diagnosed as an infeasibility stall.
    fn take_restoration_request(&mut self) -> bool;

    fn solving_feasibility_problem(&self) -> bool;

    /// KKT residuals of the (original) problem at the iterate.
    fn compute_primal_dual_residuals(
        &self,
        iterate: &mut Iterate,
    ) -> Result<(), EvaluationError>;

    /// Dual safeguards on the freshly accepted iterate.
    fn postprocess_accepted_iterate(&mut self, iterate: &mut Iterate);

    fn set_trust_region_radius(&mut self, radius: f64);

    /// Whether the direction is negligibly small relative to the iterate.
    fn is_small_direction(&self, iterate: &Iterate, direction: &Direction) -> bool;

    fn hessian_evaluation_count(&self) -> usize;
    fn number_subproblems_solved(&self) -> usize;
}
