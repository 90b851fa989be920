//! Globalization mechanisms: turning a direction plus an acceptance
//! predicate into an iterate update.
//!
//! Both mechanisms share the trial-iterate assembly (separate primal,
//! constraint-dual and bound-dual step lengths; a zero primal direction
//! takes only the dual step and poisons the progress measures) and the
//! two-tolerance convergence check.

pub mod line_search;
pub mod trust_region;

pub use line_search::BacktrackingLineSearch;
pub use trust_region::TrustRegionMechanism;

use crate::direction::Direction;
use crate::error::SolverResult;
use crate::iterate::{Iterate, ProgressMeasures};
use crate::model::Model;
use crate::options::Options;
use crate::residuals::{compute_termination_status, TerminationStatus};
use crate::statistics::Statistics;

/// A globalization mechanism: owns the relaxation layer and advances the
/// iterate.
pub trait GlobalizationMechanism {
    fn initialize(
        &mut self,
        statistics: &mut Statistics,
        current_iterate: &mut Iterate,
    ) -> SolverResult<()>;

    /// One outer iteration: direction, acceptance loop, commit.
    fn compute_next_iterate(
        &mut self,
        statistics: &mut Statistics,
        model: &dyn Model,
        current_iterate: &mut Iterate,
    ) -> SolverResult<Iterate>;

    fn hessian_evaluation_count(&self) -> usize;
    fn number_subproblems_solved(&self) -> usize;
}

/// Build the trial iterate for the given step lengths.
///
/// Bound multipliers always take `bound_dual_step_length` (the full
/// fraction-to-boundary dual step under line search), while the backtracking
/// applies to the primals and constraint multipliers only.
pub fn assemble_trial_iterate(
    current_iterate: &Iterate,
    direction: &Direction,
    primal_step_length: f64,
    dual_step_length: f64,
    bound_dual_step_length: f64,
) -> Iterate {
    let mut trial = current_iterate.clone();
    trial.set_number_variables(direction.number_variables);
    trial.multipliers.objective = direction.objective_multiplier;
    trial.status = TerminationStatus::NotOptimal;
    trial.residuals = Default::default();

    for j in 0..direction.number_constraints {
        trial.multipliers.constraints[j] = current_iterate.multipliers.constraints[j]
            + dual_step_length * direction.multipliers.constraints[j];
    }
    for i in 0..direction.number_variables {
        trial.multipliers.lower_bounds[i] = current_iterate.multipliers.lower_bounds[i]
            + bound_dual_step_length * direction.multipliers.lower_bounds[i];
        trial.multipliers.upper_bounds[i] = current_iterate.multipliers.upper_bounds[i]
            + bound_dual_step_length * direction.multipliers.upper_bounds[i];
    }

    if direction.norm > 0.0 {
        for i in 0..direction.number_variables {
            trial.primals[i] =
                current_iterate.primals[i] + primal_step_length * direction.primals[i];
        }
        trial.invalidate_evaluations();
    } else {
        // no primal step: nothing to re-evaluate, and the progress measures
        // must not look like progress
        trial.progress = ProgressMeasures::infinite();
    }
    trial
}

/// Tight/loose two-tolerance convergence policy: a loose success only counts
/// after enough consecutive loose-satisfying iterates.
pub struct ConvergenceChecker {
    tight_tolerance: f64,
    loose_tolerance: f64,
    consecutive_iteration_threshold: usize,
    consecutive_iterations: usize,
    unbounded_objective_threshold: f64,
}

impl ConvergenceChecker {
    pub fn new(options: &Options) -> Self {
        Self {
            tight_tolerance: options.tolerance,
            loose_tolerance: options.loose_tolerance,
            consecutive_iteration_threshold: options
                .loose_tolerance_consecutive_iteration_threshold,
            consecutive_iterations: 0,
            unbounded_objective_threshold: options.unbounded_objective_threshold,
        }
    }

    pub fn check(&mut self, iterate: &Iterate, number_variables: usize) -> TerminationStatus {
        let tight_status = compute_termination_status(
            iterate,
            number_variables,
            self.tight_tolerance,
            self.unbounded_objective_threshold,
        );
        if tight_status.is_terminal() || self.loose_tolerance <= self.tight_tolerance {
            return tight_status;
        }

        let loose_status = compute_termination_status(
            iterate,
            number_variables,
            self.loose_tolerance,
            self.unbounded_objective_threshold,
        );
        if loose_status.is_terminal() {
            self.consecutive_iterations += 1;
            if self.consecutive_iterations >= self.consecutive_iteration_threshold {
                return loose_status;
            }
        } else {
            self.consecutive_iterations = 0;
        }
        TerminationStatus::NotOptimal
    }
}

/// Small-step termination: a feasible point ends the solve as
/// `FeasibleSmallStep`; an infeasible point only ends it when the objective
/// multiplier is already zero (restoration cannot help further).
pub fn small_step_status(
    model: &dyn Model,
    trial_iterate: &mut Iterate,
    tight_tolerance: f64,
    progress_norm: crate::linalg::Norm,
) -> Result<Option<TerminationStatus>, crate::error::EvaluationError> {
    trial_iterate.evaluate_constraints(model)?;
    let infeasibility = crate::model::compute_constraint_violation(
        model,
        &trial_iterate.evaluations.constraints,
        progress_norm,
    );
    if infeasibility <= tight_tolerance {
        Ok(Some(TerminationStatus::FeasibleSmallStep))
    } else if trial_iterate.multipliers.objective == 0.0 {
        Ok(Some(TerminationStatus::InfeasibleSmallStep))
    } else {
        // infeasible but not yet stationary: the caller enters restoration
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iterate::Multipliers;

    fn direction_with(primals: Vec<f64>, constraints: Vec<f64>) -> Direction {
        let n = primals.len();
        let m = constraints.len();
        let mut direction = Direction::new(n, m);
        direction.primals = primals;
        direction.multipliers = Multipliers::new(n, m);
        direction.multipliers.constraints = constraints;
        direction.update_norm();
        direction
    }

    #[test]
    fn test_trial_assembly_with_step_lengths() {
        let mut current = Iterate::new(2, 2, 1);
        current.primals = vec![1.0, 2.0];
        current.multipliers.constraints[0] = 0.5;

        let mut direction = direction_with(vec![1.0, -1.0], vec![2.0]);
        direction.multipliers.lower_bounds[0] = 4.0;

        let trial = assemble_trial_iterate(&current, &direction, 0.5, 0.25, 1.0);
        assert_eq!(trial.primals, vec![1.5, 1.5]);
        assert_eq!(trial.multipliers.constraints[0], 1.0);
        // bound multipliers take the full step
        assert_eq!(trial.multipliers.lower_bounds[0], 4.0);
        assert!(!trial.is_objective_computed);
    }

    #[test]
    fn test_zero_direction_takes_dual_step_only() {
        let mut current = Iterate::new(1, 1, 1);
        current.primals[0] = 3.0;
        current.evaluations.objective = 9.0;
        current.is_objective_computed = true;

        let mut direction = direction_with(vec![0.0], vec![1.0]);
        direction.norm = 0.0;

        let trial = assemble_trial_iterate(&current, &direction, 1.0, 1.0, 1.0);
        assert_eq!(trial.primals[0], 3.0);
        assert_eq!(trial.multipliers.constraints[0], 1.0);
        // evaluations survive, progress is poisoned
        assert!(trial.is_objective_computed);
        assert!(trial.progress.infeasibility.is_infinite());
    }

    #[test]
    fn test_loose_tolerance_needs_consecutive_hits() {
        let options = Options {
            tolerance: 1e-10,
            loose_tolerance: 1e-2,
            loose_tolerance_consecutive_iteration_threshold: 2,
            ..Default::default()
        };
        let mut checker = ConvergenceChecker::new(&options);

        // an iterate satisfying only the loose tolerance
        let mut iterate = Iterate::new(1, 1, 0);
        iterate.residuals.optimality_stationarity = 1e-4;
        iterate.residuals.feasibility_stationarity = 1e-4;
        iterate.residuals.infeasibility = 0.0;
        iterate.residuals.optimality_complementarity = 0.0;
        iterate.residuals.feasibility_complementarity = 0.0;
        iterate.residuals.stationarity_scaling = 1.0;
        iterate.residuals.complementarity_scaling = 1.0;
        iterate.multipliers.objective = 1.0;

        assert_eq!(checker.check(&iterate, 1), TerminationStatus::NotOptimal);
        assert_eq!(
            checker.check(&iterate, 1),
            TerminationStatus::FeasibleKktPoint
        );
    }
}
