//! Backtracking line search.
//!
//! The primal variables and constraint multipliers share the backtracked
//! step length alpha; the bound multipliers always take the full
//! fraction-to-boundary dual step. Evaluation errors at a trial point are
//! treated like rejections (the step contracts). When alpha underflows, the
//! small-step rule decides between termination and a restoration switch.

use super::{
    assemble_trial_iterate, small_step_status, ConvergenceChecker, GlobalizationMechanism,
};
use crate::direction::Direction;
use crate::error::{EvaluationError, SolverResult};
use crate::iterate::Iterate;
use crate::linalg::Norm;
use crate::model::Model;
use crate::options::Options;
use crate::relaxation::ConstraintRelaxationStrategy;
use crate::residuals::TerminationStatus;
use crate::statistics::{Statistics, DOUBLE_WIDTH};
use crate::subproblem::WarmstartInformation;

pub struct BacktrackingLineSearch<'m> {
    relaxation: Box<dyn ConstraintRelaxationStrategy + 'm>,
    backtracking_ratio: f64,
    minimum_step_length: f64,
    tight_tolerance: f64,
    progress_norm: Norm,
    convergence: ConvergenceChecker,
    statistics_column_order: i32,
}

impl<'m> BacktrackingLineSearch<'m> {
    pub fn new(
        relaxation: Box<dyn ConstraintRelaxationStrategy + 'm>,
        options: &Options,
    ) -> Self {
        Self {
            relaxation,
            backtracking_ratio: options.line_search_backtracking_ratio,
            minimum_step_length: options.line_search_minimum_step_length,
            tight_tolerance: options.tolerance,
            progress_norm: options.progress_norm,
            convergence: ConvergenceChecker::new(options),
            statistics_column_order: options.statistics_mechanism_column_order,
        }
    }

    /// Commit an accepted trial: dual safeguards, residuals, convergence.
    fn commit(
        &mut self,
        statistics: &mut Statistics,
        mut trial_iterate: Iterate,
    ) -> SolverResult<Iterate> {
        self.relaxation.postprocess_accepted_iterate(&mut trial_iterate);
        self.relaxation.compute_primal_dual_residuals(&mut trial_iterate)?;
        trial_iterate.status = self
            .convergence
            .check(&trial_iterate, trial_iterate.number_variables);
        Ok(trial_iterate)
    }

    /// Converged-in-step-space endgame: terminate if the rule allows,
    /// otherwise hand back None so the caller restores feasibility. A
    /// residual-based status takes precedence over the small-step one.
    fn try_terminate_small_step(
        &mut self,
        model: &dyn Model,
        mut trial_iterate: Iterate,
    ) -> SolverResult<Option<Iterate>> {
        match small_step_status(
            model,
            &mut trial_iterate,
            self.tight_tolerance,
            self.progress_norm,
        )? {
            Some(status) => {
                let _ = self.relaxation.compute_primal_dual_residuals(&mut trial_iterate);
                let residual_status = self
                    .convergence
                    .check(&trial_iterate, trial_iterate.number_variables);
                trial_iterate.status = if residual_status.is_terminal() {
                    residual_status
                } else {
                    status
                };
                Ok(Some(trial_iterate))
            }
            None => Ok(None),
        }
    }
}

impl GlobalizationMechanism for BacktrackingLineSearch<'_> {
    fn initialize(
        &mut self,
        statistics: &mut Statistics,
        current_iterate: &mut Iterate,
    ) -> SolverResult<()> {
        statistics.add_column("step length", DOUBLE_WIDTH, self.statistics_column_order);
        self.relaxation.initialize(statistics, current_iterate)
    }

    fn compute_next_iterate(
        &mut self,
        statistics: &mut Statistics,
        model: &dyn Model,
        current_iterate: &mut Iterate,
    ) -> SolverResult<Iterate> {
        let mut direction: Direction = self.relaxation.compute_feasible_direction(
            statistics,
            current_iterate,
            &WarmstartInformation::whole_problem_changed(),
        )?;

        loop {
            // a vanishing or negligible primal direction cannot be improved
            // by backtracking: apply the small-step rule directly
            if direction.norm == 0.0
                || self.relaxation.is_small_direction(current_iterate, &direction)
            {
                let trial = assemble_trial_iterate(current_iterate, &direction, 1.0, 1.0, 1.0);
                match self.try_terminate_small_step(model, trial)? {
                    Some(terminated) => return Ok(terminated),
                    None => {
                        direction = self
                            .relaxation
                            .switch_to_feasibility_problem(statistics, current_iterate)?;
                        continue;
                    }
                }
            }

            let mut step_length = 1.0;
            while step_length >= self.minimum_step_length {
                let mut trial =
                    assemble_trial_iterate(current_iterate, &direction, step_length, step_length, 1.0);
                match self.relaxation.is_iterate_acceptable(
                    statistics,
                    current_iterate,
                    &mut trial,
                    &direction,
                    step_length,
                ) {
                    Ok(true) => {
                        statistics.set("step length", step_length);
                        return self.commit(statistics, trial);
                    }
                    Ok(false) => {
                        if self.relaxation.take_restoration_request()
                            && !self.relaxation.solving_feasibility_problem()
                        {
                            direction = self
                                .relaxation
                                .switch_to_feasibility_problem(statistics, current_iterate)?;
                            step_length = 1.0;
                            continue;
                        }
                        step_length *= self.backtracking_ratio;
                    }
                    // a fault at the trial point: contract like a rejection
                    Err(EvaluationError::Function) => step_length *= self.backtracking_ratio,
                    Err(error @ EvaluationError::Gradient) => return Err(error.into()),
                }
            }

            // the step length underflowed
            let trial = assemble_trial_iterate(
                current_iterate,
                &direction,
                self.minimum_step_length,
                self.minimum_step_length,
                1.0,
            );
            match self.try_terminate_small_step(model, trial)? {
                Some(terminated) => return Ok(terminated),
                None => {
                    if self.relaxation.solving_feasibility_problem() {
                        // cannot shrink further and cannot restore deeper
                        let mut stalled = assemble_trial_iterate(
                            current_iterate,
                            &direction,
                            self.minimum_step_length,
                            self.minimum_step_length,
                            1.0,
                        );
                        let _ = self.relaxation.compute_primal_dual_residuals(&mut stalled);
                        let residual_status =
                            self.convergence.check(&stalled, stalled.number_variables);
                        stalled.status = if residual_status.is_terminal() {
                            residual_status
                        } else {
                            TerminationStatus::InfeasibleSmallStep
                        };
                        return Ok(stalled);
                    }
                    direction = self
                        .relaxation
                        .switch_to_feasibility_problem(statistics, current_iterate)?;
                }
            }
        }
    }

    fn hessian_evaluation_count(&self) -> usize {
        self.relaxation.hessian_evaluation_count()
    }

    fn number_subproblems_solved(&self) -> usize {
        self.relaxation.number_subproblems_solved()
    }
}
