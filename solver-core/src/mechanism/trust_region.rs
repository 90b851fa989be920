//! Trust-region mechanism.
//!
//! Full steps within a radius: accepted steps may enlarge the radius when
//! the achieved-to-predicted ratio is good, rejected steps contract it onto
//! the observed step norm. Variables whose trust-region face (not a true
//! bound) is active get their bound multipliers cleared on acceptance, since
//! those duals belong to the mechanism, not the problem.

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
use crate::strategy::unconstrained_measure;
use crate::subproblem::WarmstartInformation;

pub struct TrustRegionMechanism<'m> {
    relaxation: Box<dyn ConstraintRelaxationStrategy + 'm>,
    radius: f64,
    minimum_radius: f64,
    maximum_radius: f64,
    contraction_factor: f64,
    expansion_factor: f64,
    good_ratio_threshold: f64,
    activity_tolerance: f64,
    tight_tolerance: f64,
    progress_norm: Norm,
    convergence: ConvergenceChecker,
    statistics_column_order: i32,
}

impl<'m> TrustRegionMechanism<'m> {
    pub fn new(
        relaxation: Box<dyn ConstraintRelaxationStrategy + 'm>,
        options: &Options,
    ) -> Self {
        Self {
            relaxation,
            radius: options.trust_region_initial_radius,
            minimum_radius: options.trust_region_minimum_radius,
            maximum_radius: options.trust_region_maximum_radius,
            contraction_factor: options.trust_region_contraction_factor,
            expansion_factor: options.trust_region_expansion_factor,
            good_ratio_threshold: options.trust_region_good_ratio_threshold,
            activity_tolerance: options.trust_region_activity_tolerance,
            tight_tolerance: options.tolerance,
            progress_norm: options.progress_norm,
            convergence: ConvergenceChecker::new(options),
            statistics_column_order: options.statistics_mechanism_column_order,
        }
    }

    /// Multipliers attached to an active trust-region face are artifacts of
    /// the subproblem; clear them unless the face coincides with a variable
    /// bound that is itself active.
    fn reset_active_trust_region_multipliers(
        &self,
        model: &dyn Model,
        direction: &Direction,
        trial_iterate: &mut Iterate,
    ) {
        let n = model.number_variables().min(direction.number_variables);
        for i in 0..n {
            if (direction.primals[i].abs() - self.radius).abs() <= self.activity_tolerance {
                let at_lower = (trial_iterate.primals[i] - model.variable_lower_bound(i)).abs()
                    <= self.activity_tolerance;
                let at_upper = (model.variable_upper_bound(i) - trial_iterate.primals[i]).abs()
                    <= self.activity_tolerance;
                if !at_lower {
                    trial_iterate.multipliers.lower_bounds[i] = 0.0;
                }
                if !at_upper {
                    trial_iterate.multipliers.upper_bounds[i] = 0.0;
                }
            }
        }
    }

    /// Achieved-over-predicted decrease of the unconstrained measure.
    fn reduction_ratio(current_iterate: &Iterate, trial_iterate: &Iterate, direction: &Direction) -> f64 {
        let predicted = -direction.subproblem_objective;
        if predicted <= 0.0 {
            return 0.0;
        }
        let actual = unconstrained_measure(&current_iterate.progress)
            - unconstrained_measure(&trial_iterate.progress);
        actual / predicted
    }
}

impl GlobalizationMechanism for TrustRegionMechanism<'_> {
    fn initialize(
        &mut self,
        statistics: &mut Statistics,
        current_iterate: &mut Iterate,
    ) -> SolverResult<()> {
        statistics.add_column("TR radius", DOUBLE_WIDTH, self.statistics_column_order);
        self.relaxation.initialize(statistics, current_iterate)
    }

    fn compute_next_iterate(
        &mut self,
        statistics: &mut Statistics,
        model: &dyn Model,
        current_iterate: &mut Iterate,
    ) -> SolverResult<Iterate> {
        let mut first_attempt = true;
        loop {
            statistics.set("TR radius", self.radius);
            self.relaxation.set_trust_region_radius(self.radius);
            let warmstart = if first_attempt {
                WarmstartInformation::whole_problem_changed()
            } else {
                // same point, tighter radius: only the displacement bounds moved
                WarmstartInformation::only_variable_bounds_changed()
            };
            first_attempt = false;

            let direction: Direction = self.relaxation.compute_feasible_direction(
                statistics,
                current_iterate,
                &warmstart,
            )?;

            if direction.norm == 0.0
                || self.relaxation.is_small_direction(current_iterate, &direction)
            {
                let mut trial = assemble_trial_iterate(current_iterate, &direction, 1.0, 1.0, 1.0);
                match small_step_status(model, &mut trial, self.tight_tolerance, self.progress_norm)?
                {
                    Some(status) => {
                        let _ = self.relaxation.compute_primal_dual_residuals(&mut trial);
                        let residual_status = self.convergence.check(&trial, trial.number_variables);
                        trial.status = if residual_status.is_terminal() {
                            residual_status
                        } else {
                            status
                        };
                        return Ok(trial);
                    }
                    None => {
                        let _ = self
                            .relaxation
                            .switch_to_feasibility_problem(statistics, current_iterate)?;
                        continue;
                    }
                }
            }

            let mut trial = assemble_trial_iterate(current_iterate, &direction, 1.0, 1.0, 1.0);
            match self.relaxation.is_iterate_acceptable(
                statistics,
                current_iterate,
                &mut trial,
                &direction,
                1.0,
            ) {
                Ok(true) => {
                    self.reset_active_trust_region_multipliers(model, &direction, &mut trial);
                    self.relaxation.postprocess_accepted_iterate(&mut trial);
                    self.relaxation.compute_primal_dual_residuals(&mut trial)?;
                    let ratio = Self::reduction_ratio(current_iterate, &trial, &direction);
                    if ratio >= self.good_ratio_threshold {
                        self.radius = (self.expansion_factor * self.radius).min(self.maximum_radius);
                    }
                    trial.status = self.convergence.check(&trial, trial.number_variables);
                    return Ok(trial);
                }
                rejected => {
                    if let Err(error @ EvaluationError::Gradient) = rejected {
                        return Err(error.into());
                    }
                    // rejection or function fault at the trial point
                    if self.relaxation.take_restoration_request()
                        && !self.relaxation.solving_feasibility_problem()
                    {
                        let _ = self
                            .relaxation
                            .switch_to_feasibility_problem(statistics, current_iterate)?;
                        continue;
                    }

                    let contracted =
                        (self.contraction_factor * direction.norm).max(self.minimum_radius);
                    if contracted >= self.radius && self.radius <= self.minimum_radius {
                        // the radius cannot shrink further: small-step rule
                        let mut stalled =
                            assemble_trial_iterate(current_iterate, &direction, 1.0, 1.0, 1.0);
                        match small_step_status(
                            model,
                            &mut stalled,
                            self.tight_tolerance,
                            self.progress_norm,
                        )? {
                            Some(status) => {
                                let _ =
                                    self.relaxation.compute_primal_dual_residuals(&mut stalled);
                                stalled.status = status;
                                return Ok(stalled);
                            }
                            None => {
                                if self.relaxation.solving_feasibility_problem() {
                                    stalled.status = TerminationStatus::InfeasibleSmallStep;
                                    return Ok(stalled);
                                }
                                let _ = self
                                    .relaxation
                                    .switch_to_feasibility_problem(statistics, current_iterate)?;
                                continue;
                            }
                        }
                    }
                    self.radius = contracted.min(self.radius * self.contraction_factor);
                    self.radius = self.radius.max(self.minimum_radius);
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
