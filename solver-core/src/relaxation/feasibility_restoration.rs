//! Two-phase feasibility restoration.
//!
//! Phase 2 (optimality) solves subproblems of the original NLP; when the
//! subproblem is infeasible, or a rejected step shows an infeasibility stall
//! (switching condition failed while the infeasibility did not improve), the
//! layer switches to phase 1 (restoration): the l1-relaxed problem with
//! objective multiplier 0, whose optimality measure is the original
//! constraint violation. As soon as a restoration trial is admissible to the
//! optimality strategy, the layer switches back.

use super::ConstraintRelaxationStrategy;
use crate::direction::{Direction, SubproblemStatus};
use crate::error::{EvaluationError, SolverError, SolverResult};
use crate::iterate::{Iterate, OptimalityMeasure, ProgressMeasures};
use crate::linalg::sparse::sparse_dot;
use crate::linalg::Norm;
use crate::model::Model;
use crate::options::Options;
use crate::reform::{L1RelaxedProblem, OptimizationProblem, OriginalProblem};
use crate::statistics::{Statistics, INT_WIDTH};
use crate::strategy::{switching_condition, GlobalizationStrategy};
use crate::subproblem::{Subproblem, WarmstartInformation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    FeasibilityRestoration,
    Optimality,
}

impl Phase {
    fn statistic(self) -> usize {
        match self {
            Phase::FeasibilityRestoration => 1,
            Phase::Optimality => 2,
        }
    }
}

pub struct FeasibilityRestoration<'m> {
    optimality_problem: OriginalProblem<'m>,
    feasibility_problem: L1RelaxedProblem<'m>,
    subproblem: Box<dyn Subproblem>,
    optimality_strategy: Box<dyn GlobalizationStrategy>,
    restoration_strategy: Box<dyn GlobalizationStrategy>,
    phase: Phase,
    restoration_requested: bool,
    /// original violation at the last restoration entry; the phase is only
    /// left once the violation strictly improves on it
    restoration_entry_violation: f64,
    progress_norm: Norm,
    // stall diagnosis uses the same switching envelope as the strategies
    switching_fraction: f64,
    switching_infeasibility_exponent: f64,
    stall_fraction: f64,
    statistics_column_order: i32,
    verbose: bool,
    // scratch
    constraints: Vec<f64>,
    linearized: Vec<f64>,
}

impl<'m> FeasibilityRestoration<'m> {
    pub fn new(
        model: &'m dyn Model,
        subproblem: Box<dyn Subproblem>,
        optimality_strategy: Box<dyn GlobalizationStrategy>,
        restoration_strategy: Box<dyn GlobalizationStrategy>,
        options: &Options,
    ) -> Self {
        let m = model.number_constraints();
        Self {
            optimality_problem: OriginalProblem::new(model),
            feasibility_problem: L1RelaxedProblem::new(model, 0.0),
            subproblem,
            optimality_strategy,
            restoration_strategy,
            phase: Phase::Optimality,
            restoration_requested: false,
            restoration_entry_violation: f64::INFINITY,
            progress_norm: options.progress_norm,
            switching_fraction: options.funnel_delta,
            switching_infeasibility_exponent: options.funnel_switching_infeasibility_exponent,
            stall_fraction: options.funnel_beta,
            statistics_column_order: options.statistics_phase_column_order,
            verbose: options.verbose,
            constraints: Vec::with_capacity(m),
            linearized: vec![0.0; m],
        }
    }

    fn model(&self) -> &dyn Model {
        self.optimality_problem.model()
    }

    /// Original-model constraint violation at the iterate.
    fn original_violation(&self, iterate: &mut Iterate) -> Result<f64, EvaluationError> {
        iterate.evaluate_constraints(self.model())?;
        Ok(self
            .optimality_problem
            .compute_constraint_violation(&iterate.evaluations.constraints, self.progress_norm))
    }

    /// Violation of the linearized original constraints at step alpha d.
    fn linearized_violation(
        &mut self,
        iterate: &Iterate,
        direction: &Direction,
        step_length: f64,
    ) -> f64 {
        for (j, row) in iterate.evaluations.constraint_jacobian.iter().enumerate() {
            self.linearized[j] = iterate.evaluations.constraints[j]
                + step_length * sparse_dot(row, &direction.primals);
        }
        let m = self.optimality_problem.number_constraints();
        self.optimality_problem
            .compute_constraint_violation(&self.linearized[..m], self.progress_norm)
    }

    /// Violation of the linearized relaxed constraints (elastics included).
    fn linearized_relaxed_violation(
        &mut self,
        iterate: &Iterate,
        direction: &Direction,
        step_length: f64,
    ) -> f64 {
        for (j, row) in iterate.evaluations.constraint_jacobian.iter().enumerate() {
            let upper_elastic = self.feasibility_problem.upper_elastic_index(j);
            let lower_elastic = self.feasibility_problem.lower_elastic_index(j);
            let elastic_part = -(iterate.primals[upper_elastic]
                + step_length * direction.primals[upper_elastic])
                + (iterate.primals[lower_elastic]
                    + step_length * direction.primals[lower_elastic]);
            self.linearized[j] = iterate.evaluations.constraints[j]
                + step_length * sparse_dot(row, &direction.primals)
                + elastic_part;
        }
        let m = self.feasibility_problem.number_constraints();
        self.feasibility_problem
            .compute_constraint_violation(&self.linearized[..m], self.progress_norm)
    }

    /// Progress measures of an iterate under the optimality phase.
    fn set_optimality_progress(&mut self, iterate: &mut Iterate) -> Result<(), EvaluationError> {
        let infeasibility = self.original_violation(iterate)?;
        let objective = self.optimality_problem.evaluate_objective(iterate)?;
        self.subproblem
            .set_auxiliary_measure(&self.optimality_problem, iterate);
        iterate.progress.infeasibility = infeasibility;
        iterate.progress.optimality = OptimalityMeasure::Objective(objective);
        Ok(())
    }

    /// Progress measures of an iterate under the restoration phase: the
    /// optimality measure carries the original violation.
    fn set_restoration_progress(&mut self, iterate: &mut Iterate) -> Result<(), EvaluationError> {
        let original_violation = self.original_violation(iterate)?;
        self.feasibility_problem
            .evaluate_constraints(iterate, &mut self.constraints)?;
        let relaxed_violation = self
            .feasibility_problem
            .compute_constraint_violation(&self.constraints, self.progress_norm);
        self.subproblem
            .set_auxiliary_measure(&self.feasibility_problem, iterate);
        iterate.progress.infeasibility = relaxed_violation;
        iterate.progress.optimality = OptimalityMeasure::Violation(original_violation);
        Ok(())
    }

    fn predicted_reduction(
        &mut self,
        current_iterate: &mut Iterate,
        direction: &Direction,
        step_length: f64,
    ) -> ProgressMeasures {
        match self.phase {
            Phase::Optimality => {
                let current_infeasibility = current_iterate.progress.infeasibility;
                let linearized =
                    self.linearized_violation(current_iterate, direction, step_length);
                ProgressMeasures {
                    infeasibility: current_infeasibility - linearized,
                    optimality: self.subproblem.predicted_objective_reduction(
                        current_iterate,
                        direction,
                        step_length,
                    ),
                    auxiliary: self.subproblem.predicted_auxiliary_reduction(
                        &self.optimality_problem,
                        current_iterate,
                        direction,
                        step_length,
                    ),
                }
            }
            Phase::FeasibilityRestoration => {
                let current_relaxed = current_iterate.progress.infeasibility;
                let linearized_relaxed =
                    self.linearized_relaxed_violation(current_iterate, direction, step_length);
                let current_original =
                    current_iterate.progress.optimality.evaluate(0.0);
                let linearized_original =
                    self.linearized_violation(current_iterate, direction, step_length);
                ProgressMeasures {
                    infeasibility: current_relaxed - linearized_relaxed,
                    optimality: OptimalityMeasure::Violation(
                        current_original - linearized_original,
                    ),
                    auxiliary: self.subproblem.predicted_auxiliary_reduction(
                        &self.feasibility_problem,
                        current_iterate,
                        direction,
                        step_length,
                    ),
                }
            }
        }
    }

    fn switch_back_to_optimality(
        &mut self,
        statistics: &mut Statistics,
        trial_iterate: &mut Iterate,
    ) -> Result<(), EvaluationError> {
        if self.verbose {
            eprintln!("restoration finished: switching back to the optimality phase");
        }
        self.phase = Phase::Optimality;
        self.subproblem
            .exit_feasibility_problem(&self.optimality_problem, trial_iterate);
        trial_iterate.set_number_variables(self.optimality_problem.number_variables());
        trial_iterate.multipliers.objective = 1.0;
        self.set_optimality_progress(trial_iterate)?;
        self.optimality_strategy
            .register_current_progress(&trial_iterate.progress);
        statistics.set("phase", self.phase.statistic());
        Ok(())
    }
}

impl ConstraintRelaxationStrategy for FeasibilityRestoration<'_> {
    fn initialize(
        &mut self,
        statistics: &mut Statistics,
        iterate: &mut Iterate,
    ) -> SolverResult<()> {
        statistics.add_column("phase", INT_WIDTH, self.statistics_column_order);
        self.subproblem
            .initialize(statistics, &self.optimality_problem, iterate)?;
        self.set_optimality_progress(iterate)?;
        self.optimality_strategy.initialize(statistics, &iterate.progress);
        self.restoration_strategy.initialize(statistics, &iterate.progress);
        self.compute_primal_dual_residuals(iterate)?;
        Ok(())
    }

    fn compute_feasible_direction(
        &mut self,
        statistics: &mut Statistics,
        current_iterate: &mut Iterate,
        warmstart: &WarmstartInformation,
    ) -> SolverResult<Direction> {
        statistics.set("phase", self.phase.statistic());
        match self.phase {
            Phase::Optimality => {
                let direction = self.subproblem.solve(
                    statistics,
                    &self.optimality_problem,
                    current_iterate,
                    warmstart,
                )?;
                match direction.status {
                    SubproblemStatus::Infeasible => {
                        // the linearization admits no feasible step: restore
                        self.switch_to_feasibility_problem(statistics, current_iterate)
                    }
                    SubproblemStatus::Error => Err(SolverError::Subproblem(
                        "the subproblem solver failed at the current iterate".to_string(),
                    )),
                    _ => Ok(direction),
                }
            }
            Phase::FeasibilityRestoration => {
                let direction = self.subproblem.solve(
                    statistics,
                    &self.feasibility_problem,
                    current_iterate,
                    warmstart,
                )?;
                if direction.status == SubproblemStatus::Error {
                    return Err(SolverError::Subproblem(
                        "the restoration subproblem failed".to_string(),
                    ));
                }
                Ok(direction)
            }
        }
    }

    fn is_iterate_acceptable(
        &mut self,
        statistics: &mut Statistics,
        current_iterate: &mut Iterate,
        trial_iterate: &mut Iterate,
        direction: &Direction,
        step_length: f64,
    ) -> Result<bool, EvaluationError> {
        self.restoration_requested = false;
        match self.phase {
            Phase::Optimality => self.set_optimality_progress(trial_iterate)?,
            Phase::FeasibilityRestoration => self.set_restoration_progress(trial_iterate)?,
        }
        let predicted = self.predicted_reduction(current_iterate, direction, step_length);

        let strategy = match self.phase {
            Phase::Optimality => &mut self.optimality_strategy,
            Phase::FeasibilityRestoration => &mut self.restoration_strategy,
        };
        let accepted = strategy.is_iterate_acceptable(
            statistics,
            &current_iterate.progress,
            &trial_iterate.progress,
            &predicted,
            direction.objective_multiplier,
        );

        match self.phase {
            Phase::Optimality => {
                if !accepted {
                    // infeasibility stall: no useful optimality reduction and
                    // the violation is not improving either
                    let unconstrained_predicted = predicted.optimality.evaluate(1.0)
                        + predicted.auxiliary;
                    let stalled = !switching_condition(
                        unconstrained_predicted,
                        current_iterate.progress.infeasibility,
                        self.switching_fraction,
                        self.switching_infeasibility_exponent,
                    ) && trial_iterate.progress.infeasibility
                        >= self.stall_fraction * current_iterate.progress.infeasibility
                        && current_iterate.progress.infeasibility > 0.0;
                    if stalled {
                        self.restoration_requested = true;
                    }
                }
            }
            Phase::FeasibilityRestoration => {
                if accepted {
                    let trial_original_violation =
                        trial_iterate.progress.optimality.evaluate(0.0);
                    // leave restoration only on strict improvement over the
                    // entry violation; otherwise an infeasible problem would
                    // bounce between the phases without converging
                    if trial_original_violation
                        < self.stall_fraction * self.restoration_entry_violation
                        && self
                            .optimality_strategy
                            .is_infeasibility_acceptable(trial_original_violation)
                    {
                        self.switch_back_to_optimality(statistics, trial_iterate)?;
                    }
                }
            }
        }
        Ok(accepted)
    }

    fn switch_to_feasibility_problem(
        &mut self,
        statistics: &mut Statistics,
        current_iterate: &mut Iterate,
    ) -> SolverResult<Direction> {
        if self.phase == Phase::FeasibilityRestoration {
            return Err(SolverError::Subproblem(
                "cannot restore feasibility: already in the restoration phase".to_string(),
            ));
        }
        if self.verbose {
            eprintln!("switching to the feasibility restoration phase");
        }
        self.phase = Phase::FeasibilityRestoration;
        self.restoration_requested = false;
        statistics.set("phase", self.phase.statistic());

        self.feasibility_problem.set_objective_multiplier(0.0);
        current_iterate.set_number_variables(self.feasibility_problem.number_variables());
        current_iterate.multipliers.objective = 0.0;
        self.subproblem
            .initialize_feasibility_problem(&self.feasibility_problem, current_iterate);
        self.subproblem
            .set_elastic_variable_values(&self.feasibility_problem, current_iterate);
        let n = self.feasibility_problem.number_variables();
        {
            let point = current_iterate.primals[..n].to_vec();
            self.subproblem.set_initial_point(&point);
        }

        self.set_restoration_progress(current_iterate)?;
        self.restoration_entry_violation = current_iterate.progress.optimality.evaluate(0.0);
        self.restoration_strategy
            .register_current_progress(&current_iterate.progress);

        self.subproblem.solve(
            statistics,
            &self.feasibility_problem,
            current_iterate,
            &WarmstartInformation::whole_problem_changed(),
        )
    }

    fn take_restoration_request(&mut self) -> bool {
        std::mem::take(&mut self.restoration_requested)
    }

    fn solving_feasibility_problem(&self) -> bool {
        self.phase == Phase::FeasibilityRestoration
    }

    fn compute_primal_dual_residuals(
        &self,
        iterate: &mut Iterate,
    ) -> Result<(), EvaluationError> {
        crate::residuals::compute_primal_dual_residuals(
            &self.optimality_problem,
            iterate,
            self.progress_norm,
        )
    }

    fn postprocess_accepted_iterate(&mut self, iterate: &mut Iterate) {
        match self.phase {
            Phase::Optimality => self
                .subproblem
                .postprocess_accepted_iterate(&self.optimality_problem, iterate),
            Phase::FeasibilityRestoration => self
                .subproblem
                .postprocess_accepted_iterate(&self.feasibility_problem, iterate),
        }
    }

    fn set_trust_region_radius(&mut self, radius: f64) {
        self.subproblem.set_trust_region_radius(radius);
    }

    fn is_small_direction(&self, iterate: &Iterate, direction: &Direction) -> bool {
        match self.phase {
            Phase::Optimality => {
                self.subproblem
                    .is_small_direction(&self.optimality_problem, iterate, direction)
            }
            Phase::FeasibilityRestoration => {
                self.subproblem
                    .is_small_direction(&self.feasibility_problem, iterate, direction)
            }
        }
    }

    fn hessian_evaluation_count(&self) -> usize {
        self.subproblem.hessian_evaluation_count()
    }

    fn number_subproblems_solved(&self) -> usize {
        self.subproblem.number_subproblems_solved()
    }
}
