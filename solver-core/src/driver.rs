//! The outer loop: iterate until a terminal status, the iteration budget or
//! the wall clock runs out.

use std::time::Instant;

use crate::error::SolverResult;
use crate::iterate::Iterate;
use crate::mechanism::GlobalizationMechanism;
use crate::model::Model;
use crate::options::Options;
use crate::residuals::TerminationStatus;
use crate::statistics::{Statistics, DOUBLE_WIDTH, INT_WIDTH};

/// Outcome of a solve.
#[derive(Debug)]
pub struct SolveReport {
    pub iterate: Iterate,
    pub status: TerminationStatus,
    pub number_variables: usize,
    pub number_constraints: usize,
    pub iterations: usize,
    pub solve_time_seconds: f64,
    pub objective_evaluations: usize,
    pub constraint_evaluations: usize,
    pub objective_gradient_evaluations: usize,
    pub jacobian_evaluations: usize,
    pub hessian_evaluations: usize,
    pub subproblems_solved: usize,
}

pub struct Driver<'m> {
    mechanism: Box<dyn GlobalizationMechanism + 'm>,
    max_iterations: usize,
    time_limit: f64,
    verbose: bool,
    statistics_iteration_column_order: i32,
    statistics_objective_column_order: i32,
    statistics_infeasibility_column_order: i32,
}

impl<'m> Driver<'m> {
    pub fn new(mechanism: Box<dyn GlobalizationMechanism + 'm>, options: &Options) -> Self {
        Self {
            mechanism,
            max_iterations: options.max_iterations,
            time_limit: options.time_limit,
            verbose: options.verbose,
            statistics_iteration_column_order: options.statistics_iteration_column_order,
            statistics_objective_column_order: options.statistics_objective_column_order,
            statistics_infeasibility_column_order: options.statistics_infeasibility_column_order,
        }
    }

    fn add_statistics(statistics: &mut Statistics, iterate: &Iterate, iteration: usize) {
        statistics.set("iters", iteration);
        if iterate.is_objective_computed {
            statistics.set("objective", iterate.evaluations.objective);
        } else {
            statistics.set("objective", "-");
        }
        if iterate.residuals.infeasibility.is_finite() {
            statistics.set("infeasibility", iterate.residuals.infeasibility);
        }
    }

    fn termination_criteria(&self, status: TerminationStatus, iteration: usize, elapsed: f64) -> bool {
        status.is_terminal() || iteration >= self.max_iterations || elapsed >= self.time_limit
    }

    /// Run the outer loop from `current_iterate`.
    pub fn solve(
        &mut self,
        statistics: &mut Statistics,
        model: &dyn Model,
        mut current_iterate: Iterate,
    ) -> SolverResult<(Iterate, usize, f64)> {
        statistics.add_column("iters", INT_WIDTH, self.statistics_iteration_column_order);
        statistics.add_column("objective", DOUBLE_WIDTH, self.statistics_objective_column_order);
        statistics.add_column(
            "infeasibility",
            DOUBLE_WIDTH,
            self.statistics_infeasibility_column_order,
        );

        let timer = Instant::now();
        if self.verbose {
            println!("\nProblem {}", model.name());
            println!(
                "{} variables, {} constraints\n",
                model.number_variables(),
                model.number_constraints()
            );
        }

        self.mechanism.initialize(statistics, &mut current_iterate)?;

        let mut major_iterations = 0;
        loop {
            statistics.new_line();
            major_iterations += 1;

            current_iterate =
                self.mechanism
                    .compute_next_iterate(statistics, model, &mut current_iterate)?;

            Self::add_statistics(statistics, &current_iterate, major_iterations);
            if self.verbose {
                statistics.print_current_line();
            }
            statistics.add_iteration();

            let elapsed = timer.elapsed().as_secs_f64();
            if self.termination_criteria(current_iterate.status, major_iterations, elapsed) {
                break;
            }
        }
        if self.verbose {
            statistics.print_footer();
            println!("\nTermination: {}", current_iterate.status);
        }

        // ensure the objective is available for the report, then let the
        // model undo its scaling
        let status = current_iterate.status;
        let _ = current_iterate.evaluate_objective(model);
        model.postprocess_solution(&mut current_iterate, status);

        Ok((current_iterate, major_iterations, timer.elapsed().as_secs_f64()))
    }

    pub fn hessian_evaluation_count(&self) -> usize {
        self.mechanism.hessian_evaluation_count()
    }

    pub fn number_subproblems_solved(&self) -> usize {
        self.mechanism.number_subproblems_solved()
    }
}
