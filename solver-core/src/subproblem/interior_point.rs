//! Primal-dual interior-point (barrier) subproblem.
//!
//! At an interior iterate, the barrier Newton system
//!
//! ```text
//! [ H + Sigma + delta_w I   J^T       ] [  dx ]   [ -grad_x L_mu ]
//! [ J                      -delta_c I ] [ -dl ] = [ -c(x)        ]
//! ```
//!
//! is factorized with inertia correction; the bound-multiplier directions
//! follow in closed form and the fraction-to-boundary rule keeps both the
//! primals and the bound duals strictly interior. The barrier parameter is
//! driven to zero between solves (see [`super::barrier`]).
//!
//! The problem must be equality-constrained: inequality ranges are expected
//! to arrive through the slack reformulation of the model.

use crate::direction::{Direction, SubproblemStatus};
use crate::error::SolverResult;
use crate::iterate::{Iterate, OptimalityMeasure};
use crate::linalg::augmented_system::{AugmentedSystem, RegularizationParameters};
use crate::linalg::norm::{norm_1, norm_inf};
use crate::linalg::sparse::{scatter, sparse_dot, JacobianRows, SparseSymmetric, SparseVector};
use crate::linalg::Norm;
use crate::options::Options;
use crate::reform::{L1RelaxedProblem, OptimizationProblem};
use crate::statistics::{Statistics, DOUBLE_WIDTH};
use crate::subproblem::barrier::{
    compute_shifted_complementarity_error, BarrierErrorComponents, BarrierParameterUpdate,
    BarrierParameters,
};
use crate::subproblem::{Subproblem, WarmstartInformation};

// residual scaling reference shared with the convergence machinery
const SCALING_THRESHOLD: f64 = 100.0;

#[derive(Debug, Clone, Copy)]
struct InteriorPointParameters {
    tau_min: f64,
    k_sigma: f64,
    regularization_exponent: f64,
    small_direction_factor: f64,
    push_interior_k1: f64,
    push_interior_k2: f64,
    damping_factor: f64,
}

pub struct InteriorPointSubproblem {
    augmented_system: AugmentedSystem,
    hessian: SparseSymmetric,
    hessian_evaluation_count: usize,
    barrier: BarrierParameterUpdate,
    previous_barrier_parameter: f64,
    default_multiplier: f64,
    parameters: InteriorPointParameters,
    bound_relaxation_factors: Vec<f64>,
    lower_delta_z: Vec<f64>,
    upper_delta_z: Vec<f64>,
    solving_feasibility_problem: bool,

    // problem-level evaluation scratch
    objective_gradient: SparseVector,
    barrier_gradient: Vec<f64>,
    constraints: Vec<f64>,
    constraint_jacobian: JacobianRows,

    direction: Direction,
    progress_norm: Norm,
    statistics_column_order: i32,
    least_square_multiplier_max_norm: f64,
    number_subproblems_solved: usize,
    verbose: bool,
}

impl InteriorPointSubproblem {
    pub fn new(
        capacity_variables: usize,
        capacity_constraints: usize,
        hessian_capacity: usize,
        options: &Options,
    ) -> Self {
        let kkt_capacity = capacity_variables + capacity_constraints;
        Self {
            augmented_system: AugmentedSystem::new(
                kkt_capacity,
                hessian_capacity + kkt_capacity,
                RegularizationParameters {
                    initial_value: options.regularization_initial_value,
                    increase_factor: options.regularization_increase_factor,
                    ..Default::default()
                },
            ),
            hessian: SparseSymmetric::new(capacity_variables, hessian_capacity + capacity_variables),
            hessian_evaluation_count: 0,
            barrier: BarrierParameterUpdate::new(
                options.barrier_initial_parameter,
                options.tolerance,
                BarrierParameters {
                    k_mu: options.barrier_k_mu,
                    theta_mu: options.barrier_theta_mu,
                    k_epsilon: options.barrier_k_epsilon,
                    update_fraction: options.barrier_update_fraction,
                },
            ),
            previous_barrier_parameter: options.barrier_initial_parameter,
            default_multiplier: options.barrier_default_multiplier,
            parameters: InteriorPointParameters {
                tau_min: options.barrier_tau_min,
                k_sigma: options.barrier_k_sigma,
                regularization_exponent: options.barrier_regularization_exponent,
                small_direction_factor: options.barrier_small_direction_factor,
                push_interior_k1: options.barrier_push_variable_to_interior_k1,
                push_interior_k2: options.barrier_push_variable_to_interior_k2,
                damping_factor: options.barrier_damping_factor,
            },
            bound_relaxation_factors: vec![0.0; capacity_variables],
            lower_delta_z: vec![0.0; capacity_variables],
            upper_delta_z: vec![0.0; capacity_variables],
            solving_feasibility_problem: false,
            objective_gradient: SparseVector::empty(capacity_variables),
            barrier_gradient: vec![0.0; capacity_variables],
            constraints: Vec::with_capacity(capacity_constraints),
            constraint_jacobian: Vec::with_capacity(capacity_constraints),
            direction: Direction::new(capacity_variables, capacity_constraints),
            progress_norm: options.progress_norm,
            statistics_column_order: options.statistics_barrier_parameter_column_order,
            least_square_multiplier_max_norm: options.least_square_multiplier_max_norm,
            number_subproblems_solved: 0,
            verbose: options.verbose,
        }
    }

    pub fn barrier_parameter(&self) -> f64 {
        self.barrier.barrier_parameter()
    }

    /// Project a variable strictly inside its bounds, staying a fraction of
    /// the bound magnitude (and of the range) away from each side.
    fn push_variable_to_interior(&self, value: f64, lower: f64, upper: f64) -> f64 {
        let range = upper - lower;
        let mut pushed = value;
        if lower.is_finite() {
            let perturbation = (self.parameters.push_interior_k1 * lower.abs().max(1.0))
                .min(self.parameters.push_interior_k2 * range);
            pushed = pushed.max(lower + perturbation);
        }
        if upper.is_finite() {
            let perturbation = (self.parameters.push_interior_k1 * upper.abs().max(1.0))
                .min(self.parameters.push_interior_k2 * range);
            pushed = pushed.min(upper - perturbation);
        }
        pushed
    }

    fn relaxed_lower_bound(&self, problem: &dyn OptimizationProblem, i: usize) -> f64 {
        problem.relaxed_variable_lower_bound(i, self.bound_relaxation_factors[i])
    }

    fn relaxed_upper_bound(&self, problem: &dyn OptimizationProblem, i: usize) -> f64 {
        problem.relaxed_variable_upper_bound(i, self.bound_relaxation_factors[i])
    }

    /// Relax a bound when the iterate is within machine precision of it
    /// (section 3.5 of the Ipopt paper).
    fn relax_variable_bounds(&mut self, problem: &dyn OptimizationProblem, iterate: &Iterate) {
        let machine_epsilon = f64::EPSILON;
        let factor = machine_epsilon.powf(0.75);
        let mu = self.barrier_parameter();
        for &i in problem.lower_bounded_variables() {
            if iterate.primals[i] - self.relaxed_lower_bound(problem, i) < machine_epsilon * mu {
                self.bound_relaxation_factors[i] += factor;
            }
        }
        for &i in problem.upper_bounded_variables() {
            if self.relaxed_upper_bound(problem, i) - iterate.primals[i] < machine_epsilon * mu {
                self.bound_relaxation_factors[i] += factor;
            }
        }
    }

    /// Hessian, gradients, constraints and Jacobian at the current iterate,
    /// with the diagonal barrier and damping terms layered in.
    fn evaluate_functions(
        &mut self,
        problem: &dyn OptimizationProblem,
        iterate: &mut Iterate,
    ) -> SolverResult<()> {
        let n = problem.number_variables();
        problem.evaluate_lagrangian_hessian(
            &iterate.primals[..n],
            &iterate.multipliers.constraints,
            &mut self.hessian,
        )?;
        self.hessian_evaluation_count += 1;

        problem.evaluate_objective_gradient(iterate, &mut self.objective_gradient)?;
        self.barrier_gradient[..n].fill(0.0);
        scatter(&self.objective_gradient, 1.0, &mut self.barrier_gradient[..n]);

        let mu = self.barrier_parameter();
        for i in 0..n {
            let mut hessian_diagonal_term = 0.0;
            let mut objective_term = 0.0;
            let lower_bounded = problem.variable_lower_bound(i).is_finite();
            let upper_bounded = problem.variable_upper_bound(i).is_finite();
            if lower_bounded {
                let inverse_distance =
                    1.0 / (iterate.primals[i] - self.relaxed_lower_bound(problem, i));
                hessian_diagonal_term += iterate.multipliers.lower_bounds[i] * inverse_distance;
                objective_term -= mu * inverse_distance;
                if !upper_bounded {
                    objective_term += mu * self.parameters.damping_factor;
                }
            }
            if upper_bounded {
                let inverse_distance =
                    1.0 / (iterate.primals[i] - self.relaxed_upper_bound(problem, i));
                hessian_diagonal_term += iterate.multipliers.upper_bounds[i] * inverse_distance;
                objective_term -= mu * inverse_distance;
                if !lower_bounded {
                    objective_term -= mu * self.parameters.damping_factor;
                }
            }
            if hessian_diagonal_term != 0.0 {
                self.hessian.insert(i, i, hessian_diagonal_term);
            }
            self.barrier_gradient[i] += objective_term;
        }

        problem.evaluate_constraints(iterate, &mut self.constraints)?;
        problem.evaluate_constraint_jacobian(iterate, &mut self.constraint_jacobian)?;
        Ok(())
    }

    fn generate_augmented_rhs(&mut self, problem: &dyn OptimizationProblem, iterate: &Iterate) {
        let n = problem.number_variables();
        let m = problem.number_constraints();
        for i in 0..n {
            self.augmented_system.rhs[i] = -self.barrier_gradient[i];
        }
        for j in 0..m {
            let multiplier = iterate.multipliers.constraints[j];
            if multiplier != 0.0 {
                for (i, value) in self.constraint_jacobian[j].iter() {
                    self.augmented_system.rhs[i] += multiplier * value;
                }
            }
            self.augmented_system.rhs[n + j] = -self.constraints[j];
        }
    }

    fn compute_bound_dual_direction(&mut self, problem: &dyn OptimizationProblem, iterate: &Iterate) {
        let mu = self.barrier_parameter();
        self.lower_delta_z[..problem.number_variables()].fill(0.0);
        self.upper_delta_z[..problem.number_variables()].fill(0.0);
        for &i in problem.lower_bounded_variables() {
            let distance = iterate.primals[i] - self.relaxed_lower_bound(problem, i);
            let z = iterate.multipliers.lower_bounds[i];
            self.lower_delta_z[i] =
                (mu - self.augmented_system.solution[i] * z) / distance - z;
            debug_assert!(self.lower_delta_z[i].is_finite());
        }
        for &i in problem.upper_bounded_variables() {
            let distance = iterate.primals[i] - self.relaxed_upper_bound(problem, i);
            let z = iterate.multipliers.upper_bounds[i];
            self.upper_delta_z[i] =
                (mu - self.augmented_system.solution[i] * z) / distance - z;
            debug_assert!(self.upper_delta_z[i].is_finite());
        }
    }

    /// Largest step in (0, 1] keeping the primals a fraction tau inside
    /// their bounds.
    fn primal_fraction_to_boundary(
        &self,
        problem: &dyn OptimizationProblem,
        iterate: &Iterate,
        tau: f64,
    ) -> f64 {
        let mut step_length: f64 = 1.0;
        for &i in problem.lower_bounded_variables() {
            let delta = self.augmented_system.solution[i];
            if delta < 0.0 {
                let trial =
                    -tau * (iterate.primals[i] - self.relaxed_lower_bound(problem, i)) / delta;
                if trial > 0.0 {
                    step_length = step_length.min(trial);
                }
            }
        }
        for &i in problem.upper_bounded_variables() {
            let delta = self.augmented_system.solution[i];
            if delta > 0.0 {
                let trial =
                    -tau * (iterate.primals[i] - self.relaxed_upper_bound(problem, i)) / delta;
                if trial > 0.0 {
                    step_length = step_length.min(trial);
                }
            }
        }
        debug_assert!(0.0 < step_length && step_length <= 1.0);
        step_length
    }

    /// Largest step in (0, 1] keeping the bound multipliers on their side.
    fn dual_fraction_to_boundary(
        &self,
        problem: &dyn OptimizationProblem,
        iterate: &Iterate,
        tau: f64,
    ) -> f64 {
        let mut step_length: f64 = 1.0;
        for &i in problem.lower_bounded_variables() {
            if self.lower_delta_z[i] < 0.0 {
                let trial = -tau * iterate.multipliers.lower_bounds[i] / self.lower_delta_z[i];
                if trial > 0.0 {
                    step_length = step_length.min(trial);
                }
            }
        }
        for &i in problem.upper_bounded_variables() {
            if self.upper_delta_z[i] > 0.0 {
                let trial = -tau * iterate.multipliers.upper_bounds[i] / self.upper_delta_z[i];
                if trial > 0.0 {
                    step_length = step_length.min(trial);
                }
            }
        }
        debug_assert!(0.0 < step_length && step_length <= 1.0);
        step_length
    }

    fn generate_primal_dual_direction(
        &mut self,
        problem: &dyn OptimizationProblem,
        iterate: &Iterate,
    ) {
        let n = problem.number_variables();
        let m = problem.number_constraints();
        self.direction.set_dimensions(n, m);

        // retrieve +delta lambda (the system solves for its negation)
        for value in self.augmented_system.solution[n..n + m].iter_mut() {
            *value = -*value;
        }

        let tau = self.parameters.tau_min.max(1.0 - self.barrier_parameter());
        let primal_step_length = self.primal_fraction_to_boundary(problem, iterate, tau);
        for i in 0..n {
            self.direction.primals[i] = primal_step_length * self.augmented_system.solution[i];
        }
        for j in 0..m {
            self.direction.multipliers.constraints[j] =
                primal_step_length * self.augmented_system.solution[n + j];
        }

        self.compute_bound_dual_direction(problem, iterate);
        let dual_step_length = self.dual_fraction_to_boundary(problem, iterate, tau);
        for i in 0..n {
            self.direction.multipliers.lower_bounds[i] = dual_step_length * self.lower_delta_z[i];
            self.direction.multipliers.upper_bounds[i] = dual_step_length * self.upper_delta_z[i];
        }
        if self.verbose {
            eprintln!(
                "barrier subproblem: primal length {primal_step_length:.3e}, dual length {dual_step_length:.3e}"
            );
        }

        self.direction.update_norm();
        self.direction.objective_multiplier = problem.objective_multiplier();
        self.direction.subproblem_objective = self.evaluate_subproblem_objective(n);
        self.direction.status = SubproblemStatus::Optimal;
    }

    /// Barrier model objective at the (scaled) step: linear + quadratic +
    /// regularization term.
    fn evaluate_subproblem_objective(&self, n: usize) -> f64 {
        let step = &self.direction.primals[..n];
        let linear_term: f64 = step
            .iter()
            .zip(self.barrier_gradient[..n].iter())
            .map(|(d, g)| d * g)
            .sum();
        let quadratic_term = self.hessian.quadratic_product(step) / 2.0;
        let regularized_term = self.augmented_system.primal_regularization()
            * step.iter().map(|d| d * d).sum::<f64>()
            / 2.0;
        linear_term + quadratic_term + regularized_term
    }

    fn barrier_term_directional_derivative(
        &self,
        problem: &dyn OptimizationProblem,
        iterate: &Iterate,
        direction: &Direction,
    ) -> f64 {
        let mu = self.barrier_parameter();
        let mut derivative = 0.0;
        for &i in problem.lower_bounded_variables() {
            derivative += -mu / (iterate.primals[i] - self.relaxed_lower_bound(problem, i))
                * direction.primals[i];
        }
        for &i in problem.upper_bounded_variables() {
            derivative += -mu / (iterate.primals[i] - self.relaxed_upper_bound(problem, i))
                * direction.primals[i];
        }
        for &i in problem.single_lower_bounded_variables() {
            derivative += self.parameters.damping_factor * mu * direction.primals[i];
        }
        for &i in problem.single_upper_bounded_variables() {
            derivative -= self.parameters.damping_factor * mu * direction.primals[i];
        }
        derivative
    }

    /// Scaled primal-dual error of the barrier subproblem for the problem
    /// view currently being solved (during restoration this measures the
    /// relaxed problem, whose error actually goes to zero).
    fn barrier_error(
        &mut self,
        problem: &dyn OptimizationProblem,
        iterate: &mut Iterate,
    ) -> SolverResult<BarrierErrorComponents> {
        let n = problem.number_variables();
        let m = problem.number_constraints();
        problem.evaluate_objective_gradient(iterate, &mut self.objective_gradient)?;
        problem.evaluate_constraints(iterate, &mut self.constraints)?;
        problem.evaluate_constraint_jacobian(iterate, &mut self.constraint_jacobian)?;

        // stationarity of this view's Lagrangian
        self.barrier_gradient[..n].fill(0.0);
        scatter(&self.objective_gradient, 1.0, &mut self.barrier_gradient[..n]);
        for (j, row) in self.constraint_jacobian.iter().enumerate() {
            let multiplier = iterate.multipliers.constraints[j];
            if multiplier != 0.0 {
                for (i, value) in row.iter() {
                    self.barrier_gradient[i] -= multiplier * value;
                }
            }
        }
        for i in 0..n {
            self.barrier_gradient[i] -=
                iterate.multipliers.lower_bounds[i] + iterate.multipliers.upper_bounds[i];
        }

        let stationarity_scaling = SCALING_THRESHOLD
            .max(iterate.multipliers.norm_1(n) / ((n + m) as f64))
            / SCALING_THRESHOLD;
        let bound_multiplier_norm = norm_1(&iterate.multipliers.lower_bounds[..n])
            + norm_1(&iterate.multipliers.upper_bounds[..n]);
        let complementarity_scaling = SCALING_THRESHOLD
            .max(bound_multiplier_norm / (n.max(1) as f64))
            / SCALING_THRESHOLD;

        Ok(BarrierErrorComponents {
            scaled_stationarity: self.progress_norm.of(&self.barrier_gradient[..n])
                / stationarity_scaling,
            infeasibility: problem
                .compute_constraint_violation(&self.constraints, self.progress_norm),
            scaled_complementarity: compute_shifted_complementarity_error(problem, iterate, 0.0)
                / complementarity_scaling,
            complementarity_scaling,
        })
    }

    /// Least-squares estimate of the constraint multipliers at the first
    /// iterate, from the system [I J^T; J 0].
    fn compute_least_square_multipliers(
        &mut self,
        problem: &dyn OptimizationProblem,
        iterate: &mut Iterate,
    ) -> SolverResult<()> {
        let n = problem.number_variables();
        let m = problem.number_constraints();
        problem.evaluate_objective_gradient(iterate, &mut self.objective_gradient)?;
        problem.evaluate_constraint_jacobian(iterate, &mut self.constraint_jacobian)?;

        let mut identity = SparseSymmetric::new(n, n);
        identity.add_identity_multiple(1.0, n);
        self.augmented_system
            .assemble(&identity, &self.constraint_jacobian, n, m, 0.0);
        if !self.augmented_system.factorize_unchecked() {
            // singular Jacobian at the initial point: keep the default duals
            return Ok(());
        }

        // rhs: gradient of f minus the bound multiplier estimates
        self.augmented_system.rhs[..n + m].fill(0.0);
        {
            let (rhs_head, _) = self.augmented_system.rhs.split_at_mut(n);
            scatter(&self.objective_gradient, 1.0, rhs_head);
        }
        for i in 0..n {
            self.augmented_system.rhs[i] -=
                iterate.multipliers.lower_bounds[i] + iterate.multipliers.upper_bounds[i];
        }
        self.augmented_system.solve();

        let multipliers = &self.augmented_system.solution[n..n + m];
        if norm_inf(multipliers) <= self.least_square_multiplier_max_norm {
            iterate.multipliers.constraints.copy_from_slice(multipliers);
        }
        Ok(())
    }
}

impl Subproblem for InteriorPointSubproblem {
    fn initialize(
        &mut self,
        statistics: &mut Statistics,
        problem: &dyn OptimizationProblem,
        first_iterate: &mut Iterate,
    ) -> SolverResult<()> {
        statistics.add_column("barrier param.", DOUBLE_WIDTH, self.statistics_column_order);

        let model = problem.model();
        // evaluate the constraints at the original point; the slack values
        // are derived from them below
        first_iterate.evaluate_constraints(model)?;

        // make the initial point strictly feasible wrt the bounds
        for i in 0..problem.number_variables() {
            first_iterate.primals[i] = self.push_variable_to_interior(
                first_iterate.primals[i],
                self.relaxed_lower_bound(problem, i),
                self.relaxed_upper_bound(problem, i),
            );
        }
        // the slack of a range constraint starts at the constraint value
        for &(j, slack_index) in model.slacks() {
            first_iterate.primals[slack_index] = self.push_variable_to_interior(
                first_iterate.evaluations.constraints[j],
                self.relaxed_lower_bound(problem, slack_index),
                self.relaxed_upper_bound(problem, slack_index),
            );
        }
        first_iterate.invalidate_evaluations();

        for &i in problem.lower_bounded_variables() {
            first_iterate.multipliers.lower_bounds[i] = self.default_multiplier;
        }
        for &i in problem.upper_bounded_variables() {
            first_iterate.multipliers.upper_bounds[i] = -self.default_multiplier;
        }

        if problem.is_constrained() {
            self.compute_least_square_multipliers(problem, first_iterate)?;
        }
        Ok(())
    }

    fn solve(
        &mut self,
        statistics: &mut Statistics,
        problem: &dyn OptimizationProblem,
        current_iterate: &mut Iterate,
        _warmstart: &WarmstartInformation,
    ) -> SolverResult<Direction> {
        debug_assert!(
            problem.inequality_constraints().is_empty(),
            "the barrier subproblem requires an equality-constrained reformulation"
        );

        // drive mu down if the current iterate solves the barrier subproblem
        let error = self.barrier_error(problem, current_iterate)?;
        self.barrier.update(problem, current_iterate, error);
        self.relax_variable_bounds(problem, current_iterate);
        self.evaluate_functions(problem, current_iterate)?;

        // assemble and factorize with the correct inertia
        let dual_regularization = self
            .barrier_parameter()
            .powf(self.parameters.regularization_exponent);
        self.augmented_system.assemble(
            &self.hessian,
            &self.constraint_jacobian,
            problem.number_variables(),
            problem.number_constraints(),
            dual_regularization,
        );
        self.augmented_system.factorize_with_inertia_correction()?;
        self.generate_augmented_rhs(problem, current_iterate);
        self.augmented_system.solve();
        self.number_subproblems_solved += 1;

        self.generate_primal_dual_direction(problem, current_iterate);
        statistics.set("barrier param.", self.barrier_parameter());
        Ok(self.direction.clone())
    }

    fn initialize_feasibility_problem(
        &mut self,
        _problem: &dyn OptimizationProblem,
        current_iterate: &mut Iterate,
    ) {
        // restoration works at a coarser barrier level
        self.solving_feasibility_problem = true;
        self.previous_barrier_parameter = self.barrier_parameter();
        let constraint_norm = if current_iterate.are_constraints_computed {
            norm_inf(&current_iterate.evaluations.constraints)
        } else {
            0.0
        };
        let new_parameter = self.barrier_parameter().max(constraint_norm) / 1000.0;
        self.barrier.set_barrier_parameter(new_parameter);
        if self.verbose {
            eprintln!("barrier parameter temporarily set to {new_parameter:.3e} for restoration");
        }
    }

    fn set_elastic_variable_values(&self, problem: &L1RelaxedProblem, iterate: &mut Iterate) {
        // closed-form elastic values making the relaxed constraints feasible
        // while staying mu-centered (Ipopt Eq. 33-34, with rho = 1)
        let _ = iterate.evaluate_constraints(problem.model());
        let mu = self.barrier_parameter();
        for j in 0..problem.number_constraints() {
            let value = iterate.evaluations.constraints[j];
            let lower = problem.constraint_lower_bound(j);
            let upper = problem.constraint_upper_bound(j);
            let shifted = if value > upper {
                value - upper
            } else if value < lower {
                value - lower
            } else {
                0.0
            };
            let radical = (shifted * shifted + mu * mu).sqrt();

            let upper_elastic = problem.upper_elastic_index(j);
            iterate.primals[upper_elastic] = (mu + shifted + radical) / 2.0;
            iterate.multipliers.lower_bounds[upper_elastic] =
                mu / iterate.primals[upper_elastic];

            let lower_elastic = problem.lower_elastic_index(j);
            iterate.primals[lower_elastic] = (mu - shifted + radical) / 2.0;
            iterate.multipliers.lower_bounds[lower_elastic] =
                mu / iterate.primals[lower_elastic];
        }
    }

    fn exit_feasibility_problem(
        &mut self,
        _problem: &dyn OptimizationProblem,
        _trial_iterate: &mut Iterate,
    ) {
        if self.solving_feasibility_problem {
            self.barrier
                .set_barrier_parameter(self.previous_barrier_parameter);
            self.solving_feasibility_problem = false;
        }
    }

    fn set_auxiliary_measure(&self, problem: &dyn OptimizationProblem, iterate: &mut Iterate) {
        // barrier log terms plus the damping of singly-bounded variables
        let mut barrier_terms = 0.0;
        for &i in problem.lower_bounded_variables() {
            barrier_terms -= (iterate.primals[i] - self.relaxed_lower_bound(problem, i)).ln();
        }
        for &i in problem.upper_bounded_variables() {
            barrier_terms -= (self.relaxed_upper_bound(problem, i) - iterate.primals[i]).ln();
        }
        for &i in problem.single_lower_bounded_variables() {
            barrier_terms += self.parameters.damping_factor
                * (iterate.primals[i] - self.relaxed_lower_bound(problem, i));
        }
        for &i in problem.single_upper_bounded_variables() {
            barrier_terms += self.parameters.damping_factor
                * (self.relaxed_upper_bound(problem, i) - iterate.primals[i]);
        }
        barrier_terms *= self.barrier_parameter();
        assert!(!barrier_terms.is_nan(), "the barrier measure is not a number");
        iterate.progress.auxiliary = barrier_terms;
    }

    fn predicted_objective_reduction(
        &self,
        _iterate: &Iterate,
        direction: &Direction,
        step_length: f64,
    ) -> OptimalityMeasure {
        let directional_derivative =
            sparse_dot(&self.objective_gradient, &direction.primals);
        OptimalityMeasure::Objective(step_length * (-directional_derivative))
    }

    fn predicted_auxiliary_reduction(
        &self,
        problem: &dyn OptimizationProblem,
        iterate: &Iterate,
        direction: &Direction,
        step_length: f64,
    ) -> f64 {
        step_length * (-self.barrier_term_directional_derivative(problem, iterate, direction))
    }

    fn is_small_direction(
        &self,
        problem: &dyn OptimizationProblem,
        iterate: &Iterate,
        direction: &Direction,
    ) -> bool {
        let relative = (0..problem.number_variables())
            .map(|i| (direction.primals[i] / (1.0 + iterate.primals[i].abs())).abs())
            .fold(0.0, f64::max);
        relative < self.parameters.small_direction_factor * f64::EPSILON
    }

    fn postprocess_accepted_iterate(
        &mut self,
        problem: &dyn OptimizationProblem,
        iterate: &mut Iterate,
    ) {
        // rescale the bound multipliers into the primal-dual symmetry box
        // (Eq. 16 in the Ipopt paper)
        let mu = self.barrier_parameter();
        let k_sigma = self.parameters.k_sigma;
        for &i in problem.lower_bounded_variables() {
            let coefficient = mu / (iterate.primals[i] - self.relaxed_lower_bound(problem, i));
            let lower = coefficient / k_sigma;
            let upper = coefficient * k_sigma;
            if lower <= upper {
                iterate.multipliers.lower_bounds[i] =
                    iterate.multipliers.lower_bounds[i].min(upper).max(lower);
            } else {
                eprintln!(
                    "warning: lower bound multiplier reset box is inverted for variable {i}"
                );
            }
        }
        for &i in problem.upper_bounded_variables() {
            let coefficient = mu / (iterate.primals[i] - self.relaxed_upper_bound(problem, i));
            let lower = coefficient * k_sigma;
            let upper = coefficient / k_sigma;
            if lower <= upper {
                iterate.multipliers.upper_bounds[i] =
                    iterate.multipliers.upper_bounds[i].min(upper).max(lower);
            } else {
                eprintln!(
                    "warning: upper bound multiplier reset box is inverted for variable {i}"
                );
            }
        }
    }

    fn set_trust_region_radius(&mut self, _radius: f64) {
        // the barrier method is globalized by line search; the radius does
        // not apply
    }

    fn set_initial_point(&mut self, _point: &[f64]) {}

    fn hessian_evaluation_count(&self) -> usize {
        self.hessian_evaluation_count
    }

    fn number_subproblems_solved(&self) -> usize {
        self.number_subproblems_solved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvaluationError;
    use crate::model::Model;
    use crate::reform::OriginalProblem;

    /// min x  with  x >= 1
    struct BoundedLinear;

    impl Model for BoundedLinear {
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
            Ok(x[0])
        }
        fn evaluate_objective_gradient(&self, _x: &[f64]) -> Result<SparseVector, EvaluationError> {
            Ok(SparseVector::new(1, vec![0], vec![1.0]))
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
            _objective_multiplier: f64,
            _multipliers: &[f64],
            _hessian: &mut SparseSymmetric,
        ) -> Result<(), EvaluationError> {
            Ok(())
        }
        fn initial_primals(&self, x: &mut [f64]) {
            x[0] = 5.0;
        }
    }

    fn subproblem() -> InteriorPointSubproblem {
        InteriorPointSubproblem::new(1, 0, 4, &Options::default())
    }

    #[test]
    fn test_initialize_pushes_into_interior() {
        let model = BoundedLinear;
        let problem = OriginalProblem::new(&model);
        let mut statistics = Statistics::new(10);
        let mut iterate = Iterate::new(1, 1, 0);
        iterate.primals[0] = 0.0; // below the bound

        let mut sub = subproblem();
        sub.initialize(&mut statistics, &problem, &mut iterate).unwrap();
        assert!(iterate.primals[0] > 1.0);
        assert_eq!(iterate.multipliers.lower_bounds[0], 1.0);
    }

    #[test]
    fn test_fraction_to_boundary_keeps_strict_interior() {
        let model = BoundedLinear;
        let problem = OriginalProblem::new(&model);
        let mut statistics = Statistics::new(10);
        let mut iterate = Iterate::new(1, 1, 0);
        iterate.primals[0] = 2.0;
        iterate.multipliers.lower_bounds[0] = 0.5;

        let mut sub = subproblem();
        let direction = sub
            .solve(
                &mut statistics,
                &problem,
                &mut iterate,
                &WarmstartInformation::whole_problem_changed(),
            )
            .unwrap();

        // the step may point at the bound but must not cross it; the
        // fraction-to-boundary margin is (1 - tau) of the distance
        let tau = 0.99_f64.max(1.0 - sub.barrier_parameter());
        let distance = iterate.primals[0] - 1.0;
        let trial = iterate.primals[0] + direction.primals[0];
        assert!(
            trial - 1.0 >= (1.0 - tau) * distance - 1e-15,
            "trial {trial} crosses the fraction-to-boundary margin"
        );
        // dual iterate stays positive under the full dual step
        let trial_dual =
            iterate.multipliers.lower_bounds[0] + direction.multipliers.lower_bounds[0];
        assert!(trial_dual > 0.0);
    }

    #[test]
    fn test_small_direction_detection() {
        let model = BoundedLinear;
        let problem = OriginalProblem::new(&model);
        let mut iterate = Iterate::new(1, 1, 0);
        iterate.primals[0] = 2.0;
        let sub = subproblem();
        let mut direction = Direction::new(1, 0);
        direction.primals[0] = 1e-18;
        assert!(sub.is_small_direction(&problem, &iterate, &direction));
        direction.primals[0] = 1e-3;
        assert!(!sub.is_small_direction(&problem, &iterate, &direction));
    }

    #[test]
    fn test_multiplier_reset_box() {
        let model = BoundedLinear;
        let problem = OriginalProblem::new(&model);
        let mut iterate = Iterate::new(1, 1, 0);
        iterate.primals[0] = 1.0 + 1e-8;
        iterate.multipliers.lower_bounds[0] = 1e-12; // far below mu/d/k_sigma

        let mut sub = subproblem();
        sub.postprocess_accepted_iterate(&problem, &mut iterate);
        let mu = sub.barrier_parameter();
        let coefficient = mu / 1e-8;
        assert!(iterate.multipliers.lower_bounds[0] >= coefficient / 1e10);
        assert!(iterate.multipliers.lower_bounds[0] <= coefficient * 1e10);
    }
}
