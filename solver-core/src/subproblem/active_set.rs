//! Active-set subproblems: LP and QP over the linearized constraints.
//!
//! Both variants assemble the same displacement problem at the current
//! iterate x:
//!
//! ```text
//! bounds:       max(x_L - x, -radius) <= d <= min(x_U - x, +radius)
//! constraints:  c_L - c(x) <= J(x) d <= c_U - c(x)
//! ```
//!
//! and hand it to the LP/QP collaborator. The QP variant adds the
//! convexified Lagrangian Hessian. The collaborator's active set and
//! multipliers are read back into the direction with the core's sign
//! convention (z_L >= 0 >= z_U), and constraints whose linearization is
//! infeasible in the subproblem are partitioned by violated side.

use crate::direction::Direction;
use crate::error::SolverResult;
use crate::iterate::{Iterate, OptimalityMeasure};
use crate::linalg::sparse::{sparse_dot, Interval, JacobianRows, SparseVector};
use crate::options::Options;
use crate::reform::{L1RelaxedProblem, OptimizationProblem};
use crate::statistics::Statistics;
use crate::subproblem::qp::{ActiveSide, QpProblem, QpSolution, QpSolver, QpWarmstartMode};
use crate::subproblem::{Subproblem, WarmstartInformation};
use crate::hessian::{ConvexifiedHessian, HessianModel};

// feasibility tolerance when partitioning the linearized constraints
const PARTITION_TOLERANCE: f64 = 1e-10;

/// State shared by the LP and QP variants.
struct ActiveSetState {
    initial_point: Vec<f64>,
    variable_displacement_bounds: Vec<Interval>,
    linearized_constraint_bounds: Vec<Interval>,
    trust_region_radius: f64,
    number_calls: usize,
    // problem-level evaluation scratch
    objective_gradient: SparseVector,
    constraints: Vec<f64>,
    constraint_jacobian: JacobianRows,
    direction: Direction,
}

impl ActiveSetState {
    fn new(capacity_variables: usize, capacity_constraints: usize) -> Self {
        Self {
            initial_point: vec![0.0; capacity_variables],
            variable_displacement_bounds: vec![Interval::ENTIRE; capacity_variables],
            linearized_constraint_bounds: vec![Interval::ENTIRE; capacity_constraints],
            trust_region_radius: f64::INFINITY,
            number_calls: 0,
            objective_gradient: SparseVector::empty(capacity_variables),
            constraints: Vec::with_capacity(capacity_constraints),
            constraint_jacobian: Vec::with_capacity(capacity_constraints),
            direction: Direction::new(capacity_variables, capacity_constraints),
        }
    }

    /// Trust region intersected with the variable bounds, as displacement
    /// intervals around the current point.
    fn set_variable_displacement_bounds(
        &mut self,
        problem: &dyn OptimizationProblem,
        iterate: &Iterate,
    ) {
        let radius = self.trust_region_radius;
        for i in 0..problem.number_variables() {
            let lower = (problem.variable_lower_bound(i) - iterate.primals[i]).max(-radius);
            let upper = (problem.variable_upper_bound(i) - iterate.primals[i]).min(radius);
            self.variable_displacement_bounds[i] = Interval::new(lower, upper);
        }
    }

    fn set_linearized_constraint_bounds(&mut self, problem: &dyn OptimizationProblem) {
        self.linearized_constraint_bounds.clear();
        for (j, &value) in self.constraints.iter().enumerate() {
            self.linearized_constraint_bounds.push(Interval::new(
                problem.constraint_lower_bound(j) - value,
                problem.constraint_upper_bound(j) - value,
            ));
        }
    }

    fn determine_warmstart_mode(&self, warmstart: &WarmstartInformation) -> QpWarmstartMode {
        if self.number_calls == 0 || warmstart.problem_changed {
            QpWarmstartMode::Cold
        } else if warmstart.variable_bounds_changed
            && !warmstart.objective_changed
            && !warmstart.constraints_changed
            && !warmstart.constraint_bounds_changed
        {
            QpWarmstartMode::ReuseActiveSetAndJacobian
        } else {
            QpWarmstartMode::UserDefined
        }
    }

    /// Read the collaborator's solution back into the direction.
    fn analyze_solution(
        &mut self,
        problem: &dyn OptimizationProblem,
        iterate: &Iterate,
        solution: QpSolution,
    ) {
        let n = problem.number_variables();
        let m = problem.number_constraints();
        self.direction.set_dimensions(n, m);

        // project the step into the displacement bounds
        for i in 0..n {
            let bounds = self.variable_displacement_bounds[i];
            self.direction.primals[i] = solution.primals[i].max(bounds.lb).min(bounds.ub);
        }

        for row in &solution.active_rows {
            if row.index < n {
                match row.side {
                    ActiveSide::Lower => {
                        self.direction.multipliers.lower_bounds[row.index] = row.multiplier;
                        self.direction.active_set.bounds.at_lower_bound.push(row.index);
                    }
                    ActiveSide::Upper => {
                        self.direction.multipliers.upper_bounds[row.index] = -row.multiplier;
                        self.direction.active_set.bounds.at_upper_bound.push(row.index);
                    }
                }
            } else {
                let j = row.index - n;
                match row.side {
                    ActiveSide::Lower => {
                        self.direction.multipliers.constraints[j] = row.multiplier;
                        self.direction.active_set.constraints.at_lower_bound.push(j);
                    }
                    ActiveSide::Upper => {
                        self.direction.multipliers.constraints[j] = -row.multiplier;
                        self.direction.active_set.constraints.at_upper_bound.push(j);
                    }
                }
            }
        }

        // partition the constraints by linearized feasibility
        let mut partition = crate::direction::ConstraintPartition::default();
        for j in 0..m {
            let linearized = sparse_dot(&self.constraint_jacobian[j], &self.direction.primals);
            let bounds = self.linearized_constraint_bounds[j];
            if linearized < bounds.lb - PARTITION_TOLERANCE {
                partition.infeasible.push(j);
                partition.lower_bound_infeasible.push(j);
            } else if linearized > bounds.ub + PARTITION_TOLERANCE {
                partition.infeasible.push(j);
                partition.upper_bound_infeasible.push(j);
            } else {
                partition.feasible.push(j);
            }
        }
        self.direction.constraint_partition = Some(partition);

        // multipliers enter as values; ship displacements
        for j in 0..m {
            self.direction.multipliers.constraints[j] -= iterate.multipliers.constraints[j];
        }
        for i in 0..n {
            self.direction.multipliers.lower_bounds[i] -= iterate.multipliers.lower_bounds[i];
            self.direction.multipliers.upper_bounds[i] -= iterate.multipliers.upper_bounds[i];
        }

        self.direction.objective_multiplier = problem.objective_multiplier();
        self.direction.subproblem_objective = solution.objective;
        self.direction.status = solution.status;
        self.direction.update_norm();
    }

    fn set_elastic_values(&self, problem: &L1RelaxedProblem, iterate: &mut Iterate) {
        let _ = iterate.evaluate_constraints(problem.model());
        for j in 0..problem.number_constraints() {
            let value = iterate.evaluations.constraints[j];
            let upper_violation = (value - problem.constraint_upper_bound(j)).max(0.0);
            let lower_violation = (problem.constraint_lower_bound(j) - value).max(0.0);
            iterate.primals[problem.upper_elastic_index(j)] = upper_violation;
            iterate.primals[problem.lower_elastic_index(j)] = lower_violation;
        }
    }
}

/// LP subproblem: first-order direction from the linearized problem.
pub struct LpSubproblem {
    state: ActiveSetState,
    solver: Box<dyn QpSolver>,
    number_subproblems_solved: usize,
}

impl LpSubproblem {
    pub fn new(
        capacity_variables: usize,
        capacity_constraints: usize,
        solver: Box<dyn QpSolver>,
    ) -> Self {
        Self {
            state: ActiveSetState::new(capacity_variables, capacity_constraints),
            solver,
            number_subproblems_solved: 0,
        }
    }
}

impl Subproblem for LpSubproblem {
    fn initialize(
        &mut self,
        _statistics: &mut Statistics,
        _problem: &dyn OptimizationProblem,
        _first_iterate: &mut Iterate,
    ) -> SolverResult<()> {
        Ok(())
    }

    fn solve(
        &mut self,
        _statistics: &mut Statistics,
        problem: &dyn OptimizationProblem,
        current_iterate: &mut Iterate,
        warmstart: &WarmstartInformation,
    ) -> SolverResult<Direction> {
        let state = &mut self.state;
        if warmstart.objective_changed {
            problem.evaluate_objective_gradient(current_iterate, &mut state.objective_gradient)?;
        }
        if warmstart.constraints_changed {
            problem.evaluate_constraints(current_iterate, &mut state.constraints)?;
            problem.evaluate_constraint_jacobian(current_iterate, &mut state.constraint_jacobian)?;
        }
        state.set_variable_displacement_bounds(problem, current_iterate);
        state.set_linearized_constraint_bounds(problem);

        let n = problem.number_variables();
        let m = problem.number_constraints();
        let qp = QpProblem {
            number_variables: n,
            number_constraints: m,
            variable_bounds: &state.variable_displacement_bounds[..n],
            constraint_bounds: &state.linearized_constraint_bounds[..m],
            linear_objective: &state.objective_gradient,
            constraint_jacobian: &state.constraint_jacobian,
            hessian: None,
            initial_point: &state.initial_point[..n],
            warmstart: state.determine_warmstart_mode(warmstart),
        };
        let solution = self.solver.solve(&qp)?;
        state.number_calls += 1;
        self.number_subproblems_solved += 1;
        state.analyze_solution(problem, current_iterate, solution);
        Ok(state.direction.clone())
    }

    fn initialize_feasibility_problem(
        &mut self,
        _problem: &dyn OptimizationProblem,
        _current_iterate: &mut Iterate,
    ) {
    }

    fn set_elastic_variable_values(&self, problem: &L1RelaxedProblem, iterate: &mut Iterate) {
        self.state.set_elastic_values(problem, iterate);
    }

    fn exit_feasibility_problem(
        &mut self,
        _problem: &dyn OptimizationProblem,
        _trial_iterate: &mut Iterate,
    ) {
    }

    fn set_auxiliary_measure(&self, _problem: &dyn OptimizationProblem, iterate: &mut Iterate) {
        iterate.progress.auxiliary = 0.0;
    }

    fn predicted_objective_reduction(
        &self,
        _iterate: &Iterate,
        direction: &Direction,
        step_length: f64,
    ) -> OptimalityMeasure {
        let derivative = sparse_dot(&self.state.objective_gradient, &direction.primals);
        OptimalityMeasure::Objective(step_length * (-derivative))
    }

    fn predicted_auxiliary_reduction(
        &self,
        _problem: &dyn OptimizationProblem,
        _iterate: &Iterate,
        _direction: &Direction,
        _step_length: f64,
    ) -> f64 {
        0.0
    }

    fn postprocess_accepted_iterate(
        &mut self,
        _problem: &dyn OptimizationProblem,
        _iterate: &mut Iterate,
    ) {
    }

    fn set_trust_region_radius(&mut self, radius: f64) {
        assert!(radius > 0.0, "the trust-region radius must be positive");
        self.state.trust_region_radius = radius;
    }

    fn set_initial_point(&mut self, point: &[f64]) {
        self.state.initial_point[..point.len()].copy_from_slice(point);
    }

    fn hessian_evaluation_count(&self) -> usize {
        0
    }

    fn number_subproblems_solved(&self) -> usize {
        self.number_subproblems_solved
    }
}

/// QP subproblem: second-order direction with the convexified Hessian.
pub struct QpSubproblem {
    state: ActiveSetState,
    hessian_model: ConvexifiedHessian,
    solver: Box<dyn QpSolver>,
    number_subproblems_solved: usize,
}

impl QpSubproblem {
    pub fn new(
        capacity_variables: usize,
        capacity_constraints: usize,
        hessian_capacity: usize,
        solver: Box<dyn QpSolver>,
        options: &Options,
    ) -> Self {
        Self {
            state: ActiveSetState::new(capacity_variables, capacity_constraints),
            hessian_model: ConvexifiedHessian::new(
                capacity_variables,
                hessian_capacity,
                options.regularization_initial_value,
                options.regularization_increase_factor,
            ),
            solver,
            number_subproblems_solved: 0,
        }
    }
}

impl Subproblem for QpSubproblem {
    fn initialize(
        &mut self,
        _statistics: &mut Statistics,
        _problem: &dyn OptimizationProblem,
        _first_iterate: &mut Iterate,
    ) -> SolverResult<()> {
        Ok(())
    }

    fn solve(
        &mut self,
        _statistics: &mut Statistics,
        problem: &dyn OptimizationProblem,
        current_iterate: &mut Iterate,
        warmstart: &WarmstartInformation,
    ) -> SolverResult<Direction> {
        if warmstart.objective_changed || warmstart.constraints_changed {
            let n = problem.number_variables();
            self.hessian_model.evaluate(
                problem,
                &current_iterate.primals[..n],
                &current_iterate.multipliers.constraints,
            )?;
        }
        let state = &mut self.state;
        if warmstart.objective_changed {
            problem.evaluate_objective_gradient(current_iterate, &mut state.objective_gradient)?;
        }
        if warmstart.constraints_changed {
            problem.evaluate_constraints(current_iterate, &mut state.constraints)?;
            problem.evaluate_constraint_jacobian(current_iterate, &mut state.constraint_jacobian)?;
        }
        state.set_variable_displacement_bounds(problem, current_iterate);
        state.set_linearized_constraint_bounds(problem);

        let n = problem.number_variables();
        let m = problem.number_constraints();
        let qp = QpProblem {
            number_variables: n,
            number_constraints: m,
            variable_bounds: &state.variable_displacement_bounds[..n],
            constraint_bounds: &state.linearized_constraint_bounds[..m],
            linear_objective: &state.objective_gradient,
            constraint_jacobian: &state.constraint_jacobian,
            hessian: Some(self.hessian_model.hessian()),
            initial_point: &state.initial_point[..n],
            warmstart: state.determine_warmstart_mode(warmstart),
        };
        let solution = self.solver.solve(&qp)?;
        state.number_calls += 1;
        self.number_subproblems_solved += 1;
        state.analyze_solution(problem, current_iterate, solution);
        Ok(state.direction.clone())
    }

    fn initialize_feasibility_problem(
        &mut self,
        _problem: &dyn OptimizationProblem,
        _current_iterate: &mut Iterate,
    ) {
    }

    fn set_elastic_variable_values(&self, problem: &L1RelaxedProblem, iterate: &mut Iterate) {
        self.state.set_elastic_values(problem, iterate);
    }

    fn exit_feasibility_problem(
        &mut self,
        _problem: &dyn OptimizationProblem,
        _trial_iterate: &mut Iterate,
    ) {
    }

    fn set_auxiliary_measure(&self, _problem: &dyn OptimizationProblem, iterate: &mut Iterate) {
        iterate.progress.auxiliary = 0.0;
    }

    fn predicted_objective_reduction(
        &self,
        _iterate: &Iterate,
        direction: &Direction,
        step_length: f64,
    ) -> OptimalityMeasure {
        let n = direction.number_variables;
        let linear = sparse_dot(&self.state.objective_gradient, &direction.primals);
        let quadratic = self
            .hessian_model
            .hessian()
            .quadratic_product(&direction.primals[..n]);
        OptimalityMeasure::Objective(
            step_length * (-linear) - 0.5 * step_length * step_length * quadratic,
        )
    }

    fn predicted_auxiliary_reduction(
        &self,
        _problem: &dyn OptimizationProblem,
        _iterate: &Iterate,
        _direction: &Direction,
        _step_length: f64,
    ) -> f64 {
        0.0
    }

    fn postprocess_accepted_iterate(
        &mut self,
        _problem: &dyn OptimizationProblem,
        _iterate: &mut Iterate,
    ) {
    }

    fn set_trust_region_radius(&mut self, radius: f64) {
        assert!(radius > 0.0, "the trust-region radius must be positive");
        self.state.trust_region_radius = radius;
    }

    fn set_initial_point(&mut self, point: &[f64]) {
        self.state.initial_point[..point.len()].copy_from_slice(point);
    }

    fn hessian_evaluation_count(&self) -> usize {
        self.hessian_model.evaluation_count()
    }

    fn number_subproblems_solved(&self) -> usize {
        self.number_subproblems_solved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::direction::SubproblemStatus;
    use crate::error::EvaluationError;
    use crate::linalg::sparse::SparseSymmetric;
    use crate::model::Model;
    use crate::reform::OriginalProblem;
    use crate::subproblem::qp::ActiveRow;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// records what the backend received and replays a scripted solution
    struct ScriptedBackend {
        seen_modes: Rc<RefCell<Vec<QpWarmstartMode>>>,
        seen_bounds: Rc<RefCell<Vec<Vec<Interval>>>>,
        solution: fn(&QpProblem) -> QpSolution,
    }

    impl QpSolver for ScriptedBackend {
        fn solve(&mut self, problem: &QpProblem) -> SolverResult<QpSolution> {
            self.seen_modes.borrow_mut().push(problem.warmstart);
            self.seen_bounds
                .borrow_mut()
                .push(problem.variable_bounds.to_vec());
            Ok((self.solution)(problem))
        }
    }

    /// min x0 + x1  s.t.  x0 + x1 >= 1,  0 <= x <= 2
    struct BoxLp;

    impl Model for BoxLp {
        fn number_variables(&self) -> usize {
            2
        }
        fn number_constraints(&self) -> usize {
            1
        }
        fn variable_lower_bound(&self, _i: usize) -> f64 {
            0.0
        }
        fn variable_upper_bound(&self, _i: usize) -> f64 {
            2.0
        }
        fn constraint_lower_bound(&self, _j: usize) -> f64 {
            1.0
        }
        fn constraint_upper_bound(&self, _j: usize) -> f64 {
            f64::INFINITY
        }
        fn evaluate_objective(&self, x: &[f64]) -> Result<f64, EvaluationError> {
            Ok(x[0] + x[1])
        }
        fn evaluate_objective_gradient(&self, _x: &[f64]) -> Result<SparseVector, EvaluationError> {
            Ok(SparseVector::new(2, vec![0, 1], vec![1.0, 1.0]))
        }
        fn evaluate_constraints(&self, x: &[f64]) -> Result<Vec<f64>, EvaluationError> {
            Ok(vec![x[0] + x[1]])
        }
        fn evaluate_constraint_jacobian(&self, _x: &[f64]) -> Result<JacobianRows, EvaluationError> {
            Ok(vec![SparseVector::new(2, vec![0, 1], vec![1.0, 1.0])])
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
            x.fill(1.0);
        }
    }

    fn zero_solution(problem: &QpProblem) -> QpSolution {
        QpSolution {
            primals: vec![0.0; problem.number_variables],
            objective: 0.0,
            status: SubproblemStatus::Optimal,
            active_rows: vec![
                ActiveRow {
                    index: 0,
                    side: ActiveSide::Lower,
                    multiplier: 0.5,
                },
                ActiveRow {
                    index: problem.number_variables, // the constraint
                    side: ActiveSide::Upper,
                    multiplier: 0.25,
                },
            ],
            residuals: vec![0.0; problem.number_variables + problem.number_constraints],
        }
    }

    #[test]
    fn test_displacement_bounds_intersect_trust_region() {
        let model = BoxLp;
        let problem = OriginalProblem::new(&model);
        let modes = Rc::new(RefCell::new(Vec::new()));
        let bounds = Rc::new(RefCell::new(Vec::new()));
        let backend = ScriptedBackend {
            seen_modes: modes.clone(),
            seen_bounds: bounds.clone(),
            solution: zero_solution,
        };
        let mut sub = LpSubproblem::new(2, 1, Box::new(backend));
        sub.set_trust_region_radius(0.5);

        let mut statistics = Statistics::new(10);
        let mut iterate = Iterate::new(2, 2, 1);
        iterate.primals.fill(1.0);
        let _ = sub
            .solve(
                &mut statistics,
                &problem,
                &mut iterate,
                &WarmstartInformation::whole_problem_changed(),
            )
            .unwrap();

        // bounds: x = 1, box [0, 2], radius 0.5 -> [-0.5, 0.5]
        let seen = bounds.borrow();
        assert_eq!(seen[0][0], Interval::new(-0.5, 0.5));
        assert_eq!(seen[0][1], Interval::new(-0.5, 0.5));
    }

    #[test]
    fn test_warmstart_mode_selection() {
        let model = BoxLp;
        let problem = OriginalProblem::new(&model);
        let modes = Rc::new(RefCell::new(Vec::new()));
        let bounds = Rc::new(RefCell::new(Vec::new()));
        let backend = ScriptedBackend {
            seen_modes: modes.clone(),
            seen_bounds: bounds.clone(),
            solution: zero_solution,
        };
        let mut sub = LpSubproblem::new(2, 1, Box::new(backend));
        let mut statistics = Statistics::new(10);
        let mut iterate = Iterate::new(2, 2, 1);
        iterate.primals.fill(1.0);

        // first call is always cold
        let whole = WarmstartInformation::whole_problem_changed();
        let _ = sub.solve(&mut statistics, &problem, &mut iterate, &whole).unwrap();
        // radius-only retry reuses active set and Jacobian
        let retry = WarmstartInformation::only_variable_bounds_changed();
        let _ = sub.solve(&mut statistics, &problem, &mut iterate, &retry).unwrap();
        // new point: user-defined warm start
        let mut new_point = WarmstartInformation::whole_problem_changed();
        new_point.problem_changed = false;
        let _ = sub
            .solve(&mut statistics, &problem, &mut iterate, &new_point)
            .unwrap();

        assert_eq!(
            *modes.borrow(),
            vec![
                QpWarmstartMode::Cold,
                QpWarmstartMode::ReuseActiveSetAndJacobian,
                QpWarmstartMode::UserDefined,
            ]
        );
    }

    #[test]
    fn test_dual_readback_signs_and_partition() {
        let model = BoxLp;
        let problem = OriginalProblem::new(&model);
        let modes = Rc::new(RefCell::new(Vec::new()));
        let bounds = Rc::new(RefCell::new(Vec::new()));
        let backend = ScriptedBackend {
            seen_modes: modes,
            seen_bounds: bounds,
            solution: zero_solution,
        };
        let mut sub = LpSubproblem::new(2, 1, Box::new(backend));
        let mut statistics = Statistics::new(10);
        let mut iterate = Iterate::new(2, 2, 1);
        iterate.primals.fill(0.25);

        let direction = sub
            .solve(
                &mut statistics,
                &problem,
                &mut iterate,
                &WarmstartInformation::whole_problem_changed(),
            )
            .unwrap();

        // lower-active variable: nonnegative multiplier displacement
        assert_eq!(direction.multipliers.lower_bounds[0], 0.5);
        // upper-active constraint: negative multiplier
        assert_eq!(direction.multipliers.constraints[0], -0.25);
        assert_eq!(direction.active_set.bounds.at_lower_bound, vec![0]);
        assert_eq!(direction.active_set.constraints.at_upper_bound, vec![0]);

        // zero step at c(x) = 0.5 < 1: linearization is infeasible below
        let partition = direction.constraint_partition.as_ref().unwrap();
        assert_eq!(partition.infeasible, vec![0]);
        assert_eq!(partition.lower_bound_infeasible, vec![0]);
        assert!(partition.feasible.is_empty());
    }
}
