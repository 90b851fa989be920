//! Primal-dual search directions produced by the subproblem solvers.

use crate::iterate::Multipliers;
use crate::linalg::norm::norm_inf;

/// Outcome of a subproblem solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubproblemStatus {
    Optimal,
    Unbounded,
    Infeasible,
    Error,
}

/// Indices whose lower or upper bound is active in the subproblem solution.
#[derive(Debug, Clone, Default)]
pub struct ActiveBounds {
    pub at_lower_bound: Vec<usize>,
    pub at_upper_bound: Vec<usize>,
}

/// Active bounds of both the variables and the linearized constraints.
#[derive(Debug, Clone, Default)]
pub struct ActiveSet {
    pub bounds: ActiveBounds,
    pub constraints: ActiveBounds,
}

impl ActiveSet {
    pub fn clear(&mut self) {
        self.bounds.at_lower_bound.clear();
        self.bounds.at_upper_bound.clear();
        self.constraints.at_lower_bound.clear();
        self.constraints.at_upper_bound.clear();
    }
}

/// Feasible/infeasible split of the linearized constraints, with the violated
/// side recorded for the infeasible ones.
#[derive(Debug, Clone, Default)]
pub struct ConstraintPartition {
    pub feasible: Vec<usize>,
    pub infeasible: Vec<usize>,
    pub lower_bound_infeasible: Vec<usize>,
    pub upper_bound_infeasible: Vec<usize>,
}

/// A primal-dual direction: primal step, multiplier steps, predicted
/// subproblem objective and the active-set information read back from the
/// subproblem solver.
#[derive(Debug, Clone)]
pub struct Direction {
    pub number_variables: usize,
    pub number_constraints: usize,
    pub primals: Vec<f64>,
    pub multipliers: Multipliers,
    /// Objective multiplier rho under which this direction was computed
    /// (0 for restoration directions).
    pub objective_multiplier: f64,
    /// Model objective of the subproblem at the step.
    pub subproblem_objective: f64,
    /// Infinity norm of the primal step.
    pub norm: f64,
    pub active_set: ActiveSet,
    pub constraint_partition: Option<ConstraintPartition>,
    pub status: SubproblemStatus,
}

impl Direction {
    pub fn new(capacity_variables: usize, number_constraints: usize) -> Self {
        Self {
            number_variables: capacity_variables,
            number_constraints,
            primals: vec![0.0; capacity_variables],
            multipliers: Multipliers::new(capacity_variables, number_constraints),
            objective_multiplier: 1.0,
            subproblem_objective: 0.0,
            norm: 0.0,
            active_set: ActiveSet::default(),
            constraint_partition: None,
            status: SubproblemStatus::Optimal,
        }
    }

    /// Reset for a fresh solve of `number_variables` x `number_constraints`.
    pub fn set_dimensions(&mut self, number_variables: usize, number_constraints: usize) {
        assert!(number_variables <= self.primals.len());
        self.number_variables = number_variables;
        self.number_constraints = number_constraints;
        self.primals.fill(0.0);
        self.multipliers.constraints.resize(number_constraints, 0.0);
        self.multipliers.constraints.fill(0.0);
        self.multipliers.lower_bounds.fill(0.0);
        self.multipliers.upper_bounds.fill(0.0);
        self.subproblem_objective = 0.0;
        self.norm = 0.0;
        self.active_set.clear();
        self.constraint_partition = None;
        self.status = SubproblemStatus::Optimal;
    }

    /// Recompute the cached infinity norm of the primal step.
    pub fn update_norm(&mut self) {
        self.norm = norm_inf(&self.primals[..self.number_variables]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_norm() {
        let mut direction = Direction::new(3, 0);
        direction.primals[0] = 1.0;
        direction.primals[1] = -2.5;
        direction.update_norm();
        assert_eq!(direction.norm, 2.5);
    }

    #[test]
    fn test_set_dimensions_clears_state(){
        let mut direction = Direction::new(3, 2);
        direction.primals[2] = 4.0;
        direction.active_set.bounds.at_lower_bound.push(1);
        direction.set_dimensions(2, 2);
        assert_eq!(direction.primals, vec![0.0; 3]);
        assert!(direction.active_set.bounds.at_lower_bound.is_empty());
    }
}
