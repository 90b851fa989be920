//! Primal-dual iterates and their cached evaluations.
//!
//! An [`Iterate`] bundles the point `(x, lambda, z_L, z_U)` with the model
//! evaluations at that point. Evaluations are lazy: each cached quantity has
//! an is-computed flag, the first read triggers the oracle and sets the flag,
//! and assembling a trial iterate at a new point clears the flags.

use crate::error::EvaluationError;
use crate::linalg::norm::norm_1;
use crate::linalg::sparse::{JacobianRows, SparseVector};
use crate::model::Model;
use crate::residuals::{PrimalDualResiduals, TerminationStatus};

/// Constraint, lower-bound and upper-bound multipliers, plus the objective
/// multiplier rho (0 while solving the feasibility problem).
///
/// Sign convention: `z_L >= 0`, `z_U <= 0`, and the Lagrangian gradient is
/// `rho grad f - J^T lambda - z_L - z_U`.
#[derive(Debug, Clone)]
pub struct Multipliers {
    pub constraints: Vec<f64>,
    pub lower_bounds: Vec<f64>,
    pub upper_bounds: Vec<f64>,
    pub objective: f64,
}

impl Multipliers {
    pub fn new(number_variables: usize, number_constraints: usize) -> Self {
        Self {
            constraints: vec![0.0; number_constraints],
            lower_bounds: vec![0.0; number_variables],
            upper_bounds: vec![0.0; number_variables],
            objective: 1.0,
        }
    }

    /// True if some multiplier is larger than `tolerance` in magnitude
    /// (used to tell an FJ point from a trivially stationary one).
    pub fn not_all_zero(&self, number_variables: usize, tolerance: f64) -> bool {
        self.constraints.iter().any(|v| v.abs() > tolerance)
            || self.lower_bounds[..number_variables]
                .iter()
                .chain(self.upper_bounds[..number_variables].iter())
                .any(|v| v.abs() > tolerance)
    }

    /// `||lambda||_1 + ||z_L||_1 + ||z_U||_1` over the active variables.
    pub fn norm_1(&self, number_variables: usize) -> f64 {
        norm_1(&self.constraints)
            + norm_1(&self.lower_bounds[..number_variables])
            + norm_1(&self.upper_bounds[..number_variables])
    }
}

/// Optimality progress parameterized by the objective multiplier.
///
/// The optimality phase measures `rho * f(x)`; the restoration phase
/// measures the (multiplier-independent) constraint violation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OptimalityMeasure {
    Objective(f64),
    Violation(f64),
}

impl OptimalityMeasure {
    pub fn evaluate(&self, objective_multiplier: f64) -> f64 {
        match *self {
            OptimalityMeasure::Objective(value) => objective_multiplier * value,
            OptimalityMeasure::Violation(value) => value,
        }
    }
}

/// The (infeasibility, optimality, auxiliary) progress triple attached to
/// each iterate; also reused for predicted reductions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressMeasures {
    pub infeasibility: f64,
    pub optimality: OptimalityMeasure,
    pub auxiliary: f64,
}

impl ProgressMeasures {
    /// Poisoned measures for dual-only steps, so the strategies never accept
    /// on spurious zero progress.
    pub fn infinite() -> Self {
        Self {
            infeasibility: f64::INFINITY,
            optimality: OptimalityMeasure::Objective(f64::INFINITY),
            auxiliary: f64::INFINITY,
        }
    }

    pub fn is_finite(&self, objective_multiplier: f64) -> bool {
        self.infeasibility.is_finite()
            && self.optimality.evaluate(objective_multiplier).is_finite()
            && !self.auxiliary.is_nan()
    }
}

/// Cached model evaluations at the iterate's point.
#[derive(Debug, Clone)]
pub struct Evaluations {
    pub objective: f64,
    pub constraints: Vec<f64>,
    pub objective_gradient: SparseVector,
    pub constraint_jacobian: JacobianRows,
}

/// A primal-dual point with lazily cached evaluations, progress measures,
/// residuals and termination status.
#[derive(Debug, Clone)]
pub struct Iterate {
    /// Active variable count; grows past the model's `n` when elastic
    /// variables are in play during restoration.
    pub number_variables: usize,
    pub number_constraints: usize,
    pub primals: Vec<f64>,
    pub multipliers: Multipliers,

    pub evaluations: Evaluations,
    pub is_objective_computed: bool,
    pub are_constraints_computed: bool,
    pub is_objective_gradient_computed: bool,
    pub is_constraint_jacobian_computed: bool,

    /// `-J^T lambda - z_L - z_U`, the multiplier part of the Lagrangian
    /// gradient, kept separately so the feasibility stationarity residual can
    /// be read off without the objective contribution.
    pub lagrangian_constraints_contribution: Vec<f64>,

    pub progress: ProgressMeasures,
    pub residuals: PrimalDualResiduals,
    pub status: TerminationStatus,
}

impl Iterate {
    /// Create an iterate with capacity for `capacity_variables` (the model's
    /// variable count plus room for elastic variables).
    pub fn new(capacity_variables: usize, number_variables: usize, number_constraints: usize) -> Self {
        Self {
            number_variables,
            number_constraints,
            primals: vec![0.0; capacity_variables],
            multipliers: Multipliers::new(capacity_variables, number_constraints),
            evaluations: Evaluations {
                objective: f64::INFINITY,
                constraints: vec![0.0; number_constraints],
                objective_gradient: SparseVector::empty(capacity_variables),
                constraint_jacobian: Vec::new(),
            },
            is_objective_computed: false,
            are_constraints_computed: false,
            is_objective_gradient_computed: false,
            is_constraint_jacobian_computed: false,
            lagrangian_constraints_contribution: vec![0.0; capacity_variables],
            progress: ProgressMeasures {
                infeasibility: f64::INFINITY,
                optimality: OptimalityMeasure::Objective(f64::INFINITY),
                auxiliary: 0.0,
            },
            residuals: PrimalDualResiduals::default(),
            status: TerminationStatus::NotOptimal,
        }
    }

    /// Grow or shrink the active variable range (entering or leaving the
    /// elastic reformulation).
    pub fn set_number_variables(&mut self, number_variables: usize) {
        assert!(number_variables <= self.primals.len());
        self.number_variables = number_variables;
    }

    /// Mark every cached evaluation stale (the point changed).
    pub fn invalidate_evaluations(&mut self) {
        self.is_objective_computed = false;
        self.are_constraints_computed = false;
        self.is_objective_gradient_computed = false;
        self.is_constraint_jacobian_computed = false;
    }

    pub fn evaluate_objective(&mut self, model: &dyn Model) -> Result<f64, EvaluationError> {
        if !self.is_objective_computed {
            self.evaluations.objective =
                model.evaluate_objective(&self.primals[..model.number_variables()])?;
            self.is_objective_computed = true;
        }
        Ok(self.evaluations.objective)
    }

    pub fn evaluate_constraints(&mut self, model: &dyn Model) -> Result<(), EvaluationError> {
        if !self.are_constraints_computed {
            self.evaluations.constraints =
                model.evaluate_constraints(&self.primals[..model.number_variables()])?;
            self.are_constraints_computed = true;
        }
        Ok(())
    }

    pub fn evaluate_objective_gradient(
        &mut self,
        model: &dyn Model,
    ) -> Result<(), EvaluationError> {
        if !self.is_objective_gradient_computed {
            self.evaluations.objective_gradient =
                model.evaluate_objective_gradient(&self.primals[..model.number_variables()])?;
            self.is_objective_gradient_computed = true;
        }
        Ok(())
    }

    pub fn evaluate_constraint_jacobian(
        &mut self,
        model: &dyn Model,
    ) -> Result<(), EvaluationError> {
        if !self.is_constraint_jacobian_computed {
            self.evaluations.constraint_jacobian =
                model.evaluate_constraint_jacobian(&self.primals[..model.number_variables()])?;
            self.is_constraint_jacobian_computed = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optimality_measure_scaling() {
        let objective = OptimalityMeasure::Objective(3.0);
        assert_eq!(objective.evaluate(1.0), 3.0);
        assert_eq!(objective.evaluate(0.0), 0.0);
        let violation = OptimalityMeasure::Violation(2.0);
        assert_eq!(violation.evaluate(0.0), 2.0);
    }

    #[test]
    fn test_multipliers_not_all_zero() {
        let mut multipliers = Multipliers::new(2, 1);
        assert!(!multipliers.not_all_zero(2, 1e-8));
        multipliers.lower_bounds[1] = 0.5;
        assert!(multipliers.not_all_zero(2, 1e-8));
    }

    #[test]
    fn test_infinite_progress_is_not_finite() {
        let progress = ProgressMeasures::infinite();
        assert!(!progress.is_finite(1.0));
    }
}
