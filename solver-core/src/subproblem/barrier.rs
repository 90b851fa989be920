//! Barrier parameter update (Eq. 7 of the Ipopt paper).
//!
//! After each accepted iterate, mu is driven down as long as the scaled
//! primal-dual error of the barrier subproblem is below k_epsilon * mu,
//! superlinearly near the solution (mu^theta) and never below a fraction of
//! the convergence tolerance.

use crate::iterate::Iterate;
use crate::reform::OptimizationProblem;

#[derive(Debug, Clone, Copy)]
pub struct BarrierParameters {
    pub k_mu: f64,
    pub theta_mu: f64,
    pub k_epsilon: f64,
    pub update_fraction: f64,
}

/// Scaled primal-dual error of the barrier subproblem at the current
/// iterate, for the problem view the subproblem is solving.
#[derive(Debug, Clone, Copy)]
pub struct BarrierErrorComponents {
    pub scaled_stationarity: f64,
    pub infeasibility: f64,
    pub scaled_complementarity: f64,
    pub complementarity_scaling: f64,
}

pub struct BarrierParameterUpdate {
    barrier_parameter: f64,
    tolerance: f64,
    parameters: BarrierParameters,
}

impl BarrierParameterUpdate {
    pub fn new(initial_parameter: f64, tolerance: f64, parameters: BarrierParameters) -> Self {
        Self {
            barrier_parameter: initial_parameter,
            tolerance,
            parameters,
        }
    }

    pub fn barrier_parameter(&self) -> f64 {
        self.barrier_parameter
    }

    pub fn set_barrier_parameter(&mut self, value: f64) {
        assert!(value >= 0.0, "the barrier parameter must be nonnegative");
        self.barrier_parameter = value;
    }

    /// Drive mu down while the barrier subproblem is solved to its own
    /// accuracy. Returns true if mu changed.
    ///
    /// The error components describe the problem the barrier method is
    /// currently working on (the relaxed problem during restoration), so the
    /// caller supplies them rather than this type reading the iterate's
    /// residuals directly.
    pub fn update(
        &mut self,
        problem: &dyn OptimizationProblem,
        iterate: &Iterate,
        error: BarrierErrorComponents,
    ) -> bool {
        let scaled_stationarity = error.scaled_stationarity;
        let mut primal_dual_error = scaled_stationarity
            .max(error.infeasibility)
            .max(error.scaled_complementarity);

        let tolerance_fraction = self.tolerance / self.parameters.update_fraction;
        let mut updated = false;
        while primal_dual_error <= self.parameters.k_epsilon * self.barrier_parameter
            && tolerance_fraction < self.barrier_parameter
        {
            self.barrier_parameter = tolerance_fraction.max(
                (self.parameters.k_mu * self.barrier_parameter)
                    .min(self.barrier_parameter.powf(self.parameters.theta_mu)),
            );
            updated = true;
            let shifted_complementarity =
                compute_shifted_complementarity_error(problem, iterate, self.barrier_parameter)
                    / error.complementarity_scaling;
            primal_dual_error = scaled_stationarity
                .max(error.infeasibility)
                .max(shifted_complementarity);
        }
        updated
    }
}

/// Worst bound complementarity product, shifted by `shift_value`:
/// `max_i |z_i (x_i - bound_i) - shift|` over the active bound multipliers.
pub fn compute_shifted_complementarity_error(
    problem: &dyn OptimizationProblem,
    iterate: &Iterate,
    shift_value: f64,
) -> f64 {
    let mut error: f64 = 0.0;
    for i in 0..problem.number_variables() {
        let z_lower = iterate.multipliers.lower_bounds[i];
        if z_lower > 0.0 {
            let slack = iterate.primals[i] - problem.variable_lower_bound(i);
            error = error.max((z_lower * slack - shift_value).abs());
        }
        let z_upper = iterate.multipliers.upper_bounds[i];
        if z_upper < 0.0 {
            let slack = iterate.primals[i] - problem.variable_upper_bound(i);
            error = error.max((z_upper * slack - shift_value).abs());
        }
    }
    error
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvaluationError;
    use crate::linalg::sparse::{JacobianRows, SparseSymmetric, SparseVector};
    use crate::model::Model;
    use crate::reform::OriginalProblem;

    struct BoxedModel;

    impl Model for BoxedModel {
        fn number_variables(&self) -> usize {
            1
        }
        fn number_constraints(&self) -> usize {
            0
        }
        fn variable_lower_bound(&self, _i: usize) -> f64 {
            0.0
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
            x[0] = 1.0;
        }
    }

    fn parameters() -> BarrierParameters {
        BarrierParameters {
            k_mu: 0.2,
            theta_mu: 1.5,
            k_epsilon: 10.0,
            update_fraction: 10.0,
        }
    }

    #[test]
    fn test_no_update_while_error_large() {
        let model = BoxedModel;
        let problem = OriginalProblem::new(&model);
        let mut update = BarrierParameterUpdate::new(0.1, 1e-8, parameters());
        let iterate = Iterate::new(1, 1, 0);
        let error = BarrierErrorComponents {
            scaled_stationarity: f64::INFINITY,
            infeasibility: f64::INFINITY,
            scaled_complementarity: f64::INFINITY,
            complementarity_scaling: 1.0,
        };
        assert!(!update.update(&problem, &iterate, error));
        assert_eq!(update.barrier_parameter(), 0.1);
    }

    #[test]
    fn test_update_drives_mu_down() {
        let model = BoxedModel;
        let problem = OriginalProblem::new(&model);
        let mut update = BarrierParameterUpdate::new(0.1, 1e-8, parameters());
        let mut iterate = Iterate::new(1, 1, 0);
        iterate.primals[0] = 0.1;
        iterate.multipliers.lower_bounds[0] = 1.0;
        // a barrier-converged iterate: tiny error
        let error = BarrierErrorComponents {
            scaled_stationarity: 1e-12,
            infeasibility: 0.0,
            scaled_complementarity: 1e-12,
            complementarity_scaling: 1.0,
        };

        assert!(update.update(&problem, &iterate, error));
        let mu = update.barrier_parameter();
        assert!(mu < 0.1, "mu should have decreased, got {mu}");
        // mu respects the floor tolerance / update_fraction
        assert!(mu >= 1e-9);
    }

    #[test]
    fn test_shifted_complementarity() {
        let model = BoxedModel;
        let problem = OriginalProblem::new(&model);
        let mut iterate = Iterate::new(1, 1, 0);
        iterate.primals[0] = 0.5;
        iterate.multipliers.lower_bounds[0] = 0.2;
        // z * (x - lb) = 0.1; shifted by 0.04 -> 0.06
        let error = compute_shifted_complementarity_error(&problem, &iterate, 0.04);
        assert!((error - 0.06).abs() < 1e-12);
    }
}
