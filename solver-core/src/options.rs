//! Solver configuration.
//!
//! All recognised keys live on one typed struct with defaults; strategy
//! names are parsed into enums and rejected at construction time, so a
//! running solve never sees an unknown configuration.

use crate::error::{SolverError, SolverResult};
use crate::linalg::Norm;

/// Top-level algorithm selection: how the subproblem is solved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubproblemKind {
    /// Linear program over the linearized constraints (no Hessian)
    Lp,
    /// Quadratic program with the (convexified) Lagrangian Hessian
    Qp,
    /// Primal-dual interior-point (barrier) method
    PrimalDualInteriorPoint,
}

/// Step acceptance strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    L1Merit,
    FletcherFilter,
    WaechterFilter,
    Funnel,
}

/// Globalization mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MechanismKind {
    TrustRegion,
    LineSearch,
}

/// Constraint relaxation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelaxationKind {
    FeasibilityRestoration,
}

/// Hessian models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HessianKind {
    Exact,
}

/// Symmetric-matrix storage handed to the subproblem collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SparseFormat {
    Coo,
    Csc,
}

/// Recognised configuration keys and their defaults.
#[derive(Debug, Clone)]
pub struct Options {
    // driver
    pub max_iterations: usize,
    /// seconds
    pub time_limit: f64,
    pub verbose: bool,

    // convergence
    pub tolerance: f64,
    pub loose_tolerance: f64,
    pub loose_tolerance_consecutive_iteration_threshold: usize,
    pub progress_norm: Norm,
    pub unbounded_objective_threshold: f64,

    // sufficient decrease
    pub armijo_decrease_fraction: f64,
    pub armijo_tolerance: f64,

    // algorithm selection
    pub subproblem: SubproblemKind,
    pub globalization_strategy: StrategyKind,
    pub globalization_mechanism: MechanismKind,
    pub constraint_relaxation_strategy: RelaxationKind,
    pub hessian_model: HessianKind,
    pub sparse_format: SparseFormat,
    pub linear_solver: String,
    pub qp_solver: String,
    pub lp_solver: String,
    pub bqpd_kmax: usize,

    // preprocessing
    pub scale_functions: bool,
    pub scaling_gradient_threshold: f64,

    // Hessian/augmented-system regularization
    pub regularization_initial_value: f64,
    pub regularization_increase_factor: f64,

    // barrier subproblem
    pub barrier_initial_parameter: f64,
    pub barrier_k_mu: f64,
    pub barrier_theta_mu: f64,
    pub barrier_k_epsilon: f64,
    pub barrier_update_fraction: f64,
    pub barrier_k_sigma: f64,
    pub barrier_tau_min: f64,
    pub barrier_default_multiplier: f64,
    pub barrier_regularization_exponent: f64,
    pub barrier_small_direction_factor: f64,
    pub barrier_push_variable_to_interior_k1: f64,
    pub barrier_push_variable_to_interior_k2: f64,
    pub barrier_damping_factor: f64,
    pub least_square_multiplier_max_norm: f64,

    // funnel strategy
    pub funnel_kappa_initial_upper_bound: f64,
    pub funnel_kappa_initial_multiplication: f64,
    pub funnel_delta: f64,
    pub funnel_kappa_infeasibility_1: f64,
    pub funnel_kappa_infeasibility_2: f64,
    pub funnel_beta: f64,
    pub funnel_gamma: f64,
    pub funnel_switching_infeasibility_exponent: f64,

    // filter strategy
    pub filter_capacity: usize,
    pub filter_beta: f64,
    pub filter_gamma: f64,
    pub filter_delta: f64,
    pub filter_switching_infeasibility_exponent: f64,
    pub filter_kappa_initial_upper_bound: f64,
    pub filter_kappa_initial_multiplication: f64,

    // trust-region mechanism
    pub trust_region_initial_radius: f64,
    pub trust_region_minimum_radius: f64,
    pub trust_region_maximum_radius: f64,
    pub trust_region_contraction_factor: f64,
    pub trust_region_expansion_factor: f64,
    pub trust_region_good_ratio_threshold: f64,
    pub trust_region_activity_tolerance: f64,

    // line-search mechanism
    pub line_search_backtracking_ratio: f64,
    pub line_search_minimum_step_length: f64,

    // statistics
    pub statistics_print_header_every_iterations: usize,
    pub statistics_iteration_column_order: i32,
    pub statistics_objective_column_order: i32,
    pub statistics_infeasibility_column_order: i32,
    pub statistics_phase_column_order: i32,
    pub statistics_step_norm_column_order: i32,
    pub statistics_mechanism_column_order: i32,
    pub statistics_barrier_parameter_column_order: i32,
    pub statistics_funnel_width_column_order: i32,
    /// path for the serialized per-iteration record, if any
    pub statistics_json_file: Option<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_iterations: 500,
            time_limit: f64::INFINITY,
            verbose: false,

            tolerance: 1e-8,
            loose_tolerance: 1e-6,
            loose_tolerance_consecutive_iteration_threshold: 15,
            progress_norm: Norm::L1,
            unbounded_objective_threshold: -1e20,

            armijo_decrease_fraction: 1e-4,
            armijo_tolerance: 1e-9,

            subproblem: SubproblemKind::PrimalDualInteriorPoint,
            globalization_strategy: StrategyKind::Funnel,
            globalization_mechanism: MechanismKind::LineSearch,
            constraint_relaxation_strategy: RelaxationKind::FeasibilityRestoration,
            hessian_model: HessianKind::Exact,
            sparse_format: SparseFormat::Csc,
            linear_solver: "ldl".to_string(),
            qp_solver: "none".to_string(),
            lp_solver: "none".to_string(),
            bqpd_kmax: 500,

            scale_functions: false,
            scaling_gradient_threshold: 100.0,

            regularization_initial_value: 1e-4,
            regularization_increase_factor: 8.0,

            barrier_initial_parameter: 0.1,
            barrier_k_mu: 0.2,
            barrier_theta_mu: 1.5,
            barrier_k_epsilon: 10.0,
            barrier_update_fraction: 10.0,
            barrier_k_sigma: 1e10,
            barrier_tau_min: 0.99,
            barrier_default_multiplier: 1.0,
            barrier_regularization_exponent: 0.25,
            barrier_small_direction_factor: 10.0,
            barrier_push_variable_to_interior_k1: 1e-2,
            barrier_push_variable_to_interior_k2: 1e-2,
            barrier_damping_factor: 1e-5,
            least_square_multiplier_max_norm: 1e3,

            funnel_kappa_initial_upper_bound: 1.0,
            funnel_kappa_initial_multiplication: 100.0,
            funnel_delta: 0.9999,
            funnel_kappa_infeasibility_1: 0.9,
            funnel_kappa_infeasibility_2: 0.1,
            funnel_beta: 0.9999,
            funnel_gamma: 0.001,
            funnel_switching_infeasibility_exponent: 2.0,

            filter_capacity: 50,
            filter_beta: 0.999,
            filter_gamma: 0.001,
            filter_delta: 0.9999,
            filter_switching_infeasibility_exponent: 2.0,
            filter_kappa_initial_upper_bound: 1.0,
            filter_kappa_initial_multiplication: 100.0,

            trust_region_initial_radius: 10.0,
            trust_region_minimum_radius: 1e-16,
            trust_region_maximum_radius: 1e8,
            trust_region_contraction_factor: 0.5,
            trust_region_expansion_factor: 2.0,
            trust_region_good_ratio_threshold: 0.75,
            trust_region_activity_tolerance: 1e-10,

            line_search_backtracking_ratio: 0.5,
            line_search_minimum_step_length: 1e-12,

            statistics_print_header_every_iterations: 15,
            statistics_iteration_column_order: 1,
            statistics_objective_column_order: 100,
            statistics_infeasibility_column_order: 101,
            statistics_phase_column_order: 3,
            statistics_step_norm_column_order: 50,
            statistics_mechanism_column_order: 40,
            statistics_barrier_parameter_column_order: 60,
            statistics_funnel_width_column_order: 61,
            statistics_json_file: None,
        }
    }
}

impl Options {
    /// Reject inconsistent configurations. Called once at construction; the
    /// running solver assumes a validated configuration.
    pub fn validate(&self) -> SolverResult<()> {
        fn positive(name: &str, value: f64) -> SolverResult<()> {
            if value > 0.0 {
                Ok(())
            } else {
                Err(SolverError::InvalidOptions(format!(
                    "{name} must be positive, got {value}"
                )))
            }
        }
        fn in_unit_interval(name: &str, value: f64) -> SolverResult<()> {
            if 0.0 < value && value < 1.0 {
                Ok(())
            } else {
                Err(SolverError::InvalidOptions(format!(
                    "{name} must lie in (0, 1), got {value}"
                )))
            }
        }

        positive("tolerance", self.tolerance)?;
        positive("loose_tolerance", self.loose_tolerance)?;
        positive("barrier_initial_parameter", self.barrier_initial_parameter)?;
        positive("regularization_initial_value", self.regularization_initial_value)?;
        positive("armijo_decrease_fraction", self.armijo_decrease_fraction)?;
        if self.regularization_increase_factor <= 1.0 {
            return Err(SolverError::InvalidOptions(format!(
                "regularization_increase_factor must exceed 1, got {}",
                self.regularization_increase_factor
            )));
        }
        in_unit_interval("barrier_k_mu", self.barrier_k_mu)?;
        if !(1.0 < self.barrier_theta_mu && self.barrier_theta_mu < 2.0) {
            return Err(SolverError::InvalidOptions(format!(
                "barrier_theta_mu must lie in (1, 2), got {}",
                self.barrier_theta_mu
            )));
        }
        in_unit_interval("funnel_kappa_infeasibility_1", self.funnel_kappa_infeasibility_1)?;
        in_unit_interval("funnel_kappa_infeasibility_2", self.funnel_kappa_infeasibility_2)?;
        in_unit_interval("funnel_beta", self.funnel_beta)?;
        positive("funnel_gamma", self.funnel_gamma)?;
        in_unit_interval("filter_beta", self.filter_beta)?;
        in_unit_interval("trust_region_contraction_factor", self.trust_region_contraction_factor)?;
        if self.trust_region_expansion_factor <= 1.0 {
            return Err(SolverError::InvalidOptions(format!(
                "trust_region_expansion_factor must exceed 1, got {}",
                self.trust_region_expansion_factor
            )));
        }
        in_unit_interval("line_search_backtracking_ratio", self.line_search_backtracking_ratio)?;
        if self.linear_solver != "ldl" {
            return Err(SolverError::InvalidOptions(format!(
                "unknown linear_solver \"{}\" (available: ldl)",
                self.linear_solver
            )));
        }
        if self.subproblem == SubproblemKind::PrimalDualInteriorPoint
            && self.globalization_mechanism == MechanismKind::TrustRegion
        {
            return Err(SolverError::InvalidOptions(
                "the interior-point subproblem requires the line-search mechanism".to_string(),
            ));
        }
        if self.statistics_print_header_every_iterations == 0 {
            return Err(SolverError::InvalidOptions(
                "statistics_print_header_every_iterations must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Options::default().validate().is_ok());
    }

    #[test]
    fn test_nonpositive_tolerance_rejected() {
        let options = Options {
            tolerance: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            options.validate(),
            Err(SolverError::InvalidOptions(_))
        ));
    }

    #[test]
    fn test_unknown_linear_solver_rejected() {
        let options = Options {
            linear_solver: "ma57".to_string(),
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_interior_point_needs_line_search() {
        let options = Options {
            globalization_mechanism: MechanismKind::TrustRegion,
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }
}
