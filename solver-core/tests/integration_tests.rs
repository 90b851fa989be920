//! End-to-end scenarios through the public API, with the default
//! configuration (interior-point subproblem, funnel strategy, backtracking
//! line search, feasibility restoration).

use solver_bench::test_problems::{
    BoundActiveQuadratic, CircleEquality, ConvexQuadratic, InfeasibleBox, Rosenbrock,
    UnboundedLinear,
};
use solver_core::{minimize, Options, StrategyKind, TerminationStatus};

fn default_options() -> Options {
    Options {
        max_iterations: 200,
        ..Default::default()
    }
}

#[test]
fn test_unconstrained_quadratic() {
    // min (1/2)(x1^2 + x2^2) from (10, 10): one Newton step to the origin
    let options = Options {
        max_iterations: 15,
        ..default_options()
    };
    let report = minimize(Box::new(ConvexQuadratic), &options).expect("solve failed");

    assert_eq!(report.status, TerminationStatus::FeasibleKktPoint);
    assert!(report.iterations <= 15);
    let x = &report.iterate.primals;
    assert!(x[0].abs() <= 1e-6, "x1 = {}", x[0]);
    assert!(x[1].abs() <= 1e-6, "x2 = {}", x[1]);
    assert!(report.iterate.evaluations.objective.abs() <= 1e-8);
}

#[test]
fn test_equality_constrained_circle() {
    // min x1 + x2 on the circle of radius sqrt(2). The first-order points
    // are (+-1, +-1) with multiplier +-1/2 (the minimizer is (-1, -1) with
    // lambda = -1/2, objective -2); the solver must land on one of them with
    // the KKT conditions satisfied to tolerance.
    let report =
        minimize(Box::new(CircleEquality), &default_options()).expect("solve failed");

    assert_eq!(report.status, TerminationStatus::FeasibleKktPoint);
    let x = &report.iterate.primals;
    let lambda = report.iterate.multipliers.constraints[0];
    // primal feasibility
    assert!((x[0] * x[0] + x[1] * x[1] - 2.0).abs() <= 1e-6, "x = ({}, {})", x[0], x[1]);
    // stationarity: grad f = lambda grad c componentwise
    assert!((1.0 - 2.0 * lambda * x[0]).abs() <= 1e-5, "lambda = {lambda}, x1 = {}", x[0]);
    assert!((1.0 - 2.0 * lambda * x[1]).abs() <= 1e-5, "lambda = {lambda}, x2 = {}", x[1]);
    // the two stationary objectives are -2 and +2
    assert!(
        (report.iterate.evaluations.objective.abs() - 2.0).abs() <= 1e-5,
        "objective = {}",
        report.iterate.evaluations.objective
    );
}

#[test]
fn test_inequality_with_active_bound() {
    // min x^2 with x >= 1: the bound is active, with dual f'(1) = 2
    let report =
        minimize(Box::new(BoundActiveQuadratic), &default_options()).expect("solve failed");

    assert_eq!(report.status, TerminationStatus::FeasibleKktPoint);
    let x = report.iterate.primals[0];
    assert!((x - 1.0).abs() <= 1e-5, "x = {x}");
    assert!((report.iterate.evaluations.objective - 1.0).abs() <= 1e-5);
    let bound_dual = report.iterate.multipliers.lower_bounds[0];
    assert!((bound_dual - 2.0).abs() <= 1e-3, "z_L = {bound_dual}");
}

#[test]
fn test_infeasible_problem_finds_stationary_violation() {
    // x >= 2 and x <= 1 cannot both hold; the restoration phase converges to
    // a stationary point of the violation with total violation >= 1
    let report = minimize(Box::new(InfeasibleBox), &default_options()).expect("solve failed");

    assert_eq!(report.status, TerminationStatus::InfeasibleStationaryPoint);
    assert!(
        report.iterate.residuals.infeasibility >= 0.5,
        "infeasibility = {}",
        report.iterate.residuals.infeasibility
    );
}

#[test]
fn test_unbounded_objective() {
    let options = Options {
        max_iterations: 40,
        unbounded_objective_threshold: -1e9,
        ..default_options()
    };
    let report = minimize(Box::new(UnboundedLinear), &options).expect("solve failed");

    assert_eq!(report.status, TerminationStatus::Unbounded);
    assert!(report.iterate.evaluations.objective < -1e9);
}

#[test]
fn test_rosenbrock() {
    // the classical banana valley from (-1.2, 1)
    let options = Options {
        max_iterations: 40,
        ..default_options()
    };
    let report = minimize(Box::new(Rosenbrock), &options).expect("solve failed");

    assert_eq!(report.status, TerminationStatus::FeasibleKktPoint);
    assert!(report.iterations <= 40, "iterations = {}", report.iterations);
    let x = &report.iterate.primals;
    assert!((x[0] - 1.0).abs() <= 1e-5, "x1 = {}", x[0]);
    assert!((x[1] - 1.0).abs() <= 1e-5, "x2 = {}", x[1]);
    assert!(report.iterate.evaluations.objective <= 1e-8);
}

#[test]
fn test_rosenbrock_with_waechter_filter() {
    // the same valley under the filter strategy
    let options = Options {
        max_iterations: 60,
        globalization_strategy: StrategyKind::WaechterFilter,
        ..default_options()
    };
    let report = minimize(Box::new(Rosenbrock), &options).expect("solve failed");

    assert_eq!(report.status, TerminationStatus::FeasibleKktPoint);
    let x = &report.iterate.primals;
    assert!((x[0] - 1.0).abs() <= 1e-5);
    assert!((x[1] - 1.0).abs() <= 1e-5);
}

#[test]
fn test_evaluation_counts_reported() {
    let report =
        minimize(Box::new(ConvexQuadratic), &default_options()).expect("solve failed");
    assert!(report.objective_evaluations > 0);
    assert!(report.objective_gradient_evaluations > 0);
    assert!(report.hessian_evaluations > 0);
    assert!(report.subproblems_solved > 0);
    assert!(report.solve_time_seconds >= 0.0);
}

#[test]
fn test_qp_subproblem_requires_backend() {
    let options = Options {
        subproblem: solver_core::SubproblemKind::Qp,
        globalization_mechanism: solver_core::MechanismKind::TrustRegion,
        globalization_strategy: StrategyKind::FletcherFilter,
        ..default_options()
    };
    let error = minimize(Box::new(ConvexQuadratic), &options).unwrap_err();
    assert!(matches!(error, solver_core::SolverError::InvalidOptions(_)));
}
