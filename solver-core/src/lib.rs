//! A nonlinear programming solver core.
//!
//! Solves smooth problems of the form
//!
//! ```text
//! minimize    f(x)
//! subject to  c_L <= c(x) <= c_U
//!             x_L <= x <= x_U
//! ```
//!
//! given a [`Model`] supplying values, gradients and Hessians. The solver is
//! the composition of four independently selectable ingredients:
//!
//! - a **subproblem** producing a primal-dual direction at each iterate
//!   (primal-dual interior point, or active-set LP/QP through an external
//!   backend),
//! - a **globalization strategy** deciding whether a trial point is
//!   acceptable (l1 merit, filter, or funnel),
//! - a **globalization mechanism** turning directions and acceptance into
//!   iterate updates (backtracking line search or trust region),
//! - a **constraint relaxation** layer switching between the original
//!   problem and its l1-relaxed feasibility counterpart.
//!
//! # Example
//!
//! ```ignore
//! use solver_core::{minimize, Model, Options};
//!
//! let options = Options::default();
//! let report = minimize(Box::new(MyModel), &options)?;
//! println!("status: {}", report.status);
//! println!("x = {:?}", &report.iterate.primals[..report.number_variables]);
//! ```

#![warn(clippy::all)]
#![allow(clippy::too_many_arguments)] // interior-point kernels carry many knobs

pub mod direction;
pub mod driver;
pub mod error;
pub mod hessian;
pub mod iterate;
pub mod linalg;
pub mod mechanism;
pub mod model;
pub mod options;
pub mod reform;
pub mod relaxation;
pub mod residuals;
pub mod statistics;
pub mod strategy;
pub mod subproblem;

pub use direction::{Direction, SubproblemStatus};
pub use driver::{Driver, SolveReport};
pub use error::{EvaluationError, SolverError, SolverResult};
pub use iterate::{Iterate, Multipliers, OptimalityMeasure, ProgressMeasures};
pub use model::{CountingModel, Model, ScaledModel, SlackModel};
pub use options::{
    HessianKind, MechanismKind, Options, RelaxationKind, SparseFormat, StrategyKind,
    SubproblemKind,
};
pub use residuals::{PrimalDualResiduals, TerminationStatus};
pub use statistics::Statistics;

use mechanism::{BacktrackingLineSearch, GlobalizationMechanism, TrustRegionMechanism};
use relaxation::FeasibilityRestoration;
use strategy::{
    FilterMethod, FilterVariant, FunnelMethod, FunnelPhase, GlobalizationStrategy,
    L1MeritStrategy,
};
use subproblem::active_set::{LpSubproblem, QpSubproblem};
use subproblem::qp::QpSolver;
use subproblem::{InteriorPointSubproblem, Subproblem};

/// Solve a model with the configured ingredients.
///
/// The interior-point subproblem is self-contained; configurations selecting
/// the LP/QP subproblems need a backend and must go through
/// [`minimize_with_qp_solver`].
pub fn minimize(model: Box<dyn Model>, options: &Options) -> SolverResult<SolveReport> {
    options.validate()?;
    match options.subproblem {
        SubproblemKind::PrimalDualInteriorPoint => {}
        SubproblemKind::Qp | SubproblemKind::Lp => {
            return Err(SolverError::InvalidOptions(format!(
                "QP solver \"{}\" is not available in this build; pass a backend through \
                 minimize_with_qp_solver",
                options.qp_solver
            )));
        }
    }
    let model = CountingModel::new(reformulate_model(model, options)?);

    let n = model.number_variables();
    let m = model.number_constraints();
    let capacity_variables = n + 2 * m;
    let subproblem: Box<dyn Subproblem> = Box::new(InteriorPointSubproblem::new(
        capacity_variables,
        m,
        model.number_hessian_nonzeros() + capacity_variables,
        options,
    ));
    run(&model, options, subproblem)
}

/// Solve with an active-set subproblem and the given LP/QP backend.
pub fn minimize_with_qp_solver(
    model: Box<dyn Model>,
    options: &Options,
    backend: Box<dyn QpSolver>,
) -> SolverResult<SolveReport> {
    options.validate()?;
    let model = CountingModel::new(reformulate_model(model, options)?);

    let n = model.number_variables();
    let m = model.number_constraints();
    let capacity_variables = n + 2 * m;
    let subproblem: Box<dyn Subproblem> = match options.subproblem {
        SubproblemKind::Qp => Box::new(QpSubproblem::new(
            capacity_variables,
            m,
            model.number_hessian_nonzeros() + capacity_variables,
            backend,
            options,
        )),
        SubproblemKind::Lp => Box::new(LpSubproblem::new(capacity_variables, m, backend)),
        SubproblemKind::PrimalDualInteriorPoint => {
            return Err(SolverError::InvalidOptions(
                "the interior-point subproblem does not take an LP/QP backend".to_string(),
            ));
        }
    };
    run(&model, options, subproblem)
}

/// Scaling and (for the barrier subproblem) slack reformulation.
fn reformulate_model(model: Box<dyn Model>, options: &Options) -> SolverResult<Box<dyn Model>> {
    let mut initial_point = vec![0.0; model.number_variables()];
    model.initial_primals(&mut initial_point);
    let mut model: Box<dyn Model> = Box::new(ScaledModel::new(
        model,
        &initial_point,
        options.scaling_gradient_threshold,
        options.scale_functions,
    )?);
    if options.subproblem == SubproblemKind::PrimalDualInteriorPoint {
        // the barrier method needs equality constraints plus bounds
        model = Box::new(SlackModel::new(model));
    }
    Ok(model)
}

fn build_strategy(options: &Options, phase: FunnelPhase) -> Box<dyn GlobalizationStrategy> {
    match options.globalization_strategy {
        StrategyKind::L1Merit => Box::new(L1MeritStrategy::new(options)),
        StrategyKind::FletcherFilter => {
            Box::new(FilterMethod::new(FilterVariant::Fletcher, options))
        }
        StrategyKind::WaechterFilter => {
            Box::new(FilterMethod::new(FilterVariant::Waechter, options))
        }
        StrategyKind::Funnel => Box::new(FunnelMethod::new(phase, options)),
    }
}

fn run(
    model: &CountingModel,
    options: &Options,
    subproblem: Box<dyn Subproblem>,
) -> SolverResult<SolveReport> {
    let n = model.number_variables();
    let m = model.number_constraints();
    let capacity_variables = n + 2 * m;

    let mut iterate = Iterate::new(capacity_variables, n, m);
    model.initial_primals(&mut iterate.primals[..n]);
    model.initial_duals(&mut iterate.multipliers.constraints);

    let optimality_strategy = build_strategy(options, FunnelPhase::Optimality);
    let restoration_strategy = build_strategy(options, FunnelPhase::Restoration);
    let relaxation = Box::new(FeasibilityRestoration::new(
        model,
        subproblem,
        optimality_strategy,
        restoration_strategy,
        options,
    ));
    let mechanism: Box<dyn GlobalizationMechanism + '_> = match options.globalization_mechanism {
        MechanismKind::LineSearch => Box::new(BacktrackingLineSearch::new(relaxation, options)),
        MechanismKind::TrustRegion => Box::new(TrustRegionMechanism::new(relaxation, options)),
    };

    let mut statistics = Statistics::new(options.statistics_print_header_every_iterations);
    let mut driver = Driver::new(mechanism, options);
    let (iterate, iterations, solve_time_seconds) =
        driver.solve(&mut statistics, model, iterate)?;

    if let Some(path) = &options.statistics_json_file {
        if let Err(error) = std::fs::write(path, statistics.to_json()) {
            eprintln!("warning: could not write the statistics record: {error}");
        }
    }

    let counts = model.counts();
    let status = iterate.status;
    Ok(SolveReport {
        status,
        number_variables: n,
        number_constraints: m,
        iterations,
        solve_time_seconds,
        objective_evaluations: counts.objective,
        constraint_evaluations: counts.constraints,
        objective_gradient_evaluations: counts.objective_gradient,
        jacobian_evaluations: counts.jacobian,
        hessian_evaluations: driver.hessian_evaluation_count(),
        subproblems_solved: driver.number_subproblems_solved(),
        iterate,
    })
}
