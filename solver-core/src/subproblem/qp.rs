//! The LP/QP collaborator boundary.
//!
//! The active-set subproblems delegate the actual LP/QP solve to an external
//! backend behind this trait. The interface is 0-based and typed: backends
//! wrapping Fortran codes translate their index conventions and in-place
//! buffers internally and never leak them upward.

use crate::direction::SubproblemStatus;
use crate::error::SolverResult;
use crate::linalg::sparse::{Interval, JacobianRows, SparseSymmetric, SparseVector};

/// Warm-start mode requested from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QpWarmstartMode {
    /// Build the active set from scratch
    Cold,
    /// Keep the active-set estimate and the Jacobian factorization
    ReuseActiveSetAndJacobian,
    /// Backend's own heuristic (typically: keep the active-set estimate)
    UserDefined,
}

/// One LP/QP instance over the displacement variables.
pub struct QpProblem<'a> {
    pub number_variables: usize,
    pub number_constraints: usize,
    /// bounds of the variable displacements (trust region already folded in)
    pub variable_bounds: &'a [Interval],
    /// bounds of the linearized constraints
    pub constraint_bounds: &'a [Interval],
    pub linear_objective: &'a SparseVector,
    pub constraint_jacobian: &'a JacobianRows,
    /// QP only; None for LPs
    pub hessian: Option<&'a SparseSymmetric>,
    pub initial_point: &'a [f64],
    pub warmstart: QpWarmstartMode,
}

/// Which side of a row (variable or constraint) is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveSide {
    Lower,
    Upper,
}

/// A row of the solution's active set.
#[derive(Debug, Clone, Copy)]
pub struct ActiveRow {
    /// `0..n` are variables, `n..n+m` are constraints
    pub index: usize,
    pub side: ActiveSide,
    /// nonnegative multiplier magnitude
    pub multiplier: f64,
}

/// Typed solution returned by a backend.
pub struct QpSolution {
    pub primals: Vec<f64>,
    pub objective: f64,
    pub status: SubproblemStatus,
    pub active_rows: Vec<ActiveRow>,
    /// distance of each row (variables then constraints) to its nearest
    /// bound; negative means the row is infeasible in the subproblem
    pub residuals: Vec<f64>,
}

/// An LP/QP solver backend.
pub trait QpSolver {
    fn solve(&mut self, problem: &QpProblem) -> SolverResult<QpSolution>;
}
