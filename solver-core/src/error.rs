//! Error types for the solver core.

use thiserror::Error;

/// Faults reported by the model oracles.
///
/// The two categories are handled differently by the globalization
/// mechanisms: a failed function evaluation at a trial point triggers a
/// step-length reduction, while a failed gradient evaluation at the current
/// point abandons the subproblem attempt.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationError {
    /// A numerical error was encountered while evaluating a function
    #[error("a numerical error was encountered while evaluating a function")]
    Function,

    /// A numerical error was encountered while evaluating a gradient
    #[error("a numerical error was encountered while evaluating a gradient")]
    Gradient,
}

/// Errors that can occur while constructing or running the solver.
#[derive(Error, Debug)]
pub enum SolverError {
    /// Configuration rejected at construction time
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// Model oracle failure that no recovery strategy could absorb
    #[error("evaluation failed: {0}")]
    Evaluation(#[from] EvaluationError),

    /// The inertia correction loop diverged
    #[error("the regularization coefficient diverged (reached {0:e})")]
    RegularizationDiverged(f64),

    /// The subproblem solver reported an unrecoverable error
    #[error("the subproblem solver failed: {0}")]
    Subproblem(String),

    /// Linear algebra failure (factorization, ordering)
    #[error("linear solver error: {0}")]
    LinearSolver(#[from] crate::linalg::ldl::LdlError),
}

/// Result type for solver operations.
pub type SolverResult<T> = Result<T, SolverError>;
