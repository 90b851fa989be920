//! Regularized augmented system
//!
//! ```text
//! [ H + delta_w I    J^T          ] [  dx ]   [ rhs_x ]
//! [ J               -delta_c I    ] [ -dl ] = [ rhs_c ]
//! ```
//!
//! assembled in upper-triangle triplet form and factorized with LDL^T. The
//! primal shift `delta_w` is chosen by inertia correction: the factorization
//! must report exactly `n` positive, `m` negative and no zero eigenvalues,
//! the condition under which the interior-point direction is a descent
//! direction. `delta_c` is supplied by the caller (mu^theta for the barrier
//! subproblem, 0 for the least-squares multiplier system).
//!
//! The shift search warm-starts from the previous accepted value, scaled
//! down, so that well-conditioned iterations pay a single factorization.

use super::ldl::{Inertia, LdlSolver};
use super::sparse::{JacobianRows, SparseSymmetric};
use crate::error::{SolverError, SolverResult};

/// Inertia-correction parameters (see `regularization_*` options).
#[derive(Debug, Clone, Copy)]
pub struct RegularizationParameters {
    /// First shift tried after a failure with no history
    pub initial_value: f64,
    /// Growth factor applied on repeated failures
    pub increase_factor: f64,
    /// Shrink factor applied to the warm-started first trial
    pub decrease_factor: f64,
    /// Shift value beyond which the correction is declared divergent
    pub maximum_value: f64,
}

impl Default for RegularizationParameters {
    fn default() -> Self {
        Self {
            initial_value: 1e-4,
            increase_factor: 8.0,
            decrease_factor: 3.0,
            maximum_value: 1e40,
        }
    }
}

// unbounded-loop backstop, far above any correction that can still succeed
const MAX_CORRECTION_ATTEMPTS: usize = 100;

/// Augmented KKT system with inertia-corrected factorization.
pub struct AugmentedSystem {
    matrix: SparseSymmetric,
    pub rhs: Vec<f64>,
    pub solution: Vec<f64>,
    solver: LdlSolver,
    parameters: RegularizationParameters,
    primal_regularization: f64,
    previous_primal_regularization: f64,
    // CSC pattern of the last factorized matrix, for symbolic reuse
    pattern: Option<(Vec<usize>, Vec<usize>)>,
    number_variables: usize,
    number_constraints: usize,
}

impl AugmentedSystem {
    pub fn new(max_dimension: usize, max_nonzeros: usize, parameters: RegularizationParameters) -> Self {
        Self {
            matrix: SparseSymmetric::new(max_dimension, max_nonzeros + 2 * max_dimension),
            rhs: vec![0.0; max_dimension],
            solution: vec![0.0; max_dimension],
            solver: LdlSolver::new(max_dimension),
            parameters,
            primal_regularization: 0.0,
            previous_primal_regularization: 0.0,
            pattern: None,
            number_variables: 0,
            number_constraints: 0,
        }
    }

    /// Shift applied to the (1,1) block by the last factorization.
    pub fn primal_regularization(&self) -> f64 {
        self.primal_regularization
    }

    /// Assemble the system matrix from the Hessian block (upper triangle,
    /// barrier terms already included) and the Jacobian rows.
    ///
    /// Explicit zero diagonal entries are inserted for every row so that the
    /// sparsity pattern does not change as the shifts move, which keeps the
    /// symbolic factorization reusable.
    pub fn assemble(
        &mut self,
        hessian: &SparseSymmetric,
        constraint_jacobian: &JacobianRows,
        number_variables: usize,
        number_constraints: usize,
        dual_regularization: f64,
    ) {
        let dimension = number_variables + number_constraints;
        self.number_variables = number_variables;
        self.number_constraints = number_constraints;
        self.matrix.reset(dimension);

        for (i, j, value) in hessian.iter() {
            self.matrix.insert(i, j, value);
        }
        for (j, row) in constraint_jacobian.iter().enumerate() {
            for (i, value) in row.iter() {
                self.matrix.insert(i, number_variables + j, *value);
            }
        }
        for j in 0..number_constraints {
            self.matrix
                .insert(number_variables + j, number_variables + j, -dual_regularization);
        }
        // pattern stabilizers for the shift search
        for i in 0..dimension {
            self.matrix.insert(i, i, 0.0);
        }

        self.rhs[..dimension].fill(0.0);
    }

    /// Factorize with inertia correction; returns the primal shift used.
    pub fn factorize_with_inertia_correction(&mut self) -> SolverResult<f64> {
        let n = self.number_variables;
        let m = self.number_constraints;
        let expected = Inertia {
            positive: n,
            negative: m,
            zero: 0,
        };

        let mut shift = 0.0;
        let checkpoint = self.matrix.checkpoint();
        for _attempt in 0..MAX_CORRECTION_ATTEMPTS {
            self.matrix.truncate(checkpoint);
            if shift > 0.0 {
                self.matrix.add_identity_multiple(shift, n);
            }
            if self.try_factorize() && self.solver.inertia() == expected {
                self.primal_regularization = shift;
                if shift > 0.0 {
                    self.previous_primal_regularization = shift;
                }
                return Ok(shift);
            }
            shift = self.next_shift(shift);
            if shift > self.parameters.maximum_value {
                return Err(SolverError::RegularizationDiverged(shift));
            }
        }
        Err(SolverError::RegularizationDiverged(shift))
    }

    fn next_shift(&self, current: f64) -> f64 {
        if current == 0.0 {
            if self.previous_primal_regularization == 0.0 {
                self.parameters.initial_value
            } else {
                (self.previous_primal_regularization / self.parameters.decrease_factor)
                    .max(f64::MIN_POSITIVE)
            }
        } else {
            self.parameters.increase_factor * current
        }
    }

    fn try_factorize(&mut self) -> bool {
        let csc = self.matrix.to_csc();
        let pattern = (csc.indptr().raw_storage().to_vec(), csc.indices().to_vec());
        let dimension = self.matrix.dimension();

        self.solver.resize(dimension);
        if self.pattern.as_ref() != Some(&pattern) {
            self.solver.invalidate_symbolic();
            if self.solver.symbolic_factorization(&csc).is_err() {
                self.pattern = None;
                return false;
            }
            self.pattern = Some(pattern);
        }
        self.solver.numeric_factorization(&csc).is_ok()
    }

    /// Solve with the current factors; the result lands in `self.solution`.
    pub fn solve(&mut self) {
        let dimension = self.number_variables + self.number_constraints;
        self.solution[..dimension].copy_from_slice(&self.rhs[..dimension]);
        self.solver.solve_in_place(&mut self.solution[..dimension]);
    }

    /// Factorize without requiring a particular inertia (used for the
    /// least-squares multiplier system). Returns false if the matrix is
    /// singular.
    pub fn factorize_unchecked(&mut self) -> bool {
        self.try_factorize()
    }
}
