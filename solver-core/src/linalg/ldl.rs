//! Sparse LDL^T factorization through the `ldl` crate.
//!
//! The factorization is split into a symbolic phase (elimination tree,
//! reusable while the sparsity pattern is stable) and a numeric phase (redone
//! every iteration). D is exposed so the inertia-correction loops can read
//! the eigenvalue sign counts: for an LDL^T factorization with 1x1 pivots the
//! inertia of the matrix equals the sign pattern of D.
//!
//! A failed numeric factorization is not fatal here. The callers treat it as
//! "wrong inertia" and retry with a larger regularization shift.

use sprs::CsMat;
use thiserror::Error;

/// Linear solver errors.
#[derive(Error, Debug)]
pub enum LdlError {
    /// Numeric factorization failed (zero pivot encountered)
    #[error("factorization failed: zero pivot")]
    FactorizationFailed,

    /// Symbolic analysis failed (pattern is not upper triangular)
    #[error("symbolic analysis failed: invalid sparsity pattern")]
    SymbolicFailed,

    /// Dimension mismatch
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Eigenvalue sign counts (positive, negative, zero) of a symmetric matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inertia {
    pub positive: usize,
    pub negative: usize,
    pub zero: usize,
}

/// LDL^T factorization of a sparse symmetric matrix (upper-triangle CSC).
pub struct LdlSolver {
    n: usize,

    // symbolic data, reused across numeric factorizations
    etree: Option<Vec<Option<usize>>>,
    l_nz: Option<Vec<usize>>,

    // factors
    l_p: Vec<usize>,
    l_i: Vec<usize>,
    l_x: Vec<f64>,
    d: Vec<f64>,
    d_inv: Vec<f64>,
    factorized: bool,

    // reusable workspaces
    bwork: Vec<ldl::Marker>,
    iwork: Vec<usize>,
    fwork: Vec<f64>,
}

impl LdlSolver {
    /// Create a solver for systems of dimension `n`.
    pub fn new(n: usize) -> Self {
        Self {
            n,
            etree: None,
            l_nz: None,
            l_p: vec![0; n + 1],
            l_i: Vec::new(),
            l_x: Vec::new(),
            d: vec![0.0; n],
            d_inv: vec![0.0; n],
            factorized: false,
            bwork: vec![ldl::Marker::Unused; n],
            iwork: vec![0; 3 * n],
            fwork: vec![0.0; n],
        }
    }

    pub fn dimension(&self) -> usize {
        self.n
    }

    /// Resize for a new system dimension, dropping the symbolic analysis.
    pub fn resize(&mut self, n: usize) {
        if n != self.n {
            *self = LdlSolver::new(n);
        }
    }

    /// Invalidate the symbolic analysis (call when the sparsity changes).
    pub fn invalidate_symbolic(&mut self) {
        self.etree = None;
        self.l_nz = None;
        self.factorized = false;
    }

    /// Compute the elimination tree for the sparsity pattern of `mat`.
    pub fn symbolic_factorization(&mut self, mat: &CsMat<f64>) -> Result<(), LdlError> {
        if mat.rows() != self.n || mat.cols() != self.n {
            return Err(LdlError::DimensionMismatch {
                expected: self.n,
                actual: mat.rows(),
            });
        }

        // keep indptr alive across the call
        let indptr = mat.indptr();
        let a_p = indptr.raw_storage();
        let a_i = mat.indices();

        let mut work = vec![0; self.n];
        let mut l_nz = vec![0; self.n];
        let mut etree = vec![None; self.n];

        ldl::etree(self.n, a_p, a_i, &mut work, &mut l_nz, &mut etree)
            .map_err(|_| LdlError::SymbolicFailed)?;

        let nnz_l: usize = l_nz.iter().sum();
        self.l_i.resize(nnz_l, 0);
        self.l_x.resize(nnz_l, 0.0);
        self.etree = Some(etree);
        self.l_nz = Some(l_nz);
        self.factorized = false;
        Ok(())
    }

    /// Factorize the matrix numerically. The symbolic phase is run first if
    /// it has not been done (or was invalidated).
    pub fn numeric_factorization(&mut self, mat: &CsMat<f64>) -> Result<(), LdlError> {
        if self.etree.is_none() {
            self.symbolic_factorization(mat)?;
        }

        let indptr = mat.indptr();
        let a_p = indptr.raw_storage();
        let a_i = mat.indices();
        let a_x = mat.data();

        let etree = self.etree.as_ref().unwrap();
        let l_nz = self.l_nz.as_ref().unwrap();

        // the ldl kernel expects clean markers
        self.bwork.fill(ldl::Marker::Unused);
        self.iwork.fill(0);
        self.fwork.fill(0.0);
        self.factorized = false;

        ldl::factor(
            self.n,
            a_p,
            a_i,
            a_x,
            &mut self.l_p,
            &mut self.l_i,
            &mut self.l_x,
            &mut self.d,
            &mut self.d_inv,
            l_nz,
            etree,
            &mut self.bwork,
            &mut self.iwork,
            &mut self.fwork,
        )
        .map_err(|_| LdlError::FactorizationFailed)?;

        self.factorized = true;
        Ok(())
    }

    /// Solve `M x = b` in place using the current factors.
    ///
    /// Panics if no successful numeric factorization precedes the call.
    pub fn solve_in_place(&self, x: &mut [f64]) {
        assert!(self.factorized, "solve requires a successful factorization");
        assert_eq!(x.len(), self.n);
        ldl::solve(self.n, &self.l_p, &self.l_i, &self.l_x, &self.d_inv, x);
    }

    /// Inertia of the last successfully factorized matrix.
    pub fn inertia(&self) -> Inertia {
        let mut inertia = Inertia {
            positive: 0,
            negative: 0,
            zero: 0,
        };
        if !self.factorized {
            return inertia;
        }
        for &di in &self.d {
            if di > 0.0 {
                inertia.positive += 1;
            } else if di < 0.0 {
                inertia.negative += 1;
            } else {
                inertia.zero += 1;
            }
        }
        inertia
    }

    /// Positive pivot count of the last factorization (the "rank" reported to
    /// the Hessian convexification loop).
    pub fn rank(&self) -> usize {
        self.inertia().positive
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::sparse::SparseSymmetric;

    fn factorize(entries: &[(usize, usize, f64)], n: usize) -> LdlSolver {
        let mut m = SparseSymmetric::new(n, entries.len());
        for &(i, j, v) in entries {
            m.insert(i, j, v);
        }
        let mut solver = LdlSolver::new(n);
        solver
            .numeric_factorization(&m.to_csc())
            .expect("factorization failed");
        solver
    }

    #[test]
    fn test_solve_positive_definite() {
        // [[2, 1], [1, 2]] x = [3, 3] has solution [1, 1]
        let solver = factorize(&[(0, 0, 2.0), (0, 1, 1.0), (1, 1, 2.0)], 2);
        let mut x = vec![3.0, 3.0];
        solver.solve_in_place(&mut x);
        assert!((x[0] - 1.0).abs() < 1e-12, "x[0] = {}", x[0]);
        assert!((x[1] - 1.0).abs() < 1e-12, "x[1] = {}", x[1]);
        assert_eq!(
            solver.inertia(),
            Inertia {
                positive: 2,
                negative: 0,
                zero: 0
            }
        );
    }

    #[test]
    fn test_inertia_quasi_definite() {
        // KKT-shaped matrix [[1, 0, 1], [0, 1, 1], [1, 1, -1]]
        let solver = factorize(
            &[
                (0, 0, 1.0),
                (1, 1, 1.0),
                (0, 2, 1.0),
                (1, 2, 1.0),
                (2, 2, -1.0),
            ],
            3,
        );
        let inertia = solver.inertia();
        assert_eq!(inertia.positive, 2);
        assert_eq!(inertia.negative, 1);
        assert_eq!(inertia.zero, 0);
    }

    #[test]
    fn test_symbolic_reuse() {
        let mut m = SparseSymmetric::new(2, 3);
        m.insert(0, 0, 4.0);
        m.insert(0, 1, 1.0);
        m.insert(1, 1, 3.0);
        let mut solver = LdlSolver::new(2);
        solver.symbolic_factorization(&m.to_csc()).unwrap();

        // same pattern, new values
        let mut m2 = SparseSymmetric::new(2, 3);
        m2.insert(0, 0, 5.0);
        m2.insert(0, 1, 2.0);
        m2.insert(1, 1, 4.0);
        solver.numeric_factorization(&m2.to_csc()).unwrap();

        let mut x = vec![7.0, 6.0];
        solver.solve_in_place(&mut x);
        // [[5, 2], [2, 4]] [1, 1] = [7, 6]
        assert!((x[0] - 1.0).abs() < 1e-12);
        assert!((x[1] - 1.0).abs() < 1e-12);
    }
}
