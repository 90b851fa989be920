//! Sparse matrix and vector types shared across the solver.
//!
//! Gradients are sparse vectors, the constraint Jacobian is a collection of
//! sparse rows, and symmetric matrices (Hessian, augmented system) are kept
//! as triplet buffers that compress to upper-triangle CSC on demand. The
//! triplet buffer supports the regularization loops, which repeatedly append
//! and pop diagonal shifts without re-evaluating the underlying matrix.

use sprs::{CsMat, CsVec, TriMat};

/// Sparse vector of fixed dimension (objective gradient, Jacobian row).
pub type SparseVector = CsVec<f64>;

/// Constraint Jacobian stored as `m` sparse rows.
pub type JacobianRows = Vec<SparseVector>;

/// A closed interval `[lb, ub]`; either end may be infinite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub lb: f64,
    pub ub: f64,
}

impl Interval {
    pub const ENTIRE: Interval = Interval {
        lb: f64::NEG_INFINITY,
        ub: f64::INFINITY,
    };

    pub fn new(lb: f64, ub: f64) -> Self {
        Self { lb, ub }
    }

    /// Amount by which `value` lies outside the interval (0 if inside).
    pub fn violation(&self, value: f64) -> f64 {
        (self.lb - value).max(0.0).max(value - self.ub)
    }

    pub fn contains(&self, value: f64) -> bool {
        self.lb <= value && value <= self.ub
    }
}

/// Symmetric matrix assembled as upper-triangle triplets.
///
/// Entries may repeat; duplicates are summed when compressing to CSC, which
/// is how diagonal barrier and regularization terms are layered on top of
/// the Hessian. `checkpoint`/`truncate` let the inertia-correction loops pop
/// a previous batch of diagonal shifts before trying a larger one.
#[derive(Debug, Clone)]
pub struct SparseSymmetric {
    dimension: usize,
    rows: Vec<usize>,
    cols: Vec<usize>,
    values: Vec<f64>,
}

impl SparseSymmetric {
    pub fn new(dimension: usize, capacity: usize) -> Self {
        Self {
            dimension,
            rows: Vec::with_capacity(capacity),
            cols: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn number_nonzeros(&self) -> usize {
        self.values.len()
    }

    /// Reset to an empty matrix of (possibly new) dimension.
    pub fn reset(&mut self, dimension: usize) {
        self.dimension = dimension;
        self.rows.clear();
        self.cols.clear();
        self.values.clear();
    }

    /// Insert an upper-triangle entry (callers pass `i <= j`).
    pub fn insert(&mut self, i: usize, j: usize, value: f64) {
        debug_assert!(i <= j, "symmetric matrix stores the upper triangle only");
        debug_assert!(j < self.dimension);
        self.rows.push(i);
        self.cols.push(j);
        self.values.push(value);
    }

    /// Add `factor` to the diagonal entries `0..count`.
    pub fn add_identity_multiple(&mut self, factor: f64, count: usize) {
        for i in 0..count.min(self.dimension) {
            self.insert(i, i, factor);
        }
    }

    /// Number of entries currently stored; pass back to [`truncate`](Self::truncate).
    pub fn checkpoint(&self) -> usize {
        self.values.len()
    }

    /// Drop all entries inserted after `checkpoint`.
    pub fn truncate(&mut self, checkpoint: usize) {
        self.rows.truncate(checkpoint);
        self.cols.truncate(checkpoint);
        self.values.truncate(checkpoint);
    }

    /// Smallest diagonal entry (0 if the diagonal is empty).
    ///
    /// Duplicate diagonal triplets are summed per index first.
    pub fn smallest_diagonal_entry(&self) -> f64 {
        let mut diagonal = vec![0.0; self.dimension];
        let mut present = vec![false; self.dimension];
        for k in 0..self.values.len() {
            if self.rows[k] == self.cols[k] {
                diagonal[self.rows[k]] += self.values[k];
                present[self.rows[k]] = true;
            }
        }
        let mut smallest = f64::INFINITY;
        for i in 0..self.dimension {
            let entry = if present[i] { diagonal[i] } else { 0.0 };
            smallest = smallest.min(entry);
        }
        if smallest.is_finite() {
            smallest
        } else {
            0.0
        }
    }

    /// Quadratic form `x^T M x` (expanding the symmetric storage).
    pub fn quadratic_product(&self, x: &[f64]) -> f64 {
        debug_assert_eq!(x.len(), self.dimension);
        let mut product = 0.0;
        for k in 0..self.values.len() {
            let (i, j, v) = (self.rows[k], self.cols[k], self.values[k]);
            if i == j {
                product += v * x[i] * x[i];
            } else {
                product += 2.0 * v * x[i] * x[j];
            }
        }
        product
    }

    /// Compress to upper-triangle CSC, summing duplicate entries.
    pub fn to_csc(&self) -> CsMat<f64> {
        let mut tri = TriMat::new((self.dimension, self.dimension));
        for k in 0..self.values.len() {
            tri.add_triplet(self.rows[k], self.cols[k], self.values[k]);
        }
        tri.to_csc()
    }

    /// Iterate over the stored triplets.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        (0..self.values.len()).map(move |k| (self.rows[k], self.cols[k], self.values[k]))
    }
}

/// Dot product of a sparse vector with a dense slice.
pub fn sparse_dot(sparse: &SparseVector, dense: &[f64]) -> f64 {
    sparse.iter().map(|(i, v)| v * dense[i]).sum()
}

/// `y += alpha * row` scattered into a dense slice.
pub fn scatter(row: &SparseVector, alpha: f64, y: &mut [f64]) {
    for (i, v) in row.iter() {
        y[i] += alpha * v;
    }
}

/// Dense product of the Jacobian rows with `x`: `out[j] = rows[j] . x`.
pub fn jacobian_product(rows: &JacobianRows, x: &[f64], out: &mut [f64]) {
    debug_assert_eq!(rows.len(), out.len());
    for (j, row) in rows.iter().enumerate() {
        out[j] = sparse_dot(row, x);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_violation() {
        let interval = Interval::new(-1.0, 2.0);
        assert_eq!(interval.violation(0.0), 0.0);
        assert_eq!(interval.violation(-3.0), 2.0);
        assert_eq!(interval.violation(5.0), 3.0);
    }

    #[test]
    fn test_symmetric_duplicates_sum() {
        // [[2, 1], [1, 3]] assembled with a split diagonal entry
        let mut m = SparseSymmetric::new(2, 4);
        m.insert(0, 0, 1.5);
        m.insert(0, 0, 0.5);
        m.insert(0, 1, 1.0);
        m.insert(1, 1, 3.0);

        let csc = m.to_csc();
        assert_eq!(csc.nnz(), 3);
        assert_eq!(m.smallest_diagonal_entry(), 2.0);
        // x^T M x with x = (1, 1): 2 + 2*1 + 3 = 7
        assert_eq!(m.quadratic_product(&[1.0, 1.0]), 7.0);
    }

    #[test]
    fn test_checkpoint_truncate() {
        let mut m = SparseSymmetric::new(3, 6);
        m.insert(0, 0, -1.0);
        let mark = m.checkpoint();
        m.add_identity_multiple(4.0, 3);
        assert_eq!(m.number_nonzeros(), 4);
        m.truncate(mark);
        assert_eq!(m.number_nonzeros(), 1);
        assert_eq!(m.smallest_diagonal_entry(), -1.0);
    }

    #[test]
    fn test_jacobian_product() {
        let rows = vec![
            SparseVector::new(3, vec![0, 2], vec![1.0, 2.0]),
            SparseVector::new(3, vec![1], vec![-1.0]),
        ];
        let mut out = vec![0.0; 2];
        jacobian_product(&rows, &[1.0, 2.0, 3.0], &mut out);
        assert_eq!(out, vec![7.0, -2.0]);
    }
}
