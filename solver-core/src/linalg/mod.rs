//! Sparse linear algebra: norms, matrix helpers, LDL^T factorization and the
//! regularized augmented system shared by the Hessian model and the
//! interior-point subproblem.

pub mod augmented_system;
pub mod ldl;
pub mod norm;
pub mod sparse;

pub use norm::Norm;
pub use sparse::{Interval, JacobianRows, SparseSymmetric, SparseVector};
