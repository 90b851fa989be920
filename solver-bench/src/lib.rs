//! Shared test problem definitions for regression runs and benchmarking.

pub mod test_problems;
