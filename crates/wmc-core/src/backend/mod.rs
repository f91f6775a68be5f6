//! # Evaluation Backends
//!
//! Concrete implementations of the [`Evaluator`](crate::Evaluator) contract.
//!
//! - `DagEvaluator`: memoized post-order fold over the circuit DAG

mod dag;

pub use dag::{DagEvaluator, WeightOverrides};
