//! # wmc-core
//!
//! The evaluation core of a probabilistic inference engine.
//!
//! Given a compiled AND/OR circuit with named query and evidence nodes, this
//! crate computes the conditional value of each query in a chosen semiring:
//! plain probabilities, or symbolic expressions for inspecting exactly what
//! an evaluation computes.
//!
//! ## Pipeline
//!
//! ```text
//! Circuit ──▶ Evaluatable::evaluate
//!               ├─ create_evaluator (DagEvaluator over a Semiring)
//!               ├─ evidence::condition (evidence names → signed literals)
//!               ├─ Evaluator::propagate (normalization constant Z)
//!               └─ Evaluator::evaluate per query ──▶ QueryResults
//! ```
//!
//! ## Example
//!
//! ```
//! use wmc_core::{Circuit, Evaluatable, Label};
//!
//! let mut circuit = Circuit::new();
//! let rain = circuit.add_atom(0.3);
//! circuit.add_name("rain", rain.positive(), Label::Query).unwrap();
//!
//! let results = circuit.probabilities(None).unwrap();
//! assert_eq!(results.get("rain"), Some(&0.3));
//! ```
//!
//! ## Architectural Constraints
//!
//! - Parsing, grounding and compilation happen upstream; circuits arrive built
//! - Evaluation never mutates the circuit; evaluators may share one freely
//! - Single-threaded and synchronous: no async, no I/O

// =============================================================================
// MODULES
// =============================================================================

pub mod backend;
pub mod circuit;
pub mod config;
pub mod evaluator;
pub mod evidence;
pub mod orchestrator;
pub mod primitives;
pub mod semiring;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{Label, NodeId, NodeRef, Weight, WmcError};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use backend::{DagEvaluator, WeightOverrides};
pub use circuit::{Circuit, CircuitNode};
pub use config::EngineConfig;
pub use evaluator::{Evaluator, Lifecycle};
pub use evidence::{EvidenceInput, EvidenceSet, condition};
pub use orchestrator::{Evaluatable, EvaluateOptions, QueryResults};
pub use semiring::{ProbabilitySemiring, Semiring, SymbolicSemiring};
