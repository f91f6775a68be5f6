//! # Evaluation Orchestrator
//!
//! Ties circuit, semiring, evidence and backend together:
//!
//! 1. build an evaluator for the circuit
//! 2. assert evidence through the conditioning protocol
//! 3. `propagate()`
//! 4. evaluate every query (or one requested node)
//!
//! Either every query gets a value or the whole call fails; partial results
//! are never returned.

use crate::backend::{DagEvaluator, WeightOverrides};
use crate::circuit::Circuit;
use crate::config::EngineConfig;
use crate::evaluator::Evaluator;
use crate::evidence::{EvidenceInput, condition};
use crate::semiring::{ProbabilitySemiring, Semiring};
use crate::{Label, NodeRef, WmcError};
use serde::{Serialize, Serializer};

// =============================================================================
// OPTIONS
// =============================================================================

/// Optional inputs of an evaluation.
#[derive(Debug, Clone, Default)]
pub struct EvaluateOptions<'a> {
    /// Evidence mapping. `None` activates the evidence+ / evidence- defaults.
    pub evidence: Option<&'a EvidenceInput>,
    /// Replacement atom weights.
    pub weights: Option<&'a WeightOverrides>,
    pub config: EngineConfig,
}

impl<'a> EvaluateOptions<'a> {
    #[must_use]
    pub fn with_evidence(mut self, evidence: &'a EvidenceInput) -> Self {
        self.evidence = Some(evidence);
        self
    }

    #[must_use]
    pub fn with_weights(mut self, weights: &'a WeightOverrides) -> Self {
        self.weights = Some(weights);
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }
}

// =============================================================================
// RESULTS
// =============================================================================

/// Query name → value, in query declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResults<V> {
    entries: Vec<(String, V)>,
}

impl<V> QueryResults<V> {
    /// Value for a query name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&V> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> IntoIterator for QueryResults<V> {
    type Item = (String, V);
    type IntoIter = std::vec::IntoIter<(String, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<V: Serialize> Serialize for QueryResults<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|(n, v)| (n, v)))
    }
}

// =============================================================================
// EVALUATABLE
// =============================================================================

/// Something that can build an evaluator for itself and answer queries.
pub trait Evaluatable {
    /// Build an unconditioned evaluator.
    fn create_evaluator<'a, S>(
        &'a self,
        semiring: S,
        weights: Option<&WeightOverrides>,
    ) -> Result<Box<dyn Evaluator<S> + 'a>, WmcError>
    where
        S: Semiring + 'a;

    /// Build an evaluator, assert evidence from `evidence`, and propagate.
    fn get_evaluator<'a, S>(
        &'a self,
        semiring: S,
        evidence: Option<&EvidenceInput>,
        weights: Option<&WeightOverrides>,
    ) -> Result<Box<dyn Evaluator<S> + 'a>, WmcError>
    where
        S: Semiring + 'a,
    {
        let mut evaluator = self.create_evaluator(semiring, weights)?;
        condition(evaluator.as_mut(), evidence)?;
        evaluator.propagate()?;
        Ok(evaluator)
    }

    /// Evaluate every declared query.
    ///
    /// Results pass through [`Semiring::present`]: in the probability semiring
    /// magnitudes below `config.zero_threshold` are reported as `0.0`.
    fn evaluate<S: Semiring>(
        &self,
        semiring: S,
        options: &EvaluateOptions<'_>,
    ) -> Result<QueryResults<S::Value>, WmcError> {
        options.config.validate()?;
        let mut evaluator = self.create_evaluator(semiring, options.weights)?;
        check_size(evaluator.circuit(), &options.config)?;
        condition(evaluator.as_mut(), options.evidence)?;
        evaluator.propagate()?;

        let queries = evaluator.names(Label::Query).to_vec();
        tracing::debug!(queries = queries.len(), "evaluating queries");

        let mut entries = Vec::with_capacity(queries.len());
        for (name, node) in queries {
            let raw = evaluator.evaluate(node)?;
            tracing::trace!(query = %name, value = ?raw, "query evaluated");
            let value = evaluator
                .semiring()
                .present(raw, options.config.zero_threshold);
            entries.push((name, value));
        }
        Ok(QueryResults { entries })
    }

    /// Evaluate a single signed node. No presentation cleanup is applied.
    fn evaluate_node<S: Semiring>(
        &self,
        node: NodeRef,
        semiring: S,
        options: &EvaluateOptions<'_>,
    ) -> Result<S::Value, WmcError> {
        options.config.validate()?;
        let mut evaluator = self.create_evaluator(semiring, options.weights)?;
        check_size(evaluator.circuit(), &options.config)?;
        condition(evaluator.as_mut(), options.evidence)?;
        evaluator.propagate()?;
        evaluator.evaluate(node)
    }

    /// Probabilities of all queries under `evidence`, with default options.
    fn probabilities(
        &self,
        evidence: Option<&EvidenceInput>,
    ) -> Result<QueryResults<f64>, WmcError> {
        let options = EvaluateOptions {
            evidence,
            ..EvaluateOptions::default()
        };
        self.evaluate(ProbabilitySemiring, &options)
    }
}

impl Evaluatable for Circuit {
    fn create_evaluator<'a, S>(
        &'a self,
        semiring: S,
        weights: Option<&WeightOverrides>,
    ) -> Result<Box<dyn Evaluator<S> + 'a>, WmcError>
    where
        S: Semiring + 'a,
    {
        let overrides = weights.cloned().unwrap_or_default();
        let evaluator = DagEvaluator::with_weights(self, semiring, overrides)?;
        Ok(Box::new(evaluator))
    }
}

fn check_size(circuit: &Circuit, config: &EngineConfig) -> Result<(), WmcError> {
    if circuit.len() > config.max_nodes {
        return Err(WmcError::CircuitTooLarge {
            nodes: circuit.len(),
            limit: config.max_nodes,
        });
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
