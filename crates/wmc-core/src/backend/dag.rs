//! # DAG Evaluator
//!
//! Memoized post-order evaluation of a circuit in any semiring.
//!
//! ## Conditioning
//!
//! Evidence on an *atom* pins that atom: the asserted literal weighs `one`,
//! the opposite literal `zero`, and the asserted literal's declared weight is
//! multiplied into an evidence factor. Evidence on an *internal* node becomes
//! the constraint `C`, as does the circuit root. At most one constraint is
//! supported: folds of overlapping sub-DAGs cannot be multiplied, so a root
//! combined with internal evidence must be conjoined by the compiler.
//!
//! ```text
//! Z          = factor × fold(C)
//! P(atom q)  = factor × weight(q) × fold(C | q pinned)  / Z
//! P(node n)  = factor × fold(n)                         / Z   (no C only)
//! ```
//!
//! An internal query under a constraint has no fold-based answer unless it
//! is `C` itself (probability one) or `¬C` (zero); every other case is
//! reported as [`WmcError::UnsupportedConditioning`]. Queries the evidence
//! already decides (pinned atoms, `C`) return `one` / `zero` directly.
//!
//! The folds are exact weighted model counts when the compiler hands over a
//! deterministic, decomposable circuit. How disjunctions are made exclusive
//! is the compiler's business, not this evaluator's.
//!
//! ## Memoization
//!
//! Values are memoized per signed node reference. The memo built during
//! `propagate()` is shared by every non-atom query; an atom query pins one
//! more variable and walks the constraint with a scratch memo.
//!
//! Traversal uses an explicit stack, so circuit depth does not consume
//! native stack.

use crate::circuit::{Circuit, CircuitNode};
use crate::evaluator::{Evaluator, Lifecycle};
use crate::evidence::EvidenceSet;
use crate::semiring::Semiring;
use crate::{NodeId, NodeRef, Weight, WmcError};
use std::collections::{BTreeMap, BTreeSet};

/// Replacement weights for atoms, keyed by atom index.
pub type WeightOverrides = BTreeMap<NodeId, Weight>;

type Memo<V> = BTreeMap<NodeRef, V>;
type Pins = BTreeMap<NodeId, bool>;

/// Lifted weights of an atom's two literals.
#[derive(Debug, Clone)]
struct LiteralWeights<V> {
    positive: V,
    negative: V,
}

impl<V> LiteralWeights<V> {
    fn get(&self, polarity: bool) -> &V {
        if polarity {
            &self.positive
        } else {
            &self.negative
        }
    }
}

/// State computed by `propagate()` for one evidence configuration.
#[derive(Debug, Clone)]
struct Conditioning<V> {
    /// Evidence generation this state was computed for.
    generation: u64,
    pins: Pins,
    /// Root or internal evidence node, at most one.
    constraint: Option<NodeRef>,
    factor: V,
    contradictory: bool,
    z: V,
}

impl<V> Conditioning<V> {
    /// Whether the evidence alone settles `node`: a pinned atom, or the
    /// constraint node itself.
    fn decides(&self, node: NodeRef) -> Option<bool> {
        if let Some(&pinned) = self.pins.get(&node.node()) {
            return Some(pinned == node.polarity());
        }
        match self.constraint {
            Some(constraint) if constraint == node => Some(true),
            Some(constraint) if constraint == -node => Some(false),
            _ => None,
        }
    }
}

/// Reference backend: memoized fold over the circuit DAG.
pub struct DagEvaluator<'c, S: Semiring> {
    circuit: &'c Circuit,
    semiring: S,
    overrides: WeightOverrides,
    evidence: EvidenceSet,
    initialized: bool,
    literals: BTreeMap<NodeId, LiteralWeights<S::Value>>,
    conditioning: Option<Conditioning<S::Value>>,
    memo: Memo<S::Value>,
}

impl<S: Semiring> std::fmt::Debug for DagEvaluator<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DagEvaluator")
            .field("nodes", &self.circuit.len())
            .field("evidence", &self.evidence.len())
            .field("state", &self.state())
            .field("memo_size", &self.memo.len())
            .finish_non_exhaustive()
    }
}

impl<'c, S: Semiring> DagEvaluator<'c, S> {
    /// Create an evaluator over `circuit`.
    ///
    /// The circuit is re-validated, so one that arrived through serde cannot
    /// smuggle in a cycle.
    pub fn new(circuit: &'c Circuit, semiring: S) -> Result<Self, WmcError> {
        Self::with_weights(circuit, semiring, WeightOverrides::new())
    }

    /// Create an evaluator whose atom weights are partly replaced by `overrides`.
    pub fn with_weights(
        circuit: &'c Circuit,
        semiring: S,
        overrides: WeightOverrides,
    ) -> Result<Self, WmcError> {
        circuit.validate()?;
        for id in overrides.keys() {
            if !circuit.is_atom(*id)? {
                return Err(WmcError::UnknownNode(i64::from(id.0)));
            }
        }
        Ok(Self {
            circuit,
            semiring,
            overrides,
            evidence: EvidenceSet::new(),
            initialized: false,
            literals: BTreeMap::new(),
            conditioning: None,
            memo: Memo::new(),
        })
    }

    /// Number of memoized node values.
    #[must_use]
    pub fn memo_size(&self) -> usize {
        self.memo.len()
    }

    /// The conditioning state, if it matches the current evidence.
    fn current(&self) -> Option<&Conditioning<S::Value>> {
        self.conditioning
            .as_ref()
            .filter(|c| c.generation == self.evidence.generation())
    }
}

impl<S: Semiring> Evaluator<S> for DagEvaluator<'_, S> {
    fn circuit(&self) -> &Circuit {
        self.circuit
    }

    fn semiring(&self) -> &S {
        &self.semiring
    }

    fn evidence(&self) -> &EvidenceSet {
        &self.evidence
    }

    fn evidence_mut(&mut self) -> &mut EvidenceSet {
        &mut self.evidence
    }

    fn state(&self) -> Lifecycle {
        if self.current().is_some() {
            Lifecycle::Propagated
        } else if self.initialized {
            Lifecycle::Initialized
        } else {
            Lifecycle::Constructed
        }
    }

    fn initialize(&mut self) -> Result<(), WmcError> {
        if self.initialized {
            return Ok(());
        }

        let mut literals = BTreeMap::new();
        for (id, node) in self.circuit.nodes() {
            let CircuitNode::Atom { weight } = node else {
                continue;
            };
            let weights = match self.overrides.get(&id).or(weight.as_ref()) {
                Some(raw) => {
                    let positive = self.semiring.value(raw)?;
                    LiteralWeights {
                        negative: self.semiring.negate(positive.clone()),
                        positive,
                    }
                }
                None => LiteralWeights {
                    positive: self.semiring.one(),
                    negative: self.semiring.one(),
                },
            };
            literals.insert(id, weights);
        }

        tracing::debug!(
            nodes = self.circuit.len(),
            atoms = literals.len(),
            overrides = self.overrides.len(),
            "initialized evaluator"
        );
        self.literals = literals;
        self.memo.clear();
        self.initialized = true;
        Ok(())
    }

    fn propagate(&mut self) -> Result<(), WmcError> {
        self.initialize()?;

        let one = self.semiring.one();
        let mut pins = Pins::new();
        let mut constraints: Vec<NodeRef> = self.circuit.root().into_iter().collect();
        let mut seen: BTreeSet<NodeRef> = constraints.iter().copied().collect();
        let mut factor = one;
        let mut contradictory = false;

        for &literal in &self.evidence {
            if self.circuit.is_atom(literal.node())? {
                match pins.get(&literal.node()) {
                    None => {
                        pins.insert(literal.node(), literal.polarity());
                        let weight = self
                            .literals
                            .get(&literal.node())
                            .ok_or(WmcError::TraversalFailed(literal.node().0))?
                            .get(literal.polarity())
                            .clone();
                        factor = self.semiring.times(factor, weight);
                    }
                    Some(&pinned) if pinned == literal.polarity() => {}
                    Some(_) => contradictory = true,
                }
            } else if seen.contains(&-literal) {
                contradictory = true;
            } else if seen.insert(literal) {
                constraints.push(literal);
            }
        }

        // Folds of overlapping sub-DAGs do not multiply.
        let constraint = match constraints.as_slice() {
            _ if contradictory => None,
            [] => None,
            [single] => Some(*single),
            [first, second, ..] => {
                return Err(WmcError::UnsupportedConditioning {
                    node: second.to_signed(),
                    reason: format!(
                        "{} internal constraints, only one is supported (first is {})",
                        constraints.len(),
                        first
                    ),
                });
            }
        };

        self.memo.clear();
        let z = if contradictory {
            self.semiring.zero()
        } else if let Some(constraint) = constraint {
            let walker = Walker {
                circuit: self.circuit,
                semiring: &self.semiring,
                literals: &self.literals,
                pins: &pins,
            };
            let value = walker.fold(constraint, &mut self.memo)?;
            self.semiring.times(factor.clone(), value)
        } else {
            factor.clone()
        };

        tracing::debug!(
            evidence = self.evidence.len(),
            pinned = pins.len(),
            constrained = constraint.is_some(),
            contradictory,
            z = ?z,
            "propagated evidence"
        );

        self.conditioning = Some(Conditioning {
            generation: self.evidence.generation(),
            pins,
            constraint,
            factor,
            contradictory,
            z,
        });
        Ok(())
    }

    fn evaluate(&mut self, node: NodeRef) -> Result<S::Value, WmcError> {
        let generation = self.evidence.generation();
        let conditioning = self
            .conditioning
            .as_ref()
            .filter(|c| c.generation == generation)
            .ok_or(WmcError::Uninitialized)?;
        let is_atom = self.circuit.is_atom(node.node())?;

        if conditioning.contradictory || conditioning.z == self.semiring.zero() {
            return Err(WmcError::DivisionByZero);
        }
        if let Some(holds) = conditioning.decides(node) {
            return Ok(if holds {
                self.semiring.one()
            } else {
                self.semiring.zero()
            });
        }

        let numerator = if is_atom {
            let mut pins = conditioning.pins.clone();
            pins.insert(node.node(), node.polarity());
            let walker = Walker {
                circuit: self.circuit,
                semiring: &self.semiring,
                literals: &self.literals,
                pins: &pins,
            };
            let weight = self
                .literals
                .get(&node.node())
                .ok_or(WmcError::TraversalFailed(node.node().0))?
                .get(node.polarity())
                .clone();
            let acc = self.semiring.times(conditioning.factor.clone(), weight);
            match conditioning.constraint {
                Some(constraint) => {
                    let mut scratch = Memo::new();
                    let value = walker.fold(constraint, &mut scratch)?;
                    self.semiring.times(acc, value)
                }
                None => acc,
            }
        } else if let Some(constraint) = conditioning.constraint {
            return Err(WmcError::UnsupportedConditioning {
                node: node.to_signed(),
                reason: format!("internal query under constraint {}", constraint),
            });
        } else {
            let walker = Walker {
                circuit: self.circuit,
                semiring: &self.semiring,
                literals: &self.literals,
                pins: &conditioning.pins,
            };
            let value = walker.fold(node, &mut self.memo)?;
            self.semiring.times(conditioning.factor.clone(), value)
        };

        tracing::trace!(node = %node, numerator = ?numerator, "evaluated node");
        self.semiring.normalize(numerator, &conditioning.z)
    }

    fn z(&self) -> Result<S::Value, WmcError> {
        self.current()
            .map(|c| c.z.clone())
            .ok_or(WmcError::Unpropagated)
    }
}

// =============================================================================
// TRAVERSAL
// =============================================================================

/// Borrowed view used for one fold under a fixed set of pins.
struct Walker<'a, S: Semiring> {
    circuit: &'a Circuit,
    semiring: &'a S,
    literals: &'a BTreeMap<NodeId, LiteralWeights<S::Value>>,
    pins: &'a Pins,
}

impl<S: Semiring> Walker<'_, S> {
    /// Value of `target` (unnormalized), filling `memo` along the way.
    fn fold(&self, target: NodeRef, memo: &mut Memo<S::Value>) -> Result<S::Value, WmcError> {
        if self.circuit.is_atom(target.node())? {
            return self.literal(target);
        }
        if let Some(value) = memo.get(&target) {
            return Ok(value.clone());
        }

        let mut stack = vec![(target.node(), false)];
        while let Some((id, expanded)) = stack.pop() {
            if memo.contains_key(&id.positive()) {
                continue;
            }
            let node = self.circuit.get(id)?;
            if expanded {
                let value = self.combine(id, node, memo)?;
                memo.insert(id.positive(), value);
                continue;
            }
            stack.push((id, true));
            for child in node.children() {
                let pending = !memo.contains_key(&child.node().positive());
                if pending && !self.circuit.is_atom(child.node())? {
                    stack.push((child.node(), false));
                }
            }
        }

        self.read(target, memo)
    }

    /// Fold an internal node whose children are all memoized.
    fn combine(
        &self,
        id: NodeId,
        node: &CircuitNode,
        memo: &mut Memo<S::Value>,
    ) -> Result<S::Value, WmcError> {
        match node {
            CircuitNode::And(children) => {
                let mut acc = self.semiring.one();
                for child in children {
                    acc = self.semiring.times(acc, self.read(*child, memo)?);
                }
                Ok(acc)
            }
            CircuitNode::Or(children) => {
                let mut acc = self.semiring.zero();
                for child in children {
                    acc = self.semiring.plus(acc, self.read(*child, memo)?);
                }
                Ok(acc)
            }
            CircuitNode::Atom { .. } => Err(WmcError::TraversalFailed(id.0)),
        }
    }

    /// Value of an atom literal or an already-folded internal node.
    fn read(&self, node: NodeRef, memo: &mut Memo<S::Value>) -> Result<S::Value, WmcError> {
        if self.circuit.is_atom(node.node())? {
            return self.literal(node);
        }
        if let Some(value) = memo.get(&node) {
            return Ok(value.clone());
        }
        if !node.is_negated() {
            return Err(WmcError::TraversalFailed(node.node().0));
        }
        let positive = memo
            .get(&-node)
            .cloned()
            .ok_or(WmcError::TraversalFailed(node.node().0))?;
        let negative = self.semiring.negate(positive);
        memo.insert(node, negative.clone());
        Ok(negative)
    }

    fn literal(&self, node: NodeRef) -> Result<S::Value, WmcError> {
        if let Some(&pinned) = self.pins.get(&node.node()) {
            return Ok(if pinned == node.polarity() {
                self.semiring.one()
            } else {
                self.semiring.zero()
            });
        }
        self.literals
            .get(&node.node())
            .map(|weights| weights.get(node.polarity()).clone())
            .ok_or(WmcError::TraversalFailed(node.node().0))
    }
}

// =============================================================================
// TESTS
// =============================================================================
