//! # Evaluator Contract
//!
//! The lifecycle every evaluation backend implements:
//!
//! ```text
//! Constructed --initialize()--> Initialized --propagate()--> Propagated
//!                                    ^                          |
//!                                    +---- evidence changed ----+
//! ```
//!
//! `evaluate()` is re-entrant once propagated. Evidence bookkeeping is shared
//! by all backends through [`EvidenceSet`]; a backend only embeds one and
//! exposes it through [`Evaluator::evidence`] / [`Evaluator::evidence_mut`].
//!
//! An evaluator is single-writer: evidence is not mutated while an
//! evaluation is in progress (the borrow checker enforces this).

use crate::circuit::Circuit;
use crate::evidence::EvidenceSet;
use crate::semiring::Semiring;
use crate::{Label, NodeRef, WmcError};

/// Where an evaluator is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Lifecycle {
    Constructed,
    Initialized,
    Propagated,
}

/// A circuit evaluation backend over semiring `S`.
pub trait Evaluator<S: Semiring> {
    /// The circuit under evaluation.
    fn circuit(&self) -> &Circuit;

    /// The semiring values are computed in.
    fn semiring(&self) -> &S;

    fn evidence(&self) -> &EvidenceSet;

    fn evidence_mut(&mut self) -> &mut EvidenceSet;

    /// Current lifecycle state.
    fn state(&self) -> Lifecycle;

    /// Prepare backend-local structures. Idempotent.
    fn initialize(&mut self) -> Result<(), WmcError>;

    /// Push the accumulated evidence through the circuit and compute the
    /// normalization constant.
    fn propagate(&mut self) -> Result<(), WmcError>;

    /// Normalized value of a signed node under the current evidence.
    ///
    /// Fails with [`WmcError::Uninitialized`] unless propagated for the
    /// current evidence.
    fn evaluate(&mut self, node: NodeRef) -> Result<S::Value, WmcError>;

    /// The normalization constant.
    ///
    /// Fails with [`WmcError::Unpropagated`] unless propagated for the
    /// current evidence.
    fn z(&self) -> Result<S::Value, WmcError>;

    /// Assert a literal. Takes effect at the next `propagate()`.
    fn add_evidence(&mut self, literal: NodeRef) {
        self.evidence_mut().push(literal);
    }

    fn clear_evidence(&mut self) {
        self.evidence_mut().clear();
    }

    fn iter_evidence(&self) -> std::slice::Iter<'_, NodeRef> {
        self.evidence().iter()
    }

    /// The circuit's `(name, node)` pairs under `label`.
    fn names(&self, label: Label) -> &[(String, NodeRef)] {
        self.circuit().names(label)
    }
}
