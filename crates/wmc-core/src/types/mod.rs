//! # Core Type Definitions
//!
//! This module contains the shared vocabulary of the engine:
//! - Node identifiers (`NodeId`) and signed node references (`NodeRef`)
//! - Name-table labels (`Label`)
//! - Declared literal weights (`Weight`)
//! - Error types (`WmcError`)
//!
//! ## Sign-Encoded Negation
//!
//! Circuits address nodes by positive integer index and encode logical
//! negation in the sign: `-7` is "not node 7". `NodeRef` keeps that compact
//! encoding on the wire (it serializes as the signed integer) while keeping
//! polarity and index apart in memory so no arithmetic is ever done on it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Neg;
use thiserror::Error;

// =============================================================================
// NODE IDENTIFIERS
// =============================================================================

/// Positive index of a node in a circuit. Indices start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Get the raw index.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }

    /// Positive reference to this node.
    #[must_use]
    pub const fn positive(self) -> NodeRef {
        NodeRef {
            node: self,
            negated: false,
        }
    }

    /// Negated reference to this node.
    #[must_use]
    pub const fn negative(self) -> NodeRef {
        NodeRef {
            node: self,
            negated: true,
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A signed reference to a circuit node.
///
/// Serializes as the sign-encoded integer (`7` or `-7`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct NodeRef {
    node: NodeId,
    negated: bool,
}

impl NodeRef {
    /// Decode a sign-encoded index. Zero is not a node.
    pub fn from_signed(signed: i64) -> Result<Self, WmcError> {
        let index = u32::try_from(signed.unsigned_abs())
            .map_err(|_| WmcError::UnknownNode(signed))?;
        if index == 0 {
            return Err(WmcError::UnknownNode(signed));
        }
        Ok(Self {
            node: NodeId(index),
            negated: signed < 0,
        })
    }

    /// Encode as a signed index.
    #[must_use]
    pub fn to_signed(self) -> i64 {
        let index = i64::from(self.node.0);
        if self.negated { -index } else { index }
    }

    /// The referenced node, ignoring polarity.
    #[must_use]
    pub const fn node(self) -> NodeId {
        self.node
    }

    #[must_use]
    pub const fn is_negated(self) -> bool {
        self.negated
    }

    /// `true` for a positive reference.
    #[must_use]
    pub const fn polarity(self) -> bool {
        !self.negated
    }
}

impl Neg for NodeRef {
    type Output = Self;

    fn neg(self) -> Self {
        Self {
            node: self.node,
            negated: !self.negated,
        }
    }
}

impl From<NodeId> for NodeRef {
    fn from(node: NodeId) -> Self {
        node.positive()
    }
}

impl TryFrom<i64> for NodeRef {
    type Error = WmcError;

    fn try_from(signed: i64) -> Result<Self, Self::Error> {
        Self::from_signed(signed)
    }
}

impl From<NodeRef> for i64 {
    fn from(node: NodeRef) -> Self {
        node.to_signed()
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_signed())
    }
}

// =============================================================================
// LABELS
// =============================================================================

/// The kinds of named terminal node a circuit declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    /// A node whose conditioned value is requested.
    Query,
    /// Evidence that holds unless the caller says otherwise.
    EvidencePositive,
    /// Evidence that fails unless the caller says otherwise.
    EvidenceNegative,
    /// Evidence with no default; constrained only when the caller pins it.
    EvidenceMaybe,
}

impl Label {
    /// The three evidence labels, in conditioning order.
    pub const EVIDENCE: [Label; 3] = [
        Label::EvidencePositive,
        Label::EvidenceNegative,
        Label::EvidenceMaybe,
    ];

    #[must_use]
    pub fn is_evidence(self) -> bool {
        !matches!(self, Label::Query)
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Label::Query => "query",
            Label::EvidencePositive => "evidence+",
            Label::EvidenceNegative => "evidence-",
            Label::EvidenceMaybe => "evidence?",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// WEIGHTS
// =============================================================================

/// The declared weight of an atom, before a semiring lifts it.
///
/// Probabilistic facts carry a number. A symbolic weight names a parameter
/// and is only meaningful to semirings that keep expressions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Weight {
    Probability(f64),
    Symbol(String),
}

impl Weight {
    /// Create a symbolic weight.
    #[must_use]
    pub fn symbol(name: impl Into<String>) -> Self {
        Self::Symbol(name.into())
    }
}

impl From<f64> for Weight {
    fn from(p: f64) -> Self {
        Self::Probability(p)
    }
}

impl From<&str> for Weight {
    fn from(s: &str) -> Self {
        Self::Symbol(s.to_string())
    }
}

impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Weight::Probability(p) => write!(f, "{}", p),
            Weight::Symbol(s) => f.write_str(s),
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur while building or evaluating a circuit.
///
/// - No silent failures: every lookup miss is reported
/// - No partial results: a failed session returns no query values
/// - The engine never panics; all errors are returned to the caller
#[derive(Debug, Error, Clone, PartialEq)]
pub enum WmcError {
    /// A node reference does not exist in the circuit.
    #[error("Unknown node reference: {0}")]
    UnknownNode(i64),

    /// An evidence name is not declared in any evidence table.
    #[error("Unknown evidence name: {0}")]
    UnknownName(String),

    /// A name is empty or longer than `MAX_NAME_LENGTH`.
    #[error("Invalid name: {0:?}")]
    InvalidName(String),

    /// A name is already bound to a different node under the same label.
    #[error("Duplicate {label} name: {name}")]
    DuplicateName { label: Label, name: String },

    /// A child does not precede its parent.
    #[error("Node {parent} cannot reference {child}")]
    InvalidReference { parent: u32, child: i64 },

    /// A declared weight cannot be lifted into the semiring.
    #[error("Invalid weight: {0}")]
    InvalidWeight(String),

    /// `evaluate()` was called before `propagate()`, or after the evidence changed.
    #[error("Evaluator is uninitialized: call propagate() first")]
    Uninitialized,

    /// `z()` was called before `propagate()`.
    #[error("Normalization constant is unavailable: evaluator was not propagated")]
    Unpropagated,

    /// The normalization constant is the additive identity.
    ///
    /// No world is consistent with the evidence.
    #[error("Division by zero: normalization constant is zero (inconsistent evidence)")]
    DivisionByZero,

    /// The conditioning cannot be computed by pinning atoms and folding a
    /// single constraint node.
    ///
    /// Raised for more than one internal constraint (root plus evidence on an
    /// internal node), and for a query on an internal node other than the
    /// constraint itself while a constraint is active. The compiler must
    /// conjoin such evidence into the root or expose the query as an atom.
    #[error("Unsupported conditioning at node {node}: {reason}")]
    UnsupportedConditioning { node: i64, reason: String },

    /// A circuit exceeds the configured node limit.
    #[error("Circuit has {nodes} nodes, limit is {limit}")]
    CircuitTooLarge { nodes: usize, limit: usize },

    /// Engine configuration failed to parse or validate.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A traversal lost track of a child value.
    #[error("Traversal failed at node {0}")]
    TraversalFailed(u32),
}

// =============================================================================
// TESTS
// =============================================================================
