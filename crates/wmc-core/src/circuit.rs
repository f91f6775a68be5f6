//! # Compiled Circuit
//!
//! The immutable AND/OR DAG handed over by the compiler, plus its name tables.
//!
//! Nodes are numbered densely from 1 in insertion order, and a node may only
//! reference nodes that already exist. Every edge therefore points to a lower
//! index and the graph is acyclic by construction.
//!
//! Name tables are kept per [`Label`] in declaration order; query results are
//! reported in that order.

use crate::primitives::MAX_NAME_LENGTH;
use crate::{Label, NodeId, NodeRef, Weight, WmcError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// NODES
// =============================================================================

/// A circuit node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitNode {
    /// A leaf variable.
    ///
    /// `weight` is the probability of the positive literal; the negative
    /// literal weighs its complement. An atom without a weight is a derived
    /// variable whose literals both weigh one.
    Atom { weight: Option<Weight> },
    /// Conjunction. An empty conjunction is `true`.
    And(Vec<NodeRef>),
    /// Disjunction. An empty disjunction is `false`.
    Or(Vec<NodeRef>),
}

impl CircuitNode {
    #[must_use]
    pub fn is_atom(&self) -> bool {
        matches!(self, CircuitNode::Atom { .. })
    }

    /// Children of an internal node. Atoms have none.
    #[must_use]
    pub fn children(&self) -> &[NodeRef] {
        match self {
            CircuitNode::Atom { .. } => &[],
            CircuitNode::And(children) | CircuitNode::Or(children) => children,
        }
    }
}

// =============================================================================
// CIRCUIT
// =============================================================================

/// A compiled formula: nodes, name tables and an optional root.
///
/// The root, when present, is the whole theory the program compiles to. It is
/// conjoined with the evidence to form the normalization constant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Circuit {
    nodes: Vec<CircuitNode>,
    #[serde(default)]
    names: BTreeMap<Label, Vec<(String, NodeRef)>>,
    #[serde(default)]
    root: Option<NodeRef>,
}

impl Circuit {
    /// Create a new empty circuit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Add a weighted atom.
    pub fn add_atom(&mut self, weight: impl Into<Weight>) -> NodeId {
        self.push(CircuitNode::Atom {
            weight: Some(weight.into()),
        })
    }

    /// Add an atom whose literals both weigh one.
    pub fn add_unweighted_atom(&mut self) -> NodeId {
        self.push(CircuitNode::Atom { weight: None })
    }

    /// Add a conjunction of existing nodes.
    pub fn add_and(&mut self, children: Vec<NodeRef>) -> Result<NodeId, WmcError> {
        self.check_children(&children)?;
        Ok(self.push(CircuitNode::And(children)))
    }

    /// Add a disjunction of existing nodes.
    pub fn add_or(&mut self, children: Vec<NodeRef>) -> Result<NodeId, WmcError> {
        self.check_children(&children)?;
        Ok(self.push(CircuitNode::Or(children)))
    }

    /// Add the constant `true` (empty conjunction).
    pub fn add_true(&mut self) -> NodeId {
        self.push(CircuitNode::And(Vec::new()))
    }

    /// Add the constant `false` (empty disjunction).
    pub fn add_false(&mut self) -> NodeId {
        self.push(CircuitNode::Or(Vec::new()))
    }

    /// Bind `name` to `node` under `label`.
    ///
    /// Rebinding a name to the node it already names is a no-op. Distinct
    /// names may alias one node.
    pub fn add_name(
        &mut self,
        name: impl Into<String>,
        node: NodeRef,
        label: Label,
    ) -> Result<(), WmcError> {
        let name = name.into();
        if name.is_empty() || name.len() > MAX_NAME_LENGTH {
            return Err(WmcError::InvalidName(name));
        }
        self.get(node.node())?;

        let table = self.names.entry(label).or_default();
        match table.iter().find(|(existing, _)| *existing == name) {
            Some((_, bound)) if *bound == node => Ok(()),
            Some(_) => Err(WmcError::DuplicateName { label, name }),
            None => {
                table.push((name, node));
                Ok(())
            }
        }
    }

    /// Declare the whole-theory root node.
    pub fn set_root(&mut self, root: NodeRef) -> Result<(), WmcError> {
        self.get(root.node())?;
        self.root = Some(root);
        Ok(())
    }

    #[must_use]
    pub fn root(&self) -> Option<NodeRef> {
        self.root
    }

    /// Look up a node by index.
    pub fn get(&self, id: NodeId) -> Result<&CircuitNode, WmcError> {
        (id.0 as usize)
            .checked_sub(1)
            .and_then(|slot| self.nodes.get(slot))
            .ok_or(WmcError::UnknownNode(i64::from(id.0)))
    }

    /// Check whether a node is an atom.
    pub fn is_atom(&self, id: NodeId) -> Result<bool, WmcError> {
        Ok(self.get(id)?.is_atom())
    }

    /// All `(name, node)` pairs under `label`, in declaration order.
    #[must_use]
    pub fn names(&self, label: Label) -> &[(String, NodeRef)] {
        self.names.get(&label).map_or(&[][..], Vec::as_slice)
    }

    /// Find the node bound to `name` under `label`.
    #[must_use]
    pub fn lookup(&self, name: &str, label: Label) -> Option<NodeRef> {
        self.names(label)
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, node)| *node)
    }

    /// Check whether `name` is declared under any evidence label.
    #[must_use]
    pub fn is_evidence_name(&self, name: &str) -> bool {
        Label::EVIDENCE
            .iter()
            .any(|label| self.lookup(name, *label).is_some())
    }

    /// All nodes with their indices, in index order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &CircuitNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(slot, node)| (NodeId(slot as u32 + 1), node))
    }

    /// Re-check the structural invariants of a circuit that did not come from
    /// the builder methods (e.g. one that was deserialized).
    pub fn validate(&self) -> Result<(), WmcError> {
        for (id, node) in self.nodes() {
            for child in node.children() {
                if child.node() >= id {
                    return Err(WmcError::InvalidReference {
                        parent: id.0,
                        child: child.to_signed(),
                    });
                }
            }
        }
        for table in self.names.values() {
            for (_, node) in table {
                self.get(node.node())?;
            }
        }
        if let Some(root) = self.root {
            self.get(root.node())?;
        }
        Ok(())
    }

    fn check_children(&self, children: &[NodeRef]) -> Result<(), WmcError> {
        let next = self.nodes.len() as u32 + 1;
        for child in children {
            if self.get(child.node()).is_err() {
                return Err(WmcError::InvalidReference {
                    parent: next,
                    child: child.to_signed(),
                });
            }
        }
        Ok(())
    }

    fn push(&mut self, node: CircuitNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() as u32)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nodes_are_numbered_from_one() {
        let mut circuit = Circuit::new();
        let a = circuit.add_atom(0.3);
        let b = circuit.add_atom(0.4);
        let and = circuit
            .add_and(vec![a.positive(), b.negative()])
            .expect("and");

        assert_eq!(a, NodeId(1));
        assert_eq!(b, NodeId(2));
        assert_eq!(and, NodeId(3));
        assert_eq!(circuit.len(), 3);
        assert!(circuit.is_atom(a).expect("atom"));
        assert!(!circuit.is_atom(and).expect("and"));
    }

    #[test]
    fn forward_references_rejected() {
        let mut circuit = Circuit::new();
        let a = circuit.add_atom(0.3);

        let result = circuit.add_or(vec![a.positive(), NodeId(5).positive()]);
        assert_eq!(
            result,
            Err(WmcError::InvalidReference {
                parent: 2,
                child: 5
            })
        );
        assert_eq!(circuit.len(), 1);
    }

    #[test]
    fn get_unknown_node_fails() {
        let circuit = Circuit::new();
        assert_eq!(circuit.get(NodeId(1)), Err(WmcError::UnknownNode(1)));
        assert_eq!(circuit.get(NodeId(0)), Err(WmcError::UnknownNode(0)));
    }

    #[test]
    fn names_keep_declaration_order() {
        let mut circuit = Circuit::new();
        let a = circuit.add_atom(0.1);
        let b = circuit.add_atom(0.2);
        circuit.add_name("z", b.positive(), Label::Query).expect("name");
        circuit.add_name("a", a.positive(), Label::Query).expect("name");

        let names: Vec<_> = circuit
            .names(Label::Query)
            .iter()
            .map(|(n, _)| n.as_str())
            .collect();
        assert_eq!(names, vec!["z", "a"]);
        assert!(circuit.names(Label::EvidenceMaybe).is_empty());
    }

    #[test]
    fn rebinding_name_rules() {
        let mut circuit = Circuit::new();
        let a = circuit.add_atom(0.1);
        let b = circuit.add_atom(0.2);

        circuit.add_name("x", a.positive(), Label::Query).expect("name");
        circuit
            .add_name("x", a.positive(), Label::Query)
            .expect("idempotent");
        assert_eq!(circuit.names(Label::Query).len(), 1);

        let clash = circuit.add_name("x", b.positive(), Label::Query);
        assert!(matches!(clash, Err(WmcError::DuplicateName { .. })));

        // Aliasing: a second name for the same node.
        circuit.add_name("y", a.positive(), Label::Query).expect("alias");
        assert_eq!(circuit.lookup("y", Label::Query), Some(a.positive()));
    }

    #[test]
    fn name_must_reference_existing_node() {
        let mut circuit = Circuit::new();
        let result = circuit.add_name("q", NodeId(4).positive(), Label::Query);
        assert_eq!(result, Err(WmcError::UnknownNode(4)));
    }

    #[test]
    fn empty_or_oversized_name_is_invalid() {
        let mut circuit = Circuit::new();
        let a = circuit.add_atom(0.1);

        assert_eq!(
            circuit.add_name("", a.positive(), Label::Query),
            Err(WmcError::InvalidName(String::new()))
        );
        let long = "x".repeat(MAX_NAME_LENGTH + 1);
        assert!(matches!(
            circuit.add_name(long, a.positive(), Label::Query),
            Err(WmcError::InvalidName(_))
        ));
        assert!(circuit.names(Label::Query).is_empty());
    }

    #[test]
    fn evidence_name_lookup() {
        let mut circuit = Circuit::new();
        let a = circuit.add_atom(0.1);
        circuit
            .add_name("e", a.positive(), Label::EvidenceMaybe)
            .expect("name");
        circuit.add_name("q", a.positive(), Label::Query).expect("name");

        assert!(circuit.is_evidence_name("e"));
        assert!(!circuit.is_evidence_name("q"));
    }

    #[test]
    fn validate_catches_bad_deserialized_circuit() {
        let json = r#"{"nodes":[{"and":[1]}]}"#;
        let circuit: Circuit = serde_json::from_str(json).expect("deserialize");
        assert!(matches!(
            circuit.validate(),
            Err(WmcError::InvalidReference { parent: 1, child: 1 })
        ));
    }

    #[test]
    fn serde_roundtrip_preserves_structure() {
        let mut circuit = Circuit::new();
        let a = circuit.add_atom(0.3);
        let s = circuit.add_atom(Weight::symbol("p"));
        let or = circuit
            .add_or(vec![a.positive(), s.negative()])
            .expect("or");
        circuit.add_name("q", or.positive(), Label::Query).expect("name");
        circuit.set_root(or.positive()).expect("root");

        let json = serde_json::to_string(&circuit).expect("serialize");
        let restored: Circuit = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(restored, circuit);
        restored.validate().expect("valid");
    }
}
