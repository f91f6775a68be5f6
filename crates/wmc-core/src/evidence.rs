//! # Evidence
//!
//! Two halves of conditioning:
//! - [`EvidenceInput`]: what the caller says about evidence *names*
//! - [`EvidenceSet`]: the signed literals an evaluator actually asserts
//!
//! [`condition`] turns the first into the second against a circuit's
//! evidence tables.
//!
//! ## Defaults
//!
//! | Label | No input at all | Input, name absent or unset | Input true / false |
//! |-------|-----------------|-----------------------------|--------------------|
//! | evidence+ | assert node | nothing | node / ¬node |
//! | evidence- | assert ¬node | nothing | node / ¬node |
//! | evidence? | nothing | nothing | node / ¬node |

use crate::evaluator::Evaluator;
use crate::semiring::Semiring;
use crate::{Label, NodeRef, WmcError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// EVIDENCE INPUT
// =============================================================================

/// Caller-supplied truth values for evidence names.
///
/// `None` means "unset": the caller deliberately leaves the name open.
/// A missing name behaves the same way.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvidenceInput {
    values: BTreeMap<String, Option<bool>>,
}

impl EvidenceInput {
    /// Create an empty input. Note that an empty input is *not* the same as
    /// no input: it suppresses the evidence+ / evidence- defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set `name` to `value`.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: bool) -> Self {
        self.set(name, Some(value));
        self
    }

    /// Builder: mark `name` as explicitly unset.
    #[must_use]
    pub fn with_unset(mut self, name: impl Into<String>) -> Self {
        self.set(name, None);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: Option<bool>) {
        self.values.insert(name.into(), value);
    }

    /// The value for `name`; `None` if absent or unset.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<bool> {
        self.values.get(name).copied().flatten()
    }

    /// All mentioned names, in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// =============================================================================
// EVIDENCE SET
// =============================================================================

/// The ordered sequence of asserted literals.
///
/// The set is a logical conjunction: order is kept for replay and logging
/// only, and duplicates carry no extra weight. Every mutation bumps
/// `generation`, which lets an evaluator notice that its propagated state
/// is stale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvidenceSet {
    literals: Vec<NodeRef>,
    generation: u64,
}

impl EvidenceSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, literal: NodeRef) {
        self.literals.push(literal);
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn clear(&mut self) {
        self.literals.clear();
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NodeRef> {
        self.literals.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.literals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    /// Mutation counter.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl<'a> IntoIterator for &'a EvidenceSet {
    type Item = &'a NodeRef;
    type IntoIter = std::slice::Iter<'a, NodeRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// =============================================================================
// CONDITIONING PROTOCOL
// =============================================================================

/// Assert the evidence literals implied by `input` on `evaluator`.
///
/// `input = None` means the caller supplied no evidence mapping at all, which
/// activates the evidence+ / evidence- defaults. Names in `input` that no
/// evidence table declares are rejected before anything is asserted.
pub fn condition<S, E>(evaluator: &mut E, input: Option<&EvidenceInput>) -> Result<(), WmcError>
where
    S: Semiring,
    E: Evaluator<S> + ?Sized,
{
    if let Some(input) = input {
        if let Some(unknown) = input
            .names()
            .find(|name| !evaluator.circuit().is_evidence_name(name))
        {
            return Err(WmcError::UnknownName(unknown.to_string()));
        }
    }

    let mut asserted = Vec::new();
    for label in Label::EVIDENCE {
        for (name, node) in evaluator.circuit().names(label) {
            let value = match input {
                Some(input) => input.get(name),
                None => default_for(label),
            };
            match value {
                Some(true) => asserted.push(*node),
                Some(false) => asserted.push(-*node),
                None => {}
            }
        }
    }

    tracing::debug!(
        literals = asserted.len(),
        explicit = input.is_some(),
        "conditioned evidence"
    );
    for literal in asserted {
        evaluator.add_evidence(literal);
    }
    Ok(())
}

/// Truth value asserted for `label` when no evidence input exists.
fn default_for(label: Label) -> Option<bool> {
    match label {
        Label::EvidencePositive => Some(true),
        Label::EvidenceNegative => Some(false),
        Label::EvidenceMaybe | Label::Query => None,
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NodeId;

    #[test]
    fn input_absent_and_unset_are_equivalent() {
        let input = EvidenceInput::new().with("a", true).with_unset("b");

        assert_eq!(input.get("a"), Some(true));
        assert_eq!(input.get("b"), None);
        assert_eq!(input.get("c"), None);
        assert_eq!(input.names().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn input_deserializes_from_json() {
        let input: EvidenceInput =
            serde_json::from_str(r#"{"rain": true, "wind": false, "fog": null}"#)
                .expect("deserialize");

        assert_eq!(input.get("rain"), Some(true));
        assert_eq!(input.get("wind"), Some(false));
        assert_eq!(input.get("fog"), None);
    }

    #[test]
    fn evidence_set_keeps_order_and_counts_generations() {
        let mut set = EvidenceSet::new();
        let start = set.generation();

        set.push(NodeId(2).positive());
        set.push(NodeId(1).negative());

        let literals: Vec<_> = set.iter().map(|l| l.to_signed()).collect();
        assert_eq!(literals, vec![2, -1]);
        assert_eq!(set.generation(), start + 2);

        set.clear();
        assert!(set.is_empty());
        assert_eq!(set.generation(), start + 3);
    }

    #[test]
    fn defaults_follow_label() {
        assert_eq!(default_for(Label::EvidencePositive), Some(true));
        assert_eq!(default_for(Label::EvidenceNegative), Some(false));
        assert_eq!(default_for(Label::EvidenceMaybe), None);
    }
}
