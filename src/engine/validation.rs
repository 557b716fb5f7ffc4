//! Structural checks over a finished node list.
//!
//! Findings are reported, never raised: a tree with errors is still
//! returned to the caller alongside the report.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    num::NonZeroUsize,
};

use serde::Serialize;
use tracing::instrument;

use crate::domain::{ExistingNode, WbsCode, WbsNode, WbsTree, Warning};

/// How serious a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The tree violates a structural invariant.
    Error,
    /// The tree is usable but unusual.
    Warning,
}

/// A single finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    /// How serious the finding is.
    pub severity: Severity,
    /// The node concerned, if the finding is about one node.
    pub code: Option<WbsCode>,
    /// Human-readable description.
    pub message: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{code}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// The findings of [`validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    issues: Vec<Issue>,
}

impl ValidationReport {
    /// Whether the report has no errors. Warnings are allowed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors().next().is_none()
    }

    /// Every finding, errors first, each group in code order.
    #[must_use]
    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    /// The errors.
    pub fn errors(&self) -> impl Iterator<Item = &Issue> {
        self.issues
            .iter()
            .filter(|issue| issue.severity == Severity::Error)
    }

    /// The warnings.
    pub fn warnings(&self) -> impl Iterator<Item = &Issue> {
        self.issues
            .iter()
            .filter(|issue| issue.severity == Severity::Warning)
    }

    fn error(&mut self, code: Option<&WbsCode>, message: String) {
        self.push(Severity::Error, code, message);
    }

    fn warning(&mut self, code: Option<&WbsCode>, message: String) {
        self.push(Severity::Warning, code, message);
    }

    fn finish(mut self) -> Self {
        self.issues.sort_by(|a, b| {
            a.severity
                .cmp(&b.severity)
                .then_with(|| a.code.cmp(&b.code))
        });
        for issue in self.errors() {
            tracing::warn!(%issue, "structural error");
        }
        self
    }

    fn push(&mut self, severity: Severity, code: Option<&WbsCode>, message: String) {
        self.issues.push(Issue {
            severity,
            code: code.cloned(),
            message,
        });
    }
}

/// Checks a node list for structural problems.
///
/// Errors:
/// - a code used by more than one node,
/// - no root, or more than one,
/// - a parent code that names no node,
/// - a parent code that is not the node's own code minus its last segment,
/// - a node flagged as both or neither equipment and structural.
///
/// Warnings:
/// - a level that disagrees with the code depth,
/// - siblings whose sequence numbers are not contiguous from 1.
#[instrument(level = "debug", skip_all, fields(nodes = nodes.len()))]
#[must_use]
pub fn validate(nodes: &[WbsNode]) -> ValidationReport {
    let mut report = ValidationReport::default();

    let mut codes = BTreeSet::new();
    for node in nodes {
        if !codes.insert(&node.code) {
            report.error(Some(&node.code), "duplicate WBS code".to_string());
        }
    }

    let roots: Vec<&WbsNode> = nodes.iter().filter(|node| node.parent_code.is_none()).collect();
    match roots.as_slice() {
        [] => report.error(None, "tree has no root node".to_string()),
        [root] => {
            if root.code.depth() != 1 {
                report.error(Some(&root.code), "node has no parent code".to_string());
            }
        }
        [_, extra @ ..] => {
            for node in extra {
                report.error(Some(&node.code), "more than one root node".to_string());
            }
        }
    }

    let mut siblings: BTreeMap<&WbsCode, Vec<NonZeroUsize>> = BTreeMap::new();
    for node in nodes {
        if let Some(parent) = &node.parent_code {
            if !codes.contains(parent) {
                report.error(Some(&node.code), format!("parent {parent} does not exist"));
            }
            if node.code.parent().as_ref() != Some(parent) {
                report.error(
                    Some(&node.code),
                    format!("parent {parent} is not a prefix of the code"),
                );
            }
            siblings.entry(parent).or_default().push(node.code.sequence());
        }

        if node.is_equipment == node.is_structural {
            report.error(
                Some(&node.code),
                "node must be exactly one of equipment and structural".to_string(),
            );
        }

        if node.level != node.code.depth() {
            report.warning(
                Some(&node.code),
                format!("level {} does not match code depth {}", node.level, node.code.depth()),
            );
        }
    }

    for (parent, mut sequences) in siblings {
        sequences.sort_unstable();
        sequences.dedup();
        let gap = sequences
            .iter()
            .zip(1..)
            .find(|(sequence, expected)| sequence.get() != *expected);
        if let Some((found, expected)) = gap {
            report.warning(
                Some(parent),
                format!("child sequence jumps to {found}, expected {expected}"),
            );
        }
    }

    report.finish()
}

/// Checks a tree read back from an export.
///
/// Attributes the export leaves out are inferred first, as on reconciliation.
/// Codes listed more than once are reported as errors rather than dropped.
#[instrument(level = "debug", skip_all, fields(nodes = nodes.len()))]
#[must_use]
pub fn validate_existing(nodes: Vec<ExistingNode>) -> ValidationReport {
    let (tree, warnings) = WbsTree::import(nodes);
    let mut report = validate(&tree.into_nodes());
    for warning in warnings {
        if let Warning::DuplicateCode { code } = warning {
            report.error(Some(&code), "duplicate WBS code".to_string());
        }
    }
    report.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> WbsCode {
        s.parse().unwrap()
    }

    fn node(c: &str) -> WbsNode {
        WbsNode::structural(code(c), c)
    }

    #[test]
    fn well_formed_tree_is_valid() {
        let nodes = vec![node("1"), node("1.1"), node("1.2"), node("1.2.1")];

        let report = validate(&nodes);

        assert!(report.is_valid());
        assert!(report.issues().is_empty());
    }

    #[test]
    fn duplicate_codes_are_errors() {
        let nodes = vec![node("1"), node("1.1"), node("1.1")];

        let report = validate(&nodes);

        assert!(!report.is_valid());
        assert_eq!(report.errors().count(), 1);
        assert_eq!(report.issues()[0].code, Some(code("1.1")));
    }

    #[test]
    fn dangling_and_mismatched_parents_are_errors() {
        let mut mismatched = node("1.2.1");
        mismatched.parent_code = Some(code("1.1"));
        let nodes = vec![node("1"), node("1.1"), node("1.3.1"), mismatched];

        let report = validate(&nodes);

        let messages: Vec<String> = report.errors().map(ToString::to_string).collect();
        assert_eq!(
            messages,
            [
                "1.2.1: parent 1.1 is not a prefix of the code",
                "1.3.1: parent 1.3 does not exist",
            ]
        );
    }

    #[test]
    fn root_problems_are_errors() {
        assert!(!validate(&[node("1.1")]).is_valid());

        let mut second_root = node("2");
        second_root.parent_code = None;
        let report = validate(&[node("1"), second_root]);
        assert_eq!(report.errors().count(), 1);
    }

    #[test]
    fn gaps_and_level_mismatches_are_warnings() {
        let mut wrong_level = node("1.1");
        wrong_level.level = 4;
        let nodes = vec![node("1"), wrong_level, node("1.3")];

        let report = validate(&nodes);

        assert!(report.is_valid());
        let messages: Vec<String> = report.warnings().map(ToString::to_string).collect();
        assert_eq!(
            messages,
            [
                "1: child sequence jumps to 3, expected 2",
                "1.1: level 4 does not match code depth 2",
            ]
        );
    }

    #[test]
    fn exported_duplicates_are_errors() {
        let nodes = vec![
            ExistingNode::new(code("1"), "Project"),
            ExistingNode::new(code("1.1"), "Milestones"),
            ExistingNode::new(code("1.1"), "Milestones again"),
        ];

        let report = validate_existing(nodes);

        let messages: Vec<String> = report.errors().map(ToString::to_string).collect();
        assert_eq!(messages, ["1.1: duplicate WBS code"]);
    }

    #[test]
    fn exported_tree_is_inferred_before_checking() {
        let nodes = vec![
            ExistingNode::new(code("1"), "Project"),
            ExistingNode::new(code("1.3"), "General"),
            ExistingNode::new(code("1.3.4"), "04 | Transformers"),
            ExistingNode::new(code("1.3.4.1"), "T01 | Transformer"),
        ];

        let report = validate_existing(nodes);

        assert!(report.is_valid());
        assert_eq!(report.warnings().count(), 2);
    }

    #[test]
    fn equipment_flags_must_disagree() {
        let mut both = WbsNode::equipment(code("1.1"), "X");
        both.is_structural = true;

        let report = validate(&[node("1"), both]);

        assert!(!report.is_valid());
    }
}
