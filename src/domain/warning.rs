use std::fmt;

use serde::Serialize;

use crate::domain::{CommissioningStatus, Identifier, WbsCode};

/// A non-fatal data-quality condition found while processing equipment.
///
/// The affected record is still processed using fallback defaults; the
/// warning is returned alongside the result so callers can review it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// A row had an empty or placeholder identifier and was skipped.
    MissingIdentifier {
        /// Zero-based row index in the input.
        row: usize,
    },
    /// A row had a commissioning status that could not be parsed; it was
    /// treated as TBC.
    UnknownStatus {
        /// The record's identifier.
        identifier: Identifier,
        /// The raw status value.
        value: String,
    },
    /// The same identifier appeared more than once with the same status; the
    /// first occurrence was kept.
    DuplicateIdentifier {
        /// The duplicated identifier.
        identifier: Identifier,
        /// The commissioning bucket the duplicate was found in.
        status: CommissioningStatus,
    },
    /// A record's parent reference does not match any known equipment.
    UnresolvedParent {
        /// The referencing record.
        child: Identifier,
        /// The unresolved reference.
        parent: Identifier,
    },
    /// Parent references form a cycle.
    ParentCycle {
        /// Identifiers taking part in the cycle.
        members: Vec<Identifier>,
    },
    /// No category pattern matched the identifier.
    UnrecognisedCategory {
        /// The unmatched identifier.
        identifier: Identifier,
    },
    /// A child was placed directly under its category because its parent is
    /// not among the category's parent equipment.
    OrphanedChild {
        /// The orphaned child.
        child: Identifier,
        /// The parent it declared.
        parent: Identifier,
        /// Where it was placed.
        code: WbsCode,
    },
    /// An added item could not be placed by any tier and was emitted as a
    /// fallback node.
    Unplaced {
        /// The unplaced item.
        identifier: Identifier,
        /// The parent it declared, if any.
        parent: Option<Identifier>,
        /// The fallback node's code.
        code: WbsCode,
    },
    /// An existing WBS node looked like equipment but its name did not yield
    /// an identifier.
    UnreadableNode {
        /// The node's code.
        code: WbsCode,
        /// The node's display name.
        name: String,
    },
    /// An existing WBS tree contained the same code twice; the first node
    /// was kept.
    DuplicateCode {
        /// The duplicated code.
        code: WbsCode,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::MissingIdentifier { row } => {
                write!(f, "row {row}: empty or placeholder identifier, skipped")
            }
            Self::UnknownStatus { identifier, value } => write!(
                f,
                "{identifier}: unknown commissioning status '{value}', treated as TBC"
            ),
            Self::DuplicateIdentifier { identifier, status } => write!(
                f,
                "{identifier}: duplicate identifier in status {status}, first occurrence kept"
            ),
            Self::UnresolvedParent { child, parent } => {
                write!(f, "{child}: parent '{parent}' not found")
            }
            Self::ParentCycle { members } => {
                let members: Vec<&str> = members.iter().map(Identifier::as_str).collect();
                write!(f, "parent references form a cycle: {}", members.join(" → "))
            }
            Self::UnrecognisedCategory { identifier } => {
                write!(f, "{identifier}: no category pattern matched")
            }
            Self::OrphanedChild {
                child,
                parent,
                code,
            } => write!(
                f,
                "{child}: parent '{parent}' not in category, placed at {code} for review"
            ),
            Self::Unplaced {
                identifier,
                parent,
                code,
            } => match parent {
                Some(parent) => write!(
                    f,
                    "{identifier}: parent '{parent}' not found in WBS, fallback node {code}"
                ),
                None => write!(f, "{identifier}: could not be placed, fallback node {code}"),
            },
            Self::UnreadableNode { code, name } => {
                write!(f, "{code}: cannot read an identifier from '{name}'")
            }
            Self::DuplicateCode { code } => {
                write!(f, "{code}: duplicate WBS code, first node kept")
            }
        }
    }
}
