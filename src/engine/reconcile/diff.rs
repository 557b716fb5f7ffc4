//! Identity and subsystem diff between an existing tree and a new equipment
//! list.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use nonempty::NonEmpty;
use serde::Serialize;

use crate::{
    domain::{
        naming, CommissioningStatus, EquipmentRecord, Identifier, WbsCode, WbsTree, Warning,
    },
    engine::categorize::ClassifiedEquipment,
};

/// A piece of equipment found in an existing tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistingEquipment {
    /// Identifier read from the node name.
    pub identifier: Identifier,
    /// Description read from the node name.
    pub description: String,
    /// `Tbc` when the node sits in the TBC section.
    pub status: CommissioningStatus,
    /// Subsystem of the node, if the tree records one.
    pub subsystem: Option<String>,
    /// Code of the node.
    pub code: WbsCode,
    /// Whether the node sits below another equipment node, whose subsystem
    /// it follows.
    #[serde(skip)]
    pub nested: bool,
}

/// Reads the equipment out of a tree, in code order.
///
/// Equipment nodes whose name yields no identifier are skipped with a
/// warning. When an identifier appears twice the first node wins.
pub(super) fn existing_equipment(tree: &WbsTree) -> (Vec<ExistingEquipment>, Vec<Warning>) {
    let mut seen = BTreeSet::new();
    let mut equipment = Vec::new();
    let mut warnings = Vec::new();

    for node in tree.equipment() {
        let (identifier, description) = naming::parse_equipment_name(&node.name);
        let Some(identifier) = Identifier::new(identifier) else {
            tracing::warn!(code = %node.code, name = %node.name, "unreadable equipment node");
            warnings.push(Warning::UnreadableNode {
                code: node.code.clone(),
                name: node.name.clone(),
            });
            continue;
        };

        let in_tbc = tree
            .section_of(&node.code)
            .is_some_and(|section| section.name.trim().eq_ignore_ascii_case(naming::TBC));
        let status = if in_tbc {
            CommissioningStatus::Tbc
        } else {
            CommissioningStatus::Yes
        };

        if !seen.insert(identifier.clone()) {
            tracing::warn!(%identifier, code = %node.code, "equipment appears twice in tree");
            warnings.push(Warning::DuplicateIdentifier { identifier, status });
            continue;
        }

        let nested = node
            .code
            .parent()
            .and_then(|parent| tree.get(&parent))
            .is_some_and(|parent| parent.is_equipment);

        equipment.push(ExistingEquipment {
            identifier,
            description: description.to_string(),
            status,
            subsystem: node.subsystem.clone(),
            code: node.code.clone(),
            nested,
        });
    }

    (equipment, warnings)
}

/// An item of the new equipment list that belongs in the WBS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    /// In-scope equipment, classified.
    Active(ClassifiedEquipment),
    /// TBC equipment.
    Tbc(EquipmentRecord),
}

impl Candidate {
    /// The underlying record.
    #[must_use]
    pub const fn record(&self) -> &EquipmentRecord {
        match self {
            Self::Active(item) => &item.record,
            Self::Tbc(record) => record,
        }
    }

    /// The equipment identifier.
    #[must_use]
    pub const fn identifier(&self) -> &Identifier {
        &self.record().identifier
    }

    /// The resolved subsystem. TBC equipment has none.
    #[must_use]
    pub fn subsystem(&self) -> Option<&str> {
        match self {
            Self::Active(item) => Some(&item.subsystem),
            Self::Tbc(_) => None,
        }
    }
}

/// A compared attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    /// Free-text description.
    Description,
    /// Commissioning status.
    CommissioningStatus,
    /// Subsystem label.
    Subsystem,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Description => "description",
            Self::CommissioningStatus => "commissioning status",
            Self::Subsystem => "subsystem",
        })
    }
}

/// A single attribute difference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldChange {
    /// The attribute.
    pub field: Field,
    /// Value in the existing tree.
    pub existing: String,
    /// Value in the new list.
    pub new: String,
}

impl fmt::Display for FieldChange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: '{}' → '{}'", self.field, self.existing, self.new)
    }
}

/// Equipment present on both sides with at least one differing attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Modified {
    /// The equipment identifier.
    pub identifier: Identifier,
    /// Its code in the existing tree, which is kept.
    pub code: WbsCode,
    /// What changed.
    pub changes: NonEmpty<FieldChange>,
}

/// The identity diff.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComparisonResult {
    /// Equipment only in the new list, in input order (in-scope first, then
    /// TBC).
    pub added: Vec<Candidate>,
    /// Equipment only in the existing tree, in code order.
    pub removed: Vec<ExistingEquipment>,
    /// Equipment on both sides with differing attributes.
    pub modified: Vec<Modified>,
    /// Equipment on both sides with identical attributes.
    pub unchanged: Vec<Identifier>,
}

/// Partitions the new list against the existing equipment by identifier.
pub(super) fn compare(
    existing: &[ExistingEquipment],
    candidates: Vec<Candidate>,
) -> ComparisonResult {
    let by_identifier: BTreeMap<&Identifier, &ExistingEquipment> = existing
        .iter()
        .map(|equipment| (&equipment.identifier, equipment))
        .collect();

    let mut result = ComparisonResult::default();
    let mut present = BTreeSet::new();

    for candidate in candidates {
        present.insert(candidate.identifier().clone());
        let Some(&current) = by_identifier.get(candidate.identifier()) else {
            result.added.push(candidate);
            continue;
        };

        match NonEmpty::from_vec(changes(current, &candidate)) {
            Some(changes) => result.modified.push(Modified {
                identifier: current.identifier.clone(),
                code: current.code.clone(),
                changes,
            }),
            None => result.unchanged.push(current.identifier.clone()),
        }
    }

    result.removed = existing
        .iter()
        .filter(|equipment| !present.contains(&equipment.identifier))
        .cloned()
        .collect();

    result
}

/// Field-by-field differences. A subsystem is only compared when the tree
/// records one for the node and the node is not nested under another piece of
/// equipment.
fn changes(current: &ExistingEquipment, candidate: &Candidate) -> Vec<FieldChange> {
    let record = candidate.record();
    let mut changes = Vec::new();

    if current.description.trim() != record.description.trim() {
        changes.push(FieldChange {
            field: Field::Description,
            existing: current.description.clone(),
            new: record.description.trim().to_string(),
        });
    }

    if current.status != record.commissioning_status {
        changes.push(FieldChange {
            field: Field::CommissioningStatus,
            existing: current.status.to_string(),
            new: record.commissioning_status.to_string(),
        });
    }

    if let (false, Some(existing), Some(new)) =
        (current.nested, &current.subsystem, candidate.subsystem())
    {
        if !naming::same_subsystem(existing, new) {
            changes.push(FieldChange {
                field: Field::Subsystem,
                existing: existing.clone(),
                new: new.to_string(),
            });
        }
    }

    changes
}

/// Subsystems already in the tree versus those the new list introduces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubsystemDiff {
    /// Every subsystem section of the existing tree, in code order.
    pub materialized: Vec<String>,
    /// Subsystems of the new list that already have a section.
    pub existing: Vec<String>,
    /// Subsystems of the new list without a section, in first-seen order.
    pub introduced: Vec<String>,
}

pub(super) fn subsystems(tree: &WbsTree, equipment: &[ClassifiedEquipment]) -> SubsystemDiff {
    let materialized: Vec<String> = tree.subsystems().map(|node| node.name.clone()).collect();
    let mut diff = SubsystemDiff::default();

    for item in equipment {
        let label = &item.subsystem;
        let known = |list: &[String]| list.iter().any(|name| naming::same_subsystem(name, label));
        if known(&diff.existing) || known(&diff.introduced) {
            continue;
        }
        if known(&materialized) {
            diff.existing.push(label.clone());
        } else {
            diff.introduced.push(label.clone());
        }
    }

    diff.materialized = materialized;
    diff
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{CategoryCode, ExistingNode},
        engine::categorize::Role,
    };

    fn id(s: &str) -> Identifier {
        Identifier::new(s).unwrap()
    }

    fn code(s: &str) -> WbsCode {
        s.parse().unwrap()
    }

    fn tree() -> WbsTree {
        WbsTree::import(vec![
            ExistingNode::new(WbsCode::root(), "Project"),
            ExistingNode::new(code("1.3"), "General"),
            ExistingNode::new(code("1.3.4"), "04 | Transformers"),
            ExistingNode::new(code("1.3.4.1"), "T01 | Grid transformer"),
            ExistingNode::new(code("1.3.4.2"), "T02"),
            ExistingNode::new(code("1.4"), naming::TBC),
            ExistingNode::new(code("1.4.1"), "X1 | Pending"),
        ])
        .0
    }

    fn active(identifier: &str, description: &str) -> Candidate {
        Candidate::Active(ClassifiedEquipment {
            record: EquipmentRecord::new(id(identifier), description),
            category: CategoryCode::new("04"),
            role: Role::Parent,
            parent: None,
            subsystem: "General".to_string(),
        })
    }

    #[test]
    fn existing_equipment_is_read_from_names() {
        let (equipment, warnings) = existing_equipment(&tree());

        assert!(warnings.is_empty());
        assert_eq!(equipment.len(), 3);
        assert_eq!(equipment[0].identifier, id("T01"));
        assert_eq!(equipment[0].description, "Grid transformer");
        assert_eq!(equipment[0].subsystem.as_deref(), Some("General"));
        assert_eq!(equipment[2].status, CommissioningStatus::Tbc);
        assert_eq!(equipment[2].subsystem, None);
    }

    #[test]
    fn comparison_partitions_by_identifier() {
        let (existing, _) = existing_equipment(&tree());
        let candidates = vec![
            active("T01", "Grid transformer"),
            active("T02", "Spare"),
            active("T03", ""),
        ];

        let result = compare(&existing, candidates);

        assert_eq!(result.unchanged, [id("T01")]);
        assert_eq!(result.modified.len(), 1);
        assert_eq!(result.modified[0].code, code("1.3.4.2"));
        assert_eq!(result.modified[0].changes.head.field, Field::Description);
        assert_eq!(result.added.len(), 1);
        assert_eq!(result.added[0].identifier(), &id("T03"));
        let removed: Vec<&Identifier> = result.removed.iter().map(|e| &e.identifier).collect();
        assert_eq!(removed, [&id("X1")]);
    }

    #[test]
    fn status_and_subsystem_changes_are_reported() {
        let (existing, _) = existing_equipment(&tree());
        let mut moved = active("T01", "Grid transformer");
        if let Candidate::Active(item) = &mut moved {
            item.subsystem = "North Yard".to_string();
        }
        let confirmed = active("X1", "Pending");

        let result = compare(&existing, vec![moved, confirmed]);

        let fields: Vec<Vec<Field>> = result
            .modified
            .iter()
            .map(|modified| modified.changes.iter().map(|change| change.field).collect())
            .collect();
        assert_eq!(
            fields,
            [vec![Field::Subsystem], vec![Field::CommissioningStatus]]
        );
    }

    #[test]
    fn subsystem_case_differences_are_not_changes() {
        let (existing, _) = existing_equipment(&tree());
        let mut item = active("T01", "Grid transformer");
        if let Candidate::Active(item) = &mut item {
            item.subsystem = "general".to_string();
        }

        let result = compare(&existing, vec![item]);

        assert_eq!(result.unchanged, [id("T01")]);
    }

    #[test]
    fn subsystems_are_partitioned() {
        let items: Vec<ClassifiedEquipment> = [("T01", "GENERAL"), ("T05", "North Yard")]
            .into_iter()
            .map(|(identifier, subsystem)| ClassifiedEquipment {
                record: EquipmentRecord::new(id(identifier), ""),
                category: CategoryCode::new("04"),
                role: Role::Parent,
                parent: None,
                subsystem: subsystem.to_string(),
            })
            .collect();

        let diff = subsystems(&tree(), &items);

        assert_eq!(diff.materialized, ["General"]);
        assert_eq!(diff.existing, ["GENERAL"]);
        assert_eq!(diff.introduced, ["North Yard"]);
    }
}
