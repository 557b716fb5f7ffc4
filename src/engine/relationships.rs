//! Parent/child analysis over a set of equipment records.

use std::collections::{BTreeMap, BTreeSet};

use petgraph::{algo::tarjan_scc, graphmap::DiGraphMap};
use tracing::instrument;

use crate::domain::{CommissioningStatus, Config, EquipmentRecord, Identifier, Warning};

/// A declared parent-child link between two records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    /// The record declaring the parent.
    pub child: Identifier,
    /// The declared parent.
    pub parent: Identifier,
    /// Whether the parent resolves to a known record.
    ///
    /// Relationships to unknown parents are kept for diagnostics but never
    /// used to place equipment.
    pub parent_exists: bool,
}

/// Builds the identifier lookup and the parent/child classification of a
/// set of records.
#[derive(Debug, Clone, Copy)]
pub struct RelationshipAnalyzer<'c> {
    config: &'c Config,
}

/// The output of [`RelationshipAnalyzer::analyze`].
#[derive(Debug, Default)]
pub struct RelationshipAnalysis<'a> {
    /// Every record by identifier. The first occurrence of a duplicated
    /// identifier wins.
    pub lookup: BTreeMap<&'a Identifier, &'a EquipmentRecord>,
    /// Every declared relationship, resolved or not, in input order.
    pub relationships: Vec<Relationship>,
    /// Records that are structural parents.
    pub parents: BTreeSet<Identifier>,
    /// Records that are children of another record.
    pub children: BTreeSet<Identifier>,
    /// Every identifier referenced as a parent by some record, whether or not
    /// a record with that identifier exists.
    pub referenced: BTreeSet<Identifier>,
    /// Conditions found during the analysis.
    pub warnings: Vec<Warning>,
}

impl<'a> RelationshipAnalysis<'a> {
    /// Relationships whose parent resolves to a known record.
    pub fn valid_relationships(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships
            .iter()
            .filter(|relationship| relationship.parent_exists)
    }

    /// The resolved parent of `child`, if it is a child with a known parent.
    #[must_use]
    pub fn parent_of(&self, child: &Identifier) -> Option<&Identifier> {
        if !self.children.contains(child) {
            return None;
        }
        self.valid_relationships()
            .find(|relationship| &relationship.child == child)
            .map(|relationship| &relationship.parent)
    }

    /// The record with the given identifier.
    #[must_use]
    pub fn record(&self, identifier: &Identifier) -> Option<&'a EquipmentRecord> {
        self.lookup.get(identifier).copied()
    }
}

impl<'c> RelationshipAnalyzer<'c> {
    /// Creates an analyzer using the placeholder table of `config`.
    #[must_use]
    pub const fn new(config: &'c Config) -> Self {
        Self { config }
    }

    /// Classifies every record as a parent or a child and records the
    /// declared relationships.
    ///
    /// A record is a parent when it declares no parent, a placeholder parent
    /// or itself, or when another record names it as parent (a record that
    /// owns children stays a parent even if it declares its own parent; that
    /// declaration is still recorded as a relationship). Every other record is
    /// a child.
    #[instrument(level = "debug", skip_all, fields(records = records.len()))]
    pub fn analyze<'a>(&self, records: &'a [EquipmentRecord]) -> RelationshipAnalysis<'a> {
        let mut analysis = RelationshipAnalysis::default();
        let mut subjects = Vec::with_capacity(records.len());

        for record in records {
            if self.config.is_placeholder(&record.identifier) {
                continue;
            }
            if analysis.lookup.contains_key(&record.identifier) {
                tracing::warn!(identifier = %record.identifier, "duplicate identifier");
                analysis.warnings.push(Warning::DuplicateIdentifier {
                    identifier: record.identifier.clone(),
                    status: record.commissioning_status,
                });
                continue;
            }
            analysis.lookup.insert(&record.identifier, record);
            subjects.push(record);
        }

        for record in &subjects {
            if let Some(parent) = self.declared_parent(record) {
                analysis.referenced.insert(parent.clone());
            }
        }

        for record in subjects {
            let identifier = record.identifier.clone();
            let Some(parent) = self.declared_parent(record) else {
                analysis.parents.insert(identifier);
                continue;
            };

            let parent_exists = analysis.lookup.contains_key(parent);
            if !parent_exists {
                tracing::warn!(child = %identifier, %parent, "parent not found");
                analysis.warnings.push(Warning::UnresolvedParent {
                    child: identifier.clone(),
                    parent: parent.clone(),
                });
            }
            analysis.relationships.push(Relationship {
                child: identifier.clone(),
                parent: parent.clone(),
                parent_exists,
            });

            if analysis.referenced.contains(&identifier) {
                tracing::trace!(%identifier, "owns children, kept as parent");
                analysis.parents.insert(identifier);
            } else {
                analysis.children.insert(identifier);
            }
        }

        analysis.warnings.extend(cycles(&analysis.relationships));
        analysis
    }

    fn declared_parent<'r>(&self, record: &'r EquipmentRecord) -> Option<&'r Identifier> {
        record
            .declared_parent()
            .filter(|parent| !self.config.is_placeholder(parent))
    }
}

/// Cycles among resolved parent references.
fn cycles(relationships: &[Relationship]) -> Vec<Warning> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for relationship in relationships.iter().filter(|r| r.parent_exists) {
        graph.add_edge(relationship.child.as_str(), relationship.parent.as_str(), ());
    }

    tarjan_scc(&graph)
        .into_iter()
        .filter(|component| component.len() > 1)
        .map(|component| {
            let mut members: Vec<Identifier> =
                component.into_iter().filter_map(Identifier::new).collect();
            members.sort();
            tracing::warn!(?members, "parent references form a cycle");
            Warning::ParentCycle { members }
        })
        .collect()
}

/// Splits records into the in-scope, TBC and out-of-scope buckets, keeping
/// input order within each.
#[must_use]
pub fn partition_by_status(
    records: &[EquipmentRecord],
) -> (Vec<EquipmentRecord>, Vec<EquipmentRecord>, Vec<EquipmentRecord>) {
    let mut active = Vec::new();
    let mut tbc = Vec::new();
    let mut excluded = Vec::new();
    for record in records {
        match record.commissioning_status {
            CommissioningStatus::Yes => active.push(record.clone()),
            CommissioningStatus::Tbc => tbc.push(record.clone()),
            CommissioningStatus::No => excluded.push(record.clone()),
        }
    }
    (active, tbc, excluded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> Identifier {
        Identifier::new(s).unwrap()
    }

    fn record(identifier: &str, parent: Option<&str>) -> EquipmentRecord {
        let record = EquipmentRecord::new(id(identifier), "");
        match parent {
            Some(parent) => record.with_parent(id(parent)),
            None => record,
        }
    }

    #[test]
    fn panel_and_sub_device() {
        let config = Config::default();
        let records = vec![record("UH101", None), record("UH101-F", Some("UH101"))];

        let analysis = RelationshipAnalyzer::new(&config).analyze(&records);

        assert_eq!(analysis.parents, BTreeSet::from([id("UH101")]));
        assert_eq!(analysis.children, BTreeSet::from([id("UH101-F")]));
        assert_eq!(
            analysis.relationships,
            [Relationship {
                child: id("UH101-F"),
                parent: id("UH101"),
                parent_exists: true,
            }]
        );
        assert_eq!(analysis.parent_of(&id("UH101-F")), Some(&id("UH101")));
        assert!(analysis.warnings.is_empty());
    }

    #[test]
    fn sets_are_disjoint_and_cover_every_record() {
        let config = Config::default();
        let records = vec![
            record("A", None),
            record("B", Some("A")),
            record("C", Some("B")),
            record("D", Some("D")),
            record("E", Some("MISSING")),
            record("F", Some("-")),
        ];

        let analysis = RelationshipAnalyzer::new(&config).analyze(&records);

        assert!(analysis.parents.is_disjoint(&analysis.children));
        let union: BTreeSet<_> = analysis.parents.union(&analysis.children).cloned().collect();
        let all: BTreeSet<_> = records.iter().map(|r| r.identifier.clone()).collect();
        assert_eq!(union, all);
    }

    #[test]
    fn record_owning_children_stays_parent() {
        let config = Config::default();
        let records = vec![
            record("A", None),
            record("B", Some("A")),
            record("C", Some("B")),
        ];

        let analysis = RelationshipAnalyzer::new(&config).analyze(&records);

        assert!(analysis.parents.contains(&id("B")));
        assert!(analysis.children.contains(&id("C")));
        assert_eq!(analysis.valid_relationships().count(), 2);
        assert_eq!(analysis.parent_of(&id("B")), None);
    }

    #[test]
    fn self_reference_and_placeholder_are_parents() {
        let config = Config::default();
        let records = vec![record("D", Some("D")), record("F", Some("-"))];

        let analysis = RelationshipAnalyzer::new(&config).analyze(&records);

        assert_eq!(analysis.parents.len(), 2);
        assert!(analysis.relationships.is_empty());
    }

    #[test]
    fn unresolved_parent_is_kept_for_diagnostics() {
        let config = Config::default();
        let records = vec![record("E", Some("MISSING"))];

        let analysis = RelationshipAnalyzer::new(&config).analyze(&records);

        assert!(analysis.children.contains(&id("E")));
        assert!(analysis.referenced.contains(&id("MISSING")));
        assert!(!analysis.parents.contains(&id("MISSING")));
        assert_eq!(analysis.valid_relationships().count(), 0);
        assert_eq!(analysis.parent_of(&id("E")), None);
        assert_eq!(
            analysis.warnings,
            [Warning::UnresolvedParent {
                child: id("E"),
                parent: id("MISSING")
            }]
        );
    }

    #[test]
    fn duplicates_keep_first_record() {
        let config = Config::default();
        let records = vec![
            EquipmentRecord::new(id("T01"), "first"),
            EquipmentRecord::new(id("T01"), "second"),
        ];

        let analysis = RelationshipAnalyzer::new(&config).analyze(&records);

        assert_eq!(analysis.record(&id("T01")).unwrap().description, "first");
        assert!(matches!(
            analysis.warnings.as_slice(),
            [Warning::DuplicateIdentifier { .. }]
        ));
    }

    #[test]
    fn cycles_are_reported() {
        let config = Config::default();
        let records = vec![record("A", Some("B")), record("B", Some("A"))];

        let analysis = RelationshipAnalyzer::new(&config).analyze(&records);

        assert!(analysis.warnings.contains(&Warning::ParentCycle {
            members: vec![id("A"), id("B")]
        }));
        assert!(analysis.parents.is_disjoint(&analysis.children));
    }

    #[test]
    fn partition_keeps_order_within_bucket() {
        let records = vec![
            record("A", None).with_status(CommissioningStatus::Tbc),
            record("B", None),
            record("C", None).with_status(CommissioningStatus::No),
            record("D", None).with_status(CommissioningStatus::Tbc),
        ];

        let (active, tbc, excluded) = partition_by_status(&records);

        assert_eq!(active.len(), 1);
        assert_eq!(
            tbc.iter().map(|r| r.identifier.as_str()).collect::<Vec<_>>(),
            ["A", "D"]
        );
        assert_eq!(excluded.len(), 1);
    }
}
