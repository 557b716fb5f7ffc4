//! Status split, relationship analysis and classification in one stage.

use std::collections::BTreeSet;

use tracing::instrument;

use crate::{
    domain::{CategoryCode, Config, EquipmentRecord, Identifier, Warning},
    engine::{
        classifier::PatternClassifier,
        relationships::{partition_by_status, Relationship, RelationshipAnalyzer},
    },
};

/// Whether a record is a structural parent or a child of another record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// A structural parent (owns children, or has no parent).
    Parent,
    /// A child of another record.
    Child,
}

/// An in-scope record with its category, role, and resolved placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedEquipment {
    /// The source record.
    pub record: EquipmentRecord,
    /// The assigned category. Children with a known parent inherit the
    /// parent's category.
    pub category: CategoryCode,
    /// Parent or child.
    pub role: Role,
    /// The parent, when this is a child whose parent is a known record.
    pub parent: Option<Identifier>,
    /// The subsystem the equipment is placed in. Children with a known parent
    /// inherit the parent's subsystem; unlabelled records use the default
    /// subsystem.
    pub subsystem: String,
}

impl ClassifiedEquipment {
    /// The equipment identifier.
    #[must_use]
    pub const fn identifier(&self) -> &Identifier {
        &self.record.identifier
    }

    /// Whether this is a structural parent.
    #[must_use]
    pub fn is_parent(&self) -> bool {
        self.role == Role::Parent
    }

    /// Whether this is a child.
    #[must_use]
    pub fn is_child(&self) -> bool {
        self.role == Role::Child
    }
}

/// The output of [`categorize`].
#[derive(Debug, Default)]
pub struct Categorized {
    /// In-scope equipment, in input order.
    pub equipment: Vec<ClassifiedEquipment>,
    /// TBC equipment, in input order. Not categorised.
    pub tbc: Vec<EquipmentRecord>,
    /// Out-of-scope equipment.
    pub excluded: Vec<EquipmentRecord>,
    /// Every declared relationship among in-scope equipment.
    pub relationships: Vec<Relationship>,
    /// Conditions found while categorising.
    pub warnings: Vec<Warning>,
}

/// Runs relationship analysis and classification over a record set.
///
/// Records are first split by commissioning status. In-scope records are
/// analysed for parent/child relationships, then each is classified; a child
/// whose parent resolves takes its parent's category and subsystem rather
/// than its own.
#[instrument(level = "debug", skip_all, fields(records = records.len()))]
#[must_use]
pub fn categorize(
    records: &[EquipmentRecord],
    classifier: &PatternClassifier,
    config: &Config,
) -> Categorized {
    let (active, tbc, excluded) = partition_by_status(records);
    let analysis = RelationshipAnalyzer::new(config).analyze(&active);
    let mut warnings = analysis.warnings.clone();

    let subsystem_of = |record: &EquipmentRecord| {
        record
            .subsystem
            .as_deref()
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .map_or_else(|| config.default_subsystem.clone(), str::to_string)
    };

    let mut equipment = Vec::with_capacity(analysis.lookup.len());
    for record in active.iter() {
        let identifier = &record.identifier;
        let is_subject = analysis
            .record(identifier)
            .is_some_and(|subject| std::ptr::eq(subject, record));
        if !is_subject {
            continue;
        }

        let (role, parent) = if analysis.children.contains(identifier) {
            (Role::Child, analysis.parent_of(identifier).cloned())
        } else {
            (Role::Parent, None)
        };

        let owner = parent
            .as_ref()
            .and_then(|parent| analysis.record(parent))
            .unwrap_or(record);
        let category = classifier.classify(&owner.identifier);
        if category.is_unrecognised() {
            tracing::debug!(%identifier, "unrecognised category");
            warnings.push(Warning::UnrecognisedCategory {
                identifier: identifier.clone(),
            });
        }
        tracing::trace!(%identifier, %category, ?role, "classified");

        equipment.push(ClassifiedEquipment {
            record: record.clone(),
            category,
            role,
            parent,
            subsystem: subsystem_of(owner),
        });
    }

    let tbc = dedup(tbc, &mut warnings);

    Categorized {
        equipment,
        tbc,
        excluded,
        relationships: analysis.relationships,
        warnings,
    }
}

/// Drops repeated identifiers, keeping the first.
fn dedup(records: Vec<EquipmentRecord>, warnings: &mut Vec<Warning>) -> Vec<EquipmentRecord> {
    let mut seen = BTreeSet::new();
    records
        .into_iter()
        .filter(|record| {
            if seen.insert(record.identifier.clone()) {
                true
            } else {
                warnings.push(Warning::DuplicateIdentifier {
                    identifier: record.identifier.clone(),
                    status: record.commissioning_status,
                });
                false
            }
        })
        .collect()
}
