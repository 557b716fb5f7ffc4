//! Reconciliation of a new equipment list against a previously generated
//! tree.
//!
//! Reconciliation is additive. Existing nodes keep their codes, names and
//! positions; only equipment the tree has never seen receives new codes.

use tracing::instrument;

use crate::{
    domain::{Config, WbsNode, WbsTree, Warning},
    engine::categorize::Categorized,
};

mod diff;
pub use diff::{
    Candidate, ComparisonResult, ExistingEquipment, Field, FieldChange, Modified, SubsystemDiff,
};

mod placement;
pub use placement::{Placement, Tier};
use placement::Placer;

/// The output of [`Reconciler::reconcile`].
#[derive(Debug, Clone)]
pub struct Reconciliation {
    /// The identity diff.
    pub comparison: ComparisonResult,
    /// Subsystems already in the tree versus those introduced.
    pub subsystems: SubsystemDiff,
    /// Where each added item was placed, in placement order.
    pub placements: Vec<Placement>,
    /// The integrated tree: every existing node plus the new ones.
    pub tree: WbsTree,
    /// Conditions found while reading the tree and placing items.
    pub warnings: Vec<Warning>,
}

impl Reconciliation {
    /// Nodes allocated by this reconciliation, in code order.
    pub fn new_nodes(&self) -> impl Iterator<Item = &WbsNode> {
        self.tree.iter().filter(|node| node.is_new)
    }
}

/// Diffs categorised equipment against an existing tree and allocates codes
/// for the additions.
#[derive(Debug, Clone, Copy)]
pub struct Reconciler<'c> {
    config: &'c Config,
}

impl<'c> Reconciler<'c> {
    /// Creates a reconciler using the category table of `config`.
    #[must_use]
    pub const fn new(config: &'c Config) -> Self {
        Self { config }
    }

    /// Reconciles `categorized` against `existing`.
    ///
    /// Every node of `existing` appears unchanged in the result, marked as not
    /// new. Reconciling a list against the tree it produced yields no added
    /// items and no new nodes.
    #[instrument(
        level = "debug",
        skip_all,
        fields(
            existing = existing.len(),
            equipment = categorized.equipment.len(),
            tbc = categorized.tbc.len(),
        )
    )]
    #[must_use]
    pub fn reconcile(&self, existing: WbsTree, categorized: &Categorized) -> Reconciliation {
        let existing: WbsTree = existing
            .into_nodes()
            .into_iter()
            .map(|mut node| {
                node.is_new = false;
                node
            })
            .collect();
        let (existing_equipment, mut warnings) = diff::existing_equipment(&existing);

        let candidates = categorized
            .equipment
            .iter()
            .cloned()
            .map(Candidate::Active)
            .chain(categorized.tbc.iter().cloned().map(Candidate::Tbc))
            .collect();
        let comparison = diff::compare(&existing_equipment, candidates);
        let subsystems = diff::subsystems(&existing, &categorized.equipment);
        tracing::debug!(
            added = comparison.added.len(),
            removed = comparison.removed.len(),
            modified = comparison.modified.len(),
            unchanged = comparison.unchanged.len(),
            introduced = ?subsystems.introduced,
            "compared equipment"
        );

        let mut placer = Placer::new(self.config, existing);
        placer.place_all(&comparison.added);
        let (tree, placements, placement_warnings) = placer.finish();
        warnings.extend(placement_warnings);

        Reconciliation {
            comparison,
            subsystems,
            placements,
            tree,
            warnings,
        }
    }
}
