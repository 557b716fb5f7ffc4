//! Code allocation for added equipment.
//!
//! Each in-scope item is placed by the first tier that resolves:
//!
//! 1. under its declared parent, when an equipment node for that parent
//!    exists in a subsystem section,
//! 2. under its category node in its subsystem section, synthesising the
//!    category node if only the section exists,
//! 3. under a new subsystem section at the next free slot below the root.
//!
//! Items that declare a parent no node answers to never fall through to
//! tiers 2 and 3; they become fallback nodes in the unplaced section. TBC
//! items always go to the TBC section. Existing nodes are never touched.

use std::fmt;

use serde::Serialize;

use crate::{
    domain::{
        naming, CategoryCode, Config, EquipmentRecord, Identifier, WbsCode, WbsNode, WbsTree,
        Warning, UNRECOGNISED_NAME,
    },
    engine::{categorize::ClassifiedEquipment, reconcile::diff::Candidate},
};

/// The rule that placed an added item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Under the node of its declared parent.
    ExistingParent,
    /// Under an existing category node of an existing subsystem.
    ExistingCategory,
    /// Under a category node synthesised in an existing subsystem.
    NewCategory,
    /// Under a newly synthesised subsystem section.
    NewSubsystem,
    /// In the TBC section.
    Tbc,
    /// As a fallback node in the unplaced section.
    Fallback,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::ExistingParent => "existing parent",
            Self::ExistingCategory => "existing category",
            Self::NewCategory => "new category",
            Self::NewSubsystem => "new subsystem",
            Self::Tbc => "TBC",
            Self::Fallback => "fallback",
        })
    }
}

/// Where an added item was placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placement {
    /// The placed item.
    pub identifier: Identifier,
    /// The newly allocated code.
    pub code: WbsCode,
    /// The rule that placed it.
    pub tier: Tier,
}

pub(super) struct Placer<'c> {
    config: &'c Config,
    tree: WbsTree,
    placements: Vec<Placement>,
    warnings: Vec<Warning>,
}

impl<'c> Placer<'c> {
    pub(super) const fn new(config: &'c Config, tree: WbsTree) -> Self {
        Self {
            config,
            tree,
            placements: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub(super) fn finish(self) -> (WbsTree, Vec<Placement>, Vec<Warning>) {
        (self.tree, self.placements, self.warnings)
    }

    /// Places every added item.
    ///
    /// Children whose parent is itself being added are retried once the
    /// parent has a node, so input order does not matter. Whatever is left
    /// when a pass places nothing becomes a fallback node.
    pub(super) fn place_all(&mut self, added: &[Candidate]) {
        let mut pending = Vec::new();
        for candidate in added {
            match candidate {
                Candidate::Tbc(record) => self.place_tbc(record),
                Candidate::Active(item) => pending.push(item),
            }
        }

        loop {
            let before = pending.len();
            pending.retain(|item| !self.try_place(item));
            if pending.is_empty() || pending.len() == before {
                break;
            }
        }

        for item in pending {
            self.place_fallback(item);
        }
    }

    fn try_place(&mut self, item: &ClassifiedEquipment) -> bool {
        if let Some(parent) = tier_one_parent(item) {
            let Some(parent_node) = self.find_equipment(parent) else {
                tracing::trace!(identifier = %item.identifier(), %parent, "parent not yet placed");
                return false;
            };
            let parent_code = parent_node.code.clone();
            let category = parent_node.category.clone();
            let subsystem = parent_node.subsystem.clone();
            self.allocate(&parent_code, item, category, subsystem, Tier::ExistingParent);
            return true;
        }

        let (category_code, subsystem, tier) = match self.find_subsystem(&item.subsystem) {
            Some((section, label)) => match self.find_category(&section, &item.category) {
                Some(category_code) => (category_code, label, Tier::ExistingCategory),
                None => {
                    let category_code = self.add_category(&section, &item.category, &label);
                    (category_code, label, Tier::NewCategory)
                }
            },
            None => {
                let section = self.add_subsystem(&item.subsystem);
                let category_code = match self.find_category(&section, &item.category) {
                    Some(category_code) => category_code,
                    None => self.add_category(&section, &item.category, &item.subsystem),
                };
                (category_code, item.subsystem.clone(), Tier::NewSubsystem)
            }
        };

        self.allocate(
            &category_code,
            item,
            Some(item.category.clone()),
            Some(subsystem),
            tier,
        );
        true
    }

    fn place_tbc(&mut self, record: &EquipmentRecord) {
        let section = self.ensure_section(naming::TBC);
        let code = self.tree.next_child_code(&section);
        let name = naming::equipment_name(&record.identifier, &record.description);
        self.insert(WbsNode::equipment(code.clone(), name).new_allocation());
        tracing::debug!(identifier = %record.identifier, %code, "placed in TBC section");
        self.placements.push(Placement {
            identifier: record.identifier.clone(),
            code,
            tier: Tier::Tbc,
        });
    }

    fn place_fallback(&mut self, item: &ClassifiedEquipment) {
        let section = self.ensure_section(naming::UNPLACED);
        let code = self.tree.next_child_code(&section);
        let name = naming::equipment_name(item.identifier(), &item.record.description);
        self.insert(
            WbsNode::equipment(code.clone(), format!("{name}{}", naming::UNPLACED_SUFFIX))
                .in_category(Some(item.category.clone()))
                .new_allocation(),
        );

        let parent = tier_one_parent(item).cloned();
        tracing::warn!(
            identifier = %item.identifier(),
            ?parent,
            %code,
            "no placement found, fallback node emitted"
        );
        self.warnings.push(Warning::Unplaced {
            identifier: item.identifier().clone(),
            parent,
            code: code.clone(),
        });
        self.placements.push(Placement {
            identifier: item.identifier().clone(),
            code,
            tier: Tier::Fallback,
        });
    }

    fn allocate(
        &mut self,
        parent: &WbsCode,
        item: &ClassifiedEquipment,
        category: Option<CategoryCode>,
        subsystem: Option<String>,
        tier: Tier,
    ) {
        let code = self.tree.next_child_code(parent);
        let name = naming::equipment_name(item.identifier(), &item.record.description);
        self.insert(
            WbsNode::equipment(code.clone(), name)
                .in_category(category)
                .in_subsystem(subsystem)
                .new_allocation(),
        );
        tracing::debug!(identifier = %item.identifier(), %code, ?tier, "placed");
        self.placements.push(Placement {
            identifier: item.identifier().clone(),
            code,
            tier,
        });
    }

    fn insert(&mut self, node: WbsNode) {
        // codes come from next_child_code, so they are free by construction
        let inserted = self.tree.insert(node);
        debug_assert!(inserted.is_ok(), "placement allocated a taken code");
    }

    /// The equipment node whose identifier matches `parent`, ignoring
    /// designation markers.
    ///
    /// Only nodes inside subsystem sections count. Nodes in the TBC and
    /// unplaced sections cannot take children.
    fn find_equipment(&self, parent: &Identifier) -> Option<&WbsNode> {
        self.tree
            .equipment()
            .filter(|node| {
                self.tree
                    .section_of(&node.code)
                    .is_some_and(|section| !naming::is_standard_section(&section.name))
            })
            .find(|node| {
                let (identifier, _) = naming::parse_equipment_name(&node.name);
                Identifier::new(identifier).is_some_and(|identifier| identifier.matches(parent))
            })
    }

    /// The subsystem section for `label` and its name as written in the tree.
    fn find_subsystem(&self, label: &str) -> Option<(WbsCode, String)> {
        self.tree
            .subsystems()
            .find(|node| naming::same_subsystem(&node.name, label))
            .map(|node| (node.code.clone(), node.name.clone()))
    }

    fn find_category(&self, section: &WbsCode, category: &CategoryCode) -> Option<WbsCode> {
        self.tree
            .find_child(section, |node| {
                !node.is_equipment && node.category.as_ref() == Some(category)
            })
            .map(|node| node.code.clone())
    }

    fn add_category(
        &mut self,
        section: &WbsCode,
        category: &CategoryCode,
        subsystem: &str,
    ) -> WbsCode {
        let name = self.config.category_name(category).unwrap_or(UNRECOGNISED_NAME);
        let code = self.tree.next_child_code(section);
        self.insert(
            WbsNode::structural(code.clone(), naming::category_name(category, name))
                .in_category(Some(category.clone()))
                .in_subsystem(Some(subsystem.to_string()))
                .new_allocation(),
        );
        tracing::debug!(%code, %category, "synthesised category node");
        code
    }

    /// A new subsystem section with every category node, at the next free
    /// slot below the root.
    fn add_subsystem(&mut self, label: &str) -> WbsCode {
        let section = self.tree.next_child_code(&WbsCode::root());
        self.insert(
            WbsNode::structural(section.clone(), label)
                .in_subsystem(Some(label.to_string()))
                .new_allocation(),
        );
        tracing::debug!(code = %section, subsystem = label, "synthesised subsystem section");

        for (category, name) in self.config.category_table() {
            let code = self.tree.next_child_code(&section);
            self.insert(
                WbsNode::structural(code, naming::category_name(&category, &name))
                    .in_category(Some(category))
                    .in_subsystem(Some(label.to_string()))
                    .new_allocation(),
            );
        }
        section
    }

    /// The standard section called `name`, synthesised at the next free slot
    /// below the root if the tree lacks it.
    fn ensure_section(&mut self, name: &str) -> WbsCode {
        let root = WbsCode::root();
        if let Some(section) = self
            .tree
            .find_child(&root, |node| node.name.trim().eq_ignore_ascii_case(name))
        {
            return section.code.clone();
        }

        let code = self.tree.next_child_code(&root);
        self.insert(WbsNode::structural(code.clone(), name).new_allocation());
        tracing::debug!(%code, section = name, "synthesised section");
        code
    }
}

/// The parent an item asks to be placed under.
///
/// Only children use their parent reference; a record that owns children
/// is laid out as a parent, as in a generated tree.
fn tier_one_parent(item: &ClassifiedEquipment) -> Option<&Identifier> {
    if item.is_child() {
        item.record.declared_parent()
    } else {
        None
    }
}
