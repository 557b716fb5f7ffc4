//! First-time WBS generation.
//!
//! The tree is laid out by depth:
//!
//! ```text
//! 1                 project root
//! 1.1               Milestones
//! 1.2               Pre-requisites
//! 1.3 … 1.n         one section per subsystem
//! 1.3.1 … 1.3.k     one node per category, unrecognised last
//! 1.3.4.1           parent equipment
//! 1.3.4.1.1         its children
//! 1.3.4.2           orphaned children, after the parents
//! 1.(n+1)           TBC section, one node per TBC record
//! 1.(n+2)           Energisation, four fixed phases
//! ```
//!
//! Every code is the next free sequence number under its parent, taken by
//! scanning the arena, so the output depends only on input order.

use tracing::instrument;

use crate::{
    domain::{naming, Config, EquipmentRecord, WbsCode, WbsNode, WbsTree, Warning},
    engine::{
        aggregator::{CategoryAggregator, CategoryBucket},
        categorize::ClassifiedEquipment,
    },
};

/// The output of [`HierarchyGenerator::generate`].
#[derive(Debug, Default)]
pub struct Generated {
    /// The generated tree.
    pub tree: WbsTree,
    /// Conditions found while laying out the tree.
    pub warnings: Vec<Warning>,
}

/// Builds a complete WBS tree from categorised equipment.
#[derive(Debug, Clone, Copy)]
pub struct HierarchyGenerator<'c> {
    config: &'c Config,
}

impl<'c> HierarchyGenerator<'c> {
    /// Creates a generator using the category table and section names of
    /// `config`.
    #[must_use]
    pub const fn new(config: &'c Config) -> Self {
        Self { config }
    }

    /// Generates the tree.
    ///
    /// Empty input is not an error: it yields the skeleton of root, standard
    /// sections, the default subsystem with every category, and the
    /// energisation phases.
    #[instrument(
        level = "debug",
        skip(self, equipment, tbc),
        fields(equipment = equipment.len(), tbc = tbc.len())
    )]
    #[must_use]
    pub fn generate(
        &self,
        equipment: &[ClassifiedEquipment],
        tbc: &[EquipmentRecord],
        project_name: &str,
    ) -> Generated {
        let mut builder = Builder::default();
        let root = WbsCode::root();

        builder.push(WbsNode::structural(root.clone(), project_name));
        builder.push_child(&root, |code| WbsNode::structural(code, naming::MILESTONES));
        builder.push_child(&root, |code| WbsNode::structural(code, naming::PREREQUISITES));

        for subsystem in self.subsystems(equipment) {
            let members = equipment
                .iter()
                .filter(|item| naming::same_subsystem(&item.subsystem, &subsystem));
            let buckets = CategoryAggregator::new(self.config).aggregate(members);
            self.emit_subsystem(&mut builder, &root, &subsystem, &buckets);
        }

        let tbc_section =
            builder.push_child(&root, |code| WbsNode::structural(code, naming::TBC));
        for record in tbc {
            let name = naming::equipment_name(&record.identifier, &record.description);
            builder.push_child(&tbc_section, |code| WbsNode::equipment(code, name));
        }

        let energisation =
            builder.push_child(&root, |code| WbsNode::structural(code, naming::ENERGISATION));
        for phase in &self.config.energisation_phases {
            builder.push_child(&energisation, |code| WbsNode::structural(code, phase.as_str()));
        }

        tracing::debug!(nodes = builder.tree.len(), "generated tree");
        Generated {
            tree: builder.tree,
            warnings: builder.warnings,
        }
    }

    /// Distinct subsystems in first-seen order; the default subsystem alone
    /// when there is no equipment.
    fn subsystems(&self, equipment: &[ClassifiedEquipment]) -> Vec<String> {
        let mut subsystems: Vec<String> = Vec::new();
        for item in equipment {
            if !subsystems
                .iter()
                .any(|known| naming::same_subsystem(known, &item.subsystem))
            {
                subsystems.push(item.subsystem.clone());
            }
        }
        if subsystems.is_empty() {
            subsystems.push(self.config.default_subsystem.clone());
        }
        subsystems
    }

    fn emit_subsystem(
        &self,
        builder: &mut Builder,
        root: &WbsCode,
        subsystem: &str,
        buckets: &[CategoryBucket<'_>],
    ) {
        let subsystem_label = Some(subsystem.to_string());
        let section = builder.push_child(root, |code| {
            WbsNode::structural(code, subsystem).in_subsystem(subsystem_label.clone())
        });

        for bucket in buckets {
            let category = Some(bucket.code.clone());
            let category_code = builder.push_child(&section, |code| {
                WbsNode::structural(code, naming::category_name(&bucket.code, &bucket.name))
                    .in_category(category.clone())
                    .in_subsystem(subsystem_label.clone())
            });

            let equipment_node = |code: WbsCode, item: &ClassifiedEquipment, suffix: &str| {
                let name = naming::equipment_name(item.identifier(), &item.record.description);
                WbsNode::equipment(code, format!("{name}{suffix}"))
                    .in_category(category.clone())
                    .in_subsystem(subsystem_label.clone())
            };

            for parent in bucket.parents.iter().copied() {
                let parent_code =
                    builder.push_child(&category_code, |code| equipment_node(code, parent, ""));
                for child in bucket.children_of(parent) {
                    builder.push_child(&parent_code, |code| equipment_node(code, child, ""));
                }
            }

            for orphan in bucket.orphans() {
                let code = builder.push_child(&category_code, |code| {
                    equipment_node(code, orphan, naming::ORPHAN_SUFFIX)
                });
                if let Some(parent) = orphan.record.declared_parent() {
                    tracing::debug!(child = %orphan.identifier(), %parent, %code, "orphaned child");
                    builder.warnings.push(Warning::OrphanedChild {
                        child: orphan.identifier().clone(),
                        parent: parent.clone(),
                        code,
                    });
                }
            }
        }
    }
}

#[derive(Debug, Default)]
struct Builder {
    tree: WbsTree,
    warnings: Vec<Warning>,
}

impl Builder {
    fn push(&mut self, node: WbsNode) {
        // codes come from next_child_code, so they are free by construction
        let inserted = self.tree.insert(node);
        debug_assert!(inserted.is_ok(), "generator allocated a taken code");
    }

    /// Allocates the next code below `parent`, builds the node and returns its
    /// code.
    fn push_child(&mut self, parent: &WbsCode, make: impl FnOnce(WbsCode) -> WbsNode) -> WbsCode {
        let code = self.tree.next_child_code(parent);
        self.push(make(code.clone()));
        code
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{CommissioningStatus, Identifier},
        engine::{categorize::categorize, classifier::PatternClassifier, validation::validate},
    };

    fn id(s: &str) -> Identifier {
        Identifier::new(s).unwrap()
    }

    fn code(s: &str) -> WbsCode {
        s.parse().unwrap()
    }

    fn generate(records: &[EquipmentRecord]) -> Generated {
        let config = Config::default();
        let classifier = PatternClassifier::new(&config).unwrap();
        let categorized = categorize(records, &classifier, &config);
        HierarchyGenerator::new(&config).generate(
            &categorized.equipment,
            &categorized.tbc,
            "Substation A",
        )
    }

    fn names(tree: &WbsTree) -> Vec<(String, String)> {
        tree.iter()
            .map(|node| (node.code.to_string(), node.name.clone()))
            .collect()
    }

    #[test]
    fn empty_input_produces_skeleton() {
        let config = Config::default();
        let generated = generate(&[]);
        let tree = &generated.tree;

        assert_eq!(tree.root().unwrap().name, "Substation A");
        assert_eq!(tree.get(&code("1.1")).unwrap().name, naming::MILESTONES);
        assert_eq!(tree.get(&code("1.2")).unwrap().name, naming::PREREQUISITES);
        assert_eq!(tree.get(&code("1.3")).unwrap().name, "General");
        assert_eq!(tree.get(&code("1.4")).unwrap().name, naming::TBC);
        assert_eq!(tree.get(&code("1.5")).unwrap().name, naming::ENERGISATION);
        assert_eq!(tree.children(&code("1.5")).count(), 4);
        assert_eq!(
            tree.children(&code("1.3")).count(),
            config.categories().len() + 1
        );
        assert_eq!(tree.equipment().count(), 0);
        assert!(generated.warnings.is_empty());
    }

    #[test]
    fn categories_are_in_canonical_order_with_unrecognised_last() {
        let generated = generate(&[]);
        let categories: Vec<String> = generated
            .tree
            .children(&code("1.3"))
            .map(|node| node.name.clone())
            .collect();

        assert_eq!(categories.first().unwrap(), "01 | Protection & Control Panels");
        assert_eq!(categories[3], "04 | Transformers");
        assert_eq!(categories.last().unwrap(), "99 | Unrecognised Equipment");
    }

    #[test]
    fn child_follows_its_parent() {
        let generated = generate(&[
            EquipmentRecord::new(id("UH101"), "Feeder panel"),
            EquipmentRecord::new(id("UH101-F"), "Relay").with_parent(id("UH101")),
        ]);
        let tree = &generated.tree;

        let panel = tree.get(&code("1.3.1.1")).unwrap();
        assert_eq!(panel.name, "UH101 | Feeder panel");
        assert_eq!(panel.level, 4);

        let relay = tree.get(&code("1.3.1.1.1")).unwrap();
        assert_eq!(relay.name, "UH101-F | Relay");
        assert_eq!(relay.level, 5);
        assert_eq!(relay.parent_code, Some(code("1.3.1.1")));
    }

    #[test]
    fn parents_interleave_with_their_children() {
        let generated = generate(&[
            EquipmentRecord::new(id("UH101"), ""),
            EquipmentRecord::new(id("UH102"), ""),
            EquipmentRecord::new(id("UH102-A"), "").with_parent(id("UH102")),
            EquipmentRecord::new(id("UH101-A"), "").with_parent(id("UH101")),
        ]);

        let panels: Vec<(String, String)> = names(&generated.tree)
            .into_iter()
            .filter(|(code, _)| code.starts_with("1.3.1."))
            .collect();

        assert_eq!(
            panels,
            [
                ("1.3.1.1".to_string(), "UH101".to_string()),
                ("1.3.1.1.1".to_string(), "UH101-A".to_string()),
                ("1.3.1.2".to_string(), "UH102".to_string()),
                ("1.3.1.2.1".to_string(), "UH102-A".to_string()),
            ]
        );
    }

    #[test]
    fn orphaned_child_is_placed_under_category() {
        let generated = generate(&[
            EquipmentRecord::new(id("UH101"), ""),
            EquipmentRecord::new(id("UH555-F"), "Relay").with_parent(id("UH555")),
        ]);

        let orphan = generated.tree.get(&code("1.3.1.2")).unwrap();
        assert_eq!(orphan.name, "UH555-F | Relay [ORPHAN]");
        assert_eq!(orphan.level, 4);
        assert_eq!(
            generated.warnings,
            [Warning::OrphanedChild {
                child: id("UH555-F"),
                parent: id("UH555"),
                code: code("1.3.1.2"),
            }]
        );
    }

    #[test]
    fn tbc_equipment_is_flattened_in_input_order() {
        let generated = generate(&[
            EquipmentRecord::new(id("Z2"), "second").with_status(CommissioningStatus::Tbc),
            EquipmentRecord::new(id("T01"), ""),
            EquipmentRecord::new(id("UH1"), "first")
                .with_status(CommissioningStatus::Tbc)
                .with_parent(id("Z2")),
        ]);
        let tree = &generated.tree;

        let tbc: Vec<String> = tree
            .children(&code("1.4"))
            .map(|node| node.name.clone())
            .collect();
        assert_eq!(tbc, ["Z2 | second", "UH1 | first"]);
        assert!(tree.get(&code("1.4.1")).unwrap().is_equipment);
    }

    #[test]
    fn each_subsystem_gets_a_section() {
        let generated = generate(&[
            EquipmentRecord::new(id("T01"), "").with_subsystem("North Yard"),
            EquipmentRecord::new(id("T02"), "").with_subsystem("South Yard"),
            EquipmentRecord::new(id("T03"), "").with_subsystem("north yard"),
        ]);
        let tree = &generated.tree;

        assert_eq!(tree.get(&code("1.3")).unwrap().name, "North Yard");
        assert_eq!(tree.get(&code("1.4")).unwrap().name, "South Yard");
        assert_eq!(tree.get(&code("1.5")).unwrap().name, naming::TBC);
        assert_eq!(tree.get(&code("1.6")).unwrap().name, naming::ENERGISATION);
        assert_eq!(tree.children(&code("1.3.4")).count(), 2);
        assert_eq!(tree.children(&code("1.4.4")).count(), 1);
    }

    #[test]
    fn output_is_connected_and_valid() {
        let generated = generate(&[
            EquipmentRecord::new(id("UH101"), ""),
            EquipmentRecord::new(id("UH101-F"), "").with_parent(id("UH101")),
            EquipmentRecord::new(id("UH7-F"), "").with_parent(id("UH7")),
            EquipmentRecord::new(id("WIDGET"), ""),
            EquipmentRecord::new(id("X"), "").with_status(CommissioningStatus::Tbc),
        ]);
        let nodes = generated.tree.clone().into_nodes();

        for node in &nodes {
            if let Some(parent) = &node.parent_code {
                assert!(generated.tree.get(parent).is_some(), "dangling {}", node.code);
            }
        }
        let report = validate(&nodes);
        assert!(report.is_valid(), "{report:?}");
        assert!(report.warnings().next().is_none(), "{report:?}");
    }

    #[test]
    fn generation_is_deterministic() {
        let records = vec![
            EquipmentRecord::new(id("UH101"), ""),
            EquipmentRecord::new(id("T01"), ""),
            EquipmentRecord::new(id("UH101-F"), "").with_parent(id("UH101")),
        ];
        assert_eq!(generate(&records).tree, generate(&records).tree);
    }
}
