//! In-memory WBS tree.
//!
//! The [`WbsTree`] is an arena of nodes addressed by their [`WbsCode`]. It
//! knows nothing about equipment lists or files; the engine builds trees,
//! and storage reads and writes them.

use std::{
    collections::BTreeMap,
    num::NonZeroUsize,
    ops::Bound::{Excluded, Unbounded},
};

use tracing::instrument;

use crate::domain::{naming, ExistingNode, WbsCode, WbsNode, Warning};

/// An arena of WBS nodes keyed by code.
///
/// Iteration is always in dotted-numeric code order, which is a depth-first,
/// parent-before-child order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WbsTree {
    nodes: BTreeMap<WbsCode, WbsNode>,
}

/// Error returned when inserting a node whose code is already taken.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("WBS code {0} is already allocated")]
pub struct DuplicateCodeError(pub WbsCode);

impl WbsTree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a node.
    ///
    /// # Errors
    ///
    /// Returns an error if a node with the same code already exists. Existing
    /// nodes are never replaced.
    pub fn insert(&mut self, node: WbsNode) -> Result<(), DuplicateCodeError> {
        if self.nodes.contains_key(&node.code) {
            return Err(DuplicateCodeError(node.code));
        }
        self.nodes.insert(node.code.clone(), node);
        Ok(())
    }

    /// Retrieves a node by code.
    #[must_use]
    pub fn get(&self, code: &WbsCode) -> Option<&WbsNode> {
        self.nodes.get(code)
    }

    /// The root node, if present.
    #[must_use]
    pub fn root(&self) -> Option<&WbsNode> {
        self.nodes.get(&WbsCode::root())
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates over all nodes in code order.
    pub fn iter(&self) -> impl Iterator<Item = &WbsNode> {
        self.nodes.values()
    }

    /// Iterates over the equipment nodes in code order.
    pub fn equipment(&self) -> impl Iterator<Item = &WbsNode> {
        self.nodes.values().filter(|node| node.is_equipment)
    }

    /// Consumes the tree, returning its nodes in code order.
    #[must_use]
    pub fn into_nodes(self) -> Vec<WbsNode> {
        self.nodes.into_values().collect()
    }

    /// Iterates over every node strictly below `code`.
    ///
    /// Descendants are contiguous in code order, so this is a range scan.
    pub fn descendants<'a>(&'a self, code: &'a WbsCode) -> impl Iterator<Item = &'a WbsNode> + 'a {
        self.nodes
            .range((Excluded(code), Unbounded))
            .take_while(move |(candidate, _)| code.is_ancestor_of(candidate))
            .map(|(_, node)| node)
    }

    /// Iterates over the direct children of `code`.
    pub fn children<'a>(&'a self, code: &'a WbsCode) -> impl Iterator<Item = &'a WbsNode> + 'a {
        self.descendants(code)
            .filter(move |node| code.is_parent_of(&node.code))
    }

    /// The first direct child of `code` matching `predicate`.
    pub fn find_child<'a>(
        &'a self,
        code: &'a WbsCode,
        mut predicate: impl FnMut(&WbsNode) -> bool,
    ) -> Option<&'a WbsNode> {
        self.children(code).find(|node| predicate(node))
    }

    /// The next unused sequence number below `parent`.
    ///
    /// This is one more than the highest sequence number among the existing
    /// children, so gaps left in a tree are never reused.
    #[must_use]
    pub fn next_sequence(&self, parent: &WbsCode) -> NonZeroUsize {
        self.children(parent)
            .map(|node| node.code.sequence())
            .max()
            .and_then(|max| max.checked_add(1))
            .unwrap_or(NonZeroUsize::MIN)
    }

    /// The code the next child of `parent` would receive.
    #[must_use]
    pub fn next_child_code(&self, parent: &WbsCode) -> WbsCode {
        parent.child(self.next_sequence(parent))
    }

    /// The level-2 ancestor of `code` (the section or subsystem it lives in).
    #[must_use]
    pub fn section_of(&self, code: &WbsCode) -> Option<&WbsNode> {
        let segments = code.segments();
        if segments.len() < 2 {
            return None;
        }
        let section = WbsCode::root().child(segments[1]);
        self.nodes.get(&section)
    }

    /// The level-2 subsystem sections, in code order.
    pub fn subsystems(&self) -> impl Iterator<Item = &WbsNode> + '_ {
        let root = WbsCode::root();
        self.nodes
            .values()
            .filter(move |node| root.is_parent_of(&node.code))
            .filter(|node| !naming::is_standard_section(&node.name))
    }

    /// Builds a tree from nodes read back from an export.
    ///
    /// Missing attributes are inferred in code order, so every node sees its
    /// already-inferred ancestors:
    ///
    /// - `level` from the code depth,
    /// - `is_equipment` for nodes below a category node or directly below the
    ///   TBC or unplaced sections,
    /// - `category` from the nearest category ancestor,
    /// - `subsystem` from the level-2 subsystem section.
    ///
    /// Duplicate codes keep the first node and produce a warning.
    #[instrument(level = "debug", skip(nodes))]
    pub fn import(nodes: Vec<ExistingNode>) -> (Self, Vec<Warning>) {
        let mut warnings = Vec::new();
        let mut ordered: BTreeMap<WbsCode, ExistingNode> = BTreeMap::new();
        for node in nodes {
            if ordered.contains_key(&node.code) {
                tracing::warn!(code = %node.code, "duplicate WBS code in existing tree");
                warnings.push(Warning::DuplicateCode { code: node.code });
                continue;
            }
            ordered.insert(node.code.clone(), node);
        }

        let mut tree = Self::new();
        for (code, existing) in ordered {
            let node = tree.infer(code, existing);
            tree.nodes.insert(node.code.clone(), node);
        }
        (tree, warnings)
    }

    fn infer(&self, code: WbsCode, existing: ExistingNode) -> WbsNode {
        let parent = existing
            .parent_code
            .as_ref()
            .and_then(|parent_code| self.nodes.get(parent_code));
        let section = self.section_of(&code);

        let in_item_section = code.depth() == 3
            && section.is_some_and(|section| {
                let name = section.name.trim();
                name.eq_ignore_ascii_case(naming::TBC)
                    || name.eq_ignore_ascii_case(naming::UNPLACED)
            });
        let below_category = parent.is_some_and(|parent| parent.is_equipment || is_category(parent));
        let is_equipment = existing
            .is_equipment
            .unwrap_or(in_item_section || below_category);

        let category = existing.category.or_else(|| {
            if is_equipment {
                parent.and_then(|parent| parent.category.clone())
            } else {
                naming::parse_category_code(&existing.display_name)
            }
        });

        let is_subsystem_section =
            code.depth() == 2 && !naming::is_standard_section(&existing.display_name);
        let subsystem = existing.subsystem.or_else(|| {
            if is_subsystem_section {
                return Some(existing.display_name.clone());
            }
            section
                .filter(|section| !naming::is_standard_section(&section.name))
                .map(|section| section.name.clone())
                .or_else(|| parent.and_then(|parent| parent.subsystem.clone()))
        });

        WbsNode {
            level: existing.level.unwrap_or_else(|| code.depth()),
            parent_code: existing.parent_code,
            code,
            name: existing.display_name,
            is_equipment,
            is_structural: !is_equipment,
            category,
            subsystem,
            is_new: false,
        }
    }
}

/// Category nodes are structural nodes directly below a subsystem whose name
/// carries a category code.
fn is_category(node: &WbsNode) -> bool {
    !node.is_equipment && node.code.depth() == 3 && node.category.is_some()
}

impl FromIterator<WbsNode> for WbsTree {
    /// Collects nodes into a tree. Later duplicates are dropped.
    fn from_iter<I: IntoIterator<Item = WbsNode>>(iter: I) -> Self {
        let mut tree = Self::new();
        for node in iter {
            let _ = tree.insert(node);
        }
        tree
    }
}

impl<'a> IntoIterator for &'a WbsTree {
    type Item = &'a WbsNode;
    type IntoIter = std::collections::btree_map::Values<'a, WbsCode, WbsNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CategoryCode;

    fn code(s: &str) -> WbsCode {
        s.parse().unwrap()
    }

    fn sample() -> WbsTree {
        [
            WbsNode::structural(WbsCode::root(), "Project"),
            WbsNode::structural(code("1.3"), "General"),
            WbsNode::structural(code("1.3.4"), "04 | Transformers"),
            WbsNode::equipment(code("1.3.4.1"), "T01"),
            WbsNode::equipment(code("1.3.4.2"), "T02"),
            WbsNode::equipment(code("1.3.4.2.1"), "T02-FAN"),
            WbsNode::structural(code("1.3.10"), "10 | Metering"),
            WbsNode::structural(code("1.5"), naming::ENERGISATION),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn insert_rejects_duplicate_codes() {
        let mut tree = sample();
        let error = tree
            .insert(WbsNode::equipment(code("1.3.4.1"), "T99"))
            .unwrap_err();
        assert_eq!(error, DuplicateCodeError(code("1.3.4.1")));
        assert_eq!(tree.get(&code("1.3.4.1")).unwrap().name, "T01");
    }

    #[test]
    fn children_are_direct_only() {
        let tree = sample();
        let category = code("1.3.4");
        let children: Vec<String> = tree
            .children(&category)
            .map(|node| node.code.to_string())
            .collect();
        assert_eq!(children, ["1.3.4.1", "1.3.4.2"]);
        assert_eq!(tree.descendants(&category).count(), 3);
    }

    #[test]
    fn next_sequence_follows_highest_child() {
        let tree = sample();
        assert_eq!(tree.next_child_code(&code("1.3.4")), code("1.3.4.3"));
        assert_eq!(tree.next_child_code(&code("1.3")), code("1.3.11"));
        assert_eq!(tree.next_child_code(&code("1.3.4.1")), code("1.3.4.1.1"));
        assert_eq!(tree.next_child_code(&WbsCode::root()), code("1.6"));
    }

    #[test]
    fn subsystems_exclude_standard_sections() {
        let tree = sample();
        let names: Vec<&str> = tree.subsystems().map(|node| node.name.as_str()).collect();
        assert_eq!(names, ["General"]);
    }

    #[test]
    fn import_infers_missing_attributes() {
        let nodes = vec![
            ExistingNode::new(code("1.3.4.1.1"), "T01-FAN | Cooling fan"),
            ExistingNode::new(code("1.3.4.1"), "T01 | Transformer"),
            ExistingNode::new(code("1.3.4"), "04 | Transformers"),
            ExistingNode::new(code("1.3"), "North Yard"),
            ExistingNode::new(code("1.4.1"), "X9 | Pending"),
            ExistingNode::new(code("1.4"), naming::TBC),
            ExistingNode::new(code("1.5.1"), "Soak Period"),
            ExistingNode::new(code("1.5"), naming::ENERGISATION),
            ExistingNode::new(WbsCode::root(), "Project"),
        ];

        let (tree, warnings) = WbsTree::import(nodes);
        assert!(warnings.is_empty());

        let subsystem = tree.get(&code("1.3")).unwrap();
        assert_eq!(subsystem.subsystem.as_deref(), Some("North Yard"));

        let category = tree.get(&code("1.3.4")).unwrap();
        assert!(category.is_structural);
        assert_eq!(category.category, Some(CategoryCode::new("04")));
        assert_eq!(category.subsystem.as_deref(), Some("North Yard"));

        let transformer = tree.get(&code("1.3.4.1")).unwrap();
        assert!(transformer.is_equipment);
        assert_eq!(transformer.level, 4);
        assert_eq!(transformer.category, Some(CategoryCode::new("04")));
        assert_eq!(transformer.subsystem.as_deref(), Some("North Yard"));

        let fan = tree.get(&code("1.3.4.1.1")).unwrap();
        assert!(fan.is_equipment);
        assert_eq!(fan.category, Some(CategoryCode::new("04")));

        assert!(tree.get(&code("1.4.1")).unwrap().is_equipment);
        assert!(!tree.get(&code("1.5.1")).unwrap().is_equipment);
        assert!(tree.get(&code("1.4.1")).unwrap().subsystem.is_none());
    }

    #[test]
    fn import_matches_item_sections_ignoring_case() {
        let nodes = vec![
            ExistingNode::new(WbsCode::root(), "Project"),
            ExistingNode::new(code("1.4"), "tbc - to be confirmed"),
            ExistingNode::new(code("1.4.1"), "X9 | Pending"),
            ExistingNode::new(code("1.6"), " UNPLACED EQUIPMENT "),
            ExistingNode::new(code("1.6.1"), "UH8-F | Relay [UNPLACED]"),
        ];

        let (tree, _) = WbsTree::import(nodes);

        assert!(tree.get(&code("1.4.1")).unwrap().is_equipment);
        assert!(tree.get(&code("1.6.1")).unwrap().is_equipment);
    }

    #[test]
    fn import_keeps_first_duplicate() {
        let nodes = vec![
            ExistingNode::new(WbsCode::root(), "Project"),
            ExistingNode::new(code("1.1"), "First"),
            ExistingNode::new(code("1.1"), "Second"),
        ];

        let (tree, warnings) = WbsTree::import(nodes);

        assert_eq!(tree.get(&code("1.1")).unwrap().name, "First");
        assert_eq!(warnings, [Warning::DuplicateCode { code: code("1.1") }]);
    }
}
