use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::{CategoryCode, WbsCode};

/// A node of a WBS tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WbsNode {
    /// Dotted hierarchical code.
    pub code: WbsCode,
    /// Code of the parent node; `None` only for the root.
    pub parent_code: Option<WbsCode>,
    /// Display name.
    pub name: String,
    /// Depth in the tree; the root is level 1.
    pub level: usize,
    /// Whether this node represents a piece of equipment.
    pub is_equipment: bool,
    /// Whether this node is a structural grouping (section, subsystem,
    /// category, phase).
    pub is_structural: bool,
    /// Category of the node, for category and equipment nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryCode>,
    /// Subsystem the node belongs to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subsystem: Option<String>,
    /// Whether the node was allocated by the latest reconciliation.
    #[serde(default)]
    pub is_new: bool,
}

impl WbsNode {
    /// A structural node below `parent`.
    #[must_use]
    pub fn structural(code: WbsCode, name: impl Into<String>) -> Self {
        Self {
            level: code.depth(),
            parent_code: code.parent(),
            code,
            name: name.into(),
            is_equipment: false,
            is_structural: true,
            category: None,
            subsystem: None,
            is_new: false,
        }
    }

    /// An equipment node.
    #[must_use]
    pub fn equipment(code: WbsCode, name: impl Into<String>) -> Self {
        Self {
            is_equipment: true,
            is_structural: false,
            ..Self::structural(code, name)
        }
    }

    /// Sets the category.
    #[must_use]
    pub fn in_category(mut self, category: Option<CategoryCode>) -> Self {
        self.category = category;
        self
    }

    /// Sets the subsystem.
    #[must_use]
    pub fn in_subsystem(mut self, subsystem: Option<String>) -> Self {
        self.subsystem = subsystem;
        self
    }

    /// Marks the node as newly allocated.
    #[must_use]
    pub const fn new_allocation(mut self) -> Self {
        self.is_new = true;
        self
    }
}

/// A node of a previously generated tree, as read back from an export.
///
/// Only the code and name are required. Everything else is inferred from the
/// tree's shape and the naming conventions in
/// [`naming`](crate::domain::naming) when missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistingNode {
    /// Dotted hierarchical code.
    #[serde(alias = "wbsCode", alias = "wbs_code")]
    pub code: WbsCode,
    /// Code of the parent node.
    #[serde(
        default,
        alias = "parentWbsCode",
        alias = "parent_code",
        deserialize_with = "blank_as_none"
    )]
    pub parent_code: Option<WbsCode>,
    /// Display name.
    #[serde(alias = "name", alias = "wbsName")]
    pub display_name: String,
    /// Depth in the tree.
    #[serde(default)]
    pub level: Option<usize>,
    /// Category code.
    #[serde(default)]
    pub category: Option<CategoryCode>,
    /// Subsystem label.
    #[serde(default)]
    pub subsystem: Option<String>,
    /// Whether the node is equipment.
    #[serde(default)]
    pub is_equipment: Option<bool>,
}

impl ExistingNode {
    /// A node with only a code, a parent code and a name, as found in a
    /// three-column export.
    #[must_use]
    pub fn new(code: WbsCode, display_name: impl Into<String>) -> Self {
        Self {
            parent_code: code.parent(),
            code,
            display_name: display_name.into(),
            level: None,
            category: None,
            subsystem: None,
            is_equipment: None,
        }
    }
}

impl From<WbsNode> for ExistingNode {
    fn from(node: WbsNode) -> Self {
        Self {
            code: node.code,
            parent_code: node.parent_code,
            display_name: node.name,
            level: Some(node.level),
            category: node.category,
            subsystem: node.subsystem,
            is_equipment: Some(node.is_equipment),
        }
    }
}

/// Exports write the root's parent code as an empty string.
fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<WbsCode>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        Some(raw) if !raw.trim().is_empty() => raw
            .parse()
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn existing_node_accepts_historical_field_names() {
        let json = r#"[
            {"code": "1", "parentCode": null, "displayName": "Project"},
            {"wbsCode": "1.3", "parentWbsCode": "1", "name": "General"},
            {"wbs_code": "1.3.4", "parent_code": "1.3", "wbsName": "04 | Transformers",
             "level": 3, "category": "04", "isEquipment": false}
        ]"#;

        let nodes: Vec<ExistingNode> = serde_json::from_str(json).unwrap();

        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0].parent_code, None);
        assert_eq!(nodes[1].parent_code, Some(WbsCode::root()));
        assert_eq!(nodes[2].display_name, "04 | Transformers");
        assert_eq!(nodes[2].category, Some(CategoryCode::new("04")));
        assert_eq!(nodes[2].is_equipment, Some(false));
    }

    #[test]
    fn blank_parent_code_is_none() {
        let node: ExistingNode =
            serde_json::from_str(r#"{"code": "1", "parentCode": "", "name": "Project"}"#)
                .unwrap();
        assert_eq!(node.parent_code, None);
    }

    #[test]
    fn generated_nodes_can_be_read_back() {
        let node = WbsNode::equipment("1.3.4.1".parse().unwrap(), "T01 | Transformer")
            .in_category(Some(CategoryCode::new("04")))
            .in_subsystem(Some("General".to_string()));

        let json = serde_json::to_string(&node).unwrap();
        let existing: ExistingNode = serde_json::from_str(&json).unwrap();

        assert_eq!(existing, ExistingNode::from(node));
    }

    #[test]
    fn constructors_derive_level_and_parent_from_code() {
        let node = WbsNode::structural("1.3.4".parse().unwrap(), "04 | Transformers");
        assert_eq!(node.level, 3);
        assert_eq!(node.parent_code, Some("1.3".parse().unwrap()));
        assert!(node.is_structural);
        assert!(!node.is_equipment);
    }
}
