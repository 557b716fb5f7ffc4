//! WBS tree files.
//!
//! Trees are written in two shapes: JSON with every node attribute, for
//! reading back on the next reconciliation, and a three-column CSV
//! (`WBS Code`, `Parent WBS Code`, `WBS Name`) for import into the
//! scheduling tool. Either shape can be read back as the existing tree.

use std::{
    io::{Read, Write},
    path::Path,
};

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    domain::{ExistingNode, WbsCode, WbsNode},
    storage::{create, open, Format, StorageError},
};

/// One row of the three-column flat export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatRow {
    /// Dotted code.
    #[serde(rename = "WBS Code")]
    pub code: WbsCode,
    /// Parent code, blank for the root.
    #[serde(rename = "Parent WBS Code")]
    pub parent_code: Option<WbsCode>,
    /// Display name.
    #[serde(rename = "WBS Name")]
    pub name: String,
}

impl From<&WbsNode> for FlatRow {
    fn from(node: &WbsNode) -> Self {
        Self {
            code: node.code.clone(),
            parent_code: node.parent_code.clone(),
            name: node.name.clone(),
        }
    }
}

impl From<FlatRow> for ExistingNode {
    fn from(row: FlatRow) -> Self {
        Self {
            parent_code: row.parent_code,
            ..Self::new(row.code, row.name)
        }
    }
}

/// Loads a previously written tree from a `.json` or `.csv` file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, has an unsupported
/// extension, or does not hold a node list.
#[instrument(level = "debug")]
pub fn load_tree(path: &Path) -> Result<Vec<ExistingNode>, StorageError> {
    let format = Format::of(path)?;
    let reader = open(path)?;
    let nodes = match format {
        Format::Json => serde_json::from_reader(reader).map_err(|source| StorageError::Json {
            path: path.to_path_buf(),
            source,
        })?,
        Format::Csv => read_csv(reader).map_err(|source| StorageError::Csv {
            path: path.to_path_buf(),
            source,
        })?,
    };
    Ok(nodes)
}

fn read_csv<R: Read>(reader: R) -> Result<Vec<ExistingNode>, csv::Error> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader)
        .deserialize::<FlatRow>()
        .map(|row| row.map(ExistingNode::from))
        .collect()
}

/// Writes nodes as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
#[instrument(level = "debug", skip(nodes))]
pub fn save_tree_json<'a>(
    path: &Path,
    nodes: impl IntoIterator<Item = &'a WbsNode>,
) -> Result<(), StorageError> {
    let nodes: Vec<&WbsNode> = nodes.into_iter().collect();
    let mut writer = create(path)?;
    serde_json::to_writer_pretty(&mut writer, &nodes).map_err(|source| StorageError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    writer
        .write_all(b"\n")
        .and_then(|()| writer.flush())
        .map_err(|source| StorageError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    tracing::debug!(nodes = nodes.len(), "wrote JSON tree");
    Ok(())
}

/// Writes nodes as the three-column flat export.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
#[instrument(level = "debug", skip(nodes))]
pub fn save_tree_csv<'a>(
    path: &Path,
    nodes: impl IntoIterator<Item = &'a WbsNode>,
) -> Result<(), StorageError> {
    let writer = create(path)?;
    write_csv(writer, nodes).map_err(|source| StorageError::Csv {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes nodes as the three-column flat export to any writer.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_csv<'a, W: Write>(
    writer: W,
    nodes: impl IntoIterator<Item = &'a WbsNode>,
) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(writer);
    for node in nodes {
        writer.serialize(FlatRow::from(node))?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CategoryCode, WbsTree};

    fn code(s: &str) -> WbsCode {
        s.parse().unwrap()
    }

    fn nodes() -> Vec<WbsNode> {
        vec![
            WbsNode::structural(WbsCode::root(), "Substation A"),
            WbsNode::structural(code("1.3"), "General").in_subsystem(Some("General".into())),
            WbsNode::structural(code("1.3.4"), "04 | Transformers")
                .in_category(Some(CategoryCode::new("04"))),
            WbsNode::equipment(code("1.3.4.1"), "T01 | Grid transformer, 132/33kV")
                .in_category(Some(CategoryCode::new("04"))),
        ]
    }

    #[test]
    fn csv_has_three_columns() {
        let mut buffer = Vec::new();

        write_csv(&mut buffer, &nodes()).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "WBS Code,Parent WBS Code,WBS Name");
        assert_eq!(lines[1], "1,,Substation A");
        assert_eq!(lines[4], "1.3.4.1,1.3.4,\"T01 | Grid transformer, 132/33kV\"");
    }

    #[test]
    fn csv_export_reads_back_as_existing_tree() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("tree.csv");

        save_tree_csv(&path, &nodes()).unwrap();
        let existing = load_tree(&path).unwrap();

        assert_eq!(existing.len(), 4);
        assert_eq!(existing[0].parent_code, None);
        assert_eq!(existing[3].display_name, "T01 | Grid transformer, 132/33kV");

        let (tree, warnings) = WbsTree::import(existing);
        assert!(warnings.is_empty());
        let transformer = tree.get(&code("1.3.4.1")).unwrap();
        assert!(transformer.is_equipment);
        assert_eq!(transformer.category, Some(CategoryCode::new("04")));
    }

    #[test]
    fn json_export_keeps_attributes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tree.json");

        save_tree_json(&path, &nodes()).unwrap();
        let existing = load_tree(&path).unwrap();

        let expected: Vec<ExistingNode> = nodes().into_iter().map(ExistingNode::from).collect();
        assert_eq!(existing, expected);
    }

    #[test]
    fn malformed_code_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tree.csv");
        std::fs::write(&path, "WBS Code,Parent WBS Code,WBS Name\n1.x,,Bad\n").unwrap();

        assert!(matches!(load_tree(&path), Err(StorageError::Csv { .. })));
    }
}
