//! Domain models for WBS generation.
//!
//! This module contains the core data types: equipment records and their
//! identifiers, dotted WBS codes, WBS nodes and the tree arena, and
//! configuration.

mod config;
pub use config::{CategoryDef, Config, ConfigError, FieldSynonyms, Pattern, UNRECOGNISED_NAME};

/// Dotted hierarchical WBS codes.
pub mod code;
pub use code::{CodeError, WbsCode};

mod equipment;
pub use equipment::{
    bare, BlankIdentifierError, CategoryCode, CommissioningStatus, EquipmentRecord, Identifier,
    MARKERS,
};

pub mod naming;

mod node;
pub use node::{ExistingNode, WbsNode};

/// Normalisation of raw equipment rows.
pub mod record;
pub use record::{normalize, Normalized, RawRecord};

mod tree;
pub use tree::{DuplicateCodeError, WbsTree};

mod warning;
pub use warning::Warning;
