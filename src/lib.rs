//! Equipment list to Work Breakdown Structure
//!
//! Turns a flat list of electrical equipment into a dotted-code WBS tree for
//! a scheduling tool, and reconciles later lists against a tree already in
//! use so that only new equipment receives new codes.

pub mod domain;
pub use domain::{Config, EquipmentRecord, Identifier, WbsCode, WbsNode, WbsTree, Warning};

pub mod engine;
pub use engine::{Pipeline, PipelineError};

/// Reading equipment lists and trees from disk, and writing exports.
pub mod storage;
pub use storage::StorageError;
