//! The WBS engine.
//!
//! Stages, leaf first:
//!
//! - [`classifier`]: identifier to category code.
//! - [`relationships`]: parent/child analysis over a record set.
//! - [`categorize`]: status split, relationships and classification together.
//! - [`aggregator`]: per-category buckets.
//! - [`generator`]: first-time tree generation.
//! - [`reconcile`]: diff and additive code allocation against an existing tree.
//! - [`validation`]: structural checks over any node list.
//!
//! [`pipeline`] composes them.

pub mod aggregator;
pub mod categorize;
pub mod classifier;
pub mod generator;
pub mod pipeline;
pub mod reconcile;
pub mod relationships;
pub mod validation;

pub use aggregator::{CategoryAggregator, CategoryBucket, CategorySummary};
pub use categorize::{categorize, Categorized, ClassifiedEquipment, Role};
pub use classifier::PatternClassifier;
pub use generator::{Generated, HierarchyGenerator};
pub use pipeline::{
    GenerateOutcome, GenerateSummary, Pipeline, PipelineError, ReconcileOutcome, ReconcileSummary,
};
pub use reconcile::{ComparisonResult, Placement, Reconciler, Reconciliation, Tier};
pub use relationships::{partition_by_status, Relationship, RelationshipAnalysis, RelationshipAnalyzer};
pub use validation::{validate, validate_existing, Issue, Severity, ValidationReport};
