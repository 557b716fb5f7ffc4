//! The processing pipeline, as explicit stage composition.
//!
//! ```text
//! normalize ─► categorize ─┬─► generate            (first run)
//!                          └─► reconcile(existing)  (every later run)
//! ```
//!
//! Each stage is a plain function of the previous stage's output, and each
//! is callable on its own.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::instrument;

use crate::{
    domain::{
        normalize, Config, ConfigError, EquipmentRecord, ExistingNode, Normalized, RawRecord,
        WbsTree, Warning,
    },
    engine::{
        aggregator::{CategoryAggregator, CategoryBucket},
        categorize::{categorize, Categorized},
        classifier::PatternClassifier,
        generator::HierarchyGenerator,
        reconcile::{Reconciler, Reconciliation},
        validation::{validate, ValidationReport},
    },
};

/// Input-shape errors. These abort the pipeline before any processing.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PipelineError {
    /// Reconciliation was given no equipment.
    #[error("the equipment list is empty")]
    EmptyEquipmentList,

    /// Reconciliation was given no existing tree, or one without a root node.
    #[error("the existing WBS tree is missing or has no root node")]
    MissingExistingTree,
}

/// A configured pipeline.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: Config,
    classifier: PatternClassifier,
}

impl Pipeline {
    /// Creates a pipeline, compiling the category table of `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if a category pattern does not compile.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        let classifier = PatternClassifier::new(&config)?;
        Ok(Self { config, classifier })
    }

    /// The configuration in use.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// The compiled classifier.
    #[must_use]
    pub const fn classifier(&self) -> &PatternClassifier {
        &self.classifier
    }

    /// Stage 1: raw rows to records.
    #[must_use]
    pub fn normalize(&self, raw: &[RawRecord]) -> Normalized {
        normalize(raw, &self.config)
    }

    /// Stage 2: status split, relationship analysis and classification.
    #[must_use]
    pub fn categorize(&self, records: &[EquipmentRecord]) -> Categorized {
        categorize(records, &self.classifier, &self.config)
    }

    /// Per-category buckets of the in-scope equipment.
    #[must_use]
    pub fn aggregate<'a>(&self, categorized: &'a Categorized) -> Vec<CategoryBucket<'a>> {
        CategoryAggregator::new(&self.config).aggregate(&categorized.equipment)
    }

    /// Generates a tree from scratch.
    ///
    /// An empty list yields the structural skeleton. `project_name` defaults
    /// to the configured name.
    #[instrument(level = "debug", skip(self, records), fields(records = records.len()))]
    #[must_use]
    pub fn generate(&self, records: &[EquipmentRecord], project_name: Option<&str>) -> GenerateOutcome {
        let categorized = self.categorize(records);
        let project_name = project_name.unwrap_or(self.config.project_name.as_str());
        let generated = HierarchyGenerator::new(&self.config).generate(
            &categorized.equipment,
            &categorized.tbc,
            project_name,
        );

        let mut warnings = categorized.warnings;
        warnings.extend(generated.warnings);
        let validation = validate(&generated.tree.clone().into_nodes());

        GenerateOutcome {
            tree: generated.tree,
            equipment: categorized.equipment.len(),
            tbc: categorized.tbc.len(),
            excluded: categorized.excluded.len(),
            warnings,
            validation,
            generated_at: Utc::now(),
        }
    }

    /// Reconciles a new list against a previously generated tree.
    ///
    /// # Errors
    ///
    /// Returns an error if `records` is empty, or if `existing` is empty or
    /// has no root node.
    #[instrument(level = "debug", skip_all, fields(existing = existing.len(), records = records.len()))]
    pub fn reconcile(
        &self,
        existing: Vec<ExistingNode>,
        records: &[EquipmentRecord],
    ) -> Result<ReconcileOutcome, PipelineError> {
        if records.is_empty() {
            return Err(PipelineError::EmptyEquipmentList);
        }
        let (tree, mut warnings) = WbsTree::import(existing);
        if tree.root().is_none() {
            return Err(PipelineError::MissingExistingTree);
        }

        let categorized = self.categorize(records);
        warnings.extend(categorized.warnings.iter().cloned());
        let reconciliation = Reconciler::new(&self.config).reconcile(tree, &categorized);
        warnings.extend(reconciliation.warnings.iter().cloned());
        let validation = validate(&reconciliation.tree.clone().into_nodes());

        Ok(ReconcileOutcome {
            reconciliation,
            excluded: categorized.excluded.len(),
            warnings,
            validation,
            generated_at: Utc::now(),
        })
    }
}

/// The result of [`Pipeline::generate`].
#[derive(Debug, Clone)]
pub struct GenerateOutcome {
    /// The generated tree.
    pub tree: WbsTree,
    /// Number of in-scope records placed.
    pub equipment: usize,
    /// Number of TBC records placed.
    pub tbc: usize,
    /// Number of out-of-scope records left out.
    pub excluded: usize,
    /// Every data-quality warning, in stage order.
    pub warnings: Vec<Warning>,
    /// Structural findings on the output.
    pub validation: ValidationReport,
    /// When the run happened.
    pub generated_at: DateTime<Utc>,
}

/// Counts describing a generation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateSummary {
    /// Total nodes.
    pub nodes: usize,
    /// Equipment nodes.
    pub equipment: usize,
    /// TBC equipment nodes.
    pub tbc: usize,
    /// Records left out as out of scope.
    pub excluded: usize,
    /// Data-quality warnings.
    pub warnings: usize,
    /// Structural errors.
    pub errors: usize,
    /// When the run happened.
    pub generated_at: DateTime<Utc>,
}

impl GenerateOutcome {
    /// Counts for reporting.
    #[must_use]
    pub fn summary(&self) -> GenerateSummary {
        GenerateSummary {
            nodes: self.tree.len(),
            equipment: self.equipment,
            tbc: self.tbc,
            excluded: self.excluded,
            warnings: self.warnings.len(),
            errors: self.validation.errors().count(),
            generated_at: self.generated_at,
        }
    }
}

/// The result of [`Pipeline::reconcile`].
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    /// Diff, placements and the integrated tree.
    pub reconciliation: Reconciliation,
    /// Number of out-of-scope records left out.
    pub excluded: usize,
    /// Every data-quality warning, in stage order.
    pub warnings: Vec<Warning>,
    /// Structural findings on the integrated tree.
    pub validation: ValidationReport,
    /// When the run happened.
    pub generated_at: DateTime<Utc>,
}

/// Counts describing a reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileSummary {
    /// Equipment only in the new list.
    pub added: usize,
    /// Equipment only in the existing tree.
    pub removed: usize,
    /// Equipment on both sides with differences.
    pub modified: usize,
    /// Equipment on both sides without differences.
    pub unchanged: usize,
    /// Nodes allocated, structural ones included.
    pub new_nodes: usize,
    /// Records left out as out of scope.
    pub excluded: usize,
    /// Subsystem sections synthesised.
    pub new_subsystems: usize,
    /// Data-quality warnings.
    pub warnings: usize,
    /// Structural errors.
    pub errors: usize,
    /// When the run happened.
    pub generated_at: DateTime<Utc>,
}

impl ReconcileOutcome {
    /// The integrated tree.
    #[must_use]
    pub const fn tree(&self) -> &WbsTree {
        &self.reconciliation.tree
    }

    /// Counts for reporting.
    #[must_use]
    pub fn summary(&self) -> ReconcileSummary {
        let comparison = &self.reconciliation.comparison;
        ReconcileSummary {
            added: comparison.added.len(),
            removed: comparison.removed.len(),
            modified: comparison.modified.len(),
            unchanged: comparison.unchanged.len(),
            new_nodes: self.reconciliation.new_nodes().count(),
            excluded: self.excluded,
            new_subsystems: self.reconciliation.subsystems.introduced.len(),
            warnings: self.warnings.len(),
            errors: self.validation.errors().count(),
            generated_at: self.generated_at,
        }
    }
}
