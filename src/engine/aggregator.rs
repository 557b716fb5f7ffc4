//! Per-category buckets of classified equipment.

use serde::Serialize;

use crate::{
    domain::{CategoryCode, Config},
    engine::categorize::ClassifiedEquipment,
};

/// The equipment of one category.
#[derive(Debug, Clone)]
pub struct CategoryBucket<'a> {
    /// Category code.
    pub code: CategoryCode,
    /// Category display name.
    pub name: String,
    /// Parent equipment, in input order.
    pub parents: Vec<&'a ClassifiedEquipment>,
    /// Child equipment, in input order.
    pub children: Vec<&'a ClassifiedEquipment>,
}

impl CategoryBucket<'_> {
    /// Number of pieces of equipment in the category.
    #[must_use]
    pub fn count(&self) -> usize {
        self.parents.len() + self.children.len()
    }

    /// Children whose resolved parent is `parent`, in input order.
    pub fn children_of<'s>(
        &'s self,
        parent: &'s ClassifiedEquipment,
    ) -> impl Iterator<Item = &'s ClassifiedEquipment> + 's {
        self.children
            .iter()
            .copied()
            .filter(move |child| child.parent.as_ref() == Some(parent.identifier()))
    }

    /// Children whose resolved parent is not among this category's parents.
    pub fn orphans(&self) -> impl Iterator<Item = &ClassifiedEquipment> + '_ {
        self.children.iter().copied().filter(|child| {
            !child.parent.as_ref().is_some_and(|parent| {
                self.parents
                    .iter()
                    .any(|candidate| candidate.identifier() == parent)
            })
        })
    }

    /// A serialisable count summary.
    #[must_use]
    pub fn summary(&self) -> CategorySummary {
        CategorySummary {
            code: self.code.clone(),
            name: self.name.clone(),
            count: self.count(),
            parents: self.parents.len(),
            children: self.children.len(),
        }
    }
}

/// Per-category counts, for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySummary {
    /// Category code.
    pub code: CategoryCode,
    /// Category display name.
    pub name: String,
    /// Total equipment.
    pub count: usize,
    /// Parent equipment.
    pub parents: usize,
    /// Child equipment.
    pub children: usize,
}

/// Buckets classified equipment by category.
#[derive(Debug, Clone, Copy)]
pub struct CategoryAggregator<'c> {
    config: &'c Config,
}

impl<'c> CategoryAggregator<'c> {
    /// Creates an aggregator over the category table of `config`.
    #[must_use]
    pub const fn new(config: &'c Config) -> Self {
        Self { config }
    }

    /// Returns one bucket per category in canonical order, including
    /// categories no equipment falls into.
    ///
    /// Equipment whose category is not in the table lands in the
    /// unrecognised bucket, so counts always add up to the input size.
    #[must_use]
    pub fn aggregate<'a, I>(&self, equipment: I) -> Vec<CategoryBucket<'a>>
    where
        I: IntoIterator<Item = &'a ClassifiedEquipment>,
    {
        let mut buckets: Vec<CategoryBucket<'a>> = self
            .config
            .category_table()
            .into_iter()
            .map(|(code, name)| CategoryBucket {
                code,
                name,
                parents: Vec::new(),
                children: Vec::new(),
            })
            .collect();

        for item in equipment {
            let index = buckets
                .iter()
                .position(|bucket| bucket.code == item.category)
                .unwrap_or(buckets.len() - 1);
            let bucket = &mut buckets[index];
            if item.is_parent() {
                bucket.parents.push(item);
            } else {
                bucket.children.push(item);
            }
        }

        buckets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{EquipmentRecord, Identifier},
        engine::{categorize::categorize, classifier::PatternClassifier},
    };

    fn id(s: &str) -> Identifier {
        Identifier::new(s).unwrap()
    }

    #[test]
    fn every_category_gets_a_bucket() {
        let config = Config::default();
        let buckets = CategoryAggregator::new(&config).aggregate(&[]);

        assert_eq!(buckets.len(), config.categories().len() + 1);
        assert!(buckets.last().unwrap().code.is_unrecognised());
        assert!(buckets.iter().all(|bucket| bucket.count() == 0));
    }

    #[test]
    fn equipment_is_split_into_parents_and_children() {
        let config = Config::default();
        let classifier = PatternClassifier::new(&config).unwrap();
        let records = vec![
            EquipmentRecord::new(id("UH101"), "Panel"),
            EquipmentRecord::new(id("UH101-F"), "Relay").with_parent(id("UH101")),
            EquipmentRecord::new(id("UH102-F"), "Relay").with_parent(id("UH102")),
            EquipmentRecord::new(id("WIDGET"), ""),
        ];
        let categorized = categorize(&records, &classifier, &config);

        let buckets = CategoryAggregator::new(&config).aggregate(&categorized.equipment);

        let panels = &buckets[0];
        assert_eq!(panels.code.as_str(), "01");
        assert_eq!(panels.count(), 3);
        assert_eq!(panels.parents.len(), 1);
        assert_eq!(panels.children_of(panels.parents[0]).count(), 1);
        let orphans: Vec<&str> = panels.orphans().map(|o| o.identifier().as_str()).collect();
        assert_eq!(orphans, ["UH102-F"]);

        assert_eq!(buckets.last().unwrap().count(), 1);
        let total: usize = buckets.iter().map(CategoryBucket::count).sum();
        assert_eq!(total, records.len());
    }

    #[test]
    fn unknown_category_falls_into_unrecognised_bucket() {
        let config = Config::default();
        let classifier = PatternClassifier::new(&config).unwrap();
        let mut categorized = categorize(
            &[EquipmentRecord::new(id("T01"), "")],
            &classifier,
            &config,
        );
        categorized.equipment[0].category = CategoryCode::new("42");

        let buckets = CategoryAggregator::new(&config).aggregate(&categorized.equipment);

        assert_eq!(buckets.last().unwrap().count(), 1);
    }
}
