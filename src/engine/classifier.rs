//! Identifier to category code.

use regex::Regex;

use crate::domain::{CategoryCode, Config, ConfigError};

/// Maps equipment identifiers to category codes.
///
/// Categories are tried in the order they are declared in the
/// configuration, and within a category patterns are tried in order. The
/// first match wins.
#[derive(Debug, Clone)]
pub struct PatternClassifier {
    rules: Vec<Rule>,
}

#[derive(Debug, Clone)]
struct Rule {
    category: CategoryCode,
    patterns: Vec<Regex>,
}

impl PatternClassifier {
    /// Compiles the category table of `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if any pattern fails to compile.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let rules = config
            .categories()
            .iter()
            .map(|category| {
                let patterns = category
                    .patterns
                    .iter()
                    .map(|pattern| {
                        pattern
                            .to_regex()
                            .map_err(|source| ConfigError::InvalidPattern {
                                category: category.code.clone(),
                                pattern: pattern.clone(),
                                source,
                            })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Rule {
                    category: category.code.clone(),
                    patterns,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self { rules })
    }

    /// Classifies an identifier.
    ///
    /// The identifier is trimmed and uppercased before matching. Blank input,
    /// and input no pattern matches, yield the unrecognised category.
    #[must_use]
    pub fn classify(&self, identifier: &str) -> CategoryCode {
        let normalized = identifier.trim().to_uppercase();
        if normalized.is_empty() {
            return CategoryCode::unrecognised();
        }

        self.rules
            .iter()
            .find(|rule| rule.patterns.iter().any(|regex| regex.is_match(&normalized)))
            .map_or_else(CategoryCode::unrecognised, |rule| rule.category.clone())
    }
}
