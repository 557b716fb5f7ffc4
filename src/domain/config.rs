use std::{collections::BTreeSet, path::Path};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::CategoryCode;

/// Configuration for WBS generation.
///
/// This struct holds the category table used to classify equipment, the
/// synonym table used to read equipment lists, and the fixed names used for
/// the structural sections of every generated tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// Project name used for the root node when none is given.
    pub project_name: String,

    /// Subsystem section used for equipment without a subsystem label.
    pub default_subsystem: String,

    /// Identifier values that mean "no identifier", e.g. `-`.
    placeholder_identifiers: Vec<String>,

    /// The ordered category table.
    ///
    /// Classification tries categories in this order and the first matching
    /// pattern wins, so the order is significant. The unrecognised category
    /// (`99`) is implicit and must not be declared here.
    categories: Vec<CategoryDef>,

    /// Accepted raw field names for each equipment attribute.
    pub synonyms: FieldSynonyms,

    /// The four sub-phases of the energisation section.
    pub energisation_phases: [String; 4],
}

/// A declared equipment category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDef {
    /// Category code, e.g. `"04"`.
    pub code: CategoryCode,
    /// Display name, e.g. `"Transformers"`.
    pub name: String,
    /// Patterns tried in order.
    pub patterns: Vec<Pattern>,
}

impl CategoryDef {
    /// Creates a category definition.
    #[must_use]
    pub fn new(code: &str, name: &str, patterns: Vec<Pattern>) -> Self {
        Self {
            code: CategoryCode::new(code),
            name: name.to_string(),
            patterns,
        }
    }
}

/// An identifier pattern.
///
/// Prefix and template forms are anchored at the start of the (normalised)
/// identifier. A regular expression is used as written, so it must carry its
/// own anchors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pattern {
    /// A literal prefix, e.g. `+UH`.
    Prefix(String),
    /// A prefix template in which `#` stands for one or more digits, e.g.
    /// `UH#` matches `UH101` and `UH7-F`.
    Template(String),
    /// A regular expression, used as written.
    Regex(String),
}

impl Pattern {
    /// The placeholder character in [`Pattern::Template`].
    pub const DIGITS_PLACEHOLDER: char = '#';

    /// Compiles the pattern into a regular expression.
    ///
    /// # Errors
    ///
    /// Returns an error if a [`Pattern::Regex`] is not a valid expression.
    pub fn to_regex(&self) -> Result<Regex, regex::Error> {
        let source = match self {
            Self::Prefix(prefix) => format!("^{}", regex::escape(&prefix.to_uppercase())),
            Self::Template(template) => {
                let body = template
                    .to_uppercase()
                    .split(Self::DIGITS_PLACEHOLDER)
                    .map(regex::escape)
                    .collect::<Vec<_>>()
                    .join(r"\d+");
                format!("^{body}")
            }
            Self::Regex(expression) => expression.clone(),
        };
        Regex::new(&source)
    }
}

/// Accepted raw field names for each equipment attribute.
///
/// Equipment lists have used different column names over time; each list
/// here is tried in order and the first non-blank value wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSynonyms {
    /// Names for the equipment identifier.
    pub identifier: Vec<String>,
    /// Names for the description.
    pub description: Vec<String>,
    /// Names for the commissioning status.
    pub commissioning: Vec<String>,
    /// Names for the parent identifier.
    pub parent: Vec<String>,
    /// Names for the subsystem label.
    pub subsystem: Vec<String>,
}

impl Default for FieldSynonyms {
    fn default() -> Self {
        let names = |a: &str, b: &str| vec![a.to_string(), b.to_string()];
        Self {
            identifier: names("equipmentNumber", "equipment_number"),
            description: names("description", "equipmentDescription"),
            commissioning: names("commissioning", "commissioningYN"),
            parent: names("parentEquipmentNumber", "parent_equipment_number"),
            subsystem: names("subsystem", "subSystem"),
        }
    }
}

/// Errors that can occur when loading, saving or checking a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read config file: {0}")]
    Read(#[source] std::io::Error),

    /// The file could not be parsed.
    #[error("Failed to parse config file: {0}")]
    Parse(#[source] toml::de::Error),

    /// The configuration could not be serialised.
    #[error("Failed to serialize config: {0}")]
    Serialize(#[source] toml::ser::Error),

    /// The file could not be written.
    #[error("Failed to write config file: {0}")]
    Write(#[source] std::io::Error),

    /// A category pattern is not a valid regular expression.
    #[error("Invalid pattern {pattern:?} in category {category}: {source}")]
    InvalidPattern {
        /// The category declaring the pattern.
        category: CategoryCode,
        /// The offending pattern.
        pattern: Pattern,
        /// The compilation error.
        #[source]
        source: regex::Error,
    },

    /// A category code is declared more than once.
    #[error("Category {0} is declared more than once")]
    DuplicateCategory(CategoryCode),

    /// The reserved unrecognised category was declared explicitly.
    #[error("Category 99 is reserved for unrecognised equipment")]
    ReservedCategory,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project_name: default_project_name(),
            default_subsystem: default_subsystem(),
            placeholder_identifiers: default_placeholders(),
            categories: default_categories(),
            synonyms: FieldSynonyms::default(),
            energisation_phases: default_energisation_phases(),
        }
    }
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the TOML content is
    /// invalid, or the category table does not pass [`Config::check`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Read)?;
        let config: Self = toml::from_str(&content).map_err(ConfigError::Parse)?;
        config.check()?;
        Ok(config)
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(path, content).map_err(ConfigError::Write)
    }

    /// Checks the category table: codes are unique, the unrecognised code is
    /// not redeclared, and every pattern compiles.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn check(&self) -> Result<(), ConfigError> {
        let mut seen = BTreeSet::new();
        for category in &self.categories {
            if category.code.is_unrecognised() {
                return Err(ConfigError::ReservedCategory);
            }
            if !seen.insert(category.code.as_str()) {
                return Err(ConfigError::DuplicateCategory(category.code.clone()));
            }
            for pattern in &category.patterns {
                pattern
                    .to_regex()
                    .map_err(|source| ConfigError::InvalidPattern {
                        category: category.code.clone(),
                        pattern: pattern.clone(),
                        source,
                    })?;
            }
        }
        Ok(())
    }

    /// The declared categories, in classification order.
    #[must_use]
    pub fn categories(&self) -> &[CategoryDef] {
        &self.categories
    }

    /// Replaces the category table.
    pub fn set_categories(&mut self, categories: Vec<CategoryDef>) {
        self.categories = categories;
    }

    /// Every category a tree contains, in canonical order: declared
    /// categories by code, then the unrecognised category.
    #[must_use]
    pub fn category_table(&self) -> Vec<(CategoryCode, String)> {
        let mut table: Vec<(CategoryCode, String)> = self
            .categories
            .iter()
            .map(|category| (category.code.clone(), category.name.clone()))
            .collect();
        table.sort_by(|a, b| a.0.cmp(&b.0));
        table.push((CategoryCode::unrecognised(), UNRECOGNISED_NAME.to_string()));
        table
    }

    /// The display name of a category, if it is part of the table.
    #[must_use]
    pub fn category_name(&self, code: &CategoryCode) -> Option<&str> {
        if code.is_unrecognised() {
            return Some(UNRECOGNISED_NAME);
        }
        self.categories
            .iter()
            .find(|category| &category.code == code)
            .map(|category| category.name.as_str())
    }

    /// Whether `identifier` is one of the configured placeholders.
    #[must_use]
    pub fn is_placeholder(&self, identifier: &str) -> bool {
        let identifier = identifier.trim();
        identifier.is_empty()
            || self
                .placeholder_identifiers
                .iter()
                .any(|placeholder| placeholder.trim().eq_ignore_ascii_case(identifier))
    }
}

/// Display name of the unrecognised category.
pub const UNRECOGNISED_NAME: &str = "Unrecognised Equipment";

fn default_project_name() -> String {
    "Project".to_string()
}

fn default_subsystem() -> String {
    "General".to_string()
}

fn default_placeholders() -> Vec<String> {
    vec!["-".to_string()]
}

fn default_energisation_phases() -> [String; 4] {
    [
        "Pre-Energisation Checks".to_string(),
        "Energisation Switching".to_string(),
        "Soak Period".to_string(),
        "Post-Energisation Checks".to_string(),
    ]
}

fn default_categories() -> Vec<CategoryDef> {
    use Pattern::{Prefix, Regex, Template};

    let p = |s: &str| Prefix(s.to_string());
    let t = |s: &str| Template(s.to_string());
    let r = |s: &str| Regex(s.to_string());

    vec![
        CategoryDef::new(
            "01",
            "Protection & Control Panels",
            vec![p("+UH"), t("UH#"), t("CP#")],
        ),
        CategoryDef::new("02", "HV Switchgear", vec![p("+WA"), t("WA#"), p("HVSWBD")]),
        CategoryDef::new(
            "03",
            "LV Switchboards & Distribution",
            vec![p("+WC"), t("WC#"), t("DB#"), p("LVSWBD")],
        ),
        CategoryDef::new("04", "Transformers", vec![t("T#"), t("TX#"), t("NER#")]),
        CategoryDef::new("05", "Instrument Transformers", vec![t("CT#"), t("VT#")]),
        CategoryDef::new(
            "06",
            "Batteries & DC Systems",
            vec![p("+GB"), t("BAT#"), t("BCH#"), t("UPS#")],
        ),
        CategoryDef::new(
            "07",
            "Earthing & Lightning Protection",
            vec![p("EARTH"), p("LPS"), r(r"^E\d+$")],
        ),
        CategoryDef::new("08", "Cables", vec![r(r"^CAB[-_]?\d+"), p("CABLE")]),
        CategoryDef::new(
            "09",
            "SCADA & Communications",
            vec![p("SCADA"), t("RTU#"), p("COMMS"), t("FOC#")],
        ),
        CategoryDef::new("10", "Metering", vec![t("MTR#"), p("METER")]),
        CategoryDef::new(
            "11",
            "Building Services",
            vec![p("HVAC"), p("FIRE"), p("LIGHT")],
        ),
    ]
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the domain
/// type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default = "default_project_name")]
        project_name: String,

        #[serde(default = "default_subsystem")]
        default_subsystem: String,

        #[serde(default = "default_placeholders")]
        placeholder_identifiers: Vec<String>,

        #[serde(default = "default_categories")]
        categories: Vec<CategoryDef>,

        #[serde(default)]
        synonyms: FieldSynonyms,

        #[serde(default = "default_energisation_phases")]
        energisation_phases: [String; 4],
    },
}

impl From<Versions> for Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                project_name,
                default_subsystem,
                placeholder_identifiers,
                categories,
                synonyms,
                energisation_phases,
            } => Self {
                project_name,
                default_subsystem,
                placeholder_identifiers,
                categories,
                synonyms,
                energisation_phases,
            },
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            project_name: config.project_name,
            default_subsystem: config.default_subsystem,
            placeholder_identifiers: config.placeholder_identifiers,
            categories: config.categories,
            synonyms: config.synonyms,
            energisation_phases: config.energisation_phases,
        }
    }
}
