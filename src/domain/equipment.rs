use std::{fmt, ops::Deref, str::FromStr};

use non_empty_string::NonEmptyString;
use serde::{Deserialize, Serialize};

/// Characters that may prefix an equipment identifier as a designation
/// marker (`+UH101`, `=T01`, `-Q1`).
pub const MARKERS: &[char] = &['+', '=', '-'];

/// A normalised equipment identifier.
///
/// Identifiers are trimmed, uppercased, and have internal whitespace runs
/// collapsed to a single space. Two records refer to the same equipment
/// exactly when their identifiers are equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier(NonEmptyString);

impl Identifier {
    /// Normalises `raw` into an identifier.
    ///
    /// Returns `None` if nothing is left after trimming.
    #[must_use]
    pub fn new(raw: &str) -> Option<Self> {
        let normalised = raw
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_uppercase();
        NonEmptyString::new(normalised).ok().map(Self)
    }

    /// Returns the string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// The identifier with any leading designation markers removed.
    #[must_use]
    pub fn bare(&self) -> &str {
        bare(self.as_str())
    }

    /// Whether two identifiers name the same equipment, ignoring leading
    /// designation markers.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        self.bare() == other.bare()
    }
}

/// Strips leading designation markers from an already-normalised identifier.
#[must_use]
pub fn bare(identifier: &str) -> &str {
    let stripped = identifier.trim_start_matches(MARKERS);
    if stripped.is_empty() {
        identifier
    } else {
        stripped
    }
}

impl Deref for Identifier {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.0.as_str()
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Error returned when an identifier is blank.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("equipment identifier must not be blank")]
pub struct BlankIdentifierError;

impl FromStr for Identifier {
    type Err = BlankIdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or(BlankIdentifierError)
    }
}

impl TryFrom<String> for Identifier {
    type Error = BlankIdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Identifier> for String {
    fn from(identifier: Identifier) -> Self {
        identifier.0.to_string()
    }
}

/// Whether a piece of equipment is in commissioning scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CommissioningStatus {
    /// In scope (`Y`).
    #[serde(rename = "Y")]
    Yes,
    /// Out of scope (`N`). Excluded from the WBS.
    #[serde(rename = "N")]
    No,
    /// To be confirmed (`TBC`). Placed in the TBC section.
    #[serde(rename = "TBC")]
    Tbc,
}

impl CommissioningStatus {
    /// Parses the spreadsheet spelling of a status, case-insensitively.
    ///
    /// Returns `None` for anything unrecognised.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "Y" | "YES" => Some(Self::Yes),
            "N" | "NO" => Some(Self::No),
            "TBC" => Some(Self::Tbc),
            _ => None,
        }
    }

    /// The canonical short spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Yes => "Y",
            Self::No => "N",
            Self::Tbc => "TBC",
        }
    }
}

impl fmt::Display for CommissioningStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An equipment category code, e.g. `"04"`.
///
/// The code `"99"` is reserved for unrecognised equipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryCode(String);

impl CategoryCode {
    /// The code of the catch-all unrecognised category.
    pub const UNRECOGNISED: &'static str = "99";

    /// Creates a category code.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().trim().to_string())
    }

    /// The unrecognised category.
    #[must_use]
    pub fn unrecognised() -> Self {
        Self(Self::UNRECOGNISED.to_string())
    }

    /// Whether this is the unrecognised category.
    #[must_use]
    pub fn is_unrecognised(&self) -> bool {
        self.0 == Self::UNRECOGNISED
    }

    /// Returns the string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Ord for CategoryCode {
    /// Numeric codes compare numerically, the unrecognised category sorts
    /// after everything else.
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        let key = |code: &Self| {
            (
                code.is_unrecognised(),
                code.0.parse::<u64>().unwrap_or(u64::MAX),
                code.0.clone(),
            )
        };
        key(self).cmp(&key(other))
    }
}

impl PartialOrd for CategoryCode {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for CategoryCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.pad(&self.0)
    }
}

/// A single row of the equipment list, after normalisation.
///
/// Records are never mutated by the engine; every stage derives new values
/// from them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentRecord {
    /// Equipment identifier.
    pub identifier: Identifier,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Commissioning status.
    pub commissioning_status: CommissioningStatus,
    /// Identifier of the owning equipment, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Identifier>,
    /// Subsystem (plant area) label, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subsystem: Option<String>,
}

impl EquipmentRecord {
    /// Creates an in-scope record with no parent and no subsystem.
    #[must_use]
    pub fn new(identifier: Identifier, description: impl Into<String>) -> Self {
        Self {
            identifier,
            description: description.into(),
            commissioning_status: CommissioningStatus::Yes,
            parent: None,
            subsystem: None,
        }
    }

    /// Sets the parent reference.
    #[must_use]
    pub fn with_parent(mut self, parent: Identifier) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Sets the subsystem label.
    #[must_use]
    pub fn with_subsystem(mut self, subsystem: impl Into<String>) -> Self {
        self.subsystem = Some(subsystem.into());
        self
    }

    /// Sets the commissioning status.
    #[must_use]
    pub const fn with_status(mut self, status: CommissioningStatus) -> Self {
        self.commissioning_status = status;
        self
    }

    /// The declared parent, unless it is a self-reference.
    #[must_use]
    pub fn declared_parent(&self) -> Option<&Identifier> {
        self.parent
            .as_ref()
            .filter(|parent| *parent != &self.identifier)
    }
}
