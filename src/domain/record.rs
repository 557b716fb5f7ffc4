//! Normalisation of raw equipment rows into [`EquipmentRecord`]s.

use std::collections::BTreeMap;

use tracing::instrument;

use crate::domain::{
    CommissioningStatus, Config, EquipmentRecord, FieldSynonyms, Identifier, Warning,
};

/// A raw equipment row: column name to cell value.
pub type RawRecord = BTreeMap<String, String>;

/// The result of normalising a batch of raw rows.
#[derive(Debug, Default)]
pub struct Normalized {
    /// Rows that yielded a record, in input order.
    pub records: Vec<EquipmentRecord>,
    /// Conditions found while reading the rows.
    pub warnings: Vec<Warning>,
}

impl FieldSynonyms {
    /// The first non-blank value among the accepted names for an attribute.
    ///
    /// Column names are compared ignoring case and surrounding whitespace.
    fn lookup<'a>(names: &[String], raw: &'a RawRecord) -> Option<&'a str> {
        names.iter().find_map(|name| {
            raw.iter()
                .find(|(column, _)| column.trim().eq_ignore_ascii_case(name.trim()))
                .map(|(_, value)| value.trim())
                .filter(|value| !value.is_empty())
        })
    }
}

/// Normalises raw rows into equipment records.
///
/// - Identifiers and parent references are trimmed and uppercased.
/// - Rows with an empty or placeholder identifier are skipped with a warning.
/// - A placeholder parent reference means "no parent".
/// - An unreadable commissioning status is treated as TBC with a warning; a
///   missing one means in scope.
#[instrument(level = "debug", skip_all, fields(rows = raw.len()))]
#[must_use]
pub fn normalize(raw: &[RawRecord], config: &Config) -> Normalized {
    let synonyms = &config.synonyms;
    let mut normalized = Normalized::default();

    for (row, fields) in raw.iter().enumerate() {
        let identifier = FieldSynonyms::lookup(&synonyms.identifier, fields)
            .filter(|value| !config.is_placeholder(value))
            .and_then(Identifier::new);
        let Some(identifier) = identifier else {
            tracing::warn!(row, "skipping row without identifier");
            normalized.warnings.push(Warning::MissingIdentifier { row });
            continue;
        };

        let commissioning_status = match FieldSynonyms::lookup(&synonyms.commissioning, fields) {
            None => CommissioningStatus::Yes,
            Some(value) => CommissioningStatus::parse(value).unwrap_or_else(|| {
                tracing::warn!(%identifier, value, "unknown commissioning status");
                normalized.warnings.push(Warning::UnknownStatus {
                    identifier: identifier.clone(),
                    value: value.to_string(),
                });
                CommissioningStatus::Tbc
            }),
        };

        let parent = FieldSynonyms::lookup(&synonyms.parent, fields)
            .filter(|value| !config.is_placeholder(value))
            .and_then(Identifier::new);

        normalized.records.push(EquipmentRecord {
            identifier,
            description: FieldSynonyms::lookup(&synonyms.description, fields)
                .unwrap_or_default()
                .to_string(),
            commissioning_status,
            parent,
            subsystem: FieldSynonyms::lookup(&synonyms.subsystem, fields).map(str::to_string),
        });
    }

    normalized
}
