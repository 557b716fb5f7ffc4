//! Display-name conventions for WBS nodes.
//!
//! A WBS tree is exported as `(code, parent code, name)` triples, so the
//! display name is the only place a tree can carry the meaning of a node
//! once it has left this process. These conventions are how a tree read
//! back from disk is understood again.

use crate::domain::CategoryCode;

/// Level-2 section holding project milestones.
pub const MILESTONES: &str = "Milestones";

/// Level-2 section holding pre-requisite activities.
pub const PREREQUISITES: &str = "Pre-requisites";

/// Level-2 section holding equipment with commissioning status TBC.
pub const TBC: &str = "TBC - To Be Confirmed";

/// Level-2 section holding the fixed energisation phases.
pub const ENERGISATION: &str = "Energisation";

/// Level-2 section holding equipment that could not be placed.
pub const UNPLACED: &str = "Unplaced Equipment";

/// Separator between the parts of category and equipment names.
pub const SEPARATOR: &str = " | ";

/// Suffix marking a child emitted without its parent.
pub const ORPHAN_SUFFIX: &str = " [ORPHAN]";

/// Suffix marking a fallback node.
pub const UNPLACED_SUFFIX: &str = " [UNPLACED]";

const STANDARD_SECTIONS: [&str; 5] = [MILESTONES, PREREQUISITES, TBC, ENERGISATION, UNPLACED];

/// Whether a level-2 name is one of the fixed sections rather than a
/// subsystem.
#[must_use]
pub fn is_standard_section(name: &str) -> bool {
    STANDARD_SECTIONS
        .iter()
        .any(|section| section.eq_ignore_ascii_case(name.trim()))
}

/// Whether two subsystem labels name the same subsystem.
#[must_use]
pub fn same_subsystem(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// `"04 | Transformers"`
#[must_use]
pub fn category_name(code: &CategoryCode, name: &str) -> String {
    format!("{code}{SEPARATOR}{name}")
}

/// Reads the category code back out of a category node name.
#[must_use]
pub fn parse_category_code(name: &str) -> Option<CategoryCode> {
    let (code, _) = name.split_once(SEPARATOR)?;
    let code = code.trim();
    (!code.is_empty() && code.chars().all(|c| c.is_ascii_digit())).then(|| CategoryCode::new(code))
}

/// `"UH101 | Feeder protection panel"`, or the identifier alone when the
/// description is blank.
#[must_use]
pub fn equipment_name(identifier: &str, description: &str) -> String {
    let description = description.trim();
    if description.is_empty() {
        identifier.to_string()
    } else {
        format!("{identifier}{SEPARATOR}{description}")
    }
}

/// Splits an equipment node name into identifier and description, dropping
/// any orphan or fallback suffix.
#[must_use]
pub fn parse_equipment_name(name: &str) -> (&str, &str) {
    let name = name
        .strip_suffix(ORPHAN_SUFFIX)
        .or_else(|| name.strip_suffix(UNPLACED_SUFFIX))
        .unwrap_or(name);
    match name.split_once(SEPARATOR) {
        Some((identifier, description)) => (identifier.trim(), description.trim()),
        None => (name.trim(), ""),
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("UH101 | Panel", ("UH101", "Panel"); "identifier and description")]
    #[test_case("UH101", ("UH101", ""); "identifier only")]
    #[test_case("UH101-F | Relay [ORPHAN]", ("UH101-F", "Relay"); "orphan suffix")]
    #[test_case("T9 | Spare | old [UNPLACED]", ("T9", "Spare | old"); "fallback suffix")]
    fn equipment_names_round_trip(name: &str, expected: (&str, &str)) {
        assert_eq!(parse_equipment_name(name), expected);
    }

    #[test]
    fn equipment_name_omits_blank_description() {
        assert_eq!(equipment_name("T01", "  "), "T01");
        assert_eq!(equipment_name("T01", "Grid transformer"), "T01 | Grid transformer");
    }

    #[test]
    fn category_code_is_read_from_name() {
        let name = category_name(&CategoryCode::new("04"), "Transformers");
        assert_eq!(name, "04 | Transformers");
        assert_eq!(parse_category_code(&name), Some(CategoryCode::new("04")));
        assert_eq!(parse_category_code("UH101 | Panel"), None);
        assert_eq!(parse_category_code("Transformers"), None);
    }

    #[test]
    fn standard_sections_are_not_subsystems() {
        assert!(is_standard_section("energisation"));
        assert!(is_standard_section(TBC));
        assert!(!is_standard_section("33kV Switchroom"));
    }
}
