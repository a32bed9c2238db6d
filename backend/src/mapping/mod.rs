//! Column mapping: which source column feeds which guest field.
//!
//! [`auto_map`] seeds the mapping from header keywords; the user can then
//! override any field with [`ColumnMapping::set`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::GuestField;

/// Column value meaning "no column selected".
pub const NO_COLUMN: &str = "none";

/// Guest field → source column header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnMapping(BTreeMap<GuestField, String>);

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mapped column, if any.
    pub fn get(&self, field: GuestField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    /// Map a field to a column, or unset it with `None` / an empty string.
    pub fn set(&mut self, field: GuestField, column: Option<String>) {
        match column {
            Some(c) if !c.is_empty() => {
                self.0.insert(field, c);
            }
            _ => {
                self.0.remove(&field);
            }
        }
    }

    /// Builder form of [`ColumnMapping::set`].
    pub fn with(mut self, field: GuestField, column: impl Into<String>) -> Self {
        self.set(field, Some(column.into()));
        self
    }

    pub fn is_mapped(&self, field: GuestField) -> bool {
        self.0.contains_key(&field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Guess the target field for one header, if any.
///
/// The cascade is ordered and the first hit wins. Contact keywords are
/// checked before household ones so "Main Household Contact" is not taken
/// for a household name.
pub fn guess_field(header: &str) -> Option<GuestField> {
    let h = header.trim().to_lowercase();
    let has = |needle: &str| h.contains(needle);

    if (has("main") && has("contact")) || (has("primary") && has("contact")) || has("point of contact") {
        Some(GuestField::IsMainHouseholdContact)
    } else if has("household") || has("family") {
        Some(GuestField::HouseholdName)
    } else if has("name") {
        Some(GuestField::Name)
    } else if has("email") || has("e-mail") {
        Some(GuestField::Email)
    } else if has("phone") || has("mobile") || has("cell") {
        Some(GuestField::Phone)
    } else if has("address") || has("street") || has("location") {
        Some(GuestField::Address)
    } else if has("side") || has("party") {
        Some(GuestField::Side)
    } else if has("plus") || has("+1") {
        Some(GuestField::PlusOne)
    } else if has("dietary") || has("diet") || has("restriction") || has("allerg") {
        Some(GuestField::DietaryRestrictions)
    } else {
        None
    }
}

/// Best-guess mapping for a header row.
///
/// Headers are visited in order; when two headers hit the same field the
/// later one wins.
pub fn auto_map(headers: &[String]) -> ColumnMapping {
    let mut mapping = ColumnMapping::new();
    for header in headers {
        if let Some(field) = guess_field(header) {
            mapping.set(field, Some(header.clone()));
        }
    }
    mapping
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_auto_map_common_headers() {
        let mapping = auto_map(&headers(&[
            "Full Name",
            "E-mail",
            "Mobile",
            "Street",
            "Party",
            "+1",
            "Allergies",
        ]));

        assert_eq!(mapping.get(GuestField::Name), Some("Full Name"));
        assert_eq!(mapping.get(GuestField::Email), Some("E-mail"));
        assert_eq!(mapping.get(GuestField::Phone), Some("Mobile"));
        assert_eq!(mapping.get(GuestField::Address), Some("Street"));
        assert_eq!(mapping.get(GuestField::Side), Some("Party"));
        assert_eq!(mapping.get(GuestField::PlusOne), Some("+1"));
        assert_eq!(mapping.get(GuestField::DietaryRestrictions), Some("Allergies"));
    }

    #[test]
    fn test_main_contact_before_household() {
        for order in [
            headers(&["Main Household Contact", "Household Name"]),
            headers(&["Household Name", "Main Household Contact"]),
        ] {
            let mapping = auto_map(&order);
            assert_eq!(mapping.get(GuestField::IsMainHouseholdContact), Some("Main Household Contact"));
            assert_eq!(mapping.get(GuestField::HouseholdName), Some("Household Name"));
        }
    }

    #[test]
    fn test_contact_variants() {
        assert_eq!(guess_field("Primary Contact?"), Some(GuestField::IsMainHouseholdContact));
        assert_eq!(guess_field("point of contact"), Some(GuestField::IsMainHouseholdContact));
        // "contact" alone is not enough
        assert_eq!(guess_field("Contact"), None);
    }

    #[test]
    fn test_family_name_is_household() {
        assert_eq!(guess_field("Family Name"), Some(GuestField::HouseholdName));
    }

    #[test]
    fn test_header_trimmed_and_case_insensitive() {
        assert_eq!(guess_field("  NAME  "), Some(GuestField::Name));
        assert_eq!(guess_field("Phone Number"), Some(GuestField::Phone));
    }

    #[test]
    fn test_unknown_headers_unmapped() {
        let mapping = auto_map(&headers(&["Table", "Notes"]));
        assert!(mapping.is_empty());
    }

    #[test]
    fn test_later_header_overwrites() {
        let mapping = auto_map(&headers(&["First Name", "Last Name"]));
        assert_eq!(mapping.get(GuestField::Name), Some("Last Name"));
    }

    #[test]
    fn test_set_empty_unsets() {
        let mut mapping = ColumnMapping::new().with(GuestField::Email, "Email");
        mapping.set(GuestField::Email, Some(String::new()));
        assert!(!mapping.is_mapped(GuestField::Email));
    }

    #[test]
    fn test_mapping_serializes_by_field_name() {
        let mapping = ColumnMapping::new()
            .with(GuestField::Name, "Guest")
            .with(GuestField::PlusOne, "Plus One");
        let json = serde_json::to_value(&mapping).unwrap();

        assert_eq!(json["name"], "Guest");
        assert_eq!(json["plusOne"], "Plus One");
    }
}
