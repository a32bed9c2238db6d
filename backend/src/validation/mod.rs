//! Row validation for guest imports.
//!
//! Checks every row against the current [`ColumnMapping`] and reports all
//! problems at once as [`ValidationError`] entries:
//!
//! | Field   | Rule                                              |
//! |---------|---------------------------------------------------|
//! | `name`  | mapped and non-empty                              |
//! | `email` | when present, `local@domain.tld` without spaces   |
//! | `side`  | when present, one of bride / groom / mutual       |
//!
//! Row numbers are 1-based; row `0` marks batch-level problems such as a
//! failed paste or a failed import.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::mapping::ColumnMapping;
use crate::models::{mapped_cell, GuestField, RawRow, Side};

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"));

/// One problem found in the import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// 1-based row number, `0` for batch-level errors
    pub row: usize,
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(row: usize, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            row,
            field: field.into(),
            message: message.into(),
        }
    }

    /// Batch-level error (`row: 0`).
    pub fn batch(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(0, field, message)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.row == 0 {
            write!(f, "{}", self.message)
        } else {
            write!(f, "Row {}: {}", self.row, self.message)
        }
    }
}

/// Loose email shape check.
pub fn is_valid_email(value: &str) -> bool {
    EMAIL_PATTERN.is_match(value)
}

/// Validate all rows against the mapping.
///
/// # Example
/// ```ignore
/// use guestlist::{validate, ColumnMapping, GuestField};
///
/// let mapping = ColumnMapping::new().with(GuestField::Name, "Name");
/// let errors = validate(&rows, &mapping);
/// assert!(errors.is_empty());
/// ```
pub fn validate(rows: &[RawRow], mapping: &ColumnMapping) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for (i, row) in rows.iter().enumerate() {
        let row_num = i + 1;

        let name = mapped_cell(row, mapping.get(GuestField::Name));
        if name.map_or(true, |c| c.is_blank()) {
            errors.push(ValidationError::new(row_num, "name", "Name is required"));
        }

        if let Some(email) = mapped_cell(row, mapping.get(GuestField::Email)).filter(|c| !c.is_blank()) {
            if !is_valid_email(&email.as_text()) {
                errors.push(ValidationError::new(row_num, "email", "Invalid email format"));
            }
        }

        if let Some(side) = mapped_cell(row, mapping.get(GuestField::Side)).filter(|c| !c.is_blank()) {
            let value = side.as_text();
            if Side::known(&value).is_none() {
                errors.push(ValidationError::new(
                    row_num,
                    "side",
                    format!("Invalid side value: {}. Must be bride, groom, or mutual", value),
                ));
            }
        }
    }

    errors
}

/// Capped display of an error list: the first `limit` entries plus a
/// trailing "...and N more" line.
pub fn summarize_errors(errors: &[ValidationError], limit: usize) -> Vec<String> {
    let mut lines: Vec<String> = errors.iter().take(limit).map(|e| e.to_string()).collect();
    if errors.len() > limit {
        lines.push(format!("...and {} more errors", errors.len() - limit));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Cell;

    fn row(pairs: &[(&str, &str)]) -> RawRow {
        pairs.iter().map(|(k, v)| (k.to_string(), Cell::from(*v))).collect()
    }

    fn mapping() -> ColumnMapping {
        ColumnMapping::new()
            .with(GuestField::Name, "Name")
            .with(GuestField::Email, "Email")
            .with(GuestField::Side, "Side")
    }

    #[test]
    fn test_valid_rows() {
        let rows = vec![
            row(&[("Name", "Asha"), ("Email", "a@b.co"), ("Side", "Bride")]),
            row(&[("Name", "Ravi"), ("Email", ""), ("Side", "")]),
        ];
        assert!(validate(&rows, &mapping()).is_empty());
    }

    #[test]
    fn test_invalid_email() {
        let rows = vec![row(&[("Name", "Asha"), ("Email", "not-an-email")])];
        let errors = validate(&rows, &mapping());

        assert_eq!(errors, vec![ValidationError::new(1, "email", "Invalid email format")]);
    }

    #[test]
    fn test_email_pattern() {
        assert!(is_valid_email("a@b.co"));
        assert!(is_valid_email("first.last@mail.example.in"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.de"));
        assert!(!is_valid_email("a@@b.co"));
    }

    #[test]
    fn test_invalid_side() {
        let rows = vec![row(&[("Name", "Asha"), ("Side", "other")])];
        let errors = validate(&rows, &mapping());

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "side");
        assert_eq!(errors[0].message, "Invalid side value: other. Must be bride, groom, or mutual");
    }

    #[test]
    fn test_padded_values_rejected() {
        let rows = vec![row(&[("Name", "Asha"), ("Email", " a@b.co"), ("Side", " bride")])];
        let fields: Vec<String> = validate(&rows, &mapping()).into_iter().map(|e| e.field).collect();

        assert_eq!(fields, vec!["email", "side"]);
    }

    #[test]
    fn test_padded_csv_side_rejected() {
        let parsed = crate::parser::parse_csv_bytes("Name,Side\nAsha, bride\n".as_bytes()).unwrap();
        let mapping = ColumnMapping::new().with(GuestField::Name, "Name").with(GuestField::Side, "Side");

        let errors = validate(&parsed.rows, &mapping);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Invalid side value:  bride. Must be bride, groom, or mutual");
    }

    #[test]
    fn test_name_required() {
        let rows = vec![row(&[("Name", "")]), row(&[("Name", "Asha")])];
        let errors = validate(&rows, &mapping());

        assert_eq!(errors, vec![ValidationError::new(1, "name", "Name is required")]);
    }

    #[test]
    fn test_unmapped_name_fails_every_row() {
        let rows = vec![row(&[("Guest", "Asha")]), row(&[("Guest", "Ravi")])];
        let errors = validate(&rows, &ColumnMapping::new());

        assert_eq!(errors.len(), 2);
        assert_eq!(errors[1].row, 2);
    }

    #[test]
    fn test_all_errors_reported() {
        let rows = vec![row(&[("Name", ""), ("Email", "bad"), ("Side", "aunt")])];
        let fields: Vec<String> = validate(&rows, &mapping()).into_iter().map(|e| e.field).collect();

        assert_eq!(fields, vec!["name", "email", "side"]);
    }

    #[test]
    fn test_summarize_errors() {
        let errors: Vec<ValidationError> = (1..=8)
            .map(|r| ValidationError::new(r, "name", "Name is required"))
            .collect();

        let lines = summarize_errors(&errors, 5);
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "Row 1: Name is required");
        assert_eq!(lines[5], "...and 3 more errors");

        assert_eq!(summarize_errors(&errors[..2], 5).len(), 2);
    }
}
