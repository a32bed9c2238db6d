//! Row-to-guest transformation.
//!
//! Applies a [`ColumnMapping`] and batch defaults to raw rows, producing
//! editable [`ParsedGuest`] records. Rows without a name are dropped.

use crate::mapping::{ColumnMapping, NO_COLUMN};
use crate::models::{mapped_cell, Cell, GuestField, GuestId, ParsedGuest, RawRow, RsvpStatus, Side};

/// Values shared by every guest of an import batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformDefaults {
    /// Side used when the side column is unmapped or empty
    pub default_side: Side,
    /// Events every imported guest is invited to
    pub event_ids: Vec<String>,
}

/// Text values counted as "yes".
const TRUTHY: [&str; 4] = ["yes", "true", "1", "y"];

/// Yes/no coercion for text: `yes`, `true`, `1`, `y` (any case) are true.
pub fn parse_bool_text(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    TRUTHY.contains(&v.as_str())
}

/// Yes/no coercion for a cell. Native booleans pass through, a missing
/// cell is false.
pub fn coerce_bool(cell: Option<&Cell>) -> bool {
    match cell {
        Some(Cell::Bool(b)) => *b,
        Some(Cell::Text(s)) => parse_bool_text(s),
        None => false,
    }
}

/// Trimmed text of a mapped, non-blank cell.
fn optional_text(row: &RawRow, column: Option<&str>) -> Option<String> {
    let cell = mapped_cell(row, column)?;
    if cell.is_blank() {
        return None;
    }
    let trimmed = cell.as_text().trim().to_string();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Transform one row; `None` when the resolved name is empty.
pub fn transform_row(row: &RawRow, mapping: &ColumnMapping, defaults: &TransformDefaults) -> Option<ParsedGuest> {
    let name = optional_text(row, mapping.get(GuestField::Name))?;

    let household_column = mapping
        .get(GuestField::HouseholdName)
        .filter(|c| *c != NO_COLUMN);

    let side = mapped_cell(row, mapping.get(GuestField::Side))
        .map(|c| c.as_text().to_lowercase())
        .filter(|s| !s.is_empty())
        .map(|s| Side::known(&s).unwrap_or(Side::Other(s)))
        .unwrap_or_else(|| defaults.default_side.clone());

    let event_ids = (!defaults.event_ids.is_empty()).then(|| defaults.event_ids.clone());

    Some(ParsedGuest {
        id: GuestId::new(),
        name,
        email: optional_text(row, mapping.get(GuestField::Email)),
        phone: optional_text(row, mapping.get(GuestField::Phone)),
        address: optional_text(row, mapping.get(GuestField::Address)),
        side,
        event_ids,
        rsvp_status: RsvpStatus::Pending,
        plus_one: coerce_bool(mapped_cell(row, mapping.get(GuestField::PlusOne))),
        dietary_restrictions: optional_text(row, mapping.get(GuestField::DietaryRestrictions)),
        household_name: optional_text(row, household_column),
        is_main_household_contact: coerce_bool(mapped_cell(
            row,
            mapping.get(GuestField::IsMainHouseholdContact),
        )),
    })
}

/// Transform all rows, dropping nameless ones.
pub fn transform(rows: &[RawRow], mapping: &ColumnMapping, defaults: &TransformDefaults) -> Vec<ParsedGuest> {
    rows.iter()
        .filter_map(|row| transform_row(row, mapping, defaults))
        .collect()
}
