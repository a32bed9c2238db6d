//! Domain models for imported guests.
//!
//! # Types
//!
//! - [`Cell`] - A single spreadsheet cell (text or native boolean)
//! - [`RawRow`] - One parsed row keyed by column header
//! - [`GuestField`] - Canonical guest fields a column can be mapped to
//! - [`Side`] - Which partner's circle a guest belongs to
//! - [`ParsedGuest`] - An editable guest record ready for bulk import
//!
//! # Wire format
//!
//! Everything serializes as camelCase JSON, the shape the guest API expects:
//!
//! ```json
//! {
//!   "id": "7d7b6c1e-...",
//!   "name": "Priya Sharma",
//!   "email": "priya@example.com",
//!   "side": "bride",
//!   "eventIds": ["mehndi", "sangeet"],
//!   "rsvpStatus": "pending",
//!   "plusOne": true,
//!   "isMainHouseholdContact": false
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// =============================================================================
// Cells and rows
// =============================================================================

/// A spreadsheet cell.
///
/// Parsing libraries hand back loosely typed values; everything except a
/// native boolean is stringified at the parse boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Bool(bool),
    Text(String),
}

impl Cell {
    /// Cell content as text (`true`/`false` for booleans).
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Cell::Text(s) => Cow::Borrowed(s.as_str()),
            Cell::Bool(b) => Cow::Owned(b.to_string()),
        }
    }

    /// An empty string or a `false` boolean.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Text(s) => s.is_empty(),
            Cell::Bool(b) => !b,
        }
    }
}

impl Default for Cell {
    fn default() -> Self {
        Cell::Text(String::new())
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<bool> for Cell {
    fn from(b: bool) -> Self {
        Cell::Bool(b)
    }
}

/// One imported row: column header → cell.
pub type RawRow = HashMap<String, Cell>;

/// Look up the cell a mapped column points at.
pub fn mapped_cell<'a>(row: &'a RawRow, column: Option<&str>) -> Option<&'a Cell> {
    column.and_then(|c| row.get(c))
}

// =============================================================================
// Guest fields
// =============================================================================

/// Canonical guest fields a source column can be mapped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GuestField {
    Name,
    Email,
    Phone,
    Address,
    Side,
    PlusOne,
    DietaryRestrictions,
    HouseholdName,
    IsMainHouseholdContact,
}

impl GuestField {
    /// All fields, in display order.
    pub const ALL: [GuestField; 9] = [
        GuestField::Name,
        GuestField::Email,
        GuestField::Phone,
        GuestField::Address,
        GuestField::Side,
        GuestField::PlusOne,
        GuestField::DietaryRestrictions,
        GuestField::HouseholdName,
        GuestField::IsMainHouseholdContact,
    ];

    /// Wire name of the field.
    pub fn as_str(&self) -> &'static str {
        match self {
            GuestField::Name => "name",
            GuestField::Email => "email",
            GuestField::Phone => "phone",
            GuestField::Address => "address",
            GuestField::Side => "side",
            GuestField::PlusOne => "plusOne",
            GuestField::DietaryRestrictions => "dietaryRestrictions",
            GuestField::HouseholdName => "householdName",
            GuestField::IsMainHouseholdContact => "isMainHouseholdContact",
        }
    }
}

impl fmt::Display for GuestField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown guest field name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownField(pub String);

impl fmt::Display for UnknownField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown guest field: {}", self.0)
    }
}

impl std::error::Error for UnknownField {}

impl FromStr for GuestField {
    type Err = UnknownField;

    /// Accepts the wire name, case-insensitively, with or without
    /// `_`/`-` separators (`plusOne`, `plus_one`, `PLUS-ONE`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();

        GuestField::ALL
            .into_iter()
            .find(|f| f.as_str().to_lowercase() == key)
            .ok_or_else(|| UnknownField(s.to_string()))
    }
}

// =============================================================================
// Side / RSVP
// =============================================================================

/// Which partner's circle a guest is associated with.
///
/// `Other` carries text that reached a guest without passing validation
/// (the transformer does not re-check the enum).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Side {
    Bride,
    Groom,
    #[default]
    Mutual,
    Other(String),
}

impl Side {
    /// Parse leniently: known values case-insensitively, anything else is kept.
    pub fn parse(value: &str) -> Side {
        let lower = value.trim().to_lowercase();
        Side::known(&lower).unwrap_or(Side::Other(lower))
    }

    /// Strict, case-insensitive parse without trimming; `None` for
    /// anything outside bride/groom/mutual.
    pub fn known(value: &str) -> Option<Side> {
        match value.to_lowercase().as_str() {
            "bride" => Some(Side::Bride),
            "groom" => Some(Side::Groom),
            "mutual" => Some(Side::Mutual),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Side::Bride => "bride",
            Side::Groom => "groom",
            Side::Mutual => "mutual",
            Side::Other(s) => s,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Side::Other(_))
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Side {
    fn from(s: String) -> Self {
        Side::parse(&s)
    }
}

impl From<Side> for String {
    fn from(side: Side) -> Self {
        side.as_str().to_string()
    }
}

/// RSVP state of a guest. Imported guests always start out pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RsvpStatus {
    #[default]
    Pending,
}

// =============================================================================
// Guests
// =============================================================================

/// Stable identifier of a guest in the preview.
///
/// Assigned when a row is transformed, so edits and removals never depend
/// on list position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuestId(Uuid);

impl GuestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for GuestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GuestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for GuestId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A transformed, user-editable guest record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedGuest {
    pub id: GuestId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub side: Side,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_ids: Option<Vec<String>>,
    pub rsvp_status: RsvpStatus,
    pub plus_one: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dietary_restrictions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub household_name: Option<String>,
    pub is_main_household_contact: bool,
}

impl ParsedGuest {
    /// A pending guest with only a name and side set.
    pub fn new(name: impl Into<String>, side: Side) -> Self {
        Self {
            id: GuestId::new(),
            name: name.into(),
            email: None,
            phone: None,
            address: None,
            side,
            event_ids: None,
            rsvp_status: RsvpStatus::Pending,
            plus_one: false,
            dietary_restrictions: None,
            household_name: None,
            is_main_household_contact: false,
        }
    }
}
