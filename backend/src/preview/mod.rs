//! Editable preview of transformed guests.
//!
//! Guests are addressed by their [`GuestId`], so an edit or removal always
//! hits the record it was meant for, whatever happened to the list in
//! between.

use crate::error::PreviewError;
use crate::models::{Cell, GuestField, GuestId, ParsedGuest, Side};
use crate::transform::coerce_bool;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreviewEditor {
    guests: Vec<ParsedGuest>,
}

impl PreviewEditor {
    pub fn new(guests: Vec<ParsedGuest>) -> Self {
        Self { guests }
    }

    pub fn guests(&self) -> &[ParsedGuest] {
        &self.guests
    }

    pub fn len(&self) -> usize {
        self.guests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guests.is_empty()
    }

    pub fn get(&self, id: GuestId) -> Option<&ParsedGuest> {
        self.guests.iter().find(|g| g.id == id)
    }

    fn get_mut(&mut self, id: GuestId) -> Result<&mut ParsedGuest, PreviewError> {
        self.guests
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or(PreviewError::UnknownGuest(id))
    }

    /// Replace one field of one guest. Nothing else is recomputed.
    ///
    /// Optional text fields become unset when given blank text; yes/no
    /// fields accept native booleans or the usual yes/no text.
    pub fn update_field(&mut self, id: GuestId, field: GuestField, value: Cell) -> Result<(), PreviewError> {
        let guest = self.get_mut(id)?;

        let text = || value.as_text().into_owned();
        let optional = || Some(text()).filter(|t| !t.trim().is_empty());

        match field {
            GuestField::Name => guest.name = text(),
            GuestField::Email => guest.email = optional(),
            GuestField::Phone => guest.phone = optional(),
            GuestField::Address => guest.address = optional(),
            GuestField::DietaryRestrictions => guest.dietary_restrictions = optional(),
            GuestField::HouseholdName => guest.household_name = optional(),
            GuestField::Side => guest.side = Side::parse(&text()),
            GuestField::PlusOne => guest.plus_one = coerce_bool(Some(&value)),
            GuestField::IsMainHouseholdContact => guest.is_main_household_contact = coerce_bool(Some(&value)),
        }

        Ok(())
    }

    /// Remove one guest; the others keep their order.
    pub fn remove_row(&mut self, id: GuestId) -> Result<ParsedGuest, PreviewError> {
        let index = self
            .guests
            .iter()
            .position(|g| g.id == id)
            .ok_or(PreviewError::UnknownGuest(id))?;
        Ok(self.guests.remove(index))
    }

    pub fn clear(&mut self) {
        self.guests.clear();
    }
}
