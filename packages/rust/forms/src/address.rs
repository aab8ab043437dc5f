//! Best-effort decomposition of free-text postal addresses.

use intakeforge_shared::{CanonicalField, PersonRecord};

/// Country written on every address line of the catalog's forms.
pub const DEFAULT_COUNTRY: &str = "USA";

/// An address broken into the parts account forms ask for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostalAddress {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub country: String,
}

impl Default for PostalAddress {
    fn default() -> Self {
        Self {
            street: String::new(),
            city: String::new(),
            state: String::new(),
            zip: String::new(),
            country: DEFAULT_COUNTRY.to_string(),
        }
    }
}

/// Split `"Street, City, ST ZIP"` on commas.
///
/// Three or more parts give street, city, and state/ZIP from the first two
/// tokens of the third part; two parts give street and city; a single part
/// is the street.
pub fn decompose_address(raw: &str) -> PostalAddress {
    let raw = raw.trim();
    if raw.is_empty() {
        return PostalAddress::default();
    }

    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    match parts.as_slice() {
        [street, city, state_zip, ..] => {
            let mut tokens = state_zip.split_whitespace();
            PostalAddress {
                street: (*street).to_string(),
                city: (*city).to_string(),
                state: tokens.next().unwrap_or("").to_string(),
                zip: tokens.next().unwrap_or("").to_string(),
                ..PostalAddress::default()
            }
        }
        [street, city] => PostalAddress {
            street: (*street).to_string(),
            city: (*city).to_string(),
            ..PostalAddress::default()
        },
        _ => PostalAddress {
            street: raw.to_string(),
            ..PostalAddress::default()
        },
    }
}

/// The person's address, with separate City/State/ZIP fields filling the
/// parts the free-text line did not supply.
pub fn address_of(person: &PersonRecord) -> PostalAddress {
    let mut address = decompose_address(person.value(CanonicalField::Address));
    fill_empty(&mut address.city, person.value(CanonicalField::City));
    fill_empty(&mut address.state, person.value(CanonicalField::State));
    fill_empty(&mut address.zip, person.value(CanonicalField::Zip));
    address
}

impl PostalAddress {
    /// Fill every empty part from `other`.
    pub fn or(mut self, other: &PostalAddress) -> Self {
        fill_empty(&mut self.street, &other.street);
        fill_empty(&mut self.city, &other.city);
        fill_empty(&mut self.state, &other.state);
        fill_empty(&mut self.zip, &other.zip);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.street.is_empty() && self.city.is_empty() && self.state.is_empty() && self.zip.is_empty()
    }
}

fn fill_empty(slot: &mut String, value: &str) {
    if slot.is_empty() && !value.trim().is_empty() {
        *slot = value.trim().to_string();
    }
}
