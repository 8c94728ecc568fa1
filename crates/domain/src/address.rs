//! Shipping address records and the single-default invariant.

use chrono::{DateTime, Utc};
use common::{AddressId, OwnerId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Length of a valid postal code (an Indian PIN code).
pub const POSTAL_CODE_LEN: usize = 6;

/// What kind of place an address points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressKind {
    Home,
    Work,
    Other,
}

impl AddressKind {
    /// Returns the kind name as stored.
    pub fn as_str(&self) -> &'static str {
        match self {
            AddressKind::Home => "home",
            AddressKind::Work => "work",
            AddressKind::Other => "other",
        }
    }

    /// Parses a stored kind name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "home" => Some(AddressKind::Home),
            "work" => Some(AddressKind::Work),
            "other" => Some(AddressKind::Other),
            _ => None,
        }
    }
}

impl std::fmt::Display for AddressKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors that can occur when validating an address.
#[derive(Debug, Error)]
pub enum AddressError {
    /// The postal code is not a fixed-length numeric string.
    #[error("postal code must be a {POSTAL_CODE_LEN}-digit number")]
    InvalidPostalCode,

    /// A required field is empty.
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
}

/// Fields supplied by a client when adding an address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAddress {
    pub kind: AddressKind,
    pub street: String,
    pub city: String,
    pub region: String,
    pub postal_code: String,

    /// Requested default flag. The store forces this to true for an owner's
    /// first address regardless of what was requested.
    #[serde(default)]
    pub is_default: bool,
}

/// A shipping address in the owner's address book.
///
/// Invariant (enforced by the stores): an owner with any addresses has
/// exactly one with `is_default` set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub id: AddressId,
    pub owner_id: OwnerId,
    pub kind: AddressKind,
    pub street: String,
    pub city: String,
    pub region: String,
    pub postal_code: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

impl Address {
    /// Validates the supplied fields and builds a new address record.
    pub fn new(owner_id: OwnerId, fields: NewAddress) -> Result<Self, AddressError> {
        validate_postal_code(&fields.postal_code)?;
        for (name, value) in [
            ("street", &fields.street),
            ("city", &fields.city),
            ("region", &fields.region),
        ] {
            if value.trim().is_empty() {
                return Err(AddressError::EmptyField(name));
            }
        }

        Ok(Self {
            id: AddressId::new(),
            owner_id,
            kind: fields.kind,
            street: fields.street,
            city: fields.city,
            region: fields.region,
            postal_code: fields.postal_code,
            is_default: fields.is_default,
            created_at: Utc::now(),
        })
    }
}

fn validate_postal_code(code: &str) -> Result<(), AddressError> {
    if code.len() == POSTAL_CODE_LEN && code.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(AddressError::InvalidPostalCode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> NewAddress {
        NewAddress {
            kind: AddressKind::Home,
            street: "12 Market Road".into(),
            city: "Pune".into(),
            region: "Maharashtra".into(),
            postal_code: "411001".into(),
            is_default: false,
        }
    }

    #[test]
    fn test_valid_address() {
        let address = Address::new(OwnerId::new(), fields()).unwrap();
        assert_eq!(address.kind, AddressKind::Home);
        assert!(!address.is_default);
    }

    #[test]
    fn test_postal_code_must_be_six_digits() {
        for bad in ["4110", "4110011", "41100a", "41 001", ""] {
            let mut f = fields();
            f.postal_code = bad.into();
            let result = Address::new(OwnerId::new(), f);
            assert!(
                matches!(result, Err(AddressError::InvalidPostalCode)),
                "postal code {bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_empty_fields_rejected() {
        let mut f = fields();
        f.city = "  ".into();
        let result = Address::new(OwnerId::new(), f);
        assert!(matches!(result, Err(AddressError::EmptyField("city"))));
    }

    #[test]
    fn test_kind_parse_roundtrip() {
        for kind in [AddressKind::Home, AddressKind::Work, AddressKind::Other] {
            assert_eq!(AddressKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(AddressKind::parse("office"), None);
    }

    #[test]
    fn test_is_default_defaults_to_false_in_requests() {
        let json = r#"{
            "kind": "work",
            "street": "1 Tech Park",
            "city": "Bengaluru",
            "region": "Karnataka",
            "postal_code": "560001"
        }"#;
        let parsed: NewAddress = serde_json::from_str(json).unwrap();
        assert!(!parsed.is_default);
    }
}
