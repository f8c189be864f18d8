//! Shipping address model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use securecart_core::{AddressId, UserId};

/// A saved shipping address in a user's address book.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Address {
    pub id: AddressId,
    pub user_id: UserId,
    pub full_name: String,
    pub street_address1: String,
    pub street_address2: Option<String>,
    pub city: String,
    pub state_province: Option<String>,
    pub postal_code: String,
    pub country: String,
    pub phone_number: Option<String>,
    pub delivery_instructions: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Address {
    /// Single-line rendering with empty parts filtered out.
    #[must_use]
    pub fn complete_address(&self) -> String {
        [
            Some(self.street_address1.as_str()),
            self.street_address2.as_deref(),
            Some(self.city.as_str()),
            self.state_province.as_deref(),
            Some(self.postal_code.as_str()),
            Some(self.country.as_str()),
        ]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }
}

/// Form payload for creating or updating an address.
#[derive(Debug, Clone, Deserialize)]
pub struct AddressForm {
    pub full_name: String,
    pub street_address1: String,
    pub street_address2: Option<String>,
    pub city: String,
    pub state_province: Option<String>,
    pub postal_code: String,
    pub country: String,
    pub phone_number: Option<String>,
    pub delivery_instructions: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_address_skips_empty_parts() {
        let address = Address {
            id: AddressId::new(1),
            user_id: UserId::new(1),
            full_name: "A. Shopper".into(),
            street_address1: "1 High Street".into(),
            street_address2: None,
            city: "Leeds".into(),
            state_province: Some(String::new()),
            postal_code: "LS1 1AA".into(),
            country: "United Kingdom".into(),
            phone_number: None,
            delivery_instructions: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(
            address.complete_address(),
            "1 High Street, Leeds, LS1 1AA, United Kingdom"
        );
    }
}
