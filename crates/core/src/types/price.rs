//! Non-negative decimal price type.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone)]
pub enum PriceError {
    /// Prices cannot be negative.
    #[error("price cannot be negative: {0}")]
    Negative(Decimal),
}

/// A non-negative amount of money in the store currency's major unit.
///
/// Stored with two decimal places of precision. Arithmetic on prices is
/// done on the underlying [`Decimal`] to avoid float rounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Construct a price, rejecting negative amounts.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] if `amount < 0`.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative(amount));
        }
        Ok(Self(amount.round_dp(2)))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// The amount in the currency's minor unit (e.g. pence), as expected
    /// by hosted payment providers.
    ///
    /// Saturates at `i64::MAX`; real catalog prices are nowhere near it.
    #[must_use]
    pub fn minor_units(&self) -> i64 {
        (self.0 * Decimal::from(100)).trunc().to_i64().unwrap_or(i64::MAX)
    }

    /// Price of `quantity` units at this unit price.
    #[must_use]
    pub fn times(&self, quantity: i32) -> Decimal {
        self.0 * Decimal::from(quantity)
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

// SQLx support (with postgres feature)
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Price {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Price {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        // Database values are constrained non-negative by CHECK
        Ok(Self(amount))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Price {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_negative() {
        assert!(Price::new(Decimal::new(-1, 2)).is_err());
        assert!(Price::new(Decimal::ZERO).is_ok());
    }

    #[test]
    fn test_minor_units() {
        let price = Price::new(Decimal::new(1999, 2)).unwrap(); // 19.99
        assert_eq!(price.minor_units(), 1999);
        let whole = Price::new(Decimal::from(10)).unwrap();
        assert_eq!(whole.minor_units(), 1000);
    }

    #[test]
    fn test_times() {
        let price = Price::new(Decimal::new(1000, 2)).unwrap(); // 10.00
        assert_eq!(price.times(2), Decimal::new(2000, 2));
    }

    #[test]
    fn test_display_two_places() {
        let price = Price::new(Decimal::from(5)).unwrap();
        assert_eq!(price.to_string(), "5.00");
    }
}
