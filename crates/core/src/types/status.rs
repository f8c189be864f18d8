//! Order status and its legal transitions.

use serde::{Deserialize, Serialize};

/// Order fulfillment status.
///
/// Legal transitions are forward-only: `pending -> shipped -> delivered`,
/// plus `pending -> canceled`. Everything else is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Shipped,
    Delivered,
    Canceled,
}

impl OrderStatus {
    /// Whether moving from `self` to `next` is a legal transition.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Shipped)
                | (Self::Shipped, Self::Delivered)
                | (Self::Pending, Self::Canceled)
        )
    }

    /// Cancellation is only permitted while the order is pending.
    #[must_use]
    pub const fn can_cancel(self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Stable string form used in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Canceled => "canceled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "canceled" => Ok(Self::Canceled),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

// SQLx support (with postgres feature): statuses are stored as TEXT.
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for OrderStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for OrderStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        s.parse::<Self>().map_err(Into::into)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for OrderStatus {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <&str as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const ALL: [OrderStatus; 4] = [
        OrderStatus::Pending,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Canceled,
    ];

    #[test]
    fn test_forward_transitions() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Shipped));
        assert!(OrderStatus::Shipped.can_transition_to(OrderStatus::Delivered));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Canceled));
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Canceled));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Canceled));
        assert!(!OrderStatus::Canceled.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Delivered));
        for status in ALL {
            assert!(!status.can_transition_to(status));
        }
    }

    #[test]
    fn test_cancelable_only_from_pending() {
        assert!(OrderStatus::Pending.can_cancel());
        assert!(!OrderStatus::Shipped.can_cancel());
        assert!(!OrderStatus::Delivered.can_cancel());
        assert!(!OrderStatus::Canceled.can_cancel());
    }

    #[test]
    fn test_roundtrip() {
        for status in ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("returned".parse::<OrderStatus>().is_err());
    }
}
