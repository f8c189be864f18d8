//! Account roles and the permissions derived from them.

use serde::{Deserialize, Serialize};

/// Account role.
///
/// Staff and superuser access are derived from the role alone; they are
/// never stored as separate flags that could drift out of sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular shopper. No staff access.
    #[default]
    Customer,
    /// Store staff: can manage orders, products, and customer accounts.
    Admin,
    /// Full access, including audit logs and role assignment.
    Superuser,
}

impl Role {
    /// Whether this role grants access to the staff surface.
    #[must_use]
    pub const fn is_staff(self) -> bool {
        matches!(self, Self::Admin | Self::Superuser)
    }

    /// Whether this role is the superuser role.
    #[must_use]
    pub const fn is_superuser(self) -> bool {
        matches!(self, Self::Superuser)
    }

    /// Stable string form used in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Admin => "admin",
            Self::Superuser => "superuser",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Self::Customer),
            "admin" => Ok(Self::Admin),
            "superuser" => Ok(Self::Superuser),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

// SQLx support (with postgres feature): roles are stored as TEXT.
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Role {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Role {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        s.parse::<Self>().map_err(Into::into)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Role {
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

    #[test]
    fn test_staff_derivation() {
        assert!(!Role::Customer.is_staff());
        assert!(Role::Admin.is_staff());
        assert!(Role::Superuser.is_staff());
        assert!(Role::Superuser.is_superuser());
        assert!(!Role::Admin.is_superuser());
    }

    #[test]
    fn test_roundtrip() {
        for role in [Role::Customer, Role::Admin, Role::Superuser] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("root".parse::<Role>().is_err());
    }
}
