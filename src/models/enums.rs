//! Shared string-backed enums for account records

use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, Postgres};

macro_rules! string_enum_sqlx {
    ($name:ident) => {
        impl sqlx::Type<Postgres> for $name {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<Postgres>>::type_info()
            }
        }

        impl<'r> Decode<'r, Postgres> for $name {
            fn decode(
                value: sqlx::postgres::PgValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let s: String = Decode::<Postgres>::decode(value)?;
                s.parse().map_err(|e: String| e.into())
            }
        }

        impl Encode<'_, Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut sqlx::postgres::PgArgumentBuffer,
            ) -> sqlx::encode::IsNull {
                let s: String = self.as_str().to_string();
                <String as Encode<Postgres>>::encode(s, buf)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }
    };
}

/// Library member account status. Only `Active` accounts may authenticate
/// or borrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Suspended,
    Blocked,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Suspended => "suspended",
            UserStatus::Blocked => "blocked",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, UserStatus::Active)
    }
}

impl std::str::FromStr for UserStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(UserStatus::Active),
            "suspended" => Ok(UserStatus::Suspended),
            "blocked" => Ok(UserStatus::Blocked),
            _ => Err(format!("Invalid user status: {}", s)),
        }
    }
}

string_enum_sqlx!(UserStatus);

/// Staff account status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffStatus {
    Active,
    OnLeave,
    Terminated,
}

impl StaffStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaffStatus::Active => "active",
            StaffStatus::OnLeave => "on_leave",
            StaffStatus::Terminated => "terminated",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, StaffStatus::Active)
    }
}

impl std::str::FromStr for StaffStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(StaffStatus::Active),
            "on_leave" => Ok(StaffStatus::OnLeave),
            "terminated" => Ok(StaffStatus::Terminated),
            _ => Err(format!("Invalid staff status: {}", s)),
        }
    }
}

string_enum_sqlx!(StaffStatus);

/// Membership tier for library members. Drives the default borrowing limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipTier {
    Regular,
    Premium,
    Academic,
}

impl MembershipTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipTier::Regular => "regular",
            MembershipTier::Premium => "premium",
            MembershipTier::Academic => "academic",
        }
    }

    /// Default number of simultaneous loans for the tier.
    pub fn default_borrowing_limit(&self) -> i32 {
        match self {
            MembershipTier::Premium => 10,
            MembershipTier::Regular | MembershipTier::Academic => 5,
        }
    }
}

impl std::str::FromStr for MembershipTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "regular" => Ok(MembershipTier::Regular),
            "premium" => Ok(MembershipTier::Premium),
            "academic" => Ok(MembershipTier::Academic),
            _ => Err(format!("Invalid membership tier: {}", s)),
        }
    }
}

string_enum_sqlx!(MembershipTier);

/// Primary authentication method recorded on an account.
///
/// Informational only: which credential actually verifies decides whether a
/// login succeeds, and an account may hold both a password hash and a linked
/// external identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    Local,
    External,
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::Local => "local",
            AuthMethod::External => "external",
        }
    }
}

impl std::str::FromStr for AuthMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(AuthMethod::Local),
            "external" => Ok(AuthMethod::External),
            _ => Err(format!("Invalid auth method: {}", s)),
        }
    }
}

string_enum_sqlx!(AuthMethod);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_status_round_trips_through_strings() {
        for status in [UserStatus::Active, UserStatus::Suspended, UserStatus::Blocked] {
            assert_eq!(status.as_str().parse::<UserStatus>().unwrap(), status);
        }
        assert!("deleted".parse::<UserStatus>().is_err());
    }

    #[test]
    fn only_active_statuses_transact() {
        assert!(UserStatus::Active.is_active());
        assert!(!UserStatus::Suspended.is_active());
        assert!(!UserStatus::Blocked.is_active());
        assert!(StaffStatus::Active.is_active());
        assert!(!StaffStatus::OnLeave.is_active());
        assert!(!StaffStatus::Terminated.is_active());
    }

    #[test]
    fn premium_tier_raises_borrowing_limit() {
        assert_eq!(MembershipTier::Regular.default_borrowing_limit(), 5);
        assert_eq!(MembershipTier::Premium.default_borrowing_limit(), 10);
        assert_eq!(MembershipTier::Academic.default_borrowing_limit(), 5);
    }
}
