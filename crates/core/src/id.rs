//! Strongly-typed identifiers used across the workspace.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::RefreshError;

/// Identifier of a platform user (the `id` claim).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

/// Identifier of a subscription plan.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanId(i64);

/// Identifier of a permission row.
///
/// `PermissionId::NO_ACCESS` (id `0`) is the baseline granted to users without
/// a valid subscription.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionId(i64);

macro_rules! impl_int_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            pub const fn get(&self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<i64> for $t {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$t> for i64 {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = RefreshError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let value = s
                    .trim()
                    .parse::<i64>()
                    .map_err(|e| RefreshError::validation(format!("{}: {}", $name, e)))?;
                Ok(Self(value))
            }
        }
    };
}

impl_int_newtype!(UserId, "UserId");
impl_int_newtype!(PlanId, "PlanId");
impl_int_newtype!(PermissionId, "PermissionId");

impl PermissionId {
    pub const NO_ACCESS: PermissionId = PermissionId(0);

    pub fn is_no_access(&self) -> bool {
        *self == Self::NO_ACCESS
    }
}

/// Tenant partition selector carried in the `tenant_id` claim.
///
/// The legacy alias `"portal"` names the shared `"public"` partition; every
/// other value is used as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    pub const PORTAL_ALIAS: &'static str = "portal";
    pub const PUBLIC: &'static str = "public";

    /// Build a tenant id. Blank values are rejected.
    pub fn parse(value: impl Into<String>) -> Result<Self, RefreshError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(RefreshError::missing_tenant());
        }
        Ok(Self(value))
    }

    /// Rewrite the `"portal"` alias to `"public"`.
    pub fn normalized(self) -> Self {
        if self.0 == Self::PORTAL_ALIAS {
            Self(Self::PUBLIC.to_string())
        } else {
            self
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for TenantId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TenantId {
    type Err = RefreshError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn portal_alias_becomes_public() {
        let tenant = TenantId::parse("portal").unwrap().normalized();
        assert_eq!(tenant.as_str(), "public");
    }

    #[test]
    fn blank_tenant_is_rejected() {
        let err = TenantId::parse("   ").unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn no_access_permission_is_zero() {
        assert!(PermissionId::new(0).is_no_access());
        assert!(!PermissionId::new(3).is_no_access());
    }

    #[test]
    fn user_id_parses_from_text() {
        assert_eq!("42".parse::<UserId>().unwrap(), UserId::new(42));
        assert!("abc".parse::<UserId>().is_err());
    }

    proptest! {
        /// Property: every tenant other than the portal alias is left untouched.
        #[test]
        fn non_portal_tenants_pass_through(name in "[a-z_][a-z0-9_]{0,20}") {
            prop_assume!(name != "portal");
            let tenant = TenantId::parse(name.clone()).unwrap().normalized();
            prop_assert_eq!(tenant.as_str(), name.as_str());
        }
    }
}
