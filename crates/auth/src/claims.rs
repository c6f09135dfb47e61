use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use studypass_core::{PlanId, TenantId, UserId};

use crate::PermissionSet;

/// Exam identifiers carried by the `exams_id` claim.
///
/// Inbound tokens may carry a scalar or a sequence; refreshed tokens always
/// carry a sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExamsId {
    Many(Vec<Option<i64>>),
    One(Option<i64>),
}

impl ExamsId {
    /// Ordered sequence view. A scalar becomes a single-element sequence.
    pub fn into_sequence(self) -> Vec<Option<i64>> {
        match self {
            ExamsId::Many(ids) => ids,
            ExamsId::One(id) => vec![id],
        }
    }

    #[must_use]
    pub fn normalized(self) -> Self {
        ExamsId::Many(self.into_sequence())
    }
}

impl Default for ExamsId {
    fn default() -> Self {
        ExamsId::One(None)
    }
}

/// Institution metadata attached by the admin enricher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminFields {
    pub institution_type: Option<String>,
    pub is_admin: bool,
}

/// Session claims carried in and out of the access token.
///
/// The value is threaded through the refresh pipeline by move; each `with_*`
/// method returns the updated claims.
///
/// Only `id` and `tenant_id` are decoded strictly. Every other field is
/// rebuilt from storage on refresh, so a malformed inbound value reads as
/// absent instead of rejecting the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User identifier.
    pub id: UserId,

    #[serde(default, deserialize_with = "lenient")]
    pub full_name: Option<String>,

    #[serde(default, deserialize_with = "lenient")]
    pub email: Option<String>,

    /// Partition selector. Absent on tokens minted before tenants existed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,

    #[serde(default, deserialize_with = "lenient")]
    pub course: Option<i64>,

    /// Plan of the current subscription; `None` once it has expired.
    #[serde(default, deserialize_with = "lenient")]
    pub plan_id: Option<PlanId>,

    #[serde(default, deserialize_with = "lenient_or_default")]
    pub exams_id: ExamsId,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub permissions: Option<PermissionSet>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub institution_type: Option<String>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub referral_code: Option<u64>,
}

impl SessionClaims {
    /// Bare claims for `id`; every other field empty.
    pub fn for_user(id: UserId) -> Self {
        Self {
            id,
            full_name: None,
            email: None,
            tenant_id: None,
            course: None,
            plan_id: None,
            exams_id: ExamsId::default(),
            permissions: None,
            institution_type: None,
            is_admin: None,
            referral_code: None,
        }
    }

    /// Label used when logging on behalf of this user.
    pub fn actor(&self) -> String {
        match self.full_name.as_deref() {
            Some(name) if !name.trim().is_empty() => format!("{name} (id {})", self.id),
            _ => format!("user {}", self.id),
        }
    }

    #[must_use]
    pub fn with_tenant(mut self, tenant: &TenantId) -> Self {
        self.tenant_id = Some(tenant.as_str().to_string());
        self
    }

    #[must_use]
    pub fn with_permissions(mut self, permissions: PermissionSet) -> Self {
        self.permissions = Some(permissions);
        self
    }

    #[must_use]
    pub fn with_admin_fields(mut self, fields: AdminFields) -> Self {
        self.institution_type = fields.institution_type;
        self.is_admin = Some(fields.is_admin);
        self
    }

    #[must_use]
    pub fn with_referral_code(mut self, code: u64) -> Self {
        self.referral_code = Some(code);
        self
    }

    #[must_use]
    pub fn with_normalized_exams(mut self) -> Self {
        self.exams_id = self.exams_id.normalized();
        self
    }
}

/// `None` for null or for a value that does not fit `T`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| serde_json::from_value(value).ok()))
}

fn lenient_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(lenient(deserializer)?.unwrap_or_default())
}
