//! Tenant-scoped data access seams.
//!
//! The pipeline never talks to a database directly. It asks a
//! [`TenantConnector`] for the partition named by the tenant, then reads and
//! writes through the returned [`AccessStore`]. Each statement is independent
//! (autocommit); nothing here is transactional.

pub mod in_memory;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use studypass_auth::{PermissionSet, SubscriptionRecord};
use studypass_core::{PermissionId, PlanId, RefreshError, TenantId, UserId};

pub use in_memory::{InMemoryAccessStore, InMemoryTenantDirectory};

/// Identity/profile summary the refreshed claims are rebuilt from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: UserId,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub course: Option<i64>,
    /// Plan of the most recently created subscription, `None` once expired.
    pub plan_id: Option<PlanId>,
    pub exams_id: Option<i64>,
}

/// Read-only projection of a user's past activity.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageHistory {
    pub has_performance_history: bool,
    pub has_favorite_videos: bool,
    pub has_placement_tests: bool,
    pub has_activity_history: bool,
}

/// Mandatory onboarding-survey answers (`None` = unanswered).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyAnswers {
    pub gender: Option<String>,
    pub education_level: Option<String>,
    pub high_school_system: Option<String>,
    pub marketing_channel: Option<String>,
    pub study_techniques: Option<String>,
    pub subjects_to_improve: Option<String>,
    pub study_hours: Option<String>,
}

impl SurveyAnswers {
    pub fn is_complete(&self) -> bool {
        [
            &self.gender,
            &self.education_level,
            &self.high_school_system,
            &self.marketing_channel,
            &self.study_techniques,
            &self.subjects_to_improve,
            &self.study_hours,
        ]
        .iter()
        .all(|answer| answer.is_some())
    }
}

/// Institution configuration row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Institution {
    pub institution_type: Option<String>,
    pub admin_user_id: Option<UserId>,
}

/// Append-only login log row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginLogEntry {
    pub user_id: UserId,
    pub timestamp: DateTime<Utc>,
    pub source: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("query failed ({operation}): {message}")]
    Query {
        operation: &'static str,
        message: String,
    },

    #[error("unexpected row shape ({operation}): {message}")]
    Decode {
        operation: &'static str,
        message: String,
    },
}

impl StoreError {
    pub fn query(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Query {
            operation,
            message: message.into(),
        }
    }

    pub fn decode(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Decode {
            operation,
            message: message.into(),
        }
    }
}

impl From<StoreError> for RefreshError {
    fn from(value: StoreError) -> Self {
        RefreshError::internal(value.to_string())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConnectError {
    /// The tenant does not name a data partition.
    #[error("unknown tenant partition: {0}")]
    UnknownTenant(TenantId),

    #[error("{0}")]
    Store(#[from] StoreError),
}

impl From<ConnectError> for RefreshError {
    fn from(value: ConnectError) -> Self {
        match value {
            ConnectError::UnknownTenant(tenant) => RefreshError::invalid_schema(tenant),
            ConnectError::Store(e) => e.into(),
        }
    }
}

/// Request-scoped view of one tenant partition.
#[async_trait::async_trait]
pub trait AccessStore: Send + Sync {
    /// Identity/profile/current-plan summary, `None` for unknown users.
    async fn user_identity(&self, user_id: UserId) -> Result<Option<UserIdentity>, StoreError>;

    /// The authoritative subscription (see [`studypass_auth::authoritative`]).
    async fn authoritative_subscription(
        &self,
        user_id: UserId,
    ) -> Result<Option<SubscriptionRecord>, StoreError>;

    async fn permission_set(
        &self,
        permission_id: PermissionId,
    ) -> Result<Option<PermissionSet>, StoreError>;

    async fn usage_history(&self, user_id: UserId) -> Result<UsageHistory, StoreError>;

    async fn survey_answers(&self, user_id: UserId) -> Result<Option<SurveyAnswers>, StoreError>;

    async fn has_course_enrollment(&self, user_id: UserId) -> Result<bool, StoreError>;

    /// Every institution configuration row (exactly one is expected).
    async fn institutions(&self) -> Result<Vec<Institution>, StoreError>;

    async fn last_login(&self, user_id: UserId) -> Result<Option<DateTime<Utc>>, StoreError>;

    async fn insert_login(&self, entry: &LoginLogEntry) -> Result<(), StoreError>;
}

#[async_trait::async_trait]
impl<S> AccessStore for Arc<S>
where
    S: AccessStore + ?Sized,
{
    async fn user_identity(&self, user_id: UserId) -> Result<Option<UserIdentity>, StoreError> {
        (**self).user_identity(user_id).await
    }

    async fn authoritative_subscription(
        &self,
        user_id: UserId,
    ) -> Result<Option<SubscriptionRecord>, StoreError> {
        (**self).authoritative_subscription(user_id).await
    }

    async fn permission_set(
        &self,
        permission_id: PermissionId,
    ) -> Result<Option<PermissionSet>, StoreError> {
        (**self).permission_set(permission_id).await
    }

    async fn usage_history(&self, user_id: UserId) -> Result<UsageHistory, StoreError> {
        (**self).usage_history(user_id).await
    }

    async fn survey_answers(&self, user_id: UserId) -> Result<Option<SurveyAnswers>, StoreError> {
        (**self).survey_answers(user_id).await
    }

    async fn has_course_enrollment(&self, user_id: UserId) -> Result<bool, StoreError> {
        (**self).has_course_enrollment(user_id).await
    }

    async fn institutions(&self) -> Result<Vec<Institution>, StoreError> {
        (**self).institutions().await
    }

    async fn last_login(&self, user_id: UserId) -> Result<Option<DateTime<Utc>>, StoreError> {
        (**self).last_login(user_id).await
    }

    async fn insert_login(&self, entry: &LoginLogEntry) -> Result<(), StoreError> {
        (**self).insert_login(entry).await
    }
}

/// Resolves a tenant to its data partition.
#[async_trait::async_trait]
pub trait TenantConnector: Send + Sync {
    type Store: AccessStore;

    async fn connect(&self, tenant: &TenantId) -> Result<Self::Store, ConnectError>;
}
