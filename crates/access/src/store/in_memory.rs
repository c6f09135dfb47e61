//! In-memory partitions for tests/dev.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use studypass_auth::{PermissionSet, SubscriptionRecord, authoritative};
use studypass_core::{PermissionId, TenantId, UserId};

use super::{
    AccessStore, ConnectError, Institution, LoginLogEntry, StoreError, SurveyAnswers,
    TenantConnector, UsageHistory, UserIdentity,
};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<UserId, UserIdentity>,
    subscriptions: Vec<(UserId, SubscriptionRecord)>,
    permissions: HashMap<PermissionId, PermissionSet>,
    performance_history: HashSet<UserId>,
    favorites: HashSet<UserId>,
    placement_tests: HashSet<UserId>,
    graded_activities: HashSet<UserId>,
    surveys: HashMap<UserId, SurveyAnswers>,
    enrollments: HashSet<UserId>,
    institutions: Vec<Institution>,
    login_log: Vec<LoginLogEntry>,
    login_log_unavailable: bool,
}

/// One tenant partition held in memory.
///
/// Builders consume and return the store so fixtures read top to bottom.
#[derive(Debug, Default)]
pub struct InMemoryAccessStore {
    inner: RwLock<Tables>,
}

impl InMemoryAccessStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn edit(self, f: impl FnOnce(&mut Tables)) -> Self {
        if let Ok(mut tables) = self.inner.write() {
            f(&mut tables);
        }
        self
    }

    pub fn with_user(self, identity: UserIdentity) -> Self {
        self.edit(|t| {
            t.users.insert(identity.id, identity);
        })
    }

    /// Add one subscription row (already joined with its payment row, if any).
    pub fn with_subscription(self, user_id: UserId, record: SubscriptionRecord) -> Self {
        self.edit(|t| t.subscriptions.push((user_id, record)))
    }

    pub fn with_permission_set(self, id: PermissionId, set: PermissionSet) -> Self {
        self.edit(|t| {
            t.permissions.insert(id, set);
        })
    }

    pub fn with_usage(self, user_id: UserId, usage: UsageHistory) -> Self {
        self.edit(|t| {
            if usage.has_performance_history {
                t.performance_history.insert(user_id);
            }
            if usage.has_favorite_videos {
                t.favorites.insert(user_id);
            }
            if usage.has_placement_tests {
                t.placement_tests.insert(user_id);
            }
            if usage.has_activity_history {
                t.graded_activities.insert(user_id);
            }
        })
    }

    pub fn with_survey(self, user_id: UserId, answers: SurveyAnswers) -> Self {
        self.edit(|t| {
            t.surveys.insert(user_id, answers);
        })
    }

    pub fn with_course_enrollment(self, user_id: UserId) -> Self {
        self.edit(|t| {
            t.enrollments.insert(user_id);
        })
    }

    pub fn with_institution(self, institution: Institution) -> Self {
        self.edit(|t| t.institutions.push(institution))
    }

    pub fn with_login(self, entry: LoginLogEntry) -> Self {
        self.edit(|t| t.login_log.push(entry))
    }

    /// Make every login-log read and write fail.
    pub fn with_login_log_unavailable(self) -> Self {
        self.edit(|t| t.login_log_unavailable = true)
    }

    /// Login rows recorded for `user_id`, oldest first.
    pub fn logins(&self, user_id: UserId) -> Vec<LoginLogEntry> {
        self.inner
            .read()
            .map(|t| {
                t.login_log
                    .iter()
                    .filter(|e| e.user_id == user_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn read<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&Tables) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let tables = self
            .inner
            .read()
            .map_err(|_| StoreError::query(operation, "lock poisoned"))?;
        f(&tables)
    }
}

#[async_trait::async_trait]
impl AccessStore for InMemoryAccessStore {
    async fn user_identity(&self, user_id: UserId) -> Result<Option<UserIdentity>, StoreError> {
        self.read("user_identity", |t| Ok(t.users.get(&user_id).cloned()))
    }

    async fn authoritative_subscription(
        &self,
        user_id: UserId,
    ) -> Result<Option<SubscriptionRecord>, StoreError> {
        self.read("authoritative_subscription", |t| {
            let rows = t
                .subscriptions
                .iter()
                .filter(|(owner, _)| *owner == user_id)
                .map(|(_, record)| record);
            Ok(authoritative(rows).cloned())
        })
    }

    async fn permission_set(
        &self,
        permission_id: PermissionId,
    ) -> Result<Option<PermissionSet>, StoreError> {
        self.read("permission_set", |t| Ok(t.permissions.get(&permission_id).copied()))
    }

    async fn usage_history(&self, user_id: UserId) -> Result<UsageHistory, StoreError> {
        self.read("usage_history", |t| {
            Ok(UsageHistory {
                has_performance_history: t.performance_history.contains(&user_id),
                has_favorite_videos: t.favorites.contains(&user_id),
                has_placement_tests: t.placement_tests.contains(&user_id),
                has_activity_history: t.graded_activities.contains(&user_id),
            })
        })
    }

    async fn survey_answers(&self, user_id: UserId) -> Result<Option<SurveyAnswers>, StoreError> {
        self.read("survey_answers", |t| Ok(t.surveys.get(&user_id).cloned()))
    }

    async fn has_course_enrollment(&self, user_id: UserId) -> Result<bool, StoreError> {
        self.read("has_course_enrollment", |t| Ok(t.enrollments.contains(&user_id)))
    }

    async fn institutions(&self) -> Result<Vec<Institution>, StoreError> {
        self.read("institutions", |t| Ok(t.institutions.clone()))
    }

    async fn last_login(&self, user_id: UserId) -> Result<Option<DateTime<Utc>>, StoreError> {
        self.read("last_login", |t| {
            if t.login_log_unavailable {
                return Err(StoreError::query("last_login", "login_log unavailable"));
            }
            Ok(t.login_log
                .iter()
                .filter(|e| e.user_id == user_id)
                .map(|e| e.timestamp)
                .max())
        })
    }

    async fn insert_login(&self, entry: &LoginLogEntry) -> Result<(), StoreError> {
        let mut tables = self
            .inner
            .write()
            .map_err(|_| StoreError::query("insert_login", "lock poisoned"))?;
        if tables.login_log_unavailable {
            return Err(StoreError::query("insert_login", "login_log unavailable"));
        }
        tables.login_log.push(entry.clone());
        Ok(())
    }
}

/// Tenant → in-memory partition map.
#[derive(Debug, Default, Clone)]
pub struct InMemoryTenantDirectory {
    partitions: HashMap<TenantId, Arc<InMemoryAccessStore>>,
}

impl InMemoryTenantDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_partition(mut self, tenant: TenantId, store: Arc<InMemoryAccessStore>) -> Self {
        self.partitions.insert(tenant, store);
        self
    }

    pub fn partition(&self, tenant: &TenantId) -> Option<Arc<InMemoryAccessStore>> {
        self.partitions.get(tenant).cloned()
    }
}

#[async_trait::async_trait]
impl TenantConnector for InMemoryTenantDirectory {
    type Store = Arc<InMemoryAccessStore>;

    async fn connect(&self, tenant: &TenantId) -> Result<Self::Store, ConnectError> {
        self.partition(tenant)
            .ok_or_else(|| ConnectError::UnknownTenant(tenant.clone()))
    }
}
