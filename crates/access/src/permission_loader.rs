//! Subscription → permission set resolution.

use chrono::{DateTime, Utc};
use tracing::debug;

use studypass_auth::{PermissionSet, granted_permission};
use studypass_core::{RefreshError, RefreshResult, UserId};

use crate::store::AccessStore;

/// Resolve the permission set granted by the user's authoritative
/// subscription at `now`.
///
/// A missing permission row (including the no-access row `0`), or a valid
/// subscription whose plan links none, is a configuration error.
pub async fn load_permissions<S>(
    store: &S,
    user_id: UserId,
    now: DateTime<Utc>,
) -> RefreshResult<PermissionSet>
where
    S: AccessStore + ?Sized,
{
    let subscription = store.authoritative_subscription(user_id).await?;
    let verdict = granted_permission(subscription.as_ref(), now);

    debug!(
        user_id = %user_id,
        permission_id = ?verdict.permission_id,
        rule = ?verdict.rule,
        "subscription resolved"
    );

    let Some(permission_id) = verdict.permission_id else {
        return Err(RefreshError::configuration(
            "active subscription's plan has no permission row",
        ));
    };

    store
        .permission_set(permission_id)
        .await?
        .ok_or_else(|| {
            RefreshError::configuration(format!("permission row {permission_id} is missing"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use studypass_auth::{Feature, PaymentRecord, SubscriptionRecord};
    use studypass_core::{PermissionId, PlanId};

    use crate::store::InMemoryAccessStore;

    fn premium() -> PermissionSet {
        PermissionSet::from_features([Feature::UserExams, Feature::Essay, Feature::StudyPlan])
    }

    fn store_with(record: Option<SubscriptionRecord>) -> InMemoryAccessStore {
        let store = InMemoryAccessStore::new()
            .with_permission_set(PermissionId::NO_ACCESS, PermissionSet::none())
            .with_permission_set(PermissionId::new(3), premium());
        match record {
            Some(r) => store.with_subscription(UserId::new(7), r),
            None => store,
        }
    }

    fn subscription(expiry: Option<DateTime<Utc>>) -> SubscriptionRecord {
        SubscriptionRecord {
            subscription_id: 1,
            plan_id: PlanId::new(2),
            permission_id: Some(PermissionId::new(3)),
            expiry_date: expiry,
            canceled_at: None,
            latest_payment: None,
        }
    }

    #[tokio::test]
    async fn valid_subscription_loads_plan_permissions() {
        let now = Utc::now();
        let store = store_with(Some(subscription(Some(now + Duration::days(30)))));

        let set = load_permissions(&store, UserId::new(7), now).await.unwrap();
        assert_eq!(set, premium());
    }

    #[tokio::test]
    async fn expired_subscription_loads_baseline() {
        let now = Utc::now();
        let store = store_with(Some(subscription(Some(now - Duration::days(1)))));

        let set = load_permissions(&store, UserId::new(7), now).await.unwrap();
        assert_eq!(set, PermissionSet::none());
    }

    #[tokio::test]
    async fn pending_payment_loads_baseline() {
        let mut record = subscription(None);
        record.latest_payment = Some(PaymentRecord {
            id: 4,
            status: Some("pending".to_string()),
        });
        let store = store_with(Some(record));

        let set = load_permissions(&store, UserId::new(7), Utc::now()).await.unwrap();
        assert_eq!(set, PermissionSet::none());
    }

    #[tokio::test]
    async fn user_without_subscription_loads_baseline() {
        let store = store_with(None);
        let set = load_permissions(&store, UserId::new(7), Utc::now()).await.unwrap();
        assert_eq!(set, PermissionSet::none());
    }

    #[tokio::test]
    async fn expired_plan_without_permission_loads_baseline() {
        let now = Utc::now();
        let mut record = subscription(Some(now - Duration::days(1)));
        record.permission_id = None;
        let store = store_with(Some(record));

        let set = load_permissions(&store, UserId::new(7), now).await.unwrap();
        assert_eq!(set, PermissionSet::none());
    }

    #[tokio::test]
    async fn active_plan_without_permission_is_a_configuration_error() {
        let now = Utc::now();
        let mut record = subscription(Some(now + Duration::days(1)));
        record.permission_id = None;
        let store = store_with(Some(record));

        let err = load_permissions(&store, UserId::new(7), now).await.unwrap_err();
        assert!(matches!(err, RefreshError::Configuration(_)));
    }

    #[tokio::test]
    async fn missing_baseline_row_is_a_configuration_error() {
        let store = InMemoryAccessStore::new();
        let err = load_permissions(&store, UserId::new(7), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, RefreshError::Configuration(_)));
    }
}
