//! Subscription validity rules.
//!
//! Deciding which permission row a user gets is pure policy: given the
//! authoritative subscription record and the current time, pick either the
//! plan's permission id or the no-access baseline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use studypass_core::{PermissionId, PlanId};

/// Latest payment-history row joined to a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: i64,
    pub status: Option<String>,
}

impl PaymentRecord {
    pub fn status(&self) -> PaymentStatus {
        PaymentStatus::from_db(self.status.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentStatus {
    Paid,
    Pending,
    Other(Option<String>),
}

impl PaymentStatus {
    pub fn from_db(status: Option<&str>) -> Self {
        match status {
            Some("paid") => PaymentStatus::Paid,
            Some("pending") => PaymentStatus::Pending,
            other => PaymentStatus::Other(other.map(str::to_string)),
        }
    }
}

/// One subscription row as seen by the permission loader.
///
/// `latest_payment` is the joined payment-history row, if any.
/// `permission_id` is the plan's linked permission row, which may be unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub subscription_id: i64,
    pub plan_id: PlanId,
    pub permission_id: Option<PermissionId>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub latest_payment: Option<PaymentRecord>,
}

/// The rule that decided a subscription's validity, in priority order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidityRule {
    /// Expiry date at or after now.
    FutureExpiry,
    /// Expiry date before now.
    PastExpiry,
    /// No expiry, subscription canceled.
    Canceled,
    /// No expiry, latest payment pending.
    PaymentPending,
    /// No expiry, no payment history or latest payment paid.
    PaidOrNoPayment,
    /// Anything else.
    DefaultDeny,
}

impl ValidityRule {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidityRule::FutureExpiry | ValidityRule::PaidOrNoPayment)
    }

    /// First matching rule for `record` at `now`.
    pub fn evaluate(record: &SubscriptionRecord, now: DateTime<Utc>) -> Self {
        if let Some(expiry) = record.expiry_date {
            return if expiry >= now {
                ValidityRule::FutureExpiry
            } else {
                ValidityRule::PastExpiry
            };
        }

        if record.canceled_at.is_some() {
            return ValidityRule::Canceled;
        }

        match record.latest_payment.as_ref().map(PaymentRecord::status) {
            Some(PaymentStatus::Pending) => ValidityRule::PaymentPending,
            None | Some(PaymentStatus::Paid) => ValidityRule::PaidOrNoPayment,
            Some(PaymentStatus::Other(_)) => ValidityRule::DefaultDeny,
        }
    }
}

/// Outcome of resolving a user's subscription to a permission id.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SubscriptionVerdict {
    /// `None` only when the subscription is valid but its plan links no
    /// permission row.
    pub permission_id: Option<PermissionId>,
    /// `None` when the user has no subscription at all.
    pub rule: Option<ValidityRule>,
}

/// Pick the authoritative record: largest subscription id, then largest
/// payment-history id.
pub fn authoritative<'a, I>(records: I) -> Option<&'a SubscriptionRecord>
where
    I: IntoIterator<Item = &'a SubscriptionRecord>,
{
    records
        .into_iter()
        .max_by_key(|r| (r.subscription_id, r.latest_payment.as_ref().map(|p| p.id)))
}

/// Permission id granted by the authoritative subscription (or its absence).
pub fn granted_permission(
    record: Option<&SubscriptionRecord>,
    now: DateTime<Utc>,
) -> SubscriptionVerdict {
    let Some(record) = record else {
        return SubscriptionVerdict {
            permission_id: Some(PermissionId::NO_ACCESS),
            rule: None,
        };
    };

    let rule = ValidityRule::evaluate(record, now);
    let permission_id = if rule.is_valid() {
        record.permission_id
    } else {
        Some(PermissionId::NO_ACCESS)
    };

    SubscriptionVerdict {
        permission_id,
        rule: Some(rule),
    }
}
