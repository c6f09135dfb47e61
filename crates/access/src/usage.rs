//! Usage-derived permission widening.
//!
//! Only ever grants. Read-only history access for users whose subscription is
//! invalid is not implemented; it would hook in here.

use studypass_auth::{Feature, PermissionSet};
use studypass_core::{RefreshResult, UserId};

use crate::store::{AccessStore, UsageHistory};

/// Widen `permissions` with grants earned by past activity.
pub fn augment(permissions: PermissionSet, history: &UsageHistory) -> PermissionSet {
    let mut widened = permissions;
    if history.has_performance_history {
        widened = widened.grant(Feature::Performance);
    }
    if history.has_favorite_videos {
        widened = widened.grant(Feature::FavoriteVideos);
    }
    widened
}

pub async fn augment_with_usage<S>(
    store: &S,
    user_id: UserId,
    permissions: PermissionSet,
) -> RefreshResult<PermissionSet>
where
    S: AccessStore + ?Sized,
{
    let history = store.usage_history(user_id).await?;
    Ok(augment(permissions, &history))
}
