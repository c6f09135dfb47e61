//! Institution metadata for the claims.

use studypass_auth::AdminFields;
use studypass_core::{RefreshError, RefreshResult, UserId};

use crate::store::AccessStore;

/// Institution type plus whether `user_id` is the institution admin.
///
/// Exactly one institution row must exist in the partition.
pub async fn admin_fields<S>(store: &S, user_id: UserId) -> RefreshResult<AdminFields>
where
    S: AccessStore + ?Sized,
{
    let mut rows = store.institutions().await?;
    if rows.len() != 1 {
        return Err(RefreshError::configuration(format!(
            "expected exactly one institution row, found {}",
            rows.len()
        )));
    }
    let institution = rows.remove(0);

    Ok(AdminFields {
        is_admin: institution.admin_user_id == Some(user_id),
        institution_type: institution.institution_type,
    })
}
