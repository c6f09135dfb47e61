use studypass_auth::{Feature, PermissionSet};
use studypass_core::{RefreshResult, UserId};

use crate::store::AccessStore;

/// True when an exam-enabled user has not been linked to a course yet.
pub async fn has_pending_user_exams<S>(
    store: &S,
    user_id: UserId,
    permissions: &PermissionSet,
) -> RefreshResult<bool>
where
    S: AccessStore + ?Sized,
{
    if !permissions.allows(Feature::UserExams) {
        return Ok(false);
    }
    Ok(!store.has_course_enrollment(user_id).await?)
}
