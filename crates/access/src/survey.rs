//! Onboarding-survey pendency.

use studypass_auth::{Feature, PermissionSet};
use studypass_core::{RefreshResult, UserId};

use crate::store::{AccessStore, SurveyAnswers};

/// Pendency for a given answer row. Irrelevant (false) without exam access.
pub fn is_survey_pending(permissions: &PermissionSet, answers: Option<&SurveyAnswers>) -> bool {
    if !permissions.allows(Feature::UserExams) {
        return false;
    }
    match answers {
        None => true,
        Some(answers) => !answers.is_complete(),
    }
}

pub async fn survey_pending<S>(
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
    let answers = store.survey_answers(user_id).await?;
    Ok(is_survey_pending(permissions, answers.as_ref()))
}
