//! Rate-limited login log.
//!
//! The read and the insert are separate statements; two requests racing for
//! the same user can both insert. Duplicate rows under concurrency are
//! tolerated.

use chrono::{DateTime, Duration, Utc};

use studypass_core::UserId;

use crate::store::{AccessStore, LoginLogEntry, StoreError};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Recorded,
    /// A login inside the trailing window already exists.
    SkippedRecent,
}

pub fn logged_recently(last: Option<DateTime<Utc>>, now: DateTime<Utc>, window: Duration) -> bool {
    last.is_some_and(|ts| ts >= now - window)
}

pub async fn record_login<S>(
    store: &S,
    user_id: UserId,
    now: DateTime<Utc>,
    window: Duration,
    source: &str,
) -> Result<LoginOutcome, StoreError>
where
    S: AccessStore + ?Sized,
{
    let last = store.last_login(user_id).await?;
    if logged_recently(last, now, window) {
        return Ok(LoginOutcome::SkippedRecent);
    }

    store
        .insert_login(&LoginLogEntry {
            user_id,
            timestamp: now,
            source: source.to_string(),
        })
        .await?;
    Ok(LoginOutcome::Recorded)
}
