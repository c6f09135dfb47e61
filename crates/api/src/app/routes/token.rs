use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, State},
    response::{IntoResponse, Response},
};
use chrono::Utc;

use studypass_access::TenantConnector;

use crate::app::AppState;
use crate::app::errors::refresh_error_to_response;
use crate::context::SessionContext;

/// `POST /token/refresh`: re-resolve the caller's access and issue a new token.
pub async fn refresh<C>(
    State(state): State<Arc<AppState<C>>>,
    Extension(session): Extension<SessionContext>,
) -> Response
where
    C: TenantConnector + 'static,
{
    match state
        .refresher
        .refresh(session.into_claims(), &state.secret, Utc::now())
        .await
    {
        Ok(outcome) => Json(outcome).into_response(),
        Err(err) => refresh_error_to_response(&err),
    }
}
