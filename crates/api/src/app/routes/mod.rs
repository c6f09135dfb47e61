use std::sync::Arc;

use axum::{Router, routing::post};

use studypass_access::TenantConnector;

use super::AppState;

pub mod system;
pub mod token;

/// Router for all authenticated endpoints.
pub fn router<C>() -> Router<Arc<AppState<C>>>
where
    C: TenantConnector + 'static,
{
    Router::new().route("/token/refresh", post(token::refresh::<C>))
}
