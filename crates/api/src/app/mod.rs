//! HTTP application wiring (Axum router + shared state).
//!
//! - `routes/`: handlers, one file per area
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Router, routing::get};
use tower::ServiceBuilder;

use studypass_access::{SessionRefresher, TenantConnector};
use studypass_auth::{Hs256TokenCodec, SecretKey};

use crate::middleware;

pub mod errors;
pub mod routes;

/// State shared by every handler.
pub struct AppState<C> {
    pub refresher: SessionRefresher<C>,
    /// Secret used both to verify inbound tokens and to sign refreshed ones.
    pub secret: SecretKey,
}

/// Build the full HTTP router (public entrypoint used by `main.rs` and tests).
pub fn build_app<C>(refresher: SessionRefresher<C>, secret: SecretKey) -> Router
where
    C: TenantConnector + 'static,
{
    let verifier = Arc::new(Hs256TokenCodec::new(&secret));
    let auth_state = middleware::AuthState { verifier };

    let state = Arc::new(AppState { refresher, secret });

    // Protected routes: require a valid session token.
    let protected = routes::router::<C>()
        .route_layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
        .layer(ServiceBuilder::new())
}
