use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use studypass_auth::TokenVerifier;

use crate::app::errors::json_error;
use crate::context::SessionContext;

const UNAUTHORIZED: &str = "Unauthorized";

#[derive(Clone)]
pub struct AuthState {
    pub verifier: Arc<dyn TokenVerifier>,
}

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let token = extract_token(req.headers()).ok_or_else(unauthorized)?;

    let claims = state.verifier.verify(token).map_err(|e| {
        debug!(error = %e, "token rejected");
        unauthorized()
    })?;

    req.extensions_mut().insert(SessionContext::new(claims));

    Ok(next.run(req).await)
}

/// Token from `Authorization`, with or without the `Bearer ` prefix.
fn extract_token(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?;
    let header = header.to_str().ok()?;

    let token = header.strip_prefix("Bearer ").unwrap_or(header).trim();
    if token.is_empty() {
        return None;
    }

    Some(token)
}

fn unauthorized() -> Response {
    json_error(StatusCode::UNAUTHORIZED, UNAUTHORIZED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_str(value).unwrap(),
        );
        headers
    }

    #[test]
    fn bearer_prefix_is_optional() {
        assert_eq!(extract_token(&headers("Bearer abc.def.ghi")), Some("abc.def.ghi"));
        assert_eq!(extract_token(&headers("abc.def.ghi")), Some("abc.def.ghi"));
    }

    #[test]
    fn missing_or_blank_header_yields_nothing() {
        assert_eq!(extract_token(&HeaderMap::new()), None);
        assert_eq!(extract_token(&headers("Bearer ")), None);
        assert_eq!(extract_token(&headers("   ")), None);
    }
}
