//! Error taxonomy surfaced by the session refresh pipeline.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Result type used across the refresh pipeline.
pub type RefreshResult<T> = Result<T, RefreshError>;

/// Message rendered for every failure that must not leak internals.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Pipeline-level error.
///
/// Validation and authorization failures are user-visible and carry their
/// message verbatim. Configuration and internal failures keep their detail for
/// logs only; `to_body()` replaces it with [`INTERNAL_ERROR_MESSAGE`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RefreshError {
    /// Required input is missing or malformed (e.g. no tenant).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Unknown tenant partition or unknown user.
    #[error("unauthorized: {0}")]
    Authorization(String),

    /// Platform data that must exist does not (institution row, permission row).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Any other unexpected failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RefreshError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn authorization(msg: impl Into<String>) -> Self {
        Self::Authorization(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn missing_tenant() -> Self {
        Self::Validation("Missing tenant_id".to_string())
    }

    pub fn invalid_schema(tenant: impl core::fmt::Display) -> Self {
        Self::authorization(format!("Invalid schema: {tenant}"))
    }

    pub fn invalid_identity() -> Self {
        Self::authorization("Invalid username or password")
    }

    /// HTTP-style status for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Authorization(_) => 401,
            Self::Configuration(_) | Self::Internal(_) => 500,
        }
    }

    /// Structured error returned to the caller.
    pub fn to_body(&self) -> ErrorBody {
        let message = match self {
            Self::Validation(msg) | Self::Authorization(msg) => msg.clone(),
            Self::Configuration(_) | Self::Internal(_) => INTERNAL_ERROR_MESSAGE.to_string(),
        };
        ErrorBody::new(self.status_code(), message)
    }
}

/// `{ status_code, message, ...extra }` error payload.
///
/// `status_code` travels as the transport status; only `message` and the
/// extra fields are serialized into the body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    #[serde(skip)]
    pub status_code: u16,
    pub message: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ErrorBody {
    pub fn new(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
            extra: Map::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(RefreshError::missing_tenant().status_code(), 400);
        assert_eq!(RefreshError::invalid_schema("acme").status_code(), 401);
        assert_eq!(RefreshError::invalid_identity().status_code(), 401);
        assert_eq!(RefreshError::configuration("no institution").status_code(), 500);
        assert_eq!(RefreshError::internal("boom").status_code(), 500);
    }

    #[test]
    fn internal_detail_is_not_rendered() {
        let body = RefreshError::internal("connection reset by peer").to_body();
        assert_eq!(body.message, INTERNAL_ERROR_MESSAGE);

        let body = RefreshError::configuration("2 institution rows").to_body();
        assert_eq!(body.message, INTERNAL_ERROR_MESSAGE);
    }

    #[test]
    fn body_serializes_message_and_extra_fields() {
        let body = RefreshError::invalid_schema("acme")
            .to_body()
            .with_field("tenant_id", "acme");
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["message"], "Invalid schema: acme");
        assert_eq!(json["tenant_id"], "acme");
        assert!(json.get("status_code").is_none());
    }
}
