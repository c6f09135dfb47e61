//! HS256 access-token codec.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::{SecretKey, SessionClaims};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("invalid token: {0}")]
    Invalid(String),

    #[error("token has expired")]
    Expired,

    #[error("token encoding failed: {0}")]
    Encoding(String),
}

/// Verifies an inbound token and yields its claims.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<SessionClaims, TokenError>;
}

/// Signs claims into a token.
pub trait TokenEncoder: Send + Sync {
    fn encode(&self, claims: &SessionClaims) -> Result<String, TokenError>;
}

/// HMAC-SHA256 codec bound to one secret.
///
/// Tokens are not required to carry `exp`; when present it is enforced.
pub struct Hs256TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl Hs256TokenCodec {
    pub fn new(secret: &SecretKey) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_aud = false;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

impl TokenVerifier for Hs256TokenCodec {
    fn verify(&self, token: &str) -> Result<SessionClaims, TokenError> {
        jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })
    }
}

impl TokenEncoder for Hs256TokenCodec {
    fn encode(&self, claims: &SessionClaims) -> Result<String, TokenError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use studypass_core::UserId;

    #[test]
    fn signed_claims_verify_with_the_same_secret() {
        let codec = Hs256TokenCodec::new(&SecretKey::new("s3cret"));
        let mut claims = SessionClaims::for_user(UserId::new(7));
        claims.tenant_id = Some("public".to_string());

        let token = codec.encode(&claims).unwrap();
        assert_eq!(codec.verify(&token).unwrap(), claims);
    }

    #[test]
    fn token_signed_with_another_secret_is_rejected() {
        let signer = Hs256TokenCodec::new(&SecretKey::new("one"));
        let verifier = Hs256TokenCodec::new(&SecretKey::new("two"));

        let token = signer.encode(&SessionClaims::for_user(UserId::new(1))).unwrap();
        assert!(matches!(verifier.verify(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn token_with_null_permission_flags_still_verifies() {
        let secret = SecretKey::new("s3cret");
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &json!({
                "id": 7,
                "tenant_id": "public",
                "full_name": "Ana Souza",
                "permissions": { "availability": true, "performance": null },
                "exams_id": [3],
                "referral_code": 944_234_761_407u64
            }),
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap();

        let claims = Hs256TokenCodec::new(&secret).verify(&token).unwrap();
        assert_eq!(claims.id, UserId::new(7));
        assert_eq!(claims.tenant_id.as_deref(), Some("public"));
        assert_eq!(claims.permissions, None);
        assert_eq!(claims.exams_id, crate::ExamsId::Many(vec![Some(3)]));
    }

    #[test]
    fn garbage_is_rejected() {
        let codec = Hs256TokenCodec::new(&SecretKey::new("s3cret"));
        assert!(codec.verify("not-a-token").is_err());
    }
}
