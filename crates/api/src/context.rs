use studypass_auth::SessionClaims;

/// Authenticated session for a request.
///
/// Inserted by the auth middleware; handlers behind it can rely on it being
/// present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    claims: SessionClaims,
}

impl SessionContext {
    pub fn new(claims: SessionClaims) -> Self {
        Self { claims }
    }

    pub fn into_claims(self) -> SessionClaims {
        self.claims
    }
}
