//! Signing-secret selection.
//!
//! Deployments may pin a legacy secret on specific stages while callers
//! migrate; everything else uses the default secret. This is a lookup, never
//! a branch in the pipeline.

use std::collections::HashMap;

/// HMAC secret used to verify and re-sign access tokens.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey(String);

impl SecretKey {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl core::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("SecretKey(***)")
    }
}

/// Default secret plus per-stage overrides.
#[derive(Debug, Clone)]
pub struct SecretConfig {
    default: SecretKey,
    per_stage: HashMap<String, SecretKey>,
}

impl SecretConfig {
    pub fn new(default: SecretKey) -> Self {
        Self {
            default,
            per_stage: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_stage_override(mut self, stage: impl Into<String>, secret: SecretKey) -> Self {
        self.per_stage.insert(stage.into(), secret);
        self
    }

    pub fn secret_for(&self, stage: &str) -> &SecretKey {
        self.per_stage.get(stage).unwrap_or(&self.default)
    }
}
