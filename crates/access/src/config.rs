//! Pipeline configuration.

use chrono::Duration;

use studypass_core::TenantId;

/// Referral code stamped on every refreshed token.
pub const DEFAULT_REFERRAL_CODE: u64 = 944_234_761_407;

/// Source recorded for logins observed through token refresh.
pub const DEFAULT_LOGIN_SOURCE: &str = "access_token";

/// Knobs of the session refresh pipeline for one deployment stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshConfig {
    /// Tenant assumed when a token carries none. `None` makes a missing
    /// tenant a validation error.
    pub default_tenant_for_missing_claim: Option<TenantId>,
    pub referral_code: u64,
    /// Logins closer together than this are recorded once.
    pub login_dedup_window: Duration,
    pub login_source: String,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            default_tenant_for_missing_claim: None,
            referral_code: DEFAULT_REFERRAL_CODE,
            login_dedup_window: Duration::hours(1),
            login_source: DEFAULT_LOGIN_SOURCE.to_string(),
        }
    }
}

impl RefreshConfig {
    #[must_use]
    pub fn with_default_tenant(mut self, tenant: TenantId) -> Self {
        self.default_tenant_for_missing_claim = Some(tenant);
        self
    }
}
