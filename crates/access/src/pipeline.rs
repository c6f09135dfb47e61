//! Session refresh orchestration.
//!
//! Validated claims go in; a re-signed token plus the survey/exam pendency
//! flags come out. Validation and authorization failures are returned as-is.
//! Everything else that goes wrong while resolving is logged with the acting
//! user and surfaced as an internal error.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use studypass_auth::{ExamsId, Hs256TokenCodec, SecretKey, SessionClaims, TokenEncoder};
use studypass_core::{RefreshError, RefreshResult, TenantId};

use crate::config::RefreshConfig;
use crate::login::{LoginOutcome, record_login};
use crate::store::{AccessStore, TenantConnector, UserIdentity};
use crate::{admin, pending_exams, permission_loader, survey, usage};

/// Successful refresh result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshOutcome {
    pub token: String,
    pub pending_profile_survey: bool,
    pub pending_user_exams: bool,
}

/// Claims after resolution, before signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSession {
    pub claims: SessionClaims,
    pub pending_profile_survey: bool,
    pub pending_user_exams: bool,
}

impl UserIdentity {
    /// Claims rebuilt from the stored identity.
    pub fn into_claims(self) -> SessionClaims {
        SessionClaims {
            full_name: self.full_name,
            email: self.email,
            course: self.course,
            plan_id: self.plan_id,
            exams_id: ExamsId::One(self.exams_id),
            ..SessionClaims::for_user(self.id)
        }
    }
}

pub struct SessionRefresher<C> {
    connector: C,
    config: RefreshConfig,
}

impl<C> SessionRefresher<C>
where
    C: TenantConnector,
{
    pub fn new(connector: C, config: RefreshConfig) -> Self {
        Self { connector, config }
    }

    /// Tenant named by the claims (or the configured default), with the
    /// portal alias applied.
    pub fn resolve_tenant(&self, claims: &SessionClaims) -> RefreshResult<TenantId> {
        let tenant = match claims.tenant_id.as_deref().filter(|t| !t.trim().is_empty()) {
            Some(tenant) => TenantId::parse(tenant)?,
            None => self
                .config
                .default_tenant_for_missing_claim
                .clone()
                .ok_or_else(RefreshError::missing_tenant)?,
        };
        Ok(tenant.normalized())
    }

    /// Run the full pipeline and sign the refreshed claims with `secret`.
    #[instrument(skip_all, fields(user_id = %claims.id))]
    pub async fn refresh(
        &self,
        claims: SessionClaims,
        secret: &SecretKey,
        now: DateTime<Utc>,
    ) -> RefreshResult<RefreshOutcome> {
        let tenant = self.resolve_tenant(&claims)?;
        let actor = claims.actor();

        let store = self.connector.connect(&tenant).await.map_err(|e| {
            let err = RefreshError::from(e);
            report(&actor, &err);
            err
        })?;

        match self.resolve_and_sign(&store, &claims, &tenant, secret, now).await {
            Ok(outcome) => {
                info!(tenant = %tenant, "session refreshed");
                Ok(outcome)
            }
            Err(err) => {
                report(&actor, &err);
                Err(err)
            }
        }
    }

    async fn resolve_and_sign(
        &self,
        store: &C::Store,
        claims: &SessionClaims,
        tenant: &TenantId,
        secret: &SecretKey,
        now: DateTime<Utc>,
    ) -> RefreshResult<RefreshOutcome> {
        let resolved = self.resolve(store, claims, tenant, now).await?;
        let token = Hs256TokenCodec::new(secret)
            .encode(&resolved.claims)
            .map_err(|e| RefreshError::internal(e.to_string()))?;

        Ok(RefreshOutcome {
            token,
            pending_profile_survey: resolved.pending_profile_survey,
            pending_user_exams: resolved.pending_user_exams,
        })
    }

    /// Resolve identity, permissions, pendency and admin fields against an
    /// already connected partition.
    pub async fn resolve<S>(
        &self,
        store: &S,
        claims: &SessionClaims,
        tenant: &TenantId,
        now: DateTime<Utc>,
    ) -> RefreshResult<ResolvedSession>
    where
        S: AccessStore + ?Sized,
    {
        let user_id = claims.id;

        let Some(identity) = store.user_identity(user_id).await? else {
            return Err(RefreshError::invalid_identity());
        };
        let renewed = identity.into_claims();

        match record_login(
            store,
            user_id,
            now,
            self.config.login_dedup_window,
            &self.config.login_source,
        )
        .await
        {
            Ok(LoginOutcome::Recorded) => info!(user_id = %user_id, "login recorded"),
            Ok(LoginOutcome::SkippedRecent) => {}
            Err(e) => warn!(user_id = %user_id, error = %e, "login log write skipped"),
        }

        let permissions = permission_loader::load_permissions(store, user_id, now).await?;
        let permissions = usage::augment_with_usage(store, user_id, permissions).await?;

        let pending_profile_survey = survey::survey_pending(store, user_id, &permissions).await?;
        let pending_user_exams =
            pending_exams::has_pending_user_exams(store, user_id, &permissions).await?;

        let admin_fields = admin::admin_fields(store, user_id).await?;

        let claims = renewed
            .with_tenant(tenant)
            .with_normalized_exams()
            .with_referral_code(self.config.referral_code)
            .with_permissions(permissions)
            .with_admin_fields(admin_fields);

        Ok(ResolvedSession {
            claims,
            pending_profile_survey,
            pending_user_exams,
        })
    }
}

fn report(actor: &str, err: &RefreshError) {
    match err {
        RefreshError::Validation(_) | RefreshError::Authorization(_) => {
            warn!(user = %actor, error = %err, "refresh token attempt rejected");
        }
        RefreshError::Configuration(_) => {
            error!(
                user = %actor,
                error = %err,
                alarm = "configuration",
                "refresh token attempt failed"
            );
        }
        RefreshError::Internal(_) => {
            error!(user = %actor, error = %err, "refresh token attempt failed");
        }
    }
}
