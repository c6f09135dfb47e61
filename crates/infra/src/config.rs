//! Process configuration from environment variables.

use std::net::SocketAddr;

use thiserror::Error;

use studypass_access::RefreshConfig;
use studypass_auth::{SecretConfig, SecretKey};
use studypass_core::TenantId;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_STAGE: &str = "dev";
const DEFAULT_STAGE_LIST: &str = "prod,production";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Everything the API process needs at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    /// Deployment stage name (`dev`, `prod`, ...).
    pub stage: String,
    pub secrets: SecretConfig,
    pub refresh: RefreshConfig,
    pub db_max_connections: u32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = var("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let bind_addr = var("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                key: "BIND_ADDR",
                message: e.to_string(),
            })?;

        let stage = var("APP_STAGE").unwrap_or_else(|| DEFAULT_STAGE.to_string());

        let default_secret =
            var("ACCESS_TOKEN_SECRET").ok_or(ConfigError::Missing("ACCESS_TOKEN_SECRET"))?;
        let mut secrets = SecretConfig::new(SecretKey::new(default_secret));
        if let Some(legacy) = var("LEGACY_ACCESS_TOKEN_SECRET") {
            let stages =
                var("LEGACY_SECRET_STAGES").unwrap_or_else(|| DEFAULT_STAGE_LIST.to_string());
            for legacy_stage in stage_list(&stages) {
                secrets = secrets.with_stage_override(legacy_stage, SecretKey::new(legacy.clone()));
            }
        }

        let mut refresh = RefreshConfig::default();
        let default_tenant_stages =
            var("DEFAULT_TENANT_STAGES").unwrap_or_else(|| DEFAULT_STAGE_LIST.to_string());
        if stage_list(&default_tenant_stages).any(|s| s == stage) {
            let tenant = var("DEFAULT_TENANT")
                .unwrap_or_else(|| TenantId::PORTAL_ALIAS.to_string());
            let tenant = TenantId::parse(tenant).map_err(|e| ConfigError::Invalid {
                key: "DEFAULT_TENANT",
                message: e.to_string(),
            })?;
            refresh = refresh.with_default_tenant(tenant);
        }

        let db_max_connections = match var("DB_MAX_CONNECTIONS") {
            Some(raw) => raw.trim().parse::<u32>().map_err(|e| ConfigError::Invalid {
                key: "DB_MAX_CONNECTIONS",
                message: e.to_string(),
            })?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Self {
            database_url,
            bind_addr,
            stage,
            secrets,
            refresh,
            db_max_connections,
        })
    }

    /// Secret used to verify and re-sign tokens on this stage.
    pub fn signing_secret(&self) -> &SecretKey {
        self.secrets.secret_for(&self.stage)
    }
}

fn stage_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    const BASE: [(&str, &str); 2] = [
        ("DATABASE_URL", "postgres://localhost/studypass"),
        ("ACCESS_TOKEN_SECRET", "current"),
    ];

    #[test]
    fn defaults_apply_for_dev() {
        let cfg = config(&BASE).unwrap();

        assert_eq!(cfg.stage, "dev");
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(cfg.db_max_connections, 5);
        assert_eq!(cfg.signing_secret(), &SecretKey::new("current"));
        assert_eq!(cfg.refresh.default_tenant_for_missing_claim, None);
    }

    #[test]
    fn required_variables_are_reported() {
        assert_eq!(
            config(&[("ACCESS_TOKEN_SECRET", "x")]).unwrap_err(),
            ConfigError::Missing("DATABASE_URL")
        );
        assert_eq!(
            config(&[("DATABASE_URL", "postgres://x")]).unwrap_err(),
            ConfigError::Missing("ACCESS_TOKEN_SECRET")
        );
    }

    #[test]
    fn production_stage_gets_legacy_secret_and_default_tenant() {
        let mut vars = BASE.to_vec();
        vars.push(("APP_STAGE", "production"));
        vars.push(("LEGACY_ACCESS_TOKEN_SECRET", "legacy"));
        let cfg = config(&vars).unwrap();

        assert_eq!(cfg.signing_secret(), &SecretKey::new("legacy"));
        assert_eq!(
            cfg.refresh.default_tenant_for_missing_claim,
            Some(TenantId::parse("portal").unwrap())
        );
    }

    #[test]
    fn legacy_secret_only_applies_to_listed_stages() {
        let mut vars = BASE.to_vec();
        vars.push(("APP_STAGE", "staging"));
        vars.push(("LEGACY_ACCESS_TOKEN_SECRET", "legacy"));
        let cfg = config(&vars).unwrap();

        assert_eq!(cfg.signing_secret(), &SecretKey::new("current"));
    }

    #[test]
    fn stage_lists_are_configurable() {
        let mut vars = BASE.to_vec();
        vars.push(("APP_STAGE", "staging"));
        vars.push(("DEFAULT_TENANT_STAGES", " staging , qa "));
        vars.push(("DEFAULT_TENANT", "acme"));
        let cfg = config(&vars).unwrap();

        assert_eq!(
            cfg.refresh.default_tenant_for_missing_claim,
            Some(TenantId::parse("acme").unwrap())
        );
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let mut vars = BASE.to_vec();
        vars.push(("DB_MAX_CONNECTIONS", "lots"));
        assert!(matches!(
            config(&vars),
            Err(ConfigError::Invalid { key: "DB_MAX_CONNECTIONS", .. })
        ));
    }
}
