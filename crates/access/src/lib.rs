//! Access resolution for session refresh.
//!
//! Given validated session claims, this crate re-reads the user's identity
//! and subscription from the tenant partition, computes the effective
//! permission set and pendency flags, attaches admin metadata and hands back a
//! re-signed token.
//!
//! Storage is behind [`AccessStore`] / [`TenantConnector`]; the in-memory
//! implementation lives in [`store::in_memory`], the Postgres one in the infra
//! crate.

pub mod admin;
pub mod config;
pub mod login;
pub mod pending_exams;
pub mod permission_loader;
pub mod pipeline;
pub mod store;
pub mod survey;
pub mod usage;

pub use config::{DEFAULT_LOGIN_SOURCE, DEFAULT_REFERRAL_CODE, RefreshConfig};
pub use login::{LoginOutcome, logged_recently, record_login};
pub use pipeline::{RefreshOutcome, ResolvedSession, SessionRefresher};
pub use store::{
    AccessStore, ConnectError, InMemoryAccessStore, InMemoryTenantDirectory, Institution,
    LoginLogEntry, StoreError, SurveyAnswers, TenantConnector, UsageHistory, UserIdentity,
};
