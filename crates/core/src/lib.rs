//! `studypass-core`: identifiers and the error taxonomy shared by every crate.
//!
//! This crate contains no IO and no policy.

pub mod error;
pub mod id;

pub use error::{ErrorBody, RefreshError, RefreshResult, INTERNAL_ERROR_MESSAGE};
pub use id::{PermissionId, PlanId, TenantId, UserId};
