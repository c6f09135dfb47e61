//! `studypass-auth`: pure authentication/authorization model.
//!
//! This crate is intentionally decoupled from HTTP and storage: it knows what
//! a session claim looks like, how a subscription turns into a permission id,
//! and how tokens are signed, but never where the data comes from.

pub mod claims;
pub mod permissions;
pub mod secrets;
pub mod subscription;
pub mod token;

pub use claims::{AdminFields, ExamsId, SessionClaims};
pub use permissions::{Feature, PermissionSet};
pub use secrets::{SecretConfig, SecretKey};
pub use subscription::{
    PaymentRecord, PaymentStatus, SubscriptionRecord, SubscriptionVerdict, ValidityRule,
    authoritative, granted_permission,
};
pub use token::{Hs256TokenCodec, TokenEncoder, TokenError, TokenVerifier};
