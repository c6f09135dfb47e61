//! HTTP API: token refresh endpoint, authentication and error mapping.

pub mod app;
pub mod context;
pub mod middleware;
