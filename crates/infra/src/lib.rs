//! Infrastructure layer: Postgres partitions and process configuration.

pub mod config;
pub mod postgres;

pub use config::{AppConfig, ConfigError};
pub use postgres::{PostgresAccessStore, PostgresTenantConnector, connect_pool};
