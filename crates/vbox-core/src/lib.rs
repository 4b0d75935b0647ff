// Library root: configuration, durable state, credentials, and the wire
// models shared by the API client and the poller.

pub mod config;
pub mod credentials;
pub mod db;
pub mod models;

pub use config::{Config, ConfigError};
pub use credentials::CredentialStore;
pub use db::Database;
