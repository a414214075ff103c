//! Storage infrastructure: configuration and credential persistence.
//!
//! - `config` reads the TOML configuration file from the platform config
//!   directory and supplies defaults on first run.
//! - `credential_store` implements the application's `CredentialStore` port
//!   with owner-only JSON files, plus an in-memory variant.

pub mod config;
pub mod credential_store;
