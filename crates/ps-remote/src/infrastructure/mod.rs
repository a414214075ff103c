//! Infrastructure layer: adapters for the application ports.
//!
//! - `network` – DDP discovery, liveness probe, and wake over UDP.
//! - `oauth` – the PlayStation Network account provider over HTTP.
//! - `pairing` – the external pairing program.
//! - `storage` – TOML configuration and the credential store files.
//!
//! **Dependency rule**: this layer may depend on `application` and `ps_core`,
//! but MUST NOT be imported by non-test code in `application` or `ps_core`.
//! Application unit tests borrow the in-memory credential store.

pub mod network;
pub mod oauth;
pub mod pairing;
pub mod storage;
