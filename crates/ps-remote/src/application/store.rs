//! Credential store port.
//!
//! The use cases persist two kinds of record through this trait: the single
//! current-session [`TokenData`], and one [`Credential`] per console keyed by
//! the console's `host-id`.  Implementations live in
//! `infrastructure::storage::credential_store`.
//!
//! The store is single-writer-at-a-time.  Callers never assume an atomic
//! read-modify-write across calls: every use case re-reads before it decides
//! anything.

use ps_core::{Credential, TokenData};

use super::error::StoreError;

/// Durable key-value persistence of session and pairing data.
pub trait CredentialStore: Send + Sync {
    /// Loads the current session, or `None` if none was ever saved.
    fn load_session(&self) -> Result<Option<TokenData>, StoreError>;

    /// Replaces the current session.
    fn save_session(&self, session: &TokenData) -> Result<(), StoreError>;

    /// Loads the credential stored for `host_id`.
    fn load_credential(&self, host_id: &str) -> Result<Option<Credential>, StoreError>;

    /// Stores (or replaces) the credential for `host_id`.
    fn save_credential(&self, host_id: &str, credential: &Credential) -> Result<(), StoreError>;

    /// Lists every stored `(host_id, credential)` pair, sorted by host id.
    fn list_credentials(&self) -> Result<Vec<(String, Credential)>, StoreError>;
}
