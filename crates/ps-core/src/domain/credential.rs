//! Wake credential produced by pairing a console.
//!
//! A [`Credential`] is created once per console by the pairing exchange and
//! stored keyed by the console's `host-id`.  Its `user_credential` is the
//! opaque secret placed in every `WAKEUP` datagram.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// `auth-type` marker of a Remote Play credential, the only kind that can wake.
pub const REMOTE_PLAY_AUTH_TYPE: &str = "R";

/// Errors raised when a stored credential cannot be used to wake a console.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialError {
    /// The credential exists but is not a Remote Play credential.
    #[error(
        "credential for host {host_id} has auth-type {actual:?}, expected \"R\"; \
         pair the console again to obtain a Remote Play credential"
    )]
    WrongAuthType { host_id: String, actual: String },

    /// No credential has been stored for the console.
    #[error("no stored credential for host {host_id}; pair the console first")]
    NotFound { host_id: String },
}

/// A wake credential bound to one console and one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Credential {
    pub app_type: String,
    pub auth_type: String,
    pub client_type: String,
    pub model: String,
    /// The secret sent as `user-credential` in wake datagrams.
    pub user_credential: String,
    /// Base64 account identifier of the owning account.
    pub account_id: String,
    /// Raw key/value pairs returned by the registration exchange.
    #[serde(default)]
    pub registration: BTreeMap<String, String>,
}

impl Credential {
    /// Builds a Remote Play credential with the fixed protocol fields.
    pub fn remote_play(user_credential: impl Into<String>, account_id: impl Into<String>) -> Self {
        Self {
            app_type: "r".to_string(),
            auth_type: REMOTE_PLAY_AUTH_TYPE.to_string(),
            client_type: "vr".to_string(),
            model: "w".to_string(),
            user_credential: user_credential.into(),
            account_id: account_id.into(),
            registration: BTreeMap::new(),
        }
    }

    /// Returns `true` when this credential may be used to wake a console.
    pub fn is_remote_play(&self) -> bool {
        self.auth_type == REMOTE_PLAY_AUTH_TYPE
    }

    /// Returns the wake secret, or an error if this is not a Remote Play credential.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::WrongAuthType`] when `auth_type` is not `"R"`.
    pub fn wake_secret(&self, host_id: &str) -> Result<&str, CredentialError> {
        if !self.is_remote_play() {
            return Err(CredentialError::WrongAuthType {
                host_id: host_id.to_string(),
                actual: self.auth_type.clone(),
            });
        }
        Ok(&self.user_credential)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
