//! Error taxonomy shared by the use cases and their infrastructure adapters.
//!
//! | Type                | Raised by                          | Fatal to the call? |
//! |---------------------|------------------------------------|--------------------|
//! | [`TransportError`]  | socket bind / send / task failure  | yes, never retried |
//! | `ParseError`        | malformed DDP datagram (ps-core)   | no, datagram skipped |
//! | [`AuthError`]       | token lifecycle, OAuth provider    | yes                |
//! | [`PairingError`]    | pairing collaborator               | yes                |
//! | `CredentialError`   | wrong `auth-type` / no credential  | yes                |
//! | [`StoreError`]      | credential store I/O               | yes                |
//!
//! [`RemoteError`] wraps all of them so a caller driving several use cases can
//! use a single `Result` type.

use std::net::SocketAddr;
use std::path::PathBuf;

use ps_core::{AccountIdError, CredentialError};
use thiserror::Error;

/// Socket-level failures.
#[derive(Debug, Error)]
pub enum TransportError {
    /// A UDP socket could not be bound.
    #[error("failed to bind UDP socket on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// A socket option (e.g. `SO_BROADCAST`) could not be set.
    #[error("failed to set socket option {option}: {source}")]
    SocketOption {
        option: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// A datagram could not be sent.
    #[error("failed to send datagram to {dest}: {source}")]
    Send {
        dest: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Every broadcast send of a discovery scan failed.
    #[error("no search request could be sent to any of {attempted} broadcast address(es): {source}")]
    NoSearchSent {
        attempted: usize,
        #[source]
        source: std::io::Error,
    },

    /// A background socket task panicked or was cancelled.
    #[error("socket task failed: {0}")]
    Task(String),
}

/// Failures of the OAuth session lifecycle.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No session is stored (never logged in, or logged out).
    #[error("authentication required: no stored session, complete the login flow first")]
    AuthenticationRequired,

    /// The redirect URL handed back by the user had no `code` parameter.
    #[error("redirect URL carries no authorization code; copy the full URL from the browser after signing in")]
    MissingAuthorizationCode,

    /// The session exists but no account snapshot was captured.
    #[error("no user info; authenticate first")]
    NoUserInfo,

    /// The provider answered with a non-success status.
    #[error("{operation} rejected by the account provider (status {status:?}): {detail}")]
    Rejected {
        operation: &'static str,
        status: Option<u16>,
        detail: String,
    },

    /// The provider could not be reached.
    #[error("HTTP error during {operation}: {detail}")]
    Http {
        operation: &'static str,
        detail: String,
    },

    /// The provider's answer could not be interpreted.
    #[error("unexpected response from the account provider: {0}")]
    InvalidResponse(String),

    /// The provider's user id could not be converted to an account id.
    #[error("invalid account identifier: {0}")]
    AccountId(#[from] AccountIdError),
}

/// Failures reported by the pairing collaborator.
#[derive(Debug, Error)]
pub enum PairingError {
    /// The console rejected the PIN.
    #[error("the console rejected the PIN; open Settings > System > Remote Play > Link Device on the console and enter the PIN shown there")]
    BadPin,

    /// The console is in rest mode or off.
    #[error("console at {host} is not awake; turn it fully on (not rest mode) and retry")]
    NotAwake { host: String },

    /// The console did not answer at all.
    #[error("console at {host} is unreachable; check that it is on the same network")]
    Unreachable { host: String },

    /// The collaborator produced a credential that cannot wake consoles.
    #[error("pairing returned a credential with auth-type {0:?}; only Remote Play credentials can be stored")]
    NotRemotePlay(String),

    /// Any other pairing failure.
    #[error("pairing failed: {0}")]
    Failed(String),
}

/// Failures of the credential store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A file-system I/O error occurred.
    #[error("I/O error accessing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A record could not be (de)serialized.
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A lock protecting an in-memory store was poisoned.
    #[error("credential store lock poisoned")]
    Poisoned,
}

/// Any failure surfaced by a PS-Remote use case.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Pairing(#[from] PairingError),
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error(transparent)]
    Store(#[from] StoreError),
    /// No console discovered, or no console at the requested address.
    #[error("not found: {0}")]
    NotFound(String),
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pairing_errors_carry_remediation_text() {
        let msg = PairingError::NotAwake {
            host: "192.168.1.50".to_string(),
        }
        .to_string();
        assert!(msg.contains("192.168.1.50"));
        assert!(msg.contains("turn it fully on"));
    }

    #[test]
    fn test_remote_error_wraps_credential_error_transparently() {
        let inner = CredentialError::NotFound {
            host_id: "abc".to_string(),
        };
        let expected = inner.to_string();

        let err: RemoteError = inner.into();

        assert_eq!(err.to_string(), expected);
    }

    #[test]
    fn test_auth_required_message() {
        assert!(AuthError::AuthenticationRequired
            .to_string()
            .starts_with("authentication required"));
    }
}
