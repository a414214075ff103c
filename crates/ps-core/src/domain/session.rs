//! OAuth session state and account identifiers.
//!
//! # Account identifiers
//!
//! The account provider identifies a user by a decimal numeric `user_id`.
//! Pairing and wake-credential ownership use a different encoding of the same
//! number: the `user_id` as an unsigned 64-bit little-endian integer, with the
//! 8 raw bytes represented as standard base64.
//!
//! ```rust
//! use ps_core::{decode_account_id, encode_account_id};
//!
//! let account_id = encode_account_id("1").unwrap();
//! assert_eq!(account_id, "AQAAAAAAAAA=");
//! assert_eq!(decode_account_id(&account_id).unwrap(), 1);
//! ```

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors converting between a numeric user id and its base64 account id.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccountIdError {
    /// The user id is not a decimal integer that fits in 64 bits.
    #[error("user id {0:?} is not an unsigned 64-bit decimal number")]
    InvalidUserId(String),

    /// The account id is not base64.
    #[error("account id is not valid base64: {0}")]
    InvalidBase64(String),

    /// The account id decoded to something other than 8 bytes.
    #[error("account id must decode to 8 bytes, got {0}")]
    WrongLength(usize),
}

/// Encodes a decimal user id as a base64 account id.
///
/// # Errors
///
/// Returns [`AccountIdError::InvalidUserId`] when `user_id` is not a `u64`.
pub fn encode_account_id(user_id: &str) -> Result<String, AccountIdError> {
    let id: u64 = user_id
        .trim()
        .parse()
        .map_err(|_| AccountIdError::InvalidUserId(user_id.to_string()))?;
    Ok(STANDARD.encode(id.to_le_bytes()))
}

/// Decodes a base64 account id back to the numeric user id.
///
/// # Errors
///
/// Returns [`AccountIdError`] when the input is not base64 or not 8 bytes long.
pub fn decode_account_id(account_id: &str) -> Result<u64, AccountIdError> {
    let bytes = STANDARD
        .decode(account_id.trim())
        .map_err(|e| AccountIdError::InvalidBase64(e.to_string()))?;
    let raw: [u8; 8] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| AccountIdError::WrongLength(bytes.len()))?;
    Ok(u64::from_le_bytes(raw))
}

/// Snapshot of the authenticated account, taken on login and on each refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub online_id: String,
    /// Base64 account id (see [`encode_account_id`]).
    pub account_id: String,
    /// Decimal user id as reported by the provider.
    pub user_id: String,
    #[serde(default)]
    pub about_me: String,
    #[serde(default)]
    pub languages: Vec<String>,
}

/// OAuth session state.
///
/// `expiry` must be checked before every use of `access_token`; see
/// [`TokenData::is_valid_at`].  A logged-out session is persisted as
/// [`TokenData::empty`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenData {
    pub access_token: String,
    pub refresh_token: String,
    pub expiry: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_info: Option<UserInfo>,
}

impl TokenData {
    /// The all-empty record written on logout.
    pub fn empty() -> Self {
        Self {
            access_token: String::new(),
            refresh_token: String::new(),
            expiry: DateTime::<Utc>::UNIX_EPOCH,
            user_info: None,
        }
    }

    /// Returns `true` when this record holds no session at all.
    pub fn is_empty(&self) -> bool {
        self.access_token.is_empty() && self.refresh_token.is_empty()
    }

    /// Returns `true` when `expiry` is at or before `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry <= now
    }

    /// Returns `true` when the access token may be used at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.access_token.is_empty() && !self.is_expired_at(now)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
