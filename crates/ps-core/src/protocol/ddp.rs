//! Text codec for the Device Discovery Protocol (DDP).
//!
//! DDP is a tiny HTTP-lookalike protocol carried in single UDP datagrams.
//! Every message is a set of newline-separated lines:
//!
//! ```text
//! SRCH * HTTP/1.1
//! device-discovery-protocol-version:00030010
//! ```
//!
//! The first line names the request; every following line is a `key:value`
//! pair.  Consoles answer a `SRCH` with the same line format:
//!
//! ```text
//! HTTP/1.1 200 Ok
//! host-id:0123456789AB
//! host-name:Living Room
//! host-type:PS5
//! status:AWAKE
//! system-version:07001000
//! ```
//!
//! # Parsing rules
//!
//! - The first `:` on a line separates key from value; both sides are trimmed.
//! - Lines without a `:` (such as the `HTTP/1.1 200 Ok` status line) are ignored.
//! - Only the keys in [`ResponseKey`] are recognised; unknown keys are ignored.
//! - Missing keys fall back to per-field defaults (see [`SearchResponse`]).

use thiserror::Error;

use crate::domain::console::ConsoleStatus;

/// Protocol version advertised in every request.
pub const DDP_VERSION: &str = "00030010";

/// Default `host-name` when a response omits it.
pub const DEFAULT_HOST_NAME: &str = "Unknown Console";

/// Default `host-type` when a response omits it.
pub const DEFAULT_HOST_TYPE: &str = "Unknown";

/// Errors produced while parsing a DDP datagram.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The datagram had no bytes at all.
    #[error("empty datagram")]
    Empty,

    /// The datagram is not valid UTF-8 text.
    #[error("datagram is not valid UTF-8: {0}")]
    InvalidUtf8(String),

    /// The `status` field carried a value other than `AWAKE` or `STANDBY`.
    #[error("unrecognised status value: {0:?}")]
    InvalidStatus(String),
}

/// The response keys this codec understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResponseKey {
    HostId,
    HostName,
    HostType,
    Status,
    SystemVersion,
}

impl ResponseKey {
    fn from_wire(key: &str) -> Option<Self> {
        match key {
            "host-id" => Some(Self::HostId),
            "host-name" => Some(Self::HostName),
            "host-type" => Some(Self::HostType),
            "status" => Some(Self::Status),
            "system-version" => Some(Self::SystemVersion),
            _ => None,
        }
    }
}

/// A parsed reply to a `SRCH` request.
///
/// | Field            | Wire key         | Default             |
/// |------------------|------------------|---------------------|
/// | `host_id`        | `host-id`        | `""`                |
/// | `host_name`      | `host-name`      | `"Unknown Console"` |
/// | `host_type`      | `host-type`      | `"Unknown"`         |
/// | `status`         | `status`         | `None`              |
/// | `system_version` | `system-version` | `""`                |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResponse {
    pub host_id: String,
    pub host_name: String,
    pub host_type: String,
    /// `None` when the console did not report a power state.
    pub status: Option<ConsoleStatus>,
    pub system_version: String,
}

impl Default for SearchResponse {
    fn default() -> Self {
        Self {
            host_id: String::new(),
            host_name: DEFAULT_HOST_NAME.to_string(),
            host_type: DEFAULT_HOST_TYPE.to_string(),
            status: None,
            system_version: String::new(),
        }
    }
}

/// Builds the `SRCH` datagram broadcast during discovery.
///
/// # Examples
///
/// ```rust
/// use ps_core::protocol::build_search_request;
///
/// assert_eq!(
///     build_search_request(),
///     b"SRCH * HTTP/1.1\ndevice-discovery-protocol-version:00030010\n".to_vec()
/// );
/// ```
pub fn build_search_request() -> Vec<u8> {
    format!("SRCH * HTTP/1.1\ndevice-discovery-protocol-version:{DDP_VERSION}\n").into_bytes()
}

/// Builds the `WAKEUP` datagram carrying `user_credential`.
///
/// The header values other than the credential are fixed by the protocol.
pub fn build_wake_request(user_credential: &str) -> Vec<u8> {
    let lines = [
        "WAKEUP * HTTP/1.1".to_string(),
        "client-type:vr".to_string(),
        "auth-type:R".to_string(),
        "model:w".to_string(),
        "app-type:r".to_string(),
        format!("user-credential:{user_credential}"),
        format!("device-discovery-protocol-version:{DDP_VERSION}"),
    ];
    let mut text = lines.join("\n");
    text.push('\n');
    text.into_bytes()
}

/// Parses a console's reply to a `SRCH` request.
///
/// # Errors
///
/// Returns [`ParseError`] when the datagram is empty, not UTF-8, or carries
/// an unknown `status` value.  A reply with no recognised lines at all still
/// parses, with every field at its default.
pub fn parse_search_response(datagram: &[u8]) -> Result<SearchResponse, ParseError> {
    if datagram.is_empty() {
        return Err(ParseError::Empty);
    }
    let text =
        std::str::from_utf8(datagram).map_err(|e| ParseError::InvalidUtf8(e.to_string()))?;

    let mut response = SearchResponse::default();

    for line in text.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();

        match ResponseKey::from_wire(key.trim()) {
            Some(ResponseKey::HostId) => response.host_id = value.to_string(),
            Some(ResponseKey::HostName) => response.host_name = value.to_string(),
            Some(ResponseKey::HostType) => response.host_type = value.to_string(),
            Some(ResponseKey::SystemVersion) => response.system_version = value.to_string(),
            Some(ResponseKey::Status) => {
                let status = value
                    .parse::<ConsoleStatus>()
                    .map_err(|()| ParseError::InvalidStatus(value.to_string()))?;
                response.status = Some(status);
            }
            None => {}
        }
    }

    Ok(response)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
