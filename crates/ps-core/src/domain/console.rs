//! Console entity produced by a discovery scan.

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::protocol::ddp::SearchResponse;

/// DDP port used by PS5 (and current PS4 firmware).
pub const PS5_DISCOVERY_PORT: u16 = 9302;

/// DDP port used by legacy PS4 firmware.
pub const PS4_DISCOVERY_PORT: u16 = 987;

/// Power state reported by (or inferred for) a console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConsoleStatus {
    /// Fully powered on.
    Awake,
    /// Rest mode; can be woken remotely.
    Standby,
}

impl FromStr for ConsoleStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("AWAKE") {
            Ok(Self::Awake)
        } else if s.eq_ignore_ascii_case("STANDBY") {
            Ok(Self::Standby)
        } else {
            Err(())
        }
    }
}

impl fmt::Display for ConsoleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Awake => f.pad("AWAKE"),
            Self::Standby => f.pad("STANDBY"),
        }
    }
}

/// Console generation, which selects the DDP port to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConsoleKind {
    #[default]
    Ps5,
    Ps4,
}

impl ConsoleKind {
    /// The UDP port this console generation listens on for DDP.
    pub fn discovery_port(self) -> u16 {
        match self {
            Self::Ps5 => PS5_DISCOVERY_PORT,
            Self::Ps4 => PS4_DISCOVERY_PORT,
        }
    }
}

/// A console discovered on the local network.
///
/// Consoles are rebuilt by every scan and never persisted.  Two consoles are
/// considered the same device when they share a non-empty `host_id` or an
/// `ip_address` (see [`Console::is_same_device`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Console {
    pub host_id: String,
    pub host_name: String,
    pub host_type: String,
    pub status: ConsoleStatus,
    pub system_version: String,
    pub ip_address: IpAddr,
    pub port: u16,
}

impl Console {
    /// Builds a console from a parsed response and the datagram's source.
    ///
    /// `status` is passed separately because a response may omit it, in
    /// which case the caller resolves it out of band.
    pub fn from_response(response: SearchResponse, source: SocketAddr, status: ConsoleStatus) -> Self {
        Self {
            host_id: response.host_id,
            host_name: response.host_name,
            host_type: response.host_type,
            status,
            system_version: response.system_version,
            ip_address: source.ip(),
            port: source.port(),
        }
    }

    /// Returns `true` when `host_id` (if non-empty) or `ip` identifies this console.
    pub fn is_same_device(&self, host_id: &str, ip: IpAddr) -> bool {
        (!host_id.is_empty() && self.host_id == host_id) || self.ip_address == ip
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
