//! UDP wake dispatcher.
//!
//! Sends the DDP `WAKEUP` datagram that brings a console out of rest mode.
//! Some firmware only honours wake requests whose source port is 16690, so the
//! dispatcher binds that port explicitly instead of an ephemeral one.
//!
//! The protocol has no acknowledgement.  A successful [`WakeDispatcher::wake`]
//! means the datagram reached the local network stack, nothing more; callers
//! that need confirmation should follow up with a status query.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use ps_core::{build_wake_request, PS5_DISCOVERY_PORT};
use tokio::net::UdpSocket;
use tracing::debug;

use crate::application::error::TransportError;
use crate::application::wake_console::WakeTransport;

/// Source port consoles expect wake requests to come from.
pub const DEFAULT_WAKE_SOURCE_PORT: u16 = 16690;

/// Destination port used when the caller does not name one.
pub const DEFAULT_WAKE_PORT: u16 = PS5_DISCOVERY_PORT;

/// How long the socket stays open after the send.
pub const DEFAULT_WAKE_GRACE: Duration = Duration::from_millis(2);

/// Sends one wake datagram per call from a fixed source port.
#[derive(Debug, Clone)]
pub struct WakeDispatcher {
    source_port: u16,
    grace: Duration,
}

impl Default for WakeDispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_WAKE_SOURCE_PORT, DEFAULT_WAKE_GRACE)
    }
}

impl WakeDispatcher {
    /// `source_port` 0 lets the OS pick a port; tests use it to run in parallel.
    pub fn new(source_port: u16, grace: Duration) -> Self {
        Self { source_port, grace }
    }

    /// Sends a wake request carrying `user_credential` to `host:port`.
    ///
    /// Resolves only after the grace period, once the socket has been closed.
    /// No retry is attempted.
    ///
    /// # Errors
    ///
    /// [`TransportError::Bind`] if the source port is unavailable (for example
    /// while another wake is in flight), [`TransportError::Send`] if the send fails.
    pub async fn wake(&self, host: IpAddr, port: u16, user_credential: &str) -> Result<(), TransportError> {
        let local = SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.source_port));
        let socket = UdpSocket::bind(local)
            .await
            .map_err(|source| TransportError::Bind { addr: local, source })?;

        let dest = SocketAddr::new(host, port);
        if is_limited_broadcast(host) {
            socket
                .set_broadcast(true)
                .map_err(|source| TransportError::SocketOption {
                    option: "SO_BROADCAST",
                    source,
                })?;
        }

        let datagram = build_wake_request(user_credential);
        let sent = socket
            .send_to(&datagram, dest)
            .await
            .map_err(|source| TransportError::Send { dest, source })?;
        debug!("wake datagram ({sent} bytes) sent to {dest}");

        // Give the OS a moment to flush before the socket is dropped.
        tokio::time::sleep(self.grace).await;
        drop(socket);
        Ok(())
    }
}

/// `SO_BROADCAST` is required only for the IPv4 limited broadcast address.
fn is_limited_broadcast(host: IpAddr) -> bool {
    matches!(host, IpAddr::V4(v4) if v4.is_broadcast())
}

#[async_trait]
impl WakeTransport for WakeDispatcher {
    async fn send_wake(&self, host: IpAddr, port: u16, user_credential: &str) -> Result<(), TransportError> {
        self.wake(host, port, user_credential).await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
