//! Network-level liveness probe used when a console omits `status`.
//!
//! Some firmware replies to `SRCH` without a `status` line.  For those
//! replies discovery asks a [`LivenessProbe`] whether the source address
//! answers an ICMP echo: reachable means AWAKE, anything else STANDBY.
//!
//! The heuristic can report a console as AWAKE when something else on the
//! same address answers pings.  It is kept because the replies give nothing
//! better to go on.

use std::net::IpAddr;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

/// Default time to wait for an echo reply.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Decides whether a host is reachable.
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    /// Returns `true` if `ip` answered; errors count as unreachable.
    async fn is_reachable(&self, ip: IpAddr) -> bool;
}

/// Probe that runs the system `ping` utility once.
///
/// Raw ICMP sockets need elevated privileges on most systems; the setuid
/// `ping` binary does not.
#[derive(Debug, Clone)]
pub struct PingProbe {
    timeout: Duration,
}

impl Default for PingProbe {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_TIMEOUT)
    }
}

impl PingProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn command(&self, ip: IpAddr) -> Command {
        let mut cmd = Command::new("ping");

        #[cfg(target_os = "windows")]
        cmd.args(["-n", "1", "-w", &self.timeout.as_millis().to_string()]);

        #[cfg(target_os = "macos")]
        cmd.args(["-c", "1", "-t", &whole_seconds(self.timeout)]);

        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        cmd.args(["-c", "1", "-W", &whole_seconds(self.timeout)]);

        cmd.arg(ip.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

/// `ping` takes whole seconds on Unix; never pass zero.
#[cfg(not(target_os = "windows"))]
fn whole_seconds(timeout: Duration) -> String {
    timeout.as_secs().max(1).to_string()
}

#[async_trait]
impl LivenessProbe for PingProbe {
    async fn is_reachable(&self, ip: IpAddr) -> bool {
        // The utility enforces its own timeout; this outer bound covers a hung spawn.
        let outer = self.timeout + Duration::from_millis(500);
        let mut cmd = self.command(ip);
        match tokio::time::timeout(outer, cmd.status()).await {
            Ok(Ok(status)) => {
                debug!("ping {ip}: {status}");
                status.success()
            }
            Ok(Err(e)) => {
                debug!("ping {ip} could not run: {e}");
                false
            }
            Err(_) => {
                debug!("ping {ip} timed out");
                false
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
