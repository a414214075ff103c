//! UDP broadcast-based console discovery.
//!
//! A scan opens one UDP socket on an ephemeral port, broadcasts the DDP `SRCH`
//! datagram, and collects the replies until the timeout elapses.
//!
//! # How a scan runs
//!
//! Two tasks share the socket and the deadline:
//!
//! ```text
//!  sender task                          receive loop (this task)
//!  ───────────                          ────────────────────────
//!  send SRCH → 192.168.1.255:9302       recv reply → parse → dedup
//!  sleep 100 ms                         recv reply → parse → dedup → probe?
//!  send SRCH → 255.255.255.255:9302     …
//!  done                                 deadline → return consoles
//! ```
//!
//! - Sends are staggered by `send_interval` so a burst of broadcasts does not
//!   congest the local network.  The receive loop starts immediately and does
//!   not wait for the sender.
//! - When the deadline passes the sender is aborted, outstanding probes are
//!   dropped, and the socket is closed, so a scan never runs past its timeout.
//! - A reply without a `status` line gets a liveness probe that runs
//!   concurrently; a probe that has not answered by the deadline counts as
//!   STANDBY.
//!
//! # Deduplication
//!
//! A console answers once per broadcast it hears, and a host with several
//! interfaces hears several.  A reply is dropped when an earlier one shares its
//! non-empty `host-id` or its source IP.  First seen wins, and results keep
//! the order replies arrived in.
//!
//! # Errors
//!
//! Only socket failures end a scan early: failing to bind, failing to enable
//! broadcast, or failing to send to *every* target.  A malformed reply is
//! logged at `debug` and skipped.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use ps_core::{parse_search_response, Console, ConsoleKind, ConsoleStatus, ParseError};
use tokio::net::UdpSocket;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::interfaces::local_broadcast_addresses;
use super::liveness::LivenessProbe;
use crate::application::error::TransportError;

/// Default scan duration.
pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(3);

/// Default delay between consecutive broadcast sends.
pub const DEFAULT_SEND_INTERVAL: Duration = Duration::from_millis(100);

/// Largest reply we expect; DDP replies are a few hundred bytes.
const RECV_BUFFER_SIZE: usize = 2048;

/// Where a scan sends its search requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchTargets {
    /// Directed broadcast of every local subnet plus `255.255.255.255`.
    LocalBroadcast,
    /// An explicit list of addresses (unicast or broadcast).
    Fixed(Vec<Ipv4Addr>),
}

impl SearchTargets {
    fn resolve(&self) -> Vec<Ipv4Addr> {
        match self {
            Self::LocalBroadcast => local_broadcast_addresses(),
            Self::Fixed(list) => list.clone(),
        }
    }
}

/// Parameters of one discovery scan.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// DDP port the consoles listen on.
    pub port: u16,
    /// Hard wall-clock bound of the scan.
    pub timeout: Duration,
    /// Delay between consecutive search sends.
    pub send_interval: Duration,
    pub targets: SearchTargets,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self::for_kind(ConsoleKind::Ps5)
    }
}

impl DiscoveryConfig {
    /// Default scan of the local network for `kind` consoles.
    pub fn for_kind(kind: ConsoleKind) -> Self {
        Self {
            port: kind.discovery_port(),
            timeout: DEFAULT_DISCOVERY_TIMEOUT,
            send_interval: DEFAULT_SEND_INTERVAL,
            targets: SearchTargets::LocalBroadcast,
        }
    }
}

// ── Reply accumulation ────────────────────────────────────────────────────────

/// Outcome of feeding one datagram to a [`ScanAccumulator`].
#[derive(Debug, PartialEq, Eq)]
pub enum Accepted {
    /// A new console was recorded at `index`.
    Added { index: usize, needs_probe: bool },
    /// The reply came from a console already recorded.
    Duplicate,
    /// The datagram could not be parsed.
    Malformed(ParseError),
}

/// Collects the replies of one scan, in arrival order, without duplicates.
///
/// A console whose reply carried no `status` is held as STANDBY until a probe
/// resolves it.
#[derive(Debug, Default)]
pub struct ScanAccumulator {
    consoles: Vec<Console>,
}

impl ScanAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `datagram` from `source` and records it unless it is a duplicate.
    pub fn accept(&mut self, datagram: &[u8], source: SocketAddr) -> Accepted {
        let response = match parse_search_response(datagram) {
            Ok(r) => r,
            Err(e) => return Accepted::Malformed(e),
        };

        if self
            .consoles
            .iter()
            .any(|known| known.is_same_device(&response.host_id, source.ip()))
        {
            return Accepted::Duplicate;
        }

        let needs_probe = response.status.is_none();
        let status = response.status.unwrap_or(ConsoleStatus::Standby);
        self.consoles.push(Console::from_response(response, source, status));
        Accepted::Added {
            index: self.consoles.len() - 1,
            needs_probe,
        }
    }

    /// Records the probed power state of the console at `index`.
    pub fn resolve(&mut self, index: usize, status: ConsoleStatus) {
        if let Some(console) = self.consoles.get_mut(index) {
            console.status = status;
        }
    }

    pub fn len(&self) -> usize {
        self.consoles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.consoles.is_empty()
    }

    /// Returns the consoles; any never resolved stay STANDBY.
    pub fn finish(self) -> Vec<Console> {
        self.consoles
    }
}

fn status_from_probe(reachable: bool) -> ConsoleStatus {
    if reachable {
        ConsoleStatus::Awake
    } else {
        ConsoleStatus::Standby
    }
}

// ── Discovery engine ──────────────────────────────────────────────────────────

/// Finds consoles on the local network.
pub struct DiscoveryEngine {
    probe: Arc<dyn LivenessProbe>,
}

impl DiscoveryEngine {
    /// Creates an engine that resolves missing `status` lines with `probe`.
    pub fn new(probe: Arc<dyn LivenessProbe>) -> Self {
        Self { probe }
    }

    /// Runs one scan and returns the consoles that replied, in arrival order.
    ///
    /// Returns an empty list when nothing replies before `config.timeout`.
    ///
    /// # Errors
    ///
    /// - [`TransportError::Bind`] / [`TransportError::SocketOption`] if the
    ///   socket cannot be prepared.
    /// - [`TransportError::NoSearchSent`] if every send failed.
    pub async fn discover(&self, config: &DiscoveryConfig) -> Result<Vec<Console>, TransportError> {
        let deadline = Instant::now() + config.timeout;
        let socket = Arc::new(bind_broadcast_socket().await?);
        let targets = config.targets.resolve();
        info!(
            "discovery scan on UDP port {} to {} target(s) for {:?}",
            config.port,
            targets.len(),
            config.timeout
        );

        let mut sender = tokio::spawn(send_search_requests(
            Arc::clone(&socket),
            targets,
            config.port,
            config.send_interval,
        ));
        let mut sender_done = false;
        let mut probes: JoinSet<(usize, bool)> = JoinSet::new();
        let mut scan = ScanAccumulator::new();
        let mut buf = vec![0u8; RECV_BUFFER_SIZE];

        loop {
            tokio::select! {
                () = tokio::time::sleep_until(deadline) => break,

                joined = &mut sender, if !sender_done => {
                    sender_done = true;
                    match joined {
                        Ok(Ok(sent)) => debug!("sent {sent} search request(s)"),
                        Ok(Err(e)) => return Err(e),
                        Err(e) => return Err(TransportError::Task(e.to_string())),
                    }
                }

                Some(probed) = probes.join_next(), if !probes.is_empty() => {
                    match probed {
                        Ok((index, reachable)) => scan.resolve(index, status_from_probe(reachable)),
                        Err(e) => warn!("liveness probe task failed: {e}"),
                    }
                }

                received = socket.recv_from(&mut buf) => {
                    let (len, src) = match received {
                        Ok(pair) => pair,
                        Err(e) => {
                            // ICMP port-unreachable from an earlier send surfaces here on some platforms.
                            debug!("discovery recv error: {e}");
                            continue;
                        }
                    };
                    match scan.accept(&buf[..len], src) {
                        Accepted::Added { index, needs_probe } => {
                            debug!("console reply #{index} from {src}");
                            if needs_probe {
                                let probe = Arc::clone(&self.probe);
                                let ip = src.ip();
                                probes.spawn(async move { (index, probe.is_reachable(ip).await) });
                            }
                        }
                        Accepted::Duplicate => debug!("duplicate reply from {src} ignored"),
                        Accepted::Malformed(e) => debug!("skipping malformed datagram from {src}: {e}"),
                    }
                }
            }
        }

        sender.abort();
        probes.abort_all();
        drop(socket);

        let consoles = scan.finish();
        info!("discovery scan finished: {} console(s)", consoles.len());
        Ok(consoles)
    }

    /// Asks a single known host for its status.
    ///
    /// Returns `Ok(None)` when the host does not reply within `timeout`.
    ///
    /// # Errors
    ///
    /// [`TransportError`] if the socket cannot be bound or the request cannot be sent.
    pub async fn query_host(
        &self,
        host: Ipv4Addr,
        port: u16,
        timeout: Duration,
    ) -> Result<Option<Console>, TransportError> {
        let deadline = Instant::now() + timeout;
        let socket = bind_broadcast_socket().await?;
        let dest = SocketAddr::from((host, port));
        socket
            .send_to(&ps_core::build_search_request(), dest)
            .await
            .map_err(|source| TransportError::Send { dest, source })?;

        let mut buf = vec![0u8; RECV_BUFFER_SIZE];
        let mut scan = ScanAccumulator::new();

        while scan.is_empty() {
            let (len, src) = match tokio::time::timeout_at(deadline, socket.recv_from(&mut buf)).await {
                Err(_) => return Ok(None),
                Ok(Ok(pair)) => pair,
                Ok(Err(e)) => {
                    debug!("status query recv error: {e}");
                    continue;
                }
            };
            if src.ip() != IpAddr::V4(host) {
                debug!("ignoring reply from {src} while querying {host}");
                continue;
            }
            if let Accepted::Added { index, needs_probe: true } = scan.accept(&buf[..len], src) {
                let reachable = tokio::time::timeout_at(deadline, self.probe.is_reachable(src.ip()))
                    .await
                    .unwrap_or(false);
                scan.resolve(index, status_from_probe(reachable));
            }
        }

        Ok(scan.finish().into_iter().next())
    }
}

async fn bind_broadcast_socket() -> Result<UdpSocket, TransportError> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0));
    let socket = UdpSocket::bind(addr)
        .await
        .map_err(|source| TransportError::Bind { addr, source })?;
    socket
        .set_broadcast(true)
        .map_err(|source| TransportError::SocketOption {
            option: "SO_BROADCAST",
            source,
        })?;
    Ok(socket)
}

/// Sends the search datagram to each target, `interval` apart.
///
/// Fails only when no send succeeded at all.
async fn send_search_requests(
    socket: Arc<UdpSocket>,
    targets: Vec<Ipv4Addr>,
    port: u16,
    interval: Duration,
) -> Result<usize, TransportError> {
    let request = ps_core::build_search_request();
    let mut sent = 0usize;
    let mut last_error = None;

    for (i, target) in targets.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(interval).await;
        }
        let dest = SocketAddr::from((*target, port));
        match socket.send_to(&request, dest).await {
            Ok(_) => {
                sent += 1;
                debug!("search request sent to {dest}");
            }
            Err(e) => {
                warn!("failed to send search request to {dest}: {e}");
                last_error = Some(e);
            }
        }
    }

    match last_error {
        Some(source) if sent == 0 => Err(TransportError::NoSearchSent {
            attempted: targets.len(),
            source,
        }),
        _ => Ok(sent),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
