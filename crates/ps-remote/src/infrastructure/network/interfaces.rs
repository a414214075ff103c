//! Broadcast address computation for discovery.
//!
//! A search request goes to two kinds of destination:
//!
//! - the *directed* broadcast address of every local IPv4 subnet
//!   (`ip | !netmask`, e.g. `192.168.1.255` for `192.168.1.20/24`), and
//! - the *limited* broadcast address `255.255.255.255`.
//!
//! Neither is reliable on its own.  Some platforms refuse to route the limited
//! broadcast out of the right interface, and some networks drop directed
//! broadcasts, so discovery sends to both.

use std::net::Ipv4Addr;

use if_addrs::IfAddr;
use tracing::{debug, warn};

/// The limited broadcast address, always part of the target set.
pub const LIMITED_BROADCAST: Ipv4Addr = Ipv4Addr::BROADCAST;

/// Computes the directed broadcast address of the subnet `ip/netmask`.
pub fn directed_broadcast(ip: Ipv4Addr, netmask: Ipv4Addr) -> Ipv4Addr {
    let ip = ip.octets();
    let mask = netmask.octets();
    Ipv4Addr::from(std::array::from_fn::<u8, 4, _>(|i| ip[i] | !mask[i]))
}

/// Builds the discovery target list from `(ip, netmask)` pairs.
///
/// Loopback addresses are skipped, duplicates removed (first occurrence
/// wins), and [`LIMITED_BROADCAST`] appears exactly once, last unless one of
/// the interfaces already produced it.
pub fn broadcast_addresses<I>(interfaces: I) -> Vec<Ipv4Addr>
where
    I: IntoIterator<Item = (Ipv4Addr, Ipv4Addr)>,
{
    let mut targets: Vec<Ipv4Addr> = Vec::new();
    for (ip, netmask) in interfaces {
        if ip.is_loopback() {
            continue;
        }
        let broadcast = directed_broadcast(ip, netmask);
        if !targets.contains(&broadcast) {
            targets.push(broadcast);
        }
    }
    if !targets.contains(&LIMITED_BROADCAST) {
        targets.push(LIMITED_BROADCAST);
    }
    targets
}

/// Enumerates this host's IPv4 interfaces and returns their broadcast targets.
///
/// If the interfaces cannot be listed, only [`LIMITED_BROADCAST`] is returned.
pub fn local_broadcast_addresses() -> Vec<Ipv4Addr> {
    let interfaces = match if_addrs::get_if_addrs() {
        Ok(list) => list,
        Err(e) => {
            warn!("could not enumerate network interfaces, using limited broadcast only: {e}");
            Vec::new()
        }
    };

    let pairs = interfaces.into_iter().filter_map(|iface| match iface.addr {
        IfAddr::V4(v4) => {
            debug!("interface {}: {}/{}", iface.name, v4.ip, v4.netmask);
            Some((v4.ip, v4.netmask))
        }
        IfAddr::V6(_) => None,
    });
    broadcast_addresses(pairs)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
