//! Network infrastructure: the UDP side of the Device Discovery Protocol.
//!
//! # Sub-modules
//!
//! - **`interfaces`** – Computes the broadcast targets of a scan from the
//!   host's IPv4 interfaces.
//!
//! - **`discovery`** – Broadcasts `SRCH`, collects and deduplicates replies
//!   within a hard timeout, and answers single-host status queries.
//!
//! - **`liveness`** – Ping-based reachability check used when a reply has no
//!   `status` line.
//!
//! - **`wake`** – Sends the `WAKEUP` datagram from the fixed source port.

pub mod discovery;
pub mod interfaces;
pub mod liveness;
pub mod wake;
