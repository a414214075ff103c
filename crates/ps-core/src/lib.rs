//! # ps-core
//!
//! Shared library for PS-Remote containing the Device Discovery Protocol (DDP)
//! codec and the domain types that describe consoles, wake credentials, and
//! account sessions.
//!
//! It has zero dependencies on OS APIs, sockets, or HTTP clients.
//!
//! # Architecture overview
//!
//! PS-Remote finds PlayStation consoles on the local network, wakes them from
//! rest mode, and manages the account material needed to do so.  This crate
//! is the foundation:
//!
//! - **`protocol`** – The DDP text format: the `SRCH` datagram broadcast to
//!   find consoles, the `WAKEUP` datagram that turns one on, and the parser
//!   for the `key:value` responses consoles send back.
//!
//! - **`domain`** – Pure data: the [`Console`] found by a scan, the
//!   [`Credential`] produced by pairing, and the [`TokenData`] / [`UserInfo`]
//!   that make up an account session.

pub mod domain;
pub mod protocol;

pub use domain::console::{
    Console, ConsoleKind, ConsoleStatus, PS4_DISCOVERY_PORT, PS5_DISCOVERY_PORT,
};
pub use domain::credential::{Credential, CredentialError, REMOTE_PLAY_AUTH_TYPE};
pub use domain::session::{
    decode_account_id, encode_account_id, AccountIdError, TokenData, UserInfo,
};
pub use protocol::ddp::{
    build_search_request, build_wake_request, parse_search_response, ParseError, SearchResponse,
};
