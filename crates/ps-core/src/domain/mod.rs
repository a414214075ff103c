//! Domain entities for PS-Remote.
//!
//! This module contains pure data and rules with no infrastructure
//! dependencies: nothing here opens a socket, touches the file system, or
//! talks HTTP.  Outer layers construct these types from wire data and
//! persisted records; the domain only decides what is valid.

/// Consoles found by a discovery scan.
pub mod console;

/// Wake credentials produced by pairing.
pub mod credential;

/// OAuth session state and account identifiers.
pub mod session;
