//! Application layer for PS-Remote.
//!
//! Use cases depend only on traits ([`store::CredentialStore`],
//! [`token_lifecycle::OAuthProvider`], [`pairing::Pairer`],
//! [`wake_console::WakeTransport`]) and `ps_core` domain types.  The
//! infrastructure layer supplies the implementations at construction time.
//!
//! # Use cases
//!
//! - **`token_lifecycle`** – load-or-refresh of the OAuth session, login,
//!   logout, and the account snapshot used for pairing.
//!
//! - **`pairing`** – stores the credential an external pairing exchange
//!   produces, after checking it is a Remote Play credential.
//!
//! - **`wake_console`** – looks up a console's credential (through an
//!   explicit `DiscoverySession` when only the IP is known) and sends the
//!   wake datagram.

pub mod error;
pub mod pairing;
pub mod store;
pub mod token_lifecycle;
pub mod wake_console;

pub use error::{AuthError, PairingError, RemoteError, StoreError, TransportError};
