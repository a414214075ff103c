//! WakeConsoleUseCase: resolves a console to its stored credential and wakes it.
//!
//! A wake datagram needs the console's `user-credential`, which is stored by
//! `host-id`.  Callers usually know only an IP address, so the use case takes a
//! [`DiscoverySession`]: the result of one discovery scan, passed explicitly
//! from the discovery call to the wake call.  Nothing is cached globally; a
//! new scan produces a new session.

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use ps_core::{Console, ConsoleKind, CredentialError};
use tracing::info;
use uuid::Uuid;

use super::error::{RemoteError, TransportError};
use super::store::CredentialStore;

/// The consoles found by a single discovery scan.
#[derive(Debug, Clone)]
pub struct DiscoverySession {
    id: Uuid,
    kind: ConsoleKind,
    consoles: Vec<Console>,
}

impl DiscoverySession {
    /// Wraps the result of a scan performed against `kind`'s discovery port.
    pub fn new(kind: ConsoleKind, consoles: Vec<Console>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            consoles,
        }
    }

    /// Identifier used to correlate log lines of one scan.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> ConsoleKind {
        self.kind
    }

    /// Consoles in the order their replies were received.
    pub fn consoles(&self) -> &[Console] {
        &self.consoles
    }

    pub fn is_empty(&self) -> bool {
        self.consoles.is_empty()
    }

    pub fn find_by_ip(&self, ip: IpAddr) -> Option<&Console> {
        self.consoles.iter().find(|c| c.ip_address == ip)
    }

    pub fn find_by_host_id(&self, host_id: &str) -> Option<&Console> {
        self.consoles.iter().find(|c| c.host_id == host_id)
    }
}

/// Sends wake datagrams.
///
/// The infrastructure implementation is the UDP `WakeDispatcher`; tests record calls.
#[async_trait]
pub trait WakeTransport: Send + Sync {
    /// Sends one wake datagram carrying `user_credential` to `host:port`.
    async fn send_wake(
        &self,
        host: IpAddr,
        port: u16,
        user_credential: &str,
    ) -> Result<(), TransportError>;
}

/// Wakes consoles using stored credentials.
pub struct WakeConsoleUseCase {
    store: Arc<dyn CredentialStore>,
    transport: Arc<dyn WakeTransport>,
}

impl WakeConsoleUseCase {
    pub fn new(store: Arc<dyn CredentialStore>, transport: Arc<dyn WakeTransport>) -> Self {
        Self { store, transport }
    }

    /// Returns the wake secret stored for `host_id`.
    ///
    /// # Errors
    ///
    /// - [`CredentialError::NotFound`] when nothing is stored for `host_id`.
    /// - [`CredentialError::WrongAuthType`] when the stored credential is not
    ///   a Remote Play credential.
    pub fn wake_credential(&self, host_id: &str) -> Result<String, RemoteError> {
        let credential = self
            .store
            .load_credential(host_id)?
            .ok_or_else(|| CredentialError::NotFound {
                host_id: host_id.to_string(),
            })?;
        Ok(credential.wake_secret(host_id)?.to_string())
    }

    /// Wakes the console `host_id` at `host:port`.
    ///
    /// Success means the datagram was handed to the network stack; the
    /// protocol has no acknowledgement.
    ///
    /// # Errors
    ///
    /// Credential errors from [`Self::wake_credential`], or a [`TransportError`].
    pub async fn wake_host(&self, host_id: &str, host: IpAddr, port: u16) -> Result<(), RemoteError> {
        let secret = self.wake_credential(host_id)?;
        self.transport.send_wake(host, port, &secret).await?;
        info!("wake request sent to {host_id} at {host}:{port}");
        Ok(())
    }

    /// Wakes the console that answered from `ip` in `session`.
    ///
    /// # Errors
    ///
    /// [`RemoteError::NotFound`] when no console in the session has that address,
    /// plus everything [`Self::wake_host`] can return.
    pub async fn wake_discovered(
        &self,
        session: &DiscoverySession,
        ip: IpAddr,
    ) -> Result<Console, RemoteError> {
        let console = session.find_by_ip(ip).ok_or_else(|| {
            RemoteError::NotFound(format!(
                "no console answered from {ip} in discovery scan {}",
                session.id()
            ))
        })?;

        self.wake_host(&console.host_id, console.ip_address, session.kind().discovery_port())
            .await?;
        Ok(console.clone())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::credential_store::MemoryCredentialStore;
    use ps_core::{ConsoleStatus, Credential};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<(IpAddr, u16, String)>>,
        should_fail: bool,
    }

    #[async_trait]
    impl WakeTransport for RecordingTransport {
        async fn send_wake(
            &self,
            host: IpAddr,
            port: u16,
            user_credential: &str,
        ) -> Result<(), TransportError> {
            if self.should_fail {
                return Err(TransportError::Send {
                    dest: std::net::SocketAddr::new(host, port),
                    source: std::io::Error::new(std::io::ErrorKind::Other, "injected failure"),
                });
            }
            self.sent
                .lock()
                .unwrap()
                .push((host, port, user_credential.to_string()));
            Ok(())
        }
    }

    fn console(host_id: &str, ip: &str) -> Console {
        Console {
            host_id: host_id.to_string(),
            host_name: "Living Room".to_string(),
            host_type: "PS5".to_string(),
            status: ConsoleStatus::Standby,
            system_version: String::new(),
            ip_address: ip.parse().unwrap(),
            port: 9302,
        }
    }

    fn make_use_case(
        transport: Arc<RecordingTransport>,
    ) -> (WakeConsoleUseCase, Arc<MemoryCredentialStore>) {
        let store = Arc::new(MemoryCredentialStore::new());
        let uc = WakeConsoleUseCase::new(Arc::clone(&store) as Arc<dyn CredentialStore>, transport);
        (uc, store)
    }

    #[test]
    fn test_wake_credential_returns_remote_play_secret() {
        let (uc, store) = make_use_case(Arc::new(RecordingTransport::default()));
        store
            .save_credential("abc", &Credential::remote_play("deadbeef==", "acct"))
            .unwrap();

        assert_eq!(uc.wake_credential("abc").unwrap(), "deadbeef==");
    }

    #[test]
    fn test_wake_credential_rejects_wrong_auth_type() {
        // Arrange
        let (uc, store) = make_use_case(Arc::new(RecordingTransport::default()));
        let mut credential = Credential::remote_play("deadbeef==", "acct");
        credential.auth_type = "C".to_string();
        store.save_credential("abc", &credential).unwrap();

        // Act
        let result = uc.wake_credential("abc");

        // Assert
        assert!(matches!(
            result,
            Err(RemoteError::Credential(CredentialError::WrongAuthType { .. }))
        ));
    }

    #[test]
    fn test_wake_credential_missing_is_not_found() {
        let (uc, _store) = make_use_case(Arc::new(RecordingTransport::default()));
        assert!(matches!(
            uc.wake_credential("nope"),
            Err(RemoteError::Credential(CredentialError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_wake_discovered_resolves_ip_through_session() {
        // Arrange
        let transport = Arc::new(RecordingTransport::default());
        let (uc, store) = make_use_case(Arc::clone(&transport));
        store
            .save_credential("abc", &Credential::remote_play("deadbeef==", "acct"))
            .unwrap();
        let session = DiscoverySession::new(
            ConsoleKind::Ps5,
            vec![console("other", "192.168.1.40"), console("abc", "192.168.1.50")],
        );

        // Act
        let woken = uc
            .wake_discovered(&session, "192.168.1.50".parse().unwrap())
            .await
            .unwrap();

        // Assert
        assert_eq!(woken.host_id, "abc");
        let sent = transport.sent.lock().unwrap();
        assert_eq!(
            *sent,
            vec![("192.168.1.50".parse().unwrap(), 9302, "deadbeef==".to_string())]
        );
    }

    #[tokio::test]
    async fn test_wake_discovered_uses_legacy_port_for_ps4_scan() {
        let transport = Arc::new(RecordingTransport::default());
        let (uc, store) = make_use_case(Arc::clone(&transport));
        store
            .save_credential("abc", &Credential::remote_play("secret", "acct"))
            .unwrap();
        let session = DiscoverySession::new(ConsoleKind::Ps4, vec![console("abc", "10.0.0.7")]);

        uc.wake_discovered(&session, "10.0.0.7".parse().unwrap())
            .await
            .unwrap();

        assert_eq!(transport.sent.lock().unwrap()[0].1, 987);
    }

    #[tokio::test]
    async fn test_wake_discovered_unknown_ip_is_not_found() {
        let transport = Arc::new(RecordingTransport::default());
        let (uc, _store) = make_use_case(Arc::clone(&transport));
        let session = DiscoverySession::new(ConsoleKind::Ps5, Vec::new());

        let result = uc
            .wake_discovered(&session, "192.168.1.50".parse().unwrap())
            .await;

        assert!(matches!(result, Err(RemoteError::NotFound(_))));
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_wake_host_surfaces_transport_error() {
        let transport = Arc::new(RecordingTransport {
            should_fail: true,
            ..RecordingTransport::default()
        });
        let (uc, store) = make_use_case(transport);
        store
            .save_credential("abc", &Credential::remote_play("secret", "acct"))
            .unwrap();

        let result = uc
            .wake_host("abc", "192.168.1.50".parse().unwrap(), 9302)
            .await;

        assert!(matches!(result, Err(RemoteError::Transport(TransportError::Send { .. }))));
    }

    #[tokio::test]
    async fn test_wake_host_never_sends_with_rejected_credential() {
        let transport = Arc::new(RecordingTransport::default());
        let (uc, store) = make_use_case(Arc::clone(&transport));
        let mut credential = Credential::remote_play("secret", "acct");
        credential.auth_type = "X".to_string();
        store.save_credential("abc", &credential).unwrap();

        let result = uc
            .wake_host("abc", "192.168.1.50".parse().unwrap(), 9302)
            .await;

        assert!(result.is_err());
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_session_lookup_by_host_id() {
        let session = DiscoverySession::new(ConsoleKind::Ps5, vec![console("abc", "10.0.0.2")]);
        assert!(session.find_by_host_id("abc").is_some());
        assert!(session.find_by_host_id("zzz").is_none());
        assert!(!session.is_empty());
    }
}
