//! RegisterConsoleUseCase: turns a console PIN into a stored wake credential.
//!
//! The registration exchange itself belongs to an external [`Pairer`].  This
//! use case only:
//!
//! 1. Supplies the account id from the [`TokenLifecycle`] when the caller
//!    does not pass one.
//! 2. Rejects any credential whose `auth-type` is not the Remote Play marker.
//! 3. Persists the credential keyed by the console's `host-id`.

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use ps_core::{Console, Credential};
use tracing::{info, warn};

use super::error::{PairingError, RemoteError};
use super::store::CredentialStore;
use super::token_lifecycle::TokenLifecycle;

/// Network identity of the console being paired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingTarget {
    pub host_id: String,
    pub host_name: String,
    pub ip_address: IpAddr,
}

impl From<&Console> for PairingTarget {
    fn from(console: &Console) -> Self {
        Self {
            host_id: console.host_id.clone(),
            host_name: console.host_name.clone(),
            ip_address: console.ip_address,
        }
    }
}

/// The external registration exchange.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Pairer: Send + Sync {
    /// Registers with the console at `target` using the on-screen `pin`.
    async fn pair(
        &self,
        target: &PairingTarget,
        pin: &str,
        account_id: &str,
    ) -> Result<Credential, PairingError>;
}

/// Pairs a console and stores the resulting credential.
pub struct RegisterConsoleUseCase {
    pairer: Arc<dyn Pairer>,
    store: Arc<dyn CredentialStore>,
    tokens: Arc<TokenLifecycle>,
}

impl RegisterConsoleUseCase {
    pub fn new(
        pairer: Arc<dyn Pairer>,
        store: Arc<dyn CredentialStore>,
        tokens: Arc<TokenLifecycle>,
    ) -> Self {
        Self {
            pairer,
            store,
            tokens,
        }
    }

    /// Pairs `target` and persists the credential under its `host_id`.
    ///
    /// # Errors
    ///
    /// - [`PairingError::Failed`] when `target` has no `host_id` to key the credential.
    /// - `AuthError::NoUserInfo` when `account_id` is `None` and nobody is logged in.
    /// - Any [`PairingError`] from the collaborator.
    /// - [`PairingError::NotRemotePlay`] when the credential cannot wake consoles.
    /// - [`RemoteError::Store`] when the credential cannot be written.
    pub async fn register(
        &self,
        target: &PairingTarget,
        pin: &str,
        account_id: Option<&str>,
    ) -> Result<Credential, RemoteError> {
        if target.host_id.is_empty() {
            return Err(PairingError::Failed(format!(
                "console at {} did not report a host-id; discover it again while it is awake",
                target.ip_address
            ))
            .into());
        }

        let account_id = match account_id {
            Some(id) => id.to_string(),
            None => self.tokens.current_user_info()?.account_id,
        };

        let credential = self.pairer.pair(target, pin.trim(), &account_id).await?;

        if !credential.is_remote_play() {
            warn!(
                "refusing to store credential with auth-type {:?} for {}",
                credential.auth_type, target.host_id
            );
            return Err(PairingError::NotRemotePlay(credential.auth_type).into());
        }

        self.store.save_credential(&target.host_id, &credential)?;
        info!(
            "paired {} ({}) at {}",
            target.host_name, target.host_id, target.ip_address
        );
        Ok(credential)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::error::AuthError;
    use crate::application::token_lifecycle::MockOAuthProvider;
    use crate::infrastructure::storage::credential_store::MemoryCredentialStore;
    use chrono::{Duration, Utc};
    use mockall::predicate::{always, eq};
    use ps_core::{encode_account_id, TokenData, UserInfo};

    fn target() -> PairingTarget {
        PairingTarget {
            host_id: "abc".to_string(),
            host_name: "Living Room".to_string(),
            ip_address: "192.168.1.50".parse().unwrap(),
        }
    }

    fn logged_in_store() -> Arc<MemoryCredentialStore> {
        let store = Arc::new(MemoryCredentialStore::new());
        store
            .save_session(&TokenData {
                access_token: "access".to_string(),
                refresh_token: "refresh".to_string(),
                expiry: Utc::now() + Duration::hours(1),
                user_info: Some(UserInfo {
                    online_id: "player-one".to_string(),
                    account_id: encode_account_id("42").unwrap(),
                    user_id: "42".to_string(),
                    about_me: String::new(),
                    languages: Vec::new(),
                }),
            })
            .unwrap();
        store
    }

    fn use_case(pairer: MockPairer, store: Arc<MemoryCredentialStore>) -> RegisterConsoleUseCase {
        let tokens = Arc::new(TokenLifecycle::new(
            Arc::new(MockOAuthProvider::new()),
            Arc::clone(&store) as Arc<dyn CredentialStore>,
        ));
        RegisterConsoleUseCase::new(Arc::new(pairer), store, tokens)
    }

    #[tokio::test]
    async fn test_register_uses_logged_in_account_id_when_omitted() {
        // Arrange
        let store = logged_in_store();
        let expected_account = encode_account_id("42").unwrap();
        let mut pairer = MockPairer::new();
        pairer
            .expect_pair()
            .with(always(), eq("12345678"), eq(expected_account.clone()))
            .times(1)
            .returning(|_, _, account| Ok(Credential::remote_play("secret", account)));
        let uc = use_case(pairer, Arc::clone(&store));

        // Act
        let credential = uc.register(&target(), " 12345678 ", None).await.unwrap();

        // Assert
        assert_eq!(credential.account_id, expected_account);
        assert_eq!(store.load_credential("abc").unwrap(), Some(credential));
    }

    #[tokio::test]
    async fn test_register_prefers_explicit_account_id() {
        let mut pairer = MockPairer::new();
        pairer
            .expect_pair()
            .with(always(), always(), eq("explicit"))
            .times(1)
            .returning(|_, _, account| Ok(Credential::remote_play("secret", account)));
        let uc = use_case(pairer, Arc::new(MemoryCredentialStore::new()));

        let credential = uc
            .register(&target(), "12345678", Some("explicit"))
            .await
            .unwrap();

        assert_eq!(credential.account_id, "explicit");
    }

    #[tokio::test]
    async fn test_register_without_session_or_account_id_fails() {
        let uc = use_case(MockPairer::new(), Arc::new(MemoryCredentialStore::new()));

        let result = uc.register(&target(), "12345678", None).await;

        assert!(matches!(result, Err(RemoteError::Auth(AuthError::NoUserInfo))));
    }

    #[tokio::test]
    async fn test_register_rejects_non_remote_play_credential() {
        // Arrange
        let store = logged_in_store();
        let mut pairer = MockPairer::new();
        pairer.expect_pair().returning(|_, _, account| {
            let mut credential = Credential::remote_play("secret", account);
            credential.auth_type = "C".to_string();
            Ok(credential)
        });
        let uc = use_case(pairer, Arc::clone(&store));

        // Act
        let result = uc.register(&target(), "12345678", None).await;

        // Assert
        assert!(matches!(
            result,
            Err(RemoteError::Pairing(PairingError::NotRemotePlay(ref t))) if t == "C"
        ));
        assert_eq!(store.load_credential("abc").unwrap(), None);
    }

    #[tokio::test]
    async fn test_register_surfaces_bad_pin() {
        let store = logged_in_store();
        let mut pairer = MockPairer::new();
        pairer
            .expect_pair()
            .returning(|_, _, _| Err(PairingError::BadPin));
        let uc = use_case(pairer, Arc::clone(&store));

        let result = uc.register(&target(), "00000000", None).await;

        assert!(matches!(result, Err(RemoteError::Pairing(PairingError::BadPin))));
        assert!(store.list_credentials().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_register_requires_host_id() {
        let uc = use_case(MockPairer::new(), logged_in_store());
        let mut anonymous = target();
        anonymous.host_id.clear();

        let result = uc.register(&anonymous, "12345678", None).await;

        assert!(matches!(result, Err(RemoteError::Pairing(PairingError::Failed(_)))));
    }

    #[test]
    fn test_pairing_target_from_console() {
        let console = Console {
            host_id: "abc".to_string(),
            host_name: "Den".to_string(),
            host_type: "PS5".to_string(),
            status: ps_core::ConsoleStatus::Awake,
            system_version: String::new(),
            ip_address: "10.0.0.9".parse().unwrap(),
            port: 9302,
        };

        let target = PairingTarget::from(&console);

        assert_eq!(target.host_id, "abc");
        assert_eq!(target.ip_address.to_string(), "10.0.0.9");
    }
}
