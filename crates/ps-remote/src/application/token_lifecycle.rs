//! TokenLifecycle: OAuth access/refresh token management.
//!
//! The session moves through these states:
//!
//! ```text
//! NoSession ──complete_authentication──► Authenticated
//!                                            │  expiry passes
//!                                            ▼
//!                                         Expired ──refresh──► Authenticated
//!                                            │
//!                     logout (from any state) ▼
//!                                         LoggedOut
//! ```
//!
//! `LoggedOut` is persisted as [`TokenData::empty`] and behaves exactly like
//! `NoSession`.
//!
//! The account provider is reached through the [`OAuthProvider`] trait so the
//! lifecycle can be unit-tested without HTTP.  Every public operation re-reads
//! the session from the [`CredentialStore`] before deciding what to do.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use ps_core::{encode_account_id, TokenData, UserInfo};
use tracing::{debug, info};
use url::Url;

use super::error::{AuthError, RemoteError};
use super::store::CredentialStore;

/// Tokens returned by an authorization-code exchange or a refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: String,
    /// Lifetime of `access_token` in seconds.
    pub expires_in: u64,
}

/// Account profile as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AccountProfile {
    /// Decimal numeric user id.
    pub user_id: String,
    pub online_id: String,
    pub about_me: String,
    pub languages: Vec<String>,
}

/// The OAuth account provider.
///
/// The infrastructure implementation talks HTTP; tests use a mock.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Exchanges an authorization code for a token pair.
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, AuthError>;

    /// Exchanges a refresh token for a new token pair.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, AuthError>;

    /// Looks up the account that owns `access_token`.
    async fn fetch_profile(&self, access_token: &str) -> Result<AccountProfile, AuthError>;
}

/// Extracts the authorization code from the redirect URL the user pasted back.
///
/// A bare code (no scheme) is accepted as-is.
///
/// # Errors
///
/// Returns [`AuthError::MissingAuthorizationCode`] if the input is empty or
/// is a URL without a non-empty `code` query parameter.
pub fn extract_authorization_code(redirect: &str) -> Result<String, AuthError> {
    let redirect = redirect.trim();
    if redirect.is_empty() {
        return Err(AuthError::MissingAuthorizationCode);
    }

    match Url::parse(redirect) {
        Ok(url) => url
            .query_pairs()
            .find(|(key, _)| key == "code")
            .map(|(_, value)| value.into_owned())
            .filter(|code| !code.is_empty())
            .ok_or(AuthError::MissingAuthorizationCode),
        // Not a URL: treat the input as the code itself, unless it looks like
        // a URL fragment that lost its scheme.
        Err(_) if redirect.contains('?') || redirect.contains('/') => {
            Err(AuthError::MissingAuthorizationCode)
        }
        Err(_) => Ok(redirect.to_string()),
    }
}

/// Builds the [`UserInfo`] snapshot attached to a session.
///
/// # Errors
///
/// Returns [`AuthError::AccountId`] if the profile's user id is not numeric.
pub fn user_info_from_profile(profile: AccountProfile) -> Result<UserInfo, AuthError> {
    let account_id = encode_account_id(&profile.user_id)?;
    Ok(UserInfo {
        online_id: profile.online_id,
        account_id,
        user_id: profile.user_id,
        about_me: profile.about_me,
        languages: profile.languages,
    })
}

/// Manages the stored OAuth session.
pub struct TokenLifecycle {
    provider: Arc<dyn OAuthProvider>,
    store: Arc<dyn CredentialStore>,
}

impl TokenLifecycle {
    /// Creates a lifecycle over the given provider and store.
    pub fn new(provider: Arc<dyn OAuthProvider>, store: Arc<dyn CredentialStore>) -> Self {
        Self { provider, store }
    }

    /// Returns a usable access token, refreshing the session if it has expired.
    ///
    /// Performs no network call while the stored token is still valid, and
    /// exactly one refresh exchange (plus one profile lookup) when it is not.
    ///
    /// # Errors
    ///
    /// - [`AuthError::AuthenticationRequired`] when no session is stored.
    /// - Any [`AuthError`] from the refresh exchange.
    /// - [`RemoteError::Store`] when the session cannot be read or written.
    pub async fn ensure_valid_access_token(&self) -> Result<String, RemoteError> {
        let session = self.load_active_session()?;
        let now = Utc::now();

        if session.is_valid_at(now) {
            debug!("cached access token valid until {}", session.expiry);
            return Ok(session.access_token);
        }

        if session.refresh_token.is_empty() {
            return Err(AuthError::AuthenticationRequired.into());
        }

        info!("access token expired at {}; refreshing", session.expiry);
        let grant = self.provider.refresh(&session.refresh_token).await?;
        let refreshed = self.build_session(grant, now).await?;
        self.store.save_session(&refreshed)?;
        Ok(refreshed.access_token)
    }

    /// Exchanges the code in `redirect` for a new session and persists it.
    ///
    /// # Errors
    ///
    /// - [`AuthError::MissingAuthorizationCode`] when `redirect` has no code.
    /// - Any [`AuthError`] from the exchange or profile lookup.
    /// - [`RemoteError::Store`] when the session cannot be written.
    pub async fn complete_authentication(&self, redirect: &str) -> Result<TokenData, RemoteError> {
        let code = extract_authorization_code(redirect)?;
        let grant = self.provider.exchange_code(&code).await?;
        let session = self.build_session(grant, Utc::now()).await?;
        self.store.save_session(&session)?;

        if let Some(user) = &session.user_info {
            info!("authenticated as {}", user.online_id);
        }
        Ok(session)
    }

    /// Returns the account snapshot of the stored session.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NoUserInfo`] when no session (or no snapshot) is stored.
    pub fn current_user_info(&self) -> Result<UserInfo, RemoteError> {
        self.store
            .load_session()?
            .and_then(|session| session.user_info)
            .ok_or_else(|| AuthError::NoUserInfo.into())
    }

    /// Invalidates the session by persisting an all-empty record.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Store`] when the record cannot be written.
    pub fn logout(&self) -> Result<(), RemoteError> {
        self.store.save_session(&TokenData::empty())?;
        info!("session cleared");
        Ok(())
    }

    fn load_active_session(&self) -> Result<TokenData, RemoteError> {
        match self.store.load_session()? {
            Some(session) if !session.is_empty() => Ok(session),
            _ => Err(AuthError::AuthenticationRequired.into()),
        }
    }

    async fn build_session(
        &self,
        grant: TokenGrant,
        issued_at: DateTime<Utc>,
    ) -> Result<TokenData, AuthError> {
        let profile = self.provider.fetch_profile(&grant.access_token).await?;
        let user_info = user_info_from_profile(profile)?;
        let lifetime = i64::try_from(grant.expires_in).unwrap_or(i64::MAX);
        let expiry = issued_at
            .checked_add_signed(Duration::seconds(lifetime.min(i64::MAX / 1_000)))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Ok(TokenData {
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
            expiry,
            user_info: Some(user_info),
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::credential_store::MemoryCredentialStore;
    use mockall::predicate::eq;

    fn profile() -> AccountProfile {
        AccountProfile {
            user_id: "1234567890".to_string(),
            online_id: "player-one".to_string(),
            about_me: String::new(),
            languages: vec!["en".to_string()],
        }
    }

    fn grant(access: &str, refresh: &str) -> TokenGrant {
        TokenGrant {
            access_token: access.to_string(),
            refresh_token: refresh.to_string(),
            expires_in: 3600,
        }
    }

    fn session_expiring_at(expiry: DateTime<Utc>) -> TokenData {
        TokenData {
            access_token: "old-access".to_string(),
            refresh_token: "old-refresh".to_string(),
            expiry,
            user_info: Some(user_info_from_profile(profile()).unwrap()),
        }
    }

    fn lifecycle(provider: MockOAuthProvider, store: Arc<MemoryCredentialStore>) -> TokenLifecycle {
        TokenLifecycle::new(Arc::new(provider), store)
    }

    // ── extract_authorization_code ────────────────────────────────────────────

    #[test]
    fn test_extract_code_from_redirect_url() {
        let code = extract_authorization_code(
            "https://remoteplay.dl.playstation.net/remoteplay/redirect?code=AbC123&cid=x",
        )
        .unwrap();
        assert_eq!(code, "AbC123");
    }

    #[test]
    fn test_extract_code_rejects_url_without_code() {
        let result = extract_authorization_code(
            "https://remoteplay.dl.playstation.net/remoteplay/redirect?error=access_denied",
        );
        assert!(matches!(result, Err(AuthError::MissingAuthorizationCode)));
    }

    #[test]
    fn test_extract_code_rejects_empty_code_parameter() {
        let result = extract_authorization_code("https://example.com/cb?code=");
        assert!(matches!(result, Err(AuthError::MissingAuthorizationCode)));
    }

    #[test]
    fn test_extract_code_accepts_bare_code() {
        assert_eq!(extract_authorization_code("  v3.AbCdEf  ").unwrap(), "v3.AbCdEf");
    }

    #[test]
    fn test_extract_code_rejects_empty_input() {
        assert!(matches!(
            extract_authorization_code("   "),
            Err(AuthError::MissingAuthorizationCode)
        ));
    }

    // ── ensure_valid_access_token ─────────────────────────────────────────────

    #[tokio::test]
    async fn test_valid_token_is_returned_without_network_calls() {
        // Arrange: a mock with no expectations panics on any call.
        let store = Arc::new(MemoryCredentialStore::new());
        store
            .save_session(&session_expiring_at(Utc::now() + Duration::minutes(30)))
            .unwrap();
        let tokens = lifecycle(MockOAuthProvider::new(), store);

        // Act
        let token = tokens.ensure_valid_access_token().await.unwrap();

        // Assert
        assert_eq!(token, "old-access");
    }

    #[tokio::test]
    async fn test_expired_token_triggers_exactly_one_refresh() {
        // Arrange
        let store = Arc::new(MemoryCredentialStore::new());
        store
            .save_session(&session_expiring_at(Utc::now() - Duration::minutes(1)))
            .unwrap();

        let mut provider = MockOAuthProvider::new();
        provider
            .expect_refresh()
            .with(eq("old-refresh"))
            .times(1)
            .returning(|_| Ok(grant("new-access", "new-refresh")));
        provider
            .expect_fetch_profile()
            .with(eq("new-access"))
            .times(1)
            .returning(|_| Ok(profile()));
        let tokens = lifecycle(provider, Arc::clone(&store));

        // Act
        let token = tokens.ensure_valid_access_token().await.unwrap();

        // Assert
        assert_eq!(token, "new-access");
        let saved = store.load_session().unwrap().unwrap();
        assert_eq!(saved.refresh_token, "new-refresh");
        assert!(saved.is_valid_at(Utc::now()));
    }

    #[tokio::test]
    async fn test_missing_session_requires_authentication() {
        let tokens = lifecycle(MockOAuthProvider::new(), Arc::new(MemoryCredentialStore::new()));

        let result = tokens.ensure_valid_access_token().await;

        assert!(matches!(
            result,
            Err(RemoteError::Auth(AuthError::AuthenticationRequired))
        ));
    }

    #[tokio::test]
    async fn test_refresh_rejection_is_surfaced_and_session_untouched() {
        // Arrange
        let store = Arc::new(MemoryCredentialStore::new());
        let expired = session_expiring_at(Utc::now() - Duration::minutes(1));
        store.save_session(&expired).unwrap();

        let mut provider = MockOAuthProvider::new();
        provider.expect_refresh().times(1).returning(|_| {
            Err(AuthError::Rejected {
                operation: "token refresh",
                status: Some(400),
                detail: "invalid_grant".to_string(),
            })
        });
        let tokens = lifecycle(provider, Arc::clone(&store));

        // Act
        let result = tokens.ensure_valid_access_token().await;

        // Assert
        assert!(matches!(
            result,
            Err(RemoteError::Auth(AuthError::Rejected { status: Some(400), .. }))
        ));
        assert_eq!(store.load_session().unwrap(), Some(expired));
    }

    // ── complete_authentication ───────────────────────────────────────────────

    #[tokio::test]
    async fn test_complete_authentication_persists_session_with_user_info() {
        // Arrange
        let store = Arc::new(MemoryCredentialStore::new());
        let mut provider = MockOAuthProvider::new();
        provider
            .expect_exchange_code()
            .with(eq("the-code"))
            .times(1)
            .returning(|_| Ok(grant("access", "refresh")));
        provider
            .expect_fetch_profile()
            .times(1)
            .returning(|_| Ok(profile()));
        let tokens = lifecycle(provider, Arc::clone(&store));

        // Act
        let session = tokens
            .complete_authentication("https://example.com/redirect?code=the-code")
            .await
            .unwrap();

        // Assert
        let user = session.user_info.clone().unwrap();
        assert_eq!(user.online_id, "player-one");
        assert_eq!(user.account_id, encode_account_id("1234567890").unwrap());
        assert_eq!(store.load_session().unwrap(), Some(session));
    }

    #[tokio::test]
    async fn test_complete_authentication_without_code_makes_no_calls() {
        let tokens = lifecycle(MockOAuthProvider::new(), Arc::new(MemoryCredentialStore::new()));

        let result = tokens
            .complete_authentication("https://example.com/redirect?state=1")
            .await;

        assert!(matches!(
            result,
            Err(RemoteError::Auth(AuthError::MissingAuthorizationCode))
        ));
    }

    #[tokio::test]
    async fn test_complete_authentication_rejects_non_numeric_user_id() {
        let mut provider = MockOAuthProvider::new();
        provider
            .expect_exchange_code()
            .returning(|_| Ok(grant("access", "refresh")));
        provider.expect_fetch_profile().returning(|_| {
            Ok(AccountProfile {
                user_id: "not-a-number".to_string(),
                ..AccountProfile::default()
            })
        });
        let tokens = lifecycle(provider, Arc::new(MemoryCredentialStore::new()));

        let result = tokens.complete_authentication("code").await;

        assert!(matches!(result, Err(RemoteError::Auth(AuthError::AccountId(_)))));
    }

    // ── current_user_info / logout ────────────────────────────────────────────

    #[test]
    fn test_current_user_info_fails_without_session() {
        let tokens = lifecycle(MockOAuthProvider::new(), Arc::new(MemoryCredentialStore::new()));
        assert!(matches!(
            tokens.current_user_info(),
            Err(RemoteError::Auth(AuthError::NoUserInfo))
        ));
    }

    #[tokio::test]
    async fn test_logout_invalidates_session() {
        // Arrange
        let store = Arc::new(MemoryCredentialStore::new());
        store
            .save_session(&session_expiring_at(Utc::now() + Duration::minutes(30)))
            .unwrap();
        let tokens = lifecycle(MockOAuthProvider::new(), Arc::clone(&store));

        // Act
        tokens.logout().unwrap();

        // Assert
        assert_eq!(store.load_session().unwrap(), Some(TokenData::empty()));
        assert!(tokens.current_user_info().is_err());
        assert!(matches!(
            tokens.ensure_valid_access_token().await,
            Err(RemoteError::Auth(AuthError::AuthenticationRequired))
        ));
    }
}
