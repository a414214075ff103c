//! PlayStation Network OAuth client.
//!
//! Implements [`OAuthProvider`] over HTTP.  Every call authenticates the
//! client with HTTP basic auth (`client_id:client_secret`) and sends its
//! parameters form-encoded:
//!
//! | Operation        | Request                                                   |
//! |------------------|-----------------------------------------------------------|
//! | code exchange    | `POST token_url` `grant_type=authorization_code`          |
//! | refresh          | `POST token_url` `grant_type=refresh_token`               |
//! | profile lookup   | `GET  token_url/<access_token>`                           |
//!
//! The login itself happens in a browser: [`PsnOAuthClient::authorization_url`]
//! builds the page to open, and the user pastes the final redirect URL back.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::application::error::AuthError;
use crate::application::token_lifecycle::{AccountProfile, OAuthProvider, TokenGrant};
use crate::infrastructure::storage::config::OAuthConfig;

/// Scope requested for Remote Play.
pub const REMOTE_PLAY_SCOPE: &str = "psn:clientapp";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct ProfileResponse {
    user_id: String,
    online_id: String,
    #[serde(default)]
    about_me: String,
    #[serde(default)]
    languages: Vec<String>,
}

/// HTTP client for the PlayStation Network account provider.
#[derive(Debug, Clone)]
pub struct PsnOAuthClient {
    http: reqwest::Client,
    config: OAuthConfig,
}

impl PsnOAuthClient {
    pub fn new(config: OAuthConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Builds the browser login URL.
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidResponse`] if the configured authorize URL is not a URL.
    pub fn authorization_url(&self) -> Result<String, AuthError> {
        let mut url = Url::parse(&self.config.authorize_url)
            .map_err(|e| AuthError::InvalidResponse(format!("authorize_url: {e}")))?;
        url.query_pairs_mut()
            .append_pair("service_entity", "urn:service-entity:psn")
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("scope", REMOTE_PLAY_SCOPE)
            .append_pair("request_locale", "en_US")
            .append_pair("ui", "pr")
            .append_pair("service_logo", "ps")
            .append_pair("layout_type", "popup")
            .append_pair("smcid", "remoteplay")
            .append_pair("prompt", "always")
            .append_pair("PlatformPrivacyWs1", "minimal");
        Ok(url.into())
    }

    async fn request_token(
        &self,
        params: &[(&str, &str)],
        operation: &'static str,
    ) -> Result<TokenGrant, AuthError> {
        let response = self
            .http
            .post(&self.config.token_url)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(params)
            .send()
            .await
            .map_err(|e| http_error(operation, e))?;

        let response = Self::ensure_success(response, operation).await?;
        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(format!("{operation}: {e}")))?;
        debug!("{operation} succeeded, token valid for {}s", body.expires_in);

        Ok(TokenGrant {
            access_token: body.access_token,
            refresh_token: body.refresh_token,
            expires_in: body.expires_in,
        })
    }

    /// Checks HTTP response status; returns the response on success or an error with details.
    async fn ensure_success(
        response: reqwest::Response,
        operation: &'static str,
    ) -> Result<reqwest::Response, AuthError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let detail = response.text().await.unwrap_or_default();
        Err(AuthError::Rejected {
            operation,
            status: Some(status),
            detail,
        })
    }
}

fn http_error(operation: &'static str, err: reqwest::Error) -> AuthError {
    AuthError::Http {
        operation,
        // Profile lookup URLs embed the access token.
        detail: err.without_url().to_string(),
    }
}

#[async_trait]
impl OAuthProvider for PsnOAuthClient {
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, AuthError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];
        self.request_token(&params, "token exchange").await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, AuthError> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("scope", REMOTE_PLAY_SCOPE),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];
        self.request_token(&params, "token refresh").await
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<AccountProfile, AuthError> {
        let operation = "profile lookup";
        let url = format!("{}/{}", self.config.token_url.trim_end_matches('/'), access_token);
        let response = self
            .http
            .get(url)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .send()
            .await
            .map_err(|e| http_error(operation, e))?;

        let response = Self::ensure_success(response, operation).await?;
        let body: ProfileResponse = response
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(format!("{operation}: {e}")))?;

        Ok(AccountProfile {
            user_id: body.user_id,
            online_id: body.online_id,
            about_me: body.about_me,
            languages: body.languages,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
