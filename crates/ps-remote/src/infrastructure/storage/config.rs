//! TOML-based configuration persistence.
//!
//! Reads and writes `AppConfig` to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\PsRemote\config.toml`
//! - Linux:    `$XDG_CONFIG_HOME/ps-remote/config.toml` (or `~/.config/ps-remote`)
//! - macOS:    `~/Library/Application Support/PsRemote/config.toml`
//!
//! Example:
//!
//! ```toml
//! [general]
//! log_level = "debug"
//!
//! [network]
//! discovery_timeout_ms = 5000
//!
//! [pairing]
//! command = "/usr/local/bin/ps-pair"
//! ```
//!
//! Every field has a `#[serde(default = ...)]`, so a missing file, a missing
//! section, or a missing key all fall back to the built-in value.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ps_core::{PS4_DISCOVERY_PORT, PS5_DISCOVERY_PORT};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level application configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub oauth: OAuthConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub pairing: PairingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneralConfig {
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// DDP ports and timings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    #[serde(default = "default_discovery_port")]
    pub discovery_port: u16,
    /// Port for PS4 consoles on older firmware.
    #[serde(default = "default_legacy_discovery_port")]
    pub legacy_discovery_port: u16,
    /// Local port wake datagrams are sent from.
    #[serde(default = "default_wake_source_port")]
    pub wake_source_port: u16,
    #[serde(default = "default_discovery_timeout_ms")]
    pub discovery_timeout_ms: u64,
    #[serde(default = "default_send_interval_ms")]
    pub send_interval_ms: u64,
    #[serde(default = "default_wake_grace_ms")]
    pub wake_grace_ms: u64,
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

/// OAuth client registration and provider endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OAuthConfig {
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default = "default_client_secret")]
    pub client_secret: String,
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
    #[serde(default = "default_authorize_url")]
    pub authorize_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    /// Credential store directory; defaults to `<config dir>/credentials`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

/// External pairing program.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PairingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Arguments placed before `--host/--pin/--account-id`.
    #[serde(default)]
    pub args: Vec<String>,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_discovery_port() -> u16 {
    PS5_DISCOVERY_PORT
}
fn default_legacy_discovery_port() -> u16 {
    PS4_DISCOVERY_PORT
}
fn default_wake_source_port() -> u16 {
    16690
}
fn default_discovery_timeout_ms() -> u64 {
    3000
}
fn default_send_interval_ms() -> u64 {
    100
}
fn default_wake_grace_ms() -> u64 {
    2
}
fn default_probe_timeout_ms() -> u64 {
    1000
}
fn default_client_id() -> String {
    "ba495a24-818c-472b-b12d-ff231c1b5745".to_string()
}
fn default_client_secret() -> String {
    "mvaiZkRsAsI1IBkY".to_string()
}
fn default_redirect_uri() -> String {
    "https://remoteplay.dl.playstation.net/remoteplay/redirect".to_string()
}
fn default_authorize_url() -> String {
    "https://auth.api.sonyentertainmentnetwork.com/2.0/oauth/authorize".to_string()
}
fn default_token_url() -> String {
    "https://auth.api.sonyentertainmentnetwork.com/2.0/oauth/token".to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            discovery_port: default_discovery_port(),
            legacy_discovery_port: default_legacy_discovery_port(),
            wake_source_port: default_wake_source_port(),
            discovery_timeout_ms: default_discovery_timeout_ms(),
            send_interval_ms: default_send_interval_ms(),
            wake_grace_ms: default_wake_grace_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
        }
    }
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            client_id: default_client_id(),
            client_secret: default_client_secret(),
            redirect_uri: default_redirect_uri(),
            authorize_url: default_authorize_url(),
            token_url: default_token_url(),
        }
    }
}

impl NetworkConfig {
    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.discovery_timeout_ms)
    }

    pub fn send_interval(&self) -> Duration {
        Duration::from_millis(self.send_interval_ms)
    }

    pub fn wake_grace(&self) -> Duration {
        Duration::from_millis(self.wake_grace_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Discovery port for the console generation selected on the command line.
    pub fn port_for(&self, legacy: bool) -> u16 {
        if legacy {
            self.legacy_discovery_port
        } else {
            self.discovery_port
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the config file.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Resolves the credential store directory: the configured override, or
/// `credentials/` next to the config file.
pub fn credential_dir(config: &AppConfig) -> Result<PathBuf, ConfigError> {
    match &config.storage.dir {
        Some(dir) => Ok(dir.clone()),
        None => Ok(config_dir()?.join("credentials")),
    }
}

/// Loads `AppConfig` from the platform config file, returning
/// `AppConfig::default()` if the file does not yet exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads `AppConfig` from `path`; a missing file yields the defaults.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Persists `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves the platform config directory, including the `ps-remote` subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("PsRemote"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("ps-remote"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("PsRemote")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_config_default_has_expected_ports() {
        // Arrange / Act
        let cfg = AppConfig::default();

        // Assert
        assert_eq!(cfg.network.discovery_port, 9302);
        assert_eq!(cfg.network.legacy_discovery_port, 987);
        assert_eq!(cfg.network.wake_source_port, 16690);
    }

    #[test]
    fn test_network_config_default_timings() {
        let net = NetworkConfig::default();
        assert_eq!(net.discovery_timeout(), Duration::from_secs(3));
        assert_eq!(net.send_interval(), Duration::from_millis(100));
        assert_eq!(net.wake_grace(), Duration::from_millis(2));
        assert_eq!(net.probe_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_port_for_selects_legacy_port() {
        let net = NetworkConfig::default();
        assert_eq!(net.port_for(false), 9302);
        assert_eq!(net.port_for(true), 987);
    }

    #[test]
    fn test_general_config_default_log_level_is_info() {
        assert_eq!(GeneralConfig::default().log_level, "info");
    }

    #[test]
    fn test_oauth_defaults_point_at_psn() {
        let oauth = OAuthConfig::default();
        assert!(oauth.token_url.ends_with("/2.0/oauth/token"));
        assert!(oauth.redirect_uri.starts_with("https://remoteplay.dl.playstation.net/"));
    }

    #[test]
    fn test_app_config_serializes_and_deserializes_round_trip() {
        // Arrange
        let mut cfg = AppConfig::default();
        cfg.network.discovery_timeout_ms = 5000;
        cfg.pairing.command = Some("/usr/local/bin/ps-pair".to_string());
        cfg.pairing.args = vec!["--verbose".to_string()];
        cfg.storage.dir = Some(PathBuf::from("/tmp/ps"));

        // Act
        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let restored: AppConfig = toml::from_str(&toml_str).expect("deserialize");

        // Assert
        assert_eq!(cfg, restored);
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let cfg: AppConfig = toml::from_str("[network]\nsend_interval_ms = 50\n").unwrap();

        assert_eq!(cfg.network.send_interval_ms, 50);
        assert_eq!(cfg.network.discovery_port, 9302);
        assert_eq!(cfg.general.log_level, "info");
        assert!(cfg.pairing.command.is_none());
    }

    #[test]
    fn test_empty_toml_is_default_config() {
        let cfg: AppConfig = toml::from_str("").unwrap();
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[network\n").unwrap();

        assert!(matches!(load_config_from(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_missing_file_returns_default() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&tmp.path().join("absent.toml")).unwrap();
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_save_then_load_from_disk() {
        // Arrange
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("config.toml");
        let mut cfg = AppConfig::default();
        cfg.general.log_level = "debug".to_string();

        // Act
        save_config_to(&path, &cfg).unwrap();
        let loaded = load_config_from(&path).unwrap();

        // Assert
        assert_eq!(loaded.general.log_level, "debug");
    }

    #[test]
    fn test_credential_dir_prefers_override() {
        let mut cfg = AppConfig::default();
        cfg.storage.dir = Some(PathBuf::from("/srv/ps"));
        assert_eq!(credential_dir(&cfg).unwrap(), PathBuf::from("/srv/ps"));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_config_file_path_ends_with_ps_remote_config() {
        if let Ok(path) = config_file_path() {
            assert!(path.ends_with("ps-remote/config.toml"));
        }
    }
}
