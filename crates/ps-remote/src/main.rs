//! PS-Remote command-line entry point.
//!
//! Discovers PlayStation consoles on the local network, pairs with them, and
//! wakes them from rest mode.
//!
//! # Usage
//!
//! ```text
//! ps-remote login-url                      print the browser login URL
//! ps-remote auth <redirect-url-or-code>    finish login with the pasted redirect
//! ps-remote whoami                         show the logged-in account
//! ps-remote logout
//! ps-remote discover [--ps4] [--timeout-ms N]
//! ps-remote status <ip> [--ps4]
//! ps-remote pair --host <ip> --pin <pin> [--account-id <id>]
//! ps-remote wake <ip> [--ps4]
//! ps-remote credentials                    list paired consoles
//! ```
//!
//! # Wiring
//!
//! ```text
//! main()
//!  └─ load AppConfig (TOML)            --config / PS_REMOTE_CONFIG
//!  └─ FileCredentialStore              --store-dir / PS_REMOTE_STORE_DIR
//!  └─ TokenLifecycle(PsnOAuthClient)
//!  └─ subcommand
//!       ├─ DiscoveryEngine(PingProbe)
//!       ├─ RegisterConsoleUseCase(CommandPairer)
//!       └─ WakeConsoleUseCase(WakeDispatcher)
//! ```

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use ps_core::{Console, ConsoleKind};
use ps_remote::application::pairing::{PairingTarget, RegisterConsoleUseCase};
use ps_remote::application::store::CredentialStore;
use ps_remote::application::token_lifecycle::TokenLifecycle;
use ps_remote::application::wake_console::{DiscoverySession, WakeConsoleUseCase};
use ps_remote::application::{PairingError, RemoteError};
use ps_remote::infrastructure::network::discovery::{DiscoveryConfig, DiscoveryEngine, SearchTargets};
use ps_remote::infrastructure::network::liveness::PingProbe;
use ps_remote::infrastructure::network::wake::WakeDispatcher;
use ps_remote::infrastructure::oauth::PsnOAuthClient;
use ps_remote::infrastructure::pairing::CommandPairer;
use ps_remote::infrastructure::storage::config::{self, AppConfig};
use ps_remote::infrastructure::storage::credential_store::FileCredentialStore;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Discover, pair, and wake PlayStation consoles on the local network.
#[derive(Debug, Parser)]
#[command(name = "ps-remote", version)]
struct Cli {
    /// Configuration file; defaults to the platform config directory.
    #[arg(long, global = true, env = "PS_REMOTE_CONFIG")]
    config: Option<PathBuf>,

    /// Credential store directory; overrides `[storage] dir`.
    #[arg(long, global = true, env = "PS_REMOTE_STORE_DIR")]
    store_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the URL to open in a browser to sign in.
    LoginUrl,
    /// Finish signing in with the redirect URL (or bare code) from the browser.
    Auth {
        redirect: String,
    },
    /// Show the signed-in account, refreshing the session if it expired.
    Whoami,
    /// Forget the stored session.
    Logout,
    /// Broadcast a search and list the consoles that answer.
    Discover {
        /// Search on the legacy PS4 port.
        #[arg(long)]
        ps4: bool,
        /// Scan duration; defaults to `[network] discovery_timeout_ms`.
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Ask one console for its status.
    Status {
        host: Ipv4Addr,
        #[arg(long)]
        ps4: bool,
    },
    /// Pair with an awake console using the PIN it displays.
    Pair {
        #[arg(long)]
        host: Ipv4Addr,
        #[arg(long)]
        pin: String,
        /// Base64 account id; defaults to the signed-in account.
        #[arg(long)]
        account_id: Option<String>,
        #[arg(long)]
        ps4: bool,
    },
    /// Wake a paired console from rest mode.
    Wake {
        host: Ipv4Addr,
        #[arg(long)]
        ps4: bool,
    },
    /// List paired consoles.
    Credentials,
}

fn console_kind(ps4: bool) -> ConsoleKind {
    if ps4 {
        ConsoleKind::Ps4
    } else {
        ConsoleKind::Ps5
    }
}

fn print_console(console: &Console) {
    println!(
        "{:<16} {:<8} {:<24} {:<8} {} {}",
        console.ip_address,
        console.status,
        console.host_name,
        console.host_type,
        console.host_id,
        console.system_version
    );
}

// ── Service wiring ────────────────────────────────────────────────────────────

struct Services {
    config: AppConfig,
    store: Arc<dyn CredentialStore>,
    tokens: Arc<TokenLifecycle>,
}

impl Services {
    fn new(config: AppConfig, store_dir: Option<PathBuf>) -> anyhow::Result<Self> {
        let dir = match store_dir {
            Some(dir) => dir,
            None => config::credential_dir(&config).context("resolving credential store directory")?,
        };
        let store: Arc<dyn CredentialStore> = Arc::new(FileCredentialStore::new(dir));
        let provider = Arc::new(PsnOAuthClient::new(config.oauth.clone()));
        let tokens = Arc::new(TokenLifecycle::new(provider, Arc::clone(&store)));
        Ok(Self {
            config,
            store,
            tokens,
        })
    }

    fn discovery(&self) -> DiscoveryEngine {
        DiscoveryEngine::new(Arc::new(PingProbe::new(self.config.network.probe_timeout())))
    }

    fn discovery_config(&self, kind: ConsoleKind, timeout_ms: Option<u64>) -> DiscoveryConfig {
        let net = &self.config.network;
        DiscoveryConfig {
            port: net.port_for(kind == ConsoleKind::Ps4),
            timeout: timeout_ms.map_or_else(|| net.discovery_timeout(), Duration::from_millis),
            send_interval: net.send_interval(),
            targets: SearchTargets::LocalBroadcast,
        }
    }

    /// Runs a unicast status query and wraps the answer in a session.
    async fn scan_host(&self, host: Ipv4Addr, kind: ConsoleKind) -> Result<DiscoverySession, RemoteError> {
        let net = &self.config.network;
        let console = self
            .discovery()
            .query_host(host, net.port_for(kind == ConsoleKind::Ps4), net.discovery_timeout())
            .await?;
        Ok(DiscoverySession::new(kind, console.into_iter().collect()))
    }

    fn wake_use_case(&self) -> WakeConsoleUseCase {
        let net = &self.config.network;
        let dispatcher = WakeDispatcher::new(net.wake_source_port, net.wake_grace());
        WakeConsoleUseCase::new(Arc::clone(&self.store), Arc::new(dispatcher))
    }
}

// ── Subcommands ───────────────────────────────────────────────────────────────

async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    let services = Services::new(config, cli.store_dir)?;

    match cli.command {
        Command::LoginUrl => {
            let client = PsnOAuthClient::new(services.config.oauth.clone());
            println!("{}", client.authorization_url()?);
        }

        Command::Auth { redirect } => {
            let session = services
                .tokens
                .complete_authentication(&redirect)
                .await
                .context("completing authentication")?;
            match session.user_info {
                Some(user) => println!("signed in as {} (account id {})", user.online_id, user.account_id),
                None => println!("signed in"),
            }
        }

        Command::Whoami => {
            services.tokens.ensure_valid_access_token().await?;
            let user = services.tokens.current_user_info()?;
            println!("online id:  {}", user.online_id);
            println!("user id:    {}", user.user_id);
            println!("account id: {}", user.account_id);
        }

        Command::Logout => {
            services.tokens.logout()?;
            println!("signed out");
        }

        Command::Discover { ps4, timeout_ms } => {
            let kind = console_kind(ps4);
            let consoles = services
                .discovery()
                .discover(&services.discovery_config(kind, timeout_ms))
                .await
                .context("discovery scan failed")?;
            if consoles.is_empty() {
                return Err(RemoteError::NotFound("no consoles answered the discovery scan".to_string()).into());
            }
            for console in &consoles {
                print_console(console);
            }
        }

        Command::Status { host, ps4 } => {
            let session = services.scan_host(host, console_kind(ps4)).await?;
            match session.consoles().first() {
                Some(console) => print_console(console),
                None => return Err(RemoteError::NotFound(format!("no console answered at {host}")).into()),
            }
        }

        Command::Pair {
            host,
            pin,
            account_id,
            ps4,
        } => {
            let Some(command) = services.config.pairing.command.clone() else {
                bail!("no pairing program configured; set [pairing] command in the config file");
            };
            let session = services.scan_host(host, console_kind(ps4)).await?;
            let console = session
                .find_by_ip(IpAddr::V4(host))
                .ok_or_else(|| PairingError::Unreachable { host: host.to_string() })?;

            let pairer = Arc::new(CommandPairer::new(command, services.config.pairing.args.clone()));
            let use_case = RegisterConsoleUseCase::new(pairer, Arc::clone(&services.store), Arc::clone(&services.tokens));
            use_case
                .register(&PairingTarget::from(console), &pin, account_id.as_deref())
                .await?;
            println!("paired {} ({})", console.host_name, console.host_id);
        }

        Command::Wake { host, ps4 } => {
            let session = services.scan_host(host, console_kind(ps4)).await?;
            info!("discovery session {} found {} console(s)", session.id(), session.consoles().len());
            let console = services
                .wake_use_case()
                .wake_discovered(&session, IpAddr::V4(host))
                .await?;
            println!("wake request sent to {} ({})", console.host_name, console.ip_address);
        }

        Command::Credentials => {
            let credentials = services.store.list_credentials()?;
            if credentials.is_empty() {
                println!("no paired consoles");
            }
            for (host_id, credential) in credentials {
                println!("{host_id}  auth-type {}  account {}", credential.auth_type, credential.account_id);
            }
        }
    }

    Ok(())
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => config::load_config_from(path),
        None => config::load_config(),
    }
    .context("loading configuration")?;

    // `RUST_LOG` wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.general.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    run(cli, config).await
}
