//! External pairing collaborator.
//!
//! Console registration is a separate encrypted exchange that PS-Remote does
//! not implement itself.  [`CommandPairer`] delegates it to a configured
//! program, invoked as:
//!
//! ```text
//! <command> <args...> --host <ip> --pin <pin> --account-id <base64 id>
//! ```
//!
//! On success the program exits 0 and prints the credential as JSON on
//! stdout, using the same kebab-case field names the credential store writes
//! (`app-type`, `auth-type`, `user-credential`, ...).  On failure it exits
//! non-zero and explains why on stderr; well-known reasons are mapped to the
//! matching [`PairingError`] so the user gets the right remediation text.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use ps_core::Credential;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::application::error::PairingError;
use crate::application::pairing::{Pairer, PairingTarget};

/// How long the pairing program may run.
pub const DEFAULT_PAIRING_TIMEOUT: Duration = Duration::from_secs(60);

/// Runs an external program to pair with a console.
#[derive(Debug, Clone)]
pub struct CommandPairer {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandPairer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout: DEFAULT_PAIRING_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn command(&self, target: &PairingTarget, pin: &str, account_id: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg("--host")
            .arg(target.ip_address.to_string())
            .arg("--pin")
            .arg(pin)
            .arg("--account-id")
            .arg(account_id)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

/// Maps the pairing program's stderr to a typed failure.
fn classify_failure(host: &str, stderr: &str) -> PairingError {
    let lower = stderr.to_ascii_lowercase();
    if lower.contains("pin") && ["wrong", "invalid", "incorrect", "reject"].iter().any(|w| lower.contains(w)) {
        PairingError::BadPin
    } else if ["not awake", "standby", "rest mode"].iter().any(|w| lower.contains(w)) {
        PairingError::NotAwake {
            host: host.to_string(),
        }
    } else if ["unreachable", "timed out", "timeout", "no route"].iter().any(|w| lower.contains(w)) {
        PairingError::Unreachable {
            host: host.to_string(),
        }
    } else {
        let detail = stderr.trim();
        PairingError::Failed(if detail.is_empty() {
            "pairing program exited with an error and no message".to_string()
        } else {
            detail.to_string()
        })
    }
}

#[async_trait]
impl Pairer for CommandPairer {
    async fn pair(
        &self,
        target: &PairingTarget,
        pin: &str,
        account_id: &str,
    ) -> Result<Credential, PairingError> {
        let host = target.ip_address.to_string();
        debug!("running pairing program {} for {host}", self.program);

        let mut cmd = self.command(target, pin, account_id);
        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(PairingError::Failed(format!(
                    "could not run pairing program {:?}: {e}",
                    self.program
                )))
            }
            Err(_) => return Err(PairingError::Unreachable { host }),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("pairing program failed for {host} ({})", output.status);
            return Err(classify_failure(&host, &stderr));
        }

        serde_json::from_slice(&output.stdout).map_err(|e| {
            PairingError::Failed(format!("pairing program printed an unreadable credential: {e}"))
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
