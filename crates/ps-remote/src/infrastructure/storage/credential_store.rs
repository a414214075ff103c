//! Credential store implementations.
//!
//! [`FileCredentialStore`] keeps one JSON file per record under a directory
//! only the owning user can read:
//!
//! ```text
//! <dir>/
//! ├── session.json          current TokenData
//! └── hosts/
//!     └── <stem>.json       { "host-id": ..., "credential": { ... } }
//! ```
//!
//! A host id made only of ASCII letters, digits and `-` is used as the stem
//! verbatim.  Any other id is written as `_` followed by the lowercase hex of
//! its bytes, so distinct ids always get distinct files.
//!
//! Writes go to a temporary file in the same directory and are renamed into
//! place, so a reader never observes a half-written record.  On Unix the
//! directories are created `0700` and the files `0600`.
//!
//! [`MemoryCredentialStore`] keeps the same records in memory for tests and
//! short-lived tools.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ps_core::{Credential, TokenData};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::application::error::StoreError;
use crate::application::store::CredentialStore;

const SESSION_FILE: &str = "session.json";
const HOSTS_DIR: &str = "hosts";

/// On-disk shape of a per-console record.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct HostRecord {
    host_id: String,
    credential: Credential,
}

// ── File store ────────────────────────────────────────────────────────────────

/// JSON-file credential store rooted at a directory.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    dir: PathBuf,
}

impl FileCredentialStore {
    /// Creates a store rooted at `dir`; nothing is touched until the first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn session_path(&self) -> PathBuf {
        self.dir.join(SESSION_FILE)
    }

    fn hosts_dir(&self) -> PathBuf {
        self.dir.join(HOSTS_DIR)
    }

    fn host_path(&self, host_id: &str) -> PathBuf {
        self.hosts_dir().join(format!("{}.json", file_stem(host_id)))
    }
}

/// Maps a host id to a file stem, injectively.
///
/// Verbatim stems never contain `_`, so they cannot collide with the
/// `_`-prefixed hex form.
fn file_stem(host_id: &str) -> String {
    let plain = !host_id.is_empty() && host_id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-');
    if plain {
        return host_id.to_string();
    }
    let mut stem = String::with_capacity(1 + host_id.len() * 2);
    stem.push('_');
    for byte in host_id.bytes() {
        stem.push_str(&format!("{byte:02x}"));
    }
    stem
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_error(path, e)),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })
}

fn create_private_dir(dir: &Path) -> Result<(), StoreError> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(dir).map_err(|e| io_error(dir, e))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    create_private_dir(dir)?;

    let content = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp_path = dir.join(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4().simple()));

    let result = (|| -> std::io::Result<()> {
        let mut options = fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&tmp_path)?;
        file.write_all(&content)?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp_path);
        return Err(io_error(path, e));
    }
    debug!("wrote {}", path.display());
    Ok(())
}

impl CredentialStore for FileCredentialStore {
    fn load_session(&self) -> Result<Option<TokenData>, StoreError> {
        read_json(&self.session_path())
    }

    fn save_session(&self, session: &TokenData) -> Result<(), StoreError> {
        write_json(&self.session_path(), session)
    }

    fn load_credential(&self, host_id: &str) -> Result<Option<Credential>, StoreError> {
        let record: Option<HostRecord> = read_json(&self.host_path(host_id))?;
        // A record written by hand under the wrong name does not count.
        Ok(record
            .filter(|r| r.host_id == host_id)
            .map(|r| r.credential))
    }

    fn save_credential(&self, host_id: &str, credential: &Credential) -> Result<(), StoreError> {
        let record = HostRecord {
            host_id: host_id.to_string(),
            credential: credential.clone(),
        };
        write_json(&self.host_path(host_id), &record)
    }

    fn list_credentials(&self) -> Result<Vec<(String, Credential)>, StoreError> {
        let dir = self.hosts_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(&dir, e)),
        };

        let mut out = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| io_error(&dir, e))?.path();
            // Temporary files end in `.tmp` and are skipped here.
            if !path.extension().is_some_and(|ext| ext == "json") {
                continue;
            }
            match read_json::<HostRecord>(&path) {
                Ok(Some(record)) => out.push((record.host_id, record.credential)),
                Ok(None) => {}
                Err(e) => warn!("skipping unreadable credential record: {e}"),
            }
        }
        out.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(out)
    }
}

// ── In-memory store ───────────────────────────────────────────────────────────

/// Credential store that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    session: Mutex<Option<TokenData>>,
    credentials: Mutex<BTreeMap<String, Credential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `session`.
    pub fn with_session(session: TokenData) -> Self {
        Self {
            session: Mutex::new(Some(session)),
            credentials: Mutex::default(),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load_session(&self) -> Result<Option<TokenData>, StoreError> {
        Ok(self.session.lock().map_err(|_| StoreError::Poisoned)?.clone())
    }

    fn save_session(&self, session: &TokenData) -> Result<(), StoreError> {
        *self.session.lock().map_err(|_| StoreError::Poisoned)? = Some(session.clone());
        Ok(())
    }

    fn load_credential(&self, host_id: &str) -> Result<Option<Credential>, StoreError> {
        Ok(self
            .credentials
            .lock()
            .map_err(|_| StoreError::Poisoned)?
            .get(host_id)
            .cloned())
    }

    fn save_credential(&self, host_id: &str, credential: &Credential) -> Result<(), StoreError> {
        self.credentials
            .lock()
            .map_err(|_| StoreError::Poisoned)?
            .insert(host_id.to_string(), credential.clone());
        Ok(())
    }

    fn list_credentials(&self) -> Result<Vec<(String, Credential)>, StoreError> {
        Ok(self
            .credentials
            .lock()
            .map_err(|_| StoreError::Poisoned)?
            .iter()
            .map(|(id, c)| (id.clone(), c.clone()))
            .collect())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
