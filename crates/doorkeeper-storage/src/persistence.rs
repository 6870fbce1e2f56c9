//! Persistence gateway for the credential store.
//!
//! A save always rewrites the complete record collection. Both backends use
//! the same JSON encoding: an array of `{uid, key}` objects with uppercase
//! hex strings.

#![allow(async_fn_in_trait)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::error::{StorageError, StorageResult};
use crate::record::CredentialRecord;

/// Durable storage for the credential collection.
///
/// Implementations report malformed contents as [`StorageError::Corrupt`]
/// and a missing backing object as an empty collection.
pub trait CredentialPersistence: Send + Sync {
    /// Read every stored record.
    async fn load(&mut self) -> StorageResult<Vec<CredentialRecord>>;

    /// Replace the stored collection with `records`.
    async fn save(&mut self, records: &[CredentialRecord]) -> StorageResult<()>;

    /// Where the records live, for log lines.
    fn describe(&self) -> String;
}

fn decode(raw: &str) -> StorageResult<Vec<CredentialRecord>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(raw).map_err(|e| StorageError::Corrupt(e.to_string()))
}

fn encode(records: &[CredentialRecord]) -> StorageResult<String> {
    Ok(serde_json::to_string_pretty(records)?)
}

/// JSON file on local storage.
///
/// Saves go through a sibling temporary file and a rename so a crash mid-write
/// leaves the previous contents intact.
#[derive(Debug, Clone)]
pub struct JsonFilePersistence {
    path: PathBuf,
}

impl JsonFilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "credentials".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl CredentialPersistence for JsonFilePersistence {
    async fn load(&mut self) -> StorageResult<Vec<CredentialRecord>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => decode(&raw),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No credential file yet");
                Ok(Vec::new())
            }
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                Err(StorageError::Corrupt(e.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&mut self, records: &[CredentialRecord]) -> StorageResult<()> {
        let contents = encode(records)?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let temp = self.temp_path();
        tokio::fs::write(&temp, contents).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        trace!(path = %self.path.display(), count = records.len(), "Credential file written");
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    contents: Option<String>,
    fail_saves: bool,
    save_count: usize,
}

/// In-memory persistence holding the JSON text, with failure injection.
///
/// # Examples
///
/// ```
/// use doorkeeper_storage::{CredentialPersistence, MemoryPersistence};
///
/// # #[tokio::main]
/// # async fn main() -> doorkeeper_storage::StorageResult<()> {
/// let (mut persistence, handle) = MemoryPersistence::new();
/// persistence.save(&[]).await?;
/// assert_eq!(handle.save_count(), 1);
///
/// handle.set_save_failure(true);
/// assert!(persistence.save(&[]).await.is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MemoryPersistence {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryPersistence {
    pub fn new() -> (Self, MemoryPersistenceHandle) {
        let state = Arc::new(Mutex::new(MemoryState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            MemoryPersistenceHandle { state },
        )
    }
}

impl CredentialPersistence for MemoryPersistence {
    async fn load(&mut self) -> StorageResult<Vec<CredentialRecord>> {
        match self.state.lock().contents.as_deref() {
            Some(raw) => decode(raw),
            None => Ok(Vec::new()),
        }
    }

    async fn save(&mut self, records: &[CredentialRecord]) -> StorageResult<()> {
        let contents = encode(records)?;
        let mut state = self.state.lock();
        if state.fail_saves {
            return Err(StorageError::WriteRejected("injected save failure".into()));
        }
        state.contents = Some(contents);
        state.save_count += 1;
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Handle controlling a [`MemoryPersistence`].
#[derive(Debug, Clone)]
pub struct MemoryPersistenceHandle {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryPersistenceHandle {
    /// Replace the stored text, e.g. with garbage to simulate corruption.
    pub fn set_raw(&self, raw: impl Into<String>) {
        self.state.lock().contents = Some(raw.into());
    }

    pub fn raw(&self) -> Option<String> {
        self.state.lock().contents.clone()
    }

    /// Records from the last successful save.
    pub fn saved_records(&self) -> Option<Vec<CredentialRecord>> {
        self.raw().and_then(|raw| decode(&raw).ok())
    }

    pub fn set_save_failure(&self, fail: bool) {
        self.state.lock().fail_saves = fail;
    }

    pub fn save_count(&self) -> usize {
        self.state.lock().save_count
    }
}

/// Enum wrapper for persistence backend dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyPersistence {
    JsonFile(JsonFilePersistence),
    Memory(MemoryPersistence),
}

impl From<JsonFilePersistence> for AnyPersistence {
    fn from(persistence: JsonFilePersistence) -> Self {
        Self::JsonFile(persistence)
    }
}

impl From<MemoryPersistence> for AnyPersistence {
    fn from(persistence: MemoryPersistence) -> Self {
        Self::Memory(persistence)
    }
}

impl CredentialPersistence for AnyPersistence {
    async fn load(&mut self) -> StorageResult<Vec<CredentialRecord>> {
        match self {
            Self::JsonFile(backend) => backend.load().await,
            Self::Memory(backend) => backend.load().await,
        }
    }

    async fn save(&mut self, records: &[CredentialRecord]) -> StorageResult<()> {
        match self {
            Self::JsonFile(backend) => backend.save(records).await,
            Self::Memory(backend) => backend.save(records).await,
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::JsonFile(backend) => backend.describe(),
            Self::Memory(backend) => backend.describe(),
        }
    }
}
