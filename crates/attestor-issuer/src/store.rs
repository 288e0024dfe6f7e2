//! Durable backends for the identity record.
//!
//! A backend commits whole snapshots: after `commit` returns, the new record
//! is durable, and a failure at any point leaves the previous snapshot as
//! the one `load` returns.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use attestor_core::IdentityRecord;

use crate::error::IssuerError;

/// Logical key the identity record is stored under.
pub const IDENTITY_RECORD_KEY: &str = "issuer-identity";

/// Snapshot store for the identity record.
pub trait IdentityStore: Send + Sync {
    /// Last committed snapshot, or `None` on first run.
    fn load(&self) -> Result<Option<IdentityRecord>, IssuerError>;

    /// Atomically replace the committed snapshot.
    fn commit(&self, record: &IdentityRecord) -> Result<(), IssuerError>;
}

/// JSON file backend using write-temp-then-rename.
pub struct FileIdentityStore {
    path: PathBuf,
}

impl FileIdentityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<data_dir>/identity.json`.
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join("identity.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| IDENTITY_RECORD_KEY.into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl IdentityStore for FileIdentityStore {
    fn load(&self) -> Result<Option<IdentityRecord>, IssuerError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path)?;
        let record: IdentityRecord = serde_json::from_str(&contents).map_err(|e| {
            IssuerError::Storage(format!(
                "corrupt identity record at {}: {}",
                self.path.display(),
                e
            ))
        })?;
        Ok(Some(record))
    }

    fn commit(&self, record: &IdentityRecord) -> Result<(), IssuerError> {
        let dir = self.path.parent().filter(|p| !p.as_os_str().is_empty());
        if let Some(dir) = dir {
            fs::create_dir_all(dir)?;
        }

        let temp = self.temp_path();
        let bytes = serde_json::to_vec_pretty(record)?;
        {
            let mut file = File::create(&temp)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&temp, &self.path)?;

        if let Some(dir) = dir {
            if let Err(e) = sync_dir(dir) {
                tracing::warn!(
                    path = %dir.display(),
                    error = %e,
                    "directory sync failed, rename may not be durable"
                );
            }
        }

        tracing::debug!(path = %self.path.display(), "identity record committed");
        Ok(())
    }
}

/// Persist a rename by syncing the containing directory.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> std::io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

/// In-memory backend for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryIdentityStore {
    committed: Mutex<Option<IdentityRecord>>,
    fail_next: AtomicBool,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing committed snapshot.
    pub fn with_record(record: IdentityRecord) -> Self {
        Self {
            committed: Mutex::new(Some(record)),
            fail_next: AtomicBool::new(false),
        }
    }

    /// Make the next commit fail as if the process died mid-write.
    pub fn fail_next_commit(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

impl IdentityStore for MemoryIdentityStore {
    fn load(&self) -> Result<Option<IdentityRecord>, IssuerError> {
        Ok(self
            .committed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn commit(&self, record: &IdentityRecord) -> Result<(), IssuerError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(IssuerError::Storage("simulated crash during commit".into()));
        }
        *self.committed.lock().unwrap_or_else(PoisonError::into_inner) = Some(record.clone());
        Ok(())
    }
}

impl<S: IdentityStore + ?Sized> IdentityStore for std::sync::Arc<S> {
    fn load(&self) -> Result<Option<IdentityRecord>, IssuerError> {
        (**self).load()
    }

    fn commit(&self, record: &IdentityRecord) -> Result<(), IssuerError> {
        (**self).commit(record)
    }
}
