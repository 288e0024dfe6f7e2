//! RocksDB storage backend for the identity record.

use anyhow::Result;
use rocksdb::{ColumnFamilyDescriptor, Options, WriteOptions, DB};
use std::path::Path;

use attestor_core::IdentityRecord;
use attestor_issuer::{IdentityStore, IssuerError, IDENTITY_RECORD_KEY};

/// Column family holding the identity record.
const CF_IDENTITY: &str = "identity";

/// RocksDB-backed identity store. Each commit is a single synced put, so
/// a reader sees either the previous snapshot or the new one.
pub struct RocksDbIdentityStore {
    db: DB,
}

impl RocksDbIdentityStore {
    /// Open or create a RocksDB database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)?;

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors = vec![ColumnFamilyDescriptor::new(CF_IDENTITY, Options::default())];
        let db = DB::open_cf_descriptors(&opts, path, cf_descriptors)?;

        Ok(Self { db })
    }

    fn cf(&self) -> Result<&rocksdb::ColumnFamily, IssuerError> {
        self.db
            .cf_handle(CF_IDENTITY)
            .ok_or_else(|| IssuerError::Storage(format!("column family '{}' not found", CF_IDENTITY)))
    }
}

impl IdentityStore for RocksDbIdentityStore {
    fn load(&self) -> Result<Option<IdentityRecord>, IssuerError> {
        let cf = self.cf()?;
        let bytes = self
            .db
            .get_cf(cf, IDENTITY_RECORD_KEY.as_bytes())
            .map_err(|e| IssuerError::Storage(e.to_string()))?;
        match bytes {
            Some(bytes) => {
                let record = serde_json::from_slice(&bytes).map_err(|e| {
                    IssuerError::Storage(format!("corrupt identity record in RocksDB: {}", e))
                })?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    fn commit(&self, record: &IdentityRecord) -> Result<(), IssuerError> {
        let cf = self.cf()?;
        let bytes = serde_json::to_vec(record)?;
        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(true);
        self.db
            .put_cf_opt(cf, IDENTITY_RECORD_KEY.as_bytes(), bytes, &write_opts)
            .map_err(|e| IssuerError::Storage(e.to_string()))?;
        tracing::debug!(key = IDENTITY_RECORD_KEY, "identity record committed to RocksDB");
        Ok(())
    }
}
