//! # RocksDB Index Store
//!
//! Production `IndexStore` over RocksDB.
//!
//! ## Column Families
//!
//! - `blocks` - committed blocks (written by the commit pipeline)
//! - `indexes` - secondary index entries (written by the indexer)
//!
//! Batches map one-to-one onto `rocksdb::WriteBatch`, so block and index
//! writes sharing a batch land atomically.

use crate::domain::IndexFamily;
use crate::ports::outbound::{
    BatchOperation, IndexStore, StoreError, WriteBatch, CF_INDEXES, COLUMN_FAMILIES,
};
use parking_lot::RwLock;
use rocksdb::{ColumnFamilyDescriptor, Options, DB};
use tracing::trace;

/// RocksDB configuration
#[derive(Debug, Clone)]
pub struct RocksDbConfig {
    /// Path to the database directory
    pub path: String,
    /// Block cache size in bytes (default: 256MB)
    pub block_cache_size: usize,
    /// Write buffer size in bytes (default: 64MB)
    pub write_buffer_size: usize,
    /// Enable fsync after each write (default: true for durability)
    pub sync_writes: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            path: "./data/ledger".to_string(),
            block_cache_size: 256 * 1024 * 1024, // 256MB
            write_buffer_size: 64 * 1024 * 1024, // 64MB
            sync_writes: true,
        }
    }
}

impl RocksDbConfig {
    /// Create config for testing (smaller buffers, no sync)
    pub fn for_testing(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            block_cache_size: 8 * 1024 * 1024,  // 8MB
            write_buffer_size: 4 * 1024 * 1024, // 4MB
            sync_writes: false,
        }
    }
}

/// RocksDB-backed ledger store
pub struct RocksDbIndexStore {
    db: RwLock<DB>,
    config: RocksDbConfig,
}

impl RocksDbIndexStore {
    /// Open or create the database with every ledger column family.
    pub fn open(config: RocksDbConfig) -> Result<Self, StoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_write_buffer_size(config.write_buffer_size);

        // Index reads are point lookups.
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        block_opts.set_block_cache(&rocksdb::Cache::new_lru_cache(config.block_cache_size));
        opts.set_block_based_table_factory(&block_opts);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = COLUMN_FAMILIES
            .iter()
            .map(|name| {
                let mut cf_opts = Options::default();
                cf_opts.set_compression_type(rocksdb::DBCompressionType::Snappy);
                ColumnFamilyDescriptor::new(*name, cf_opts)
            })
            .collect();

        let db = DB::open_cf_descriptors(&opts, &config.path, cf_descriptors).map_err(|e| {
            StoreError::Io {
                message: format!("Failed to open RocksDB: {}", e),
            }
        })?;

        Ok(Self {
            db: RwLock::new(db),
            config,
        })
    }

    pub fn path(&self) -> &str {
        &self.config.path
    }
}

fn unknown_cf(name: &str) -> StoreError {
    StoreError::UnknownColumnFamily {
        name: name.to_string(),
    }
}

impl IndexStore for RocksDbIndexStore {
    fn get_cf(&self, cf: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        let db = self.db.read();
        let handle = db.cf_handle(cf).ok_or_else(|| unknown_cf(cf))?;
        db.get_cf(handle, key).map_err(|e| StoreError::Io {
            message: format!("RocksDB get failed: {}", e),
        })
    }

    fn write_batch(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let db = self.db.write();
        let mut rocks_batch = rocksdb::WriteBatch::default();

        for op in batch.into_operations() {
            let cf = op.cf();
            let handle = db.cf_handle(cf).ok_or_else(|| unknown_cf(cf))?;
            match op {
                BatchOperation::Put { key, value, .. } => {
                    if cf == CF_INDEXES {
                        if let Some(family) = IndexFamily::of_key(&key) {
                            trace!(%family, key = %hex::encode(&key), "put index entry");
                        }
                    }
                    rocks_batch.put_cf(handle, &key, &value);
                }
                BatchOperation::Delete { key, .. } => {
                    rocks_batch.delete_cf(handle, &key);
                }
            }
        }

        let mut write_opts = rocksdb::WriteOptions::default();
        write_opts.set_sync(self.config.sync_writes);

        db.write_opt(rocks_batch, &write_opts)
            .map_err(|e| StoreError::Io {
                message: format!("RocksDB batch write failed: {}", e),
            })
    }
}
