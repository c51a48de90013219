//! # Blockchain Secondary Indexes
//!
//! Derives point-lookup indexes from finalized blocks and persists them in the
//! ledger's `indexes` column family.
//!
//! ```text
//! Commit pipeline ──(block, number, hash)──→ BlockchainIndexer
//!                                                  │
//!                                      extract_indexes (pure)
//!                                                  │
//!                      ┌───────────────────────────┴─────────────────────────┐
//!                      ↓ Sync                                                ↓ Async
//!          caller's WriteBatch (block + indexes)                 worker queue → own WriteBatch
//!                      └───────────────────────────┬─────────────────────────┘
//!                                                  ↓
//!                                    IndexStore (CF "indexes")
//!                                                  ↑
//!                                     IndexQueries (point lookups)
//! ```
//!
//! ## Index Families
//!
//! | Prefix | Key | Value |
//! |--------|-----|-------|
//! | `0x01` | block hash | block number |
//! | `0x02` | transaction GUID | (block number, index in block) |
//! | `0x03` | (address, block number) | indexes of the address's transactions in that block |
//!
//! ## Invariants
//!
//! | Invariant | Enforcement |
//! |-----------|-------------|
//! | Families never collide | one-byte key prefix (`domain::codec`) |
//! | Entries derive only from their block | `extract_indexes` is pure |
//! | Sync indexes commit with the block | entries join the caller's batch |
//! | Async indexes appear in block order | single FIFO worker, gap-free submissions, resume at `indexed_through + 1` |
//! | Corrupt values surface | decoders return `MalformedValue`, never zero |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - codec, extractor, config, errors
//! - `ports/` - inbound query trait, outbound store trait
//! - `adapters/` - in-memory and RocksDB stores
//! - `service/` - indexing strategies and query façade
//!
//! ## Usage
//!
//! ```ignore
//! use ledger_indexes::{BlockchainIndexer, IndexerConfig, InMemoryIndexStore, WriteBatch};
//!
//! let store = Arc::new(InMemoryIndexStore::new());
//! let indexer = BlockchainIndexer::from_config(&IndexerConfig::default(), store.clone(), span)?;
//!
//! let mut batch = WriteBatch::new();
//! batch.put_cf(CF_BLOCKS, key, block_bytes);
//! indexer.create_indexes_sync(&block, number, &hash, &mut batch)?;
//! store.write_batch(batch)?;
//!
//! let n = indexer.fetch_block_number_by_hash(&hash)?;
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export key types for convenience
pub use adapters::InMemoryIndexStore;
#[cfg(feature = "rocksdb")]
pub use adapters::{RocksDbConfig, RocksDbIndexStore};
pub use domain::{
    extract_indexes, AsyncIndexerConfig, Backpressure, ConfigError, DecodeError, ExtractedIndexes,
    IndexEntry, IndexError, IndexFamily, IndexResult, IndexerConfig, IndexingMode, ShutdownMode,
};
pub use ports::{
    BatchOperation, BlockchainIndexQueries, IndexStore, StoreError, TransactionLocation,
    WriteBatch, CF_BLOCKS, CF_INDEXES, COLUMN_FAMILIES,
};
pub use service::{
    AsyncIndexer, BlockchainIndexer, IndexQueries, IndexerProgress, SyncIndexer, WorkerFailure,
};
