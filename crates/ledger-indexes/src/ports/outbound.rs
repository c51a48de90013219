//! # Outbound Ports (Driven Ports)
//!
//! The key-value engine boundary. The host ledger implements `IndexStore` over
//! its primary database; the index layer only needs column-family-scoped point
//! reads and atomic batched writes.
//!
//! Production: `RocksDbIndexStore` (feature `rocksdb`)
//! Testing: `InMemoryIndexStore`

use thiserror::Error;

/// Column family holding committed blocks. Owned by the commit pipeline.
pub const CF_BLOCKS: &str = "blocks";

/// Column family holding every secondary index entry.
///
/// Only the active indexer writes here.
pub const CF_INDEXES: &str = "indexes";

/// All column families a ledger database must provide.
pub const COLUMN_FAMILIES: &[&str] = &[CF_BLOCKS, CF_INDEXES];

/// Abstract interface for the ledger's key-value engine.
///
/// Implementations must be safe to read from while a batch is being written:
/// index keys are written once and never mutated, so a reader sees either the
/// whole batch or none of it.
pub trait IndexStore: Send + Sync {
    /// Point read of `key` within column family `cf`.
    fn get_cf(&self, cf: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    /// Execute an atomic batch write.
    ///
    /// Either ALL operations in the batch are applied, or NONE are.
    fn write_batch(&self, batch: WriteBatch) -> Result<(), StoreError>;
}

/// Batch operation for atomic writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOperation {
    /// Put a key-value pair into a column family.
    Put {
        cf: &'static str,
        key: Vec<u8>,
        value: Vec<u8>,
    },
    /// Delete a key from a column family.
    Delete { cf: &'static str, key: Vec<u8> },
}

impl BatchOperation {
    /// Create a Put operation.
    pub fn put(cf: &'static str, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Put {
            cf,
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create a Delete operation.
    pub fn delete(cf: &'static str, key: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Delete { cf, key: key.into() }
    }

    /// Column family this operation targets.
    pub fn cf(&self) -> &'static str {
        match self {
            BatchOperation::Put { cf, .. } | BatchOperation::Delete { cf, .. } => cf,
        }
    }
}

/// An ordered set of writes committed as one unit.
///
/// The synchronous indexer appends its entries to the same batch the commit
/// pipeline uses for the block itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    operations: Vec<BatchOperation>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_cf(&mut self, cf: &'static str, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.operations.push(BatchOperation::put(cf, key, value));
    }

    pub fn delete_cf(&mut self, cf: &'static str, key: impl Into<Vec<u8>>) {
        self.operations.push(BatchOperation::delete(cf, key));
    }

    pub fn push(&mut self, operation: BatchOperation) {
        self.operations.push(operation);
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn operations(&self) -> &[BatchOperation] {
        &self.operations
    }

    pub fn into_operations(self) -> Vec<BatchOperation> {
        self.operations
    }
}

impl Extend<BatchOperation> for WriteBatch {
    fn extend<I: IntoIterator<Item = BatchOperation>>(&mut self, iter: I) {
        self.operations.extend(iter);
    }
}

/// Key-value engine errors, propagated unchanged to callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// I/O error during read/write.
    #[error("store I/O error: {message}")]
    Io { message: String },

    /// Data corruption detected by the engine.
    #[error("store corruption: {message}")]
    Corruption { message: String },

    /// The batch or read names a column family the store does not have.
    #[error("unknown column family: {name}")]
    UnknownColumnFamily { name: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_batch_preserves_order() {
        let mut batch = WriteBatch::new();
        batch.put_cf(CF_BLOCKS, b"b".to_vec(), b"1".to_vec());
        batch.put_cf(CF_INDEXES, b"i".to_vec(), b"2".to_vec());
        batch.delete_cf(CF_INDEXES, b"x".to_vec());

        assert_eq!(batch.len(), 3);
        let cfs: Vec<_> = batch.operations().iter().map(BatchOperation::cf).collect();
        assert_eq!(cfs, vec![CF_BLOCKS, CF_INDEXES, CF_INDEXES]);
    }

    #[test]
    fn test_extend_batch() {
        let mut batch = WriteBatch::new();
        batch.extend(vec![
            BatchOperation::put(CF_INDEXES, b"a".to_vec(), b"1".to_vec()),
            BatchOperation::put(CF_INDEXES, b"b".to_vec(), b"2".to_vec()),
        ]);
        assert_eq!(batch.into_operations().len(), 2);
    }
}
