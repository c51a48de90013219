//! Builders and fault-injecting stores shared by unit and integration tests.

use crate::adapters::InMemoryIndexStore;
use crate::domain::IndexError;
use crate::ports::outbound::{IndexStore, StoreError, WriteBatch, CF_BLOCKS};
use crate::service::BlockchainIndexer;
use ledger_types::{Block, ChainletId, Hash, Transaction, TransactionType};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

pub fn execute_tx(guid: &str, address: &str) -> Transaction {
    Transaction::new(TransactionType::ChainletExecute, guid.as_bytes().to_vec(), address)
}

pub fn deploy_tx(guid: &str, address: &str, chainlet: &str, authorized: &[&str]) -> Transaction {
    Transaction::deployment(
        TransactionType::ChainletNew,
        guid.as_bytes().to_vec(),
        address,
        ChainletId::new(chainlet),
        authorized.iter().map(|a| a.to_string()).collect(),
    )
}

pub fn make_test_block(transactions: Vec<Transaction>) -> Block {
    Block::new(transactions)
}

/// Deterministic stand-in for the commit pipeline's block hash.
pub fn compute_test_block_hash(block: &Block, block_number: u64) -> Hash {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(block_number.to_le_bytes());
    if let Some(parent) = &block.previous_block_hash {
        hasher.update(parent);
    }
    for tx in block.transactions() {
        hasher.update(tx.guid());
        hasher.update(tx.executing_address().as_bytes());
    }
    hasher.finalize().into()
}

/// Key under which `commit_block` stores a block in `CF_BLOCKS`.
pub fn block_key(block_number: u64) -> Vec<u8> {
    block_number.to_be_bytes().to_vec()
}

/// Mimic the commit pipeline: one batch carrying the block record and, for
/// the synchronous strategy, its index entries.
pub async fn commit_block(
    store: &dyn IndexStore,
    indexer: &BlockchainIndexer,
    block: Block,
    block_number: u64,
    block_hash: Hash,
) -> Result<(), IndexError> {
    let mut batch = WriteBatch::new();
    batch.put_cf(CF_BLOCKS, block_key(block_number), block_hash.to_vec());

    if indexer.is_synchronous() {
        indexer.create_indexes_sync(&block, block_number, &block_hash, &mut batch)?;
        store.write_batch(batch)?;
    } else {
        store.write_batch(batch)?;
        indexer
            .create_indexes_async(Arc::new(block), block_number, block_hash)
            .await?;
    }
    Ok(())
}

/// Store wrapper that fails a configurable number of upcoming writes, or
/// all reads.
///
/// A failed write applies nothing.
#[derive(Default)]
pub struct FailingIndexStore {
    inner: InMemoryIndexStore,
    failing_writes: AtomicUsize,
    fail_reads: AtomicBool,
    write_attempts: AtomicUsize,
}

impl FailingIndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` calls to `write_batch`.
    pub fn fail_next_writes(&self, count: usize) {
        self.failing_writes.store(count, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn write_attempts(&self) -> usize {
        self.write_attempts.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &InMemoryIndexStore {
        &self.inner
    }
}

impl IndexStore for FailingIndexStore {
    fn get_cf(&self, cf: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Io {
                message: "injected read failure".into(),
            });
        }
        self.inner.get_cf(cf, key)
    }

    fn write_batch(&self, batch: WriteBatch) -> Result<(), StoreError> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        let injected = self
            .failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(StoreError::Io {
                message: "injected write failure".into(),
            });
        }
        self.inner.write_batch(batch)
    }
}
