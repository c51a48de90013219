//! # Indexing Service
//!
//! `BlockchainIndexer` is the strategy the commit pipeline talks to. Exactly
//! one variant is selected at startup:
//!
//! | Variant | Index visibility | `create_indexes_sync` | `create_indexes_async` |
//! |---------|------------------|-----------------------|------------------------|
//! | `Sync`  | atomic with the block commit | folds entries into the caller's batch | `NotApplicable` |
//! | `Async` | after the worker catches up | `NotApplicable` | queues the block |
//!
//! Callers that need read-your-commit consistency check `is_synchronous()`
//! and, for the asynchronous variant, wait with `wait_until_indexed`.

mod async_indexer;
mod queries;
mod sync_indexer;

pub use async_indexer::{AsyncIndexer, IndexerProgress, WorkerFailure};
pub use queries::IndexQueries;
pub use sync_indexer::SyncIndexer;

use crate::domain::{ConfigError, IndexError, IndexerConfig, IndexingMode};
use crate::ports::inbound::{BlockchainIndexQueries, TransactionLocation};
use crate::ports::outbound::{IndexStore, WriteBatch};
use ledger_types::{Block, Hash};
use std::sync::Arc;
use tracing::Span;

/// The active indexing strategy.
pub enum BlockchainIndexer {
    Sync(SyncIndexer),
    Async(AsyncIndexer),
}

impl BlockchainIndexer {
    /// Build the strategy named by `config.mode`.
    ///
    /// `span` is the logging context for everything the indexer emits.
    pub fn from_config(
        config: &IndexerConfig,
        store: Arc<dyn IndexStore>,
        span: Span,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(match config.mode {
            IndexingMode::Synchronous => Self::Sync(SyncIndexer::new(store, span)),
            IndexingMode::Asynchronous => {
                Self::Async(AsyncIndexer::new(store, config.async_worker.clone(), span))
            }
        })
    }

    pub fn is_synchronous(&self) -> bool {
        matches!(self, Self::Sync(_))
    }

    /// Bring the strategy to a state where it accepts blocks.
    pub async fn start(&self) -> Result<(), IndexError> {
        match self {
            Self::Sync(_) => Ok(()),
            Self::Async(indexer) => indexer.start().await,
        }
    }

    /// Add `block`'s index entries to the commit batch (synchronous only).
    pub fn create_indexes_sync(
        &self,
        block: &Block,
        block_number: u64,
        block_hash: &Hash,
        batch: &mut WriteBatch,
    ) -> Result<(), IndexError> {
        match self {
            Self::Sync(indexer) => indexer.create_indexes_sync(block, block_number, block_hash, batch),
            Self::Async(indexer) => indexer.create_indexes_sync(),
        }
    }

    /// Hand a committed block to the background worker (asynchronous only).
    pub async fn create_indexes_async(
        &self,
        block: Arc<Block>,
        block_number: u64,
        block_hash: Hash,
    ) -> Result<(), IndexError> {
        match self {
            Self::Sync(indexer) => indexer.create_indexes_async(block, block_number, block_hash),
            Self::Async(indexer) => {
                indexer
                    .create_indexes_async(block, block_number, block_hash)
                    .await
            }
        }
    }

    /// Release background resources. No-op for the synchronous variant.
    pub async fn stop(&self) {
        if let Self::Async(indexer) = self {
            indexer.stop().await;
        }
    }

    pub fn queries(&self) -> &IndexQueries {
        match self {
            Self::Sync(indexer) => indexer.queries(),
            Self::Async(indexer) => indexer.queries(),
        }
    }
}

impl BlockchainIndexQueries for BlockchainIndexer {
    fn fetch_block_number_by_hash(&self, block_hash: &[u8]) -> Result<u64, IndexError> {
        self.queries().fetch_block_number_by_hash(block_hash)
    }

    fn fetch_transaction_location(&self, guid: &[u8]) -> Result<TransactionLocation, IndexError> {
        self.queries().fetch_transaction_location(guid)
    }

    fn fetch_address_tx_indexes(
        &self,
        address: &str,
        block_number: u64,
    ) -> Result<Vec<u64>, IndexError> {
        self.queries().fetch_address_tx_indexes(address, block_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryIndexStore;
    use crate::domain::AsyncIndexerConfig;

    fn store() -> Arc<dyn IndexStore> {
        Arc::new(InMemoryIndexStore::new())
    }

    #[test]
    fn test_default_config_selects_sync() {
        let indexer =
            BlockchainIndexer::from_config(&IndexerConfig::default(), store(), Span::none()).unwrap();
        assert!(indexer.is_synchronous());
    }

    #[test]
    fn test_async_config_selects_async() {
        let config = IndexerConfig::asynchronous(AsyncIndexerConfig::default());
        let indexer = BlockchainIndexer::from_config(&config, store(), Span::none()).unwrap();
        assert!(!indexer.is_synchronous());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = IndexerConfig::asynchronous(AsyncIndexerConfig::default().with_queue_capacity(0));
        assert!(BlockchainIndexer::from_config(&config, store(), Span::none()).is_err());
    }

    #[tokio::test]
    async fn test_async_variant_refuses_sync_path() {
        let config = IndexerConfig::asynchronous(AsyncIndexerConfig::default());
        let indexer = BlockchainIndexer::from_config(&config, store(), Span::none()).unwrap();
        let mut batch = WriteBatch::new();

        let result = indexer.create_indexes_sync(&Block::default(), 0, &[0; 32], &mut batch);

        assert!(matches!(result, Err(IndexError::NotApplicable { .. })));
        assert!(batch.is_empty());
    }

    #[tokio::test]
    async fn test_sync_lifecycle_is_noop() {
        let indexer =
            BlockchainIndexer::from_config(&IndexerConfig::default(), store(), Span::none()).unwrap();

        indexer.start().await.unwrap();
        let result = indexer
            .create_indexes_async(Arc::new(Block::default()), 0, [0; 32])
            .await;
        indexer.stop().await;

        assert!(matches!(result, Err(IndexError::NotApplicable { .. })));
    }
}
