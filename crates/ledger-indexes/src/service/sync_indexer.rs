//! Synchronous indexing: index entries ride in the block's own write batch.

use crate::domain::{extract_indexes, IndexError};
use crate::ports::outbound::{IndexStore, WriteBatch};
use crate::service::queries::IndexQueries;
use ledger_types::{Block, Hash};
use std::sync::Arc;
use tracing::{debug, Span};

/// Indexer that folds entries into the caller's commit batch.
///
/// Runs inline on the commit path and spawns nothing. A block and its index
/// entries become visible in the same atomic write, so a lookup issued after
/// the commit returns always observes the block.
pub struct SyncIndexer {
    queries: IndexQueries,
    span: Span,
}

impl SyncIndexer {
    /// `span` scopes every event this indexer emits.
    pub fn new(store: Arc<dyn IndexStore>, span: Span) -> Self {
        Self {
            queries: IndexQueries::new(store),
            span,
        }
    }

    pub fn queries(&self) -> &IndexQueries {
        &self.queries
    }

    /// Append `block`'s index entries to `batch`.
    ///
    /// On error nothing is appended, and the caller must not commit the
    /// batch.
    pub fn create_indexes_sync(
        &self,
        block: &Block,
        block_number: u64,
        block_hash: &Hash,
        batch: &mut WriteBatch,
    ) -> Result<(), IndexError> {
        let _entered = self.span.enter();

        let extracted = extract_indexes(block, block_number, block_hash)?;
        debug!(
            block_number,
            block_hash = %hex::encode(&block_hash[..4]),
            entries = extracted.entries.len(),
            "indexing block"
        );
        if !extracted.chainlet_authorizations.is_empty() {
            debug!(
                block_number,
                addresses = extracted.chainlet_authorizations.len(),
                "chainlet authorizations not persisted"
            );
        }

        extracted.apply_to(batch);
        Ok(())
    }

    pub fn create_indexes_async(
        &self,
        _block: Arc<Block>,
        _block_number: u64,
        _block_hash: Hash,
    ) -> Result<(), IndexError> {
        Err(IndexError::NotApplicable {
            operation: "create_indexes_async",
            strategy: "synchronous",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryIndexStore;
    use crate::ports::outbound::{CF_BLOCKS, CF_INDEXES};
    use ledger_types::{Transaction, TransactionType};

    fn indexer() -> SyncIndexer {
        SyncIndexer::new(Arc::new(InMemoryIndexStore::new()), Span::none())
    }

    #[test]
    fn test_entries_join_caller_batch() {
        let block = Block::new(vec![Transaction::new(
            TransactionType::ChainletExecute,
            b"g1".to_vec(),
            "A",
        )]);
        let mut batch = WriteBatch::new();
        batch.put_cf(CF_BLOCKS, 7u64.to_be_bytes().to_vec(), b"block".to_vec());

        indexer()
            .create_indexes_sync(&block, 7, &[0x01; 32], &mut batch)
            .unwrap();

        assert_eq!(batch.len(), 4);
        assert_eq!(batch.operations()[0].cf(), CF_BLOCKS);
        assert!(batch.operations()[1..].iter().all(|op| op.cf() == CF_INDEXES));
    }

    #[test]
    fn test_malformed_block_leaves_batch_untouched() {
        let block = Block::new(vec![Transaction::new(
            TransactionType::ChainletExecute,
            Vec::new(),
            "A",
        )]);
        let mut batch = WriteBatch::new();

        let result = indexer().create_indexes_sync(&block, 1, &[0x02; 32], &mut batch);

        assert!(matches!(result, Err(IndexError::MalformedBlock { .. })));
        assert!(batch.is_empty());
    }

    #[test]
    fn test_async_path_not_applicable() {
        let result = indexer().create_indexes_async(Arc::new(Block::default()), 1, [0; 32]);

        assert_eq!(
            result,
            Err(IndexError::NotApplicable {
                operation: "create_indexes_async",
                strategy: "synchronous"
            })
        );
    }
}
