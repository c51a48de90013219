//! Query façade over the `indexes` column family.

use crate::domain::codec::{
    decode_block_number, decode_location, decode_tx_index_list, encode_address_block_key,
    encode_guid_key, encode_hash_key,
};
use crate::domain::{DecodeError, IndexError, IndexFamily};
use crate::ports::inbound::{BlockchainIndexQueries, TransactionLocation};
use crate::ports::outbound::{IndexStore, CF_INDEXES};
use std::sync::Arc;
use tracing::trace;

/// Point lookups against the index store.
///
/// Cheap to clone; every clone shares the same store handle.
#[derive(Clone)]
pub struct IndexQueries {
    store: Arc<dyn IndexStore>,
}

impl IndexQueries {
    pub fn new(store: Arc<dyn IndexStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn IndexStore> {
        &self.store
    }

    fn read(
        &self,
        family: IndexFamily,
        key: &[u8],
        describe: impl FnOnce() -> String,
    ) -> Result<Vec<u8>, IndexError> {
        match self.store.get_cf(CF_INDEXES, key)? {
            Some(value) => Ok(value),
            None => {
                let key = describe();
                trace!(%family, %key, "index miss");
                Err(IndexError::NotFound { family, key })
            }
        }
    }
}

fn malformed(family: IndexFamily) -> impl FnOnce(DecodeError) -> IndexError {
    move |source| IndexError::MalformedValue { family, source }
}

impl BlockchainIndexQueries for IndexQueries {
    fn fetch_block_number_by_hash(&self, block_hash: &[u8]) -> Result<u64, IndexError> {
        let family = IndexFamily::BlockHash;
        let value = self.read(family, &encode_hash_key(block_hash), || hex::encode(block_hash))?;
        decode_block_number(&value).map_err(malformed(family))
    }

    fn fetch_transaction_location(&self, guid: &[u8]) -> Result<TransactionLocation, IndexError> {
        let family = IndexFamily::TxGuid;
        let value = self.read(family, &encode_guid_key(guid), || hex::encode(guid))?;
        let (block_number, tx_index) = decode_location(&value).map_err(malformed(family))?;
        Ok(TransactionLocation {
            block_number,
            tx_index,
        })
    }

    fn fetch_address_tx_indexes(
        &self,
        address: &str,
        block_number: u64,
    ) -> Result<Vec<u64>, IndexError> {
        let family = IndexFamily::AddressBlock;
        let key = encode_address_block_key(address, block_number);
        let value = self.read(family, &key, || format!("{}@{}", address, block_number))?;
        decode_tx_index_list(&value).map_err(malformed(family))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryIndexStore;
    use crate::domain::codec::{encode_block_number, encode_location, encode_tx_index_list};
    use crate::ports::outbound::WriteBatch;

    fn queries_with(entries: Vec<(Vec<u8>, Vec<u8>)>) -> IndexQueries {
        let store = InMemoryIndexStore::new();
        let mut batch = WriteBatch::new();
        for (key, value) in entries {
            batch.put_cf(CF_INDEXES, key, value);
        }
        store.write_batch(batch).unwrap();
        IndexQueries::new(Arc::new(store))
    }

    #[test]
    fn test_fetch_block_number() {
        let hash = [0xAB; 32];
        let queries = queries_with(vec![(encode_hash_key(&hash), encode_block_number(42))]);

        assert_eq!(queries.fetch_block_number_by_hash(&hash), Ok(42));
    }

    #[test]
    fn test_missing_hash_is_not_found() {
        let queries = queries_with(vec![]);

        let err = queries.fetch_block_number_by_hash(&[0x01; 32]).unwrap_err();
        assert!(err.is_not_found());
        assert!(matches!(err, IndexError::NotFound { family: IndexFamily::BlockHash, .. }));
    }

    #[test]
    fn test_fetch_location() {
        let queries = queries_with(vec![(encode_guid_key(b"g1"), encode_location(7, 3))]);

        assert_eq!(
            queries.fetch_transaction_location(b"g1"),
            Ok(TransactionLocation {
                block_number: 7,
                tx_index: 3
            })
        );
    }

    #[test]
    fn test_truncated_location_is_malformed() {
        let queries = queries_with(vec![(encode_guid_key(b"g1"), encode_block_number(7))]);

        assert_eq!(
            queries.fetch_transaction_location(b"g1"),
            Err(IndexError::MalformedValue {
                family: IndexFamily::TxGuid,
                source: DecodeError::Truncated
            })
        );
    }

    #[test]
    fn test_fetch_address_indexes() {
        let queries = queries_with(vec![(
            encode_address_block_key("A", 9),
            encode_tx_index_list(&[0, 4, 5]),
        )]);

        assert_eq!(queries.fetch_address_tx_indexes("A", 9), Ok(vec![0, 4, 5]));
        assert!(queries.fetch_address_tx_indexes("A", 10).unwrap_err().is_not_found());
    }
}
