//! # Index Extractor
//!
//! Turns one finalized block into the index entries that must be written for
//! it. Pure and deterministic: the same block, number and hash always yield
//! the same entries in the same order.
//!
//! ## Emission order
//!
//! 1. `BlockHash` entry for the block
//! 2. one `TxGuid` entry per transaction, in block order
//! 3. one `AddressBlock` entry per distinct executing address, ascending by
//!    address

use crate::domain::codec::{
    encode_address_block_key, encode_block_number, encode_guid_key, encode_hash_key,
    encode_location, encode_tx_index_list, IndexFamily,
};
use crate::domain::errors::IndexError;
use crate::ports::outbound::{BatchOperation, WriteBatch, CF_INDEXES};
use ledger_types::{Address, Block, ChainletId};
use std::collections::BTreeMap;

/// A single key/value mutation in the `indexes` column family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub family: IndexFamily,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl IndexEntry {
    pub fn into_batch_operation(self) -> BatchOperation {
        BatchOperation::put(CF_INDEXES, self.key, self.value)
    }
}

/// Everything derived from one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedIndexes {
    pub block_number: u64,
    /// Entries to persist, in emission order.
    pub entries: Vec<IndexEntry>,
    /// Chainlets each authorized address may manage, from the block's
    /// deployment transactions.
    ///
    /// Not persisted: no key family is allocated for it. Hosts that want a
    /// chainlet-by-address index can read it from here.
    pub chainlet_authorizations: BTreeMap<Address, Vec<ChainletId>>,
}

impl ExtractedIndexes {
    /// Number of entries of the given family.
    pub fn count(&self, family: IndexFamily) -> usize {
        self.entries.iter().filter(|e| e.family == family).count()
    }

    /// Fold every entry into `batch` as a put on `CF_INDEXES`.
    pub fn apply_to(self, batch: &mut WriteBatch) {
        batch.extend(self.entries.into_iter().map(IndexEntry::into_batch_operation));
    }

    /// Build a batch holding only this block's index entries.
    pub fn into_batch(self) -> WriteBatch {
        let mut batch = WriteBatch::new();
        self.apply_to(&mut batch);
        batch
    }
}

/// Compute the index entries for `block`.
///
/// Fails with `MalformedBlock` when a transaction breaks the block schema
/// contract: an empty GUID, or a deployment without a chainlet id.
pub fn extract_indexes(
    block: &Block,
    block_number: u64,
    block_hash: &[u8],
) -> Result<ExtractedIndexes, IndexError> {
    let transactions = block.transactions();
    let mut entries = Vec::with_capacity(1 + 2 * transactions.len());

    entries.push(IndexEntry {
        family: IndexFamily::BlockHash,
        key: encode_hash_key(block_hash),
        value: encode_block_number(block_number),
    });

    let mut address_tx_indexes: BTreeMap<&str, Vec<u64>> = BTreeMap::new();
    let mut chainlet_authorizations: BTreeMap<Address, Vec<ChainletId>> = BTreeMap::new();

    for (tx_index, tx) in transactions.iter().enumerate() {
        let tx_index = tx_index as u64;

        if tx.guid().is_empty() {
            return Err(IndexError::MalformedBlock {
                block_number,
                reason: format!("transaction {} has an empty guid", tx_index),
            });
        }

        entries.push(IndexEntry {
            family: IndexFamily::TxGuid,
            key: encode_guid_key(tx.guid()),
            value: encode_location(block_number, tx_index),
        });

        address_tx_indexes
            .entry(tx.executing_address())
            .or_default()
            .push(tx_index);

        if tx.tx_type().is_deployment() {
            let chainlet_id = tx.chainlet_id().ok_or_else(|| IndexError::MalformedBlock {
                block_number,
                reason: format!(
                    "{:?} transaction {} has no chainlet id",
                    tx.tx_type(),
                    tx_index
                ),
            })?;
            for address in tx.authorized_addresses() {
                chainlet_authorizations
                    .entry(address.clone())
                    .or_default()
                    .push(chainlet_id.clone());
            }
        }
    }

    for (address, tx_indexes) in address_tx_indexes {
        entries.push(IndexEntry {
            family: IndexFamily::AddressBlock,
            key: encode_address_block_key(address, block_number),
            value: encode_tx_index_list(&tx_indexes),
        });
    }

    Ok(ExtractedIndexes {
        block_number,
        entries,
        chainlet_authorizations,
    })
}
