//! # Inbound Ports (Driving Ports)
//!
//! Lookups the ledger node performs against the secondary indexes.

use crate::domain::IndexError;
use serde::{Deserialize, Serialize};

/// Position of a transaction in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionLocation {
    pub block_number: u64,
    /// Zero-based position within the block.
    pub tx_index: u64,
}

/// Point lookups over the indexes.
///
/// All methods are side-effect free. An absent key is reported as
/// `IndexError::NotFound`; store failures come back as `IndexError::Store`.
pub trait BlockchainIndexQueries {
    /// Block number of the block with this hash.
    fn fetch_block_number_by_hash(&self, block_hash: &[u8]) -> Result<u64, IndexError>;

    /// Where the transaction with this GUID was committed.
    fn fetch_transaction_location(&self, guid: &[u8]) -> Result<TransactionLocation, IndexError>;

    /// Positions of `address`'s transactions within block `block_number`.
    fn fetch_address_tx_indexes(
        &self,
        address: &str,
        block_number: u64,
    ) -> Result<Vec<u64>, IndexError>;
}
