//! # Core Ledger Entities
//!
//! - **Chain**: `Block`, `Transaction`, `TransactionType`
//! - **Deployment**: `ChainletId`, authorized addresses

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use std::fmt;

/// A 32-byte block hash, content-derived and supplied by the commit pipeline.
pub type Hash = [u8; 32];

/// Account identifier of a transaction submitter.
pub type Address = String;

/// Block number of the genesis block.
pub const GENESIS_BLOCK_NUMBER: u64 = 0;

/// Kind of a ledger transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TransactionType {
    #[default]
    Undefined,
    /// Installs a new chainlet.
    ChainletNew,
    /// Replaces the logic of an installed chainlet.
    ChainletUpdate,
    /// Invokes a chainlet function that mutates state.
    ChainletExecute,
    /// Invokes a read-only chainlet function.
    ChainletQuery,
    /// Removes an installed chainlet.
    ChainletTerminate,
}

impl TransactionType {
    /// Whether this transaction deploys or redeploys a chainlet.
    ///
    /// Deployment transactions carry a `ChainletId` and the set of addresses
    /// authorized to manage it.
    pub fn is_deployment(&self) -> bool {
        matches!(self, Self::ChainletNew | Self::ChainletUpdate)
    }
}

/// Identifier of a deployed unit of logic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChainletId {
    /// Location the chainlet was deployed from.
    pub url: String,
}

impl ChainletId {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl fmt::Display for ChainletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

/// A transaction as recorded in a finalized block.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction kind.
    pub tx_type: TransactionType,
    /// Globally unique transaction identifier.
    #[serde_as(as = "Bytes")]
    pub guid: Vec<u8>,
    /// Account that submitted the transaction.
    pub executing_address: Address,
    /// Addresses allowed to manage the deployed chainlet (deployments only).
    pub authorized_addresses: Vec<Address>,
    /// Target chainlet. Required for deployments.
    pub chainlet_id: Option<ChainletId>,
    /// Opaque invocation payload.
    pub payload: Vec<u8>,
    /// Unix timestamp when the transaction was submitted.
    pub timestamp: u64,
}

impl Transaction {
    /// Create a non-deployment transaction.
    pub fn new(
        tx_type: TransactionType,
        guid: impl Into<Vec<u8>>,
        executing_address: impl Into<Address>,
    ) -> Self {
        Self {
            tx_type,
            guid: guid.into(),
            executing_address: executing_address.into(),
            authorized_addresses: Vec::new(),
            chainlet_id: None,
            payload: Vec::new(),
            timestamp: 0,
        }
    }

    /// Create a chainlet deployment (`ChainletNew` or `ChainletUpdate`).
    pub fn deployment(
        tx_type: TransactionType,
        guid: impl Into<Vec<u8>>,
        executing_address: impl Into<Address>,
        chainlet_id: ChainletId,
        authorized_addresses: Vec<Address>,
    ) -> Self {
        Self {
            chainlet_id: Some(chainlet_id),
            authorized_addresses,
            ..Self::new(tx_type, guid, executing_address)
        }
    }

    /// Attach an invocation payload.
    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = payload.into();
        self
    }

    pub fn tx_type(&self) -> TransactionType {
        self.tx_type
    }

    pub fn guid(&self) -> &[u8] {
        &self.guid
    }

    pub fn executing_address(&self) -> &str {
        &self.executing_address
    }

    pub fn authorized_addresses(&self) -> &[Address] {
        &self.authorized_addresses
    }

    pub fn chainlet_id(&self) -> Option<&ChainletId> {
        self.chainlet_id.as_ref()
    }
}

/// A finalized block.
///
/// The block number and hash are not stored on the block: the commit pipeline
/// assigns them and passes them to every consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Block {
    /// Protocol version for this block.
    pub version: u32,
    /// Unix timestamp when the block was proposed.
    pub timestamp: u64,
    /// Hash of the parent block (`None` for genesis).
    pub previous_block_hash: Option<Hash>,
    /// Transactions in execution order.
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn new(transactions: Vec<Transaction>) -> Self {
        Self {
            version: 1,
            transactions,
            ..Self::default()
        }
    }

    /// Set the parent hash.
    pub fn with_parent(mut self, parent: Hash) -> Self {
        self.previous_block_hash = Some(parent);
        self
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deployment_types() {
        assert!(TransactionType::ChainletNew.is_deployment());
        assert!(TransactionType::ChainletUpdate.is_deployment());
        assert!(!TransactionType::ChainletExecute.is_deployment());
        assert!(!TransactionType::ChainletQuery.is_deployment());
        assert!(!TransactionType::ChainletTerminate.is_deployment());
        assert!(!TransactionType::Undefined.is_deployment());
    }

    #[test]
    fn test_deployment_constructor() {
        let tx = Transaction::deployment(
            TransactionType::ChainletNew,
            b"guid-1".to_vec(),
            "alice",
            ChainletId::new("github.com/acme/escrow"),
            vec!["alice".into(), "bob".into()],
        );

        assert_eq!(tx.guid(), b"guid-1");
        assert_eq!(tx.executing_address(), "alice");
        assert_eq!(tx.authorized_addresses().len(), 2);
        assert_eq!(tx.chainlet_id().unwrap().to_string(), "github.com/acme/escrow");
    }

    #[test]
    fn test_block_bincode_roundtrip() {
        let block = Block::new(vec![
            Transaction::new(TransactionType::ChainletExecute, b"g1".to_vec(), "alice")
                .with_payload(b"transfer".to_vec()),
        ])
        .with_parent([0xAB; 32]);

        let bytes = bincode::serialize(&block).unwrap();
        let decoded: Block = bincode::deserialize(&bytes).unwrap();

        assert_eq!(decoded, block);
    }
}
