//! # Ports
//!
//! - `inbound`: lookups the ledger node calls (`BlockchainIndexQueries`)
//! - `outbound`: the key-value engine the indexes live in (`IndexStore`)

pub mod inbound;
pub mod outbound;

pub use inbound::{BlockchainIndexQueries, TransactionLocation};
pub use outbound::{
    BatchOperation, IndexStore, StoreError, WriteBatch, CF_BLOCKS, CF_INDEXES, COLUMN_FAMILIES,
};
