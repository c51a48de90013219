//! # Ledger Types Crate
//!
//! Block and transaction records shared by the ledger's commit pipeline and
//! the secondary-index layer.
//!
//! ## Design Principles
//!
//! - **Read-only after finalization**: the index layer only reads fields; it
//!   never rewrites a block or computes its hash.
//! - **Caller-supplied identity**: block numbers and block hashes are assigned
//!   by the commit pipeline and passed alongside the block.

pub mod entities;

pub use entities::*;
