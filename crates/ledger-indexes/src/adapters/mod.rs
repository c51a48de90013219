//! # Adapters Module
//!
//! `IndexStore` implementations.
//!
//! - `memory`: in-process store for tests and light nodes
//! - `rocksdb`: production store with column families (feature `rocksdb`)

mod memory;
#[cfg(feature = "rocksdb")]
mod rocksdb;

pub use memory::InMemoryIndexStore;
#[cfg(feature = "rocksdb")]
pub use self::rocksdb::{RocksDbConfig, RocksDbIndexStore};
